use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Agent, AgentPatch, NewAgent};
use crate::persistence::{AgentRepository, PersistenceError};

/// Agent use cases on top of an [`AgentRepository`]
#[derive(Clone)]
pub struct AgentService {
    repository: Arc<dyn AgentRepository>,
}

impl AgentService {
    pub fn new(repository: Arc<dyn AgentRepository>) -> Self {
        Self { repository }
    }

    pub async fn find_all(&self) -> Result<Vec<Agent>, PersistenceError> {
        self.repository.list().await
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Agent>, PersistenceError> {
        self.repository.get(id).await
    }

    pub async fn find_by_status(&self, status: &str) -> Result<Vec<Agent>, PersistenceError> {
        self.repository.find_by_status(status).await
    }

    /// Substring search on the agent name
    pub async fn find_by_name(&self, fragment: &str) -> Result<Vec<Agent>, PersistenceError> {
        debug!(fragment, "Searching agents by name");
        self.repository.find_by_name_containing(fragment).await
    }

    pub async fn find_by_workflow(&self, workflow_id: i64) -> Result<Vec<Agent>, PersistenceError> {
        self.repository.find_by_workflow_id(workflow_id).await
    }

    pub async fn create(&self, agent: NewAgent) -> Result<Agent, PersistenceError> {
        agent.validate()?;
        let created = self.repository.create(&agent).await?;
        info!(agent_id = created.id, name = %created.name, "Agent created");
        Ok(created)
    }

    /// Merge the non-null fields of `patch` into agent `id`.
    ///
    /// Fails with `NotFound` when the agent does not exist; nothing is created.
    pub async fn update(&self, id: i64, patch: AgentPatch) -> Result<Agent, PersistenceError> {
        patch.validate()?;
        if patch.is_empty() {
            debug!(agent_id = id, "Empty update payload, only updatedAt changes");
        }
        match self.repository.update(id, &patch).await {
            Ok(agent) => {
                info!(agent_id = id, "Agent updated");
                Ok(agent)
            }
            Err(e) => {
                if e.is_not_found() {
                    warn!(agent_id = id, "Update of unknown agent");
                }
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: i64) -> Result<(), PersistenceError> {
        if !self.repository.delete(id).await? {
            warn!(agent_id = id, "Delete of unknown agent");
            return Err(PersistenceError::agent_not_found(id));
        }
        info!(agent_id = id, "Agent deleted");
        Ok(())
    }

    pub async fn exists(&self, id: i64) -> Result<bool, PersistenceError> {
        self.repository.exists(id).await
    }
}
