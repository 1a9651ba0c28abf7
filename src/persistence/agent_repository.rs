//! Repository for agent records

use crate::domain::{Agent, AgentPatch, NewAgent};
use crate::persistence::error::PersistenceError;
use crate::persistence::models;
use crate::persistence::pool::ConnectionPool;
use async_trait::async_trait;
use sqlx::any::{AnyArguments, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Row};

const SELECT_AGENT: &str = "SELECT id, name, description, system_prompt, user_prompt_template, \
     model_config, workflow_id, knowledge_base_ids, plugin_ids, status, created_at, updated_at \
     FROM agent";

const INSERT_AGENT: &str = "INSERT INTO agent (name, description, system_prompt, \
     user_prompt_template, model_config, workflow_id, knowledge_base_ids, plugin_ids, status, \
     created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

const UPDATE_AGENT: &str = "UPDATE agent SET name = ?, description = ?, system_prompt = ?, \
     user_prompt_template = ?, model_config = ?, workflow_id = ?, knowledge_base_ids = ?, \
     plugin_ids = ?, status = ?, updated_at = ? WHERE id = ?";

/// No-op write that claims the write lock for the row before it is read
const LOCK_AGENT: &str = "UPDATE agent SET id = id WHERE id = ?";

/// Repository trait for agent operations
#[async_trait]
pub trait AgentRepository: Send + Sync {
    /// All agents, ordered by id
    async fn list(&self) -> Result<Vec<Agent>, PersistenceError>;

    /// Get an agent by id
    async fn get(&self, id: i64) -> Result<Option<Agent>, PersistenceError>;

    /// Agents whose status equals `status` exactly
    async fn find_by_status(&self, status: &str) -> Result<Vec<Agent>, PersistenceError>;

    /// Agents whose name contains `fragment`
    async fn find_by_name_containing(&self, fragment: &str)
        -> Result<Vec<Agent>, PersistenceError>;

    /// Agents linked to a workflow
    async fn find_by_workflow_id(&self, workflow_id: i64) -> Result<Vec<Agent>, PersistenceError>;

    /// Insert a new agent and return it with its assigned id and timestamps
    async fn create(&self, agent: &NewAgent) -> Result<Agent, PersistenceError>;

    /// Merge `patch` into the stored agent and persist the result
    async fn update(&self, id: i64, patch: &AgentPatch) -> Result<Agent, PersistenceError>;

    /// Delete an agent by id, returns whether a row was removed
    async fn delete(&self, id: i64) -> Result<bool, PersistenceError>;

    /// Check whether an agent exists
    async fn exists(&self, id: i64) -> Result<bool, PersistenceError>;
}

/// Encoded values for the writable agent columns, in statement order
struct AgentColumns {
    name: String,
    description: Option<String>,
    system_prompt: Option<String>,
    user_prompt_template: Option<String>,
    model_config: Option<String>,
    workflow_id: Option<i64>,
    knowledge_base_ids: Option<String>,
    plugin_ids: Option<String>,
    status: String,
}

impl AgentColumns {
    fn from_new(agent: &NewAgent) -> Result<Self, PersistenceError> {
        Ok(Self {
            name: agent.name.clone(),
            description: agent.description.clone(),
            system_prompt: agent.system_prompt.clone(),
            user_prompt_template: agent.user_prompt_template.clone(),
            model_config: models::encode_json(agent.model_config.as_ref())?,
            workflow_id: agent.workflow_id,
            knowledge_base_ids: models::encode_json(agent.knowledge_base_ids.as_ref())?,
            plugin_ids: models::encode_json(agent.plugin_ids.as_ref())?,
            status: agent.effective_status().to_string(),
        })
    }

    fn from_agent(agent: &Agent) -> Result<Self, PersistenceError> {
        Ok(Self {
            name: agent.name.clone(),
            description: agent.description.clone(),
            system_prompt: agent.system_prompt.clone(),
            user_prompt_template: agent.user_prompt_template.clone(),
            model_config: models::encode_json(agent.model_config.as_ref())?,
            workflow_id: agent.workflow_id,
            knowledge_base_ids: models::encode_json(agent.knowledge_base_ids.as_ref())?,
            plugin_ids: models::encode_json(agent.plugin_ids.as_ref())?,
            status: agent.status.clone(),
        })
    }

    fn bind<'q>(self, query: Query<'q, Any, AnyArguments<'q>>) -> Query<'q, Any, AnyArguments<'q>> {
        query
            .bind(self.name)
            .bind(self.description)
            .bind(self.system_prompt)
            .bind(self.user_prompt_template)
            .bind(self.model_config)
            .bind(self.workflow_id)
            .bind(self.knowledge_base_ids)
            .bind(self.plugin_ids)
            .bind(self.status)
    }
}

/// `LIKE` pattern matching `fragment` anywhere, with wildcards in it escaped by `!`
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '!') {
            pattern.push('!');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// SQLx-based implementation of AgentRepository
pub struct SqlxAgentRepository {
    pool: ConnectionPool,
}

impl SqlxAgentRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Parse a row into an Agent
    fn parse_row(row: &AnyRow) -> Result<Agent, PersistenceError> {
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(Agent {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            system_prompt: row.try_get("system_prompt")?,
            user_prompt_template: row.try_get("user_prompt_template")?,
            model_config: models::decode_json(row.try_get("model_config")?)?,
            workflow_id: row.try_get("workflow_id")?,
            knowledge_base_ids: models::decode_json(row.try_get("knowledge_base_ids")?)?,
            plugin_ids: models::decode_json(row.try_get("plugin_ids")?)?,
            status: row.try_get("status")?,
            created_at: models::decode_timestamp("created_at", &created_at)?,
            updated_at: models::decode_timestamp("updated_at", &updated_at)?,
        })
    }

    fn parse_rows(rows: &[AnyRow]) -> Result<Vec<Agent>, PersistenceError> {
        rows.iter().map(Self::parse_row).collect()
    }
}

#[async_trait]
impl AgentRepository for SqlxAgentRepository {
    async fn list(&self) -> Result<Vec<Agent>, PersistenceError> {
        let sql = format!("{SELECT_AGENT} ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(self.pool.pool()).await?;
        Self::parse_rows(&rows)
    }

    async fn get(&self, id: i64) -> Result<Option<Agent>, PersistenceError> {
        let sql = format!("{SELECT_AGENT} WHERE id = ?");
        let row = sqlx::query(&self.pool.sql(&sql))
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn find_by_status(&self, status: &str) -> Result<Vec<Agent>, PersistenceError> {
        let sql = format!("{SELECT_AGENT} WHERE status = ? ORDER BY id");
        let rows = sqlx::query(&self.pool.sql(&sql))
            .bind(status)
            .fetch_all(self.pool.pool())
            .await?;

        Self::parse_rows(&rows)
    }

    async fn find_by_name_containing(
        &self,
        fragment: &str,
    ) -> Result<Vec<Agent>, PersistenceError> {
        let sql = format!("{SELECT_AGENT} WHERE name LIKE ? ESCAPE '!' ORDER BY id");
        let rows = sqlx::query(&self.pool.sql(&sql))
            .bind(contains_pattern(fragment))
            .fetch_all(self.pool.pool())
            .await?;

        Self::parse_rows(&rows)
    }

    async fn find_by_workflow_id(&self, workflow_id: i64) -> Result<Vec<Agent>, PersistenceError> {
        let sql = format!("{SELECT_AGENT} WHERE workflow_id = ? ORDER BY id");
        let rows = sqlx::query(&self.pool.sql(&sql))
            .bind(workflow_id)
            .fetch_all(self.pool.pool())
            .await?;

        Self::parse_rows(&rows)
    }

    async fn create(&self, agent: &NewAgent) -> Result<Agent, PersistenceError> {
        let now = models::encode_timestamp(&models::now());
        let columns = AgentColumns::from_new(agent)?;
        let backend = self.pool.backend();

        let mut tx = self.pool.pool().begin().await?;

        let id: i64 = if backend.supports_returning() {
            let sql = format!("{INSERT_AGENT} RETURNING id");
            let sql = self.pool.sql(&sql);
            let row = columns
                .bind(sqlx::query(&sql))
                .bind(now.clone())
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;
            row.try_get("id")?
        } else {
            let result = columns
                .bind(sqlx::query(INSERT_AGENT))
                .bind(now.clone())
                .bind(now)
                .execute(&mut *tx)
                .await?;
            result.last_insert_id().ok_or_else(|| {
                PersistenceError::Internal("Database did not report the inserted agent id".into())
            })?
        };

        tx.commit().await?;

        tracing::debug!(agent_id = id, "Created agent '{}'", agent.name);

        self.get(id)
            .await?
            .ok_or_else(|| PersistenceError::agent_not_found(id))
    }

    async fn update(&self, id: i64, patch: &AgentPatch) -> Result<Agent, PersistenceError> {
        let mut tx = self.pool.pool().begin().await?;

        // Write before reading: SQLite cannot upgrade a read lock under
        // contention, and Postgres/MySQL take the row lock here.
        sqlx::query(&self.pool.sql(LOCK_AGENT))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let select = format!("{SELECT_AGENT} WHERE id = ?");
        let row = sqlx::query(&self.pool.sql(&select))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let mut agent = match row {
            Some(row) => Self::parse_row(&row)?,
            None => return Err(PersistenceError::agent_not_found(id)),
        };

        agent.apply_patch(patch);
        agent.touch(models::now());

        let update = self.pool.sql(UPDATE_AGENT);
        AgentColumns::from_agent(&agent)?
            .bind(sqlx::query(&update))
            .bind(models::encode_timestamp(&agent.updated_at))
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(agent_id = id, "Updated agent");
        Ok(agent)
    }

    async fn delete(&self, id: i64) -> Result<bool, PersistenceError> {
        let result = sqlx::query(&self.pool.sql("DELETE FROM agent WHERE id = ?"))
            .bind(id)
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, id: i64) -> Result<bool, PersistenceError> {
        let row = sqlx::query(&self.pool.sql("SELECT COUNT(*) AS count FROM agent WHERE id = ?"))
            .bind(id)
            .fetch_one(self.pool.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count > 0)
    }
}
