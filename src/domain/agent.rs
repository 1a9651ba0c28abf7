//! Agent records and the payloads used to create and update them

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Status assigned when a create payload does not carry one
pub const STATUS_DRAFT: &str = "draft";
/// Conventional status for agents that are live
pub const STATUS_PUBLISHED: &str = "published";

/// Column width of `agent.name`
pub const MAX_NAME_LEN: usize = 100;
/// Column width of `agent.status`
pub const MAX_STATUS_LEN: usize = 20;

/// A stored AI-assistant configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    /// Surrogate key assigned by the database
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub user_prompt_template: Option<String>,
    /// Free-form model settings (provider, temperature, ...)
    pub model_config: Option<Map<String, Value>>,
    /// External workflow reference, not checked against any table
    pub workflow_id: Option<i64>,
    pub knowledge_base_ids: Option<Vec<i64>>,
    pub plugin_ids: Option<Vec<i64>>,
    /// Conventionally `draft` or `published`
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting an agent.
///
/// Server-owned fields (`id`, `createdAt`, `updatedAt`) are not part of the
/// payload and are ignored if a client sends them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub user_prompt_template: Option<String>,
    #[serde(default)]
    pub model_config: Option<Map<String, Value>>,
    #[serde(default)]
    pub workflow_id: Option<i64>,
    #[serde(default)]
    pub knowledge_base_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub plugin_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub status: Option<String>,
}

impl NewAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Status to persist, falling back to [`STATUS_DRAFT`]
    pub fn effective_status(&self) -> &str {
        self.status.as_deref().unwrap_or(STATUS_DRAFT)
    }

    pub fn validate(&self) -> Result<(), AgentValidationError> {
        validate_name(&self.name)?;
        if let Some(status) = &self.status {
            validate_status(status)?;
        }
        Ok(())
    }
}

/// Merge-style update payload: `None` (absent or `null`) keeps the stored value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub user_prompt_template: Option<String>,
    pub model_config: Option<Map<String, Value>>,
    pub workflow_id: Option<i64>,
    pub knowledge_base_ids: Option<Vec<i64>>,
    pub plugin_ids: Option<Vec<i64>>,
    pub status: Option<String>,
}

impl AgentPatch {
    /// Patch that only changes the status
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), AgentValidationError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(status) = &self.status {
            validate_status(status)?;
        }
        Ok(())
    }
}

impl Agent {
    /// Overwrite every field the patch carries; leave the rest untouched.
    ///
    /// `id`, `created_at` and `updated_at` are never touched here.
    pub fn apply_patch(&mut self, patch: &AgentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(system_prompt) = &patch.system_prompt {
            self.system_prompt = Some(system_prompt.clone());
        }
        if let Some(template) = &patch.user_prompt_template {
            self.user_prompt_template = Some(template.clone());
        }
        if let Some(model_config) = &patch.model_config {
            self.model_config = Some(model_config.clone());
        }
        if let Some(workflow_id) = patch.workflow_id {
            self.workflow_id = Some(workflow_id);
        }
        if let Some(ids) = &patch.knowledge_base_ids {
            self.knowledge_base_ids = Some(ids.clone());
        }
        if let Some(ids) = &patch.plugin_ids {
            self.plugin_ids = Some(ids.clone());
        }
        if let Some(status) = &patch.status {
            self.status = status.clone();
        }
    }

    /// Advance `updated_at` to `now`.
    ///
    /// If the clock has not moved past the stored value (same microsecond,
    /// or skew), the timestamp is bumped by one microsecond instead.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

/// Field constraints that mirror the `agent` table columns
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentValidationError {
    #[error("Agent name must not be blank")]
    BlankName,

    #[error("Agent name is {len} characters long, maximum is {max}")]
    NameTooLong { len: usize, max: usize },

    #[error("Agent status is {len} characters long, maximum is {max}")]
    StatusTooLong { len: usize, max: usize },
}

fn validate_name(name: &str) -> Result<(), AgentValidationError> {
    if name.trim().is_empty() {
        return Err(AgentValidationError::BlankName);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(AgentValidationError::NameTooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok(())
}

fn validate_status(status: &str) -> Result<(), AgentValidationError> {
    let len = status.chars().count();
    if len > MAX_STATUS_LEN {
        return Err(AgentValidationError::StatusTooLong {
            len,
            max: MAX_STATUS_LEN,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_agent() -> Agent {
        let now = Utc::now();
        Agent {
            id: 7,
            name: "support-bot".to_string(),
            description: Some("Answers tickets".to_string()),
            system_prompt: Some("You are helpful".to_string()),
            user_prompt_template: Some("{{question}}".to_string()),
            model_config: json!({"model": "gpt-4o", "temperature": 0.2})
                .as_object()
                .cloned(),
            workflow_id: Some(3),
            knowledge_base_ids: Some(vec![1, 2]),
            plugin_ids: Some(vec![9]),
            status: STATUS_DRAFT.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_apply_status_only_patch() {
        let mut agent = sample_agent();
        let before = agent.clone();

        agent.apply_patch(&AgentPatch::status(STATUS_PUBLISHED));

        assert_eq!(agent.status, STATUS_PUBLISHED);
        assert_eq!(agent.name, before.name);
        assert_eq!(agent.description, before.description);
        assert_eq!(agent.system_prompt, before.system_prompt);
        assert_eq!(agent.user_prompt_template, before.user_prompt_template);
        assert_eq!(agent.model_config, before.model_config);
        assert_eq!(agent.workflow_id, before.workflow_id);
        assert_eq!(agent.knowledge_base_ids, before.knowledge_base_ids);
        assert_eq!(agent.plugin_ids, before.plugin_ids);
        assert_eq!(agent.created_at, before.created_at);
    }

    #[test]
    fn test_apply_patch_replaces_lists_wholesale() {
        let mut agent = sample_agent();
        let patch = AgentPatch {
            knowledge_base_ids: Some(vec![]),
            plugin_ids: Some(vec![4, 5, 6]),
            ..Default::default()
        };

        agent.apply_patch(&patch);

        assert_eq!(agent.knowledge_base_ids, Some(vec![]));
        assert_eq!(agent.plugin_ids, Some(vec![4, 5, 6]));
    }

    #[test]
    fn test_empty_patch_is_noop() {
        let mut agent = sample_agent();
        let before = agent.clone();
        let patch = AgentPatch::default();

        assert!(patch.is_empty());
        agent.apply_patch(&patch);
        assert_eq!(agent, before);
    }

    #[test]
    fn test_touch_always_moves_forward() {
        let mut agent = sample_agent();
        let original = agent.updated_at;

        agent.touch(original - Duration::seconds(30));
        assert_eq!(agent.updated_at, original + Duration::microseconds(1));

        agent.touch(original);
        assert_eq!(agent.updated_at, original + Duration::microseconds(2));

        agent.touch(original + Duration::seconds(30));
        assert_eq!(agent.updated_at, original + Duration::seconds(30));
    }

    #[test]
    fn test_patch_null_fields_deserialize_as_absent() {
        let patch: AgentPatch =
            serde_json::from_value(json!({"status": "published", "name": null})).unwrap();
        assert_eq!(patch, AgentPatch::status("published"));
    }

    #[test]
    fn test_new_agent_ignores_server_fields() {
        let new_agent: NewAgent = serde_json::from_value(json!({
            "id": 99,
            "name": "writer",
            "createdAt": "2020-01-01T00:00:00Z",
            "knowledgeBaseIds": [1, 2]
        }))
        .unwrap();

        assert_eq!(new_agent.name, "writer");
        assert_eq!(new_agent.knowledge_base_ids, Some(vec![1, 2]));
        assert_eq!(new_agent.effective_status(), STATUS_DRAFT);
    }

    #[test]
    fn test_agent_serializes_camel_case() {
        let value = serde_json::to_value(sample_agent()).unwrap();
        assert!(value.get("systemPrompt").is_some());
        assert!(value.get("userPromptTemplate").is_some());
        assert!(value.get("knowledgeBaseIds").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("system_prompt").is_none());
    }

    #[test]
    fn test_validation() {
        assert_eq!(
            NewAgent::new("   ").validate(),
            Err(AgentValidationError::BlankName)
        );
        assert!(NewAgent::new("a".repeat(MAX_NAME_LEN)).validate().is_ok());
        assert!(matches!(
            NewAgent::new("a".repeat(MAX_NAME_LEN + 1)).validate(),
            Err(AgentValidationError::NameTooLong { .. })
        ));
        assert!(matches!(
            AgentPatch::status("x".repeat(MAX_STATUS_LEN + 1)).validate(),
            Err(AgentValidationError::StatusTooLong { .. })
        ));
        assert!(AgentPatch::default().validate().is_ok());
    }
}
