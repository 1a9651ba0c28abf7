//! Database migrations for the persistence layer
//!
//! Migration SQL is written once for all backends. The `{auto_id}` token is
//! replaced with the backend's auto-increment primary key definition and
//! `{if_not_exists}` with the index guard the backend understands before the
//! statements run.
//!
//! Every statement must be safe to run again: a migration that stopped
//! halfway is re-executed from the top on the next start. MySQL has no
//! `CREATE INDEX IF NOT EXISTS`, so a duplicate-index error is skipped there.

use crate::persistence::error::PersistenceError;
use crate::persistence::pool::ConnectionPool;
use sha2::{Digest, Sha256};
use sqlx::Row;

/// Table that records which migrations have been applied
const MIGRATIONS_TABLE: &str = "_agent_migrations";

/// Agent table
const MIGRATION_001_AGENT: &str = r#"
-- JSON-valued columns (model_config, knowledge_base_ids, plugin_ids) are stored as text
CREATE TABLE IF NOT EXISTS agent (
    id {auto_id},
    name VARCHAR(100) NOT NULL,
    description TEXT,
    system_prompt TEXT,
    user_prompt_template TEXT,
    model_config TEXT,
    workflow_id BIGINT,
    knowledge_base_ids TEXT,
    plugin_ids TEXT,
    status VARCHAR(20) NOT NULL DEFAULT 'draft',
    created_at VARCHAR(40) NOT NULL,
    updated_at VARCHAR(40) NOT NULL
);

CREATE INDEX {if_not_exists}idx_agent_status ON agent(status);
CREATE INDEX {if_not_exists}idx_agent_workflow ON agent(workflow_id);
"#;

/// Workflow definition and execution tables.
///
/// Nothing in this crate reads or writes them. `agent_id` and `user_id` are
/// plain columns: the tables they pointed at are not part of this schema.
const MIGRATION_002_WORKFLOWS: &str = r#"
CREATE TABLE IF NOT EXISTS workflows (
    id {auto_id},
    uuid VARCHAR(36) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    agent_id BIGINT,
    user_id BIGINT NOT NULL,
    definition TEXT,
    status VARCHAR(20) NOT NULL DEFAULT 'DRAFT',
    version INTEGER NOT NULL DEFAULT 1,
    execution_count INTEGER DEFAULT 0,
    success_count INTEGER DEFAULT 0,
    created_at VARCHAR(40) NOT NULL,
    updated_at VARCHAR(40) NOT NULL
);

CREATE TABLE IF NOT EXISTS workflow_executions (
    id {auto_id},
    uuid VARCHAR(36) NOT NULL UNIQUE,
    workflow_id BIGINT NOT NULL,
    workflow_uuid VARCHAR(36) NOT NULL,
    workflow_version INTEGER NOT NULL,
    user_id BIGINT NOT NULL,
    status VARCHAR(20) NOT NULL DEFAULT 'PENDING',
    input_data TEXT,
    output_data TEXT,
    context TEXT,
    error_message TEXT,
    error_node_id VARCHAR(100),
    started_at VARCHAR(40),
    completed_at VARCHAR(40),
    duration_seconds INTEGER,
    created_at VARCHAR(40) NOT NULL,
    updated_at VARCHAR(40) NOT NULL,
    FOREIGN KEY (workflow_id) REFERENCES workflows(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS workflow_execution_logs (
    id {auto_id},
    execution_id BIGINT NOT NULL,
    node_id VARCHAR(100) NOT NULL,
    node_name VARCHAR(255),
    node_type VARCHAR(50),
    level VARCHAR(20) DEFAULT 'INFO',
    message TEXT NOT NULL,
    input_data TEXT,
    output_data TEXT,
    timestamp VARCHAR(40) NOT NULL,
    duration_ms INTEGER,
    FOREIGN KEY (execution_id) REFERENCES workflow_executions(id) ON DELETE CASCADE
);

CREATE INDEX {if_not_exists}idx_workflows_agent ON workflows(agent_id);
CREATE INDEX {if_not_exists}idx_workflow_executions_workflow ON workflow_executions(workflow_id);
CREATE INDEX {if_not_exists}idx_workflow_execution_logs_execution ON workflow_execution_logs(execution_id);
"#;

/// Migration definition
struct Migration {
    name: &'static str,
    sql: &'static str,
}

impl Migration {
    /// SHA-256 of the migration template, hex encoded
    fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(self.sql.as_bytes()))
    }
}

/// Get all migrations in order
fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            name: "001_agent_table",
            sql: MIGRATION_001_AGENT,
        },
        Migration {
            name: "002_workflow_tables",
            sql: MIGRATION_002_WORKFLOWS,
        },
    ]
}

/// Split a migration script into executable statements, dropping comment lines
fn split_statements(sql: &str) -> Vec<String> {
    let without_comments: String = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");

    without_comments
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
        .map(str::to_string)
        .collect()
}

/// MySQL error 1061, `ER_DUP_KEYNAME`
fn is_duplicate_index(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>())
        .is_some_and(|e| e.number() == 1061)
}

/// Migration runner for the persistence layer
pub struct MigrationRunner {
    pool: ConnectionPool,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Run all pending migrations
    pub async fn migrate_up(&self) -> Result<MigrationResult, PersistenceError> {
        let migrations = get_migrations();
        let mut applied = 0;
        let mut skipped = 0;

        self.ensure_migrations_table().await?;

        for migration in migrations {
            let checksum = migration.checksum();

            if let Some(recorded) = self.recorded_checksum(migration.name).await? {
                if recorded != checksum {
                    tracing::warn!(
                        migration = migration.name,
                        "Applied migration differs from the bundled version"
                    );
                }
                tracing::debug!("Migration '{}' already applied, skipping", migration.name);
                skipped += 1;
                continue;
            }

            tracing::info!("Applying migration: {}", migration.name);

            let backend = self.pool.backend();
            let rendered = migration
                .sql
                .replace("{auto_id}", backend.auto_increment_key())
                .replace("{if_not_exists}", backend.index_if_not_exists());

            for statement in split_statements(&rendered) {
                match sqlx::query(&statement).execute(self.pool.pool()).await {
                    Ok(_) => {}
                    Err(e) if is_duplicate_index(&e) => {
                        tracing::debug!(migration = migration.name, "Index already exists, skipping");
                    }
                    Err(e) => {
                        return Err(PersistenceError::Migration(format!(
                            "Failed to execute migration '{}': {}",
                            migration.name, e
                        )));
                    }
                }
            }

            self.record_migration(migration.name, &checksum).await?;

            tracing::info!("Migration '{}' applied successfully", migration.name);
            applied += 1;
        }

        Ok(MigrationResult { applied, skipped })
    }

    /// Get migration status
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, PersistenceError> {
        self.ensure_migrations_table().await?;

        let mut statuses = Vec::new();
        for migration in get_migrations() {
            let applied_at = self.get_migration_applied_at(migration.name).await?;
            statuses.push(MigrationStatus {
                name: migration.name.to_string(),
                applied: applied_at.is_some(),
                applied_at,
            });
        }

        Ok(statuses)
    }

    /// Ensure the migrations tracking table exists
    async fn ensure_migrations_table(&self) -> Result<(), PersistenceError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
                id {},
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at VARCHAR(40) NOT NULL,
                checksum VARCHAR(64) NOT NULL
            )",
            self.pool.backend().auto_increment_key()
        );

        sqlx::query(&sql)
            .execute(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to create migrations table: {}", e))
            })?;

        Ok(())
    }

    /// Checksum recorded for an applied migration, `None` if it has not run
    async fn recorded_checksum(&self, name: &str) -> Result<Option<String>, PersistenceError> {
        let sql = format!("SELECT checksum FROM {MIGRATIONS_TABLE} WHERE name = ?");
        let row = sqlx::query(&self.pool.sql(&sql))
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to check migration status: {}", e))
            })?;

        row.map(|row| row.try_get::<String, _>("checksum"))
            .transpose()
            .map_err(PersistenceError::from)
    }

    /// Get when a migration was applied
    async fn get_migration_applied_at(
        &self,
        name: &str,
    ) -> Result<Option<String>, PersistenceError> {
        let sql = format!("SELECT applied_at FROM {MIGRATIONS_TABLE} WHERE name = ?");
        let row = sqlx::query(&self.pool.sql(&sql))
            .bind(name)
            .fetch_optional(self.pool.pool())
            .await
            .map_err(|e| {
                PersistenceError::Migration(format!("Failed to get migration applied_at: {}", e))
            })?;

        row.map(|row| row.try_get::<String, _>("applied_at"))
            .transpose()
            .map_err(PersistenceError::from)
    }

    /// Record a migration as applied
    async fn record_migration(&self, name: &str, checksum: &str) -> Result<(), PersistenceError> {
        let now = chrono::Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO {MIGRATIONS_TABLE} (name, applied_at, checksum) VALUES (?, ?, ?)"
        );

        sqlx::query(&self.pool.sql(&sql))
            .bind(name)
            .bind(now)
            .bind(checksum)
            .execute(self.pool.pool())
            .await
            .map_err(|e| PersistenceError::Migration(format!("Failed to record migration: {}", e)))?;

        Ok(())
    }
}

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Number of migrations applied
    pub applied: usize,
    /// Number of migrations skipped (already applied)
    pub skipped: usize,
}

/// Status of a single migration
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Migration name
    pub name: String,
    /// Whether the migration has been applied
    pub applied: bool,
    /// When the migration was applied (if applied)
    pub applied_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_statements_drops_comments() {
        let statements = split_statements(MIGRATION_001_AGENT);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS agent"));
        assert!(statements.iter().all(|s| !s.contains("--")));
    }

    #[test]
    fn test_checksums_are_stable_and_distinct() {
        let migrations = get_migrations();
        assert_eq!(migrations[0].checksum(), migrations[0].checksum());
        assert_ne!(migrations[0].checksum(), migrations[1].checksum());
        assert_eq!(migrations[0].checksum().len(), 64);
    }

    #[tokio::test]
    async fn test_migrate_up_is_idempotent() {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        let runner = MigrationRunner::new(pool.clone());

        let first = runner.migrate_up().await.unwrap();
        assert_eq!(first.applied, 2);
        assert_eq!(first.skipped, 0);

        let second = runner.migrate_up().await.unwrap();
        assert_eq!(second.applied, 0);
        assert_eq!(second.skipped, 2);

        let status = runner.status().await.unwrap();
        assert!(status.iter().all(|s| s.applied && s.applied_at.is_some()));
    }

    #[tokio::test]
    async fn test_status_before_migrating() {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();
        let runner = MigrationRunner::new(pool);

        let status = runner.status().await.unwrap();
        assert_eq!(status.len(), 2);
        assert!(status.iter().all(|s| !s.applied));
    }

    #[tokio::test]
    async fn test_migrate_up_resumes_partially_applied_migration() {
        let pool = ConnectionPool::new("sqlite::memory:", 1, 5).await.unwrap();

        // Table and first index exist, but the run stopped before it was recorded
        let rendered = MIGRATION_001_AGENT
            .replace("{auto_id}", pool.backend().auto_increment_key())
            .replace("{if_not_exists}", "");
        for statement in split_statements(&rendered).iter().take(2) {
            sqlx::query(statement).execute(pool.pool()).await.unwrap();
        }

        let runner = MigrationRunner::new(pool.clone());
        let result = runner.migrate_up().await.unwrap();
        assert_eq!(result.applied, 2);

        let status = runner.status().await.unwrap();
        assert!(status.iter().all(|s| s.applied));
    }

    #[test]
    fn test_rendered_indexes_are_guarded() {
        let rendered = MIGRATION_002_WORKFLOWS.replace("{if_not_exists}", "IF NOT EXISTS ");
        assert!(split_statements(&rendered)
            .iter()
            .filter(|s| s.starts_with("CREATE INDEX"))
            .all(|s| s.starts_with("CREATE INDEX IF NOT EXISTS ")));
    }
}
