//! Database connection pool management

use crate::persistence::error::PersistenceError;
use sqlx::{any::AnyPoolOptions, AnyPool};
use std::borrow::Cow;
use std::time::Duration;

/// Database backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    /// SQLite database
    Sqlite,
    /// PostgreSQL database
    Postgres,
    /// MySQL database
    Mysql,
}

impl DatabaseBackend {
    /// Detect the database backend from a connection URL
    pub fn from_url(url: &str) -> Result<Self, PersistenceError> {
        if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(Self::Postgres)
        } else if url.starts_with("mysql:") || url.starts_with("mariadb:") {
            Ok(Self::Mysql)
        } else {
            Err(PersistenceError::Connection(format!(
                "Unsupported database URL format. Expected sqlite://, postgres://, or mysql://. Got: {}",
                url.split(':').next().unwrap_or("unknown")
            )))
        }
    }

    /// Get the backend name for display
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sqlite => "SQLite",
            Self::Postgres => "PostgreSQL",
            Self::Mysql => "MySQL",
        }
    }

    /// Column definition for an auto-assigned integer primary key
    pub fn auto_increment_key(&self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Postgres => "BIGSERIAL PRIMARY KEY",
            Self::Mysql => "BIGINT PRIMARY KEY AUTO_INCREMENT",
        }
    }

    /// Guard placed after `CREATE INDEX`; empty where the syntax is missing
    pub fn index_if_not_exists(&self) -> &'static str {
        match self {
            Self::Sqlite | Self::Postgres => "IF NOT EXISTS ",
            Self::Mysql => "",
        }
    }

    /// Whether `INSERT ... RETURNING` is available
    pub fn supports_returning(&self) -> bool {
        !matches!(self, Self::Mysql)
    }

    /// Rewrite `?` placeholders into the backend's bind syntax.
    ///
    /// PostgreSQL wants `$1, $2, ...`; the others take `?` as written.
    /// Question marks inside single-quoted literals are left alone.
    pub fn rewrite_placeholders<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        if *self != Self::Postgres || !sql.contains('?') {
            return Cow::Borrowed(sql);
        }

        let mut out = String::with_capacity(sql.len() + 16);
        let mut index = 0;
        let mut in_literal = false;
        for c in sql.chars() {
            match c {
                '\'' => {
                    in_literal = !in_literal;
                    out.push(c);
                }
                '?' if !in_literal => {
                    index += 1;
                    out.push('$');
                    out.push_str(&index.to_string());
                }
                _ => out.push(c),
            }
        }
        Cow::Owned(out)
    }
}

/// Whether the URL names a private in-memory SQLite database
fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

/// Connection pool wrapper with backend information
pub struct ConnectionPool {
    pool: AnyPool,
    backend: DatabaseBackend,
}

impl ConnectionPool {
    /// Create a new connection pool from a database URL
    ///
    /// # Arguments
    ///
    /// * `url` - Database connection URL (sqlite://, postgres://, mysql://)
    /// * `max_connections` - Maximum number of connections in the pool
    /// * `connect_timeout_secs` - Connection timeout in seconds
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> Result<Self, PersistenceError> {
        // Install default drivers for sqlx::any
        sqlx::any::install_default_drivers();

        let backend = DatabaseBackend::from_url(url)?;

        // Every connection to an in-memory SQLite database opens a fresh,
        // empty database, so the pool must hold exactly one and never drop it.
        let options = if is_sqlite_memory(url) {
            tracing::debug!("In-memory SQLite detected, pinning pool to a single connection");
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(max_connections)
        };

        tracing::info!(
            "Connecting to {} database with max {} connections",
            backend.name(),
            max_connections
        );

        let pool = options
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;

        tracing::info!("Successfully connected to {} database", backend.name());

        Ok(Self { pool, backend })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Get the database backend type
    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    /// SQL text with placeholders adapted to this pool's backend
    pub fn sql<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        self.backend.rewrite_placeholders(sql)
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| PersistenceError::Connection(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl Clone for ConnectionPool {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            backend: self.backend,
        }
    }
}
