use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::persistence::DataStore;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: String,
    pub backend: String,
}

pub struct HealthHandler {
    store: DataStore,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(store: DataStore) -> Self {
        Self {
            store,
            start_time: std::time::Instant::now(),
        }
    }

    /// Basic health check - returns 200 while the process is serving,
    /// with the database state reported alongside
    pub async fn health(&self) -> impl IntoResponse {
        let database = match self.store.health_check().await {
            Ok(()) => "ok",
            Err(e) => {
                tracing::warn!("Database health check failed: {}", e);
                "unavailable"
            }
        };

        let status = HealthStatus {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            checks: HealthChecks {
                database: database.to_string(),
                backend: self.store.backend().name().to_string(),
            },
        };

        (StatusCode::OK, Json(status))
    }

    /// Readiness check - returns 200 once the database answers queries
    pub async fn ready(&self) -> impl IntoResponse {
        match self.store.health_check().await {
            Ok(()) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "status": "ready",
                    "message": "Server is ready to accept requests"
                })),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Readiness check failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({
                        "status": "not_ready",
                        "message": "Database unavailable"
                    })),
                )
            }
        }
    }

    /// Liveness check - returns 200 if server is alive
    pub async fn live(&self) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "alive",
                "message": "Server is alive"
            })),
        )
    }
}
