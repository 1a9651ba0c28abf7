//! # Agent Backend
//!
//! REST service that stores AI assistant ("agent") configurations in a
//! relational database and exposes CRUD plus a few lookup queries under `/api`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_backend::application::AgentService;
//! use agent_backend::adapters::health_handler::HealthHandler;
//! use agent_backend::persistence::DataStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = DataStore::in_memory().await?;
//!     let service = Arc::new(AgentService::new(store.agents().clone()));
//!     let health = Arc::new(HealthHandler::new(store.clone()));
//!
//!     let app = agent_backend::create_app(service, health);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: the agent record, its create/patch payloads and validation
//! - **Application**: `AgentService`, the use cases behind each endpoint
//! - **Persistence**: sqlx pool, migrations and the agent repository
//! - **Adapters**: axum handlers and error mapping
//! - **Config**: file, environment and CLI settings

pub mod adapters;
pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod persistence;
pub mod telemetry;

use crate::adapters::agent_handler;
use crate::adapters::health_handler::HealthHandler;
use crate::application::AgentService;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// Health checks live at the root, the agent API under `/api`. CORS accepts
/// any origin, method and header.
pub fn create_app(agent_service: Arc<AgentService>, health_handler: Arc<HealthHandler>) -> Router {
    let health_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    let router = health_router.nest("/api", agent_handler::router(agent_service));

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
