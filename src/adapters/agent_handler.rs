//! REST API handlers for agents
//!
//! Routes are mounted under `/api`:
//!
//! | Method | Path                              | Result            |
//! |--------|-----------------------------------|-------------------|
//! | GET    | `/agents`                         | 200 all agents    |
//! | POST   | `/agents`                         | 201 created agent |
//! | GET    | `/agents/search?name=…`           | 200 name matches  |
//! | GET    | `/agents/status/:status`          | 200 status matches|
//! | GET    | `/agents/workflow/:workflow_id`   | 200 linked agents |
//! | GET    | `/agents/:id`                     | 200 / 404         |
//! | PUT    | `/agents/:id`                     | 200 / 404         |
//! | DELETE | `/agents/:id`                     | 204 / 404         |
//! | HEAD   | `/agents/:id`                     | 200 / 404         |

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::adapters::error::ApiError;
use crate::application::AgentService;
use crate::domain::{Agent, AgentPatch, NewAgent};
use crate::persistence::PersistenceError;

/// Shared state for agent handlers
#[derive(Clone)]
pub struct AgentApiState {
    pub service: Arc<AgentService>,
}

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

/// Agent routes, relative to the `/api` prefix
pub fn router(service: Arc<AgentService>) -> Router {
    Router::new()
        .route("/agents", get(list_agents).post(create_agent))
        .route("/agents/search", get(search_agents))
        .route("/agents/status/:status", get(list_agents_by_status))
        .route("/agents/workflow/:workflow_id", get(list_agents_by_workflow))
        .route(
            "/agents/:id",
            get(get_agent)
                .put(update_agent)
                .delete(delete_agent)
                .head(check_agent_exists),
        )
        .with_state(AgentApiState { service })
}

/// GET /api/agents
pub async fn list_agents(
    State(state): State<AgentApiState>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(state.service.find_all().await?))
}

/// GET /api/agents/:id
pub async fn get_agent(
    State(state): State<AgentApiState>,
    Path(id): Path<i64>,
) -> Result<Json<Agent>, ApiError> {
    state
        .service
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| PersistenceError::agent_not_found(id).into())
}

/// GET /api/agents/status/:status
pub async fn list_agents_by_status(
    State(state): State<AgentApiState>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(state.service.find_by_status(&status).await?))
}

/// GET /api/agents/search?name=…
pub async fn search_agents(
    State(state): State<AgentApiState>,
    Query(query): Query<NameQuery>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(state.service.find_by_name(&query.name).await?))
}

/// GET /api/agents/workflow/:workflow_id
pub async fn list_agents_by_workflow(
    State(state): State<AgentApiState>,
    Path(workflow_id): Path<i64>,
) -> Result<Json<Vec<Agent>>, ApiError> {
    Ok(Json(state.service.find_by_workflow(workflow_id).await?))
}

/// POST /api/agents
pub async fn create_agent(
    State(state): State<AgentApiState>,
    Json(payload): Json<NewAgent>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let created = state.service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/agents/:id
pub async fn update_agent(
    State(state): State<AgentApiState>,
    Path(id): Path<i64>,
    Json(patch): Json<AgentPatch>,
) -> Result<Json<Agent>, ApiError> {
    Ok(Json(state.service.update(id, patch).await?))
}

/// DELETE /api/agents/:id
pub async fn delete_agent(
    State(state): State<AgentApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// HEAD /api/agents/:id
pub async fn check_agent_exists(
    State(state): State<AgentApiState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.service.exists(id).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
