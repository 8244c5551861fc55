//! HTTP surface of the registry.
//!
//! | Method | Path | Purpose |
//! |---|---|---|
//! | GET | `/health` | liveness + store connectivity |
//! | GET | `/stats` | agent / client counts |
//! | POST | `/register` | register or re-register an agent |
//! | POST | `/register_client` | register a client against an agent |
//! | GET | `/lookup/{id}` | resolve an agent id or client name |
//! | GET | `/list` | agent id → URL |
//! | GET | `/clients` | client name → liveness marker |
//! | DELETE | `/clients/{client_name}` | remove a client |
//! | GET | `/search` | filter agents by id text, capabilities, tags |
//! | GET | `/agents/{agent_id}` | full agent view |
//! | PUT | `/agents/{agent_id}/status` | partial status update |
//! | DELETE | `/agents/{agent_id}` | remove an agent and its clients |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use agentcy_common::{
    AgentDeleted, AgentView, ClientDeleted, Confirmation, HealthResponse, LookupResponse,
    RegisterAgentRequest, RegisterClientRequest, SearchParams, StatsResponse, StatusUpdate,
    ValidationError,
};

use crate::error::RegistryError;
use crate::state::AppState;

type SharedState = State<Arc<AppState>>;

/// Build the registry router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/register", post(register))
        .route("/register_client", post(register_client))
        .route("/lookup/{id}", get(lookup))
        .route("/list", get(list))
        .route("/clients", get(clients))
        .route("/clients/{client_name}", delete(delete_client))
        .route("/search", get(search))
        .route("/agents/{agent_id}", get(agent).delete(delete_agent))
        .route("/agents/{agent_id}/status", put(update_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Unwrap a JSON body, turning any rejection into a validation error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RegistryError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()).into())
}

async fn health(State(state): SharedState) -> Json<HealthResponse> {
    Json(state.health().await)
}

async fn stats(State(state): SharedState) -> Json<StatsResponse> {
    Json(state.stats().await)
}

async fn register(
    State(state): SharedState,
    payload: Result<Json<RegisterAgentRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, RegistryError> {
    let registration = body(payload)?.validate()?;
    let agent = state.register(registration).await;
    Ok(Json(Confirmation::success(format!(
        "Agent {} registered",
        agent.agent_id
    ))))
}

async fn register_client(
    State(state): SharedState,
    payload: Result<Json<RegisterClientRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, RegistryError> {
    let registration = body(payload)?.validate()?;
    let client = state.register_client(registration).await?;
    Ok(Json(Confirmation::success(format!(
        "Client {} registered with agent {}",
        client.client_name, client.agent_id
    ))))
}

async fn lookup(
    State(state): SharedState,
    Path(id): Path<String>,
) -> Result<Json<LookupResponse>, RegistryError> {
    Ok(Json(state.lookup(&id).await?))
}

async fn list(State(state): SharedState) -> Json<BTreeMap<String, String>> {
    Json(state.agent_urls().await)
}

async fn clients(State(state): SharedState) -> Json<BTreeMap<String, String>> {
    Json(state.clients().await)
}

async fn search(
    State(state): SharedState,
    Query(params): Query<SearchParams>,
) -> Json<Vec<AgentView>> {
    let query = params.into_query();
    Json(state.search(&query).await)
}

async fn agent(
    State(state): SharedState,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentView>, RegistryError> {
    Ok(Json(state.agent(&agent_id).await?))
}

async fn update_status(
    State(state): SharedState,
    Path(agent_id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<AgentView>, RegistryError> {
    let update = body(payload)?;
    Ok(Json(state.update_status(&agent_id, update).await?))
}

async fn delete_agent(
    State(state): SharedState,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentDeleted>, RegistryError> {
    let removed_clients = state.delete_agent(&agent_id).await?;
    Ok(Json(AgentDeleted {
        status: "deleted".to_string(),
        agent_id,
        removed_clients,
    }))
}

async fn delete_client(
    State(state): SharedState,
    Path(client_name): Path<String>,
) -> Result<Json<ClientDeleted>, RegistryError> {
    state.delete_client(&client_name).await?;
    Ok(Json(ClientDeleted {
        status: "deleted".to_string(),
        client_name,
    }))
}
