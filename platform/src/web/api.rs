//! REST API handlers: health, agents, workflows, metrics

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::state::AppState;
use crate::db::{CreateAgent, UpdateAgent};
use crate::error::PlatformError;
use crate::llm::BackendKind;
use crate::mcp::ConnectionMetrics;
use crate::orchestrator::{Agent, AgentDescriptor, PerformanceSnapshot, WorkflowResult};

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a core error onto an HTTP status
pub fn platform_error(err: PlatformError) -> ApiError {
    let status = match &err {
        PlatformError::NotFound { .. } | PlatformError::VersionNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        PlatformError::UnsupportedBackend(_) | PlatformError::InvalidRequest(_) => {
            StatusCode::BAD_REQUEST
        }
        PlatformError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        PlatformError::BackendError { .. } => StatusCode::BAD_GATEWAY,
        PlatformError::Backup(_) | PlatformError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!(error_type = err.label(), "Request failed: {}", err);
    }
    (status, Json(ErrorResponse::new(err.to_string())))
}

/// Anything that escaped the core as a plain `anyhow::Error`
pub fn internal_error(err: anyhow::Error) -> ApiError {
    platform_error(PlatformError::Storage(err))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
    pub backends: Vec<BackendKind>,
    pub mcp_runtime: bool,
    pub prompts: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        database: state.db.schema_version().is_ok(),
        backends: state.executor.backends().available_backends(),
        mcp_runtime: crate::mcp::ToolRegistry::runtime_available(),
        prompts: state.prompts.read().await.len(),
    })
}

// ============================================================================
// Agents
// ============================================================================

/// Pagination query parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AgentsListResponse {
    pub agents: Vec<Agent>,
    pub total: usize,
}

pub async fn list_agents(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<AgentsListResponse>, ApiError> {
    let agents = state
        .db
        .list_agents(params.limit, params.offset)
        .map_err(internal_error)?;
    let total = agents.len();
    Ok(Json(AgentsListResponse { agents, total }))
}

pub async fn create_agent(
    State(state): State<AppState>,
    Json(req): Json<CreateAgent>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(platform_error(PlatformError::InvalidRequest(
            "Agent name must not be empty".into(),
        )));
    }
    if let Some(config) = &req.config {
        if !config.is_object() {
            return Err(platform_error(PlatformError::InvalidRequest(
                "Agent config must be a JSON object".into(),
            )));
        }
    }

    let agent = state.db.create_agent(req).map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    state
        .db
        .get_agent(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| platform_error(PlatformError::not_found("Agent", id)))
}

pub async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateAgent>,
) -> Result<Json<Agent>, ApiError> {
    state
        .db
        .update_agent(&id, req)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| platform_error(PlatformError::not_found("Agent", id)))
}

pub async fn delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_agent(&id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(platform_error(PlatformError::not_found("Agent", id)))
    }
}

// ============================================================================
// Workflows
// ============================================================================

/// Agents come inline, by stored id, or both; the prompt comes inline or
/// from the prompt store.
#[derive(Debug, Deserialize)]
pub struct RunWorkflowRequest {
    #[serde(default)]
    pub agents: Vec<AgentDescriptor>,
    #[serde(default)]
    pub agent_ids: Vec<String>,
    pub prompt: Option<String>,
    pub prompt_id: Option<String>,
    pub prompt_version: Option<String>,
}

pub async fn run_workflow(
    State(state): State<AppState>,
    Json(req): Json<RunWorkflowRequest>,
) -> Result<Json<WorkflowResult>, ApiError> {
    let prompt = resolve_prompt(&state, &req).await.map_err(platform_error)?;

    let mut agents = req.agents;
    if !req.agent_ids.is_empty() {
        let stored = state
            .executor
            .descriptors_for(&req.agent_ids)
            .await
            .map_err(platform_error)?;
        agents.extend(stored);
    }

    state
        .executor
        .run_workflow(&agents, &prompt)
        .await
        .map(Json)
        .map_err(platform_error)
}

async fn resolve_prompt(state: &AppState, req: &RunWorkflowRequest) -> crate::error::Result<String> {
    if let Some(prompt) = &req.prompt {
        return Ok(prompt.clone());
    }

    let Some(id) = &req.prompt_id else {
        return Err(PlatformError::InvalidRequest(
            "Either prompt or prompt_id is required".into(),
        ));
    };

    let store = state.prompts.read().await;
    match &req.prompt_version {
        Some(version) => Ok(store.get_version(id, version)?.body.clone()),
        None => store
            .get(id)
            .map(|p| p.body.clone())
            .ok_or_else(|| PlatformError::not_found("Prompt", id.as_str())),
    }
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub performance: PerformanceSnapshot,
    pub tool_connections: Vec<ConnectionMetrics>,
}

pub async fn metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        performance: state.executor.performance().await,
        tool_connections: state.tools.metrics().await,
    })
}
