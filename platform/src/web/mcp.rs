//! MCP connection and tool handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::api::{platform_error, ApiError};
use super::state::AppState;
use crate::error::PlatformError;
use crate::mcp::{McpTool, ToolCallOutcome, ToolConnection, Transport};

#[derive(Debug, Serialize)]
pub struct ConnectionsResponse {
    pub connections: Vec<ToolConnection>,
}

pub async fn list_connections(State(state): State<AppState>) -> Json<ConnectionsResponse> {
    Json(ConnectionsResponse {
        connections: state.tools.list_connections().await,
    })
}

#[derive(Debug, Deserialize)]
pub struct RegisterConnectionRequest {
    pub name: String,
    pub server_name: Option<String>,
    pub uri: String,
    #[serde(default)]
    pub transport: Transport,
    /// Connect right after registering
    #[serde(default)]
    pub connect: bool,
}

#[derive(Debug, Serialize)]
pub struct ConnectionStatus {
    pub name: String,
    pub registered: bool,
    pub connected: bool,
}

pub async fn register_connection(
    State(state): State<AppState>,
    Json(req): Json<RegisterConnectionRequest>,
) -> Result<(StatusCode, Json<ConnectionStatus>), ApiError> {
    if req.name.trim().is_empty() || req.uri.trim().is_empty() {
        return Err(platform_error(PlatformError::InvalidRequest(
            "Connection name and uri are required".into(),
        )));
    }

    let connection = ToolConnection {
        server_name: req.server_name.unwrap_or_else(|| req.name.clone()),
        name: req.name,
        uri: req.uri,
        transport: req.transport,
        is_connected: false,
    };
    let name = connection.name.clone();

    let registered = state.tools.register(connection).await;
    let connected = registered && req.connect && state.tools.connect(&name).await;

    let status = if registered {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    };
    Ok((
        status,
        Json(ConnectionStatus {
            name,
            registered,
            connected,
        }),
    ))
}

pub async fn remove_connection(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.tools.remove(&name).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(platform_error(PlatformError::not_found("Connection", name)))
    }
}

pub async fn connect(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConnectionStatus>, ApiError> {
    if state.tools.get_connection(&name).await.is_none() {
        return Err(platform_error(PlatformError::not_found("Connection", name)));
    }
    let connected = state.tools.connect(&name).await;
    Ok(Json(ConnectionStatus {
        name,
        registered: true,
        connected,
    }))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ConnectionStatus>, ApiError> {
    if state.tools.get_connection(&name).await.is_none() {
        return Err(platform_error(PlatformError::not_found("Connection", name)));
    }
    state.tools.disconnect(&name).await;
    Ok(Json(ConnectionStatus {
        name,
        registered: true,
        connected: false,
    }))
}

#[derive(Debug, Serialize)]
pub struct ToolsResponse {
    pub tools: Vec<McpTool>,
}

pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.list_tools().await,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteToolRequest {
    #[serde(default)]
    pub arguments: Value,
    pub connection_name: Option<String>,
}

/// Tool failures are reported in the body (`{"error": ...}`) with 200
pub async fn execute_tool(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    Json(req): Json<ExecuteToolRequest>,
) -> Json<ToolCallOutcome> {
    let arguments = if req.arguments.is_null() {
        Value::Object(Default::default())
    } else {
        req.arguments
    };
    let outcome = state
        .tools
        .execute_tool(&tool_name, arguments, req.connection_name.as_deref())
        .await;
    tracing::debug!(tool = %tool_name, success = outcome.is_success(), "Tool executed over HTTP");
    Json(outcome)
}
