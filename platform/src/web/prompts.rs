//! Prompt store handlers

use std::path::PathBuf;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::api::{platform_error, ApiError};
use super::state::AppState;
use crate::error::PlatformError;
use crate::prompts::{CreatePrompt, Prompt, UpdatePrompt};

/// `?tags=a,b` matches any listed tag; `?q=` searches bodies
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub tags: Option<String>,
    pub q: Option<String>,
}

impl SearchParams {
    fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct PromptsListResponse {
    pub prompts: Vec<Prompt>,
    pub total: usize,
}

pub async fn search_prompts(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<PromptsListResponse> {
    let tags = params.tag_list();
    let prompts = state
        .prompts
        .read()
        .await
        .search(Some(tags.as_slice()), params.q.as_deref());
    let total = prompts.len();
    Json(PromptsListResponse { prompts, total })
}

pub async fn create_prompt(
    State(state): State<AppState>,
    Json(req): Json<CreatePrompt>,
) -> Result<(StatusCode, Json<Prompt>), ApiError> {
    if req.body.is_empty() {
        return Err(platform_error(PlatformError::InvalidRequest(
            "Prompt body must not be empty".into(),
        )));
    }
    let prompt = state.prompts.write().await.create(req);
    Ok((StatusCode::CREATED, Json(prompt)))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Prompt>, ApiError> {
    state
        .prompts
        .read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| platform_error(PlatformError::not_found("Prompt", id)))
}

pub async fn update_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePrompt>,
) -> Result<Json<Prompt>, ApiError> {
    state
        .prompts
        .write()
        .await
        .update(&id, req)
        .map(Json)
        .map_err(platform_error)
}

pub async fn delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.prompts.write().await.delete(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(platform_error(PlatformError::not_found("Prompt", id)))
    }
}

pub async fn prompt_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Prompt>>, ApiError> {
    let store = state.prompts.read().await;
    if store.get(&id).is_none() {
        return Err(platform_error(PlatformError::not_found("Prompt", id)));
    }
    Ok(Json(store.get_versions(&id).to_vec()))
}

#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    pub version: String,
}

pub async fn rollback_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RollbackRequest>,
) -> Result<Json<Prompt>, ApiError> {
    state
        .prompts
        .write()
        .await
        .rollback(&id, &req.version)
        .map(Json)
        .map_err(platform_error)
}

#[derive(Debug, Default, Deserialize)]
pub struct BackupRequest {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub path: PathBuf,
}

pub async fn backup_prompts(
    State(state): State<AppState>,
    body: Option<Json<BackupRequest>>,
) -> Result<Json<BackupResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    state
        .prompts
        .read()
        .await
        .backup(req.path.as_deref())
        .map(|path| Json(BackupResponse { path }))
        .map_err(platform_error)
}

#[derive(Debug, Deserialize)]
pub struct RestoreRequest {
    pub path: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct RestoreResponse {
    pub restored: usize,
}

pub async fn restore_prompts(
    State(state): State<AppState>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<RestoreResponse>, ApiError> {
    state
        .prompts
        .write()
        .await
        .restore(&req.path)
        .map(|restored| Json(RestoreResponse { restored }))
        .map_err(platform_error)
}
