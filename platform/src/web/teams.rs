//! Team handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::api::{internal_error, platform_error, ApiError, PaginationParams};
use super::state::AppState;
use crate::db::{CreateTeam, Team, UpdateTeam};
use crate::error::PlatformError;

#[derive(Debug, Serialize)]
pub struct TeamsListResponse {
    pub teams: Vec<Team>,
    pub total: usize,
}

fn check_rules(rules: Option<&serde_json::Value>) -> Result<(), ApiError> {
    match rules {
        Some(rules) if !rules.is_object() => Err(platform_error(PlatformError::InvalidRequest(
            "Orchestration rules must be a JSON object".into(),
        ))),
        _ => Ok(()),
    }
}

pub async fn list_teams(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<TeamsListResponse>, ApiError> {
    let teams = state
        .db
        .list_teams(params.limit, params.offset)
        .map_err(internal_error)?;
    let total = teams.len();
    Ok(Json(TeamsListResponse { teams, total }))
}

pub async fn create_team(
    State(state): State<AppState>,
    Json(req): Json<CreateTeam>,
) -> Result<(StatusCode, Json<Team>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(platform_error(PlatformError::InvalidRequest(
            "Team name must not be empty".into(),
        )));
    }
    check_rules(req.orchestration_rules.as_ref())?;

    let team = state.db.create_team(req).map_err(internal_error)?;
    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Team>, ApiError> {
    state
        .db
        .get_team(&id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| platform_error(PlatformError::not_found("Team", id)))
}

/// Partial update; omitted fields keep their stored values
pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateTeam>,
) -> Result<Json<Team>, ApiError> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(platform_error(PlatformError::InvalidRequest(
            "Team name must not be empty".into(),
        )));
    }
    check_rules(req.orchestration_rules.as_ref())?;

    state
        .db
        .update_team(&id, req)
        .map_err(internal_error)?
        .map(Json)
        .ok_or_else(|| platform_error(PlatformError::not_found("Team", id)))
}

pub async fn delete_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.db.delete_team(&id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(platform_error(PlatformError::not_found("Team", id)))
    }
}
