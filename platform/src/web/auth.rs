//! Authentication middleware for the web server
//!
//! Bearer token authentication for API endpoints. Auth is optional: without a
//! configured token every request is allowed.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use super::state::AppState;

/// Validate `Authorization: Bearer <token>` against the configured token
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_token) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if token == expected_token => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Invalid bearer token provided for {}", request.uri().path());
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!(
                "Missing or malformed Authorization header for {}",
                request.uri().path()
            );
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
