//! HTTP API
//!
//! JSON REST API over agents, teams, workflows, prompts and MCP connections. Every
//! route except `/api/health` sits behind the bearer-token middleware.

pub mod api;
pub mod auth;
pub mod mcp;
pub mod prompts;
pub mod state;
pub mod teams;

use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::PlatformConfig;
pub use state::AppState;

/// Start the web server and block until Ctrl-C
pub async fn serve(config: PlatformConfig) -> Result<()> {
    let state = AppState::build(&config).await?;
    let app = create_router(state.clone());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(
        auth = state.api_token.is_some(),
        "Starting API server on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown(&state, &config).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Flush a prompt backup if configured and close tool sessions
async fn shutdown(state: &AppState, config: &PlatformConfig) {
    if config.prompts.backup_on_shutdown {
        match state.prompts.read().await.backup(None) {
            Ok(path) => tracing::info!("Prompt backup written to {}", path.display()),
            Err(e) => tracing::error!("Prompt backup on shutdown failed: {}", e),
        }
    }
    state.tools.close_all().await;
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        // Agents
        .route("/agents", get(api::list_agents).post(api::create_agent))
        .route(
            "/agents/:id",
            get(api::get_agent)
                .patch(api::update_agent)
                .delete(api::delete_agent),
        )
        // Teams
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route(
            "/teams/:id",
            get(teams::get_team)
                .put(teams::update_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        // Workflows
        .route("/workflows/run", post(api::run_workflow))
        .route("/metrics", get(api::metrics))
        // Prompts
        .route(
            "/prompts",
            get(prompts::search_prompts).post(prompts::create_prompt),
        )
        .route("/prompts/backup", post(prompts::backup_prompts))
        .route("/prompts/restore", post(prompts::restore_prompts))
        .route(
            "/prompts/:id",
            get(prompts::get_prompt)
                .patch(prompts::update_prompt)
                .delete(prompts::delete_prompt),
        )
        .route("/prompts/:id/versions", get(prompts::prompt_versions))
        .route("/prompts/:id/rollback", post(prompts::rollback_prompt))
        // MCP
        .route(
            "/mcp/connections",
            get(mcp::list_connections).post(mcp::register_connection),
        )
        .route(
            "/mcp/connections/:name",
            axum::routing::delete(mcp::remove_connection),
        )
        .route("/mcp/connections/:name/connect", post(mcp::connect))
        .route("/mcp/connections/:name/disconnect", post(mcp::disconnect))
        .route("/mcp/tools", get(mcp::list_tools))
        .route("/mcp/tools/:name/execute", post(mcp::execute_tool))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let api_routes = Router::new()
        .route("/health", get(api::health_check))
        .merge(protected);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
