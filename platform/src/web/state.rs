//! Shared application state

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::PlatformConfig;
use crate::db::Database;
use crate::llm::ModelBackends;
use crate::mcp::ToolRegistry;
use crate::orchestrator::WorkflowExecutor;
use crate::prompts::PromptStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Agent persistence
    pub db: Database,
    /// Versioned prompts (in-memory)
    pub prompts: Arc<RwLock<PromptStore>>,
    /// MCP connections and tools
    pub tools: Arc<ToolRegistry>,
    /// Workflow executor, owns the model backends
    pub executor: Arc<WorkflowExecutor>,
    /// Bearer token for /api routes; `None` disables auth
    pub api_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db: Database,
        prompts: PromptStore,
        tools: Arc<ToolRegistry>,
        executor: WorkflowExecutor,
        api_token: Option<String>,
    ) -> Self {
        Self {
            db,
            prompts: Arc::new(RwLock::new(prompts)),
            tools,
            executor: Arc::new(executor),
            api_token: api_token.filter(|t| !t.is_empty()).map(Arc::from),
        }
    }

    /// Construct every service from configuration.
    ///
    /// Opens the database, registers configured MCP connections (connecting
    /// the ones marked `connect_on_start`) and restores prompts if asked to.
    pub async fn build(config: &PlatformConfig) -> Result<Self> {
        let db = Database::open_at(config.database.resolve_path()?)?;

        let tools = Arc::new(ToolRegistry::new());
        if !config.mcp.connections.is_empty() {
            let connected = tools.bootstrap(&config.mcp.connections).await;
            tracing::info!(
                configured = config.mcp.connections.len(),
                connected,
                "MCP connections initialized"
            );
        }

        let backends =
            Arc::new(ModelBackends::new(config.llm.clone()).with_tool_registry(tools.clone()));
        let executor = WorkflowExecutor::new(backends)
            .with_store(Arc::new(db.clone()))
            .with_mode(config.workflow.mode);

        let mut prompts = PromptStore::new().with_backup_dir(&config.prompts.backup_dir);
        if let Some(path) = &config.prompts.restore_from {
            match prompts.restore(path) {
                Ok(count) => tracing::info!(prompts = count, "Prompt store restored"),
                Err(e) => tracing::warn!("Starting with an empty prompt store: {}", e),
            }
        }

        Ok(Self::new(
            db,
            prompts,
            tools,
            executor,
            config.server.api_token.clone(),
        ))
    }
}
