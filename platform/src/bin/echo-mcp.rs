//! Echo MCP Server
//!
//! Minimal stdio MCP server. `echo` returns its `prompt` argument, `fail`
//! always answers with an error result. Useful as a local `mcp` backend and
//! for exercising live tool connections.

use anyhow::Result;
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone)]
pub struct EchoMcpServer {
    tool_router: ToolRouter<Self>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EchoParams {
    #[schemars(description = "Text to send back")]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct FailParams {
    #[schemars(description = "Error message to report")]
    pub reason: Option<String>,
}

#[tool_router]
impl EchoMcpServer {
    pub fn new() -> Self {
        Self {
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Return the prompt unchanged")]
    async fn echo(
        &self,
        Parameters(params): Parameters<EchoParams>,
    ) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(params.prompt)]))
    }

    #[tool(description = "Always report a tool error")]
    async fn fail(
        &self,
        Parameters(params): Parameters<FailParams>,
    ) -> Result<CallToolResult, McpError> {
        let reason = params.reason.unwrap_or_else(|| "requested failure".to_string());
        Ok(CallToolResult::error(vec![Content::text(reason)]))
    }
}

#[tool_handler]
impl rmcp::ServerHandler for EchoMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some("Echo server: `echo` returns its prompt, `fail` errors.".into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

impl Default for EchoMcpServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("echo_mcp=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting echo_mcp MCP Server");

    let service = EchoMcpServer::new()
        .serve(rmcp::transport::stdio())
        .await?;
    service.waiting().await?;

    Ok(())
}
