//! Model client backed by an MCP tool
//!
//! The model name selects the tool; the prompt is sent as its `prompt`
//! argument and the tool's text output becomes the response.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{BackendKind, ModelClient, ModelResponse};
use crate::mcp::{ToolCallOutcome, ToolRegistry};

pub struct ToolProtocolClient {
    registry: Arc<ToolRegistry>,
}

impl ToolProtocolClient {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl ModelClient for ToolProtocolClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<ModelResponse> {
        let arguments = serde_json::json!({ "prompt": prompt });

        match self.registry.execute_tool(model, arguments, None).await {
            ToolCallOutcome::Success { result, .. } => Ok(ModelResponse {
                content: result,
                model: model.to_string(),
                backend: BackendKind::Mcp,
                usage: None,
            }),
            ToolCallOutcome::Failure { error } => Err(anyhow!(error)),
        }
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Mcp
    }
}
