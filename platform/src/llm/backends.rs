//! Backend routing with lazy per-backend binding

use std::sync::{Arc, OnceLock};

use anyhow::Context;

use super::{
    list_models, AnthropicClient, BackendKind, ModelClient, ModelInfo, ModelResponse,
    OllamaClient, OpenAiClient, ToolProtocolClient,
};
use crate::config::LlmSettings;
use crate::error::{PlatformError, Result};
use crate::mcp::ToolRegistry;

type Slot = OnceLock<Option<Arc<dyn ModelClient>>>;

/// One lazily bound client per backend kind.
///
/// A client binds on first use and only when its settings are present. The
/// outcome, bound or not, is cached for the life of the process.
pub struct ModelBackends {
    settings: LlmSettings,
    tools: Option<Arc<ToolRegistry>>,
    ollama: Slot,
    openai: Slot,
    anthropic: Slot,
    mcp: Slot,
}

impl ModelBackends {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            settings,
            tools: None,
            ollama: OnceLock::new(),
            openai: OnceLock::new(),
            anthropic: OnceLock::new(),
            mcp: OnceLock::new(),
        }
    }

    /// Route `mcp` invocations through this registry
    pub fn with_tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tools = Some(registry);
        self
    }

    /// Bind a client up front, bypassing the settings for its kind
    pub fn with_client(self, client: Arc<dyn ModelClient>) -> Self {
        let _ = self.slot(client.kind()).set(Some(client));
        self
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    /// Send `prompt` to `model` on the given backend
    pub async fn invoke(&self, kind: BackendKind, model: &str, prompt: &str) -> Result<ModelResponse> {
        let client = self
            .client(kind)
            .ok_or(PlatformError::BackendUnavailable(kind))?;

        tracing::debug!(backend = %kind, model = %model, "Invoking model");

        client
            .complete(model, prompt)
            .await
            .map_err(|e| PlatformError::BackendError {
                backend: kind,
                message: format!("{:#}", e),
            })
    }

    /// Kinds whose client is (or can be) bound
    pub fn available_backends(&self) -> Vec<BackendKind> {
        BackendKind::ALL
            .into_iter()
            .filter(|kind| self.client(*kind).is_some())
            .collect()
    }

    /// Models installed on the configured Ollama server
    pub async fn list_local_models(&self) -> anyhow::Result<Vec<ModelInfo>> {
        let host = self
            .settings
            .ollama_host
            .as_deref()
            .context("Ollama host is not configured")?;
        list_models(host).await
    }

    fn slot(&self, kind: BackendKind) -> &Slot {
        match kind {
            BackendKind::Ollama => &self.ollama,
            BackendKind::OpenAi => &self.openai,
            BackendKind::Anthropic => &self.anthropic,
            BackendKind::Mcp => &self.mcp,
        }
    }

    fn client(&self, kind: BackendKind) -> Option<Arc<dyn ModelClient>> {
        self.slot(kind).get_or_init(|| self.bind(kind)).clone()
    }

    fn bind(&self, kind: BackendKind) -> Option<Arc<dyn ModelClient>> {
        let client: Option<Arc<dyn ModelClient>> = match kind {
            BackendKind::Ollama => match non_empty(&self.settings.ollama_host) {
                Some(host) => match OllamaClient::new(host) {
                    Ok(client) => Some(Arc::new(client)),
                    Err(e) => {
                        tracing::warn!(backend = %kind, "Failed to initialize client: {:#}", e);
                        None
                    }
                },
                None => None,
            },
            BackendKind::OpenAi => non_empty(&self.settings.openai_api_key).map(|key| {
                Arc::new(OpenAiClient::new(key, self.settings.openai_base_url.clone()))
                    as Arc<dyn ModelClient>
            }),
            BackendKind::Anthropic => non_empty(&self.settings.anthropic_api_key).map(|key| {
                Arc::new(AnthropicClient::new(
                    key,
                    self.settings.anthropic_base_url.clone(),
                    self.settings.anthropic_max_tokens,
                )) as Arc<dyn ModelClient>
            }),
            BackendKind::Mcp => self
                .tools
                .as_ref()
                .filter(|_| ToolRegistry::runtime_available())
                .map(|registry| {
                    Arc::new(ToolProtocolClient::new(registry.clone())) as Arc<dyn ModelClient>
                }),
        };

        match client {
            Some(_) => tracing::debug!(backend = %kind, "Model backend bound"),
            None => tracing::info!(backend = %kind, "Model backend not configured"),
        }
        client
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
