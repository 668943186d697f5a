//! Ollama LLM implementation

use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};
use serde::{Deserialize, Serialize};

use super::{BackendKind, ModelClient, ModelResponse};

/// Information about an available model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: u64,
    pub modified_at: String,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    models: Vec<ModelInfo>,
}

/// List available models from Ollama
pub async fn list_models(ollama_url: &str) -> Result<Vec<ModelInfo>> {
    let url = url::Url::parse(ollama_url)
        .with_context(|| format!("Invalid Ollama URL: {}", ollama_url))?;

    let client = reqwest::Client::new();
    let api_url = url.join("api/tags")?;

    let response: OllamaTagsResponse = client
        .get(api_url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response.models)
}

/// Ollama client wrapper
pub struct OllamaClient {
    client: Ollama,
    host: String,
}

impl OllamaClient {
    /// Create a new Ollama client from a URL such as `http://localhost:11434`
    pub fn new(url: &str) -> Result<Self> {
        let parsed =
            url::Url::parse(url).with_context(|| format!("Invalid Ollama URL: {}", url))?;

        let host = parsed
            .host_str()
            .context("Ollama URL has no host")?
            .to_string();
        let port = parsed.port().unwrap_or(11434);
        let base = format!("{}://{}", parsed.scheme(), host);

        Ok(Self {
            client: Ollama::builder().host(base.as_str()).port(port).build(),
            host: format!("{}:{}", base, port),
        })
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<ModelResponse> {
        let request = ChatMessageRequest::new(
            model.to_string(),
            vec![ChatMessage::user(prompt.to_string())],
        );

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .with_context(|| format!("Ollama request to {} failed", self.host))?;

        Ok(ModelResponse {
            content: response.message.content,
            model: model.to_string(),
            backend: BackendKind::Ollama,
            usage: None,
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Ollama
    }
}
