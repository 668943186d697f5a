//! LLM abstraction layer
//!
//! Every model provider implements [`ModelClient`]. [`ModelBackends`] owns one
//! lazily bound client per [`BackendKind`] and routes invocations to it.

mod anthropic;
mod backends;
mod ollama;
mod openai;
mod tool_protocol;

pub use anthropic::AnthropicClient;
pub use backends::ModelBackends;
pub use ollama::{list_models, ModelInfo, OllamaClient};
pub use openai::OpenAiClient;
pub use tool_protocol::ToolProtocolClient;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Category of execution target an agent is configured to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Local inference via an Ollama server
    Ollama,
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Tool execution through a connected MCP server
    Mcp,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Ollama,
        BackendKind::OpenAi,
        BackendKind::Anthropic,
        BackendKind::Mcp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Ollama => "ollama",
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Mcp => "mcp",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = PlatformError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(BackendKind::Ollama),
            "openai" => Ok(BackendKind::OpenAi),
            "anthropic" => Ok(BackendKind::Anthropic),
            "mcp" => Ok(BackendKind::Mcp),
            _ => Err(PlatformError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Response from a single model invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub content: String,
    pub model: String,
    pub backend: BackendKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// Trait for model backends
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a single prompt to `model` and return its reply
    async fn complete(&self, model: &str, prompt: &str) -> Result<ModelResponse>;

    /// Which backend this client talks to
    fn kind(&self) -> BackendKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_kind() {
        assert_eq!("ollama".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("anthropic".parse::<BackendKind>().unwrap(), BackendKind::Anthropic);
        assert_eq!("mcp".parse::<BackendKind>().unwrap(), BackendKind::Mcp);

        for near_miss in ["OpenAI", " anthropic ", "Ollama", ""] {
            let err = near_miss.parse::<BackendKind>().unwrap_err();
            assert!(matches!(err, PlatformError::UnsupportedBackend(ref s) if s == near_miss));
        }

        let err = "unsupported".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedBackend(ref s) if s == "unsupported"));
    }

    #[test]
    fn test_backend_kind_serializes_like_config_values() {
        for kind in BackendKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
