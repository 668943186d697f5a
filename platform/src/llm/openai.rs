//! OpenAI chat completions client

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BackendKind, ModelClient, ModelResponse, TokenUsage};

const OPENAI_API_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl OpenAiClient {
    /// `base_url` overrides the public endpoint (proxies, compatible servers)
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| OPENAI_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            api_key: api_key.into(),
            base_url,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<ModelResponse> {
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {status}: {body_text}");
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI response")?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("OpenAI response contained no choices")?;

        Ok(ModelResponse {
            content,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
            backend: BackendKind::OpenAi,
            usage: parsed.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }

    fn kind(&self) -> BackendKind {
        BackendKind::OpenAi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_complete_reads_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "model": "gpt-4o-mini",
                    "choices": [{"message": {"role": "assistant", "content": "hello back"}}],
                    "usage": {"prompt_tokens": 3, "completion_tokens": 2}
                }"#,
            )
            .create_async()
            .await;

        let client = OpenAiClient::new("sk-test", Some(server.url()));
        let response = client.complete("gpt-4o-mini", "hello").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "hello back");
        assert_eq!(response.backend, BackendKind::OpenAi);
        assert_eq!(response.usage.unwrap().completion_tokens, 2);
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body(r#"{"error": {"message": "bad key"}}"#)
            .create_async()
            .await;

        let client = OpenAiClient::new("sk-wrong", Some(format!("{}/", server.url())));
        let err = client.complete("gpt-4o-mini", "hello").await.unwrap_err();

        assert!(err.to_string().contains("401"));
    }
}
