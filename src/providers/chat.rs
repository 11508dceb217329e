//! AI completion client.
//!
//! Talks to any OpenAI-compatible chat-completion endpoint. JSON mode is
//! requested through `response_format` when the caller needs structured
//! output; token usage is passed through for cost accounting.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    CompletionProvider, CompletionRequest, CompletionResponse, ProviderError, TokenUsage,
};

/// Configuration for the AI completion client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Chat-completions endpoint base (e.g. https://api.example.com/v1).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// API key; read from the environment when absent in config.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Default model when a prompt does not name one.
    #[serde(default = "default_model")]
    pub default_model: String,
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            default_model: default_model(),
        }
    }
}

/// HTTP client for chat completions.
pub struct ChatClient {
    config: ChatConfig,
    client: Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatApiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatApiResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl ChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Connection(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<String, ProviderError> {
        if let Some(key) = &self.config.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        std::env::var("VERISCOPE_AI_API_KEY").map_err(|_| ProviderError::Credentials("ai"))
    }
}

#[async_trait]
impl CompletionProvider for ChatClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        budget: Duration,
    ) -> Result<CompletionResponse, ProviderError> {
        let key = self.api_key()?;
        let model = if request.model.is_empty() {
            &self.config.default_model
        } else {
            &request.model
        };

        let body = ChatApiRequest {
            model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        debug!("completion call: model={model} json_mode={}", request.json_mode);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(key)
            .timeout(budget)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, budget))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message: crate::utils::truncate_utf8(&message, 500).to_string(),
            });
        }

        let parsed: ChatApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::Parse("empty completion".to_string()));
        }

        let usage = parsed.usage.unwrap_or_default();
        Ok(CompletionResponse {
            text,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
        })
    }
}
