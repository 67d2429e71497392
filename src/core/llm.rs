use crate::config::LLMConfig;
use crate::core::errors::{RecommendError, RecommendResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat-completion seam used by the collection loop.
///
/// Implementations return the raw assistant text for the full conversation, or a
/// `Transport` error when no usable response was obtained.
#[async_trait]
pub trait SuggestionEngine: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> RecommendResult<String>;
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
pub struct LLMClient {
    client: Client,
    api_key: String,
    settings: LLMConfig,
}

impl LLMClient {
    pub fn new(api_key: String, settings: LLMConfig) -> RecommendResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            settings,
        })
    }

    pub async fn chat_with_format(
        &self,
        messages: &[ChatMessage],
        response_format: Option<ResponseFormat>,
    ) -> RecommendResult<String> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            response_format,
        };

        tracing::info!(
            "[LLMClient] Sending request with {} messages in history",
            messages.len()
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("[LLMClient] HTTP request failed: {}", e);
                RecommendError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(
                "[LLMClient] API returned error status {}: {}",
                status,
                error_text
            );
            return Err(RecommendError::Transport(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let chat_response = response.json::<ChatResponse>().await.map_err(|e| {
            tracing::warn!("[LLMClient] Failed to decode response body: {}", e);
            RecommendError::Transport(format!("Response decode error: {}", e))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                tracing::warn!("[LLMClient] Response carried no message content");
                RecommendError::transport("response has no choices[0].message.content")
            })
    }
}

#[async_trait]
impl SuggestionEngine for LLMClient {
    async fn complete(&self, messages: &[ChatMessage]) -> RecommendResult<String> {
        self.chat_with_format(messages, Some(ResponseFormat::JsonObject))
            .await
    }
}
