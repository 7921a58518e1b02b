//! # Completion Service
//!
//! The AI participant's replies come from a [`CompletionService`]. The default
//! implementation, [`OpenRouterClient`], posts the session's conversation memory
//! to an OpenAI-compatible chat completions endpoint.
//!
//! Failures never reach chat clients as errors. The pipeline turns every
//! [`CompletionError`] into one of two fixed fallback replies
//! (see [`CompletionError::fallback_reply`]).

use async_trait::async_trait;
use lib_core::dto::ChatTurn;
use lib_core::{AppError, Config, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Reply used when the service answered but without usable content.
pub const FALLBACK_NO_REPLY: &str = "🤖 Sorry, I couldn't respond.";

/// Reply used when the service could not be reached or its answer could not be read.
pub const FALLBACK_UNREACHABLE: &str =
    "🤖 Sorry, the AI is temporarily unreachable. Please try again later.";

/// Sampling parameters sent with every request.
const MAX_TOKENS: u32 = 9000;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.9;
const FREQUENCY_PENALTY: f32 = 0.5;
const PRESENCE_PENALTY: f32 = 0.6;

/// Why a completion call produced no reply text.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Network failure, timeout or client construction failure.
    #[error("completion request failed: {0}")]
    Transport(String),

    /// The response body was not JSON.
    #[error("completion response could not be decoded: {0}")]
    InvalidBody(String),

    /// The response was JSON but carried no reply text.
    #[error("completion response had no content (status {status})")]
    EmptyResponse { status: u16 },
}

impl CompletionError {
    /// Text posted on behalf of the AI participant when this error occurs.
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            CompletionError::EmptyResponse { .. } => FALLBACK_NO_REPLY,
            CompletionError::Transport(_) | CompletionError::InvalidBody(_) => FALLBACK_UNREACHABLE,
        }
    }
}

/// Produces the AI participant's next reply from a conversation.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `turns` (oldest first) and return the reply text.
    async fn complete(&self, turns: &[ChatTurn]) -> std::result::Result<String, CompletionError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

/// OpenAI-compatible chat completions client (OpenRouter by default).
#[derive(Clone, Debug)]
pub struct OpenRouterClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterClient {
    /// Build a client with a per-request timeout.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            url: url.into(),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.openrouter_url.clone(),
            config.openrouter_api_key.clone(),
            config.ai_model.clone(),
            Duration::from_secs(config.ai_timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    async fn complete(&self, turns: &[ChatTurn]) -> std::result::Result<String, CompletionError> {
        let body = CompletionRequest {
            model: &self.model,
            messages: turns,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
        };

        let mut request = self.http.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!(model = %self.model, turns = turns.len(), "Calling completion service");

        let response = request
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CompletionError::InvalidBody(e.to_string()))?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty());

        match content {
            Some(text) => Ok(text.to_string()),
            None => {
                warn!(
                    status = status.as_u16(),
                    body = %value,
                    "Completion response without content"
                );
                Err(CompletionError::EmptyResponse {
                    status: status.as_u16(),
                })
            }
        }
    }
}
