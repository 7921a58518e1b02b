//! # genai Completion Backend
//!
//! [`CompletionService`] backed by rust-genai, for running the AI participant
//! against any provider genai supports (OpenAI, Anthropic, Gemini, DeepSeek, ...).
//! The provider is inferred by genai from the model name.
//!
//! Enabled with the `genai` feature and selected with `AI_BACKEND=genai`.

use super::completion::{CompletionError, CompletionService};
use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use genai::resolver::{AuthData, AuthResolver};
use genai::Client;
use lib_core::dto::{ChatTurn, Role};
use lib_core::Config;
use std::time::Duration;

/// Completion service using the genai multi-provider client.
pub struct GenAiCompletion {
    client: Client,
    model: String,
    timeout: Duration,
    options: ChatOptions,
}

impl GenAiCompletion {
    /// Build from configuration.
    ///
    /// `OPENROUTER_API_KEY`, when set, is handed to genai for every provider;
    /// otherwise genai reads the provider's own key variable (`OPENAI_API_KEY`, ...).
    pub fn from_config(config: &Config) -> Self {
        let client = match config.openrouter_api_key.clone() {
            Some(api_key) => {
                let auth_resolver = AuthResolver::from_resolver_fn(
                    move |_model_iden| -> Result<Option<AuthData>, genai::resolver::Error> {
                        Ok(Some(AuthData::from_single(api_key.clone())))
                    },
                );
                Client::builder().with_auth_resolver(auth_resolver).build()
            }
            None => Client::default(),
        };

        let options = ChatOptions::default()
            .with_temperature(0.7)
            .with_top_p(0.9)
            .with_max_tokens(9000);

        Self {
            client,
            model: config.ai_model.clone(),
            timeout: Duration::from_secs(config.ai_timeout_secs),
            options,
        }
    }
}

#[async_trait]
impl CompletionService for GenAiCompletion {
    async fn complete(&self, turns: &[ChatTurn]) -> Result<String, CompletionError> {
        let messages: Vec<ChatMessage> = turns
            .iter()
            .map(|turn| match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            })
            .collect();
        let chat_req = ChatRequest::new(messages);

        tracing::debug!("🤖 Calling AI API with model: {}", self.model);
        let exec = self.client.exec_chat(&self.model, chat_req, Some(&self.options));
        let chat_res = tokio::time::timeout(self.timeout, exec)
            .await
            .map_err(|_| CompletionError::Transport(format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| CompletionError::Transport(format!("AI API error: {:?}", e)))?;

        match chat_res.first_text() {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(CompletionError::EmptyResponse { status: 200 }),
        }
    }
}
