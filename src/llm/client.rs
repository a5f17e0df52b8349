//! LLM client abstraction and provider selection.
//!
//! Every provider implements [`LlmClient`] against the same
//! provider-agnostic [`ChatPrompt`], so the orchestrator never sees a
//! wire format. Providers are selected once at startup from
//! configuration.

use async_trait::async_trait;
use futures::Stream;

use crate::llm::prompt::ChatPrompt;
use crate::types::{AppError, Result};
use crate::utils::config::LlmConfig;

/// Unified chat-completion interface over LLM backends.
///
/// A provider must surface its own errors as [`AppError::Llm`] rather
/// than silently returning empty text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single blocking completion for a prompt.
    async fn chat(&self, prompt: &ChatPrompt) -> Result<String>;

    /// Streaming completion; yields text deltas in order.
    async fn chat_stream(
        &self,
        prompt: &ChatPrompt,
    ) -> Result<Box<dyn Stream<Item = Result<String>> + Send + Unpin>>;

    fn model_name(&self) -> &str;
}

/// Provider variants selectable at startup.
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API and compatible servers (OpenRouter, vLLM, ...).
    OpenAi {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Local inference through an Ollama server.
    Ollama { base_url: String, model: String },
}

impl Provider {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        match config.provider.as_str() {
            "openai" => Ok(Provider::OpenAi {
                api_key: config.openai_api_key.clone().ok_or_else(|| {
                    AppError::InvalidInput(
                        "OPENAI_API_KEY is required for the openai provider".to_string(),
                    )
                })?,
                api_base: config.openai_api_base.clone(),
                model: config.openai_model.clone(),
            }),
            "ollama" => Ok(Provider::Ollama {
                base_url: config.ollama_url.clone(),
                model: config.ollama_model.clone(),
            }),
            other => Err(AppError::InvalidInput(format!(
                "unknown LLM provider '{}', expected 'openai' or 'ollama'",
                other
            ))),
        }
    }

    pub async fn create_client(&self) -> Result<Box<dyn LlmClient>> {
        match self {
            Provider::OpenAi {
                api_key,
                api_base,
                model,
            } => Ok(Box::new(super::openai::OpenAiClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone()).await?,
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAi { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}
