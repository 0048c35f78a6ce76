//! Language model provider interface

use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConfigError, ModelError, Result};
use crate::memory::MemorySnapshot;
use crate::prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod ollama;
pub mod openai;

use ollama::OllamaProvider;
use openai::OpenAIProvider;

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Model response
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub content: String,
    pub model: String,
    pub usage: TokenUsage,
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

/// Language model provider trait
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a chat completion
    async fn chat(&self, messages: &[Message]) -> ModelResult<ModelResponse>;

    /// Get model information
    fn model_info(&self) -> ModelInfo;
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub max_tokens: usize,
}

/// Build the provider named by `model.provider`
pub fn from_config(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let model = &config.model;

    match model.provider.as_str() {
        "openai" => {
            let api_key = config.api_key().ok_or_else(|| {
                ConfigError::MissingField("model.api_key (or OPENAI_API_KEY)".to_string())
            })?;
            let provider = match &model.base_url {
                Some(url) => {
                    OpenAIProvider::with_base_url(api_key, url.clone(), Some(model.name.clone()))
                }
                None => OpenAIProvider::new(api_key, Some(model.name.clone())),
            };
            Ok(Arc::new(provider.with_params(model.temperature, model.max_tokens)))
        }
        "ollama" => {
            let provider = OllamaProvider::new(
                model.base_url.clone(),
                config.api_key(),
                Some(model.name.clone()),
            );
            Ok(Arc::new(provider.with_params(model.temperature, model.max_tokens)))
        }
        unknown => {
            Err(ConfigError::Invalid(format!("Unknown model provider '{}'", unknown)).into())
        }
    }
}

/// Sends the persona prompt, the memory snapshot and one user message to a model
#[derive(Clone)]
pub struct CompletionClient {
    model: Arc<dyn LanguageModel>,
}

impl CompletionClient {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Build the two-message prompt for `user_message`
    pub fn build_messages(snapshot: &MemorySnapshot, user_message: &str) -> [Message; 2] {
        [
            Message::system(prompt::system_prompt(&snapshot.to_json())),
            Message::user(user_message),
        ]
    }

    pub async fn complete(
        &self,
        snapshot: &MemorySnapshot,
        user_message: &str,
    ) -> ModelResult<String> {
        let messages = Self::build_messages(snapshot, user_message);
        let response = self.model.chat(&messages).await?;

        tracing::debug!(
            "Completion from {} ({}): {} prompt / {} completion tokens",
            response.model,
            response.finish_reason.as_deref().unwrap_or("unfinished"),
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingModel {
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn chat(&self, messages: &[Message]) -> ModelResult<ModelResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(ModelResponse {
                content: "quack".to_string(),
                model: "mock".to_string(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            })
        }

        fn model_info(&self) -> ModelInfo {
            ModelInfo {
                provider: "mock".to_string(),
                model: "test".to_string(),
                max_tokens: 500,
            }
        }
    }

    #[test]
    fn test_from_config_selects_provider() {
        let mut config = Config::default();
        config.model.provider = "ollama".to_string();
        config.model.name = "llama3".to_string();
        let info = from_config(&config).unwrap().model_info();
        assert_eq!(info.provider, "ollama");
        assert_eq!(info.model, "llama3");

        config.model.provider = "openai".to_string();
        config.model.api_key = Some("test-key".to_string());
        assert_eq!(from_config(&config).unwrap().model_info().provider, "openai");

        config.model.provider = "palm".to_string();
        let err = from_config(&config).err().unwrap();
        assert!(err.to_string().contains("palm"));
    }

    #[test]
    fn test_message_creation() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, "user");
        assert_eq!(msg.content, "Hello");

        let sys = Message::system("System prompt");
        assert_eq!(sys.role, "system");
    }

    #[tokio::test]
    async fn test_complete_sends_system_then_user() {
        let model = Arc::new(RecordingModel { seen: Mutex::new(Vec::new()) });
        let client = CompletionClient::new(model.clone());

        let reply = client.complete(&MemorySnapshot::default(), "What is 2+2?").await.unwrap();
        assert_eq!(reply, "quack");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].len(), 2);
        assert_eq!(seen[0][0].role, "system");
        assert!(seen[0][0].content.contains("{}"));
        assert_eq!(seen[0][1], Message::user("What is 2+2?"));
    }
}
