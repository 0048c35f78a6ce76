//! OpenAI API provider implementation

use super::{LanguageModel, Message, ModelInfo, ModelResponse, ModelResult, TokenUsage};
use crate::error::ModelError;
use async_trait::async_trait;

pub struct OpenAIProvider {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model: Option<String>) -> Self {
        Self::with_config(async_openai::config::OpenAIConfig::new().with_api_key(api_key), model)
    }

    /// Provider against an OpenAI-compatible endpoint at `base_url`
    pub fn with_base_url(api_key: String, base_url: String, model: Option<String>) -> Self {
        let config = async_openai::config::OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url);
        Self::with_config(config, model)
    }

    fn with_config(config: async_openai::config::OpenAIConfig, model: Option<String>) -> Self {
        Self {
            client: async_openai::Client::with_config(config),
            model: model.unwrap_or_else(|| "gpt-4".to_string()),
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_params(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn convert_message(&self, msg: &Message) -> async_openai::types::ChatCompletionRequestMessage {
        use async_openai::types::*;

        match msg.role.as_str() {
            "system" => ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: msg.content.clone(),
                role: Role::System,
                name: None,
            }),
            _ => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                role: Role::User,
                name: None,
            }),
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAIProvider {
    async fn chat(&self, messages: &[Message]) -> ModelResult<ModelResponse> {
        use async_openai::types::*;

        let openai_messages: Vec<_> = messages.iter().map(|m| self.convert_message(m)).collect();

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(openai_messages)
            .temperature(self.temperature)
            .max_tokens(u16::try_from(self.max_tokens).unwrap_or(u16::MAX))
            .build()
            .map_err(|e| ModelError::Api(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ModelError::Api(format!("API request failed: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| ModelError::InvalidResponse("No choices in response".to_string()))?;

        let content = choice.message.content.clone().unwrap_or_default();

        let usage = if let Some(usage) = response.usage {
            TokenUsage {
                prompt_tokens: usage.prompt_tokens as usize,
                completion_tokens: usage.completion_tokens as usize,
                total_tokens: usage.total_tokens as usize,
            }
        } else {
            TokenUsage::default()
        };

        Ok(ModelResponse {
            content,
            model: response.model,
            usage,
            finish_reason: choice.finish_reason.as_ref().map(|r| format!("{:?}", r)),
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "openai".to_string(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_provider_creation() {
        let provider = OpenAIProvider::new("test-key".to_string(), None).with_params(0.7, 500);
        let info = provider.model_info();

        assert_eq!(info.provider, "openai");
        assert_eq!(info.model, "gpt-4");
        assert_eq!(info.max_tokens, 500);
    }

    #[test]
    fn test_message_conversion() {
        use async_openai::types::ChatCompletionRequestMessage;

        let provider = OpenAIProvider::new("test-key".to_string(), None);

        assert!(matches!(
            provider.convert_message(&Message::system("persona")),
            ChatCompletionRequestMessage::System(_)
        ));
        assert!(matches!(
            provider.convert_message(&Message::user("Hello")),
            ChatCompletionRequestMessage::User(_)
        ));
    }
}
