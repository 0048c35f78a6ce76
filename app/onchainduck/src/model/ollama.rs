use crate::error::ModelError;
use crate::model::{LanguageModel, Message, ModelInfo, ModelResponse, ModelResult, TokenUsage};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

pub struct OllamaProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    default_model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OllamaProvider {
    pub fn new(base_url: Option<String>, api_key: Option<String>, default_model: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            api_key,
            default_model: default_model.unwrap_or_else(|| "llama3".to_string()),
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_params(mut self, temperature: f32, max_tokens: usize) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
    done_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

#[async_trait]
impl LanguageModel for OllamaProvider {
    async fn chat(&self, messages: &[Message]) -> ModelResult<ModelResponse> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        tracing::debug!("Ollama Chat: URL={}, Model={}", url, self.default_model);

        let mut request = self.client.post(&url).json(&json!({
            "model": self.default_model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens
            }
        }));

        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ModelError::Api(format!("Ollama API error ({}): {}", status, error_text)));
        }

        let ollama_resp: OllamaResponse = response.json().await?;

        Ok(ModelResponse {
            content: ollama_resp.message.content,
            model: self.default_model.clone(),
            usage: TokenUsage {
                prompt_tokens: ollama_resp.prompt_eval_count,
                completion_tokens: ollama_resp.eval_count,
                total_tokens: ollama_resp.prompt_eval_count + ollama_resp.eval_count,
            },
            finish_reason: ollama_resp.done_reason.or_else(|| Some("stop".to_string())),
        })
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: "ollama".to_string(),
            model: self.default_model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ollama_chat_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(json!({
                "model": "llama3",
                "stream": false,
                "options": { "num_predict": 500 },
                "messages": [
                    { "role": "system", "content": "persona" },
                    { "role": "user", "content": "hi" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "llama3",
                "message": { "role": "assistant", "content": "quack" },
                "done": true,
                "prompt_eval_count": 12,
                "eval_count": 3
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let provider = OllamaProvider::new(Some(mock_server.uri()), Some("secret".to_string()), None);
        let response = provider
            .chat(&[Message::system("persona"), Message::user("hi")])
            .await
            .unwrap();

        assert_eq!(response.content, "quack");
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_ollama_chat_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&mock_server)
            .await;

        let provider = OllamaProvider::new(Some(mock_server.uri()), None, None);
        let err = provider.chat(&[Message::user("hi")]).await.unwrap_err();

        assert!(err.to_string().contains("model not loaded"));
    }
}
