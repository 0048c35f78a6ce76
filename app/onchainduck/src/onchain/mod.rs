//! Client for the remote on-chain action endpoint

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde_json::json;

use crate::error::OnChainError;

/// Rendered into the prompt and the log when the endpoint carries no result
pub const NO_RESPONSE_TEXT: &str = "No response from OnChain API.";

/// Rendered into the prompt and the log when the endpoint cannot be reached
pub const CONNECTION_ERROR_TEXT: &str = "Error connecting to the OnChain API.";

/// Executes a free-text action request
#[async_trait]
pub trait ActionClient: Send + Sync {
    async fn invoke(&self, request: &str) -> Result<String, OnChainError>;
}

/// Text shown in place of a failed invocation
pub fn failure_text(err: &OnChainError) -> &'static str {
    match err {
        OnChainError::MissingResponse => NO_RESPONSE_TEXT,
        OnChainError::Status { .. } | OnChainError::Request(_) => CONNECTION_ERROR_TEXT,
    }
}

/// HTTP implementation posting `{ "message": ... }` as JSON
pub struct OnChainClient {
    client: Client,
    url: String,
}

impl OnChainClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl ActionClient for OnChainClient {
    async fn invoke(&self, request: &str) -> Result<String, OnChainError> {
        tracing::info!("Calling OnChain API: {}", request);

        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "message": request }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OnChainError::Status { status: status.as_u16(), body });
        }

        // Anything but a non-empty string `response` counts as no result.
        serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value.get("response")?.as_str().map(str::to_string))
            .filter(|text| !text.is_empty())
            .ok_or(OnChainError::MissingResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, headers, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(template: ResponseTemplate) -> (MockServer, OnChainClient) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        let client = OnChainClient::new(format!("{}/chat", mock_server.uri()));
        (mock_server, client)
    }

    #[tokio::test]
    async fn test_invoke_returns_response_field() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            // wiremock splits a comma-separated header into its values
            .and(headers("accept", vec!["application/json", "text/plain", "*/*"]))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "message": "transfer 1 token to X" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": "tx 0xabc sent" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OnChainClient::new(format!("{}/chat", mock_server.uri()));
        let result = client.invoke("transfer 1 token to X").await.unwrap();

        assert_eq!(result, "tx 0xabc sent");
    }

    #[tokio::test]
    async fn test_missing_response_field() {
        let (_server, client) =
            client_for(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" }))).await;

        let err = client.invoke("anything").await.unwrap_err();
        assert!(matches!(err, OnChainError::MissingResponse));
        assert_eq!(failure_text(&err), NO_RESPONSE_TEXT);
    }

    #[tokio::test]
    async fn test_empty_or_non_json_body_is_missing_response() {
        let (_server, client) =
            client_for(ResponseTemplate::new(200).set_body_json(json!({ "response": "" }))).await;
        assert!(matches!(client.invoke("x").await, Err(OnChainError::MissingResponse)));

        let (_server, client) =
            client_for(ResponseTemplate::new(200).set_body_string("plain text")).await;
        assert!(matches!(client.invoke("x").await, Err(OnChainError::MissingResponse)));
    }

    #[tokio::test]
    async fn test_error_status() {
        let (_server, client) =
            client_for(ResponseTemplate::new(502).set_body_string("bad gateway")).await;

        let err = client.invoke("anything").await.unwrap_err();
        assert!(matches!(err, OnChainError::Status { status: 502, .. }));
        assert_eq!(failure_text(&err), CONNECTION_ERROR_TEXT);
    }

    #[tokio::test]
    async fn test_network_error() {
        // Nothing listens on the discard port.
        let client = OnChainClient::new("http://127.0.0.1:9/chat");

        let err = client.invoke("anything").await.unwrap_err();
        assert!(matches!(err, OnChainError::Request(_)));
        assert_eq!(failure_text(&err), CONNECTION_ERROR_TEXT);
    }
}
