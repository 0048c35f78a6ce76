//! Single-pass orchestration of one chat message
//!
//! A pass asks the model once. When the answer carries
//! [`ONCHAIN_SENTINEL`](crate::prompt::ONCHAIN_SENTINEL), the text after the
//! first occurrence is sent to the action endpoint, the exchange is logged,
//! and the model is asked a second time to fold the result into the final
//! reply. The second answer is never inspected for the sentinel.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::memory::{EntryKey, InteractionRecord, MemoryHandle, MemoryLog, MemorySnapshot};
use crate::model::{self, CompletionClient};
use crate::onchain::{self, ActionClient, OnChainClient};
use crate::prompt::{self, ONCHAIN_SENTINEL};

/// Reply text used when the completion endpoint fails
pub const COMPLETION_ERROR_TEXT: &str = "Error connecting to ChatGPT.";

/// What happened during the delegation step of a pass
#[derive(Debug, Clone, PartialEq)]
pub struct Delegation {
    /// Trimmed text after the sentinel
    pub request: String,
    /// Action result, or its failure text
    pub result: String,
    /// Key of the appended log entry; `None` when the append failed
    pub entry: Option<EntryKey>,
}

/// Result of one orchestration pass
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub delegation: Option<Delegation>,
}

/// Text following the first sentinel occurrence, trimmed
pub fn extract_action_request(text: &str) -> Option<&str> {
    text.find(ONCHAIN_SENTINEL)
        .map(|start| text[start + ONCHAIN_SENTINEL.len()..].trim())
}

/// Routes one user message through the model and, on request, the action endpoint
pub struct Orchestrator {
    completion: CompletionClient,
    onchain: Arc<dyn ActionClient>,
    memory: MemoryHandle,
}

impl Orchestrator {
    pub fn new(
        completion: CompletionClient,
        onchain: Arc<dyn ActionClient>,
        memory: MemoryHandle,
    ) -> Self {
        Self { completion, onchain, memory }
    }

    /// Wire the configured model, action endpoint and memory file.
    /// Must run inside a Tokio runtime; the memory actor is spawned here.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let model = model::from_config(config)?;
        let log = MemoryLog::load(&config.memory.file, config.memory.context_window).await?;

        Ok(Self::new(
            CompletionClient::new(model),
            Arc::new(OnChainClient::new(config.onchain.url.clone())),
            MemoryHandle::spawn(log),
        ))
    }

    pub fn memory(&self) -> &MemoryHandle {
        &self.memory
    }

    /// Run one pass for `user_message`. Failures of either endpoint become
    /// ordinary reply text; this never fails.
    pub async fn handle_message(&self, user_message: &str) -> TurnOutcome {
        tracing::info!("Handling message: {}", user_message);

        let first = self.complete(user_message).await;

        let request = extract_action_request(&first).map(str::to_string);
        let Some(request) = request else {
            return TurnOutcome { reply: first, delegation: None };
        };

        let result = match self.onchain.invoke(&request).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("OnChain API Error: {}", e);
                onchain::failure_text(&e).to_string()
            }
        };

        let record = InteractionRecord::new(user_message, request.as_str(), result.as_str());
        let entry = match self.memory.append(record).await {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::error!("Failed to record interaction: {}", e);
                None
            }
        };

        let follow_up = prompt::follow_up_message(&request, &result);
        let reply = self.complete(&follow_up).await;

        TurnOutcome {
            reply,
            delegation: Some(Delegation { request, result, entry }),
        }
    }

    async fn complete(&self, message: &str) -> String {
        let snapshot = match self.memory.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Memory unavailable, prompting without it: {}", e);
                MemorySnapshot::default()
            }
        };

        match self.completion.complete(&snapshot, message).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("ChatGPT Error: {}", e);
                COMPLETION_ERROR_TEXT.to_string()
            }
        }
    }
}
