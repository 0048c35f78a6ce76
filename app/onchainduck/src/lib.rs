// OnChainDuck - A Telegram assistant for on-chain actions
//
// Library entry point exposing public API

pub mod agent;
pub mod config;
pub mod error;
pub mod inbound_adapter;
pub mod memory;
pub mod model;
pub mod onchain;
pub mod prompt;

// Re-export commonly used types
pub use agent::{Orchestrator, TurnOutcome};
pub use config::Config;
pub use error::{DuckError, Result};
pub use memory::{InteractionRecord, MemoryHandle, MemoryLog};
pub use model::{CompletionClient, LanguageModel, ModelResponse};
pub use onchain::{ActionClient, OnChainClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::agent::{Orchestrator, TurnOutcome};
    pub use crate::config::Config;
    pub use crate::error::{DuckError, Result};
    pub use crate::memory::{InteractionRecord, MemoryHandle, MemoryLog};
    pub use crate::model::{CompletionClient, LanguageModel, ModelResponse};
    pub use crate::onchain::{ActionClient, OnChainClient};
}
