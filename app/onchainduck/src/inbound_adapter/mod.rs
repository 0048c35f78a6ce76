//! Chat transports feeding the orchestrator

pub mod telegram;
