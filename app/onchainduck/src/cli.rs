//! CLI interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "onchainduck")]
#[command(version, about = "A Telegram assistant that relays chats to a language model and delegates on-chain actions", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Model provider to use (openai, ollama)
    #[arg(short = 'p', long)]
    pub provider: Option<String>,

    /// Specific model to use (e.g., gpt-4, llama3)
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Memory state file
    #[arg(long, value_name = "FILE")]
    pub memory_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the Telegram bot (default)
    Run,

    /// Run one message through the assistant and print the reply
    Ask {
        /// Message to send
        message: String,
    },

    /// Write the default configuration file
    Init,

    /// Check installation and configuration
    Doctor,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
