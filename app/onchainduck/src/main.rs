mod cli;

use std::sync::Arc;

use cli::{Cli, Commands};
use colored::Colorize;
use onchainduck::inbound_adapter::telegram::run_telegram_bot;
use onchainduck::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = if let Some(config_path) = &cli.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(provider) = &cli.provider {
        config.model.provider = provider.clone();
    }
    if let Some(model) = &cli.model {
        config.model.name = model.clone();
    }
    if let Some(memory_file) = &cli.memory_file {
        config.memory.file = memory_file.clone();
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => handle_run(config).await?,
        Commands::Ask { message } => handle_ask(&message, config).await?,
        Commands::Init => handle_init()?,
        Commands::Doctor => handle_doctor(&config).await?,
    }

    Ok(())
}

async fn handle_run(config: Config) -> anyhow::Result<()> {
    let token = config.bot_token()?;
    let duck = Orchestrator::from_config(&config).await?;

    tracing::info!(
        "Starting OnChainDuck with {} model {}",
        config.model.provider,
        config.model.name
    );

    run_telegram_bot(token, Arc::new(duck)).await?;
    Ok(())
}

async fn handle_ask(message: &str, config: Config) -> anyhow::Result<()> {
    let duck = Orchestrator::from_config(&config).await?;
    let outcome = duck.handle_message(message).await;

    if let Some(delegation) = &outcome.delegation {
        println!("{} {}", "on-chain request:".dimmed(), delegation.request);
        println!("{} {}", "on-chain result:".dimmed(), delegation.result);
    }
    println!("{}", outcome.reply);

    Ok(())
}

fn handle_init() -> anyhow::Result<()> {
    let config_path = Config::user_config_path()
        .unwrap_or_else(|| std::path::PathBuf::from(".onchainduck/config.yaml"));

    if config_path.exists() {
        println!("{} {} already exists, leaving it unchanged", "!".yellow(), config_path.display());
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Config::init_template().save_to_file(&config_path)?;

    println!("{} Configuration saved to: {}", "✓".green(), config_path.display());
    println!("\nSet TELEGRAM_BOT_TOKEN and OPENAI_API_KEY, then run:");
    println!("  onchainduck run");

    Ok(())
}

async fn handle_doctor(config: &Config) -> anyhow::Result<()> {
    println!("OnChainDuck Health Check\n");

    println!("{} Binary version: {}", "✓".green(), onchainduck::VERSION);

    match config.bot_token() {
        Ok(_) => println!("{} Telegram bot token configured", "✓".green()),
        Err(_) => {
            println!("{} Telegram bot token not found", "✗".red());
            println!("  Set TELEGRAM_BOT_TOKEN or telegram.bot_token");
        }
    }

    match onchainduck::model::from_config(config) {
        Ok(model) => {
            let info = model.model_info();
            println!(
                "{} Model: {} via {} (max {} tokens, temperature {})",
                "✓".green(),
                info.model,
                info.provider,
                info.max_tokens,
                config.model.temperature
            );
        }
        Err(e) => println!("{} Model: {}", "✗".red(), e),
    }

    println!("{} OnChain endpoint: {}", "✓".green(), config.onchain.url);

    match MemoryLog::load(&config.memory.file, config.memory.context_window).await {
        Ok(log) => println!(
            "{} Memory: {} entries in {}",
            "✓".green(),
            log.len(),
            log.path().display()
        ),
        Err(e) => println!("{} Memory: {}", "✗".red(), e),
    }

    match config.memory.context_window {
        Some(window) => println!("  Context window: last {} entries", window),
        None => println!("  Context window: whole log"),
    }

    Ok(())
}
