use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

use crate::agent::Orchestrator;
use crate::error::Result;
use crate::prompt::INTRO_MESSAGE;

/// Telegram hard limit for text messages, in UTF-16 code units
pub const TELEGRAM_MAX_LEN: usize = 4096;

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "meet OnChainDuck")]
    Start,
    #[command(description = "show this help")]
    Help,
}

async fn command_handler(bot: Bot, msg: Message, cmd: Command) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, INTRO_MESSAGE)
                .parse_mode(ParseMode::MarkdownV2)
                .await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string()).await?;
        }
    }
    Ok(())
}

// Every other text message runs one orchestration pass
async fn message_handler(bot: Bot, msg: Message, duck: Arc<Orchestrator>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let outcome = duck.handle_message(text).await;
    let chunks = split_message(&outcome.reply, TELEGRAM_MAX_LEN);
    if chunks.is_empty() {
        tracing::warn!("Empty reply for chat {}, nothing sent", msg.chat.id.0);
    }
    for chunk in chunks {
        bot.send_message(msg.chat.id, chunk).await?;
    }
    Ok(())
}

/// Split `text` into pieces of at most `max_len` UTF-16 code units (the unit
/// Telegram counts), preferring line boundaries. Whitespace-only pieces are
/// dropped.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for mut line in text.split_inclusive('\n') {
        loop {
            let line_len = line.encode_utf16().count();
            if current_len + line_len <= max_len {
                current.push_str(line);
                current_len += line_len;
                break;
            }
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            // a single line longer than the limit gets a hard cut
            let cut = hard_cut(line, max_len);
            chunks.push(line[..cut].to_string());
            line = &line[cut..];
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks.retain(|chunk| !chunk.trim().is_empty());
    chunks
}

// Byte offset of the longest prefix that fits in `max_len` UTF-16 units,
// never less than one char
fn hard_cut(line: &str, max_len: usize) -> usize {
    let mut units = 0;
    for (i, c) in line.char_indices() {
        units += c.len_utf16();
        if units > max_len {
            return if i == 0 { c.len_utf8() } else { i };
        }
    }
    line.len()
}

pub async fn run_telegram_bot(token: String, duck: Arc<Orchestrator>) -> Result<()> {
    let bot = Bot::new(token);

    // Fails fast on a bad token
    let me = bot.get_me().await?;

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        tracing::warn!("Could not register command list: {}", e);
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().filter_command::<Command>().endpoint(command_handler))
        .branch(Update::filter_message().endpoint(message_handler));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![duck])
        .enable_ctrlc_handler()
        .build();

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        wait_for_terminate().await;
        if let Ok(stopped) = shutdown.shutdown() {
            stopped.await;
        }
    });

    tracing::info!("OnChainDuck is live! (@{})", me.username());

    dispatcher.dispatch().await;

    tracing::info!("OnChainDuck stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            term.recv().await;
            tracing::info!("SIGTERM received, shutting down");
        }
        Err(e) => {
            tracing::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_terminate() {
    std::future::pending::<()>().await;
}
