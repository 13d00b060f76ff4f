//! Interactive chat mode handler.
//!
//! Opens the history store, restores the session, and runs a readline-based
//! loop that submits each line to the turn dispatcher. Lines starting with
//! `/` are chat commands and never reach the companion.

use super::{build_session, describe_avatar, format_turn, open_store};
use crate::agent::{SendOutcome, TurnDispatcher};
use crate::config::Config;
use crate::error::Result;
use crate::persona::PersonaConfig;
use crate::providers::ProviderHandle;
use crate::session::SessionEvent;
use crate::storage::{HistoryStore, MemoryStore};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Commands understood by the chat prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Reset the conversation to the greeting
    Clear,
    /// Show available commands
    Help,
    /// Leave the chat
    Exit,
    /// A `/word` that is not a known command
    Unknown(String),
    /// Not a command: send to the companion
    None,
}

/// Parses a trimmed input line (case-insensitive)
pub fn parse_chat_command(input: &str) -> ChatCommand {
    if !input.starts_with('/') {
        return ChatCommand::None;
    }
    match input.to_lowercase().as_str() {
        "/clear" | "/reset" => ChatCommand::Clear,
        "/help" | "/?" => ChatCommand::Help,
        "/exit" | "/quit" | "/bye" => ChatCommand::Exit,
        _ => ChatCommand::Unknown(input.to_string()),
    }
}

/// Start interactive chat mode
///
/// # Arguments
///
/// * `config` - Global configuration (consumed)
/// * `storage_path` - Optional history database override
///
/// # Errors
///
/// Returns error if the terminal cannot be set up
pub async fn run_chat(config: Config, storage_path: Option<String>) -> Result<()> {
    tracing::info!("Starting interactive chat mode");

    let store: Arc<dyn HistoryStore> = match open_store(storage_path.as_deref()) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!("History database unavailable, history will not be saved: {:#}", e);
            eprintln!(
                "{}",
                "History database unavailable; this conversation will not be saved.".yellow()
            );
            Arc::new(MemoryStore::new())
        }
    };

    let session = build_session(&config, store);
    let mut events = session.subscribe();
    session.load_or_init();

    if !config.provider.has_usable_api_key() {
        eprintln!(
            "{}",
            "No API key configured. Set THANSIN_API_KEY to talk with the companion.".yellow()
        );
    }

    let provider = Arc::new(ProviderHandle::from_config(config.provider.clone()));
    let dispatcher = TurnDispatcher::from_config(&config, Arc::clone(&session), provider);
    let persona = &config.persona;

    let mut rl = DefaultEditor::new()?;

    print_welcome_banner(persona);
    for turn in session.turns() {
        println!("{}\n", format_turn(&turn, persona));
    }

    loop {
        announce_events(&mut events, persona);

        match rl.readline(&format!("{} ", "›".magenta())) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                match parse_chat_command(trimmed) {
                    ChatCommand::Exit => break,
                    ChatCommand::Help => {
                        print_help();
                        continue;
                    }
                    ChatCommand::Clear => {
                        session.clear();
                        println!("{}\n", "Conversation cleared.".green());
                        for turn in session.turns() {
                            println!("{}\n", format_turn(&turn, persona));
                        }
                        continue;
                    }
                    ChatCommand::Unknown(command) => {
                        eprintln!(
                            "{}",
                            format!("Unknown command: {} (type /help)", command).yellow()
                        );
                        continue;
                    }
                    ChatCommand::None => {}
                }

                if let Err(e) = rl.add_history_entry(trimmed) {
                    tracing::debug!("Failed to record readline history: {}", e);
                }

                println!("{}", format!("{} is typing...", persona.display_name).dimmed());
                match dispatcher.send(trimmed).await {
                    SendOutcome::Completed { reply, .. } => {
                        println!("{}\n", format_turn(&reply, persona));
                    }
                    SendOutcome::Ignored(reason) => {
                        tracing::debug!("Input ignored: {:?}", reason);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                tracing::error!("Readline error: {:?}", err);
                break;
            }
        }
    }

    println!("{}", "Bye bye ❤️".magenta());
    Ok(())
}

/// Prints avatar changes that arrived since the last prompt
fn announce_events(events: &mut broadcast::Receiver<SessionEvent>, persona: &PersonaConfig) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::AvatarChanged(avatar)) if !avatar.regenerating => {
                println!(
                    "{}",
                    format!(
                        "[{} avatar updated: {}]",
                        persona.name,
                        describe_avatar(&avatar.reference)
                    )
                    .dimmed()
                );
            }
            Ok(_) => {}
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} session events", skipped);
            }
            Err(_) => break,
        }
    }
}

fn print_welcome_banner(persona: &PersonaConfig) {
    println!();
    println!("{}", format!("🌸 {}", persona.display_name).magenta().bold());
    println!("{}", "Type a message and press Enter. /help for commands.".dimmed());
    println!();
}

fn print_help() {
    println!();
    println!("{}", "Chat commands".bold());
    println!("  {}   Start over from the greeting", "/clear".cyan());
    println!("  {}    Show this help", "/help".cyan());
    println!("  {}    Leave the chat", "/exit".cyan());
    println!();
}
