//! Persisted history commands.
//!
//! `history` prints the saved conversation as text or JSON without starting
//! a chat; `clear` erases it so the next session opens on the greeting.

use super::{build_session, format_turn, open_store};
use crate::config::Config;
use crate::error::Result;
use crate::session::SessionManager;
use colored::Colorize;
use std::io::Write;

/// Erase the persisted history
pub fn clear_history(config: &Config, storage_path: Option<&str>) -> Result<()> {
    let store = open_store(storage_path)?;
    let session = build_session(config, store);
    session.clear();
    println!("{}", "Conversation history cleared.".green());
    Ok(())
}

/// Print the persisted history without starting a chat
pub fn print_history(config: &Config, storage_path: Option<&str>, json: bool) -> Result<()> {
    let store = open_store(storage_path)?;
    let session = build_session(config, store);
    let restored = session.load_or_init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_history(&mut out, &session, config, restored, json)?;
    Ok(())
}

fn write_history(
    out: &mut impl Write,
    session: &SessionManager,
    config: &Config,
    restored: bool,
    json: bool,
) -> Result<()> {
    let turns = session.turns();

    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&turns)?)?;
        return Ok(());
    }

    if !restored {
        writeln!(out, "{}", "No saved conversation yet.".yellow())?;
        return Ok(());
    }

    for turn in &turns {
        writeln!(
            out,
            "{} {}\n",
            turn.created_at()
                .format("%Y-%m-%d %H:%M")
                .to_string()
                .dimmed(),
            format_turn(turn, &config.persona)
        )?;
    }
    writeln!(out, "{}", format!("{} turns", turns.len()).dimmed())?;
    Ok(())
}
