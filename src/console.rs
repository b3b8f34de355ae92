//! Line-oriented console for the headless client.
//!
//! Commands are read one per line from stdin; every view change is printed
//! as a single status line.

use std::fmt::Write;

use crate::core::{ClientView, Command, Phase};
use crate::types::ResourceId;

pub const HELP: &str = "\
commands:
  start <ore>   begin mining <ore> (alias: mine)
  stop          stop mining
  show          print the current status line
  help          this text
  quit          disconnect and exit (alias: exit)";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Dispatch(Command),
    Show,
    Help,
    Quit,
    Empty,
    /// Known verb, wrong arguments. Carries the usage hint.
    Invalid(&'static str),
    Unknown(String),
}

pub fn parse(line: &str) -> ConsoleCommand {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return ConsoleCommand::Empty;
    };
    let args: Vec<&str> = words.collect();

    match (verb.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("start" | "mine", [ore]) => {
            ConsoleCommand::Dispatch(Command::StartActivity(ResourceId::from(*ore)))
        }
        ("start" | "mine", _) => ConsoleCommand::Invalid("usage: start <ore>"),
        ("stop", []) => ConsoleCommand::Dispatch(Command::StopActivity),
        ("stop", _) => ConsoleCommand::Invalid("usage: stop"),
        ("show" | "status", _) => ConsoleCommand::Show,
        ("help" | "?", _) => ConsoleCommand::Help,
        ("quit" | "exit", _) => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(verb.to_string()),
    }
}

/// Render `view` as one status line.
pub fn render(view: &ClientView) -> String {
    let game = match (view.phase(), &view.game) {
        (Phase::Ready, Some(game)) => game,
        (Phase::Loading, _) => return format!("[{}] loading game state...", view.connection),
        _ => return format!("[{}] waiting for server...", view.connection),
    };

    let mut line = format!(
        "[{}] {} Lv {} | XP {}/{} ({:.0}%)",
        view.connection,
        capitalize(&game.skill_type),
        game.level,
        game.xp_in_level,
        game.xp_needed,
        game.level_progress() * 100.0,
    );

    match &game.current_activity {
        Some(id) => {
            let name = game
                .resource(id.as_str())
                .map(|r| r.name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(id.as_str());
            let _ = write!(line, " | mining {} {:.0}%", name, view.mining_progress * 100.0);
        }
        None => line.push_str(" | idle"),
    }

    let held: Vec<String> = game
        .inventory
        .iter()
        .filter(|(_, qty)| **qty > 0)
        .map(|(id, qty)| format!("{id}:{qty}"))
        .collect();
    if !held.is_empty() {
        let _ = write!(line, " | inv {}", held.join(" "));
    }

    if let Some(note) = &view.notification {
        let _ = write!(line, " | {note}");
    }
    if view.level_up {
        line.push_str(" | *** LEVEL UP ***");
    }

    line
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
