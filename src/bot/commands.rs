//! Chat command dispatch.
//!
//! Matching is a case-insensitive substring search, and every command is
//! checked independently: one message can trigger several replies.

use super::state::{BotState, MAX_HEALTH};

/// A recognised chat command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    Ping,
    Help,
    Position,
    Time,
    Health,
    Greeting,
}

impl ChatCommand {
    /// All commands, in reply order.
    pub const ALL: [Self; 6] = [
        Self::Ping,
        Self::Help,
        Self::Position,
        Self::Time,
        Self::Health,
        Self::Greeting,
    ];

    /// Check a lower-cased message for this command.
    fn matches(self, lowered: &str) -> bool {
        match self {
            Self::Ping => lowered.contains("!ping"),
            Self::Help => lowered.contains("!help"),
            Self::Position => lowered.contains("!pos"),
            Self::Time => lowered.contains("!time"),
            Self::Health => lowered.contains("!health"),
            Self::Greeting => lowered.contains("hello bot") || lowered.contains("hi bot"),
        }
    }

    /// Build the reply text for this command.
    #[must_use]
    pub fn reply(self, state: &BotState) -> String {
        match self {
            Self::Ping => "🏓 Pong!".to_string(),
            Self::Help => "🤖 Commands: !ping, !pos, !time, !health, !help".to_string(),
            Self::Position => format!("📍 Position: {}", state.position.display_rounded()),
            Self::Time => format!("🕒 Time: {}", local_time()),
            Self::Health => format!("❤️ Health: {}/{MAX_HEALTH}", state.health),
            Self::Greeting => "👋 Hello there!".to_string(),
        }
    }
}

/// Find every command mentioned in `text`.
#[must_use]
pub fn parse(text: &str) -> Vec<ChatCommand> {
    let lowered = text.to_lowercase();
    ChatCommand::ALL
        .into_iter()
        .filter(|cmd| cmd.matches(&lowered))
        .collect()
}

/// Compute replies to a chat line.
///
/// Lines without a sender or text, and lines the bot sent itself, get none.
#[must_use]
pub fn dispatch(source_name: Option<&str>, text: Option<&str>, state: &BotState) -> Vec<String> {
    let (Some(source), Some(text)) = (source_name, text) else {
        return Vec::new();
    };
    if source == state.username {
        return Vec::new();
    }

    parse(text).into_iter().map(|cmd| cmd.reply(state)).collect()
}

fn local_time() -> String {
    chrono::Local::now().format("%-I:%M:%S %p").to_string()
}
