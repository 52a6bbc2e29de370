//! Bot state record.

use crate::protocol::Position;
use serde::Serialize;

/// Health reported by a full-health player.
pub const MAX_HEALTH: i32 = 20;

/// Token whispered on even-numbered idle announcements.
pub const FIRST_REPLY_TOKEN: &str = "Worked";
/// Token whispered on odd-numbered idle announcements.
pub const SECOND_REPLY_TOKEN: &str = "perfect";

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    /// Connection requested, waiting for spawn.
    Connecting,
    Connected,
}

/// Everything the bot knows about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct BotState {
    /// Display name, fixed for the controller's lifetime.
    pub username: String,
    pub position: Position,
    /// Stored as received; no local clamping.
    pub health: i32,
    /// Own runtime entity id, known once the world has started.
    pub entity_id: Option<u64>,
    pub connected: bool,
    /// Selects the next whispered reply token.
    pub reply_toggle: bool,
}

impl BotState {
    /// Create a fresh state for the given identity.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            position: Position::default(),
            health: MAX_HEALTH,
            entity_id: None,
            connected: false,
            reply_toggle: false,
        }
    }

    /// Restore defaults for a new connection attempt, keeping the name.
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.username));
    }

    /// Apply a position update if it refers to the bot itself.
    ///
    /// Returns whether the update was applied.
    pub fn apply_position(&mut self, entity_id: u64, position: Position) -> bool {
        if self.entity_id == Some(entity_id) {
            self.position = position;
            true
        } else {
            false
        }
    }

    /// Take the current reply token and flip the toggle.
    pub const fn next_reply_token(&mut self) -> &'static str {
        let token = if self.reply_toggle {
            SECOND_REPLY_TOKEN
        } else {
            FIRST_REPLY_TOKEN
        };
        self.reply_toggle = !self.reply_toggle;
        token
    }

    #[must_use]
    pub fn status(&self) -> BotStatus {
        BotStatus {
            connected: self.connected,
            username: self.username.clone(),
            position: self.position,
            health: self.health,
            entity_id: self.entity_id,
        }
    }
}

/// Point-in-time snapshot of the bot, for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotStatus {
    pub connected: bool,
    pub username: String,
    pub position: Position,
    pub health: i32,
    pub entity_id: Option<u64>,
}

impl BotStatus {
    /// One-line summary for the periodic status report.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.connected {
            format!(
                "Status: {} | Health: {} | Pos: {}",
                self.username,
                self.health,
                self.position.display_rounded()
            )
        } else {
            "Bot is not connected".to_string()
        }
    }
}
