//! Protocol types shared between the controller and the session layer.
//!
//! The relay process that owns the Bedrock session speaks newline-delimited
//! JSON: the bot writes [`RelayRequest`]s and reads [`SessionEvent`]s.

use serde::{Deserialize, Serialize};

/// How the session authenticates with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Xbox Live authentication.
    #[default]
    Online,
    /// Unauthenticated (offline-mode servers only).
    Offline,
}

/// Parameters for a single connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Display name the bot logs in with.
    pub identity: String,
    #[serde(default)]
    pub auth_mode: AuthMode,
}

/// Last-known coordinates of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Coordinates rendered with one decimal place, comma separated.
    #[must_use]
    pub fn display_rounded(&self) -> String {
        format!("{:.1}, {:.1}, {:.1}", self.x, self.y, self.z)
    }
}

/// Events emitted by the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The world session started; carries the bot's own runtime entity id.
    WorldStart { entity_id: u64 },

    /// The bot spawned into the world.
    Spawn,

    /// An entity moved.
    Position {
        entity_id: u64,
        position: Position,
    },

    /// The bot's health changed.
    Health { value: i32 },

    /// A chat line arrived. Either field may be absent on system messages.
    Chat {
        #[serde(default)]
        source_name: Option<String>,
        #[serde(default = "default_chat_kind")]
        kind: String,
        #[serde(default)]
        message: Option<String>,
    },

    /// The server closed the session.
    Disconnect {
        #[serde(default)]
        reason: Option<String>,
    },

    /// The session reported an asynchronous failure.
    Error { message: String },
}

/// Outbound text packet.
///
/// A message starting with `/` is run as a command by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub kind: String,
    pub needs_translation: bool,
    pub source_name: String,
    pub xuid: String,
    pub platform_chat_id: String,
    pub filtered_message: String,
    pub message: String,
}

impl ChatPayload {
    /// Broadcast chat from `source_name`, recipient metadata left blank.
    pub fn chat(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: default_chat_kind(),
            needs_translation: false,
            source_name: source_name.into(),
            xuid: String::new(),
            platform_chat_id: String::new(),
            filtered_message: String::new(),
            message: message.into(),
        }
    }

    /// Whether the server will treat this message as a command.
    #[must_use]
    pub fn is_command(&self) -> bool {
        self.message.starts_with('/')
    }
}

/// Requests from the bot to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayRequest {
    /// Open the Bedrock session. Must be the first line on a connection.
    Connect { config: SessionConfig },

    /// Queue an outbound text packet.
    Send { payload: ChatPayload },

    /// Close the Bedrock session.
    Disconnect,
}

fn default_chat_kind() -> String {
    "chat".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let json = r#"{"event":"position","entity_id":7,"position":{"x":1.0,"y":64.5,"z":-3.25}}"#;
        let event: SessionEvent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(
            event,
            SessionEvent::Position {
                entity_id: 7,
                position: Position::new(1.0, 64.5, -3.25),
            }
        );

        let event: SessionEvent = serde_json::from_str(r#"{"event":"spawn"}"#).expect("spawn");
        assert_eq!(event, SessionEvent::Spawn);
    }

    #[test]
    fn test_chat_event_tolerates_missing_fields() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"event":"chat"}"#).expect("deserialize");
        assert_eq!(
            event,
            SessionEvent::Chat {
                source_name: None,
                kind: "chat".into(),
                message: None,
            }
        );

        let event: SessionEvent =
            serde_json::from_str(r#"{"event":"disconnect"}"#).expect("deserialize");
        assert_eq!(event, SessionEvent::Disconnect { reason: None });
    }

    #[test]
    fn test_relay_request_tagging() {
        let req = RelayRequest::Send {
            payload: ChatPayload::chat("BotHelper", "/afk 5"),
        };
        let json = serde_json::to_string(&req).expect("serialize");
        assert!(json.starts_with(r#"{"type":"send""#));
        assert!(json.contains(r#""needs_translation":false"#));

        let json = serde_json::to_string(&RelayRequest::Disconnect).expect("serialize");
        assert_eq!(json, r#"{"type":"disconnect"}"#);
    }

    #[test]
    fn test_auth_mode_defaults_to_online() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"host":"h","port":1,"identity":"me"}"#).expect("config");
        assert_eq!(config.auth_mode, AuthMode::Online);
    }

    #[test]
    fn test_payload_command_detection() {
        assert!(ChatPayload::chat("me", "/msg someone hi").is_command());
        assert!(!ChatPayload::chat("me", "hello /world").is_command());
    }

    #[test]
    fn test_position_rounding() {
        let pos = Position::new(12.345, 0.04, 100.0);
        assert_eq!(pos.display_rounded(), "12.3, 0.0, 100.0");
    }
}
