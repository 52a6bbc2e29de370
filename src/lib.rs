//! bedrock-idler: an idle bot for Bedrock servers
//!
//! Connects through a session relay, announces itself as idle on a fixed
//! cycle, answers a handful of chat commands, and reconnects after drops.

// Error documentation is deferred - the errors are self-explanatory from types
#![allow(clippy::missing_errors_doc)]

pub mod bot;
pub mod cli;
pub mod client;
pub mod protocol;
pub mod session;
pub mod testing;

pub use bot::{BotConfig, BotError, BotHandle, BotState, BotStatus, Controller};
pub use cli::Cli;
pub use client::{RelayClient, RelayLink, default_relay_path};
pub use protocol::{AuthMode, ChatPayload, Position, RelayRequest, SessionConfig, SessionEvent};
pub use session::{Session, SessionClient, SessionError, SessionLink};
pub use testing::{BotHarness, FakeSession, SentMessage, SessionProbe};
