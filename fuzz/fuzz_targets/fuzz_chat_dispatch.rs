//! Fuzz target for chat command dispatch.
//!
//! Dispatch must never panic, whatever the sender and text look like.

#![no_main]

use arbitrary::Arbitrary;
use bedrock_idler::bot::commands;
use bedrock_idler::{BotState, Position};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzChat {
    source_name: Option<String>,
    message: Option<String>,
    health: i32,
    position: (f64, f64, f64),
}

fuzz_target!(|chat: FuzzChat| {
    let mut state = BotState::new("BotHelper");
    state.health = chat.health;
    state.position = Position::new(chat.position.0, chat.position.1, chat.position.2);

    let replies = commands::dispatch(chat.source_name.as_deref(), chat.message.as_deref(), &state);
    assert!(replies.len() <= commands::ChatCommand::ALL.len());
    if chat.source_name.as_deref() == Some("BotHelper") {
        assert!(replies.is_empty());
    }
});
