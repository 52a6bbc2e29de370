//! Fuzz target for relay line parsing.
//!
//! Tests that arbitrary bytes don't cause panics when parsed as relay traffic.

#![no_main]

use bedrock_idler::protocol::{RelayRequest, SessionEvent};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<SessionEvent>(data);
    let _ = serde_json::from_slice::<RelayRequest>(data);

    // Lines arrive as text from the socket
    if let Ok(s) = std::str::from_utf8(data) {
        for line in s.lines() {
            let _ = serde_json::from_str::<SessionEvent>(line.trim());
        }
    }
});
