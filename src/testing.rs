//! Test framework for bot scenarios.
//!
//! Provides a scripted in-memory session and a harness that runs a
//! controller against it:
//!
//! ```ignore
//! let harness = BotHarness::start("BotHelper").await;
//! harness.probe.spawn_in(7);
//!
//! harness.probe.chat("Steve", "!ping");
//! harness.sync().await;
//!
//! assert_eq!(harness.probe.sent_texts(), vec!["🏓 Pong!"]);
//! ```
//!
//! Pair with `#[tokio::test(start_paused = true)]` so timers run on the
//! virtual clock.

use crate::bot::{BotConfig, BotHandle, BotStatus, Controller};
use crate::protocol::{ChatPayload, SessionConfig, SessionEvent};
use crate::session::{Session, SessionClient, SessionError, SessionLink};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A message the bot handed to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    /// When it was sent, on the tokio clock.
    pub at: Instant,
    pub payload: ChatPayload,
}

#[derive(Default)]
struct Recorded {
    connects: Vec<SessionConfig>,
    sent: Vec<SentMessage>,
    disconnects: usize,
    fail_connects: usize,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

/// In-memory [`SessionClient`] that records everything.
#[derive(Clone, Default)]
pub struct FakeSession {
    inner: Arc<Mutex<Recorded>>,
}

impl FakeSession {
    /// Create a session and the probe that inspects it.
    pub fn new() -> (Self, SessionProbe) {
        let session = Self::default();
        let probe = SessionProbe {
            inner: Arc::clone(&session.inner),
        };
        (session, probe)
    }
}

fn lock(inner: &Mutex<Recorded>) -> MutexGuard<'_, Recorded> {
    inner
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl SessionClient for FakeSession {
    type Link = FakeLink;

    async fn connect(&mut self, config: &SessionConfig) -> Result<Session<FakeLink>, SessionError> {
        let mut recorded = lock(&self.inner);
        recorded.connects.push(config.clone());

        if recorded.fail_connects > 0 {
            recorded.fail_connects -= 1;
            return Err(SessionError::Rejected("scripted failure".into()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        recorded.events = Some(tx);
        Ok(Session {
            link: FakeLink {
                inner: Arc::clone(&self.inner),
                open: true,
            },
            events: rx,
        })
    }
}

/// Outbound half of a [`FakeSession`].
pub struct FakeLink {
    inner: Arc<Mutex<Recorded>>,
    open: bool,
}

impl SessionLink for FakeLink {
    fn send(&mut self, payload: ChatPayload) -> Result<(), SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }
        lock(&self.inner).sent.push(SentMessage {
            at: Instant::now(),
            payload,
        });
        Ok(())
    }

    fn disconnect(&mut self) {
        self.open = false;
        lock(&self.inner).disconnects += 1;
    }
}

/// Test-side view of a [`FakeSession`].
#[derive(Clone)]
pub struct SessionProbe {
    inner: Arc<Mutex<Recorded>>,
}

impl SessionProbe {
    /// Deliver an event on the current session. Returns false without one.
    pub fn emit(&self, event: SessionEvent) -> bool {
        lock(&self.inner)
            .events
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// World start followed by spawn.
    pub fn spawn_in(&self, entity_id: u64) {
        self.emit(SessionEvent::WorldStart { entity_id });
        self.emit(SessionEvent::Spawn);
    }

    /// Deliver a chat line from `source`.
    pub fn chat(&self, source: &str, message: &str) {
        self.emit(SessionEvent::Chat {
            source_name: Some(source.to_string()),
            kind: "chat".to_string(),
            message: Some(message.to_string()),
        });
    }

    /// End the current event stream, as if the transport died.
    pub fn drop_stream(&self) {
        lock(&self.inner).events = None;
    }

    /// Make the next `n` connection requests fail.
    pub fn fail_next_connects(&self, n: usize) {
        lock(&self.inner).fail_connects = n;
    }

    /// Every connection request made so far.
    pub fn connects(&self) -> Vec<SessionConfig> {
        lock(&self.inner).connects.clone()
    }

    pub fn connect_count(&self) -> usize {
        lock(&self.inner).connects.len()
    }

    pub fn disconnect_count(&self) -> usize {
        lock(&self.inner).disconnects
    }

    /// Every message sent so far.
    pub fn sent(&self) -> Vec<SentMessage> {
        lock(&self.inner).sent.clone()
    }

    /// Text of every message sent so far.
    pub fn sent_texts(&self) -> Vec<String> {
        lock(&self.inner)
            .sent
            .iter()
            .map(|m| m.payload.message.clone())
            .collect()
    }

    /// Forget recorded messages.
    pub fn clear_sent(&self) {
        lock(&self.inner).sent.clear();
    }
}

/// Runs a seeded controller against a [`FakeSession`].
pub struct BotHarness {
    pub probe: SessionProbe,
    pub handle: BotHandle,
    task: JoinHandle<()>,
}

impl BotHarness {
    /// Start a controller for `username` and wait for its first connect.
    pub async fn start(username: &str) -> Self {
        let (session, probe) = FakeSession::new();
        Self::start_with(session, probe, username).await
    }

    /// Start against a session prepared by the caller.
    pub async fn start_with(session: FakeSession, probe: SessionProbe, username: &str) -> Self {
        let config = BotConfig {
            username: username.to_string(),
            ..BotConfig::default()
        };
        let (controller, handle) = Controller::new(session, config);
        let task = tokio::spawn(controller.with_seed(0x5eed).run());

        let harness = Self {
            probe,
            handle,
            task,
        };
        // The first control request is served after the initial connect
        harness.sync().await;
        harness
    }

    /// Wait until the controller has handled everything delivered so far.
    pub async fn sync(&self) -> Option<BotStatus> {
        self.handle.status().await
    }

    /// Whether the controller loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for BotHarness {
    fn drop(&mut self) {
        self.task.abort();
    }
}
