//! The bot controller.
//!
//! Owns the bot's state, consumes session events, runs the idle-announcement
//! cycle and answers chat commands. Everything happens on one task: events,
//! fired timers and control requests are handled one at a time, to
//! completion, so the state needs no locking.

pub mod commands;
mod state;
mod timers;

pub use state::{BotState, BotStatus, MAX_HEALTH, Phase};
pub use timers::{Timer, TimerId, Timers};

use crate::protocol::{AuthMode, ChatPayload, SessionConfig, SessionEvent};
use crate::session::{Session, SessionClient, SessionError, SessionLink};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

/// Default server host.
pub const DEFAULT_HOST: &str = "play.donutsmp.net";
/// Default Bedrock server port.
pub const DEFAULT_PORT: u16 = 19132;
/// Default display name.
pub const DEFAULT_USERNAME: &str = "BotHelper";

/// Recipient of the idle private message.
pub const IDLE_RECIPIENT: &str = "elytrashulker";
/// Range of idle durations, in minutes.
pub const IDLE_MINUTES: RangeInclusive<u8> = 1..=60;
/// Chat sent before a deliberate disconnect.
pub const FAREWELL_MESSAGE: &str = "🤖 Bot going offline. Goodbye!";

// The server expects the idle steps spaced and in order
/// Delay from the idle command to the chat notice.
pub const IDLE_CHAT_DELAY: Duration = Duration::from_millis(500);
/// Delay from the idle command to the private message.
pub const IDLE_WHISPER_DELAY: Duration = Duration::from_millis(1000);
/// Delay from spawn to the first idle announcement.
pub const KICKOFF_DELAY: Duration = Duration::from_secs(2);
/// Delay before reconnecting after an unexpected disconnect.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);
/// Time given to the farewell message before the session is closed.
pub const FAREWELL_GRACE: Duration = Duration::from_secs(1);
/// Period of the scheduled idle announcement.
pub const IDLE_CYCLE_PERIOD: Duration = Duration::from_secs(20 * 60);
/// Period of the operator status report.
pub const STATUS_PERIOD: Duration = Duration::from_secs(60);
/// Time the process waits after requesting shutdown before exiting.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Errors surfaced by the controller. All of them are logged, never fatal.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("connection failed: {0}")]
    Connection(#[source] SessionError),

    #[error("client error: {0}")]
    Protocol(String),

    #[error("failed to send message: {0}")]
    Send(#[source] SessionError),
}

/// Connection settings for the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth_mode: AuthMode,
}

impl BotConfig {
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            host: self.host.clone(),
            port: self.port,
            identity: self.username.clone(),
            auth_mode: self.auth_mode,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            auth_mode: AuthMode::Online,
        }
    }
}

/// Requests from a [`BotHandle`] to its controller.
#[derive(Debug)]
enum Control {
    Shutdown,
    Status(oneshot::Sender<BotStatus>),
    AnnounceIdle,
}

/// Cloneable handle to a running controller.
#[derive(Debug, Clone)]
pub struct BotHandle {
    control: mpsc::UnboundedSender<Control>,
}

impl BotHandle {
    /// Request a deliberate disconnect. The controller stops once done.
    pub fn shutdown(&self) {
        let _ = self.control.send(Control::Shutdown);
    }

    /// Ask for a status snapshot. `None` once the controller has stopped.
    pub async fn status(&self) -> Option<BotStatus> {
        let (tx, rx) = oneshot::channel();
        self.control.send(Control::Status(tx)).ok()?;
        rx.await.ok()
    }

    /// Run an idle announcement now, outside the regular cycle.
    pub fn announce_idle(&self) {
        let _ = self.control.send(Control::AnnounceIdle);
    }
}

/// Pick an idle duration in minutes.
pub fn idle_minutes(rng: &mut impl Rng) -> u8 {
    rng.gen_range(IDLE_MINUTES)
}

/// Drives one bot identity against a session client.
pub struct Controller<C: SessionClient> {
    client: C,
    config: BotConfig,
    state: BotState,
    phase: Phase,
    session: Option<Session<C::Link>>,
    timers: Timers,
    rng: StdRng,
    control: mpsc::UnboundedReceiver<Control>,
    control_closed: bool,
    shutting_down: bool,
    finished: bool,
}

impl<C: SessionClient> Controller<C> {
    /// Create a controller and the handle that controls it.
    pub fn new(client: C, config: BotConfig) -> (Self, BotHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let controller = Self {
            client,
            state: BotState::new(config.username.clone()),
            config,
            phase: Phase::Disconnected,
            session: None,
            timers: Timers::new(),
            rng: StdRng::from_entropy(),
            control: control_rx,
            control_closed: false,
            shutting_down: false,
            finished: false,
        };
        (controller, BotHandle { control: control_tx })
    }

    /// Replace the random source used for idle durations.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub const fn state(&self) -> &BotState {
        &self.state
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Connect, then process events until shutdown completes.
    pub async fn run(mut self) {
        self.connect().await;

        let start = Instant::now();
        let mut status_tick = interval_at(start + STATUS_PERIOD, STATUS_PERIOD);
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut idle_cycle = interval_at(start + IDLE_CYCLE_PERIOD, IDLE_CYCLE_PERIOD);
        idle_cycle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.finished {
            tokio::select! {
                biased;

                event = next_event(&mut self.session) => match event {
                    Some(event) => self.handle_event(event),
                    None => self.handle_session_end(),
                },

                timer = self.timers.fired() => self.handle_timer(timer).await,

                control = self.control.recv(), if !self.control_closed => match control {
                    Some(control) => self.handle_control(control),
                    None => {
                        debug!("All handles dropped");
                        self.control_closed = true;
                    }
                },

                _ = status_tick.tick(), if !self.shutting_down => {
                    info!("{}", self.state.status().summary());
                }

                _ = idle_cycle.tick(), if !self.shutting_down => {
                    if self.state.connected {
                        info!("Scheduled idle announcement");
                        self.send_idle_announcement();
                    }
                }
            }
        }

        info!("Controller stopped");
    }

    /// Issue a connection request for the configured identity.
    ///
    /// A failure is logged and leaves the bot disconnected; it is not retried
    /// from here.
    pub async fn connect(&mut self) {
        self.session = None;
        self.state.reset();
        self.phase = Phase::Connecting;

        let config = self.config.session_config();
        info!(
            "Connecting to {}:{} as {}...",
            config.host, config.port, config.identity
        );

        match self.client.connect(&config).await {
            Ok(session) => {
                self.session = Some(session);
            }
            Err(e) => {
                error!("{}", BotError::Connection(e));
                self.phase = Phase::Disconnected;
            }
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::WorldStart { entity_id } => {
                info!(%entity_id, "Game started");
                self.state.entity_id = Some(entity_id);
            }

            SessionEvent::Spawn => {
                info!("Successfully spawned");
                self.phase = Phase::Connected;
                self.state.connected = true;
                self.timers.schedule(KICKOFF_DELAY, Timer::IdleKickoff);
            }

            SessionEvent::Position {
                entity_id,
                position,
            } => {
                if self.state.apply_position(entity_id, position) {
                    debug!(?position, "Position updated");
                }
            }

            SessionEvent::Health { value } => {
                self.state.health = value;
                info!("Health: {}/{}", value, MAX_HEALTH);
            }

            SessionEvent::Chat {
                source_name,
                kind,
                message,
            } => {
                info!(
                    "[{}] {}: {}",
                    kind,
                    source_name.as_deref().unwrap_or("?"),
                    message.as_deref().unwrap_or("")
                );
                let replies =
                    commands::dispatch(source_name.as_deref(), message.as_deref(), &self.state);
                for reply in replies {
                    self.send_chat(reply);
                }
            }

            SessionEvent::Disconnect { reason } => {
                info!(
                    "Disconnected: {}",
                    reason.as_deref().unwrap_or("Unknown reason")
                );
                self.mark_disconnected();
            }

            SessionEvent::Error { message } => {
                error!("{}", BotError::Protocol(message));
                self.mark_disconnected();
            }
        }
    }

    /// The event stream ended without necessarily saying why.
    fn handle_session_end(&mut self) {
        self.session = None;
        if self.phase == Phase::Disconnected {
            debug!("Session stream closed");
        } else {
            info!("Disconnected: session closed");
            self.mark_disconnected();
        }
    }

    fn mark_disconnected(&mut self) {
        self.state.connected = false;
        self.phase = Phase::Disconnected;

        if self.shutting_down {
            debug!("Disconnect during shutdown, not reconnecting");
            return;
        }
        if self.timers.any_pending(|t| matches!(t, Timer::Reconnect)) {
            return;
        }

        info!(
            "Attempting to reconnect in {} seconds...",
            RECONNECT_DELAY.as_secs()
        );
        self.timers.schedule(RECONNECT_DELAY, Timer::Reconnect);
    }

    async fn handle_timer(&mut self, timer: Timer) {
        match timer {
            Timer::IdleKickoff => {
                if self.state.connected {
                    self.send_idle_announcement();
                    info!("Initial idle announcement sent");
                }
            }

            Timer::IdleChat { minutes } => {
                self.send_chat(format!("Going AFK for {minutes} minutes! 💤"));
            }

            Timer::IdleWhisper { token } => {
                self.send_chat(format!("/msg {IDLE_RECIPIENT} {token}"));
            }

            Timer::Reconnect => {
                if self.shutting_down || self.state.connected {
                    debug!("Reconnect no longer needed");
                } else {
                    self.connect().await;
                }
            }

            Timer::CloseSession => {
                self.close_session();
            }
        }
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Shutdown => self.shutdown(),
            Control::Status(reply) => {
                let _ = reply.send(self.state.status());
            }
            Control::AnnounceIdle => self.send_idle_announcement(),
        }
    }

    /// Begin a deliberate disconnect.
    ///
    /// Cancels every pending timer. When connected, a farewell is sent and
    /// the session is closed [`FAREWELL_GRACE`] later; otherwise the
    /// controller stops right away.
    pub fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;

        let cancelled = self.timers.cancel_where(|_| true);
        debug!(cancelled, "Pending timers cancelled");

        if self.state.connected {
            info!("Disconnecting from server...");
            self.send_chat(FAREWELL_MESSAGE);
            self.timers.schedule(FAREWELL_GRACE, Timer::CloseSession);
        } else {
            self.close_session();
        }
    }

    fn close_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.link.disconnect();
            info!("Session closed");
        }
        self.state.connected = false;
        self.phase = Phase::Disconnected;
        self.finished = true;
    }

    /// Run the three-step idle announcement.
    ///
    /// The idle command goes out now; the chat notice and the private
    /// message follow at [`IDLE_CHAT_DELAY`] and [`IDLE_WHISPER_DELAY`].
    /// Does nothing while disconnected.
    pub fn send_idle_announcement(&mut self) {
        if !self.state.connected {
            debug!("Skipping idle announcement while disconnected");
            return;
        }

        let minutes = idle_minutes(&mut self.rng);
        self.send_chat(format!("/afk {minutes}"));
        self.timers
            .schedule(IDLE_CHAT_DELAY, Timer::IdleChat { minutes });

        let token = self.state.next_reply_token();
        self.timers
            .schedule(IDLE_WHISPER_DELAY, Timer::IdleWhisper { token });

        info!("Sent /afk {minutes}, queued chat notice and /msg {IDLE_RECIPIENT} {token}");
    }

    /// Send a chat line or command. Dropped with a log line when disconnected.
    pub fn send_chat(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !self.state.connected {
            warn!("Cannot send message - not connected: {}", text);
            return;
        }
        let Some(session) = self.session.as_mut() else {
            warn!("Cannot send message - no session: {}", text);
            return;
        };

        let payload = ChatPayload::chat(self.state.username.clone(), text.clone());
        match session.link.send(payload) {
            Ok(()) => info!("Sent: {}", text),
            Err(e) => error!("{}", BotError::Send(e)),
        }
    }
}

/// Next event from the current session, or pending forever without one.
async fn next_event<L>(session: &mut Option<Session<L>>) -> Option<SessionEvent> {
    match session {
        Some(session) => session.events.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_minutes_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let minutes = idle_minutes(&mut rng);
            assert!(IDLE_MINUTES.contains(&minutes), "out of range: {minutes}");
        }
    }

    #[test]
    fn test_idle_minutes_reach_both_ends() {
        let mut rng = StdRng::seed_from_u64(11);
        let seen: Vec<u8> = (0..5000).map(|_| idle_minutes(&mut rng)).collect();
        assert!(seen.contains(&1));
        assert!(seen.contains(&60));
    }

    #[test]
    fn test_default_config_matches_reference_server() {
        let config = BotConfig::default().session_config();
        assert_eq!(config.host, "play.donutsmp.net");
        assert_eq!(config.port, 19132);
        assert_eq!(config.identity, "BotHelper");
        assert_eq!(config.auth_mode, AuthMode::Online);
    }

    #[test]
    fn test_delay_ordering() {
        assert!(IDLE_CHAT_DELAY < IDLE_WHISPER_DELAY);
        assert!(FAREWELL_GRACE < SHUTDOWN_GRACE);
    }
}
