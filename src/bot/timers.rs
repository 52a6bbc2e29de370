//! One-shot timer registry.
//!
//! Each timer is a sleeping task that reports back through a channel. The
//! registry keeps an abort handle per live timer; a fired timer is only
//! delivered if it is still registered, so a cancelled timer can never act
//! even if it had already fired before being cancelled.

use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

/// Work a timer performs when it fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    /// First idle announcement after a spawn.
    IdleKickoff,
    /// Second idle step: the chat notice.
    IdleChat { minutes: u8 },
    /// Third idle step: the private message.
    IdleWhisper { token: &'static str },
    /// Retry after an unexpected disconnect.
    Reconnect,
    /// Close the session once the farewell has flushed.
    CloseSession,
}

impl Timer {
    /// Whether this timer belongs to an idle announcement.
    #[must_use]
    pub const fn is_idle_step(&self) -> bool {
        matches!(
            self,
            Self::IdleKickoff | Self::IdleChat { .. } | Self::IdleWhisper { .. }
        )
    }
}

/// Registry identifier for a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Owns every pending one-shot timer.
pub struct Timers {
    next_id: u64,
    pending: HashMap<TimerId, (Timer, AbortHandle)>,
    fired_tx: mpsc::UnboundedSender<TimerId>,
    fired_rx: mpsc::UnboundedReceiver<TimerId>,
}

impl Timers {
    pub fn new() -> Self {
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();
        Self {
            next_id: 0,
            pending: HashMap::new(),
            fired_tx,
            fired_rx,
        }
    }

    /// Schedule `timer` to fire after `delay`.
    pub fn schedule(&mut self, delay: Duration, timer: Timer) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;

        let fired_tx = self.fired_tx.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fired_tx.send(id);
        });

        debug!(?id, ?timer, ?delay, "Timer scheduled");
        self.pending.insert(id, (timer, task.abort_handle()));
        id
    }

    /// Cancel a single timer. Returns whether it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        if let Some((timer, handle)) = self.pending.remove(&id) {
            handle.abort();
            debug!(?id, ?timer, "Timer cancelled");
            true
        } else {
            false
        }
    }

    /// Cancel every pending timer matching `predicate`. Returns how many.
    pub fn cancel_where(&mut self, predicate: impl Fn(&Timer) -> bool) -> usize {
        let ids: Vec<TimerId> = self
            .pending
            .iter()
            .filter(|(_, (timer, _))| predicate(timer))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter().filter(|id| self.cancel(*id)).count()
    }

    /// Whether any pending timer matches `predicate`.
    pub fn any_pending(&self, predicate: impl Fn(&Timer) -> bool) -> bool {
        self.pending.values().any(|(timer, _)| predicate(timer))
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if no timers are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Wait for the next live timer to fire.
    ///
    /// Cancel-safe: nothing is lost if the returned future is dropped.
    pub async fn fired(&mut self) -> Timer {
        loop {
            // We hold a sender, so the channel never closes
            let Some(id) = self.fired_rx.recv().await else {
                continue;
            };
            if let Some((timer, _)) = self.pending.remove(&id) {
                return timer;
            }
            debug!(?id, "Dropping cancelled timer");
        }
    }
}

impl Default for Timers {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        for (_, handle) in self.pending.values() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_in_deadline_order() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_millis(1000), Timer::IdleWhisper { token: "Worked" });
        timers.schedule(Duration::from_millis(500), Timer::IdleChat { minutes: 7 });

        let start = tokio::time::Instant::now();
        assert_eq!(timers.fired().await, Timer::IdleChat { minutes: 7 });
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert!(start.elapsed() < Duration::from_millis(1000));
        assert_eq!(timers.fired().await, Timer::IdleWhisper { token: "Worked" });
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(timers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_delivered() {
        let mut timers = Timers::new();
        let reconnect = timers.schedule(Duration::from_secs(10), Timer::Reconnect);
        timers.schedule(Duration::from_secs(20), Timer::CloseSession);

        assert!(timers.cancel(reconnect));
        assert!(!timers.cancel(reconnect));

        assert_eq!(timers.fired().await, Timer::CloseSession);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_still_suppresses() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_secs(1), Timer::Reconnect);
        timers.schedule(Duration::from_secs(3), Timer::CloseSession);

        // Let the reconnect task run and report before cancelling it
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(timers.cancel_where(|t| matches!(t, Timer::Reconnect)), 1);

        assert_eq!(timers.fired().await, Timer::CloseSession);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_where_filters() {
        let mut timers = Timers::new();
        timers.schedule(Duration::from_secs(2), Timer::IdleKickoff);
        timers.schedule(Duration::from_millis(500), Timer::IdleChat { minutes: 1 });
        timers.schedule(Duration::from_secs(10), Timer::Reconnect);

        assert!(timers.any_pending(Timer::is_idle_step));
        assert_eq!(timers.cancel_where(Timer::is_idle_step), 2);
        assert!(!timers.any_pending(Timer::is_idle_step));
        assert_eq!(timers.len(), 1);
    }
}
