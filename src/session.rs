//! Capability interface to the live game session.
//!
//! The controller never speaks the Bedrock protocol itself. It asks a
//! [`SessionClient`] for a [`Session`], reads [`SessionEvent`]s from the
//! returned channel, and pushes outbound text through the [`SessionLink`].

use crate::protocol::{ChatPayload, SessionConfig, SessionEvent};
use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors raised by a session implementation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to reach session relay: {0}")]
    Connect(#[source] std::io::Error),

    #[error("failed to write to session relay: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to serialize request: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("connection request rejected: {0}")]
    Rejected(String),

    #[error("session closed")]
    Closed,
}

/// A live session: the outbound half plus the inbound event stream.
///
/// The stream ends when the underlying transport goes away.
pub struct Session<L> {
    pub link: L,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
}

/// Something that can open sessions.
pub trait SessionClient: Send {
    type Link: SessionLink + Send;

    /// Issue a connection request.
    fn connect(
        &mut self,
        config: &SessionConfig,
    ) -> impl Future<Output = Result<Session<Self::Link>, SessionError>> + Send;
}

/// Outbound half of a session.
pub trait SessionLink {
    /// Enqueue a text packet. Does not wait for delivery.
    fn send(&mut self, payload: ChatPayload) -> Result<(), SessionError>;

    /// Close the session.
    fn disconnect(&mut self);
}
