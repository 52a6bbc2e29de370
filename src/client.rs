//! Session client backed by a relay process.
//!
//! The relay owns the actual Bedrock connection and forwards it over a Unix
//! socket as JSON lines. See [`crate::protocol`] for the message types.

#![allow(unsafe_code)] // getuid() call

use crate::protocol::{ChatPayload, RelayRequest, SessionConfig, SessionEvent};
use crate::session::{Session, SessionClient, SessionError, SessionLink};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// Get the default socket path for the session relay.
pub fn default_relay_path() -> PathBuf {
    if let Some(runtime_dir) = dirs::runtime_dir() {
        runtime_dir.join("bedrock-idler.sock")
    } else {
        // Fallback to /tmp/bedrock-idler-$UID.sock
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/bedrock-idler-{uid}.sock"))
    }
}

/// Opens sessions through the relay socket.
pub struct RelayClient {
    socket_path: PathBuf,
}

impl RelayClient {
    /// Create a client for the relay listening on `socket_path`.
    pub const fn new(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    /// Create a client with the default relay path.
    pub fn with_default_path() -> Self {
        Self::new(default_relay_path())
    }

    /// Get the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl SessionClient for RelayClient {
    type Link = RelayLink;

    async fn connect(&mut self, config: &SessionConfig) -> Result<Session<RelayLink>, SessionError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(SessionError::Connect)?;
        debug!(path = ?self.socket_path, "Connected to relay");

        let (reader, mut writer) = stream.into_split();
        write_request(
            &mut writer,
            &RelayRequest::Connect {
                config: config.clone(),
            },
        )
        .await?;
        info!(host = %config.host, port = config.port, "Session requested");

        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(writer_task(writer, request_rx));
        let reader = tokio::spawn(reader_task(BufReader::new(reader), event_tx));

        Ok(Session {
            link: RelayLink {
                requests: request_tx,
                reader: reader.abort_handle(),
            },
            events: event_rx,
        })
    }
}

/// Outbound half of a relay session.
///
/// Dropping the link stops the event reader and closes the socket.
pub struct RelayLink {
    requests: mpsc::UnboundedSender<RelayRequest>,
    reader: AbortHandle,
}

impl SessionLink for RelayLink {
    fn send(&mut self, payload: ChatPayload) -> Result<(), SessionError> {
        self.requests
            .send(RelayRequest::Send { payload })
            .map_err(|_| SessionError::Closed)
    }

    fn disconnect(&mut self) {
        // Writer may already be gone if the relay hung up first
        let _ = self.requests.send(RelayRequest::Disconnect);
    }
}

impl Drop for RelayLink {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn write_request(
    writer: &mut OwnedWriteHalf,
    request: &RelayRequest,
) -> Result<(), SessionError> {
    let mut json = serde_json::to_string(request).map_err(SessionError::Serialize)?;
    json.push('\n');
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(SessionError::Write)
}

/// Drain queued requests onto the socket, in order.
async fn writer_task(
    mut writer: OwnedWriteHalf,
    mut requests: mpsc::UnboundedReceiver<RelayRequest>,
) {
    while let Some(request) = requests.recv().await {
        let closing = matches!(request, RelayRequest::Disconnect);
        if let Err(e) = write_request(&mut writer, &request).await {
            warn!("Relay write failed: {}", e);
            break;
        }
        if closing {
            writer.shutdown().await.ok();
            break;
        }
    }
    debug!("Relay writer finished");
}

/// Parse event lines until the relay hangs up.
async fn reader_task(
    mut reader: BufReader<OwnedReadHalf>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("Relay closed the connection");
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match serde_json::from_str::<SessionEvent>(trimmed) {
                    Ok(event) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Ignoring malformed relay event: {}", e),
                }
            }
            Err(e) => {
                warn!("Relay read failed: {}", e);
                break;
            }
        }
    }
}
