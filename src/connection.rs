//! Connection endpoint (C5): one client socket, subprocess driver, or
//! remote-upstream link, each framed the same way over
//! [`crate::xml::ElementFramer`].

use crate::blob_policy::{BlobMode, BlobPolicy};
use crate::error::{Error, Result};
use crate::message::MessageType;
use crate::model::Event;
use crate::xml::ElementFramer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};

/// Default time a connection's writer gets to drain after the reader half
/// closes, before the endpoint is retired.
pub const DEFAULT_CLOSE_DRAIN: Duration = Duration::from_secs(2);

/// Outbound queue depth for a single connection's writer task.
const OUTBOUND_CAPACITY: usize = 6;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection, stable for its lifetime, used by
/// [`crate::server::Server`] to address routing decisions back to a source
/// without holding a reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What kind of peer sits on the other end of a [`Connection`]. Determines
/// the default [`BlobMode`] (§4.5) and whether the connection counts
/// against the server's client accept-slot semaphore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// A client application connected over TCP
    ClientSocket,
    /// A driver executable speaking INDI over stdio
    DriverSubprocess,
    /// Another INDI server this one proxies through
    RemoteUpstream,
}

impl ConnectionKind {
    fn default_blob_mode(self) -> BlobMode {
        match self {
            ConnectionKind::ClientSocket => BlobMode::Never,
            ConnectionKind::DriverSubprocess | ConnectionKind::RemoteUpstream => BlobMode::Also,
        }
    }
}

/// A handle to a running connection's writer half, cheap to clone and hand
/// to the router.
#[derive(Clone)]
pub struct ConnectionHandle {
    /// Stable identity for this connection
    pub id: ConnectionId,
    /// What kind of peer this is
    pub kind: ConnectionKind,
    outbound_tx: mpsc::Sender<MessageType>,
    blob_policy: std::sync::Arc<Mutex<BlobPolicy>>,
}

impl ConnectionHandle {
    /// Enqueue `message` for delivery, subject to this connection's current
    /// [`BlobPolicy`]. BLOB-bearing traffic this connection has opted out
    /// of is silently dropped rather than erroring the caller.
    pub async fn send(&self, message: MessageType) -> Result<()> {
        let event = Event::from(message.clone());
        if let Some(device) = event.device() {
            let vector = event.vector_name().unwrap_or("");
            let policy = self.blob_policy.lock().await;
            if event.is_blob_bearing() {
                if !policy.admit(device, vector) {
                    return Ok(());
                }
            } else if policy.blob_only(device, vector) {
                return Ok(());
            }
        }
        self.outbound_tx
            .send(message)
            .await
            .map_err(|e| Error::Connection(format!("connection {} outbound queue closed: {e}", self.id.0)))
    }

    /// Apply an `enableBLOB` directive against this connection's policy.
    pub async fn update_blob_policy(&self, device: &str, vector: Option<&str>, mode: BlobMode) {
        self.blob_policy.lock().await.update(device, vector, mode);
    }
}

/// A running connection: a reader task feeding parsed [`Event`]s to the
/// router, and a writer task draining outbound traffic back to the peer.
pub struct Connection;

impl Connection {
    /// Split `stream` into framed reader/writer tasks. `router_tx` receives
    /// every successfully parsed inbound event tagged with this
    /// connection's id; the reader drains the writer for up to
    /// `close_drain` once the peer closes its read half before the
    /// connection is considered fully retired.
    pub fn spawn<S>(
        stream: S,
        kind: ConnectionKind,
        router_tx: mpsc::Sender<(ConnectionId, MessageType)>,
        close_drain: Duration,
    ) -> (ConnectionHandle, tokio::task::JoinHandle<()>)
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let id = ConnectionId::next();
        let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let blob_policy = std::sync::Arc::new(Mutex::new(BlobPolicy::new(kind.default_blob_mode())));

        let (read_half, mut write_half) = tokio::io::split(stream);
        let mut framer = ElementFramer::new(BufReader::new(read_half), 64 * 1024);

        let supervisor = tokio::spawn(async move {
            let mut reader_done = false;
            loop {
                tokio::select! {
                    biased;
                    next = framer.next_element(), if !reader_done => {
                        match next {
                            Ok(Some(raw)) => match raw.parse() {
                                Ok(message) => {
                                    if router_tx.send((id, message)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => tracing::warn!(connection = id.0, error = %e, "dropping unparseable element"),
                            },
                            Ok(None) => reader_done = true,
                            Err(e) => {
                                tracing::warn!(connection = id.0, error = %e, "connection read error");
                                reader_done = true;
                            }
                        }
                    }
                    outbound = outbound_rx.recv() => {
                        match outbound {
                            Some(message) => {
                                if let Err(e) = write_message(&mut write_half, &message).await {
                                    tracing::warn!(connection = id.0, error = %e, "connection write error");
                                    break;
                                }
                            }
                            None => break,
                        }
                    }
                    else => break,
                }
                if reader_done {
                    // Drain any outbound traffic still queued before retiring.
                    let drained = tokio::time::timeout(close_drain, async {
                        while let Some(message) = outbound_rx.recv().await {
                            if write_message(&mut write_half, &message).await.is_err() {
                                break;
                            }
                        }
                    })
                    .await;
                    if drained.is_err() {
                        tracing::debug!(connection = id.0, "close_drain elapsed with outbound traffic pending");
                    }
                    break;
                }
            }
            let _ = write_half.shutdown().await;
        });

        let handle = ConnectionHandle {
            id,
            kind,
            outbound_tx,
            blob_policy,
        };
        (handle, supervisor)
    }
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &MessageType) -> Result<()> {
    let xml = crate::xml::emit(message)?;
    writer.write_all(xml.as_bytes()).await.map_err(Error::Io)
}

/// A driver run as a child process, framed over its stdin/stdout exactly
/// like a client socket, with stderr forwarded to the ambient logger.
pub struct SubprocessDriverConnection {
    child: Child,
}

impl SubprocessDriverConnection {
    /// Spawn `exe` and wire its stdio as a [`Connection`] of kind
    /// [`ConnectionKind::DriverSubprocess`].
    pub fn spawn(
        exe: &str,
        args: &[String],
        router_tx: mpsc::Sender<(ConnectionId, MessageType)>,
        close_drain: Duration,
    ) -> Result<(Self, ConnectionHandle, tokio::task::JoinHandle<()>)> {
        let mut child = Command::new(exe)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(Error::Io)?;

        let stdin = child.stdin.take().ok_or_else(|| Error::Connection("driver subprocess missing stdin".into()))?;
        let stdout = child.stdout.take().ok_or_else(|| Error::Connection("driver subprocess missing stdout".into()))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, exe.to_string()));
        }

        let stream = tokio::io::join(stdout, stdin);
        let (handle, task) = Connection::spawn(stream, ConnectionKind::DriverSubprocess, router_tx, close_drain);
        Ok((Self { child }, handle, task))
    }

    /// Wait for the subprocess to exit.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus> {
        self.child.wait().await.map_err(Error::Io)
    }
}

async fn forward_stderr(stderr: tokio::process::ChildStderr, exe: String) {
    use tokio::io::AsyncBufReadExt;
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => tracing::warn!(target: "subprocess", driver = %exe, "{line}"),
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(target: "subprocess", driver = %exe, error = %e, "stderr read failed");
                break;
            }
        }
    }
}
