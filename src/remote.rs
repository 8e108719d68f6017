//! Remote-server client (C7): an outgoing link to another INDI server,
//! treated by [`crate::server::Server`] as just another peer endpoint once
//! connected, but one that manages its own reconnect lifecycle.

use crate::blob_policy::BlobMode;
use crate::connection::{Connection, ConnectionId, ConnectionKind};
use crate::error::Result;
use crate::message::common::GetProperties;
use crate::message::MessageType;
use crate::model::Event;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

/// Initial reconnect backoff (§4.7).
const BACKOFF_START: Duration = Duration::from_secs(1);
/// Reconnect backoff ceiling (§4.7).
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Configuration for one upstream link.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Upstream host
    pub host: String,
    /// Upstream port
    pub port: u16,
    /// BLOB policy applied to traffic received from this upstream
    pub blob_enable: BlobMode,
}

/// Devices this link has advertised (learned from its `def*Vector`
/// traffic) and devices a local snoop subscription has asked it to
/// provide, replayed on every reconnect.
#[derive(Debug, Default)]
pub struct RemoteState {
    /// Devices seen defined by the upstream
    pub advertised_devices: Mutex<HashSet<String>>,
    /// Subscriptions this server has echoed upstream on behalf of local
    /// drivers (`device` set; `subscribe_all` once a wildcard was sent)
    pub requested_devices: Mutex<HashSet<String>>,
    /// `true` once a device-less `getProperties` has been echoed upstream
    pub subscribe_all: std::sync::atomic::AtomicBool,
}

/// A stable reference to a remote link's learned state and send path,
/// independent of any single TCP connection attempt.
#[derive(Clone)]
pub struct RemoteHandle {
    /// Identity this link is registered under in the server's routing table
    pub id: ConnectionId,
    /// Shared, reconnect-surviving state
    pub state: Arc<RemoteState>,
    to_remote: mpsc::Sender<MessageType>,
}

impl RemoteHandle {
    /// Record (and, the first time, echo upstream) that a local subscriber
    /// wants `device` (or everything, if `None`).
    pub async fn subscribe(&self, device: Option<String>) -> Result<()> {
        match device {
            None => {
                if !self.state.subscribe_all.swap(true, std::sync::atomic::Ordering::SeqCst) {
                    self.echo_get_properties(None).await?;
                }
            }
            Some(device) => {
                let mut requested = self.state.requested_devices.lock().await;
                if requested.insert(device.clone()) {
                    drop(requested);
                    self.echo_get_properties(Some(device)).await?;
                }
            }
        }
        Ok(())
    }

    async fn echo_get_properties(&self, device: Option<String>) -> Result<()> {
        let get_properties = GetProperties::new(device, None);
        self.to_remote
            .send(MessageType::GetProperties(get_properties))
            .await
            .map_err(|e| crate::error::Error::Connection(format!("remote link closed: {e}")))
    }

    /// Forward a locally-produced message to this upstream. The caller is
    /// responsible for the loop-prevention invariant (never re-forward a
    /// message that itself arrived from a remote).
    pub async fn forward(&self, message: MessageType) -> Result<()> {
        self.to_remote
            .send(message)
            .await
            .map_err(|e| crate::error::Error::Connection(format!("remote link closed: {e}")))
    }

    /// `true` if this upstream is known (or assumed, before any traffic has
    /// been observed) to provide `device`.
    pub async fn advertises(&self, device: &str) -> bool {
        self.state.advertised_devices.lock().await.contains(device)
    }
}

/// Owns the reconnect supervisor task for one upstream link.
pub struct RemoteClient;

impl RemoteClient {
    /// Connect to `config.host:config.port` and keep reconnecting (with
    /// exponential backoff) until the returned task is aborted. Every
    /// message successfully parsed off the link is forwarded to
    /// `server_router_tx` tagged with the link's stable [`ConnectionId`];
    /// every reconnect replays the subscriptions recorded in
    /// [`RemoteState`].
    pub fn spawn(
        config: RemoteConfig,
        server_router_tx: mpsc::Sender<(ConnectionId, MessageType)>,
        close_drain: Duration,
    ) -> (RemoteHandle, tokio::task::JoinHandle<()>) {
        let id = ConnectionId::next();
        let state = Arc::new(RemoteState::default());
        let (to_remote_tx, to_remote_rx) = mpsc::channel::<MessageType>(16);

        let handle = RemoteHandle {
            id,
            state: state.clone(),
            to_remote: to_remote_tx.clone(),
        };

        let task = tokio::spawn(run_supervisor(config, id, state, to_remote_rx, server_router_tx, close_drain));
        (handle, task)
    }
}

async fn run_supervisor(
    config: RemoteConfig,
    id: ConnectionId,
    state: Arc<RemoteState>,
    mut to_remote_rx: mpsc::Receiver<MessageType>,
    server_router_tx: mpsc::Sender<(ConnectionId, MessageType)>,
    close_drain: Duration,
) {
    let mut backoff = BACKOFF_START;
    loop {
        let address = format!("{}:{}", config.host, config.port);
        match TcpStream::connect(&address).await {
            Ok(stream) => {
                backoff = BACKOFF_START;
                tracing::info!(remote = %address, "connected to upstream");

                let (inner_tx, mut inner_rx) = mpsc::channel::<(ConnectionId, MessageType)>(6);
                let (inner_handle, inner_task) = Connection::spawn(stream, ConnectionKind::RemoteUpstream, inner_tx, close_drain);

                let _ = inner_handle
                    .send(MessageType::GetProperties(GetProperties::new(None, None)))
                    .await;
                replay_subscriptions(&inner_handle, &state).await;

                loop {
                    tokio::select! {
                        incoming = inner_rx.recv() => {
                            match incoming {
                                Some((_, message)) => {
                                    record_advertised_device(&state, &message).await;
                                    if server_router_tx.send((id, message)).await.is_err() {
                                        return;
                                    }
                                }
                                None => break,
                            }
                        }
                        outgoing = to_remote_rx.recv() => {
                            match outgoing {
                                Some(message) => {
                                    if inner_handle.send(message).await.is_err() {
                                        break;
                                    }
                                }
                                None => return,
                            }
                        }
                    }
                }

                inner_task.abort();
                tracing::warn!(remote = %address, "upstream link dropped; reconnecting");
            }
            Err(e) => {
                tracing::warn!(remote = %address, error = %e, "failed to connect to upstream");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(BACKOFF_CAP);
    }
}

async fn replay_subscriptions(handle: &crate::connection::ConnectionHandle, state: &RemoteState) {
    if state.subscribe_all.load(std::sync::atomic::Ordering::SeqCst) {
        let _ = handle.send(MessageType::GetProperties(GetProperties::new(None, None))).await;
        return;
    }
    let requested = state.requested_devices.lock().await;
    for device in requested.iter() {
        let _ = handle
            .send(MessageType::GetProperties(GetProperties::new(Some(device.clone()), None)))
            .await;
    }
}

async fn record_advertised_device(state: &RemoteState, message: &MessageType) {
    if let Some(device) = Event::from(message.clone()).device() {
        state
            .advertised_devices
            .lock()
            .await
            .insert(device.to_string());
    }
}
