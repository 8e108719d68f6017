//! Server router (C6): the central dispatcher that fans traffic out to
//! clients, drivers, and remote upstreams according to §4.6's routing
//! rules, and the accept loop that admits new client connections.

use crate::connection::{Connection, ConnectionHandle, ConnectionId, ConnectionKind, SubprocessDriverConnection, DEFAULT_CLOSE_DRAIN};
use crate::driver::{Driver, DriverChannels, DriverHandle};
use crate::error::{Error, Result};
use crate::message::MessageType;
use crate::model::Event;
use crate::remote::{RemoteClient, RemoteConfig, RemoteHandle};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch, Mutex, RwLock, Semaphore};

/// Default bind address, matching `indiserver`'s "localhost" default.
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:7624";
/// Default accepted-connection ceiling.
const DEFAULT_MAX_CONNECTIONS: usize = 5;
/// Hard ceiling on `max_connections`, regardless of what's requested.
const MAX_MAX_CONNECTIONS: usize = 10;
/// Depth of the router's central ingress queue.
const INGRESS_CAPACITY: usize = 64;

/// Tunables for one [`Server`] instance.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the accept loop binds to
    pub bind_address: String,
    /// Maximum number of concurrently accepted client connections, clamped
    /// to [`MAX_MAX_CONNECTIONS`]
    pub max_connections: usize,
    /// How long an accepted connection's writer gets to drain after its
    /// reader half closes
    pub accept_drain: Duration,
    /// Per-destination send timeout before a fan-out is dropped and logged
    pub dest_send_timeout: Duration,
}

impl ServerConfig {
    /// Build a config, clamping `max_connections` to [`MAX_MAX_CONNECTIONS`].
    pub fn new(bind_address: impl Into<String>, max_connections: usize) -> Self {
        Self {
            bind_address: bind_address.into(),
            max_connections: max_connections.min(MAX_MAX_CONNECTIONS),
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            accept_drain: DEFAULT_CLOSE_DRAIN,
            dest_send_timeout: Duration::from_millis(250),
        }
    }
}

/// What role a peer plays in routing decisions (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeerRole {
    /// A client application; receives everything drivers/remotes produce,
    /// subject to BLOB policy, and has no devices of its own.
    Client,
    /// An in-process driver or a subprocess driver connection; owns
    /// devices and may snoop others.
    Driver,
    /// An upstream server proxied through this one.
    Remote,
}

/// How to actually deliver a message to one registered peer.
enum PeerSink {
    /// A client socket or subprocess driver, addressed by raw message.
    Connection(ConnectionHandle),
    /// An in-process driver, addressed by typed event.
    InProcessDriver {
        inbound_tx: mpsc::Sender<Event>,
        snoop_inbound_tx: mpsc::Sender<Event>,
    },
    /// An upstream server link, addressed by raw message.
    Remote(RemoteHandle),
}

/// One entry in the routing table. Device ownership and snoop/subscription
/// interest are both *learned* by observing traffic from the peer, rather
/// than queried from it, so clients, subprocess drivers, in-process
/// drivers, and remotes can all be routed by the same code path.
struct Peer {
    id: ConnectionId,
    role: PeerRole,
    sink: PeerSink,
    owns: Mutex<HashSet<String>>,
    wants_all: AtomicBool,
    /// Per-device subscription interest, keyed by device name. `None` in the
    /// value set means "this whole device"; `Some(vector)` scopes the
    /// subscription to that one vector, so a driver that asked for `(d, v)`
    /// never sees traffic on `d`'s other vectors.
    wants: Mutex<HashMap<String, HashSet<Option<String>>>>,
}

impl Peer {
    async fn learn(&self, event: &Event) {
        if self.role == PeerRole::Client {
            return;
        }
        if is_definition(event) {
            if let Some(device) = event.device() {
                self.owns.lock().await.insert(device.to_string());
            }
        }
        if let Event::GetProperties(gp) = event {
            match &gp.device {
                None => self.wants_all.store(true, Ordering::SeqCst),
                Some(device) => {
                    self.wants
                        .lock()
                        .await
                        .entry(device.clone())
                        .or_default()
                        .insert(gp.name.clone());
                }
            }
        }
    }

    /// `true` if this peer has any subscription interest at all in `device`
    /// (whole-device or any single vector). Used where routing only needs a
    /// coarse "does this peer care about this device" check.
    async fn wants_device(&self, device: &str) -> bool {
        self.wants_all.load(Ordering::SeqCst) || self.wants.lock().await.contains_key(device)
    }

    /// `true` if this peer's subscription interest covers `(device, vector)`
    /// exactly: either a whole-device subscription, or a vector-scoped one
    /// naming this exact vector.
    async fn wants_vector(&self, device: &str, vector: Option<&str>) -> bool {
        if self.wants_all.load(Ordering::SeqCst) {
            return true;
        }
        let wants = self.wants.lock().await;
        match wants.get(device) {
            None => false,
            Some(subs) => subs.contains(&None) || vector.is_some_and(|v| subs.contains(&Some(v.to_string()))),
        }
    }

    async fn owns_device(&self, device: &str) -> bool {
        self.owns.lock().await.contains(device)
    }
}

fn is_definition(event: &Event) -> bool {
    matches!(
        event,
        Event::DefTextVector(_)
            | Event::DefNumberVector(_)
            | Event::DefSwitchVector(_)
            | Event::DefBlobVector(_)
            | Event::DefLightVector(_)
    )
}

/// The central routing table and accept loop (§4.6).
pub struct Server {
    config: ServerConfig,
    peers: RwLock<IndexMap<ConnectionId, Arc<Peer>>>,
    ingress_tx: mpsc::Sender<(ConnectionId, MessageType)>,
    ingress_rx: Mutex<Option<mpsc::Receiver<(ConnectionId, MessageType)>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    accept_slots: Arc<Semaphore>,
    bound_addr: watch::Sender<Option<std::net::SocketAddr>>,
}

impl Server {
    /// Build a server with an empty routing table. Nothing runs until
    /// [`Server::run`] is spawned.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let (ingress_tx, ingress_rx) = mpsc::channel(INGRESS_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_slots = Arc::new(Semaphore::new(config.max_connections));
        let (bound_addr, _) = watch::channel(None);
        Arc::new(Self {
            peers: RwLock::new(IndexMap::new()),
            ingress_tx,
            ingress_rx: Mutex::new(Some(ingress_rx)),
            shutdown_tx,
            shutdown_rx,
            accept_slots,
            bound_addr,
            config,
        })
    }

    /// The address [`Server::run`] actually bound to, once it has. Useful
    /// for tests and `port = 0` ephemeral binds.
    pub async fn local_addr(&self) -> std::net::SocketAddr {
        let mut rx = self.bound_addr.subscribe();
        loop {
            if let Some(addr) = *rx.borrow() {
                return addr;
            }
            if rx.changed().await.is_err() {
                panic!("server shut down before binding");
            }
        }
    }

    /// Signal shutdown; [`Server::run`]'s accept loop stops admitting new
    /// connections and the dispatch loop drains in-flight traffic.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Register an in-process driver. Rejects device-name collisions
    /// against every already-registered driver.
    pub async fn register_driver(self: &Arc<Self>, driver: Driver, mut channels: DriverChannels) -> Result<()> {
        let handle: DriverHandle = driver.handle();
        let devices = handle.device_names().await;
        self.reject_collisions(&devices).await?;

        let id = ConnectionId::next();
        let peer = Arc::new(Peer {
            id,
            role: PeerRole::Driver,
            sink: PeerSink::InProcessDriver {
                inbound_tx: channels.inbound_tx.clone(),
                snoop_inbound_tx: channels.snoop_inbound_tx.clone(),
            },
            owns: Mutex::new(devices.into_iter().collect()),
            wants_all: AtomicBool::new(false),
            wants: Mutex::new(HashMap::new()),
        });
        self.peers.write().await.insert(id, peer);

        let ingress_tx = self.ingress_tx.clone();
        let server = self.clone();
        tokio::spawn(async move {
            while let Some(message) = channels.outbound_rx.recv().await {
                if ingress_tx.send((id, message)).await.is_err() {
                    break;
                }
            }
            server.peers.write().await.shift_remove(&id);
        });
        tokio::spawn(driver.run());
        Ok(())
    }

    /// Spawn a driver executable and register it exactly like an in-process
    /// driver, except its device ownership is learned from its traffic
    /// rather than queried up front.
    pub async fn add_subprocess_driver(self: &Arc<Self>, exe: &str, args: &[String]) -> Result<()> {
        let (mut child, handle, task) =
            SubprocessDriverConnection::spawn(exe, args, self.ingress_tx.clone(), self.config.accept_drain)?;
        tokio::spawn(async move {
            let _ = child.wait().await;
        });
        self.register_connection_peer(handle.id, PeerRole::Driver, PeerSink::Connection(handle), task)
            .await;
        Ok(())
    }

    /// Add an upstream server link, reconnected automatically for the
    /// lifetime of this server.
    pub async fn add_remote(self: &Arc<Self>, host: impl Into<String>, port: u16, blob_enable: crate::blob_policy::BlobMode) {
        let config = RemoteConfig {
            host: host.into(),
            port,
            blob_enable,
        };
        let (handle, task) = RemoteClient::spawn(config, self.ingress_tx.clone(), self.config.accept_drain);
        self.register_connection_peer(handle.id, PeerRole::Remote, PeerSink::Remote(handle), task)
            .await;
    }

    async fn register_connection_peer(
        self: &Arc<Self>,
        id: ConnectionId,
        role: PeerRole,
        sink: PeerSink,
        task: tokio::task::JoinHandle<()>,
    ) {
        let peer = Arc::new(Peer {
            id,
            role,
            sink,
            owns: Mutex::new(HashSet::new()),
            wants_all: AtomicBool::new(false),
            wants: Mutex::new(HashMap::new()),
        });
        self.peers.write().await.insert(id, peer);

        let server = self.clone();
        tokio::spawn(async move {
            let _ = task.await;
            server.peers.write().await.shift_remove(&id);
        });
    }

    async fn reject_collisions(&self, devices: &[String]) -> Result<()> {
        let peers = self.peers.read().await;
        for peer in peers.values() {
            let owned = peer.owns.lock().await;
            if let Some(dup) = devices.iter().find(|d| owned.contains(*d)) {
                return Err(Error::Protocol(format!("device {dup} is already registered")));
            }
        }
        Ok(())
    }

    /// Bind `config.bind_address` and run the accept loop and dispatch loop
    /// until [`Server::shutdown`] is called.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await.map_err(Error::Io)?;
        let local_addr = listener.local_addr().map_err(Error::Io)?;
        let _ = self.bound_addr.send(Some(local_addr));
        tracing::info!(address = %local_addr, "listening for INDI clients");

        let mut ingress_rx = self
            .ingress_rx
            .lock()
            .await
            .take()
            .ok_or_else(|| Error::Connection("server already running".into()))?;
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.clone().accept(stream, addr).await,
                        Err(e) => tracing::warn!(error = %e, "accept failed"),
                    }
                }
                Some((src, message)) = ingress_rx.recv() => {
                    self.clone().dispatch(src, message).await;
                }
            }
        }

        Ok(())
    }

    async fn accept(self: Arc<Self>, stream: tokio::net::TcpStream, addr: std::net::SocketAddr) {
        let permit = match self.accept_slots.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!(%addr, "rejecting connection: max_connections reached");
                return;
            }
        };
        tracing::info!(%addr, "client connected");
        let (handle, task) = Connection::spawn(
            stream,
            ConnectionKind::ClientSocket,
            self.ingress_tx.clone(),
            self.config.accept_drain,
        );
        let id = handle.id;
        let peer = Arc::new(Peer {
            id,
            role: PeerRole::Client,
            sink: PeerSink::Connection(handle),
            owns: Mutex::new(HashSet::new()),
            wants_all: AtomicBool::new(false),
            wants: Mutex::new(HashMap::new()),
        });
        self.peers.write().await.insert(id, peer);

        let server = self;
        tokio::spawn(async move {
            let _ = task.await;
            server.peers.write().await.shift_remove(&id);
            drop(permit);
            tracing::info!(%addr, "client disconnected");
        });
    }

    async fn dispatch(self: Arc<Self>, src: ConnectionId, message: MessageType) {
        let event = Event::from(message.clone());
        let role = {
            let peers = self.peers.read().await;
            let Some(peer) = peers.get(&src) else { return };
            peer.learn(&event).await;
            peer.role
        };

        match role {
            PeerRole::Client => self.route_client_originated(src, &event, message).await,
            PeerRole::Driver => self.route_produced(src, &event, message, true).await,
            PeerRole::Remote => self.route_produced(src, &event, message, false).await,
        }
    }

    /// Routing rule 2: client-originated traffic.
    async fn route_client_originated(&self, src: ConnectionId, event: &Event, message: MessageType) {
        match event {
            Event::GetProperties(gp) => match &gp.device {
                None => self.broadcast_query(message).await,
                Some(device) => self.route_to_owner_or_remotes(device, message).await,
            },
            Event::EnableBlob(eb) => {
                let peers = self.peers.read().await;
                if let Some(peer) = peers.get(&src) {
                    if let PeerSink::Connection(handle) = &peer.sink {
                        handle.update_blob_policy(&eb.device, eb.name.as_deref(), eb.enable).await;
                    }
                }
            }
            Event::NewTextVector(_) | Event::NewNumberVector(_) | Event::NewSwitchVector(_) | Event::NewBlobVector(_) => {
                if let Some(device) = event.device() {
                    self.route_to_owner_or_remotes(device, message).await;
                }
            }
            _ => {}
        }
    }

    /// Deliver a device-addressed `new*Vector`/`getProperties` to the
    /// driver that owns `device`, or, if no local driver does, forward it
    /// to a remote known to advertise it (or every remote, as a fallback).
    async fn route_to_owner_or_remotes(&self, device: &str, message: MessageType) {
        let peers = self.peers.read().await;
        for peer in peers.values() {
            if peer.role == PeerRole::Driver && peer.owns_device(device).await {
                self.deliver(peer, message).await;
                return;
            }
        }

        let remotes: Vec<&Arc<Peer>> = peers.values().filter(|p| p.role == PeerRole::Remote).collect();
        let mut advertised = Vec::new();
        for remote in &remotes {
            if remote.owns_device(device).await {
                advertised.push(*remote);
            }
        }
        let targets = if advertised.is_empty() { remotes } else { advertised };

        // A `getProperties` forwarded to a remote is a subscription, not a
        // one-off write: route it through `RemoteHandle::subscribe` so it's
        // recorded in `RemoteState` and replayed automatically on reconnect,
        // rather than forwarded-and-forgotten.
        let is_get_properties = matches!(message, MessageType::GetProperties(_));
        for remote in targets {
            if is_get_properties {
                self.subscribe_remote(remote, device).await;
            } else {
                self.deliver(remote, message.clone()).await;
            }
        }
    }

    async fn subscribe_remote(&self, peer: &Peer, device: &str) {
        if let PeerSink::Remote(handle) = &peer.sink {
            let result = tokio::time::timeout(self.config.dest_send_timeout, handle.subscribe(Some(device.to_string()))).await;
            self.log_delivery(peer.id, result).await;
        }
    }

    /// Device-less `getProperties`: broadcast to every local driver and
    /// every remote upstream.
    async fn broadcast_query(&self, message: MessageType) {
        let peers = self.peers.read().await;
        for peer in peers.values() {
            if peer.role == PeerRole::Driver || peer.role == PeerRole::Remote {
                self.deliver(peer, message.clone()).await;
            }
        }
    }

    /// Routing rules 1 and 3: driver- or remote-produced traffic. Fans out
    /// to every client, to every *other* driver whose snoop subscription
    /// matches, and (unless `src` is itself a remote, to prevent
    /// remote-to-remote loops) to every remote that wants this device.
    async fn route_produced(&self, src: ConnectionId, event: &Event, message: MessageType, allow_remote_forward: bool) {
        let peers = self.peers.read().await;

        for peer in peers.values() {
            if peer.role == PeerRole::Client {
                self.deliver(peer, message.clone()).await;
            }
        }

        if let Some(device) = event.device() {
            let vector = event.vector_name();
            for peer in peers.values() {
                if peer.role == PeerRole::Driver && peer.id != src && peer.wants_vector(device, vector).await {
                    self.deliver_event(peer, event.clone()).await;
                }
            }

            if allow_remote_forward {
                for peer in peers.values() {
                    if peer.role == PeerRole::Remote && peer.wants_device(device).await {
                        self.deliver(peer, message.clone()).await;
                    }
                }
            }
        }
    }

    async fn deliver(&self, peer: &Peer, message: MessageType) {
        let result = tokio::time::timeout(self.config.dest_send_timeout, async {
            match &peer.sink {
                PeerSink::Connection(handle) => handle.send(message).await,
                PeerSink::Remote(handle) => handle.forward(message).await,
                PeerSink::InProcessDriver { inbound_tx, .. } => inbound_tx
                    .send(Event::from(message))
                    .await
                    .map_err(|e| Error::Connection(format!("driver inbound queue closed: {e}"))),
            }
        })
        .await;
        self.log_delivery(peer.id, result).await;
    }

    async fn deliver_event(&self, peer: &Peer, event: Event) {
        let result = tokio::time::timeout(self.config.dest_send_timeout, async {
            match &peer.sink {
                PeerSink::InProcessDriver { snoop_inbound_tx, .. } => snoop_inbound_tx
                    .send(event)
                    .await
                    .map_err(|e| Error::Connection(format!("driver snoop queue closed: {e}"))),
                PeerSink::Connection(handle) => handle.send(event_to_message(event)).await,
                PeerSink::Remote(handle) => handle.forward(event_to_message(event)).await,
            }
        })
        .await;
        self.log_delivery(peer.id, result).await;
    }

    async fn log_delivery(&self, dest: ConnectionId, result: std::result::Result<Result<()>, tokio::time::error::Elapsed>) {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(destination = dest.0, error = %e, "delivery failed"),
            Err(_) => tracing::warn!(destination = dest.0, "delivery dropped: destination did not drain in time"),
        }
    }
}

fn event_to_message(event: Event) -> MessageType {
    match event {
        Event::GetProperties(m) => MessageType::GetProperties(m),
        Event::EnableBlob(m) => MessageType::EnableBLOB(m),
        Event::NewTextVector(m) => MessageType::NewTextVector(m),
        Event::NewNumberVector(m) => MessageType::NewNumberVector(m),
        Event::NewSwitchVector(m) => MessageType::NewSwitchVector(m),
        Event::NewBlobVector(m) => MessageType::NewBLOBVector(m),
        Event::Message(m) => MessageType::Message(m),
        Event::DelProperty(m) => MessageType::DelProperty(m),
        Event::DefTextVector(m) => MessageType::DefTextVector(m),
        Event::DefNumberVector(m) => MessageType::DefNumberVector(m),
        Event::DefSwitchVector(m) => MessageType::DefSwitchVector(m),
        Event::DefBlobVector(m) => MessageType::DefBLOBVector(m),
        Event::DefLightVector(m) => MessageType::DefLightVector(m),
        Event::SetTextVector(m) => MessageType::SetTextVector(m),
        Event::SetNumberVector(m) => MessageType::SetNumberVector(m),
        Event::SetSwitchVector(m) => MessageType::SetSwitchVector(m),
        Event::SetBlobVector(m) => MessageType::SetBLOBVector(m),
        Event::SetLightVector(m) => MessageType::SetLightVector(m),
    }
}
