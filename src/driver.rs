//! Driver runtime (C4): the arena of [`Device`]s a driver author programs
//! against, plus the inbound/outbound/snoop queues that connect it to a
//! [`crate::connection::Connection`] or [`crate::server::Server`].

use crate::blob_policy::BlobMode;
use crate::error::{Error, Result};
use crate::format;
use crate::message::blob::{DefBLOB, DefBLOBVector, OneBLOB};
use crate::message::light::{DefLight, DefLightVector};
use crate::message::number::{DefNumber, DefNumberVector, OneNumber};
use crate::message::switch::{DefSwitch, DefSwitchVector, OneSwitch};
use crate::message::text::{DefText, DefTextVector, OneText};
use crate::message::MessageType;
use crate::model::{Device, Event, Member, MemberValue, Vector, VectorKind};
use crate::property::{PropertyState, SwitchState};
use crate::timestamp::INDITimestamp;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex, RwLock};

/// Capacity shared by every driver-internal queue (§5).
const QUEUE_CAPACITY: usize = 4;

/// Tunables for one [`Driver`] instance.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Auto-reply to `getProperties` with `def*Vector` for matching vectors
    /// before handing the event to [`DriverCallbacks::on_rx_event`].
    pub auto_reply_get_properties: bool,
    /// How long [`Driver::stop`] waits for the hardware task to exit before
    /// aborting it.
    pub shutdown_drain: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            auto_reply_get_properties: true,
            shutdown_drain: Duration::from_secs(2),
        }
    }
}

/// User-supplied hooks invoked by the driver event loop. Every method has a
/// no-op default, so a driver only overrides what it cares about.
#[async_trait]
pub trait DriverCallbacks: Send + Sync {
    /// A client (or the server on a client's behalf) sent this driver an
    /// inbound event (`getProperties`, `enableBLOB`, `new*Vector`).
    async fn on_rx_event(&self, _ctx: &DriverHandle, _event: Event) {}

    /// Called repeatedly by the hardware task until [`Driver::stop`] fires;
    /// the implementation is expected to poll real hardware and call
    /// `ctx.send_set_vector(...)` as state changes.
    async fn on_hardware(&self, _ctx: &DriverHandle) {}

    /// Traffic from another device this driver snoops, matching a prior
    /// `send_get_properties` subscription.
    async fn on_snoop_event(&self, _ctx: &DriverHandle, _event: Event) {}
}

struct DriverState {
    devices: RwLock<IndexMap<String, Device>>,
    snoop_subscriptions: Mutex<HashSet<(Option<String>, Option<String>)>>,
    outbound: mpsc::Sender<MessageType>,
    config: DriverConfig,
}

/// Cheap-to-clone handle passed into [`DriverCallbacks`] methods and usable
/// from anywhere a driver needs to touch its own device arena or emit
/// traffic.
#[derive(Clone)]
pub struct DriverHandle {
    state: Arc<DriverState>,
}

impl DriverHandle {
    /// Register (or replace) a device in this driver's arena.
    pub async fn register_device(&self, device: Device) {
        self.state
            .devices
            .write()
            .await
            .insert(device.devicename.clone(), device);
    }

    /// Run `f` against a device, if present.
    pub async fn with_device<R>(&self, device: &str, f: impl FnOnce(&Device) -> R) -> Option<R> {
        self.state.devices.read().await.get(device).map(f)
    }

    /// Run `f` against a device mutably, if present.
    pub async fn with_device_mut<R>(
        &self,
        device: &str,
        f: impl FnOnce(&mut Device) -> R,
    ) -> Option<R> {
        self.state.devices.write().await.get_mut(device).map(f)
    }

    /// Diff `vector`'s members against what was last sent and, unless
    /// `allvalues` forces a resend, enqueue a `set*Vector` only if something
    /// changed (§8 Idempotence).
    pub async fn send_set_vector(&self, device: &str, vector: &str, allvalues: bool) -> Result<()> {
        let needs_send = {
            let devices = self.state.devices.read().await;
            let vector = devices
                .get(device)
                .and_then(|d| d.vector(vector))
                .ok_or_else(|| Error::Property(format!("unknown vector {device}.{vector}")))?;
            allvalues || vector.has_unsent_changes()
        };
        if !needs_send {
            return Ok(());
        }
        self.send_set_vector_members(device, vector, &[]).await
    }

    /// Emit a `set*Vector` carrying only the named members (empty slice
    /// means "every member"). The only path that may carry BLOB payloads;
    /// always enqueues exactly one envelope, even when `members` is empty
    /// and nothing textually changed (§4.4).
    pub async fn send_set_vector_members(
        &self,
        device: &str,
        vector: &str,
        members: &[String],
    ) -> Result<()> {
        let message = {
            let mut devices = self.state.devices.write().await;
            let v = devices
                .get_mut(device)
                .and_then(|d| d.vector_mut(vector))
                .ok_or_else(|| Error::Property(format!("unknown vector {device}.{vector}")))?;
            let message = vector_to_set(device, v, members);
            v.mark_sent();
            message
        };
        self.enqueue(message).await
    }

    /// Emit a device-wide or vector-scoped `delProperty`.
    pub async fn send_del_property(
        &self,
        device: &str,
        vector: Option<&str>,
        message: Option<String>,
    ) -> Result<()> {
        {
            let mut devices = self.state.devices.write().await;
            if let Some(d) = devices.get_mut(device) {
                match vector {
                    Some(name) => d.delete_vector(name),
                    None => d.delete(),
                }
            }
        }
        let del = crate::message::common::DelProperty {
            device: device.to_string(),
            name: vector.map(str::to_string),
            timestamp: Some(INDITimestamp::now(None)),
            message,
        };
        self.enqueue(MessageType::DelProperty(del)).await
    }

    /// Subscribe to another device's traffic. A request naming one of this
    /// driver's own devices is silently dropped (§4.4/§4.5): a driver never
    /// needs to snoop itself.
    pub async fn send_get_properties(&self, device: Option<String>, vector: Option<String>) -> Result<()> {
        if let Some(d) = &device {
            if self.state.devices.read().await.contains_key(d) {
                tracing::trace!(device = %d, "ignoring self-targeted getProperties subscription");
                return Ok(());
            }
        }
        self.state
            .snoop_subscriptions
            .lock()
            .await
            .insert((device.clone(), vector.clone()));
        let get_properties = crate::message::common::GetProperties::new(device, vector);
        self.enqueue(MessageType::GetProperties(get_properties)).await
    }

    /// Emit free-form commentary (`message` element), optionally scoped to
    /// a device.
    pub async fn send_message(&self, device: Option<String>, text: String) -> Result<()> {
        let message = crate::message::common::Message {
            device,
            timestamp: Some(INDITimestamp::now(None)),
            message: Some(text),
        };
        self.enqueue(MessageType::Message(message)).await
    }

    /// Parse a `oneNumber`/`defNumber` text value (printf or sexagesimal)
    /// into its `f64`.
    pub fn indi_number_to_float(raw: &str) -> Result<f64> {
        format::parse_number(raw)
    }

    /// The set of `(device, vector)` subscriptions this driver has asked to
    /// snoop, used by [`crate::server::Server`] routing rule 3.
    pub async fn snoop_subscriptions(&self) -> HashSet<(Option<String>, Option<String>)> {
        self.state.snoop_subscriptions.lock().await.clone()
    }

    /// Names of every device currently registered in this driver's arena,
    /// used by [`crate::server::Server::register_driver`] to detect
    /// devicename collisions across drivers.
    pub async fn device_names(&self) -> Vec<String> {
        self.state.devices.read().await.keys().cloned().collect()
    }

    /// `true` if this driver currently owns `device` and `device`'s vector
    /// named `vector` (when given) is enabled — used by the router to
    /// decide whether a snoop subscription matches.
    pub async fn owns(&self, device: &str) -> bool {
        self.state
            .devices
            .read()
            .await
            .get(device)
            .is_some_and(|d| d.enable)
    }

    async fn enqueue(&self, message: MessageType) -> Result<()> {
        self.state
            .outbound
            .send(message)
            .await
            .map_err(|e| Error::Connection(format!("driver outbound queue closed: {e}")))
    }
}

/// One running driver: an event loop over inbound client traffic, a
/// parallel hardware task, and the channels wiring both to the outside
/// world.
pub struct Driver {
    handle: DriverHandle,
    callbacks: Arc<dyn DriverCallbacks>,
    inbound_rx: mpsc::Receiver<Event>,
    snoop_inbound_rx: mpsc::Receiver<Event>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Channels used to feed traffic into a [`Driver`] from its connection.
pub struct DriverChannels {
    /// Send inbound client events (`getProperties`, `new*Vector`, ...) here.
    pub inbound_tx: mpsc::Sender<Event>,
    /// Send snooped events matching this driver's subscriptions here.
    pub snoop_inbound_tx: mpsc::Sender<Event>,
    /// Receive every message this driver emits, in order.
    pub outbound_rx: mpsc::Receiver<MessageType>,
}

impl Driver {
    /// Construct a driver with an empty device arena. Returns the driver
    /// itself (to be `.run()` on a task) plus the channels its connection
    /// uses to feed it traffic and drain its output.
    pub fn new(config: DriverConfig, callbacks: Arc<dyn DriverCallbacks>) -> (Self, DriverChannels) {
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (snoop_inbound_tx, snoop_inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(DriverState {
            devices: RwLock::new(IndexMap::new()),
            snoop_subscriptions: Mutex::new(HashSet::new()),
            outbound: outbound_tx,
            config,
        });
        let handle = DriverHandle { state };

        let driver = Self {
            handle,
            callbacks,
            inbound_rx,
            snoop_inbound_rx,
            shutdown_tx,
            shutdown_rx,
        };
        let channels = DriverChannels {
            inbound_tx,
            snoop_inbound_tx,
            outbound_rx,
        };
        (driver, channels)
    }

    /// A clone of this driver's handle, for registering devices before
    /// `run()` is called.
    pub fn handle(&self) -> DriverHandle {
        self.handle.clone()
    }

    /// Signal shutdown; `run()`'s hardware task gets up to
    /// `DriverConfig::shutdown_drain` to notice and return.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Drive the driver's event loop until `stop()` is called and both
    /// queues drain.
    pub async fn run(mut self) {
        let hardware_handle = self.handle.clone();
        let hardware_callbacks = self.callbacks.clone();
        let mut hardware_shutdown = self.shutdown_rx.clone();
        let drain = self.handle.state.config.shutdown_drain;

        let hardware_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = hardware_shutdown.changed() => {
                        if *hardware_shutdown.borrow() {
                            break;
                        }
                    }
                    _ = hardware_callbacks.on_hardware(&hardware_handle) => {}
                }
            }
        });

        loop {
            tokio::select! {
                _ = self.shutdown_rx.changed() => {
                    if *self.shutdown_rx.borrow() {
                        break;
                    }
                }
                Some(event) = self.inbound_rx.recv() => {
                    self.dispatch_inbound(event).await;
                }
                Some(event) = self.snoop_inbound_rx.recv() => {
                    self.callbacks.on_snoop_event(&self.handle, event).await;
                }
                else => break,
            }
        }

        if tokio::time::timeout(drain, hardware_task).await.is_err() {
            tracing::warn!("hardware task did not exit within shutdown_drain; abandoning it");
        }
    }

    async fn dispatch_inbound(&self, event: Event) {
        if let Event::GetProperties(ref query) = event {
            if self.handle.state.config.auto_reply_get_properties {
                self.auto_reply_get_properties(query.device.as_deref(), query.name.as_deref())
                    .await;
                return;
            }
        }
        self.callbacks.on_rx_event(&self.handle, event).await;
    }

    async fn auto_reply_get_properties(&self, device: Option<&str>, vector: Option<&str>) {
        let devices = self.handle.state.devices.read().await;
        for d in devices.values() {
            if !d.enable {
                continue;
            }
            if let Some(filter) = device {
                if d.devicename != filter {
                    continue;
                }
            }
            for v in d.vectors.values() {
                if !v.enable {
                    continue;
                }
                if let Some(filter) = vector {
                    if v.name != filter {
                        continue;
                    }
                }
                let message = vector_to_def(&d.devicename, v);
                if self.handle.enqueue(message).await.is_err() {
                    return;
                }
            }
        }
    }
}

fn vector_to_def(device: &str, vector: &Vector) -> MessageType {
    match vector.kind {
        VectorKind::Text => MessageType::DefTextVector(DefTextVector {
            device: device.to_string(),
            name: vector.name.clone(),
            label: vector.label.clone(),
            group: vector.group.clone(),
            state: vector.state,
            perm: vector.perm.unwrap_or(crate::property::PropertyPerm::Ro),
            timeout: vector.timeout,
            timestamp: vector.timestamp.clone(),
            message: None,
            texts: vector
                .members
                .values()
                .map(|m| DefText {
                    name: m.name.clone(),
                    label: m.label.clone(),
                    value: text_value(&m.value),
                })
                .collect(),
        }),
        VectorKind::Number => MessageType::DefNumberVector(DefNumberVector {
            device: device.to_string(),
            name: vector.name.clone(),
            label: vector.label.clone(),
            group: vector.group.clone(),
            state: vector.state,
            perm: vector.perm.unwrap_or(crate::property::PropertyPerm::Ro),
            timeout: vector.timeout,
            timestamp: vector.timestamp.clone(),
            message: None,
            numbers: vector
                .members
                .values()
                .map(|m| {
                    let (value, format, min, max, step) = number_fields(&m.value);
                    DefNumber::new(m.name.clone(), m.label.clone(), format, min, max, step, value)
                })
                .collect(),
        }),
        VectorKind::Switch => MessageType::DefSwitchVector(DefSwitchVector {
            device: device.to_string(),
            name: vector.name.clone(),
            label: vector.label.clone(),
            group: vector.group.clone(),
            state: vector.state,
            perm: vector.perm.unwrap_or(crate::property::PropertyPerm::Ro),
            rule: vector.rule.unwrap_or(crate::property::SwitchRule::AnyOfMany),
            timeout: vector.timeout,
            timestamp: vector.timestamp.clone(),
            message: None,
            switches: vector
                .members
                .values()
                .map(|m| DefSwitch {
                    name: m.name.clone(),
                    label: m.label.clone(),
                    value: switch_value(&m.value),
                })
                .collect(),
        }),
        VectorKind::Light => MessageType::DefLightVector(DefLightVector {
            device: device.to_string(),
            name: vector.name.clone(),
            label: vector.label.clone(),
            group: vector.group.clone(),
            state: vector.state,
            timestamp: vector.timestamp.clone(),
            message: None,
            lights: vector
                .members
                .values()
                .map(|m| DefLight {
                    name: m.name.clone(),
                    label: m.label.clone(),
                    state: light_value(&m.value),
                })
                .collect(),
        }),
        VectorKind::Blob => MessageType::DefBLOBVector(DefBLOBVector {
            device: device.to_string(),
            name: vector.name.clone(),
            label: vector.label.clone(),
            group: vector.group.clone(),
            state: vector.state,
            perm: vector.perm.unwrap_or(crate::property::PropertyPerm::Ro),
            timeout: vector.timeout,
            message: None,
            timestamp: vector.timestamp.clone(),
            blobs: vector
                .members
                .values()
                .map(|m| DefBLOB {
                    name: m.name.clone(),
                    label: m.label.clone(),
                })
                .collect(),
        }),
    }
}

/// Build a `set*Vector` for `vector`. `only` restricts the emitted members
/// to the named subset; an empty slice means "every member".
fn vector_to_set(device: &str, vector: &Vector, only: &[String]) -> MessageType {
    let include = |name: &str| only.is_empty() || only.iter().any(|n| n == name);
    match vector.kind {
        VectorKind::Text => MessageType::SetTextVector(crate::message::text::SetTextVector {
            device: device.to_string(),
            name: vector.name.clone(),
            state: Some(vector.state),
            timeout: vector.timeout,
            timestamp: vector.timestamp.clone(),
            message: None,
            texts: vector
                .members
                .values()
                .filter(|m| include(&m.name))
                .map(|m| OneText {
                    name: m.name.clone(),
                    value: text_value(&m.value),
                })
                .collect(),
        }),
        VectorKind::Number => MessageType::SetNumberVector(crate::message::number::SetNumberVector {
            device: device.to_string(),
            name: vector.name.clone(),
            state: Some(vector.state),
            timeout: vector.timeout,
            timestamp: vector.timestamp.clone(),
            message: None,
            numbers: vector
                .members
                .values()
                .filter(|m| include(&m.name))
                .map(|m| OneNumber {
                    name: m.name.clone(),
                    value: number_fields(&m.value).0,
                })
                .collect(),
        }),
        VectorKind::Switch => MessageType::SetSwitchVector(crate::message::switch::SetSwitchVector {
            device: device.to_string(),
            name: vector.name.clone(),
            state: Some(vector.state),
            timeout: vector.timeout,
            timestamp: vector.timestamp.clone(),
            message: None,
            switches: vector
                .members
                .values()
                .filter(|m| include(&m.name))
                .map(|m| OneSwitch {
                    name: m.name.clone(),
                    value: switch_value(&m.value),
                })
                .collect(),
        }),
        VectorKind::Light => MessageType::SetLightVector(crate::message::light::SetLightVector {
            device: device.to_string(),
            name: vector.name.clone(),
            state: Some(vector.state),
            timestamp: vector.timestamp.clone(),
            message: None,
            lights: vector
                .members
                .values()
                .filter(|m| include(&m.name))
                .map(|m| crate::message::light::OneLight {
                    name: m.name.clone(),
                    value: light_value(&m.value),
                })
                .collect(),
        }),
        VectorKind::Blob => MessageType::SetBLOBVector(crate::message::blob::SetBLOBVector {
            device: device.to_string(),
            name: vector.name.clone(),
            state: vector.state,
            timestamp: vector.timestamp.clone(),
            message: None,
            blobs: vector
                .members
                .values()
                .filter(|m| include(&m.name))
                .map(|m| match &m.value {
                    MemberValue::Blob { format, data } => {
                        OneBLOB::new(m.name.clone(), format.clone(), data.clone())
                    }
                    _ => OneBLOB::new(m.name.clone(), String::new(), Vec::new()),
                })
                .collect(),
        }),
    }
}

fn text_value(value: &MemberValue) -> String {
    match value {
        MemberValue::Text(s) => s.clone(),
        _ => String::new(),
    }
}

fn number_fields(value: &MemberValue) -> (f64, String, f64, f64, f64) {
    match value {
        MemberValue::Number { value, format, min, max, step } => {
            (*value, format.clone(), *min, *max, *step)
        }
        _ => (0.0, "%g".to_string(), 0.0, 0.0, 0.0),
    }
}

fn switch_value(value: &MemberValue) -> SwitchState {
    match value {
        MemberValue::Switch(s) => *s,
        _ => SwitchState::Off,
    }
}

fn light_value(value: &MemberValue) -> PropertyState {
    match value {
        MemberValue::Light(s) => *s,
        _ => PropertyState::Idle,
    }
}

/// Convert a parsed `new*Vector` [`Event`] into the partial-update map
/// [`Vector::apply_new`] expects, dropping members the vector doesn't
/// define. Returns `None` for events that aren't a `new*Vector`.
pub fn new_vector_updates(event: &Event) -> Option<(&str, &str, IndexMap<String, MemberValue>)> {
    match event {
        Event::NewTextVector(m) => Some((
            &m.device,
            &m.name,
            m.texts
                .iter()
                .map(|t| (t.name.clone(), MemberValue::Text(t.value.clone())))
                .collect(),
        )),
        Event::NewNumberVector(m) => Some((
            &m.device,
            &m.name,
            m.numbers
                .iter()
                .map(|n| {
                    (
                        n.name.clone(),
                        MemberValue::Number {
                            value: n.value,
                            format: String::new(),
                            min: 0.0,
                            max: 0.0,
                            step: 0.0,
                        },
                    )
                })
                .collect(),
        )),
        Event::NewSwitchVector(m) => Some((
            &m.device,
            &m.name,
            m.switches
                .iter()
                .map(|s| (s.name.clone(), MemberValue::Switch(s.value)))
                .collect(),
        )),
        Event::NewBlobVector(m) => Some((
            &m.device,
            &m.name,
            m.blobs
                .iter()
                .map(|b| {
                    let data = b.get_data().unwrap_or_default();
                    (
                        b.name.clone(),
                        MemberValue::Blob {
                            format: b.format.clone(),
                            data,
                        },
                    )
                })
                .collect(),
        )),
        _ => None,
    }
}
