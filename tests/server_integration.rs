//! End-to-end tests driving [`Server`] over real TCP sockets: a client
//! connects exactly as `indiserver`'s clients do, talking raw XML over the
//! wire to an in-process driver routed through the server.

use async_trait::async_trait;
use indi_hub::blob_policy::BlobMode;
use indi_hub::driver::{Driver, DriverCallbacks, DriverConfig, DriverHandle};
use indi_hub::message::blob::OneBLOB;
use indi_hub::message::switch::OneSwitch;
use indi_hub::message::MessageType;
use indi_hub::model::{Device, Event, Member, MemberValue, Vector, VectorKind};
use indi_hub::property::{PropertyPerm, SwitchRule, SwitchState};
use indi_hub::server::{Server, ServerConfig};
use indi_hub::xml::ElementFramer;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

struct CameraSimulator;

#[async_trait]
impl DriverCallbacks for CameraSimulator {
    async fn on_rx_event(&self, ctx: &DriverHandle, event: Event) {
        if let Some((device, vector, updates)) = indi_hub::driver::new_vector_updates(&event) {
            let device = device.to_string();
            let vector = vector.to_string();
            let applied = ctx
                .with_device_mut(&device, |d| d.vector_mut(&vector).map(|v| v.apply_new(updates)).transpose())
                .await;
            if matches!(applied, Some(Ok(Some(())))) {
                let _ = ctx.send_set_vector(&device, &vector, true).await;
            }
        }
    }
}

fn camera_device() -> Device {
    let mut device = Device::new("CCD Simulator");

    let mut connection = Vector::new(VectorKind::Switch, "CONNECTION", Some(PropertyPerm::Rw));
    connection.rule = Some(SwitchRule::OneOfMany);
    connection
        .members
        .insert("CONNECT".into(), Member::new("CONNECT", MemberValue::Switch(SwitchState::Off)));
    connection
        .members
        .insert("DISCONNECT".into(), Member::new("DISCONNECT", MemberValue::Switch(SwitchState::On)));
    device.insert_vector(connection);

    let mut image = Vector::new(VectorKind::Blob, "CCD1", Some(PropertyPerm::Rw));
    image.members.insert(
        "CCD1".into(),
        Member::new("CCD1", MemberValue::Blob { format: ".fits".into(), data: vec![] }),
    );
    device.insert_vector(image);

    device
}

fn focuser_device() -> Device {
    let mut device = Device::new("Focuser Simulator");
    let mut position = Vector::new(VectorKind::Number, "ABS_FOCUS_POSITION", Some(PropertyPerm::Rw));
    position.members.insert(
        "FOCUS_ABSOLUTE_POSITION".into(),
        Member::new(
            "FOCUS_ABSOLUTE_POSITION",
            MemberValue::Number { value: 0.0, format: "%.2f".into(), min: 0.0, max: 100_000.0, step: 1.0 },
        ),
    );
    device.insert_vector(position);
    device
}

fn snoop_device() -> Device {
    Device::new("Snoop Controller")
}

/// Records every snooped `(device, vector)` pair a driver observed, for
/// tests that need to see inside the router's snoop fan-out.
#[derive(Clone, Default)]
struct SnoopLog(Arc<Mutex<Vec<(String, String)>>>);

impl SnoopLog {
    fn seen(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }
}

struct SnoopRecorder {
    log: SnoopLog,
}

#[async_trait]
impl DriverCallbacks for SnoopRecorder {
    async fn on_snoop_event(&self, _ctx: &DriverHandle, event: Event) {
        if let (Some(device), Some(vector)) = (event.device(), event.vector_name()) {
            self.log.0.lock().unwrap().push((device.to_string(), vector.to_string()));
        }
    }
}

async fn start_server() -> Arc<Server> {
    let server = Server::new(ServerConfig::new("127.0.0.1:0", 5));
    let (driver, channels) = Driver::new(DriverConfig::default(), Arc::new(CameraSimulator));
    driver.handle().register_device(camera_device()).await;
    server.register_driver(driver, channels).await.unwrap();

    let run_server = server.clone();
    tokio::spawn(async move {
        let _ = run_server.run().await;
    });
    server.local_addr().await;
    server
}

/// A connected test client: a writer half for raw XML and a framer over the
/// reader half for pulling parsed elements back off the wire.
struct TestClient {
    writer: OwnedWriteHalf,
    framer: ElementFramer<BufReader<OwnedReadHalf>>,
}

impl TestClient {
    async fn connect(server: &Server) -> Self {
        let addr = server.local_addr().await;
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        let framer = ElementFramer::new(BufReader::new(read_half), 64 * 1024);
        Self { writer, framer }
    }

    async fn send(&mut self, message: &MessageType) {
        let xml = indi_hub::xml::emit(message).unwrap();
        self.writer.write_all(xml.as_bytes()).await.unwrap();
    }

    async fn send_raw(&mut self, xml: &[u8]) {
        self.writer.write_all(xml).await.unwrap();
    }

    async fn recv(&mut self) -> MessageType {
        let raw = tokio::time::timeout(Duration::from_secs(2), self.framer.next_element())
            .await
            .expect("timed out waiting for an element")
            .unwrap()
            .expect("connection closed before an element arrived");
        raw.parse().unwrap()
    }

    async fn recv_matching(&mut self, matches: impl Fn(&MessageType) -> bool) -> MessageType {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let message = self.recv().await;
                if matches(&message) {
                    return message;
                }
            }
        })
        .await
        .expect("timed out waiting for a matching element")
    }
}

#[tokio::test]
async fn discovery_round_trip_returns_def_vectors() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    client.send_raw(br#"<getProperties version="1.7"/>"#).await;

    let first = client.recv().await;
    assert!(matches!(first, MessageType::DefSwitchVector(_) | MessageType::DefBLOBVector(_)));
    let second = client.recv().await;
    assert!(matches!(second, MessageType::DefSwitchVector(_) | MessageType::DefBLOBVector(_)));
}

#[tokio::test]
async fn new_switch_vector_is_applied_and_echoed_back() {
    let server = start_server().await;
    let mut client = TestClient::connect(&server).await;

    let new_switch = MessageType::NewSwitchVector(indi_hub::message::switch::NewSwitchVector {
        device: "CCD Simulator".to_string(),
        name: "CONNECTION".to_string(),
        timestamp: None,
        switches: vec![
            OneSwitch { name: "CONNECT".to_string(), value: SwitchState::On },
            OneSwitch { name: "DISCONNECT".to_string(), value: SwitchState::Off },
        ],
    });
    client.send(&new_switch).await;

    let message = client.recv().await;
    match message {
        MessageType::SetSwitchVector(set) => {
            assert_eq!(set.device, "CCD Simulator");
            let connect = set.switches.iter().find(|s| s.name == "CONNECT").unwrap();
            assert_eq!(connect.value, SwitchState::On);
        }
        other => panic!("expected SetSwitchVector, got {other:?}"),
    }
}

#[tokio::test]
async fn blob_policy_gates_blob_vector_delivery() {
    let server = start_server().await;
    let mut watcher = TestClient::connect(&server).await;

    // A fresh connection defaults to BlobMode::Never; widen it before the
    // driver's reply would otherwise be silently dropped.
    watcher
        .send_raw(br#"<enableBLOB device="CCD Simulator" name="CCD1">Also</enableBLOB>"#)
        .await;

    let new_blob = MessageType::NewBLOBVector(indi_hub::message::blob::NewBLOBVector {
        device: "CCD Simulator".to_string(),
        name: "CCD1".to_string(),
        timestamp: None,
        blobs: vec![OneBLOB::new("CCD1".to_string(), ".fits".to_string(), vec![1, 2, 3])],
    });
    watcher.send(&new_blob).await;

    let message = watcher.recv_matching(|m| matches!(m, MessageType::SetBLOBVector(_))).await;
    match message {
        MessageType::SetBLOBVector(set) => {
            let blob = set.blobs.iter().find(|b| b.name == "CCD1").unwrap();
            assert_eq!(blob.get_data().unwrap(), vec![1, 2, 3]);
        }
        other => panic!("expected SetBLOBVector, got {other:?}"),
    }
}

#[tokio::test]
async fn second_client_without_enable_blob_never_sees_blob_traffic() {
    let server = start_server().await;
    let mut silent = TestClient::connect(&server).await;
    let mut mover = TestClient::connect(&server).await;

    mover
        .send(&MessageType::NewSwitchVector(indi_hub::message::switch::NewSwitchVector {
            device: "CCD Simulator".to_string(),
            name: "CONNECTION".to_string(),
            timestamp: None,
            switches: vec![
                OneSwitch { name: "CONNECT".to_string(), value: SwitchState::On },
                OneSwitch { name: "DISCONNECT".to_string(), value: SwitchState::Off },
            ],
        }))
        .await;

    // The non-BLOB set*Vector still reaches every client, including one that
    // never touched enableBLOB.
    let message = silent.recv().await;
    assert!(matches!(message, MessageType::SetSwitchVector(_)));
}

#[tokio::test]
async fn new_number_vector_is_applied_and_value_round_trips() {
    let server = Server::new(ServerConfig::new("127.0.0.1:0", 5));
    let (driver, channels) = Driver::new(DriverConfig::default(), Arc::new(CameraSimulator));
    driver.handle().register_device(focuser_device()).await;
    server.register_driver(driver, channels).await.unwrap();
    let run_server = server.clone();
    tokio::spawn(async move {
        let _ = run_server.run().await;
    });

    // Exercise the sexagesimal-to-float conversion a driver author would use
    // to turn a human-entered target into the value carried on the wire.
    let target = DriverHandle::indi_number_to_float("182:30:15").unwrap();
    assert!((target - 182.504_166_666_666_66).abs() < 1e-6);

    let mut client = TestClient::connect(&server).await;
    let new_number = MessageType::NewNumberVector(indi_hub::message::number::NewNumberVector {
        device: "Focuser Simulator".to_string(),
        name: "ABS_FOCUS_POSITION".to_string(),
        timestamp: None,
        numbers: vec![indi_hub::message::number::OneNumber { name: "FOCUS_ABSOLUTE_POSITION".to_string(), value: target }],
    });
    client.send(&new_number).await;

    let message = client.recv_matching(|m| matches!(m, MessageType::SetNumberVector(_))).await;
    match message {
        MessageType::SetNumberVector(set) => {
            let position = set.numbers.iter().find(|n| n.name == "FOCUS_ABSOLUTE_POSITION").unwrap();
            assert!((position.value - target).abs() < 1e-6);
        }
        other => panic!("expected SetNumberVector, got {other:?}"),
    }
}

#[tokio::test]
async fn driver_snoop_subscription_is_scoped_to_one_vector() {
    let server = Server::new(ServerConfig::new("127.0.0.1:0", 5));

    let (camera, camera_channels) = Driver::new(DriverConfig::default(), Arc::new(CameraSimulator));
    camera.handle().register_device(camera_device()).await;
    server.register_driver(camera, camera_channels).await.unwrap();

    let log = SnoopLog::default();
    let (snoop, snoop_channels) = Driver::new(DriverConfig::default(), Arc::new(SnoopRecorder { log: log.clone() }));
    snoop.handle().register_device(snoop_device()).await;
    // Subscribe to exactly one vector on the other driver's device: CONNECTION,
    // never CCD1.
    snoop
        .handle()
        .send_get_properties(Some("CCD Simulator".to_string()), Some("CONNECTION".to_string()))
        .await
        .unwrap();
    server.register_driver(snoop, snoop_channels).await.unwrap();

    let run_server = server.clone();
    tokio::spawn(async move {
        let _ = run_server.run().await;
    });

    let mut client = TestClient::connect(&server).await;

    client
        .send(&MessageType::NewSwitchVector(indi_hub::message::switch::NewSwitchVector {
            device: "CCD Simulator".to_string(),
            name: "CONNECTION".to_string(),
            timestamp: None,
            switches: vec![
                OneSwitch { name: "CONNECT".to_string(), value: SwitchState::On },
                OneSwitch { name: "DISCONNECT".to_string(), value: SwitchState::Off },
            ],
        }))
        .await;
    client.recv_matching(|m| matches!(m, MessageType::SetSwitchVector(_))).await;

    client
        .send(&MessageType::NewBLOBVector(indi_hub::message::blob::NewBLOBVector {
            device: "CCD Simulator".to_string(),
            name: "CCD1".to_string(),
            timestamp: None,
            blobs: vec![OneBLOB::new("CCD1".to_string(), ".fits".to_string(), vec![9, 9, 9])],
        }))
        .await;
    // The client never enabled BLOB traffic for itself, so there's nothing to
    // synchronize on here; give the router a moment to fan the event out to
    // the snoop driver before inspecting its log.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let seen = log.seen();
    assert!(
        seen.contains(&("CCD Simulator".to_string(), "CONNECTION".to_string())),
        "expected the subscribed vector to be snooped, got {seen:?}"
    );
    assert!(
        !seen.iter().any(|(_, vector)| vector == "CCD1"),
        "a vector-scoped snoop subscription must never see another vector's traffic, got {seen:?}"
    );
}

#[tokio::test]
async fn remote_link_relays_driver_traffic_to_downstream_clients() {
    let upstream = start_server().await;
    let upstream_addr = upstream.local_addr().await;

    let downstream = Server::new(ServerConfig::new("127.0.0.1:0", 5));
    let run_downstream = downstream.clone();
    tokio::spawn(async move {
        let _ = run_downstream.run().await;
    });
    downstream.local_addr().await;
    downstream
        .add_remote(upstream_addr.ip().to_string(), upstream_addr.port(), BlobMode::Also)
        .await;
    // Let the reconnect supervisor establish the upstream TCP link before
    // routing a query through it.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut client = TestClient::connect(&downstream).await;
    client.send_raw(br#"<getProperties version="1.7"/>"#).await;

    let first = client.recv().await;
    assert!(matches!(first, MessageType::DefSwitchVector(_) | MessageType::DefBLOBVector(_)));
    let second = client.recv().await;
    assert!(matches!(second, MessageType::DefSwitchVector(_) | MessageType::DefBLOBVector(_)));
}
