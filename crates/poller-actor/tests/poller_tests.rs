use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use inverter::{Family, Inverter, InverterError};
use poller_actor::{ActorConfig, PollSample, PollerActor, PollerError};
use sensor_parser::SensorDescriptor;
use types::{DeviceIdentity, SensorValue, TelemetrySnapshot};
use udp_client::{ClientConfig, ClientError, UdpClient};

#[derive(Debug, Clone, Copy)]
enum Behaviour {
    Answer,
    /// Fails every odd call with a timeout.
    FailOddCalls,
    Hang,
}

#[derive(Debug)]
struct ScriptedInverter {
    client: UdpClient,
    identity: Option<DeviceIdentity>,
    behaviour: Behaviour,
    calls: Arc<AtomicUsize>,
}

impl ScriptedInverter {
    fn boxed(behaviour: Behaviour, calls: &Arc<AtomicUsize>) -> Box<dyn Inverter> {
        Box::new(Self {
            client: UdpClient::new(ClientConfig::default()),
            identity: Some(DeviceIdentity {
                model_name: "GW10K-ET".to_string(),
                serial_number: "9010KETU201W0001".to_string(),
                firmware_version: "04029-06-S11".to_string(),
            }),
            behaviour,
            calls: Arc::clone(calls),
        })
    }
}

#[async_trait]
impl Inverter for ScriptedInverter {
    fn family(&self) -> Family {
        Family::Et
    }

    fn client(&self) -> &UdpClient {
        &self.client
    }

    fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    async fn identify(&mut self) -> Result<DeviceIdentity, InverterError> {
        Ok(self.identity.clone().expect("identity"))
    }

    async fn fetch_telemetry(&self) -> Result<TelemetrySnapshot, InverterError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Hang => std::future::pending().await,
            Behaviour::FailOddCalls if call % 2 == 0 => Err(InverterError::Transport {
                command: "read_running_data",
                source: ClientError::Timeout {
                    attempts: 4,
                    malformed: 0,
                    timeout_ms: 2_000,
                },
            }),
            _ => {
                let mut snapshot = TelemetrySnapshot::new();
                snapshot.insert("ppv", Some(SensorValue::Integer(call as i64)));
                Ok(snapshot)
            }
        }
    }

    fn sensors(&self) -> Vec<&'static SensorDescriptor> {
        Vec::new()
    }
}

fn config() -> ActorConfig {
    ActorConfig {
        poll_interval: Duration::from_millis(10),
        jitter_ms: 5,
    }
}

async fn next_sample(rx: &mut mpsc::Receiver<PollSample>) -> PollSample {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("sample in time")
        .expect("channel open")
}

#[tokio::test]
async fn forwards_samples_until_shutdown() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let actor = PollerActor::new(
        ScriptedInverter::boxed(Behaviour::Answer, &calls),
        tx,
        shutdown_rx,
        config(),
    );
    let handle = tokio::spawn(actor.run());

    let first = next_sample(&mut rx).await;
    let second = next_sample(&mut rx).await;
    assert_eq!(first.family, Family::Et);
    assert_eq!(
        first.identity.as_ref().map(|i| i.serial_number.as_str()),
        Some("9010KETU201W0001")
    );
    assert_eq!(first.snapshot.get("ppv"), Some(&SensorValue::Integer(0)));
    assert_eq!(second.snapshot.get("ppv"), Some(&SensorValue::Integer(1)));
    assert!(second.collected_at_ms >= first.collected_at_ms);

    shutdown_tx.send(true).expect("signal shutdown");
    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("actor stops")
        .expect("join");
    assert!(result.is_ok());
}

#[tokio::test]
async fn failed_polls_are_skipped() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::channel(4);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let actor = PollerActor::new(
        ScriptedInverter::boxed(Behaviour::FailOddCalls, &calls),
        tx,
        shutdown_rx,
        config(),
    );
    tokio::spawn(actor.run());

    let first = next_sample(&mut rx).await;
    let second = next_sample(&mut rx).await;
    assert_eq!(first.snapshot.get("ppv"), Some(&SensorValue::Integer(1)));
    assert_eq!(second.snapshot.get("ppv"), Some(&SensorValue::Integer(3)));
}

#[tokio::test]
async fn shutdown_drops_in_flight_poll() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, _rx) = mpsc::channel(4);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let actor = PollerActor::new(
        ScriptedInverter::boxed(Behaviour::Hang, &calls),
        tx,
        shutdown_rx,
        config(),
    );
    let handle = tokio::spawn(actor.run());

    while calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    shutdown_tx.send(true).expect("signal shutdown");

    let result = timeout(Duration::from_secs(2), handle)
        .await
        .expect("actor stops")
        .expect("join");
    assert!(result.is_ok());
}

#[tokio::test]
async fn closed_channel_stops_actor() {
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let actor = PollerActor::new(
        ScriptedInverter::boxed(Behaviour::Answer, &calls),
        tx,
        shutdown_rx,
        config(),
    );

    let result = timeout(Duration::from_secs(2), actor.run())
        .await
        .expect("actor stops");
    assert!(matches!(result, Err(PollerError::ChannelClosed)));
}

#[test]
fn sample_serializes_snapshot_in_order() {
    let mut snapshot = TelemetrySnapshot::new();
    snapshot.insert("vpv1", Some(SensorValue::Float(380.0)));
    snapshot.insert("work_mode_label", None);
    let sample = PollSample {
        identity: None,
        family: Family::Es,
        snapshot,
        collected_at_ms: 42,
    };

    let json = serde_json::to_string(&sample).expect("serialize");
    assert_eq!(
        json,
        concat!(
            r#"{"identity":null,"family":"ES","#,
            r#""snapshot":{"vpv1":380.0,"work_mode_label":null},"collected_at_ms":42}"#
        )
    );
}
