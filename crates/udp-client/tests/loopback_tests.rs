use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::{oneshot, watch};
use tokio::time::{timeout, Instant};

use udp_client::{ClientConfig, ClientError, CommandSpec, UdpClient};

const PING: CommandSpec = CommandSpec::new("ping", &[0xAA, 0x55, 0x01], &[6]);

/// Fake inverter: answers each request with the reply scripted for it, `None` means stay silent.
/// Reports the number of requests seen once no request arrives for 300ms.
async fn spawn_inverter(script: Vec<Option<Vec<u8>>>) -> (u16, oneshot::Receiver<usize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
    let port = socket.local_addr().expect("local addr").port();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut buf = [0u8; 64];
        let mut seen = 0usize;
        loop {
            let received = timeout(Duration::from_millis(300), socket.recv_from(&mut buf)).await;
            let (len, peer) = match received {
                Ok(Ok(value)) => value,
                _ => break,
            };
            assert_eq!(&buf[..len], PING.request());
            if let Some(Some(reply)) = script.get(seen) {
                socket.send_to(reply, peer).await.expect("send reply");
            }
            seen += 1;
        }
        let _ = tx.send(seen);
    });

    (port, rx)
}

fn client(port: u16, timeout_ms: u64) -> UdpClient {
    let mut config = ClientConfig::default();
    config.port = port;
    config.timeout_ms = timeout_ms;
    UdpClient::new(config)
}

#[tokio::test]
async fn returns_reply_with_accepted_length() {
    let (port, seen) = spawn_inverter(vec![Some(vec![1, 2, 3, 4, 5, 6])]).await;

    let reply = client(port, 1_000).exchange(&PING).await.expect("exchange");
    assert_eq!(reply, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(seen.await.expect("seen"), 1);
}

#[tokio::test]
async fn malformed_replies_trigger_immediate_resend() {
    let (port, seen) = spawn_inverter(vec![
        Some(vec![0; 3]),
        Some(vec![0; 7]),
        Some(vec![9; 6]),
    ])
    .await;

    let started = Instant::now();
    let reply = client(port, 5_000).exchange(&PING).await.expect("exchange");
    assert_eq!(reply, vec![9; 6]);
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(seen.await.expect("seen"), 3);
}

#[tokio::test]
async fn succeeds_when_only_last_attempt_is_answered() {
    let (port, seen) = spawn_inverter(vec![None, None, None, Some(vec![7; 6])]).await;

    let reply = client(port, 50).exchange(&PING).await.expect("exchange");
    assert_eq!(reply, vec![7; 6]);
    assert_eq!(seen.await.expect("seen"), 4);
}

#[tokio::test]
async fn silent_inverter_exhausts_attempts() {
    let (port, seen) = spawn_inverter(Vec::new()).await;

    let err = client(port, 40)
        .exchange(&PING)
        .await
        .expect_err("silent inverter");
    match err {
        ClientError::Timeout {
            attempts,
            malformed,
            timeout_ms,
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(malformed, 0);
            assert_eq!(timeout_ms, 40);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(seen.await.expect("seen"), 4);
}

#[tokio::test]
async fn cancellation_is_distinct_from_timeout() {
    let (port, _seen) = spawn_inverter(Vec::new()).await;
    let (cancel_tx, cancel_rx) = watch::channel(false);

    let client = client(port, 10_000).with_cancellation(cancel_rx);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let _ = cancel_tx.send(true);
    });

    let started = Instant::now();
    let err = client.exchange(&PING).await.expect_err("cancelled");
    assert!(err.is_cancelled());
    assert!(!err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn already_cancelled_client_does_not_send() {
    let (port, seen) = spawn_inverter(vec![Some(vec![1; 6])]).await;
    let (_cancel_tx, cancel_rx) = watch::channel(true);

    let err = client(port, 1_000)
        .with_cancellation(cancel_rx)
        .exchange(&PING)
        .await
        .expect_err("cancelled");
    assert!(matches!(err, ClientError::Cancelled));
    assert_eq!(seen.await.expect("seen"), 0);
}

#[tokio::test]
async fn refused_port_is_retried_until_timeout() {
    let port = {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        socket.local_addr().expect("local addr").port()
    };

    let started = Instant::now();
    let err = client(port, 100)
        .exchange(&PING)
        .await
        .expect_err("nothing listens");
    assert!(
        matches!(
            err,
            ClientError::Timeout {
                attempts: 4,
                malformed: 0,
                ..
            }
        ),
        "{err:?}"
    );
    assert!(started.elapsed() >= Duration::from_millis(350));
}
