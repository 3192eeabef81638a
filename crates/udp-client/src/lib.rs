use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

mod exchange;

pub use exchange::{Exchange, ExchangeState, Failure, Step};

pub const DEFAULT_PORT: u16 = 8899;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

/// A fixed request datagram (header and checksum included) and the reply sizes it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    name: &'static str,
    request: &'static [u8],
    reply_lengths: &'static [usize],
}

impl CommandSpec {
    pub const fn new(
        name: &'static str,
        request: &'static [u8],
        reply_lengths: &'static [usize],
    ) -> Self {
        assert!(!reply_lengths.is_empty(), "command needs an accepted reply length");
        Self {
            name,
            request,
            reply_lengths,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn request(&self) -> &'static [u8] {
        self.request
    }

    pub fn reply_lengths(&self) -> &'static [usize] {
        self.reply_lengths
    }

    /// Exact length match; replies are framed by datagram boundaries only.
    pub fn accepts(&self, len: usize) -> bool {
        self.reply_lengths.contains(&len)
    }
}

/// Where and how patiently to talk to an inverter.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Wait per attempt in milliseconds.
    pub timeout_ms: u64,
    /// Timer-driven attempts, the first send included.
    pub max_attempts: u32,
    /// Receive buffer size; larger datagrams are truncated and fail the length check.
    pub recv_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout_ms: 2_000,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            recv_buffer: 1_024,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid socket address {0}:{1}")]
    InvalidAddress(String, u16),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "no valid response after {attempts} attempts of {timeout_ms}ms \
         ({malformed} malformed replies)"
    )]
    Timeout {
        attempts: u32,
        malformed: u32,
        timeout_ms: u64,
    },
    #[error("socket closed before a response arrived")]
    Closed,
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

/// Runs request/reply exchanges against one inverter endpoint.
///
/// Every exchange binds its own ephemeral socket and drops it on completion, so a
/// client holds no network resources between calls and clones are independent.
#[derive(Debug, Clone)]
pub struct UdpClient {
    config: ClientConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl UdpClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Aborts in-flight exchanges with [`ClientError::Cancelled`] once `signal` turns true.
    pub fn with_cancellation(mut self, signal: watch::Receiver<bool>) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub async fn exchange(&self, spec: &CommandSpec) -> Result<Vec<u8>, ClientError> {
        let mut cancel = self.cancel.clone();
        if is_cancelled(&cancel) {
            return Err(ClientError::Cancelled);
        }

        let addr = self.resolve().await?;
        let socket = UdpSocket::bind(unspecified_for(&addr)).await?;
        socket.connect(addr).await?;

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut exchange = Exchange::new(spec, self.config.max_attempts);
        let mut buf = vec![0u8; self.config.recv_buffer.max(1)];
        let mut deadline = Instant::now() + timeout;
        let mut step = exchange.start();

        loop {
            match step {
                Step::Send { rearm_timer } => {
                    debug!(
                        %addr,
                        command = spec.name(),
                        attempt = exchange.attempt(),
                        request = %hex::encode(spec.request()),
                        "send"
                    );
                    match socket.send(spec.request()).await {
                        Ok(_) => {}
                        Err(err) if is_transient(&err) => {
                            debug!(
                                %addr,
                                command = spec.name(),
                                error = %err,
                                "send error, awaiting retry"
                            );
                        }
                        Err(err) => {
                            warn!(%addr, command = spec.name(), error = %err, "udp send failed");
                            step = exchange.on_closed();
                            continue;
                        }
                    }
                    exchange.on_sent();
                    if rearm_timer {
                        deadline = Instant::now() + timeout;
                    }
                }
                Step::Complete(data) => {
                    debug!(%addr, command = spec.name(), len = data.len(), "exchange complete");
                    return Ok(data);
                }
                Step::Fail(failure) => {
                    warn!(%addr, command = spec.name(), ?failure, "exchange failed");
                    return Err(self.failure_error(failure));
                }
                Step::Wait => {}
            }

            step = tokio::select! {
                result = socket.recv(&mut buf) => match result {
                    Ok(len) => {
                        let data = &buf[..len];
                        debug!(
                            %addr,
                            command = spec.name(),
                            len,
                            reply = %hex::encode(data),
                            "received"
                        );
                        if !spec.accepts(len) {
                            debug!(
                                %addr,
                                expected = ?spec.reply_lengths(),
                                len,
                                "unexpected response length"
                            );
                        }
                        exchange.on_reply(data)
                    }
                    Err(err) if is_transient(&err) => {
                        debug!(
                            %addr,
                            command = spec.name(),
                            error = %err,
                            "receive error, awaiting retry"
                        );
                        Step::Wait
                    }
                    Err(err) => {
                        warn!(
                            %addr,
                            command = spec.name(),
                            error = %err,
                            "socket closed with error"
                        );
                        exchange.on_closed()
                    }
                },
                _ = sleep_until(deadline) => {
                    debug!(%addr, command = spec.name(), attempt = exchange.attempt(), "timeout");
                    exchange.on_timeout()
                },
                _ = cancelled(&mut cancel) => {
                    debug!(
                        %addr,
                        command = spec.name(),
                        attempt = exchange.attempt(),
                        "exchange cancelled"
                    );
                    exchange.cancel()
                },
            };
        }
    }

    async fn resolve(&self) -> Result<SocketAddr, ClientError> {
        let invalid = || ClientError::InvalidAddress(self.config.host.clone(), self.config.port);
        let mut addrs = lookup_host((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|_| invalid())?;
        addrs.next().ok_or_else(invalid)
    }

    fn failure_error(&self, failure: Failure) -> ClientError {
        match failure {
            Failure::Exhausted {
                attempts,
                malformed,
            } => ClientError::Timeout {
                attempts,
                malformed,
                timeout_ms: self.config.timeout_ms,
            },
            Failure::Closed => ClientError::Closed,
            Failure::Cancelled => ClientError::Cancelled,
        }
    }
}

fn unspecified_for(addr: &SocketAddr) -> SocketAddr {
    match addr {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

/// Datagram errors that only report a lost or rejected packet, such as an ICMP
/// port-unreachable surfacing as `ConnectionRefused`. The socket stays usable.
fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
    )
}

fn is_cancelled(signal: &Option<watch::Receiver<bool>>) -> bool {
    signal.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
}

/// Resolves once the signal reads true.
/// Never resolves without a signal or after its sender is gone.
async fn cancelled(signal: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = signal else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
