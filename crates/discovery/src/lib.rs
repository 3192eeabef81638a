//! Finds which protocol family an inverter speaks by asking each driver to identify it.

use std::fmt;

use thiserror::Error;
use tracing::{debug, info};

use inverter::{registry, Family, Inverter, InverterError};
use types::DeviceIdentity;
use udp_client::{ClientConfig, UdpClient};

/// A driver that could not identify the inverter.
#[derive(Debug)]
pub struct ProbeFailure {
    pub family: Family,
    pub error: InverterError,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.family, self.error)
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no supported inverter answered at {host}:{port} ({})", summarize(.failures))]
    Exhausted {
        host: String,
        port: u16,
        failures: Vec<ProbeFailure>,
    },
}

fn summarize(failures: &[ProbeFailure]) -> String {
    if failures.is_empty() {
        return "no drivers tried".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The identified driver plus the drivers that failed before it.
#[derive(Debug)]
pub struct Discovered {
    pub inverter: Box<dyn Inverter>,
    pub identity: DeviceIdentity,
    pub failures: Vec<ProbeFailure>,
}

/// Probes `host:port` with every family using default transport settings.
pub async fn discover(host: impl Into<String>, port: u16) -> Result<Discovered, DiscoveryError> {
    let client = UdpClient::new(ClientConfig {
        host: host.into(),
        port,
        ..ClientConfig::default()
    });
    discover_with(&client).await
}

/// Probes with every family, sharing `client`'s endpoint, timeouts and cancellation.
pub async fn discover_with(client: &UdpClient) -> Result<Discovered, DiscoveryError> {
    probe(client.host(), client.port(), registry(client)).await
}

/// Tries `candidates` in order; the first successful identification wins.
pub async fn probe(
    host: &str,
    port: u16,
    candidates: Vec<Box<dyn Inverter>>,
) -> Result<Discovered, DiscoveryError> {
    let mut failures = Vec::new();

    for mut candidate in candidates {
        let family = candidate.family();
        debug!(%family, host, port, "probing inverter");
        match candidate.identify().await {
            Ok(identity) => {
                info!(
                    %family,
                    host,
                    port,
                    model = %identity.model_name,
                    serial = %identity.serial_number,
                    "detected inverter"
                );
                return Ok(Discovered {
                    inverter: candidate,
                    identity,
                    failures,
                });
            }
            Err(error) => {
                debug!(%family, host, port, %error, "probe failed");
                failures.push(ProbeFailure { family, error });
            }
        }
    }

    Err(DiscoveryError::Exhausted {
        host: host.to_string(),
        port,
        failures,
    })
}
