//! Device drivers for the GoodWe inverter families.
//!
//! A driver knows its family's request datagrams, how replies are framed and which
//! sensor catalog decodes them. Callers either pin a [`Family`] or let discovery try
//! the [`registry`] in order.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensor_parser::{ParserError, SensorDescriptor};
use types::{DeviceIdentity, TelemetrySnapshot};
use udp_client::{ClientError, CommandSpec, UdpClient};

mod es;
mod et;

pub use es::Es;
pub use et::Et;

#[derive(Debug, Error)]
pub enum InverterError {
    #[error("{command} failed: {source}")]
    Transport {
        command: &'static str,
        #[source]
        source: ClientError,
    },
    #[error("decode failed: {0}")]
    Decode(#[from] ParserError),
}

impl InverterError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, InverterError::Transport { source, .. } if source.is_timeout())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, InverterError::Transport { source, .. } if source.is_cancelled())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown inverter family {0:?}, expected one of ET, ES")]
pub struct UnknownFamily(pub String);

/// Protocol family; the order of [`Family::ALL`] is the discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Family {
    Et,
    Es,
}

impl Family {
    pub const ALL: [Family; 2] = [Family::Et, Family::Es];

    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Et => "ET",
            Family::Es => "ES",
        }
    }

    /// Unidentified driver of this family talking through `client`.
    pub fn driver(&self, client: UdpClient) -> Box<dyn Inverter> {
        match self {
            Family::Et => Box::new(Et::new(client)),
            Family::Es => Box::new(Es::new(client)),
        }
    }

    pub fn sensors(&self) -> Vec<&'static SensorDescriptor> {
        match self {
            Family::Et => Et::catalog(),
            Family::Es => Es::catalog(),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = UnknownFamily;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ET" => Ok(Family::Et),
            "ES" => Ok(Family::Es),
            _ => Err(UnknownFamily(s.to_string())),
        }
    }
}

/// One inverter reachable through a [`UdpClient`].
#[async_trait]
pub trait Inverter: Send + Sync + fmt::Debug {
    fn family(&self) -> Family;

    fn client(&self) -> &UdpClient;

    fn host(&self) -> &str {
        self.client().host()
    }

    fn port(&self) -> u16 {
        self.client().port()
    }

    /// Identity from the last successful [`Inverter::identify`].
    fn identity(&self) -> Option<&DeviceIdentity>;

    /// Queries model, serial number and firmware version, and remembers them.
    async fn identify(&mut self) -> Result<DeviceIdentity, InverterError>;

    /// One snapshot of every sensor in the family catalog.
    async fn fetch_telemetry(&self) -> Result<TelemetrySnapshot, InverterError>;

    /// Metadata of every sensor `fetch_telemetry` reports, in snapshot order.
    fn sensors(&self) -> Vec<&'static SensorDescriptor>;
}

/// Fresh drivers for every family, in discovery order.
pub fn registry(client: &UdpClient) -> Vec<Box<dyn Inverter>> {
    Family::ALL
        .iter()
        .map(|family| family.driver(client.clone()))
        .collect()
}

pub(crate) async fn request(
    client: &UdpClient,
    spec: &CommandSpec,
) -> Result<Vec<u8>, InverterError> {
    client
        .exchange(spec)
        .await
        .map_err(|source| InverterError::Transport {
            command: spec.name(),
            source,
        })
}
