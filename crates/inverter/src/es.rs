use async_trait::async_trait;
use tracing::debug;

use sensor_parser::{decode_sensors, es, read_text, Envelope, ParserError, SensorDescriptor};
use types::{DeviceIdentity, TelemetrySnapshot};
use udp_client::{CommandSpec, UdpClient};

use crate::{request, Family, Inverter, InverterError};

/// ES/EM/BP inverters speaking the AA55 protocol.
#[derive(Debug, Clone)]
pub struct Es {
    client: UdpClient,
    identity: Option<DeviceIdentity>,
}

impl Es {
    pub const READ_DEVICE_VERSION_INFO: CommandSpec = CommandSpec::new(
        "read_device_version_info",
        &[0xAA, 0x55, 0xC0, 0x7F, 0x01, 0x02, 0x00, 0x02, 0x41],
        &[85, 86],
    );
    pub const READ_RUNNING_DATA: CommandSpec = CommandSpec::new(
        "read_running_data",
        &[0xAA, 0x55, 0xC0, 0x7F, 0x01, 0x06, 0x00, 0x02, 0x45],
        &[142, 149],
    );
    /// Framing of running-data replies. Version-info offsets count from the raw reply.
    pub const ENVELOPE: Envelope = Envelope::new(7, 2);

    pub fn new(client: UdpClient) -> Self {
        Self {
            client,
            identity: None,
        }
    }

    pub fn parse_identity(raw: &[u8]) -> Result<DeviceIdentity, ParserError> {
        Ok(DeviceIdentity {
            model_name: read_text(raw, "model_name", 12, 22)?.trim_end().to_string(),
            serial_number: read_text(raw, "serial_number", 38, 54)?.to_string(),
            firmware_version: read_text(raw, "firmware_version", 58, 70)?.to_string(),
        })
    }

    pub fn catalog() -> Vec<&'static SensorDescriptor> {
        es::SENSORS.iter().collect()
    }
}

#[async_trait]
impl Inverter for Es {
    fn family(&self) -> Family {
        Family::Es
    }

    fn client(&self) -> &UdpClient {
        &self.client
    }

    fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    async fn identify(&mut self) -> Result<DeviceIdentity, InverterError> {
        let raw = request(&self.client, &Self::READ_DEVICE_VERSION_INFO).await?;
        let identity = Self::parse_identity(&raw)?;
        debug!(
            host = self.client.host(),
            model = %identity.model_name,
            serial = %identity.serial_number,
            "identified ES inverter"
        );
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    async fn fetch_telemetry(&self) -> Result<TelemetrySnapshot, InverterError> {
        let running = request(&self.client, &Self::READ_RUNNING_DATA).await?;
        Ok(decode_sensors(Self::ENVELOPE.strip(&running)?, es::SENSORS)?)
    }

    fn sensors(&self) -> Vec<&'static SensorDescriptor> {
        Self::catalog()
    }
}
