use async_trait::async_trait;
use tracing::debug;

use sensor_parser::{decode_sensors, et, read_text, Envelope, ParserError, SensorDescriptor};
use types::{DeviceIdentity, TelemetrySnapshot};
use udp_client::{CommandSpec, UdpClient};

use crate::{request, Family, Inverter, InverterError};

/// ET/EH/BT/BH hybrid inverters.
#[derive(Debug, Clone)]
pub struct Et {
    client: UdpClient,
    identity: Option<DeviceIdentity>,
}

impl Et {
    pub const READ_DEVICE_VERSION_INFO: CommandSpec = CommandSpec::new(
        "read_device_version_info",
        &[0xF7, 0x03, 0x88, 0xB8, 0x00, 0x21, 0x3A, 0xC1],
        &[73],
    );
    pub const READ_RUNNING_DATA: CommandSpec = CommandSpec::new(
        "read_running_data",
        &[0xF7, 0x03, 0x89, 0x1C, 0x00, 0x7D, 0x7A, 0xE7],
        &[257],
    );
    pub const READ_BATTERY_INFO: CommandSpec = CommandSpec::new(
        "read_battery_info",
        &[0xF7, 0x03, 0x90, 0x88, 0x00, 0x0B, 0xBD, 0xB1],
        &[29],
    );
    /// Framing of every ET reply.
    pub const ENVELOPE: Envelope = Envelope::new(5, 2);

    pub fn new(client: UdpClient) -> Self {
        Self {
            client,
            identity: None,
        }
    }

    /// Identity fields of a version-info reply, envelope included.
    pub fn parse_identity(raw: &[u8]) -> Result<DeviceIdentity, ParserError> {
        let data = Self::ENVELOPE.strip(raw)?;
        Ok(DeviceIdentity {
            model_name: read_text(data, "model_name", 22, 32)?.trim_end().to_string(),
            serial_number: read_text(data, "serial_number", 6, 22)?.to_string(),
            firmware_version: read_text(data, "firmware_version", 54, 66)?.to_string(),
        })
    }

    pub fn catalog() -> Vec<&'static SensorDescriptor> {
        et::SENSORS.iter().chain(et::BATTERY_SENSORS).collect()
    }
}

#[async_trait]
impl Inverter for Et {
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
        let raw = request(&self.client, &Self::READ_DEVICE_VERSION_INFO).await?;
        let identity = Self::parse_identity(&raw)?;
        debug!(
            host = self.client.host(),
            model = %identity.model_name,
            serial = %identity.serial_number,
            "identified ET inverter"
        );
        self.identity = Some(identity.clone());
        Ok(identity)
    }

    async fn fetch_telemetry(&self) -> Result<TelemetrySnapshot, InverterError> {
        let running = request(&self.client, &Self::READ_RUNNING_DATA).await?;
        let mut snapshot = decode_sensors(Self::ENVELOPE.strip(&running)?, et::SENSORS)?;

        let battery = request(&self.client, &Self::READ_BATTERY_INFO).await?;
        snapshot.merge(decode_sensors(
            Self::ENVELOPE.strip(&battery)?,
            et::BATTERY_SENSORS,
        )?);
        Ok(snapshot)
    }

    fn sensors(&self) -> Vec<&'static SensorDescriptor> {
        Self::catalog()
    }
}
