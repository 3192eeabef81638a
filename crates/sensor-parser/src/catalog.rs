use std::fmt;

use serde::Serialize;
use tracing::debug;
use types::{SensorKind, SensorValue, TelemetrySnapshot};

use crate::decode::{self, OutOfBounds};
use crate::labels::Labels;
use crate::ParserError;

/// Computes a sensor from other fields of the same payload.
pub type DeriveFn = fn(&[u8]) -> Result<Option<SensorValue>, OutOfBounds>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

/// How a descriptor turns payload bytes into a value.
#[derive(Clone, Copy)]
pub enum Decoder {
    Voltage,
    Current,
    Power,
    Power2,
    PowerK,
    PowerK2,
    Frequency,
    Temperature,
    Byte,
    Bytes2,
    Bytes4,
    GridMode,
    /// Code of the given width looked up in a table; unknown codes decode to `None`.
    Label(Width, &'static Labels),
    /// Ignores the descriptor offset.
    Derived(DeriveFn),
}

impl Decoder {
    pub fn decode(&self, data: &[u8], offset: usize) -> Result<Option<SensorValue>, OutOfBounds> {
        let value = match self {
            Decoder::Voltage => SensorValue::Float(decode::read_voltage(data, offset)?),
            Decoder::Current => SensorValue::Float(decode::read_current(data, offset)?),
            Decoder::Power => SensorValue::Integer(decode::read_power(data, offset)?),
            Decoder::Power2 => SensorValue::Integer(decode::read_power2(data, offset)?),
            Decoder::PowerK => SensorValue::Float(decode::read_power_k(data, offset)?),
            Decoder::PowerK2 => SensorValue::Float(decode::read_power_k2(data, offset)?),
            Decoder::Frequency => SensorValue::Float(decode::read_freq(data, offset)?),
            Decoder::Temperature => SensorValue::Float(decode::read_temp(data, offset)?),
            Decoder::Byte => SensorValue::Integer(i64::from(decode::read_byte(data, offset)?)),
            Decoder::Bytes2 => SensorValue::Integer(i64::from(decode::read_bytes2(data, offset)?)),
            Decoder::Bytes4 => SensorValue::Integer(i64::from(decode::read_bytes4(data, offset)?)),
            Decoder::GridMode => {
                SensorValue::Integer(i64::from(decode::read_grid_mode(data, offset)?))
            }
            Decoder::Label(width, labels) => {
                let code = match width {
                    Width::Byte => u16::from(decode::read_byte(data, offset)?),
                    Width::Word => decode::read_bytes2(data, offset)?,
                };
                return Ok(label(labels, code));
            }
            Decoder::Derived(derive) => return derive(data),
        };
        Ok(Some(value))
    }

    pub fn is_derived(&self) -> bool {
        matches!(self, Decoder::Derived(_))
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoder::Voltage => f.write_str("Voltage"),
            Decoder::Current => f.write_str("Current"),
            Decoder::Power => f.write_str("Power"),
            Decoder::Power2 => f.write_str("Power2"),
            Decoder::PowerK => f.write_str("PowerK"),
            Decoder::PowerK2 => f.write_str("PowerK2"),
            Decoder::Frequency => f.write_str("Frequency"),
            Decoder::Temperature => f.write_str("Temperature"),
            Decoder::Byte => f.write_str("Byte"),
            Decoder::Bytes2 => f.write_str("Bytes2"),
            Decoder::Bytes4 => f.write_str("Bytes4"),
            Decoder::GridMode => f.write_str("GridMode"),
            Decoder::Label(width, labels) => f
                .debug_tuple("Label")
                .field(width)
                .field(&labels.name())
                .finish(),
            Decoder::Derived(_) => f.write_str("Derived"),
        }
    }
}

/// Label of `code` as an owned sensor value.
pub fn label(labels: &Labels, code: u16) -> Option<SensorValue> {
    labels.get(code).map(|text| SensorValue::Text(text.to_string()))
}

/// One named reading inside a family's payload.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SensorDescriptor {
    pub id: &'static str,
    /// Offset into the payload after the envelope is stripped; 0 for derived sensors.
    pub offset: usize,
    #[serde(skip)]
    pub decoder: Decoder,
    pub unit: &'static str,
    pub name: &'static str,
    pub kind: Option<SensorKind>,
}

impl SensorDescriptor {
    pub const fn new(
        id: &'static str,
        offset: usize,
        decoder: Decoder,
        unit: &'static str,
        name: &'static str,
        kind: Option<SensorKind>,
    ) -> Self {
        Self {
            id,
            offset,
            decoder,
            unit,
            name,
            kind,
        }
    }

    pub fn is_derived(&self) -> bool {
        self.decoder.is_derived()
    }

    pub fn read(&self, data: &[u8]) -> Result<Option<SensorValue>, ParserError> {
        self.decoder
            .decode(data, self.offset)
            .map_err(|source| ParserError::Sensor {
                id: self.id,
                offset: self.offset,
                source,
            })
    }
}

/// Decodes every descriptor against `data`. The first short read fails the whole snapshot.
pub fn decode_sensors(
    data: &[u8],
    sensors: &[SensorDescriptor],
) -> Result<TelemetrySnapshot, ParserError> {
    let mut snapshot = TelemetrySnapshot::with_capacity(sensors.len());
    for sensor in sensors {
        let value = sensor.read(data)?;
        if value.is_none() {
            debug!(sensor = sensor.id, offset = sensor.offset, "no label for code");
        }
        snapshot.insert(sensor.id, value);
    }
    Ok(snapshot)
}

/// Protocol framing around the sensor payload: leading header bytes and trailing checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub header: usize,
    pub trailer: usize,
}

impl Envelope {
    pub const fn new(header: usize, trailer: usize) -> Self {
        Self { header, trailer }
    }

    pub fn strip<'a>(&self, raw: &'a [u8]) -> Result<&'a [u8], ParserError> {
        let end = raw.len().checked_sub(self.trailer);
        match end {
            Some(end) if end >= self.header => Ok(&raw[self.header..end]),
            _ => Err(ParserError::Envelope {
                len: raw.len(),
                header: self.header,
                trailer: self.trailer,
            }),
        }
    }
}

/// Fixed-width text field; fails when out of range or not UTF-8.
pub fn read_text<'a>(
    data: &'a [u8],
    field: &'static str,
    start: usize,
    end: usize,
) -> Result<&'a str, ParserError> {
    let bytes = data.get(start..end).ok_or(ParserError::Field {
        field,
        start,
        end,
        len: data.len(),
    })?;
    std::str::from_utf8(bytes).map_err(|source| ParserError::Text { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_strips_header_and_trailer() {
        let envelope = Envelope::new(2, 1);
        assert_eq!(envelope.strip(&[1, 2, 3, 4, 5]).expect("strip"), &[3, 4]);
        assert_eq!(envelope.strip(&[1, 2, 3]).expect("strip"), &[] as &[u8]);
        assert!(envelope.strip(&[1, 2]).is_err());
    }

    #[test]
    fn text_field_rejects_invalid_utf8() {
        let err = read_text(&[b'o', b'k', 0xFF], "model_name", 0, 3).expect_err("utf8");
        assert!(matches!(err, ParserError::Text { field: "model_name", .. }));
        assert_eq!(read_text(b"GW10K", "model_name", 0, 2).expect("text"), "GW");
    }
}
