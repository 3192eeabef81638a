use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Decoded sensor value. Integers and floats keep the shape the wire reader produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl SensorValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SensorValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SensorValue::Integer(v) => Some(*v as f64),
            SensorValue::Float(v) => Some(*v),
            SensorValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SensorValue::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Integer(v) => write!(f, "{v}"),
            SensorValue::Float(v) => write!(f, "{v}"),
            SensorValue::Text(v) => f.write_str(v),
        }
    }
}

/// Category tag a host uses to group sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    /// Photovoltaic strings.
    Pv,
    /// AC grid side.
    Ac,
    /// Back-up / UPS output.
    Ups,
    Battery,
}

/// Model and version info reported by an inverter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub model_name: String,
    pub serial_number: String,
    pub firmware_version: String,
}

/// Sensor readings of one poll, in catalog order.
///
/// A `None` value marks a label sensor whose code has no known label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    entries: Vec<(String, Option<SensorValue>)>,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Inserts a reading. An existing id keeps its position and takes the new value.
    pub fn insert(&mut self, id: impl Into<String>, value: Option<SensorValue>) {
        let id = id.into();
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((id, value)),
        }
    }

    /// Value of `id`, or `None` when the sensor is missing or its value is absent.
    pub fn get(&self, id: &str) -> Option<&SensorValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SensorValue>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// Appends every reading of `other`, in its order.
    pub fn merge(&mut self, other: TelemetrySnapshot) {
        for (id, value) in other.entries {
            self.insert(id, value);
        }
    }
}

impl Serialize for TelemetrySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, value) in &self.entries {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}
