//! Declarative decoding of GoodWe inverter payloads.
//!
//! Each device family publishes an ordered table of [`SensorDescriptor`]s. A payload is
//! decoded by running every descriptor's [`Decoder`] over the bytes left once the
//! protocol [`Envelope`] is stripped.

use thiserror::Error;

pub mod catalog;
pub mod decode;
pub mod es;
pub mod et;
pub mod labels;

pub use catalog::{
    decode_sensors, read_text, DeriveFn, Decoder, Envelope, SensorDescriptor, Width,
};
pub use decode::OutOfBounds;
pub use labels::Labels;

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("sensor {id} (offset {offset}): {source}")]
    Sensor {
        id: &'static str,
        offset: usize,
        #[source]
        source: OutOfBounds,
    },
    #[error(
        "reply of {len} bytes is shorter than its envelope \
         ({header} header + {trailer} trailer)"
    )]
    Envelope {
        len: usize,
        header: usize,
        trailer: usize,
    },
    #[error("field {field} ({start}..{end}) is outside a {len} byte reply")]
    Field {
        field: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
    #[error("field {field} is not valid text: {source}")]
    Text {
        field: &'static str,
        #[source]
        source: std::str::Utf8Error,
    },
}
