use std::io::Write;

use anyhow::{Context, Result};
use serde::Serialize;

use inverter::Family;
use poller_actor::PollSample;
use sensor_parser::SensorDescriptor;

/// Writes `sample` as one JSON line.
pub fn write_sample<W: Write>(writer: &mut W, sample: &PollSample) -> Result<()> {
    serde_json::to_writer(&mut *writer, sample).context("serialize sample")?;
    writer.write_all(b"\n").context("write sample")?;
    writer.flush().context("flush sample")
}

#[derive(Debug, Serialize)]
struct Catalog<'a> {
    family: Family,
    sensors: &'a [&'static SensorDescriptor],
}

/// Writes the sensor metadata of `family` as a pretty-printed JSON document.
pub fn write_catalog<W: Write>(
    writer: &mut W,
    family: Family,
    sensors: &[&'static SensorDescriptor],
) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &Catalog { family, sensors })
        .context("serialize catalog")?;
    writer.write_all(b"\n").context("write catalog")
}
