//! Big-endian field readers for inverter payloads.
//!
//! Signed current and power fields use a 16-bit fixup: any raw value above 32768 has
//! 65536 subtracted, for 4-byte power fields too. Devices encode negative power that
//! way, so the rule is applied as-is rather than as 32-bit two's complement.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{width} byte read at offset {offset} exceeds buffer of {len} bytes")]
pub struct OutOfBounds {
    pub offset: usize,
    pub width: usize,
    pub len: usize,
}

fn window<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], OutOfBounds> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(OutOfBounds {
            offset,
            width: N,
            len: data.len(),
        })
}

pub fn fix_sign(value: i64) -> i64 {
    if value > 32768 {
        value - 65536
    } else {
        value
    }
}

pub fn read_byte(data: &[u8], offset: usize) -> Result<u8, OutOfBounds> {
    window::<1>(data, offset).map(|[b]| b)
}

pub fn read_bytes2(data: &[u8], offset: usize) -> Result<u16, OutOfBounds> {
    window(data, offset).map(u16::from_be_bytes)
}

pub fn read_bytes4(data: &[u8], offset: usize) -> Result<u32, OutOfBounds> {
    window(data, offset).map(u32::from_be_bytes)
}

/// Volts, 0.1 V resolution.
pub fn read_voltage(data: &[u8], offset: usize) -> Result<f64, OutOfBounds> {
    Ok(f64::from(read_bytes2(data, offset)?) / 10.0)
}

/// Amperes, 0.1 A resolution, signed by [`fix_sign`].
pub fn read_current(data: &[u8], offset: usize) -> Result<f64, OutOfBounds> {
    Ok(fix_sign(i64::from(read_bytes2(data, offset)?)) as f64 / 10.0)
}

/// Watts from a 4-byte field.
pub fn read_power(data: &[u8], offset: usize) -> Result<i64, OutOfBounds> {
    Ok(fix_sign(i64::from(read_bytes4(data, offset)?)))
}

/// Watts from a 2-byte field.
pub fn read_power2(data: &[u8], offset: usize) -> Result<i64, OutOfBounds> {
    Ok(fix_sign(i64::from(read_bytes2(data, offset)?)))
}

/// Energy totals (kWh) from a 4-byte field.
pub fn read_power_k(data: &[u8], offset: usize) -> Result<f64, OutOfBounds> {
    Ok(read_power(data, offset)? as f64 / 10.0)
}

/// Energy totals (kWh) from a 2-byte field.
pub fn read_power_k2(data: &[u8], offset: usize) -> Result<f64, OutOfBounds> {
    Ok(read_power2(data, offset)? as f64 / 10.0)
}

/// Hertz, 0.01 Hz resolution.
pub fn read_freq(data: &[u8], offset: usize) -> Result<f64, OutOfBounds> {
    Ok(f64::from(read_bytes2(data, offset)?) / 100.0)
}

/// Degrees Celsius, 0.1 resolution. Sub-zero values are not representable on the wire.
pub fn read_temp(data: &[u8], offset: usize) -> Result<f64, OutOfBounds> {
    Ok(f64::from(read_bytes2(data, offset)?) / 10.0)
}

pub const GRID_IDLE: u8 = 0;
pub const GRID_EXPORTING: u8 = 1;
pub const GRID_IMPORTING: u8 = 2;

/// Grid direction from active power with a ±90 W deadband.
pub fn classify_grid_mode(power: i64) -> u8 {
    if power < -90 {
        GRID_IMPORTING
    } else if power >= 90 {
        GRID_EXPORTING
    } else {
        GRID_IDLE
    }
}

pub fn read_grid_mode(data: &[u8], offset: usize) -> Result<u8, OutOfBounds> {
    read_power(data, offset).map(classify_grid_mode)
}

/// Product of a voltage and a current field, rounded half to even.
pub fn read_vi_power(data: &[u8], voltage: usize, current: usize) -> Result<i64, OutOfBounds> {
    Ok((read_voltage(data, voltage)? * read_current(data, current)?).round_ties_even() as i64)
}
