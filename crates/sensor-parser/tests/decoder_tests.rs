use sensor_parser::decode::{
    classify_grid_mode, fix_sign, read_byte, read_bytes2, read_bytes4, read_current, read_freq,
    read_grid_mode, read_power, read_power2, read_power_k, read_power_k2, read_temp,
    read_voltage,
};
use sensor_parser::labels::{
    BATTERY_MODES, ENERGY_MODES, GRID_MODES, PV_MODES, SAFETY_COUNTRIES, WORK_MODES_ET,
};
use sensor_parser::OutOfBounds;

#[test]
fn voltage_frequency_and_temperature_scale() {
    let data = [0x09, 0x0B, 0x13, 0x88, 0x01, 0x9A];
    assert_eq!(read_voltage(&data, 0), Ok(231.5));
    assert_eq!(read_freq(&data, 2), Ok(50.0));
    assert_eq!(read_temp(&data, 4), Ok(41.0));
}

#[test]
fn temperature_has_no_negative_range() {
    assert_eq!(read_temp(&[0xFF, 0xFF], 0), Ok(6553.5));
}

#[test]
fn current_sign_fixup_starts_above_32768() {
    assert_eq!(read_current(&[0x80, 0x00], 0), Ok(3276.8));
    assert_eq!(read_current(&[0x80, 0x01], 0), Ok(-3276.7));
    assert_eq!(read_current(&[0xFF, 0xFF], 0), Ok(-0.1));
    assert_eq!(read_current(&[0x00, 0x0C], 0), Ok(1.2));
}

#[test]
fn four_byte_power_uses_sixteen_bit_fixup() {
    assert_eq!(read_power(&[0x00, 0x00, 0x04, 0xD2], 0), Ok(1234));
    assert_eq!(read_power(&[0x00, 0x00, 0x80, 0x00], 0), Ok(32768));
    assert_eq!(read_power(&[0x00, 0x00, 0xFF, 0xFF], 0), Ok(-1));
    assert_eq!(read_power(&[0x00, 0x01, 0x00, 0x00], 0), Ok(0));
    assert_eq!(
        read_power(&[0xFF, 0xFF, 0xFF, 0xFF], 0),
        Ok(4_294_967_295 - 65_536)
    );
}

#[test]
fn two_byte_power_and_energy() {
    assert_eq!(read_power2(&[0xFF, 0x38], 0), Ok(-200));
    assert_eq!(read_power_k2(&[0x00, 0x7B], 0), Ok(12.3));
    assert_eq!(read_power_k(&[0x00, 0x00, 0x30, 0x39], 0), Ok(1234.5));
}

#[test]
fn raw_reads_are_unsigned_big_endian() {
    let data = [0xFE, 0x12, 0x34, 0x56, 0x78];
    assert_eq!(read_byte(&data, 0), Ok(0xFE));
    assert_eq!(read_bytes2(&data, 1), Ok(0x1234));
    assert_eq!(read_bytes4(&data, 1), Ok(0x1234_5678));
}

#[test]
fn fix_sign_boundary() {
    assert_eq!(fix_sign(32768), 32768);
    assert_eq!(fix_sign(32769), -32767);
    assert_eq!(fix_sign(65535), -1);
}

#[test]
fn grid_mode_deadband() {
    assert_eq!(classify_grid_mode(-91), 2);
    assert_eq!(classify_grid_mode(-90), 0);
    assert_eq!(classify_grid_mode(0), 0);
    assert_eq!(classify_grid_mode(89), 0);
    assert_eq!(classify_grid_mode(90), 1);
}

#[test]
fn grid_mode_reads_power_field() {
    // -91 W and +90 W as the inverter encodes them
    assert_eq!(read_grid_mode(&[0x00, 0x00, 0xFF, 0xA5], 0), Ok(2));
    assert_eq!(read_grid_mode(&[0x00, 0x00, 0x00, 0x5A], 0), Ok(1));
    assert_eq!(read_grid_mode(&[0x00, 0x00, 0xFF, 0xA6], 0), Ok(0));
}

#[test]
fn short_buffer_reports_window() {
    assert_eq!(
        read_power(&[0u8; 5], 2),
        Err(OutOfBounds {
            offset: 2,
            width: 4,
            len: 5
        })
    );
    assert!(read_byte(&[], 0).is_err());
}

#[test]
fn label_tables_resolve_known_codes_only() {
    assert_eq!(WORK_MODES_ET.get(1), Some("Normal(On-Grid)"));
    assert_eq!(BATTERY_MODES.get(3), Some("Charge"));
    assert_eq!(PV_MODES.get(2), Some("Working,PV has a power output"));
    assert_eq!(ENERGY_MODES.get(128), Some("Battery Discharging"));
    assert_eq!(ENERGY_MODES.get(3), None);
    assert_eq!(GRID_MODES.get(2), Some("Inverter gets power from grid"));
    assert_eq!(SAFETY_COUNTRIES.get(2), Some("Germany"));
    assert_eq!(SAFETY_COUNTRIES.get(12), None);
    assert_eq!(SAFETY_COUNTRIES.get(107), Some("cUSA_240VacHECO_14HM"));
    assert_eq!(SAFETY_COUNTRIES.len(), 90);
}
