//! ES family (ES/EM/BP) catalog, offsets after the 7 byte header and 2 byte checksum.

use types::SensorKind::{Ac, Battery, Pv, Ups};
use types::SensorValue;

use crate::catalog::Decoder::{
    Byte, Bytes2, Bytes4, Current, Derived, Frequency, Label, Power2, PowerK, PowerK2,
    Temperature, Voltage,
};
use crate::catalog::{label, SensorDescriptor, Width};
use crate::decode::{read_byte, read_power2, read_vi_power, OutOfBounds, GRID_IMPORTING};
use crate::labels::{BATTERY_MODES, ENERGY_MODES, GRID_MODES, LOAD_MODES, PV_MODES, WORK_MODES};

type Derive = Result<Option<SensorValue>, OutOfBounds>;

fn integer(value: i64) -> Derive {
    Ok(Some(SensorValue::Integer(value)))
}

fn pv1_power(data: &[u8]) -> Derive {
    integer(read_vi_power(data, 0, 2)?)
}

fn pv2_power(data: &[u8]) -> Derive {
    integer(read_vi_power(data, 5, 7)?)
}

fn pv_power(data: &[u8]) -> Derive {
    integer(read_vi_power(data, 0, 2)? + read_vi_power(data, 5, 7)?)
}

fn battery_power(data: &[u8]) -> Derive {
    integer(read_vi_power(data, 10, 18)?)
}

fn grid_mode_label(data: &[u8]) -> Derive {
    Ok(label(&GRID_MODES, u16::from(read_byte(data, 80)?)))
}

/// Meter power signed by the grid direction byte.
fn signed_grid_power(data: &[u8]) -> Result<i64, OutOfBounds> {
    let sign = if read_byte(data, 80)? == GRID_IMPORTING {
        -1
    } else {
        1
    };
    Ok(sign * read_power2(data, 38)?)
}

fn active_power(data: &[u8]) -> Derive {
    integer(signed_grid_power(data)?)
}

fn plant_power(data: &[u8]) -> Derive {
    integer(read_power2(data, 47)? + read_power2(data, 81)?)
}

// ppv1 + ppv2 + pbattery - active_power
fn house_consumption(data: &[u8]) -> Derive {
    integer(
        read_vi_power(data, 0, 2)? + read_vi_power(data, 5, 7)? + read_vi_power(data, 10, 18)?
            - signed_grid_power(data)?,
    )
}

pub static SENSORS: &[SensorDescriptor] = &[
    SensorDescriptor::new("vpv1", 0, Voltage, "V", "PV1 Voltage", Some(Pv)),
    SensorDescriptor::new("ipv1", 2, Current, "A", "PV1 Current", Some(Pv)),
    SensorDescriptor::new("ppv1", 0, Derived(pv1_power), "W", "PV1 Power", Some(Pv)),
    SensorDescriptor::new("pv1_mode", 4, Byte, "", "PV1 Mode", Some(Pv)),
    SensorDescriptor::new(
        "pv1_mode_label",
        4,
        Label(Width::Byte, &PV_MODES),
        "",
        "PV1 Mode",
        Some(Pv),
    ),
    SensorDescriptor::new("vpv2", 5, Voltage, "V", "PV2 Voltage", Some(Pv)),
    SensorDescriptor::new("ipv2", 7, Current, "A", "PV2 Current", Some(Pv)),
    SensorDescriptor::new("ppv2", 0, Derived(pv2_power), "W", "PV2 Power", Some(Pv)),
    SensorDescriptor::new("pv2_mode", 9, Byte, "", "PV2 Mode", Some(Pv)),
    SensorDescriptor::new(
        "pv2_mode_label",
        9,
        Label(Width::Byte, &PV_MODES),
        "",
        "PV2 Mode",
        Some(Pv),
    ),
    SensorDescriptor::new("ppv", 0, Derived(pv_power), "W", "PV Power", Some(Pv)),
    SensorDescriptor::new("vbattery1", 10, Voltage, "V", "Battery Voltage", Some(Battery)),
    // 12 and 14 carry voltages of further battery packs.
    SensorDescriptor::new(
        "battery_temperature",
        16,
        Temperature,
        "C",
        "Battery Temperature",
        Some(Battery),
    ),
    SensorDescriptor::new("ibattery1", 18, Current, "A", "Battery Current", Some(Battery)),
    SensorDescriptor::new(
        "pbattery1",
        0,
        Derived(battery_power),
        "W",
        "Battery Power",
        Some(Battery),
    ),
    SensorDescriptor::new(
        "battery_charge_limit",
        20,
        Bytes2,
        "A",
        "Battery Charge Limit",
        Some(Battery),
    ),
    SensorDescriptor::new(
        "battery_discharge_limit",
        22,
        Bytes2,
        "A",
        "Battery Discharge Limit",
        Some(Battery),
    ),
    SensorDescriptor::new("battery_status", 24, Bytes2, "", "Battery Status", Some(Battery)),
    SensorDescriptor::new(
        "battery_soc",
        26,
        Byte,
        "%",
        "Battery State of Charge",
        Some(Battery),
    ),
    SensorDescriptor::new(
        "battery_soh",
        29,
        Byte,
        "%",
        "Battery State of Health",
        Some(Battery),
    ),
    SensorDescriptor::new("battery_mode", 30, Byte, "", "Battery Mode", Some(Battery)),
    SensorDescriptor::new(
        "battery_mode_label",
        30,
        Label(Width::Byte, &BATTERY_MODES),
        "",
        "Battery Mode",
        Some(Battery),
    ),
    SensorDescriptor::new("battery_warning", 31, Bytes2, "", "Battery Warning", Some(Battery)),
    SensorDescriptor::new("meter_status", 33, Byte, "", "Meter status", Some(Ac)),
    SensorDescriptor::new("vgrid", 34, Voltage, "V", "On-grid Voltage", Some(Ac)),
    SensorDescriptor::new("igrid", 36, Current, "A", "On-grid Current", Some(Ac)),
    SensorDescriptor::new("pgrid", 38, Power2, "W", "On-grid Power (EzMeter)", Some(Ac)),
    SensorDescriptor::new("fgrid", 40, Frequency, "Hz", "On-grid Frequency", Some(Ac)),
    SensorDescriptor::new("grid_mode", 42, Byte, "", "Work Mode", None),
    SensorDescriptor::new(
        "grid_mode_label",
        42,
        Label(Width::Byte, &WORK_MODES),
        "",
        "Work Mode",
        None,
    ),
    SensorDescriptor::new("vload", 43, Voltage, "V", "Back-up Voltage", Some(Ups)),
    SensorDescriptor::new("iload", 45, Current, "A", "Back-up Current", Some(Ups)),
    SensorDescriptor::new("pload", 47, Power2, "W", "On-grid Power", Some(Ups)),
    SensorDescriptor::new("fload", 49, Frequency, "Hz", "Back-up Frequency", Some(Ups)),
    SensorDescriptor::new("load_mode", 51, Byte, "", "Load Mode", None),
    SensorDescriptor::new(
        "load_mode_label",
        51,
        Label(Width::Byte, &LOAD_MODES),
        "",
        "Load Mode",
        None,
    ),
    SensorDescriptor::new("work_mode", 52, Byte, "", "Energy Mode", None),
    SensorDescriptor::new(
        "work_mode_label",
        52,
        Label(Width::Byte, &ENERGY_MODES),
        "",
        "Energy Mode",
        None,
    ),
    SensorDescriptor::new("temperature", 53, Temperature, "C", "Inverter Temperature", None),
    SensorDescriptor::new("error_codes", 55, Bytes4, "", "Error Codes", None),
    SensorDescriptor::new("e_total", 59, PowerK, "kWh", "Total PV Generation", None),
    SensorDescriptor::new("h_total", 63, Bytes4, "", "Hours Total", None),
    SensorDescriptor::new("e_day", 67, PowerK2, "kWh", "Today's PV Generation", None),
    SensorDescriptor::new("e_load_day", 69, PowerK2, "kWh", "Today's Load Consumption", None),
    SensorDescriptor::new("e_load_total", 71, PowerK, "kW", "Total Load", None),
    SensorDescriptor::new("total_power", 75, Power2, "W", "Total Power", None),
    // 77 effective work mode, 78..80 effective relay control
    SensorDescriptor::new("grid_in_out", 80, Byte, "", "On-grid Mode", Some(Ac)),
    SensorDescriptor::new(
        "grid_in_out_label",
        0,
        Derived(grid_mode_label),
        "",
        "On-grid Mode",
        Some(Ac),
    ),
    SensorDescriptor::new("active_power", 0, Derived(active_power), "W", "Active Power", Some(Ac)),
    SensorDescriptor::new("pback_up", 81, Power2, "W", "Back-up Power", Some(Ups)),
    SensorDescriptor::new("plant_power", 0, Derived(plant_power), "W", "Plant Power", None),
    SensorDescriptor::new("diagnose_result", 89, Bytes4, "", "Diag Status", None),
    SensorDescriptor::new(
        "house_consumption",
        0,
        Derived(house_consumption),
        "W",
        "House Comsumption",
        None,
    ),
];
