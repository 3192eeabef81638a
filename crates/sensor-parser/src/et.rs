//! ET family (ET/EH/BT/BH) catalogs.
//!
//! Offsets are relative to the running-data and battery-info payloads with the
//! 5 byte header and 2 byte checksum removed.

use types::SensorKind::{Ac, Battery, Pv, Ups};
use types::SensorValue;

use crate::catalog::Decoder::{
    Bytes2, Bytes4, Current, Derived, Frequency, GridMode, Label, Power, PowerK, Temperature,
    Voltage,
};
use crate::catalog::{label, SensorDescriptor, Width};
use crate::decode::{read_grid_mode, read_power, read_vi_power, OutOfBounds};
use crate::labels::{BATTERY_MODES, GRID_MODES, SAFETY_COUNTRIES, WORK_MODES_ET};

type Derive = Result<Option<SensorValue>, OutOfBounds>;

fn pv_power(data: &[u8]) -> Derive {
    Ok(Some(SensorValue::Integer(
        read_power(data, 10)? + read_power(data, 18)?,
    )))
}

fn grid_mode_label(data: &[u8]) -> Derive {
    Ok(label(&GRID_MODES, u16::from(read_grid_mode(data, 78)?)))
}

fn load_total(data: &[u8]) -> Derive {
    Ok(Some(SensorValue::Integer(
        read_power(data, 126)? + read_power(data, 130)? + read_power(data, 134)?,
    )))
}

fn battery_power(data: &[u8]) -> Derive {
    Ok(Some(SensorValue::Integer(read_vi_power(data, 160, 162)?)))
}

// ppv1 + ppv2 + pbattery - active_power
fn house_consumption(data: &[u8]) -> Derive {
    Ok(Some(SensorValue::Integer(
        read_power(data, 10)? + read_power(data, 18)? + read_vi_power(data, 160, 162)?
            - read_power(data, 78)?,
    )))
}

pub static SENSORS: &[SensorDescriptor] = &[
    SensorDescriptor::new("vpv1", 6, Voltage, "V", "PV1 Voltage", Some(Pv)),
    SensorDescriptor::new("ipv1", 8, Current, "A", "PV1 Current", Some(Pv)),
    SensorDescriptor::new("ppv1", 10, Power, "W", "PV1 Power", Some(Pv)),
    SensorDescriptor::new("vpv2", 14, Voltage, "V", "PV2 Voltage", Some(Pv)),
    SensorDescriptor::new("ipv2", 16, Current, "A", "PV2 Current", Some(Pv)),
    SensorDescriptor::new("ppv2", 18, Power, "W", "PV2 Power", Some(Pv)),
    // PV3/PV4 strings sit at 22..38 but are not reported yet.
    SensorDescriptor::new("ppv", 0, Derived(pv_power), "W", "PV Power", Some(Pv)),
    SensorDescriptor::new("xx38", 38, Bytes2, "", "Unknown sensor@38", None),
    SensorDescriptor::new("xx40", 40, Bytes2, "", "Unknown sensor@40", None),
    SensorDescriptor::new("vgrid", 42, Voltage, "V", "On-grid 1 Voltage", Some(Ac)),
    SensorDescriptor::new("igrid", 44, Current, "A", "On-grid Current", Some(Ac)),
    SensorDescriptor::new("fgrid", 46, Frequency, "Hz", "On-grid Frequency", Some(Ac)),
    SensorDescriptor::new("pgrid", 48, Power, "W", "On-grid Power", Some(Ac)),
    SensorDescriptor::new("vgrid2", 52, Voltage, "V", "On-grid2 Voltage", Some(Ac)),
    SensorDescriptor::new("igrid2", 54, Current, "A", "On-grid2 Current", Some(Ac)),
    SensorDescriptor::new("fgrid2", 56, Frequency, "Hz", "On-grid2 Frequency", Some(Ac)),
    SensorDescriptor::new("pgrid2", 58, Power, "W", "On-grid2 Power", Some(Ac)),
    SensorDescriptor::new("vgrid3", 62, Voltage, "V", "On-grid3 Voltage", Some(Ac)),
    SensorDescriptor::new("igrid3", 64, Current, "A", "On-grid3 Current", Some(Ac)),
    SensorDescriptor::new("fgrid3", 66, Frequency, "Hz", "On-grid3 Frequency", Some(Ac)),
    SensorDescriptor::new("pgrid3", 68, Power, "W", "On-grid3 Power", Some(Ac)),
    SensorDescriptor::new("xx72", 72, Bytes2, "", "Unknown sensor@72", None),
    SensorDescriptor::new("total_inverter_power", 74, Power, "W", "Total Power", Some(Ac)),
    SensorDescriptor::new("active_power", 78, Power, "W", "Active Power", Some(Ac)),
    SensorDescriptor::new("grid_in_out", 78, GridMode, "", "On-grid Mode", Some(Ac)),
    SensorDescriptor::new(
        "grid_in_out_label",
        0,
        Derived(grid_mode_label),
        "",
        "On-grid Mode",
        Some(Ac),
    ),
    SensorDescriptor::new("xx82", 82, Bytes2, "", "Unknown sensor@82", None),
    SensorDescriptor::new("xx84", 84, Bytes2, "", "Unknown sensor@84", None),
    SensorDescriptor::new("xx86", 86, Bytes2, "", "Unknown sensor@86", None),
    SensorDescriptor::new("backup_v1", 90, Voltage, "V", "Back-up1 Voltage", Some(Ups)),
    SensorDescriptor::new("backup_i1", 92, Current, "A", "Back-up1 Current", Some(Ups)),
    SensorDescriptor::new("backup_f1", 94, Frequency, "Hz", "Back-up1 Frequency", Some(Ups)),
    SensorDescriptor::new("xx96", 96, Bytes2, "", "Unknown sensor@96", None),
    SensorDescriptor::new("backup_p1", 98, Power, "W", "Back-up1 Power", Some(Ups)),
    SensorDescriptor::new("backup_v2", 102, Voltage, "V", "Back-up2 Voltage", Some(Ups)),
    SensorDescriptor::new("backup_i2", 104, Current, "A", "Back-up2 Current", Some(Ups)),
    SensorDescriptor::new("backup_f2", 106, Frequency, "Hz", "Back-up2 Frequency", Some(Ups)),
    SensorDescriptor::new("xx108", 108, Bytes2, "", "Unknown sensor@108", None),
    SensorDescriptor::new("backup_p2", 110, Power, "W", "Back-up2 Power", Some(Ups)),
    SensorDescriptor::new("backup_v3", 114, Voltage, "V", "Back-up3 Voltage", Some(Ups)),
    SensorDescriptor::new("backup_i3", 116, Current, "A", "Back-up3 Current", Some(Ups)),
    SensorDescriptor::new("backup_f3", 118, Frequency, "Hz", "Back-up3 Frequency", Some(Ups)),
    SensorDescriptor::new("xx120", 120, Bytes2, "", "Unknown sensor@120", None),
    SensorDescriptor::new("backup_p3", 122, Power, "W", "Back-up3 Power", Some(Ups)),
    SensorDescriptor::new("load_p1", 126, Power, "W", "Load 1", Some(Ac)),
    SensorDescriptor::new("load_p2", 130, Power, "W", "Load 2", Some(Ac)),
    SensorDescriptor::new("load_p3", 134, Power, "W", "Load 3", Some(Ac)),
    SensorDescriptor::new("load_ptotal", 0, Derived(load_total), "W", "Load Total", Some(Ac)),
    SensorDescriptor::new("backup_ptotal", 138, Power, "W", "Back-up Power", Some(Ups)),
    SensorDescriptor::new("pload", 142, Power, "W", "Load", Some(Ac)),
    SensorDescriptor::new("xx146", 146, Bytes2, "", "Unknown sensor@146", None),
    SensorDescriptor::new(
        "temperature2",
        148,
        Temperature,
        "C",
        "Inverter Temperature 2",
        Some(Ac),
    ),
    SensorDescriptor::new("xx150", 150, Bytes2, "", "Unknown sensor@150", None),
    SensorDescriptor::new(
        "temperature",
        152,
        Temperature,
        "C",
        "Inverter Temperature",
        Some(Ac),
    ),
    SensorDescriptor::new("xx154", 154, Bytes2, "", "Unknown sensor@154", None),
    SensorDescriptor::new("xx156", 156, Bytes2, "", "Unknown sensor@156", None),
    SensorDescriptor::new("xx158", 158, Bytes2, "", "Unknown sensor@158", None),
    SensorDescriptor::new("vbattery1", 160, Voltage, "V", "Battery Voltage", Some(Battery)),
    SensorDescriptor::new("ibattery1", 162, Current, "A", "Battery Current", Some(Battery)),
    SensorDescriptor::new(
        "pbattery1",
        0,
        Derived(battery_power),
        "W",
        "Battery Power",
        Some(Battery),
    ),
    SensorDescriptor::new("battery_mode", 168, Bytes2, "", "Battery Mode", Some(Battery)),
    SensorDescriptor::new(
        "battery_mode_label",
        168,
        Label(Width::Word, &BATTERY_MODES),
        "",
        "Battery Mode",
        Some(Battery),
    ),
    SensorDescriptor::new("xx170", 170, Bytes2, "", "Unknown sensor@170", None),
    SensorDescriptor::new("safety_country", 172, Bytes2, "", "Safety Country", None),
    SensorDescriptor::new(
        "safety_country_label",
        172,
        Label(Width::Word, &SAFETY_COUNTRIES),
        "",
        "Safety Country",
        None,
    ),
    SensorDescriptor::new("work_mode", 174, Bytes2, "", "Work Mode", None),
    SensorDescriptor::new(
        "work_mode_label",
        174,
        Label(Width::Word, &WORK_MODES_ET),
        "",
        "Work Mode",
        None,
    ),
    SensorDescriptor::new("xx176", 176, Bytes2, "", "Unknown sensor@176", None),
    SensorDescriptor::new("strwork_mode", 178, Bytes4, "", "Error Codes", None),
    // No code table exists for this one, the raw word is reported under the label id.
    SensorDescriptor::new("strwork_mode_label", 178, Bytes4, "", "Error Codes", None),
    SensorDescriptor::new("e_total", 182, PowerK, "kWh", "Total PV Generation", None),
    SensorDescriptor::new("e_day", 186, PowerK, "kWh", "Today's PV Generation", None),
    SensorDescriptor::new("xx190", 190, Bytes2, "", "Unknown sensor@190", None),
    SensorDescriptor::new("xx192", 192, Bytes2, "", "Unknown sensor@192", None),
    SensorDescriptor::new("xx194", 194, Bytes2, "", "Unknown sensor@194", None),
    SensorDescriptor::new("xx196", 196, Bytes2, "", "Unknown sensor@196", None),
    SensorDescriptor::new("xx198", 198, Bytes2, "", "Unknown sensor@198", None),
    SensorDescriptor::new("diagnose_result", 240, Bytes4, "", "Diag Status", None),
    SensorDescriptor::new(
        "house_consumption",
        0,
        Derived(house_consumption),
        "W",
        "House Comsumption",
        None,
    ),
];

pub static BATTERY_SENSORS: &[SensorDescriptor] = &[
    SensorDescriptor::new("battery_bms", 0, Bytes2, "", "Battery BMS", Some(Battery)),
    SensorDescriptor::new("battery_index", 2, Bytes2, "", "Battery Index", Some(Battery)),
    SensorDescriptor::new(
        "battery_temperature",
        6,
        Temperature,
        "C",
        "Battery Temperature",
        Some(Battery),
    ),
    SensorDescriptor::new(
        "battery_charge_limit",
        8,
        Bytes2,
        "A",
        "Battery Charge Limit",
        Some(Battery),
    ),
    SensorDescriptor::new(
        "battery_discharge_limit",
        10,
        Bytes2,
        "A",
        "Battery Discharge Limit",
        Some(Battery),
    ),
    SensorDescriptor::new("battery_status", 12, Bytes2, "", "Battery Status", Some(Battery)),
    SensorDescriptor::new(
        "battery_soc",
        14,
        Bytes2,
        "%",
        "Battery State of Charge",
        Some(Battery),
    ),
    SensorDescriptor::new(
        "battery_soh",
        16,
        Bytes2,
        "%",
        "Battery State of Health",
        Some(Battery),
    ),
    SensorDescriptor::new("battery_warning", 20, Bytes2, "", "Battery Warning", Some(Battery)),
];
