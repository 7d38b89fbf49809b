//! Live power readings keyed by device serial.

use crate::color::DEFAULT_MAX_POWER;
use crate::model::Panel;
use crate::payload::{as_number, first_number, first_text, is_present, Record};
use log::debug;
use serde_json::Value;
use std::collections::HashMap;

const DEVICE_LIST_KEYS: &[&str] = &["devices", "DeviceList", "Devices"];
const SERIAL_KEYS: &[&str] = &["SERIAL", "serial", "serialNumber", "SerialNumber"];
const KILOWATT_KEYS: &[&str] = &["p_3phsum_kw", "p_3phsum_kW"];
const WATT_KEYS: &[&str] = &[
    "power",
    "Power",
    "powerWatts",
    "PowerWatts",
    "currentPower",
    "CurrentPower",
    "instantPower",
    "InstantPower",
];

#[derive(Clone, Debug)]
pub struct Reading {
    pub serial: String,
    pub power_watts: f64,
    pub raw: Record,
}

/// Serial (upper-cased) to latest reading.
#[derive(Clone, Debug, Default)]
pub struct ReadingTable {
    readings: HashMap<String, Reading>,
}

impl ReadingTable {
    /// Builds the table from a device list payload. Only inverters are kept;
    /// an unrecognized payload gives an empty table.
    pub fn from_payload(payload: &Value) -> Self {
        let devices = device_records(payload);
        let mut table = Self::default();

        for device in devices {
            if !is_inverter(device) {
                continue;
            }
            let Some(serial) = first_text(device, SERIAL_KEYS) else {
                continue;
            };
            let reading = Reading {
                power_watts: resolve_power(device),
                serial: serial.clone(),
                raw: device.clone(),
            };
            table.readings.insert(normalize_key(&serial), reading);
        }

        debug!("[READINGS] {} devices, {} inverters", devices_len(payload), table.len());
        table
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Reading> {
        self.readings.get(&normalize_key(key))
    }

    /// Joins a panel to its reading: panel id, then serial number, then
    /// inverter serial. First match wins.
    pub fn lookup(&self, panel: &Panel) -> Option<&Reading> {
        std::iter::once(Some(panel.id.as_str()))
            .chain([panel.serial_number.as_deref(), panel.inverter_serial_number.as_deref()])
            .flatten()
            .find_map(|key| self.get(key))
    }

    /// Watts for a panel, 0 when nothing matches.
    pub fn power_for(&self, panel: &Panel) -> f64 {
        self.lookup(panel).map(|r| r.power_watts).unwrap_or(0.0)
    }

    /// Largest matched reading, or [`DEFAULT_MAX_POWER`] when no panel matched.
    pub fn max_power(&self, panels: &[Panel]) -> f64 {
        panels
            .iter()
            .filter_map(|p| self.lookup(p))
            .map(|r| r.power_watts)
            .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))))
            .unwrap_or(DEFAULT_MAX_POWER)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

fn device_list(payload: &Value) -> Option<&Vec<Value>> {
    if let Some(items) = payload.as_array() {
        return Some(items);
    }
    let obj = payload.as_object()?;
    DEVICE_LIST_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array))
}

fn device_records(payload: &Value) -> Vec<&Record> {
    device_list(payload)
        .map(|items| items.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default()
}

fn devices_len(payload: &Value) -> usize {
    device_list(payload).map(Vec::len).unwrap_or(0)
}

pub fn is_inverter(device: &Record) -> bool {
    let field = |k: &str| device.get(k).and_then(Value::as_str).unwrap_or("");
    field("DEVICE_TYPE") == "Inverter" || field("TYPE") == "SOLARBRIDGE" || field("DESCR").contains("Inverter")
}

/// Watts from a device record: three-phase kW sum first, then the first
/// non-empty plain watt field, else 0.
pub fn resolve_power(device: &Record) -> f64 {
    if let Some(kw) = first_number(device, KILOWATT_KEYS) {
        return kw * 1000.0;
    }
    WATT_KEYS
        .iter()
        .find(|k| is_present(device, k))
        .and_then(|k| device.get(*k))
        .and_then(as_number)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use serde_json::json;

    fn create_test_panel(id: &str) -> Panel {
        Panel::new(id, Vec2::ZERO, Vec2::new(80.0, 120.0), 0)
    }

    #[test]
    fn test_three_phase_kilowatts() {
        let payload = json!({"devices": [{"SERIAL": "A1", "p_3phsum_kw": "2.5", "DEVICE_TYPE": "Inverter"}]});
        let table = ReadingTable::from_payload(&payload);
        let panels = vec![create_test_panel("A1")];

        assert_eq!(table.power_for(&panels[0]), 2500.0);
        assert_eq!(table.max_power(&panels), 2500.0);
    }

    #[test]
    fn test_only_inverters_are_kept() {
        let payload = json!([
            {"SERIAL": "M1", "DEVICE_TYPE": "Power Meter", "power": 10},
            {"SERIAL": "S1", "TYPE": "SOLARBRIDGE", "power": 200},
            {"SERIAL": "D1", "DESCR": "Inverter 12", "Power": "150"},
            {"DEVICE_TYPE": "Inverter", "power": 5}
        ]);
        let table = ReadingTable::from_payload(&payload);
        assert_eq!(table.len(), 2, "meter and serial-less device are skipped");
        assert!(table.get("M1").is_none());
        assert_eq!(table.get("D1").map(|r| r.power_watts), Some(150.0));
    }

    #[test]
    fn test_device_list_shapes() {
        let dev = json!({"SERIAL": "X", "DEVICE_TYPE": "Inverter", "power": 1});
        for payload in [json!([dev.clone()]), json!({"DeviceList": [dev.clone()]}), json!({"Devices": [dev.clone()]})] {
            assert_eq!(ReadingTable::from_payload(&payload).len(), 1, "payload {}", payload);
        }
        assert!(ReadingTable::from_payload(&json!({"foo": 1})).is_empty());
        assert!(ReadingTable::from_payload(&json!("nope")).is_empty());
    }

    #[test]
    fn test_power_field_precedence() {
        let r = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(resolve_power(&r(json!({"p_3phsum_kW": 0.3, "power": 999}))), 300.0);
        assert_eq!(resolve_power(&r(json!({"power": "", "currentPower": 42}))), 42.0);
        assert_eq!(resolve_power(&r(json!({"InstantPower": "17.5"}))), 17.5);
        assert_eq!(resolve_power(&r(json!({}))), 0.0);
    }

    #[test]
    fn test_lookup_order_and_case() {
        let payload = json!([
            {"SERIAL": "sn-9", "DEVICE_TYPE": "Inverter", "power": 90},
            {"SERIAL": "INV-9", "DEVICE_TYPE": "Inverter", "power": 30}
        ]);
        let table = ReadingTable::from_payload(&payload);

        let mut panel = create_test_panel("panel-0");
        panel.serial_number = Some("SN-9".into());
        panel.inverter_serial_number = Some("inv-9".into());
        assert_eq!(table.power_for(&panel), 90.0, "serial number is tried before inverter serial");

        panel.serial_number = None;
        assert_eq!(table.power_for(&panel), 30.0);

        let unmatched = create_test_panel("nothing");
        assert_eq!(table.power_for(&unmatched), 0.0);
    }

    #[test]
    fn test_max_power_defaults_without_matches() {
        let table = ReadingTable::default();
        assert_eq!(table.max_power(&[create_test_panel("A")]), DEFAULT_MAX_POWER);
    }
}
