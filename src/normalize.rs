//! Panel normalization.
//!
//! Turns layout payloads of several observed shapes into canonical [`Panel`]s.
//! Nothing here fails: an unrecognized payload simply yields no panels and the
//! caller falls back to [`default_panels`].

use crate::model::{Panel, DEFAULT_PANEL_HEIGHT, DEFAULT_PANEL_WIDTH};
use crate::payload::{first_number, first_text, Record};
use glam::Vec2;
use log::debug;
use serde_json::Value;

/// Padding kept between the top of the canvas and the highest panel.
pub const TOP_PADDING: f32 = 50.0;
/// Horizontal pitch of the fallback grid used for records without coordinates.
const GRID_PITCH_X: f32 = 120.0;
/// Vertical pitch of the fallback grid.
const GRID_PITCH_Y: f32 = 160.0;
const GRID_COLUMNS: usize = 10;
const GRID_ORIGIN: f32 = 50.0;

const DEFAULT_PANEL_COUNT: usize = 12;
const DEFAULT_COLUMNS: usize = 4;
const DEFAULT_SPACING: f32 = 20.0;

const X_KEYS: &[&str] = &["xCoordinate", "x"];
const Y_KEYS: &[&str] = &["yCoordinate", "y"];
const ROTATION_KEYS: &[&str] = &["planeRotation"];
const WIDTH_KEYS: &[&str] = &["width"];
const HEIGHT_KEYS: &[&str] = &["height"];
const ID_KEYS: &[&str] = &["inverterSerialNumber", "id", "ID", "serialNumber", "SerialNumber"];
const SERIAL_KEYS: &[&str] = &["serialNumber", "SerialNumber"];
const INVERTER_SERIAL_KEYS: &[&str] = &["inverterSerialNumber"];

/// The layout payload shapes seen in the wild.
#[derive(Debug)]
pub enum LayoutShape<'a> {
    /// `[ {...}, ... ]`
    Array(&'a [Value]),
    /// `{ "panels": [...] }` or `{ "Panels": [...] }`
    Panels(&'a [Value]),
    /// `{ "result": { "panels": [...] } }`
    ResultPanels(&'a [Value]),
    Unrecognized,
}

impl<'a> LayoutShape<'a> {
    pub fn classify(payload: &'a Value) -> Self {
        if let Some(items) = payload.as_array() {
            return LayoutShape::Array(items);
        }
        let Some(obj) = payload.as_object() else {
            return LayoutShape::Unrecognized;
        };
        for key in ["panels", "Panels"] {
            if let Some(items) = obj.get(key).and_then(Value::as_array) {
                return LayoutShape::Panels(items);
            }
        }
        if let Some(items) = obj
            .get("result")
            .and_then(|r| r.get("panels"))
            .and_then(Value::as_array)
        {
            return LayoutShape::ResultPanels(items);
        }
        LayoutShape::Unrecognized
    }

    /// Object records in payload order. Non-object entries are dropped.
    pub fn records(&self) -> Vec<&'a Record> {
        match self {
            LayoutShape::Array(items) | LayoutShape::Panels(items) | LayoutShape::ResultPanels(items) => {
                items.iter().filter_map(Value::as_object).collect()
            }
            LayoutShape::Unrecognized => Vec::new(),
        }
    }
}

/// Normalizes a layout fetched from the monitoring API.
///
/// Y coordinates are shifted so the topmost panel sits [`TOP_PADDING`] below
/// the origin even when the API reports negative values.
pub fn normalize_layout(payload: &Value) -> Vec<Panel> {
    let shape = LayoutShape::classify(payload);
    let records = shape.records();
    let offset = y_offset(&records);
    debug!("[LAYOUT] {} raw records, shape {}, y offset {}", records.len(), shape_name(&shape), offset);
    normalize_records(&records, offset)
}

/// Normalizes a layout that is already in canonical (exported) form.
/// Positions are taken as-is, so an export reloads to the same panels.
pub fn normalize_static_layout(payload: &Value) -> Vec<Panel> {
    let records = LayoutShape::classify(payload).records();
    normalize_records(&records, 0.0)
}

/// `|minY| + padding` when any record sits above the origin, else the padding.
pub fn y_offset(records: &[&Record]) -> f32 {
    let min_y = records
        .iter()
        .map(|r| first_coordinate(r, Y_KEYS).unwrap_or(0.0))
        .fold(f32::INFINITY, f32::min);
    if min_y < 0.0 {
        min_y.abs() + TOP_PADDING
    } else {
        TOP_PADDING
    }
}

/// A numeric field narrowed to layout units. Values outside the `f32` range
/// count as absent.
fn first_coordinate(record: &Record, keys: &[&str]) -> Option<f32> {
    first_number(record, keys)
        .map(|v| v as f32)
        .filter(|v| v.is_finite())
}

fn normalize_records(records: &[&Record], y_offset: f32) -> Vec<Panel> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| normalize_record(r, i, y_offset))
        .collect()
}

fn normalize_record(record: &Record, index: usize, y_offset: f32) -> Panel {
    let x = first_coordinate(record, X_KEYS)
        .unwrap_or_else(|| (index % GRID_COLUMNS) as f32 * GRID_PITCH_X + GRID_ORIGIN);
    let y = first_coordinate(record, Y_KEYS)
        .unwrap_or_else(|| (index / GRID_COLUMNS) as f32 * GRID_PITCH_Y + GRID_ORIGIN);

    let rotation = first_number(record, ROTATION_KEYS)
        .map(|r| r.round() as i64)
        .unwrap_or(0);

    let width = first_coordinate(record, WIDTH_KEYS)
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_PANEL_WIDTH);
    let height = first_coordinate(record, HEIGHT_KEYS)
        .filter(|v| *v > 0.0)
        .unwrap_or(DEFAULT_PANEL_HEIGHT);

    let id = first_text(record, ID_KEYS).unwrap_or_else(|| format!("panel-{}", index));

    let mut panel = Panel::new(id, Vec2::new(x, y + y_offset), Vec2::new(width, height), rotation);
    panel.serial_number = first_text(record, SERIAL_KEYS);
    panel.inverter_serial_number = first_text(record, INVERTER_SERIAL_KEYS);
    panel.raw = record.clone();
    panel
}

/// Twelve panels in a four-column grid, alternating upright and quarter-turned.
/// Cells are sized by the larger panel side so no rotation can make them touch.
pub fn default_panels() -> Vec<Panel> {
    let nominal = Vec2::new(DEFAULT_PANEL_WIDTH, DEFAULT_PANEL_HEIGHT);
    let pitch = nominal.max_element() + DEFAULT_SPACING;

    (0..DEFAULT_PANEL_COUNT)
        .map(|i| {
            let col = (i % DEFAULT_COLUMNS) as f32;
            let row = (i / DEFAULT_COLUMNS) as f32;
            let rotation = if i % 2 == 0 { 0 } else { 90 };
            Panel::new(
                format!("panel-{}", i),
                Vec2::new(GRID_ORIGIN + col * pitch, GRID_ORIGIN + row * pitch),
                nominal,
                rotation,
            )
        })
        .collect()
}

fn shape_name(shape: &LayoutShape) -> &'static str {
    match shape {
        LayoutShape::Array(_) => "array",
        LayoutShape::Panels(_) => "panels",
        LayoutShape::ResultPanels(_) => "result.panels",
        LayoutShape::Unrecognized => "unrecognized",
    }
}
