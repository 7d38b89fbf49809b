use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Narrow side of a panel when no width is supplied.
pub const DEFAULT_PANEL_WIDTH: f32 = 80.0;
/// Tall side of a panel when no height is supplied.
pub const DEFAULT_PANEL_HEIGHT: f32 = 120.0;

/// Axis-aligned rectangle in layout units. `min` is the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self { min, max: min + size }
    }

    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size / 2.0;
        Self { min: center - half, max: center + half }
    }

    pub fn left(&self) -> f32 { self.min.x }
    pub fn top(&self) -> f32 { self.min.y }
    pub fn right(&self) -> f32 { self.max.x }
    pub fn bottom(&self) -> f32 { self.max.y }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// One physical solar panel on the layout plane.
#[derive(Clone, Debug)]
pub struct Panel {
    pub id: String,
    pub serial_number: Option<String>,
    pub inverter_serial_number: Option<String>,
    /// Top-left corner of the effective rectangle. Never negative.
    pub position: Vec2,
    /// Footprint before rotation (width, height).
    pub nominal_size: Vec2,
    rotation_degrees: u16,
    /// The record this panel was built from, kept for tooltips and debugging.
    pub raw: serde_json::Map<String, serde_json::Value>,
}

impl Panel {
    pub fn new(id: impl Into<String>, position: Vec2, nominal_size: Vec2, rotation_degrees: i64) -> Self {
        Self {
            id: id.into(),
            serial_number: None,
            inverter_serial_number: None,
            position: position.max(Vec2::ZERO),
            nominal_size,
            rotation_degrees: rotation_degrees.rem_euclid(360) as u16,
            raw: serde_json::Map::new(),
        }
    }

    pub fn rotation_degrees(&self) -> u16 {
        self.rotation_degrees
    }

    /// True for 0, 90, 180 and 270 degrees, which are modeled by swapping
    /// dimensions rather than by a rotation transform.
    pub fn is_right_angle(&self) -> bool {
        self.rotation_degrees % 90 == 0
    }

    /// Size after rotation: swapped at 90/270, unchanged at 0/180, and a square
    /// of the larger side for anything else.
    pub fn effective_size(&self) -> Vec2 {
        match self.rotation_degrees {
            0 | 180 => self.nominal_size,
            90 | 270 => Vec2::new(self.nominal_size.y, self.nominal_size.x),
            _ => Vec2::splat(self.nominal_size.max_element()),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(self.position, self.effective_size())
    }

    /// Moves the panel, clamping both coordinates to the non-negative plane.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position.max(Vec2::ZERO);
    }

    pub fn to_export(&self) -> ExportPanel {
        ExportPanel {
            id: self.id.clone(),
            x: self.position.x,
            y: self.position.y,
            width: self.nominal_size.x,
            height: self.nominal_size.y,
            plane_rotation: self.rotation_degrees,
            inverter_serial_number: self.inverter_serial_number.clone(),
            serial_number: self.serial_number.clone(),
        }
    }
}

/// Exported panel, readable back in as a static layout.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportPanel {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub plane_rotation: u16,
    pub inverter_serial_number: Option<String>,
    pub serial_number: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct MonitorConfig {
    #[serde(default)]
    pub layout_url: Option<String>,
    #[serde(default)]
    pub readings_url: Option<String>,
    /// When set, the layout is read from this file and the layout fetch is skipped.
    #[serde(default)]
    pub static_layout_path: Option<PathBuf>,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub edit_placement: bool,
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            layout_url: None,
            readings_url: None,
            static_layout_path: None,
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_secs: default_request_timeout(),
            edit_placement: false,
        }
    }
}
