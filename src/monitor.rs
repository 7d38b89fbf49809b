//! Monitor state: the panel set, the reading table and the color scale.
//!
//! Everything here is synchronous and free of I/O. The shell fetches payloads
//! and hands them in; a failed fetch is passed as `None` and degrades to
//! defaults.

use crate::bounds::canvas_extent;
use crate::color::{color_for_power, DEFAULT_MAX_POWER};
use crate::model::{ExportPanel, Panel};
use crate::normalize::{default_panels, normalize_layout, normalize_static_layout};
use crate::overlap::{resolve_overlaps, ResolveOutcome};
use crate::readings::ReadingTable;
use anyhow::Result;
use glam::Vec2;
use log::{info, warn};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutSource {
    Api,
    Static,
    Defaults,
}

impl std::fmt::Display for LayoutSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayoutSource::Api => write!(f, "API"),
            LayoutSource::Static => write!(f, "local layout"),
            LayoutSource::Defaults => write!(f, "defaults"),
        }
    }
}

#[derive(Debug)]
pub struct Monitor {
    pub panels: Vec<Panel>,
    pub readings: ReadingTable,
    pub max_power: f64,
    pub last_resolve: Option<ResolveOutcome>,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            panels: Vec::new(),
            readings: ReadingTable::default(),
            max_power: DEFAULT_MAX_POWER,
            last_resolve: None,
        }
    }
}

impl Monitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the panel set from an API payload. `None` means the fetch failed.
    pub fn load_layout(&mut self, payload: Option<&Value>) -> LayoutSource {
        let panels = payload.map(normalize_layout).unwrap_or_default();
        self.install(panels, LayoutSource::Api)
    }

    /// Replaces the panel set from a layout already in exported form.
    pub fn load_static_layout(&mut self, payload: &Value) -> LayoutSource {
        self.install(normalize_static_layout(payload), LayoutSource::Static)
    }

    fn install(&mut self, panels: Vec<Panel>, source: LayoutSource) -> LayoutSource {
        let (mut panels, source) = if panels.is_empty() {
            warn!("[LAYOUT] no panels from {}, using default grid", source);
            (default_panels(), LayoutSource::Defaults)
        } else {
            (panels, source)
        };

        self.last_resolve = Some(resolve_overlaps(&mut panels));
        info!("[LAYOUT] loaded {} panels from {}", panels.len(), source);
        self.panels = panels;
        self.max_power = self.readings.max_power(&self.panels);
        source
    }

    /// Replaces the reading table. `None` means the fetch failed.
    /// Returns the number of panels that matched a reading.
    pub fn load_readings(&mut self, payload: Option<&Value>) -> usize {
        self.readings = payload.map(ReadingTable::from_payload).unwrap_or_default();
        self.max_power = self.readings.max_power(&self.panels);
        let matched = self.panels.iter().filter(|p| self.readings.lookup(p).is_some()).count();
        info!(
            "[READINGS] {} inverters, {}/{} panels matched, scale {} W",
            self.readings.len(),
            matched,
            self.panels.len(),
            self.max_power
        );
        matched
    }

    pub fn panel_power(&self, panel: &Panel) -> f64 {
        self.readings.power_for(panel)
    }

    pub fn panel_color(&self, panel: &Panel) -> [u8; 3] {
        color_for_power(self.panel_power(panel), self.max_power)
    }

    pub fn total_power(&self) -> f64 {
        self.panels.iter().map(|p| self.panel_power(p)).sum()
    }

    pub fn canvas_extent(&self) -> Vec2 {
        canvas_extent(&self.panels)
    }

    pub fn export(&self) -> Vec<ExportPanel> {
        self.panels.iter().map(Panel::to_export).collect()
    }

    /// Export as pretty JSON, loadable again with [`Monitor::load_static_layout`].
    pub fn export_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(&self.export())?;
        Ok(json)
    }
}
