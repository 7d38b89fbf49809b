mod bounds;
mod color;
mod config;
mod drag;
mod fetch;
mod model;
mod monitor;
mod normalize;
mod overlap;
mod payload;
mod readings;

use bounds::{hit_test, outline, tooltip_position};
use drag::DragSession;
use eframe::egui;
use fetch::{Endpoints, FetchCommand, FetchEvent};
use glam::Vec2;
use log::{debug, error, info, warn};
use model::{MonitorConfig, Panel};
use monitor::Monitor;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

/// Pan and zoom of the canvas. Layout units map to screen points as
/// `canvas.min + offset + world * scale`.
struct ViewState {
    offset: egui::Vec2,
    scale: f32,
    needs_fit: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            offset: egui::vec2(0.0, 0.0),
            scale: 1.0,
            needs_fit: true,
        }
    }
}

impl ViewState {
    fn to_screen(&self, canvas: egui::Rect, world: Vec2) -> egui::Pos2 {
        canvas.min + self.offset + egui::vec2(world.x, world.y) * self.scale
    }

    fn from_screen(&self, canvas: egui::Rect, pos: egui::Pos2) -> Vec2 {
        let local = (pos - canvas.min - self.offset) / self.scale;
        Vec2::new(local.x, local.y)
    }

    /// Scales the whole layout into the canvas and centers it.
    fn fit(&mut self, canvas: egui::Rect, extent: Vec2) {
        let scale_x = canvas.width() / extent.x;
        let scale_y = canvas.height() / extent.y;
        self.scale = (scale_x.min(scale_y) * 0.95).clamp(0.05, 8.0);
        let used = egui::vec2(extent.x, extent.y) * self.scale;
        self.offset = (canvas.size() - used) / 2.0;
        self.needs_fit = false;
    }
}

/// Periodic readings refresh. At most one readings request is outstanding, so
/// a slow server cannot make requests pile up behind the fetch worker.
struct RefreshSchedule {
    interval: Duration,
    last_request: Instant,
    in_flight: bool,
}

impl RefreshSchedule {
    fn new(interval: Duration, now: Instant) -> Self {
        Self { interval, last_request: now, in_flight: false }
    }

    fn is_due(&self, now: Instant) -> bool {
        !self.in_flight && now.saturating_duration_since(self.last_request) >= self.interval
    }

    fn until_due(&self, now: Instant) -> Duration {
        self.interval.saturating_sub(now.saturating_duration_since(self.last_request))
    }

    fn started(&mut self, now: Instant) {
        self.last_request = now;
        self.in_flight = true;
    }

    fn finished(&mut self) {
        self.in_flight = false;
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = config::load_config();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1200.0, 800.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "Solar Panel Map",
        options,
        Box::new(move |_cc| Box::new(PanelMapApp::new(config))),
    )
}

struct PanelMapApp {
    monitor: Monitor,
    drag: DragSession,
    view: ViewState,
    status: String,
    edit_placement: bool,
    refresh: RefreshSchedule,
    fetch_sender: Sender<FetchCommand>,
    fetch_receiver: Receiver<FetchEvent>,
}

impl PanelMapApp {
    fn new(config: MonitorConfig) -> Self {
        let (tx_event, rx_event) = std::sync::mpsc::channel();
        let endpoints = Endpoints {
            layout_url: config.layout_url.clone(),
            readings_url: config.readings_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        };
        let tx_cmd = fetch::start_fetch_service(endpoints, tx_event);

        let mut app = Self {
            monitor: Monitor::new(),
            drag: DragSession::new(),
            view: ViewState::default(),
            status: "Loading layout...".to_owned(),
            edit_placement: config.edit_placement,
            refresh: RefreshSchedule::new(Duration::from_secs(config.refresh_interval_secs), Instant::now()),
            fetch_sender: tx_cmd,
            fetch_receiver: rx_event,
        };

        let static_loaded = match &config.static_layout_path {
            Some(path) => match app.load_static_file(path) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Static layout unavailable, falling back to API: {:#}", e);
                    false
                }
            },
            None => false,
        };
        if !static_loaded {
            app.request(FetchCommand::FetchLayout);
        }
        app.request(FetchCommand::FetchReadings);
        app
    }

    fn request(&mut self, cmd: FetchCommand) {
        let readings = matches!(cmd, FetchCommand::FetchReadings);
        if readings {
            if self.refresh.in_flight {
                debug!("Readings request still pending, skipping");
                return;
            }
            self.refresh.started(Instant::now());
        }
        if self.fetch_sender.send(cmd).is_err() {
            error!("Fetch service is gone");
            self.status = "Fetch service stopped".into();
            if readings {
                self.refresh.finished();
            }
        }
    }

    fn load_static_file(&mut self, path: &Path) -> anyhow::Result<()> {
        use anyhow::Context;
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read layout at {:?}", path))?;
        let payload: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Invalid layout JSON at {:?}", path))?;

        self.drag.cancel();
        let source = self.monitor.load_static_layout(&payload);
        self.view.needs_fit = true;
        self.status = format!("Loaded {} panels from {} ({})", self.monitor.panels.len(), path.display(), source);
        Ok(())
    }

    fn handle_fetch_events(&mut self) {
        while let Ok(event) = self.fetch_receiver.try_recv() {
            match event {
                FetchEvent::Layout(result) => {
                    let payload = match result {
                        Ok(v) => Some(v),
                        Err(e) => {
                            warn!("Layout fetch failed: {:#}", e);
                            None
                        }
                    };
                    self.drag.cancel();
                    let source = self.monitor.load_layout(payload.as_ref());
                    self.view.needs_fit = true;
                    self.status = format!("Loaded {} panels from {}", self.monitor.panels.len(), source);
                }
                FetchEvent::Readings(result) => {
                    self.refresh.finished();
                    let payload = match result {
                        Ok(v) => Some(v),
                        Err(e) => {
                            warn!("Readings fetch failed: {:#}", e);
                            self.status = format!("Power data unavailable: {}", e);
                            None
                        }
                    };
                    let ok = payload.is_some();
                    let matched = self.monitor.load_readings(payload.as_ref());
                    if ok && self.monitor.readings.is_empty() {
                        self.status = "No inverters in readings payload".into();
                    } else if ok {
                        self.status = format!(
                            "{} of {} panels reporting, {:.0} W total",
                            matched,
                            self.monitor.panels.len(),
                            self.monitor.total_power()
                        );
                    }
                }
            }
        }
    }

    fn export_to_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .set_file_name("panel_layout.json")
            .add_filter("JSON", &["json"])
            .save_file()
        {
            match self.monitor.export_json() {
                Ok(json) => match fs::write(&path, json) {
                    Ok(_) => {
                        self.status = format!("Exported to {}", path.display());
                        info!("Exported layout to {}", path.display());
                    }
                    Err(e) => {
                        self.status = format!("Export failed: {}", e);
                        error!("Failed to write export file: {}", e);
                    }
                },
                Err(e) => {
                    self.status = format!("Export error: {}", e);
                    error!("Failed to serialize layout: {}", e);
                }
            }
        }
    }

    fn copy_export(&mut self, ctx: &egui::Context) {
        match self.monitor.export_json() {
            Ok(json) => {
                ctx.output_mut(|o| o.copied_text = json);
                self.status = "Layout copied to clipboard".into();
            }
            Err(e) => {
                self.status = format!("Export error: {}", e);
            }
        }
    }

    fn import_from_json(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.import_file(&path);
        }
    }

    fn import_file(&mut self, path: &Path) {
        if let Err(e) = self.load_static_file(path) {
            self.status = format!("Import failed: {:#}", e);
            error!("Import error: {:#}", e);
        }
    }

    fn toolbar(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.edit_placement, "Edit placement");
            if ui.button("Refresh").clicked() {
                self.request(FetchCommand::FetchReadings);
            }
            if ui.button("Reload layout").clicked() {
                self.request(FetchCommand::FetchLayout);
                self.request(FetchCommand::FetchReadings);
            }
            if ui.button("Import...").clicked() {
                self.import_from_json();
            }
            if ui.button("Export...").clicked() {
                self.export_to_file();
            }
            if ui.button("Copy JSON").clicked() {
                self.copy_export(ctx);
            }
            if ui.button("Fit").clicked() {
                self.view.needs_fit = true;
            }
            ui.separator();
            ui.label(format!("Scale: {:.0} W", self.monitor.max_power));
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;

        if self.view.needs_fit && !self.monitor.panels.is_empty() {
            self.view.fit(rect, self.monitor.canvas_extent());
        }

        // INPUT
        let input = ui.ctx().input(|i| i.clone());
        if response.hovered() {
            let mut zoom_factor = input.zoom_delta();
            let scroll_y = input.scroll_delta.y;
            if scroll_y != 0.0 {
                zoom_factor *= (scroll_y * 0.002).exp();
            }
            if zoom_factor != 1.0 {
                if let Some(mouse_pos) = response.hover_pos() {
                    let world = self.view.from_screen(rect, mouse_pos);
                    self.view.scale = (self.view.scale * zoom_factor).clamp(0.05, 8.0);
                    self.view.offset = mouse_pos - rect.min - egui::vec2(world.x, world.y) * self.view.scale;
                }
            }
        }

        if response.drag_started() {
            let press = input.pointer.press_origin().or(response.interact_pointer_pos());
            if let Some(pos) = press {
                let world = self.view.from_screen(rect, pos);
                self.drag.pointer_down(&self.monitor.panels, world, self.edit_placement);
            }
        }

        if response.dragged() {
            if self.drag.is_dragging() {
                if let Some(pos) = response.interact_pointer_pos() {
                    let world = self.view.from_screen(rect, pos);
                    if self.drag.pointer_move(&mut self.monitor.panels, world) {
                        ui.ctx().request_repaint();
                    }
                }
            } else {
                // Pan View - offset is in points
                self.view.offset += response.drag_delta();
            }
        }

        if response.drag_released() {
            self.drag.pointer_up();
        } else if self.drag.is_dragging() {
            let inside = input.pointer.hover_pos().map(|p| rect.contains(p)).unwrap_or(false);
            if !inside {
                self.drag.pointer_left();
            }
        }

        // RENDERING
        // Background
        painter.rect_filled(rect, 0.0, egui::Color32::from_rgb(15, 15, 18));

        // Layout plane
        let extent = self.monitor.canvas_extent();
        let plane = egui::Rect::from_min_max(
            self.view.to_screen(rect, Vec2::ZERO),
            self.view.to_screen(rect, extent),
        );
        painter.rect_stroke(plane, 0.0, egui::Stroke::new(1.0, egui::Color32::from_gray(60)));

        let hovered = if self.drag.is_dragging() {
            None
        } else {
            response
                .hover_pos()
                .and_then(|p| hit_test(&self.monitor.panels, self.view.from_screen(rect, p)))
        };
        let active = self.drag.dragged_index().or(hovered);

        for (i, panel) in self.monitor.panels.iter().enumerate() {
            self.draw_panel(&painter, rect, panel, active == Some(i));
        }

        if let (Some(i), Some(pointer)) = (hovered, response.hover_pos()) {
            if let Some(panel) = self.monitor.panels.get(i) {
                self.draw_tooltip(&painter, rect, panel, pointer);
            }
            if self.edit_placement {
                ui.output_mut(|o| o.cursor_icon = egui::CursorIcon::Grab);
            }
        }
        if self.drag.is_dragging() {
            ui.output_mut(|o| o.cursor_icon = egui::CursorIcon::Grabbing);
        }
    }

    fn draw_panel(&self, painter: &egui::Painter, canvas: egui::Rect, panel: &Panel, highlighted: bool) {
        let [r, g, b] = self.monitor.panel_color(panel);
        let fill = egui::Color32::from_rgb(r, g, b);
        let stroke = if highlighted {
            egui::Stroke::new(2.0, egui::Color32::from_rgb(255, 200, 0))
        } else {
            egui::Stroke::new(1.0, egui::Color32::from_gray(110))
        };

        let points: Vec<egui::Pos2> = outline(panel)
            .iter()
            .map(|corner| self.view.to_screen(canvas, *corner))
            .collect();
        painter.add(egui::Shape::convex_polygon(points, fill, stroke));

        let center = self.view.to_screen(canvas, panel.rect().center());
        let [lr, lg, lb] = color::label_color([r, g, b]);
        let label_color = egui::Color32::from_rgb(lr, lg, lb);
        let font = egui::FontId::proportional((11.0 * self.view.scale).clamp(8.0, 16.0));
        painter.text(
            center - egui::vec2(0.0, 7.0),
            egui::Align2::CENTER_CENTER,
            short_id(&panel.id),
            font.clone(),
            label_color,
        );
        painter.text(
            center + egui::vec2(0.0, 7.0),
            egui::Align2::CENTER_CENTER,
            format!("{:.0} W", self.monitor.panel_power(panel)),
            font,
            label_color,
        );
    }

    fn draw_tooltip(&self, painter: &egui::Painter, canvas: egui::Rect, panel: &Panel, pointer: egui::Pos2) {
        let mut lines = vec![
            format!("ID: {}", panel.id),
            format!("Power: {:.1} W", self.monitor.panel_power(panel)),
            format!("Rotation: {}°", panel.rotation_degrees()),
            format!("Position: ({:.0}, {:.0})", panel.position.x, panel.position.y),
        ];
        if let Some(sn) = &panel.serial_number {
            lines.push(format!("Serial: {}", sn));
        }
        if let Some(inv) = &panel.inverter_serial_number {
            lines.push(format!("Inverter: {}", inv));
        }
        push_scalar_fields(&mut lines, &panel.raw, TOOLTIP_SKIP_KEYS);
        match self.monitor.readings.lookup(panel) {
            Some(reading) => {
                lines.push(format!("Reading: {}", reading.serial));
                push_scalar_fields(&mut lines, &reading.raw, READING_SKIP_KEYS);
            }
            None => lines.push("Reading: none".to_owned()),
        }

        let galley = painter.layout_no_wrap(
            lines.join("\n"),
            egui::FontId::proportional(12.0),
            egui::Color32::from_gray(230),
        );
        let padding = egui::vec2(6.0, 4.0);
        let size = galley.size() + padding * 2.0;

        let local = pointer - canvas.min;
        let placed = tooltip_position(
            Vec2::new(local.x, local.y),
            Vec2::new(size.x, size.y),
            Vec2::new(canvas.width(), canvas.height()),
        );
        let min = canvas.min + egui::vec2(placed.x, placed.y);
        let frame = egui::Rect::from_min_size(min, size);

        painter.rect_filled(frame, 3.0, egui::Color32::from_rgba_unmultiplied(20, 20, 24, 235));
        painter.rect_stroke(frame, 3.0, egui::Stroke::new(1.0, egui::Color32::from_gray(90)));
        painter.galley(min + padding, galley);
    }
}

/// Source fields already shown through the canonical panel fields.
const TOOLTIP_SKIP_KEYS: &[&str] = &[
    "xCoordinate",
    "yCoordinate",
    "x",
    "y",
    "planeRotation",
    "width",
    "height",
    "inverterSerialNumber",
    "id",
    "ID",
    "serialNumber",
    "SerialNumber",
];

/// Device fields already covered by the reading line and the power figure.
const READING_SKIP_KEYS: &[&str] = &["SERIAL", "serial", "serialNumber", "SerialNumber", "p_3phsum_kw", "p_3phsum_kW"];

/// Extra fields of a source record for the tooltip, scalars only.
fn push_scalar_fields(lines: &mut Vec<String>, record: &payload::Record, skip: &[&str]) {
    let fields = record.iter().filter(|(k, _)| !skip.contains(&k.as_str()));
    for (key, value) in fields.take(4) {
        match value {
            serde_json::Value::String(s) => lines.push(format!("{}: {}", key, s)),
            serde_json::Value::Number(n) => lines.push(format!("{}: {}", key, n)),
            serde_json::Value::Bool(b) => lines.push(format!("{}: {}", key, b)),
            _ => {}
        }
    }
}

/// First dropped file that looks like a JSON layout.
fn dropped_layout_path(files: &[egui::DroppedFile]) -> Option<PathBuf> {
    files
        .iter()
        .filter_map(|f| f.path.as_ref())
        .find(|p| p.extension().map_or(false, |e| e.eq_ignore_ascii_case("json")))
        .cloned()
}

fn short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 8 {
        id.to_string()
    } else {
        chars[chars.len() - 6..].iter().collect::<String>()
    }
}

impl eframe::App for PanelMapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_fetch_events();

        if let Some(path) = ctx.input(|i| dropped_layout_path(&i.raw.dropped_files)) {
            self.import_file(&path);
        }

        if self.refresh.is_due(Instant::now()) {
            self.request(FetchCommand::FetchReadings);
        }
        // Poll for the reply while a request is out.
        let wait = if self.refresh.in_flight {
            Duration::from_millis(250)
        } else {
            self.refresh.until_due(Instant::now())
        };
        ctx.request_repaint_after(wait);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ctx, ui);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status.as_str());
                ui.separator();
                ui.label(format!("{} panels", self.monitor.panels.len()));
                if let Some(outcome) = self.monitor.last_resolve {
                    if !outcome.converged {
                        ui.separator();
                        ui.colored_label(egui::Color32::from_rgb(230, 160, 0), "Layout may overlap");
                    }
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ui);
        });
    }
}
