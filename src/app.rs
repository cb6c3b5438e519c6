// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Desktop window hosting the flight map.
//!
//! Paints the engine's [`Scene`] with the egui painter, turns pointer input
//! into [`MapEvent`]s, and forwards snapshots from the background feed.

use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use eframe::egui;
use flight_map::color::parse_hex;
use flight_map::renderer::{EventKind, MarkerIcon, MarkerSpec};
use flight_map::{
    CardConfig, ColorAssigner, FeedConfig, FeedEvent, InfoPanel, Layer, LatLng, MapEvent,
    MapWidget, NavigationCommand, PrimitiveId, Scene, SnapshotFeed,
};
use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, ConfyStore};
use crate::viewport::Viewport;

/// Pointer distance, in pixels, that still counts as touching a marker
const MARKER_HIT_RADIUS: f64 = 12.0;
/// Minimum pointer distance for thin trail strokes
const LINE_HIT_SLOP: f64 = 4.0;
/// Scroll pixels per zoom level
const SCROLL_PER_ZOOM: f32 = 120.0;

const BACKGROUND: egui::Color32 = egui::Color32::from_rgb(24, 28, 34);
const FALLBACK_COLOR: (u8, u8, u8) = (51, 136, 255);

pub struct WhatsThatPlaneApp {
    widget: MapWidget<Scene, ConfyStore>,
    viewport: Viewport,

    feed_rx: mpsc::Receiver<FeedEvent>,
    feed_cancel: CancellationToken,
    feed_path: PathBuf,
    feed_error: Option<String>,
    last_received: Option<DateTime<Utc>>,
    last_counts: Option<(usize, usize)>,

    hovered: Option<PrimitiveId>,
    user_zooming: bool,
}

impl std::fmt::Debug for WhatsThatPlaneApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsThatPlaneApp")
            .field("viewport", &self.viewport)
            .field("feed_path", &self.feed_path)
            .field("hovered", &self.hovered)
            .finish_non_exhaustive()
    }
}

impl WhatsThatPlaneApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &AppConfig, store: ConfyStore) -> Self {
        let colors = config
            .color_seed
            .map_or_else(ColorAssigner::new, ColorAssigner::with_seed);
        let mut widget = MapWidget::new(CardConfig::for_entity(config.entity.clone()), store, colors);
        if let Err(e) = widget.attach(Ok::<_, String>(Scene::new())) {
            error!("Map failed to start: {e}");
        }

        let feed_cancel = CancellationToken::new();
        let feed_config = FeedConfig {
            path: config.snapshot_path.clone(),
            poll_interval: Duration::from_secs(config.poll_secs.max(1)),
            ..FeedConfig::default()
        };
        let feed_rx = spawn_feed(feed_config, cc.egui_ctx.clone(), feed_cancel.clone());

        info!(
            "Showing {} from {}",
            config.entity,
            config.snapshot_path.display()
        );
        Self {
            widget,
            viewport: Viewport::new(LatLng::new(0.0, 0.0), config.default_zoom),
            feed_rx,
            feed_cancel,
            feed_path: config.snapshot_path.clone(),
            feed_error: None,
            last_received: None,
            last_counts: None,
            hovered: None,
            user_zooming: false,
        }
    }

    fn drain_feed(&mut self) {
        while let Ok(event) = self.feed_rx.try_recv() {
            match event {
                FeedEvent::Snapshot { state, received_at } => {
                    self.feed_error = None;
                    self.last_received = Some(received_at);
                    self.widget.push_state(state);
                }
                FeedEvent::Error(message) => self.feed_error = Some(message),
            }
        }
    }

    fn run_redraw(&mut self) {
        match self.widget.on_frame() {
            Some(Ok(outcome)) => self.last_counts = Some((outcome.drawn, outcome.skipped)),
            Some(Err(e)) => debug!("Redraw skipped: {e}"),
            None => {}
        }
    }

    /// Apply queued view commands and step the running animation.
    fn drive_view(&mut self, ctx: &egui::Context) {
        if let Some(scene) = self.widget.renderer_mut() {
            for command in scene.take_view_commands() {
                self.viewport.apply(&command);
            }
        }

        let dt = Duration::from_secs_f32(ctx.input(|i| i.stable_dt).clamp(0.0, 0.1));
        if self.viewport.advance(dt) {
            self.widget.handle_event(MapEvent::ViewSettled);
        }
        if self.viewport.is_animating() {
            ctx.request_repaint();
        }
    }

    fn draw_map(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(
            egui::vec2(ui.available_width(), ui.available_height()),
            egui::Sense::click_and_drag(),
        );
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, BACKGROUND);

        if self
            .viewport
            .set_size(f64::from(rect.width()), f64::from(rect.height()))
        {
            self.widget.handle_event(MapEvent::Resized);
        }

        self.handle_pan_and_zoom(ui, &response);
        self.handle_pointer(&response);

        let Some(scene) = self.widget.renderer() else {
            return;
        };
        paint_scene(&painter, rect, scene, &self.viewport);

        if let Some(popup) = self
            .hovered
            .and_then(|id| marker_popup(scene, id))
        {
            let (x, y) = self.viewport.to_screen(popup.0);
            draw_label(&painter, rect.min + vec(x, y) + egui::vec2(12.0, -12.0), &popup.1);
        }

        painter.text(
            rect.left_bottom() + egui::vec2(10.0, -10.0),
            egui::Align2::LEFT_BOTTOM,
            "Drag to pan | Scroll to zoom | Click a plane for details",
            egui::FontId::proportional(11.0),
            egui::Color32::from_gray(160),
        );

        if let Some(message) = self.error_message() {
            draw_error_bubble(&painter, rect, &message);
        }
    }

    fn handle_pan_and_zoom(&mut self, ui: &egui::Ui, response: &egui::Response) {
        if response.dragged() {
            let delta = response.drag_delta();
            self.viewport
                .pan_by(f64::from(delta.x), f64::from(delta.y));
        }
        if response.drag_stopped() {
            self.widget.handle_event(MapEvent::ViewSettled);
        }

        let (scroll, pinch) = ui.input(|i| (i.smooth_scroll_delta.y, i.zoom_delta()));
        let delta = scroll / SCROLL_PER_ZOOM + pinch.log2();
        let zooming = response.hovered() && delta.abs() > 0.001;

        if zooming {
            if !self.user_zooming {
                self.user_zooming = true;
                self.widget.handle_event(MapEvent::ZoomStart);
            }
            let anchor = response
                .hover_pos()
                .unwrap_or(response.rect.center())
                - response.rect.min;
            self.viewport
                .zoom_about(f64::from(delta), f64::from(anchor.x), f64::from(anchor.y));
        } else if self.user_zooming {
            self.user_zooming = false;
            self.widget.handle_event(MapEvent::ViewSettled);
        }
    }

    fn handle_pointer(&mut self, response: &egui::Response) {
        let Some(scene) = self.widget.renderer() else {
            return;
        };

        let pointer = response
            .hover_pos()
            .filter(|_| !response.dragged())
            .map(|p| p - response.rect.min)
            .map(|p| (f64::from(p.x), f64::from(p.y)));
        let hovered = pointer.and_then(|p| hit_test(scene, &self.viewport, p, EventKind::HoverIn));

        let clicked = if response.clicked() {
            let target = response
                .interact_pointer_pos()
                .map(|p| p - response.rect.min)
                .and_then(|p| {
                    hit_test(
                        scene,
                        &self.viewport,
                        (f64::from(p.x), f64::from(p.y)),
                        EventKind::Click,
                    )
                });
            Some(target)
        } else {
            None
        };

        if hovered != self.hovered {
            if let Some(previous) = self.hovered.take() {
                self.widget.handle_event(MapEvent::HoverOut(previous));
            }
            if let Some(current) = hovered {
                self.widget.handle_event(MapEvent::HoverIn(current));
            }
            self.hovered = hovered;
        }

        match clicked {
            Some(Some(id)) => self.widget.handle_event(MapEvent::Click(id)),
            Some(None) => self.widget.handle_event(MapEvent::BackgroundClick),
            None => {}
        }
    }

    fn error_message(&self) -> Option<String> {
        self.widget
            .failure()
            .map(|e| e.to_string())
            .or_else(|| self.feed_error.clone())
    }

    fn draw_info_panel(&mut self, ctx: &egui::Context) {
        if let Some(panel) = self.widget.info_panel() {
            let mut command = None;
            let mut collapse = false;
            egui::Window::new("Flight")
                .id(egui::Id::new("flight_info"))
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -30.0))
                .resizable(false)
                .collapsible(false)
                .show(ctx, |ui| {
                    show_panel(ui, &panel);
                    ui.separator();
                    ui.horizontal(|ui| {
                        if ui.button("✈ Flight").clicked() {
                            command = Some(NavigationCommand::RecenterOnFlight);
                        }
                        if ui.button("Origin").clicked() {
                            command = Some(NavigationCommand::ZoomToOrigin);
                        }
                        if ui.button("Destination").clicked() {
                            command = Some(NavigationCommand::ZoomToDestination);
                        }
                        if ui.button("Route").clicked() {
                            command = Some(NavigationCommand::ZoomToRoute);
                        }
                        if ui.button("Hide").clicked() {
                            collapse = true;
                        }
                    });
                });

            if let Some(command) = command {
                if !self.widget.navigate(command) {
                    debug!("No target for {command:?}");
                }
            }
            if collapse {
                self.widget.collapse_panel();
            }
        } else if self.widget.panel_collapsed() && self.widget.selected_flight().is_some() {
            egui::Window::new("Flight")
                .id(egui::Id::new("flight_info_collapsed"))
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -30.0))
                .title_bar(false)
                .resizable(false)
                .show(ctx, |ui| {
                    if ui.button("Show flight info").clicked() {
                        self.widget.expand_panel();
                    }
                });
        }
    }

    fn draw_controls(&mut self, ctx: &egui::Context) {
        egui::Window::new("Layers")
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
            .resizable(false)
            .collapsible(true)
            .show(ctx, |ui| {
                for layer in Layer::ALL {
                    let mut visible = self.widget.is_layer_visible(layer);
                    if ui.checkbox(&mut visible, layer.name()).changed() {
                        self.widget
                            .handle_event(MapEvent::OverlayToggled { layer, visible });
                    }
                }
            });

        egui::Window::new("Home")
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
            .title_bar(false)
            .resizable(false)
            .show(ctx, |ui| {
                let home = ui.add_enabled(self.widget.home().is_some(), egui::Button::new("⌂ Home"));
                if home.on_hover_text("Back to my location").clicked() {
                    self.widget.go_home();
                }
            });
    }

    fn draw_status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(self.widget.entity().unwrap_or("no entity"))
                    .monospace()
                    .size(11.0),
            );
            ui.separator();
            match self.last_counts {
                Some((drawn, 0)) => ui.label(format!("{drawn} flights")),
                Some((drawn, skipped)) => ui.label(format!("{drawn} flights ({skipped} skipped)")),
                None => ui.label("Waiting for data"),
            };
            ui.separator();
            if let Some(received) = self.last_received {
                ui.label(format!(
                    "Updated {}",
                    received.with_timezone(&Local).format("%H:%M:%S")
                ));
                ui.separator();
            }
            ui.label(
                egui::RichText::new(self.feed_path.display().to_string())
                    .color(egui::Color32::from_gray(140))
                    .size(10.0),
            );
        });
    }
}

impl eframe::App for WhatsThatPlaneApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_feed();
        self.run_redraw();
        self.drive_view(ctx);

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.draw_status_bar(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.draw_map(ui);
            });

        self.draw_controls(ctx);
        self.draw_info_panel(ctx);

        if self.widget.redraw_pending() {
            ctx.request_repaint();
        }
    }
}

impl Drop for WhatsThatPlaneApp {
    fn drop(&mut self) {
        self.feed_cancel.cancel();
    }
}

/// Run the snapshot feed on its own runtime and forward events to the UI.
fn spawn_feed(
    config: FeedConfig,
    ctx: egui::Context,
    cancel: CancellationToken,
) -> mpsc::Receiver<FeedEvent> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                error!("Failed to start feed runtime: {e}");
                return;
            }
        };

        runtime.block_on(async move {
            let mut feed = SnapshotFeed::spawn(config);
            loop {
                tokio::select! {
                    event = feed.recv() => {
                        let Some(event) = event else {
                            warn!("Snapshot feed stopped");
                            break;
                        };
                        if tx.send(event).is_err() {
                            break; // UI closed
                        }
                        ctx.request_repaint();
                    }
                    () = cancel.cancelled() => break,
                }
            }
        });
    });
    rx
}

fn show_panel(ui: &mut egui::Ui, panel: &InfoPanel) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new(&panel.airline).strong());
        if let Some(link) = &panel.link {
            ui.hyperlink_to(panel.callsign.as_str(), link);
        }
        ui.label(panel.route());
    });
    ui.label(format!("From: {} {}", panel.origin.flag, panel.origin.details()));
    ui.label(format!("To: {} {}", panel.destination.flag, panel.destination.details()));

    if !panel.details.is_empty() || panel.observer.is_some() {
        ui.add_space(4.0);
        egui::Grid::new("flight_details")
            .num_columns(2)
            .spacing([12.0, 2.0])
            .show(ui, |ui| {
                for (label, value) in &panel.details {
                    ui.label(egui::RichText::new(*label).color(egui::Color32::from_gray(150)));
                    ui.label(value.as_str());
                    ui.end_row();
                }
                if let Some(observer) = panel.observer {
                    ui.label(egui::RichText::new("From me").color(egui::Color32::from_gray(150)));
                    ui.label(format!(
                        "{:.1} km at {:.0}°{}",
                        observer.distance_km,
                        observer.bearing_deg,
                        if observer.in_fov { ", in view" } else { "" }
                    ));
                    ui.end_row();
                }
            });
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "screen coordinates fit comfortably in f32"
)]
fn vec(x: f64, y: f64) -> egui::Vec2 {
    egui::vec2(x as f32, y as f32)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "opacity is clamped to 0..=1 before scaling"
)]
fn color32(color: &str, opacity: f64) -> egui::Color32 {
    let (r, g, b) = match color {
        "green" => (0, 128, 0),
        "white" => (255, 255, 255),
        other => parse_hex(other).unwrap_or(FALLBACK_COLOR),
    };
    let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(r, g, b, alpha)
}

fn paint_scene(painter: &egui::Painter, rect: egui::Rect, scene: &Scene, viewport: &Viewport) {
    let to_pos = |point: LatLng| {
        let (x, y) = viewport.to_screen(point);
        rect.min + vec(x, y)
    };

    for (primitive, polygon) in scene.polygons() {
        if !scene.is_layer_visible(primitive.layer) || polygon.points.len() < 3 {
            continue;
        }
        let points: Vec<egui::Pos2> = polygon.points.iter().copied().map(to_pos).collect();
        let fill = color32(&polygon.color, polygon.fill_opacity);
        let mut mesh = egui::epaint::Mesh::default();
        for point in &points {
            mesh.colored_vertex(*point, fill);
        }
        // Fan from the apex covers sectors wider than 180 degrees too
        let count = u32::try_from(points.len()).unwrap_or(0);
        for i in 1..count.saturating_sub(1) {
            mesh.add_triangle(0, i, i + 1);
        }
        painter.add(egui::Shape::mesh(mesh));
        painter.add(egui::Shape::closed_line(
            points,
            egui::Stroke::new(3.0, color32(&polygon.color, polygon.opacity)),
        ));
    }

    for (primitive, line) in scene.polylines() {
        if !scene.is_layer_visible(primitive.layer) || line.opacity <= 0.0 {
            continue;
        }
        let points: Vec<egui::Pos2> = line.points.iter().copied().map(to_pos).collect();
        #[allow(clippy::cast_possible_truncation, reason = "stroke weights are small")]
        let stroke = egui::Stroke::new(line.weight as f32, color32(&line.color, line.opacity));
        painter.add(egui::Shape::line(points, stroke));
    }

    for (primitive, marker) in scene.markers() {
        if !scene.is_layer_visible(primitive.layer) || marker.opacity <= 0.0 {
            continue;
        }
        let pos = to_pos(marker.position);
        if rect.expand(20.0).contains(pos) {
            draw_marker(painter, pos, marker);
        }
    }
}

fn draw_marker(painter: &egui::Painter, pos: egui::Pos2, marker: &MarkerSpec) {
    let outline = color32("white", marker.opacity);
    match &marker.icon {
        MarkerIcon::Plane { heading, color } => {
            let (sin, cos) = heading.to_radians().sin_cos();
            let rotate = |x: f64, y: f64| pos + vec(x * cos - y * sin, x * sin + y * cos);
            let points = vec![rotate(0.0, -11.0), rotate(7.0, 8.0), rotate(-7.0, 8.0)];
            painter.add(egui::Shape::convex_polygon(
                points,
                color32(color, marker.opacity),
                egui::Stroke::new(1.5, outline),
            ));
        }
        MarkerIcon::Location { color } => {
            painter.circle_filled(pos, 8.0, color32(color, marker.opacity));
            painter.circle_stroke(pos, 8.0, egui::Stroke::new(2.0, outline));
        }
        MarkerIcon::Airport { color } => {
            painter.circle_filled(pos, 7.0, color32(color, marker.opacity));
            painter.circle_stroke(pos, 7.0, egui::Stroke::new(1.5, outline));
            painter.circle_filled(pos, 2.5, outline);
        }
    }
}

fn draw_label(painter: &egui::Painter, pos: egui::Pos2, text: &str) {
    let galley = painter.layout_no_wrap(
        text.to_string(),
        egui::FontId::proportional(11.0),
        egui::Color32::WHITE,
    );
    let padding = egui::vec2(4.0, 2.0);
    let box_rect = egui::Rect::from_min_size(
        pos - egui::vec2(padding.x, galley.size().y / 2.0 + padding.y),
        galley.size() + padding * 2.0,
    );
    painter.rect_filled(box_rect, 2.0, egui::Color32::from_black_alpha(180));
    painter.text(
        pos,
        egui::Align2::LEFT_CENTER,
        text,
        egui::FontId::proportional(11.0),
        egui::Color32::WHITE,
    );
}

fn draw_error_bubble(painter: &egui::Painter, rect: egui::Rect, message: &str) {
    let error_pos = rect.center_top() + egui::vec2(0.0, 20.0);
    let galley = painter.layout_no_wrap(
        message.to_string(),
        egui::FontId::proportional(12.0),
        egui::Color32::WHITE,
    );
    let padding = egui::vec2(12.0, 6.0);
    let bubble = egui::Rect::from_center_size(error_pos, galley.size() + padding * 2.0);
    painter.rect_filled(bubble, 5.0, egui::Color32::from_rgb(220, 50, 50));
    painter.text(
        error_pos,
        egui::Align2::CENTER_CENTER,
        message,
        egui::FontId::proportional(12.0),
        egui::Color32::WHITE,
    );
}

fn marker_popup(scene: &Scene, id: PrimitiveId) -> Option<(LatLng, String)> {
    scene
        .markers()
        .find(|(primitive, _)| primitive.id == id)
        .and_then(|(_, marker)| marker.popup.clone().map(|text| (marker.position, text)))
}

/// Topmost primitive under `pointer` that listens for `event`.
///
/// Markers sit above trails, and later primitives above earlier ones.
fn hit_test(
    scene: &Scene,
    viewport: &Viewport,
    pointer: (f64, f64),
    event: EventKind,
) -> Option<PrimitiveId> {
    let candidate = |primitive: &flight_map::scene::Primitive| {
        primitive.listens_to(event) && scene.is_layer_visible(primitive.layer)
    };

    let marker = scene
        .markers()
        .filter(|&(primitive, _)| candidate(primitive))
        .filter(|&(_, marker)| {
            distance(viewport.to_screen(marker.position), pointer) <= MARKER_HIT_RADIUS
        })
        .last()
        .map(|(primitive, _)| primitive.id);
    if marker.is_some() {
        return marker;
    }

    scene
        .polylines()
        .filter(|&(primitive, _)| candidate(primitive))
        .filter(|&(_, line)| {
            let slop = (line.weight / 2.0).max(LINE_HIT_SLOP);
            line.points
                .windows(2)
                .any(|pair| {
                    segment_distance(
                        pointer,
                        viewport.to_screen(pair[0]),
                        viewport.to_screen(pair[1]),
                    ) <= slop
                })
        })
        .last()
        .map(|(primitive, _)| primitive.id)
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let length_sq = dx * dx + dy * dy;
    if length_sq <= f64::EPSILON {
        return distance(p, a);
    }
    let t = (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / length_sq).clamp(0.0, 1.0);
    distance(p, (a.0 + t * dx, a.1 + t * dy))
}
