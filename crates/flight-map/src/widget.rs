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

//! The live map widget.
//!
//! [`MapWidget`] ties the engine together. It is configured with the entity
//! to follow, attached to a renderer once the map is up, and then fed host
//! state pushes and user events:
//!
//! - pushes are coalesced and applied once per paint frame ([`MapWidget::on_frame`])
//! - the first snapshot carrying an observer config places the observer marker,
//!   the field of view and the home view
//! - every applied snapshot redraws all flights and re-validates the selection
//! - pointer events drive hover emphasis, selection and the route pins
//!
//! Everything runs on the caller's thread.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::color::ColorAssigner;
use crate::geo::fov_polygon;
use crate::navigation::{home_target, target_for, NavigationCommand, HOME_ZOOM};
use crate::panel::{draw_airport_markers, InfoPanel};
use crate::prefs::{KeyValueStore, LayerPreferences, PreferencesError};
use crate::reconciler::{FlightStateReconciler, ReconcileOutcome};
use crate::renderer::{
    EventKind, Layer, MapEvent, MapRenderer, MarkerIcon, MarkerSpec, PolygonSpec, PrimitiveId,
    StyleUpdate,
};
use crate::scheduler::RedrawScheduler;
use crate::selection::{SelectionChange, SelectionController, SelectionState};
use crate::snapshot::{Flight, HostState, LatLng, ObserverConfig, Snapshot};
use crate::style::overlay_opacity;

pub const LOCATION_COLOR: &str = "#d32f2f";
pub const FOV_COLOR: &str = "green";
pub const FOV_OPACITY: f64 = 0.3;
pub const FOV_FILL_OPACITY: f64 = 0.05;

/// Widget configuration as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CardConfig {
    /// Host entity publishing the flight lists.
    #[serde(default)]
    pub entity: Option<String>,
}

impl CardConfig {
    #[must_use]
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: Some(entity.into()),
        }
    }
}

/// Errors surfaced to the user in place of the map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("You need to define an entity in the card configuration.")]
    MissingEntity,

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// The followed entity is present but its attributes could not be decoded.
    #[error("Entity state unreadable: {0}")]
    InvalidState(String),

    /// The map could not be initialized. Carries the underlying cause.
    #[error("Could not load the map. Please check your internet connection.")]
    MapUnavailable(String),
}

impl WidgetError {
    /// Whether the widget can continue once the cause goes away.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EntityNotFound(_) | Self::InvalidState(_))
    }
}

/// Lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetStatus {
    /// Waiting for the map to come up.
    Loading,
    Ready,
    Failed(WidgetError),
}

/// A live flight map bound to one host entity.
#[derive(Debug)]
pub struct MapWidget<R, S> {
    entity: Option<String>,
    renderer: Option<R>,
    store: S,
    status: WidgetStatus,

    colors: ColorAssigner,
    selection: SelectionController,
    reconciler: FlightStateReconciler,
    layers: LayerPreferences,
    scheduler: RedrawScheduler<HostState>,

    host_state: Option<HostState>,
    snapshot: Option<Snapshot>,
    observer: Option<ObserverConfig>,
    home: Option<LatLng>,
    location_marker: Option<PrimitiveId>,
    static_drawn: bool,
    last_update: Option<DateTime<Utc>>,
}

impl<R: MapRenderer, S: KeyValueStore> MapWidget<R, S> {
    /// Configure a widget. Layer visibility is read from `store` once, here.
    pub fn new(config: CardConfig, store: S, colors: ColorAssigner) -> Self {
        let entity = config.entity.filter(|e| !e.trim().is_empty());
        let status = if entity.is_some() {
            WidgetStatus::Loading
        } else {
            error!("{}", WidgetError::MissingEntity);
            WidgetStatus::Failed(WidgetError::MissingEntity)
        };
        let layers = LayerPreferences::load(&store);

        Self {
            entity,
            renderer: None,
            store,
            status,
            colors,
            selection: SelectionController::new(),
            reconciler: FlightStateReconciler::new(),
            layers,
            scheduler: RedrawScheduler::new(),
            host_state: None,
            snapshot: None,
            observer: None,
            home: None,
            location_marker: None,
            static_drawn: false,
            last_update: None,
        }
    }

    /// Hand over the result of bringing the map up.
    ///
    /// A failed bootstrap leaves the widget permanently failed; pushes are
    /// ignored until a new widget is created.
    pub fn attach<E: Display>(&mut self, bootstrap: Result<R, E>) -> Result<(), WidgetError> {
        if let WidgetStatus::Failed(e) = &self.status {
            if !e.is_recoverable() {
                return Err(e.clone());
            }
        }

        match bootstrap {
            Ok(mut renderer) => {
                for layer in Layer::ALL {
                    renderer.set_layer_visible(layer, self.layers.is_visible(layer));
                }
                renderer.invalidate_size();
                self.renderer = Some(renderer);
                self.status = WidgetStatus::Ready;
                info!("Map ready for entity {}", self.entity.as_deref().unwrap_or_default());
                Ok(())
            }
            Err(e) => {
                error!("Map initialization error: {e}");
                let err = WidgetError::MapUnavailable(e.to_string());
                self.status = WidgetStatus::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Accept a host state push. The redraw runs on the next frame; a push
    /// arriving before then replaces this one.
    ///
    /// Returns `false` when the push was ignored because the map is not up.
    pub fn push_state(&mut self, state: HostState) -> bool {
        if self.renderer.is_none() {
            debug!("Ignoring state push, map not initialized");
            return false;
        }
        if self.scheduler.schedule(state.clone()) {
            debug!("Replaced pending redraw with newer state");
        }
        self.host_state = Some(state);
        true
    }

    /// Run the pending redraw, if any. Call once per paint frame.
    pub fn on_frame(&mut self) -> Option<Result<ReconcileOutcome, WidgetError>> {
        let state = self.scheduler.take_due()?;
        Some(self.update_map(&state))
    }

    /// Redraw from `state` immediately.
    pub fn update_map(&mut self, state: &HostState) -> Result<ReconcileOutcome, WidgetError> {
        let Some(entity) = self.entity.clone() else {
            return Err(WidgetError::MissingEntity);
        };
        if self.renderer.is_none() {
            return Err(self.failure().unwrap_or_else(|| {
                WidgetError::MapUnavailable("map not initialized".to_string())
            }));
        }

        let entity_state = match state.entity(&entity) {
            Ok(Some(entity_state)) => entity_state,
            Ok(None) => return Err(self.fail_update(WidgetError::EntityNotFound(entity))),
            Err(e) => return Err(self.fail_update(WidgetError::InvalidState(e.to_string()))),
        };

        self.status = WidgetStatus::Ready;
        self.snapshot = Some(entity_state.attributes);
        self.last_update = Some(Utc::now());

        if !self.static_drawn {
            self.draw_static_elements();
        }
        Ok(self.draw_flight_elements())
    }

    fn fail_update(&mut self, err: WidgetError) -> WidgetError {
        warn!("{err}");
        self.status = WidgetStatus::Failed(err.clone());
        err
    }

    /// Place the observer marker, the field of view and the home view.
    /// Runs once, on the first snapshot that carries an observer config.
    fn draw_static_elements(&mut self) {
        let Some(config) = self.snapshot.as_ref().and_then(|s| s.config.clone()) else {
            return;
        };
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let home = config.position();
        renderer.set_view(home, HOME_ZOOM);
        renderer.clear_layer(Layer::Location);

        let marker = renderer.create_marker(
            Layer::Location,
            MarkerSpec {
                position: home,
                icon: MarkerIcon::Location {
                    color: LOCATION_COLOR.to_string(),
                },
                opacity: overlay_opacity(self.selection.state()),
                popup: Some("My Location".to_string()),
            },
        );
        // Pointer events only open the popup
        for event in EventKind::ALL {
            renderer.on(marker, event);
        }
        renderer.create_polygon(
            Layer::Location,
            PolygonSpec {
                points: fov_polygon(
                    config.latitude,
                    config.longitude,
                    config.facing_direction,
                    config.fov_cone,
                    config.radius_km,
                ),
                color: FOV_COLOR.to_string(),
                opacity: FOV_OPACITY,
                fill_opacity: FOV_FILL_OPACITY,
                interactive: false,
            },
        );

        info!(
            "Observer at {:.4}, {:.4} facing {}° with {}° field of view",
            config.latitude, config.longitude, config.facing_direction, config.fov_cone
        );
        self.location_marker = Some(marker);
        self.home = Some(home);
        self.observer = Some(config);
        self.static_drawn = true;
    }

    fn draw_flight_elements(&mut self) -> ReconcileOutcome {
        let (Some(renderer), Some(snapshot)) = (self.renderer.as_mut(), self.snapshot.as_ref())
        else {
            return ReconcileOutcome::default();
        };

        let outcome = self.reconciler.reconcile(
            snapshot,
            self.selection.state(),
            &mut self.colors,
            renderer,
        );

        if self.selection.state() != &SelectionState::Unselected {
            let latest = if outcome.selected_present {
                outcome.selected_flight.as_ref()
            } else {
                None
            };
            let change = self.selection.on_snapshot(latest);
            if let SelectionChange::Deselected { .. } = change {
                self.after_deselect();
                return outcome;
            }
        }
        self.update_all_opacity();
        outcome
    }

    fn update_all_opacity(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let state = self.selection.state();
        self.reconciler.restyle(state, renderer);
        if let Some(marker) = self.location_marker {
            renderer.set_style(marker, StyleUpdate::opacity(overlay_opacity(state)));
        }
    }

    fn after_deselect(&mut self) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.clear_layer(Layer::Airports);
        }
        self.update_all_opacity();
    }

    /// Feed a user or view event from the host.
    pub fn handle_event(&mut self, event: MapEvent) {
        if self.renderer.is_none() {
            return;
        }
        match event {
            MapEvent::HoverIn(primitive) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    self.reconciler.hover(primitive, renderer);
                }
            }
            MapEvent::HoverOut(primitive) => {
                if let Some(renderer) = self.renderer.as_mut() {
                    self.reconciler
                        .hover_out(primitive, self.selection.state(), renderer);
                }
            }
            MapEvent::Click(primitive) => {
                let Some(flight) = self.reconciler.flight_for(primitive).map(|e| e.flight.clone())
                else {
                    return;
                };
                self.select_flight(&flight);
                self.navigate(NavigationCommand::ZoomToRoute);
            }
            MapEvent::BackgroundClick => {
                self.deselect();
            }
            MapEvent::ZoomStart => {
                if let Some(renderer) = self.renderer.as_mut() {
                    self.reconciler
                        .hide_for_zoom(self.selection.state(), renderer);
                }
            }
            MapEvent::ViewSettled => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.invalidate_size();
                }
                self.update_all_opacity();
            }
            MapEvent::Resized => {
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.invalidate_size();
                }
            }
            MapEvent::OverlayToggled { layer, visible } => {
                if let Err(e) = self.toggle_layer(layer, visible) {
                    warn!("Failed to save layer preferences: {e}");
                }
            }
        }
    }

    /// Show or hide an overlay and persist the choice. Showing an overlay
    /// schedules a redraw from the latest state.
    pub fn toggle_layer(&mut self, layer: Layer, visible: bool) -> Result<(), PreferencesError> {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_layer_visible(layer, visible);
        }
        self.layers.set(layer, visible);
        let saved = self.layers.save(&mut self.store);

        if visible {
            if let Some(state) = self.host_state.clone() {
                self.scheduler.schedule(state);
            }
        }
        saved
    }

    /// Select `flight`: open its panel, pin its route and dim the rest.
    pub fn select_flight(&mut self, flight: &Flight) -> SelectionChange {
        let change = self.selection.select(flight);
        if change.is_changed() {
            if let Some(renderer) = self.renderer.as_mut() {
                draw_airport_markers(flight, renderer);
            }
            self.update_all_opacity();
        }
        change
    }

    /// Drop the selection, as a click on the map background does.
    pub fn deselect(&mut self) -> SelectionChange {
        let change = self.selection.background_click();
        if change.is_changed() {
            self.after_deselect();
        }
        change
    }

    /// Move the view for the selected flight. Returns `false` when nothing is
    /// selected or the flight lacks the needed coordinates.
    pub fn navigate(&mut self, command: NavigationCommand) -> bool {
        let Some(target) = self.selection.flight().and_then(|f| target_for(command, f)) else {
            return false;
        };
        let Some(renderer) = self.renderer.as_mut() else {
            return false;
        };
        self.reconciler.hide_for_zoom(self.selection.state(), renderer);
        target.apply(renderer);
        true
    }

    /// Fly back to the observer.
    pub fn go_home(&mut self) -> bool {
        let (Some(home), Some(renderer)) = (self.home, self.renderer.as_mut()) else {
            return false;
        };
        self.reconciler.hide_all(renderer);
        home_target(home).apply(renderer);
        true
    }

    /// Panel for the selected flight, unless collapsed.
    #[must_use]
    pub fn info_panel(&self) -> Option<InfoPanel> {
        if !self.selection.panel_visible() {
            return None;
        }
        self.selection
            .flight()
            .map(|f| InfoPanel::from_flight(f, self.observer.as_ref()))
    }

    pub fn collapse_panel(&mut self) {
        self.selection.collapse_panel();
    }

    pub fn expand_panel(&mut self) {
        self.selection.expand_panel();
    }

    /// Whether the "show flight info" control should be offered.
    #[must_use]
    pub fn panel_collapsed(&self) -> bool {
        self.selection.panel_collapsed()
    }

    #[must_use]
    pub fn status(&self) -> &WidgetStatus {
        &self.status
    }

    /// Current error, if any.
    #[must_use]
    pub fn failure(&self) -> Option<WidgetError> {
        match &self.status {
            WidgetStatus::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    #[must_use]
    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    #[must_use]
    pub fn renderer(&self) -> Option<&R> {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> Option<&mut R> {
        self.renderer.as_mut()
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        self.selection.state()
    }

    #[must_use]
    pub fn selected_flight(&self) -> Option<&Flight> {
        self.selection.flight()
    }

    #[must_use]
    pub fn reconciler(&self) -> &FlightStateReconciler {
        &self.reconciler
    }

    #[must_use]
    pub fn colors(&self) -> &ColorAssigner {
        &self.colors
    }

    #[must_use]
    pub fn is_layer_visible(&self, layer: Layer) -> bool {
        self.layers.is_visible(layer)
    }

    #[must_use]
    pub fn observer(&self) -> Option<&ObserverConfig> {
        self.observer.as_ref()
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn home(&self) -> Option<LatLng> {
        self.home
    }

    #[must_use]
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    #[must_use]
    pub fn redraw_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The preference store, for hosts that persist it on shutdown.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}
