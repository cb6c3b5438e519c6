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

//! Snapshot to map primitive reconciliation.
//!
//! Every snapshot is authoritative. Both flight layers are cleared and each
//! flight is drawn again from scratch as a heading-rotated marker plus, when it
//! has a trail, a white outline stroke under a colored inline stroke. Only the
//! color cache and the selection survive from one cycle to the next.

use std::collections::HashMap;

use log::{debug, trace};

use crate::color::ColorAssigner;
use crate::renderer::{
    EventKind, Layer, MapRenderer, MarkerIcon, MarkerSpec, PolylineSpec, PrimitiveId, StyleUpdate,
};
use crate::selection::SelectionState;
use crate::snapshot::{Flight, FlightClass, Snapshot};
use crate::style::{flight_params, VisualParams};

/// Color of the wide stroke drawn under every trail.
pub const TRAIL_OUTLINE_COLOR: &str = "#FFFFFF";

/// The paired strokes of a flight trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrailStroke {
    pub outline: PrimitiveId,
    pub inline: PrimitiveId,
}

/// Everything drawn for one flight in the current cycle.
#[derive(Debug, Clone)]
pub struct RenderedEntity {
    pub id: String,
    pub flight: Flight,
    pub class: FlightClass,
    pub color: String,
    pub marker: PrimitiveId,
    pub trail: Option<TrailStroke>,
}

impl RenderedEntity {
    /// All primitive ids belonging to this flight.
    #[must_use]
    pub fn primitives(&self) -> Vec<PrimitiveId> {
        let mut ids = vec![self.marker];
        if let Some(trail) = self.trail {
            ids.push(trail.outline);
            ids.push(trail.inline);
        }
        ids
    }

    fn apply<R: MapRenderer + ?Sized>(&self, params: VisualParams, renderer: &mut R) {
        renderer.set_style(self.marker, StyleUpdate::opacity(params.marker_opacity));
        if let Some(trail) = self.trail {
            renderer.set_style(
                trail.outline,
                StyleUpdate::stroke(params.outline_opacity, params.outline_weight),
            );
            renderer.set_style(
                trail.inline,
                StyleUpdate::stroke(params.inline_opacity, params.inline_weight),
            );
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    /// Flights drawn this cycle.
    pub drawn: usize,
    /// Records skipped for lacking an id or position, or as duplicates.
    pub skipped: usize,
    /// Whether the selected id appears anywhere in the snapshot.
    pub selected_present: bool,
    /// Latest record of the selected flight.
    pub selected_flight: Option<Flight>,
}

/// Owns the rendered entity registry for the current cycle.
#[derive(Debug, Default)]
pub struct FlightStateReconciler {
    entities: Vec<RenderedEntity>,
    by_id: HashMap<String, usize>,
    bindings: HashMap<PrimitiveId, usize>,
}

impl FlightStateReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything drawn with the contents of `snapshot`.
    pub fn reconcile<R: MapRenderer + ?Sized>(
        &mut self,
        snapshot: &Snapshot,
        selection: &SelectionState,
        colors: &mut ColorAssigner,
        renderer: &mut R,
    ) -> ReconcileOutcome {
        renderer.clear_layer(Layer::VisibleFlights);
        renderer.clear_layer(Layer::HistoricFlights);
        self.entities.clear();
        self.by_id.clear();
        self.bindings.clear();

        let mut outcome = ReconcileOutcome::default();
        for (class, flight) in snapshot.all_flights() {
            if self.draw_flight(flight, class, selection, colors, renderer) {
                outcome.drawn += 1;
            } else {
                outcome.skipped += 1;
            }
        }

        if let Some(selected) = selection.selected_id() {
            outcome.selected_present = snapshot.flight_ids().contains(selected);
            outcome.selected_flight = snapshot.find(selected).cloned();
        }

        debug!(
            "Reconciled snapshot: {} drawn, {} skipped",
            outcome.drawn, outcome.skipped
        );
        outcome
    }

    fn draw_flight<R: MapRenderer + ?Sized>(
        &mut self,
        flight: &Flight,
        class: FlightClass,
        selection: &SelectionState,
        colors: &mut ColorAssigner,
        renderer: &mut R,
    ) -> bool {
        let Some(id) = flight.id() else {
            debug!("Skipping flight record without id or callsign");
            return false;
        };
        let Some(position) = flight.position() else {
            trace!("Skipping flight {id} without position");
            return false;
        };
        if self.by_id.contains_key(id) {
            debug!("Skipping duplicate record for flight {id}");
            return false;
        }

        let color = colors.color_for(id);
        let params = flight_params(selection, id);
        let layer = class.layer();

        let trail = if flight.trail_points().next().is_none() {
            None
        } else {
            let points: Vec<_> = std::iter::once(position)
                .chain(flight.trail_points())
                .collect();
            let outline = renderer.create_polyline(
                layer,
                PolylineSpec {
                    points: points.clone(),
                    color: TRAIL_OUTLINE_COLOR.to_string(),
                    weight: params.outline_weight,
                    opacity: params.outline_opacity,
                },
            );
            let inline = renderer.create_polyline(
                layer,
                PolylineSpec {
                    points,
                    color: color.clone(),
                    weight: params.inline_weight,
                    opacity: params.inline_opacity,
                },
            );
            Some(TrailStroke { outline, inline })
        };

        let marker = renderer.create_marker(
            layer,
            MarkerSpec {
                position,
                icon: MarkerIcon::Plane {
                    heading: flight.heading_deg(),
                    color: color.clone(),
                },
                opacity: params.marker_opacity,
                popup: None,
            },
        );

        let index = self.entities.len();
        let entity = RenderedEntity {
            id: id.to_string(),
            flight: flight.clone(),
            class,
            color,
            marker,
            trail,
        };
        for primitive in entity.primitives() {
            for event in EventKind::ALL {
                renderer.on(primitive, event);
            }
            self.bindings.insert(primitive, index);
        }
        self.by_id.insert(entity.id.clone(), index);
        self.entities.push(entity);
        true
    }

    /// Re-apply the styling policy to every entity.
    pub fn restyle<R: MapRenderer + ?Sized>(&self, selection: &SelectionState, renderer: &mut R) {
        for entity in &self.entities {
            entity.apply(flight_params(selection, &entity.id), renderer);
        }
    }

    /// Emphasize the flight owning `primitive`. Returns its id.
    pub fn hover<R: MapRenderer + ?Sized>(
        &self,
        primitive: PrimitiveId,
        renderer: &mut R,
    ) -> Option<&str> {
        let entity = self.flight_for(primitive)?;
        entity.apply(VisualParams::hover(), renderer);
        Some(entity.id.as_str())
    }

    /// Return the flight owning `primitive` to its resting style.
    pub fn hover_out<R: MapRenderer + ?Sized>(
        &self,
        primitive: PrimitiveId,
        selection: &SelectionState,
        renderer: &mut R,
    ) -> Option<&str> {
        let entity = self.flight_for(primitive)?;
        entity.apply(flight_params(selection, &entity.id), renderer);
        Some(entity.id.as_str())
    }

    /// Hide every flight.
    pub fn hide_all<R: MapRenderer + ?Sized>(&self, renderer: &mut R) {
        for entity in &self.entities {
            entity.apply(VisualParams::hidden(), renderer);
        }
    }

    /// Hide the flights that would smear during an animated zoom: the selected
    /// one when there is a selection, all of them otherwise.
    pub fn hide_for_zoom<R: MapRenderer + ?Sized>(
        &self,
        selection: &SelectionState,
        renderer: &mut R,
    ) {
        for entity in &self.entities {
            let hide = match selection.selected_id() {
                Some(selected) => selected == entity.id,
                None => true,
            };
            if hide {
                entity.apply(VisualParams::hidden(), renderer);
            }
        }
    }

    /// The entity owning `primitive`.
    #[must_use]
    pub fn flight_for(&self, primitive: PrimitiveId) -> Option<&RenderedEntity> {
        self.bindings
            .get(&primitive)
            .and_then(|&index| self.entities.get(index))
    }

    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&RenderedEntity> {
        self.by_id.get(id).and_then(|&index| self.entities.get(index))
    }

    #[must_use]
    pub fn entities(&self) -> &[RenderedEntity] {
        &self.entities
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{PrimitiveKind, Scene};
    use crate::snapshot::{LatLng, TrailPoint};

    fn flight(id: &str, lat: f64, lng: f64) -> Flight {
        Flight {
            flight_id: Some(id.to_string()),
            latitude: Some(lat),
            longitude: Some(lng),
            heading: Some(90.0),
            ..Default::default()
        }
    }

    fn with_trail(mut flight: Flight, points: &[(f64, f64)]) -> Flight {
        flight.trail = points
            .iter()
            .map(|&(lat, lng)| TrailPoint {
                lat: Some(lat),
                lng: Some(lng),
            })
            .collect();
        flight
    }

    fn snapshot(visible: Vec<Flight>, historic: Vec<Flight>) -> Snapshot {
        Snapshot {
            config: None,
            flights: Some(visible),
            historic_flights: Some(historic),
        }
    }

    #[test]
    fn test_draws_marker_and_trail() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();

        let f1 = with_trail(flight("F1", 10.0, 20.0), &[(9.9, 19.9), (9.8, 19.8)]);
        let outcome = reconciler.reconcile(
            &snapshot(vec![f1], vec![]),
            &SelectionState::Unselected,
            &mut colors,
            &mut scene,
        );

        assert_eq!(outcome.drawn, 1);
        assert_eq!(scene.markers().count(), 1);
        assert_eq!(scene.polylines().count(), 2);

        let entity = reconciler.entity("F1").unwrap();
        let trail = entity.trail.unwrap();
        let Some(PrimitiveKind::Polyline(outline)) = scene.get(trail.outline).map(|p| &p.kind) else {
            panic!("outline missing");
        };
        assert_eq!(outline.color, TRAIL_OUTLINE_COLOR);
        assert_eq!(outline.weight, 4.0);
        assert_eq!(
            outline.points,
            vec![
                LatLng::new(10.0, 20.0),
                LatLng::new(9.9, 19.9),
                LatLng::new(9.8, 19.8)
            ]
        );
        let Some(PrimitiveKind::Polyline(inline)) = scene.get(trail.inline).map(|p| &p.kind) else {
            panic!("inline missing");
        };
        assert_eq!(inline.color, entity.color);
        assert_eq!(inline.weight, 2.0);
        // Outline is created first so it renders underneath.
        assert!(trail.outline < trail.inline);
        assert!(trail.inline < entity.marker);

        let marker = scene.get(entity.marker).unwrap();
        assert_eq!(marker.layer, Layer::VisibleFlights);
        for event in EventKind::ALL {
            assert!(marker.listens_to(event));
            assert!(scene.get(trail.outline).unwrap().listens_to(event));
        }
    }

    #[test]
    fn test_full_redraw_removes_stale_entities() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();
        let selection = SelectionState::Unselected;

        reconciler.reconcile(
            &snapshot(vec![flight("A", 1.0, 1.0)], vec![flight("B", 2.0, 2.0)]),
            &selection,
            &mut colors,
            &mut scene,
        );
        assert_eq!(scene.markers().count(), 2);

        reconciler.reconcile(
            &snapshot(vec![flight("B", 2.5, 2.5)], vec![]),
            &selection,
            &mut colors,
            &mut scene,
        );
        assert_eq!(scene.markers().count(), 1);
        assert_eq!(reconciler.len(), 1);
        assert!(reconciler.entity("A").is_none());
        assert_eq!(reconciler.entity("B").unwrap().class, FlightClass::Visible);
    }

    #[test]
    fn test_colors_survive_redraws() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.3);
        let mut reconciler = FlightStateReconciler::new();
        let selection = SelectionState::Unselected;

        reconciler.reconcile(&snapshot(vec![flight("A", 1.0, 1.0)], vec![]), &selection, &mut colors, &mut scene);
        let first = reconciler.entity("A").unwrap().color.clone();

        reconciler.reconcile(&snapshot(vec![], vec![]), &selection, &mut colors, &mut scene);
        reconciler.reconcile(
            &snapshot(vec![flight("B", 1.0, 1.0)], vec![flight("A", 1.0, 1.0)]),
            &selection,
            &mut colors,
            &mut scene,
        );
        assert_eq!(reconciler.entity("A").unwrap().color, first);
        assert_eq!(colors.len(), 2);
    }

    #[test]
    fn test_skips_invalid_and_duplicate_records() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();

        let no_position = Flight {
            callsign: Some("GHOST".to_string()),
            ..Default::default()
        };
        let no_id = Flight {
            latitude: Some(1.0),
            longitude: Some(1.0),
            ..Default::default()
        };
        let outcome = reconciler.reconcile(
            &snapshot(
                vec![flight("A", 1.0, 1.0), no_position, no_id],
                vec![flight("A", 5.0, 5.0)],
            ),
            &SelectionState::Unselected,
            &mut colors,
            &mut scene,
        );

        assert_eq!(outcome.drawn, 1);
        assert_eq!(outcome.skipped, 3);
        let entity = reconciler.entity("A").unwrap();
        assert_eq!(entity.class, FlightClass::Visible);
        assert_eq!(entity.flight.latitude, Some(1.0));
        assert_eq!(colors.len(), 1);
    }

    #[test]
    fn test_selected_presence_reported() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();
        let selection = SelectionState::Selected("H".to_string());

        let outcome = reconciler.reconcile(
            &snapshot(vec![flight("A", 1.0, 1.0)], vec![flight("H", 3.0, 3.0)]),
            &selection,
            &mut colors,
            &mut scene,
        );
        assert!(outcome.selected_present);
        assert_eq!(outcome.selected_flight.and_then(|f| f.latitude), Some(3.0));

        let outcome = reconciler.reconcile(
            &snapshot(vec![flight("A", 1.0, 1.0)], vec![]),
            &selection,
            &mut colors,
            &mut scene,
        );
        assert!(!outcome.selected_present);
        assert!(outcome.selected_flight.is_none());
    }

    #[test]
    fn test_restyle_dims_unselected() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();

        reconciler.reconcile(
            &snapshot(
                vec![
                    with_trail(flight("A", 1.0, 1.0), &[(0.9, 0.9)]),
                    with_trail(flight("B", 2.0, 2.0), &[(1.9, 1.9)]),
                ],
                vec![],
            ),
            &SelectionState::Unselected,
            &mut colors,
            &mut scene,
        );

        let selection = SelectionState::Selected("A".to_string());
        reconciler.restyle(&selection, &mut scene);

        let a = reconciler.entity("A").unwrap();
        let b = reconciler.entity("B").unwrap();
        assert_eq!(scene.get(a.marker).unwrap().opacity(), 1.0);
        assert_eq!(scene.get(a.trail.unwrap().outline).unwrap().weight(), Some(6.0));
        assert_eq!(scene.get(b.marker).unwrap().opacity(), 0.3);
        assert_eq!(scene.get(b.trail.unwrap().inline).unwrap().weight(), Some(2.0));

        reconciler.restyle(&SelectionState::Unselected, &mut scene);
        assert_eq!(scene.get(b.marker).unwrap().opacity(), 1.0);
    }

    #[test]
    fn test_hover_and_hover_out() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();
        let selection = SelectionState::Selected("A".to_string());

        reconciler.reconcile(
            &snapshot(
                vec![
                    flight("A", 1.0, 1.0),
                    with_trail(flight("B", 2.0, 2.0), &[(1.9, 1.9)]),
                ],
                vec![],
            ),
            &selection,
            &mut colors,
            &mut scene,
        );
        let b = reconciler.entity("B").unwrap().clone();
        let inline = b.trail.unwrap().inline;

        assert_eq!(reconciler.hover(inline, &mut scene), Some("B"));
        assert_eq!(scene.get(b.marker).unwrap().opacity(), 1.0);
        assert_eq!(scene.get(inline).unwrap().weight(), Some(4.0));

        assert_eq!(reconciler.hover_out(b.marker, &selection, &mut scene), Some("B"));
        assert_eq!(scene.get(b.marker).unwrap().opacity(), 0.3);
        assert_eq!(scene.get(inline).unwrap().weight(), Some(2.0));

        assert_eq!(reconciler.hover(PrimitiveId(10_000), &mut scene), None);
    }

    #[test]
    fn test_hide_for_zoom() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();
        let selection = SelectionState::Selected("A".to_string());

        reconciler.reconcile(
            &snapshot(vec![flight("A", 1.0, 1.0), flight("B", 2.0, 2.0)], vec![]),
            &selection,
            &mut colors,
            &mut scene,
        );
        let a = reconciler.entity("A").unwrap().marker;
        let b = reconciler.entity("B").unwrap().marker;

        reconciler.hide_for_zoom(&selection, &mut scene);
        assert_eq!(scene.get(a).unwrap().opacity(), 0.0);
        assert_eq!(scene.get(b).unwrap().opacity(), 0.3);

        reconciler.hide_for_zoom(&SelectionState::Unselected, &mut scene);
        assert_eq!(scene.get(b).unwrap().opacity(), 0.0);

        reconciler.restyle(&selection, &mut scene);
        assert_eq!(scene.get(a).unwrap().opacity(), 1.0);
    }

    #[test]
    fn test_historic_flights_use_their_layer() {
        let mut scene = Scene::new();
        let mut colors = ColorAssigner::with_seed(0.0);
        let mut reconciler = FlightStateReconciler::new();

        reconciler.reconcile(
            &snapshot(vec![], vec![flight("H", 1.0, 1.0)]),
            &SelectionState::Unselected,
            &mut colors,
            &mut scene,
        );
        assert_eq!(scene.in_layer(Layer::HistoricFlights).count(), 1);
        assert_eq!(scene.in_layer(Layer::VisibleFlights).count(), 0);
    }
}
