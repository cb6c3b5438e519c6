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

//! Retained in-memory scene.
//!
//! [`Scene`] implements [`MapRenderer`] by keeping every primitive in an
//! ordered map. A desktop host paints from it each frame, the exporter
//! serializes it, and tests inspect it directly.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use log::debug;

use crate::renderer::{
    EventKind, FitOptions, Layer, MapRenderer, MarkerSpec, PolygonSpec, PolylineSpec, PrimitiveId,
    StyleUpdate,
};
use crate::snapshot::LatLng;

/// Geometry and style of a stored primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveKind {
    Marker(MarkerSpec),
    Polyline(PolylineSpec),
    Polygon(PolygonSpec),
}

/// A primitive together with its layer and registered handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub id: PrimitiveId,
    pub layer: Layer,
    pub kind: PrimitiveKind,
    pub handlers: Vec<EventKind>,
}

impl Primitive {
    #[must_use]
    pub fn opacity(&self) -> f64 {
        match &self.kind {
            PrimitiveKind::Marker(m) => m.opacity,
            PrimitiveKind::Polyline(p) => p.opacity,
            PrimitiveKind::Polygon(p) => p.opacity,
        }
    }

    /// Stroke weight, for polylines only.
    #[must_use]
    pub fn weight(&self) -> Option<f64> {
        match &self.kind {
            PrimitiveKind::Polyline(p) => Some(p.weight),
            _ => None,
        }
    }

    #[must_use]
    pub fn listens_to(&self, event: EventKind) -> bool {
        self.handlers.contains(&event)
    }

    fn apply(&mut self, style: StyleUpdate) {
        match &mut self.kind {
            PrimitiveKind::Marker(m) => {
                if let Some(opacity) = style.opacity {
                    m.opacity = opacity;
                }
            }
            PrimitiveKind::Polyline(p) => {
                if let Some(opacity) = style.opacity {
                    p.opacity = opacity;
                }
                if let Some(weight) = style.weight {
                    p.weight = weight;
                }
            }
            PrimitiveKind::Polygon(p) => {
                if let Some(opacity) = style.opacity {
                    p.opacity = opacity;
                }
            }
        }
    }
}

/// A requested view change, queued until the host consumes it.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewCommand {
    Set {
        center: LatLng,
        zoom: f64,
    },
    FlyTo {
        center: LatLng,
        zoom: f64,
        duration: Duration,
    },
    FitBounds {
        points: Vec<LatLng>,
        options: FitOptions,
    },
}

/// In-memory [`MapRenderer`].
#[derive(Debug, Default)]
pub struct Scene {
    next_id: u64,
    primitives: BTreeMap<PrimitiveId, Primitive>,
    hidden_layers: HashSet<Layer>,
    view_commands: Vec<ViewCommand>,
    size_invalidations: u64,
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, layer: Layer, kind: PrimitiveKind) -> PrimitiveId {
        self.next_id += 1;
        let id = PrimitiveId(self.next_id);
        self.primitives.insert(
            id,
            Primitive {
                id,
                layer,
                kind,
                handlers: Vec::new(),
            },
        );
        id
    }

    #[must_use]
    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(&id)
    }

    /// Every primitive, in creation order.
    pub fn primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives.values()
    }

    /// Primitives in `layer`, in creation order.
    pub fn in_layer(&self, layer: Layer) -> impl Iterator<Item = &Primitive> {
        self.primitives.values().filter(move |p| p.layer == layer)
    }

    /// Primitives whose layer is currently shown.
    pub fn visible_primitives(&self) -> impl Iterator<Item = &Primitive> {
        self.primitives
            .values()
            .filter(|p| !self.hidden_layers.contains(&p.layer))
    }

    pub fn markers(&self) -> impl Iterator<Item = (&Primitive, &MarkerSpec)> {
        self.primitives.values().filter_map(|p| match &p.kind {
            PrimitiveKind::Marker(m) => Some((p, m)),
            _ => None,
        })
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&Primitive, &PolylineSpec)> {
        self.primitives.values().filter_map(|p| match &p.kind {
            PrimitiveKind::Polyline(l) => Some((p, l)),
            _ => None,
        })
    }

    pub fn polygons(&self) -> impl Iterator<Item = (&Primitive, &PolygonSpec)> {
        self.primitives.values().filter_map(|p| match &p.kind {
            PrimitiveKind::Polygon(g) => Some((p, g)),
            _ => None,
        })
    }

    #[must_use]
    pub fn is_layer_visible(&self, layer: Layer) -> bool {
        !self.hidden_layers.contains(&layer)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Drain queued view changes, oldest first.
    pub fn take_view_commands(&mut self) -> Vec<ViewCommand> {
        std::mem::take(&mut self.view_commands)
    }

    #[must_use]
    pub fn pending_view_commands(&self) -> &[ViewCommand] {
        &self.view_commands
    }

    #[must_use]
    pub fn size_invalidations(&self) -> u64 {
        self.size_invalidations
    }
}

impl MapRenderer for Scene {
    fn create_marker(&mut self, layer: Layer, spec: MarkerSpec) -> PrimitiveId {
        self.insert(layer, PrimitiveKind::Marker(spec))
    }

    fn create_polyline(&mut self, layer: Layer, spec: PolylineSpec) -> PrimitiveId {
        self.insert(layer, PrimitiveKind::Polyline(spec))
    }

    fn create_polygon(&mut self, layer: Layer, spec: PolygonSpec) -> PrimitiveId {
        self.insert(layer, PrimitiveKind::Polygon(spec))
    }

    fn set_style(&mut self, id: PrimitiveId, style: StyleUpdate) {
        if let Some(primitive) = self.primitives.get_mut(&id) {
            primitive.apply(style);
        }
    }

    fn on(&mut self, id: PrimitiveId, event: EventKind) {
        if let Some(primitive) = self.primitives.get_mut(&id) {
            if !primitive.handlers.contains(&event) {
                primitive.handlers.push(event);
            }
        }
    }

    fn clear_layer(&mut self, layer: Layer) {
        let before = self.primitives.len();
        self.primitives.retain(|_, p| p.layer != layer);
        debug!(
            "Cleared {} primitives from layer {layer}",
            before - self.primitives.len()
        );
    }

    fn set_layer_visible(&mut self, layer: Layer, visible: bool) {
        if visible {
            self.hidden_layers.remove(&layer);
        } else {
            self.hidden_layers.insert(layer);
        }
    }

    fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.view_commands.push(ViewCommand::Set { center, zoom });
    }

    fn fly_to(&mut self, center: LatLng, zoom: f64, duration: Duration) {
        self.view_commands.push(ViewCommand::FlyTo {
            center,
            zoom,
            duration,
        });
    }

    fn fly_to_bounds(&mut self, points: &[LatLng], options: FitOptions) {
        self.view_commands.push(ViewCommand::FitBounds {
            points: points.to_vec(),
            options,
        });
    }

    fn invalidate_size(&mut self) {
        self.size_invalidations += 1;
    }
}
