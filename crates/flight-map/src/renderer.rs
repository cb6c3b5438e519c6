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

//! The map rendering seam.
//!
//! The engine never draws anything itself. It describes primitives (markers,
//! polylines and polygons) to a [`MapRenderer`], restyles them by id, and asks
//! for view changes. Interaction handlers are registered as data: the host
//! reports pointer activity back as [`MapEvent`]s.

use std::time::Duration;

use crate::snapshot::LatLng;

/// Handle to a primitive created by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(pub u64);

/// Overlay groups the user can toggle independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    VisibleFlights,
    HistoricFlights,
    Location,
    Airports,
}

impl Layer {
    pub const ALL: [Self; 4] = [
        Self::VisibleFlights,
        Self::HistoricFlights,
        Self::Location,
        Self::Airports,
    ];

    /// Display name, also used as the persisted preference key.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::VisibleFlights => "Visible Flights",
            Self::HistoricFlights => "Historic Flights",
            Self::Location => "My Location & FOV",
            Self::Airports => "Flight Origin / Destination",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layer| layer.name() == name)
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Marker glyphs.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerIcon {
    /// Aircraft silhouette rotated to the heading, in degrees.
    Plane { heading: f64, color: String },
    /// Observer location pin.
    Location { color: String },
    /// Origin or destination airport pin.
    Airport { color: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub position: LatLng,
    pub icon: MarkerIcon,
    pub opacity: f64,
    pub popup: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolylineSpec {
    pub points: Vec<LatLng>,
    pub color: String,
    pub weight: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonSpec {
    pub points: Vec<LatLng>,
    pub color: String,
    pub opacity: f64,
    pub fill_opacity: f64,
    pub interactive: bool,
}

/// Partial style change; `None` leaves the attribute untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleUpdate {
    pub opacity: Option<f64>,
    pub weight: Option<f64>,
}

impl StyleUpdate {
    #[must_use]
    pub const fn opacity(opacity: f64) -> Self {
        Self {
            opacity: Some(opacity),
            weight: None,
        }
    }

    #[must_use]
    pub const fn stroke(opacity: f64, weight: f64) -> Self {
        Self {
            opacity: Some(opacity),
            weight: Some(weight),
        }
    }
}

/// Pointer interactions a primitive can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    HoverIn,
    HoverOut,
    Click,
}

impl EventKind {
    pub const ALL: [Self; 3] = [Self::HoverIn, Self::HoverOut, Self::Click];
}

/// Options for framing a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Screen padding around the framed points, in pixels.
    pub padding: f64,
    pub max_zoom: f64,
    pub duration: Duration,
}

/// Interaction reported back by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    HoverIn(PrimitiveId),
    HoverOut(PrimitiveId),
    Click(PrimitiveId),
    /// Click that hit no primitive.
    BackgroundClick,
    /// An animated zoom is starting.
    ZoomStart,
    /// Zoom or pan finished.
    ViewSettled,
    Resized,
    OverlayToggled { layer: Layer, visible: bool },
}

/// Drawing surface the engine renders into.
pub trait MapRenderer {
    fn create_marker(&mut self, layer: Layer, spec: MarkerSpec) -> PrimitiveId;

    fn create_polyline(&mut self, layer: Layer, spec: PolylineSpec) -> PrimitiveId;

    fn create_polygon(&mut self, layer: Layer, spec: PolygonSpec) -> PrimitiveId;

    /// Restyle an existing primitive. Unknown ids are ignored.
    fn set_style(&mut self, id: PrimitiveId, style: StyleUpdate);

    /// Ask to be told about `event` on primitive `id`.
    fn on(&mut self, id: PrimitiveId, event: EventKind);

    /// Remove every primitive in `layer`.
    fn clear_layer(&mut self, layer: Layer);

    fn set_layer_visible(&mut self, layer: Layer, visible: bool);

    /// Jump to a view without animation.
    fn set_view(&mut self, center: LatLng, zoom: f64);

    fn fly_to(&mut self, center: LatLng, zoom: f64, duration: Duration);

    fn fly_to_bounds(&mut self, points: &[LatLng], options: FitOptions);

    /// Re-measure the drawing surface after a resize.
    fn invalidate_size(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_names_round_trip() {
        for layer in Layer::ALL {
            assert_eq!(Layer::from_name(layer.name()), Some(layer));
        }
        assert_eq!(Layer::from_name("Satellite"), None);
        assert_eq!(Layer::Location.to_string(), "My Location & FOV");
    }
}
