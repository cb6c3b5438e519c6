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

//! Headless rendering of a snapshot to GeoJSON.

use std::path::Path;

use flight_map::renderer::MarkerIcon;
use flight_map::scene::{Primitive, PrimitiveKind};
use flight_map::{
    CardConfig, ColorAssigner, HostState, LatLng, MapWidget, ReconcileOutcome, Scene,
    SnapshotError, WidgetError,
};
use log::info;
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::{AppConfig, ConfyStore};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Map(#[from] WidgetError),
}

/// Render `state` once, without a window.
pub fn render_state(
    config: &AppConfig,
    state: &HostState,
) -> Result<(Scene, ReconcileOutcome), ExportError> {
    let colors = config
        .color_seed
        .map_or_else(ColorAssigner::new, ColorAssigner::with_seed);
    let mut widget = MapWidget::new(
        CardConfig::for_entity(config.entity.clone()),
        ConfyStore::detached(config.clone()),
        colors,
    );
    widget.attach(Ok::<_, String>(Scene::new()))?;
    let outcome = widget.update_map(state)?;

    let scene = widget
        .renderer_mut()
        .map(std::mem::take)
        .unwrap_or_default();
    Ok((scene, outcome))
}

/// Read the snapshot file, render it and write GeoJSON to `output`.
pub fn export_file(config: &AppConfig, output: &Path) -> Result<ReconcileOutcome, ExportError> {
    let raw = std::fs::read_to_string(&config.snapshot_path)?;
    let state = HostState::from_json(&raw)?;
    let (scene, outcome) = render_state(config, &state)?;

    let collection = to_geojson(&scene);
    std::fs::write(output, serde_json::to_string_pretty(&collection)?)?;
    info!(
        "Exported {} flights ({} skipped) to {}",
        outcome.drawn,
        outcome.skipped,
        output.display()
    );
    Ok(outcome)
}

/// Every visible primitive as a GeoJSON `FeatureCollection`.
#[must_use]
pub fn to_geojson(scene: &Scene) -> Value {
    let features: Vec<Value> = scene.visible_primitives().map(feature).collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn coords(point: LatLng) -> Value {
    json!([point.lng, point.lat])
}

fn feature(primitive: &Primitive) -> Value {
    let layer = primitive.layer.name();
    match &primitive.kind {
        PrimitiveKind::Marker(marker) => {
            let (kind, color, heading) = match &marker.icon {
                MarkerIcon::Plane { heading, color } => ("plane", color, Some(*heading)),
                MarkerIcon::Location { color } => ("location", color, None),
                MarkerIcon::Airport { color } => ("airport", color, None),
            };
            json!({
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": coords(marker.position)},
                "properties": {
                    "layer": layer,
                    "icon": kind,
                    "color": color,
                    "heading": heading,
                    "opacity": marker.opacity,
                    "popup": marker.popup,
                },
            })
        }
        PrimitiveKind::Polyline(line) => json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": line.points.iter().copied().map(coords).collect::<Vec<_>>(),
            },
            "properties": {
                "layer": layer,
                "color": line.color,
                "weight": line.weight,
                "opacity": line.opacity,
            },
        }),
        PrimitiveKind::Polygon(polygon) => json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [polygon.points.iter().copied().map(coords).collect::<Vec<_>>()],
            },
            "properties": {
                "layer": layer,
                "color": polygon.color,
                "opacity": polygon.opacity,
                "fill_opacity": polygon.fill_opacity,
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str = r#"{
        "sensor.whats_that_plane": {"attributes": {
            "config": {"latitude": 10.0, "longitude": 20.0, "facing_direction": 90,
                       "fov_cone": 60, "radius_km": 10},
            "flights": [{"flight_id": "F1", "callsign": "BAW12", "latitude": 10.1,
                         "longitude": 20.1, "heading": 45,
                         "trail": [{"lat": 10.0, "lng": 20.0}, {"lat": 9.9, "lng": 19.9}]}],
            "historic_flights": [{"flight_id": "H1", "latitude": 9.5, "longitude": 19.5}]
        }}
    }"#;

    fn config() -> AppConfig {
        AppConfig {
            color_seed: Some(0.42),
            ..AppConfig::default()
        }
    }

    fn count(collection: &Value, geometry: &str) -> usize {
        collection["features"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|f| f["geometry"]["type"] == geometry)
            .count()
    }

    #[test]
    fn test_exports_flights_and_observer() {
        let state = HostState::from_json(STATE).unwrap();
        let (scene, outcome) = render_state(&config(), &state).unwrap();
        assert_eq!(outcome.drawn, 2);

        let collection = to_geojson(&scene);
        assert_eq!(collection["type"], "FeatureCollection");
        // Two planes plus the observer pin
        assert_eq!(count(&collection, "Point"), 3);
        // Outline and inline stroke of the one trail
        assert_eq!(count(&collection, "LineString"), 2);
        assert_eq!(count(&collection, "Polygon"), 1);

        let plane = collection["features"]
            .as_array()
            .unwrap()
            .iter()
            .find(|f| f["properties"]["heading"] == 45.0)
            .unwrap();
        assert_eq!(plane["geometry"]["coordinates"], json!([20.1, 10.1]));
        assert_eq!(plane["properties"]["layer"], "Visible Flights");
    }

    #[test]
    fn test_missing_entity_is_reported() {
        let state = HostState::from_json(r#"{"sensor.other": {}}"#).unwrap();
        let err = render_state(&config(), &state).unwrap_err();
        assert!(matches!(err, ExportError::Map(WidgetError::EntityNotFound(_))));
    }
}
