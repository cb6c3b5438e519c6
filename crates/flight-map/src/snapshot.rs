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

//! Host state snapshot model.
//!
//! The host pushes its full state as a JSON object keyed by entity id. The
//! entity the widget is configured for carries an `attributes` record with the
//! observer configuration and two flight arrays (`flights` and
//! `historic_flights`). Every field except the flight position is optional and
//! degrades to a placeholder when absent.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::renderer::Layer;

/// Errors that can occur while decoding a host state snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("invalid host state: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("invalid state for {entity}: {source}")]
    InvalidEntity {
        entity: String,
        source: serde_json::Error,
    },
}

/// The host publishes `null` for absent values; treat it like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One historical sample of a flight's trail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrailPoint {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl TrailPoint {
    /// The point as a coordinate, if both components are present.
    #[must_use]
    pub fn position(&self) -> Option<LatLng> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        }
    }
}

/// Which display layer a flight is grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlightClass {
    /// Currently inside the observer's field of view.
    Visible,
    /// Recently seen, kept by the host for a while.
    Historic,
}

impl FlightClass {
    /// Layer flights of this class are drawn into.
    #[must_use]
    pub const fn layer(self) -> Layer {
        match self {
            Self::Visible => Layer::VisibleFlights,
            Self::Historic => Layer::HistoricFlights,
        }
    }
}

/// A flight record as published by the host sensor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Flight {
    pub flight_id: Option<String>,
    pub callsign: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub heading: Option<f64>,
    /// Most recent history first.
    #[serde(deserialize_with = "null_as_default")]
    pub trail: Vec<TrailPoint>,

    pub airline_name: Option<String>,
    pub flightradar_link: Option<String>,
    pub aircraft_model: Option<String>,
    pub aircraft_type: Option<String>,
    pub aircraft_registration: Option<String>,
    pub altitude_ft: Option<f64>,
    pub ground_speed_kts: Option<f64>,
    pub total_distance_km: Option<f64>,
    pub distance_traveled_km: Option<f64>,
    pub progress_percent: Option<f64>,

    pub origin_latitude: Option<f64>,
    pub origin_longitude: Option<f64>,
    pub origin_airport_name: Option<String>,
    pub origin_airport_code: Option<String>,
    pub origin_city: Option<String>,
    pub origin_country: Option<String>,
    pub origin_country_code: Option<String>,
    pub origin_flag_emoji: Option<String>,

    pub destination_latitude: Option<f64>,
    pub destination_longitude: Option<f64>,
    pub destination_airport_name: Option<String>,
    pub destination_airport_code: Option<String>,
    pub destination_city: Option<String>,
    pub destination_country: Option<String>,
    pub destination_country_code: Option<String>,
    pub destination_flag_emoji: Option<String>,
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

fn coordinate(lat: Option<f64>, lng: Option<f64>) -> Option<LatLng> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
        _ => None,
    }
}

impl Flight {
    /// Stable identity: the explicit flight id, falling back to the callsign.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        non_empty(self.flight_id.as_ref()).or_else(|| non_empty(self.callsign.as_ref()))
    }

    /// Current position, required for rendering.
    #[must_use]
    pub fn position(&self) -> Option<LatLng> {
        coordinate(self.latitude, self.longitude)
    }

    /// Heading in degrees, 0 when unknown.
    #[must_use]
    pub fn heading_deg(&self) -> f64 {
        self.heading.unwrap_or(0.0)
    }

    /// Valid trail coordinates, most recent first.
    pub fn trail_points(&self) -> impl Iterator<Item = LatLng> + '_ {
        self.trail.iter().filter_map(TrailPoint::position)
    }

    /// The oldest trail sample, used as a stand-in origin.
    #[must_use]
    pub fn oldest_trail_point(&self) -> Option<LatLng> {
        self.trail.last().and_then(TrailPoint::position)
    }

    #[must_use]
    pub fn origin(&self) -> Option<LatLng> {
        coordinate(self.origin_latitude, self.origin_longitude)
    }

    #[must_use]
    pub fn destination(&self) -> Option<LatLng> {
        coordinate(self.destination_latitude, self.destination_longitude)
    }
}

/// Observer location and field of view, configured on the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ObserverConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub facing_direction: f64,
    pub fov_cone: f64,
    pub radius_km: f64,
    #[serde(default)]
    pub location_name: Option<String>,
}

impl ObserverConfig {
    #[must_use]
    pub fn position(&self) -> LatLng {
        LatLng::new(self.latitude, self.longitude)
    }
}

/// The attributes of the flights entity for one update.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub config: Option<ObserverConfig>,
    pub flights: Option<Vec<Flight>>,
    pub historic_flights: Option<Vec<Flight>>,
}

impl Snapshot {
    #[must_use]
    pub fn visible(&self) -> &[Flight] {
        self.flights.as_deref().unwrap_or(&[])
    }

    #[must_use]
    pub fn historic(&self) -> &[Flight] {
        self.historic_flights.as_deref().unwrap_or(&[])
    }

    /// All flights, visible first, tagged with their class.
    pub fn all_flights(&self) -> impl Iterator<Item = (FlightClass, &Flight)> {
        self.visible()
            .iter()
            .map(|f| (FlightClass::Visible, f))
            .chain(self.historic().iter().map(|f| (FlightClass::Historic, f)))
    }

    /// Union of ids across both flight arrays.
    #[must_use]
    pub fn flight_ids(&self) -> HashSet<&str> {
        self.all_flights().filter_map(|(_, f)| f.id()).collect()
    }

    /// The first record carrying the given id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Flight> {
        self.all_flights()
            .map(|(_, f)| f)
            .find(|f| f.id() == Some(id))
    }
}

/// State of a single host entity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntityState {
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Snapshot,
}

/// The full host state, keyed by entity id.
///
/// Entities are kept as raw JSON. Only the one the widget follows is decoded,
/// so unrelated entities never fail a push.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct HostState {
    entities: HashMap<String, Value>,
}

impl HostState {
    /// Decode a host state from its JSON form.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode the state of `entity`, or `None` when the host has no such entity.
    pub fn entity(&self, entity: &str) -> Result<Option<EntityState>, SnapshotError> {
        let Some(value) = self.entities.get(entity) else {
            return Ok(None);
        };
        let state = Option::<EntityState>::deserialize(value)
            .map_err(|source| SnapshotError::InvalidEntity {
                entity: entity.to_string(),
                source,
            })?
            .unwrap_or_default();
        Ok(Some(state))
    }

    #[must_use]
    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
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

    const STATE: &str = r#"{
        "sensor.visible_flights": {
            "state": 2,
            "attributes": {
                "config": {
                    "latitude": 51.47, "longitude": -0.45,
                    "facing_direction": 270, "fov_cone": 90, "radius_km": 10,
                    "update_interval": 10
                },
                "flights": [
                    {
                        "flight_id": "3a1f", "callsign": "BAW12",
                        "latitude": 51.5, "longitude": -0.5, "heading": 270,
                        "trail": [{"lat": 51.5, "lng": -0.4}, {"lat": null, "lng": -0.3}, {"lat": 51.5, "lng": -0.2}],
                        "origin_airport_code": "LHR", "destination_latitude": 40.64, "destination_longitude": -73.78
                    },
                    {"callsign": "EZY9", "latitude": 51.6, "longitude": -0.6}
                ],
                "historic_flights": null
            }
        }
    }"#;

    fn snapshot(state: &HostState, entity: &str) -> Snapshot {
        state.entity(entity).unwrap().unwrap().attributes
    }

    #[test]
    fn test_parse_host_state() {
        let state = HostState::from_json(STATE).unwrap();
        let snapshot = snapshot(&state, "sensor.visible_flights");

        assert_eq!(snapshot.visible().len(), 2);
        assert!(snapshot.historic().is_empty());
        let config = snapshot.config.as_ref().unwrap();
        assert_eq!(config.fov_cone, 90.0);
        assert_eq!(config.position(), LatLng::new(51.47, -0.45));
    }

    #[test]
    fn test_flight_id_prefers_flight_id() {
        let state = HostState::from_json(STATE).unwrap();
        let snapshot = snapshot(&state, "sensor.visible_flights");

        assert_eq!(snapshot.visible()[0].id(), Some("3a1f"));
        assert_eq!(snapshot.visible()[1].id(), Some("EZY9"));

        let empty_id = Flight {
            flight_id: Some(String::new()),
            callsign: Some("DLH4".to_string()),
            ..Default::default()
        };
        assert_eq!(empty_id.id(), Some("DLH4"));
        assert_eq!(Flight::default().id(), None);
    }

    #[test]
    fn test_trail_drops_incomplete_points() {
        let state = HostState::from_json(STATE).unwrap();
        let snapshot = snapshot(&state, "sensor.visible_flights");
        let flight = &snapshot.visible()[0];

        let points: Vec<_> = flight.trail_points().collect();
        assert_eq!(points, vec![LatLng::new(51.5, -0.4), LatLng::new(51.5, -0.2)]);
        assert_eq!(flight.oldest_trail_point(), Some(LatLng::new(51.5, -0.2)));
        assert!(flight.origin().is_none());
        assert_eq!(flight.destination(), Some(LatLng::new(40.64, -73.78)));
    }

    #[test]
    fn test_zero_is_a_valid_position() {
        let flight = Flight {
            callsign: Some("NULL0".to_string()),
            latitude: Some(0.0),
            longitude: Some(0.0),
            ..Default::default()
        };
        assert_eq!(flight.position(), Some(LatLng::new(0.0, 0.0)));
        assert_eq!(flight.heading_deg(), 0.0);
    }

    #[test]
    fn test_flight_ids_union() {
        let snapshot = Snapshot {
            flights: Some(vec![Flight { callsign: Some("A".into()), ..Default::default() }]),
            historic_flights: Some(vec![Flight { flight_id: Some("B".into()), ..Default::default() }]),
            ..Default::default()
        };
        let ids = snapshot.flight_ids();
        assert!(ids.contains("A"));
        assert!(ids.contains("B"));
        assert_eq!(snapshot.find("B").and_then(Flight::id), Some("B"));
    }

    #[test]
    fn test_null_trail_is_empty() {
        let state = HostState::from_json(
            r#"{"sensor.f": {"attributes": {"flights": [
                {"flight_id": "A", "latitude": 1.0, "longitude": 2.0, "trail": null, "heading": null},
                {"flight_id": "B", "latitude": 3.0, "longitude": 4.0}
            ]}}}"#,
        )
        .unwrap();
        let snapshot = snapshot(&state, "sensor.f");

        assert_eq!(snapshot.visible().len(), 2);
        assert!(snapshot.visible()[0].trail.is_empty());
        assert_eq!(snapshot.visible()[0].oldest_trail_point(), None);
        assert_eq!(snapshot.find("B").and_then(Flight::position), Some(LatLng::new(3.0, 4.0)));
    }

    #[test]
    fn test_null_attributes_and_entity() {
        let state =
            HostState::from_json(r#"{"sensor.a": {"attributes": null}, "sensor.b": null}"#).unwrap();
        assert_eq!(snapshot(&state, "sensor.a"), Snapshot::default());
        assert_eq!(snapshot(&state, "sensor.b"), Snapshot::default());
        assert!(state.entity("sensor.c").unwrap().is_none());
    }

    #[test]
    fn test_unrelated_entity_does_not_fail_decode() {
        let state = HostState::from_json(
            r#"{
                "sensor.f": {"attributes": {"flights": [{"callsign": "A", "latitude": 1.0, "longitude": 2.0}]}},
                "sensor.other": {"attributes": {"flights": 3, "config": "on"}}
            }"#,
        )
        .unwrap();

        assert_eq!(state.len(), 2);
        assert_eq!(snapshot(&state, "sensor.f").visible().len(), 1);
        assert!(matches!(
            state.entity("sensor.other"),
            Err(SnapshotError::InvalidEntity { ref entity, .. }) if entity == "sensor.other"
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            HostState::from_json("[1, 2"),
            Err(SnapshotError::InvalidJson(_))
        ));
    }
}
