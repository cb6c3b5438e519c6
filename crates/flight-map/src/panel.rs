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

//! Flight information panel and route markers.
//!
//! [`InfoPanel`] is the text shown for the selected flight, with every missing
//! field replaced by a placeholder. The origin and destination pins are drawn
//! into their own overlay so the user can toggle them.

use crate::geo::{haversine_km, initial_bearing, is_within_fov};
use crate::renderer::{EventKind, Layer, MapRenderer, MarkerIcon, MarkerSpec, PrimitiveId};
use crate::snapshot::{Flight, ObserverConfig};

/// Shown in place of any missing value.
pub const PLACEHOLDER: &str = "None";

pub const ORIGIN_COLOR: &str = "#3CB44B";
pub const DESTINATION_COLOR: &str = "#4363D8";

/// Regional indicator flag for a two-letter country code.
#[must_use]
pub fn flag_emoji(country_code: &str) -> Option<String> {
    if country_code.len() != 2 || !country_code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    country_code
        .chars()
        .map(|c| char::from_u32(0x1F1E6 + u32::from(c.to_ascii_uppercase()) - u32::from('A')))
        .collect()
}

fn or_placeholder(value: Option<&String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map_or_else(|| PLACEHOLDER.to_string(), Clone::clone)
}

/// "From" or "To" line of the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceLine {
    /// Flag emoji, empty when unknown.
    pub flag: String,
    pub city: String,
    pub country: String,
}

impl PlaceLine {
    fn new(flag: Option<&String>, code: Option<&String>, city: Option<&String>, country: Option<&String>) -> Self {
        let flag = flag
            .filter(|f| !f.is_empty())
            .cloned()
            .or_else(|| code.and_then(|c| flag_emoji(c)))
            .unwrap_or_default();
        Self {
            flag,
            city: or_placeholder(city),
            country: or_placeholder(country),
        }
    }

    /// `City, Country`.
    #[must_use]
    pub fn details(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

/// Where the flight is relative to the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserverRelation {
    pub distance_km: f64,
    pub bearing_deg: f64,
    pub in_fov: bool,
}

/// Presentation model of the selected flight.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoPanel {
    pub flight_id: String,
    pub airline: String,
    pub callsign: String,
    /// External tracking link. The callsign is only shown when this is set.
    pub link: Option<String>,
    pub origin_code: String,
    pub destination_code: String,
    pub origin: PlaceLine,
    pub destination: PlaceLine,
    /// Extra labelled values, only those the host supplied.
    pub details: Vec<(&'static str, String)>,
    pub observer: Option<ObserverRelation>,
}

impl InfoPanel {
    /// Build the panel for `flight`, optionally relating it to the observer.
    #[must_use]
    pub fn from_flight(flight: &Flight, observer: Option<&ObserverConfig>) -> Self {
        let mut details = Vec::new();
        if let Some(model) = flight.aircraft_model.as_ref().filter(|m| !m.is_empty()) {
            match flight.aircraft_type.as_ref().filter(|t| !t.is_empty()) {
                Some(code) => details.push(("Aircraft", format!("{model} ({code})"))),
                None => details.push(("Aircraft", model.clone())),
            }
        }
        if let Some(registration) = flight.aircraft_registration.as_ref().filter(|r| !r.is_empty()) {
            details.push(("Registration", registration.clone()));
        }
        if let Some(altitude) = flight.altitude_ft {
            details.push(("Altitude", format!("{altitude:.0} ft")));
        }
        if let Some(speed) = flight.ground_speed_kts {
            details.push(("Speed", format!("{speed:.0} kts")));
        }
        if let Some(progress) = flight.progress_percent {
            details.push(("Progress", format!("{progress:.0}%")));
        }

        let observer = observer.zip(flight.position()).map(|(config, position)| {
            let bearing_deg = initial_bearing(config.position(), position);
            ObserverRelation {
                distance_km: haversine_km(config.position(), position),
                bearing_deg,
                in_fov: is_within_fov(bearing_deg, config.facing_direction, config.fov_cone),
            }
        });

        Self {
            flight_id: flight.id().unwrap_or(PLACEHOLDER).to_string(),
            airline: or_placeholder(flight.airline_name.as_ref()),
            callsign: or_placeholder(flight.callsign.as_ref()),
            link: flight.flightradar_link.clone().filter(|l| !l.is_empty()),
            origin_code: or_placeholder(flight.origin_airport_code.as_ref()),
            destination_code: or_placeholder(flight.destination_airport_code.as_ref()),
            origin: PlaceLine::new(
                flight.origin_flag_emoji.as_ref(),
                flight.origin_country_code.as_ref(),
                flight.origin_city.as_ref(),
                flight.origin_country.as_ref(),
            ),
            destination: PlaceLine::new(
                flight.destination_flag_emoji.as_ref(),
                flight.destination_country_code.as_ref(),
                flight.destination_city.as_ref(),
                flight.destination_country.as_ref(),
            ),
            details,
            observer,
        }
    }

    /// `(ORG → DST)`.
    #[must_use]
    pub fn route(&self) -> String {
        format!("({} → {})", self.origin_code, self.destination_code)
    }

    /// Header line: airline, callsign when linked, and route.
    #[must_use]
    pub fn title(&self) -> String {
        match self.link {
            Some(_) => format!("{} {} {}", self.airline, self.callsign, self.route()),
            None => format!("{} {}", self.airline, self.route()),
        }
    }
}

/// Origin and destination pins for `flight`.
///
/// Without origin coordinates the oldest trail sample is pinned instead as
/// the first tracked location.
#[must_use]
pub fn airport_markers(flight: &Flight) -> Vec<MarkerSpec> {
    let pin = |position, color: &str, popup: String| MarkerSpec {
        position,
        icon: MarkerIcon::Airport {
            color: color.to_string(),
        },
        opacity: 1.0,
        popup: Some(popup),
    };
    let name = |value: Option<&String>| {
        value
            .filter(|v| !v.is_empty())
            .map_or_else(|| "Unknown".to_string(), Clone::clone)
    };

    let mut markers = Vec::new();
    if let Some(origin) = flight.origin() {
        markers.push(pin(
            origin,
            ORIGIN_COLOR,
            format!("Origin: {}", name(flight.origin_airport_name.as_ref())),
        ));
    } else if let Some(first_seen) = flight.oldest_trail_point() {
        markers.push(pin(first_seen, ORIGIN_COLOR, "First Tracked Location".to_string()));
    }
    if let Some(destination) = flight.destination() {
        markers.push(pin(
            destination,
            DESTINATION_COLOR,
            format!("Destination: {}", name(flight.destination_airport_name.as_ref())),
        ));
    }
    markers
}

/// Replace the route pins with those of `flight`.
pub fn draw_airport_markers<R: MapRenderer + ?Sized>(
    flight: &Flight,
    renderer: &mut R,
) -> Vec<PrimitiveId> {
    renderer.clear_layer(Layer::Airports);
    airport_markers(flight)
        .into_iter()
        .map(|spec| {
            let pin = renderer.create_marker(Layer::Airports, spec);
            for event in EventKind::ALL {
                renderer.on(pin, event);
            }
            pin
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Scene;
    use crate::snapshot::{LatLng, TrailPoint};

    fn full_flight() -> Flight {
        Flight {
            flight_id: Some("3a1f".to_string()),
            callsign: Some("BAW117".to_string()),
            flightradar_link: Some("https://www.flightradar24.com/BAW117/3a1f".to_string()),
            airline_name: Some("British Airways".to_string()),
            latitude: Some(51.5),
            longitude: Some(-0.6),
            origin_airport_code: Some("LHR".to_string()),
            origin_airport_name: Some("London Heathrow".to_string()),
            origin_city: Some("London".to_string()),
            origin_country: Some("United Kingdom".to_string()),
            origin_country_code: Some("GB".to_string()),
            origin_latitude: Some(51.47),
            origin_longitude: Some(-0.45),
            destination_airport_code: Some("JFK".to_string()),
            destination_city: Some("New York".to_string()),
            destination_country: Some("United States".to_string()),
            destination_flag_emoji: Some("🇺🇸".to_string()),
            destination_latitude: Some(40.64),
            destination_longitude: Some(-73.78),
            aircraft_model: Some("Boeing 777-336(ER)".to_string()),
            aircraft_type: Some("B77W".to_string()),
            altitude_ft: Some(12_000.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_panel_from_full_flight() {
        let panel = InfoPanel::from_flight(&full_flight(), None);
        assert_eq!(panel.airline, "British Airways");
        assert_eq!(panel.route(), "(LHR → JFK)");
        assert_eq!(panel.title(), "British Airways BAW117 (LHR → JFK)");
        assert_eq!(panel.origin.flag, "🇬🇧");
        assert_eq!(panel.origin.details(), "London, United Kingdom");
        assert_eq!(panel.destination.flag, "🇺🇸");
        assert_eq!(
            panel.details,
            vec![
                ("Aircraft", "Boeing 777-336(ER) (B77W)".to_string()),
                ("Altitude", "12000 ft".to_string()),
            ]
        );
        assert!(panel.observer.is_none());
    }

    #[test]
    fn test_panel_placeholders() {
        let flight = Flight {
            callsign: Some("N123AB".to_string()),
            latitude: Some(1.0),
            longitude: Some(1.0),
            ..Default::default()
        };
        let panel = InfoPanel::from_flight(&flight, None);
        assert_eq!(panel.airline, "None");
        assert_eq!(panel.route(), "(None → None)");
        assert_eq!(panel.origin.details(), "None, None");
        assert_eq!(panel.origin.flag, "");
        assert_eq!(panel.link, None);
        assert_eq!(panel.title(), "None (None → None)");
        assert!(panel.details.is_empty());
    }

    #[test]
    fn test_panel_observer_relation() {
        let observer = ObserverConfig {
            latitude: 51.47,
            longitude: -0.45,
            facing_direction: 270.0,
            fov_cone: 90.0,
            radius_km: 20.0,
            location_name: None,
        };
        let panel = InfoPanel::from_flight(&full_flight(), Some(&observer));
        let relation = panel.observer.unwrap();
        assert!(relation.distance_km > 5.0 && relation.distance_km < 20.0);
        assert!(relation.in_fov);
    }

    #[test]
    fn test_flag_emoji() {
        assert_eq!(flag_emoji("gb").as_deref(), Some("🇬🇧"));
        assert_eq!(flag_emoji("GBR"), None);
        assert_eq!(flag_emoji("1A"), None);
    }

    #[test]
    fn test_airport_markers_with_origin() {
        let markers = airport_markers(&full_flight());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].popup.as_deref(), Some("Origin: London Heathrow"));
        assert_eq!(
            markers[0].icon,
            MarkerIcon::Airport {
                color: ORIGIN_COLOR.to_string()
            }
        );
        assert_eq!(markers[1].popup.as_deref(), Some("Destination: Unknown"));
        assert_eq!(markers[1].position, LatLng::new(40.64, -73.78));
    }

    #[test]
    fn test_airport_markers_first_tracked_fallback() {
        let flight = Flight {
            callsign: Some("X".to_string()),
            trail: vec![
                TrailPoint { lat: Some(2.0), lng: Some(2.0) },
                TrailPoint { lat: Some(3.0), lng: Some(3.0) },
            ],
            ..Default::default()
        };
        let markers = airport_markers(&flight);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].position, LatLng::new(3.0, 3.0));
        assert_eq!(markers[0].popup.as_deref(), Some("First Tracked Location"));
    }

    #[test]
    fn test_draw_airport_markers_replaces_previous() {
        let mut scene = Scene::new();
        draw_airport_markers(&full_flight(), &mut scene);
        let ids = draw_airport_markers(&full_flight(), &mut scene);
        assert_eq!(ids.len(), 2);
        assert_eq!(scene.in_layer(Layer::Airports).count(), 2);
        for id in ids {
            let pin = scene.get(id).unwrap();
            assert!(pin.listens_to(EventKind::HoverIn));
            assert!(pin.listens_to(EventKind::HoverOut));
        }
    }
}
