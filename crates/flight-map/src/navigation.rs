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

//! View targets for the flight navigation controls.

use std::time::Duration;

use crate::renderer::{FitOptions, MapRenderer};
use crate::snapshot::{Flight, LatLng};

/// Duration of every animated view change.
pub const FLY_DURATION: Duration = Duration::from_millis(500);

pub const FLIGHT_ZOOM: f64 = 10.0;
pub const AIRPORT_ZOOM: f64 = 12.0;
pub const ROUTE_MAX_ZOOM: f64 = 13.0;
pub const HOME_ZOOM: f64 = 11.0;
pub const ROUTE_PADDING: f64 = 50.0;

/// Camera moves offered for the selected flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCommand {
    RecenterOnFlight,
    ZoomToOrigin,
    ZoomToDestination,
    ZoomToRoute,
}

/// Where the view should go.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewTarget {
    Center { center: LatLng, zoom: f64 },
    Bounds { points: Vec<LatLng>, options: FitOptions },
}

impl ViewTarget {
    /// Issue the animated move on `renderer`.
    pub fn apply<R: MapRenderer + ?Sized>(&self, renderer: &mut R) {
        match self {
            Self::Center { center, zoom } => renderer.fly_to(*center, *zoom, FLY_DURATION),
            Self::Bounds { points, options } => renderer.fly_to_bounds(points, *options),
        }
    }
}

/// Origin coordinates, or the oldest trail sample when the origin is unknown.
#[must_use]
pub fn origin_or_first_seen(flight: &Flight) -> Option<LatLng> {
    flight.origin().or_else(|| flight.oldest_trail_point())
}

/// The points framed by "zoom to route": current position, origin (or first
/// seen position) and the whole trail.
#[must_use]
pub fn route_points(flight: &Flight) -> Vec<LatLng> {
    flight
        .position()
        .into_iter()
        .chain(origin_or_first_seen(flight))
        .chain(flight.trail_points())
        .collect()
}

/// Target for `command`, or `None` when the flight lacks the coordinates.
#[must_use]
pub fn target_for(command: NavigationCommand, flight: &Flight) -> Option<ViewTarget> {
    let center = |center: LatLng, zoom: f64| ViewTarget::Center { center, zoom };

    match command {
        NavigationCommand::RecenterOnFlight => flight.position().map(|p| center(p, FLIGHT_ZOOM)),
        NavigationCommand::ZoomToOrigin => {
            origin_or_first_seen(flight).map(|p| center(p, AIRPORT_ZOOM))
        }
        NavigationCommand::ZoomToDestination => {
            flight.destination().map(|p| center(p, AIRPORT_ZOOM))
        }
        NavigationCommand::ZoomToRoute => {
            let points = route_points(flight);
            match points.as_slice() {
                [] => None,
                [only] => Some(center(*only, FLIGHT_ZOOM)),
                _ => Some(ViewTarget::Bounds {
                    points,
                    options: FitOptions {
                        padding: ROUTE_PADDING,
                        max_zoom: ROUTE_MAX_ZOOM,
                        duration: FLY_DURATION,
                    },
                }),
            }
        }
    }
}

/// Target for the home control.
#[must_use]
pub fn home_target(home: LatLng) -> ViewTarget {
    ViewTarget::Center {
        center: home,
        zoom: HOME_ZOOM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Scene, ViewCommand};
    use crate::snapshot::TrailPoint;

    fn flight() -> Flight {
        Flight {
            callsign: Some("BAW12".to_string()),
            latitude: Some(51.0),
            longitude: Some(-1.0),
            trail: vec![
                TrailPoint { lat: Some(51.1), lng: Some(-1.1) },
                TrailPoint { lat: Some(51.2), lng: Some(-1.2) },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_recenter_on_flight() {
        assert_eq!(
            target_for(NavigationCommand::RecenterOnFlight, &flight()),
            Some(ViewTarget::Center {
                center: LatLng::new(51.0, -1.0),
                zoom: 10.0
            })
        );
    }

    #[test]
    fn test_origin_falls_back_to_oldest_trail_point() {
        let mut f = flight();
        assert_eq!(
            target_for(NavigationCommand::ZoomToOrigin, &f),
            Some(ViewTarget::Center {
                center: LatLng::new(51.2, -1.2),
                zoom: 12.0
            })
        );

        f.origin_latitude = Some(40.0);
        f.origin_longitude = Some(-70.0);
        assert_eq!(
            target_for(NavigationCommand::ZoomToOrigin, &f),
            Some(ViewTarget::Center {
                center: LatLng::new(40.0, -70.0),
                zoom: 12.0
            })
        );
    }

    #[test]
    fn test_destination_requires_coordinates() {
        let mut f = flight();
        assert_eq!(target_for(NavigationCommand::ZoomToDestination, &f), None);

        f.destination_latitude = Some(0.0);
        f.destination_longitude = Some(0.0);
        assert!(target_for(NavigationCommand::ZoomToDestination, &f).is_some());
    }

    #[test]
    fn test_route_frames_all_points() {
        let Some(ViewTarget::Bounds { points, options }) =
            target_for(NavigationCommand::ZoomToRoute, &flight())
        else {
            panic!("expected bounds");
        };
        assert_eq!(
            points,
            vec![
                LatLng::new(51.0, -1.0),
                LatLng::new(51.2, -1.2),
                LatLng::new(51.1, -1.1),
                LatLng::new(51.2, -1.2),
            ]
        );
        assert_eq!(options.padding, 50.0);
        assert_eq!(options.max_zoom, 13.0);
        assert_eq!(options.duration, FLY_DURATION);
    }

    #[test]
    fn test_route_single_point_flies() {
        let f = Flight {
            callsign: Some("SOLO".to_string()),
            latitude: Some(1.0),
            longitude: Some(2.0),
            ..Default::default()
        };
        assert_eq!(
            target_for(NavigationCommand::ZoomToRoute, &f),
            Some(ViewTarget::Center {
                center: LatLng::new(1.0, 2.0),
                zoom: 10.0
            })
        );
        assert_eq!(target_for(NavigationCommand::ZoomToRoute, &Flight::default()), None);
    }

    #[test]
    fn test_apply_queues_animation() {
        let mut scene = Scene::new();
        home_target(LatLng::new(5.0, 6.0)).apply(&mut scene);
        assert_eq!(
            scene.take_view_commands(),
            vec![ViewCommand::FlyTo {
                center: LatLng::new(5.0, 6.0),
                zoom: 11.0,
                duration: FLY_DURATION
            }]
        );
    }
}
