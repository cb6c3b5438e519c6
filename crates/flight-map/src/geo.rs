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

//! Spherical geometry for the observer's field of view.

use crate::snapshot::LatLng;

/// Mean Earth radius used by every calculation here.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MAX_APERTURE_DEGREES: f64 = 360.0;

/// Point reached by travelling `distance_km` from `origin` along `bearing_deg`.
#[must_use]
pub fn destination_point(origin: LatLng, bearing_deg: f64, distance_km: f64) -> LatLng {
    let angular = distance_km / EARTH_RADIUS_KM;
    let bearing = bearing_deg.to_radians();
    let lat1 = origin.lat.to_radians();
    let lon1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    LatLng::new(lat2.to_degrees(), lon2.to_degrees())
}

/// Closed sector polygon for an observer's field of view.
///
/// The arc is sampled once per degree from `-fov/2` to `+fov/2` around
/// `facing_deg`, and the sequence starts and ends at the observer, so an
/// aperture of 90 degrees yields 93 points. Apertures wider than a full turn
/// are treated as 360; a negative or non-finite aperture yields a degenerate
/// polygon of just the observer twice.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    reason = "step count is bounded by the 360 degree clamp"
)]
pub fn fov_polygon(
    lat: f64,
    lon: f64,
    facing_deg: f64,
    fov_deg: f64,
    radius_km: f64,
) -> Vec<LatLng> {
    let center = LatLng::new(lat, lon);
    let mut points = vec![center];

    if fov_deg.is_finite() && fov_deg >= 0.0 {
        let fov = fov_deg.min(MAX_APERTURE_DEGREES);
        let half = fov / 2.0;
        let steps = fov.floor() as usize;
        points.reserve(steps + 2);
        for k in 0..=steps {
            let offset = -half + k as f64;
            let bearing = (facing_deg + offset + 360.0) % 360.0;
            points.push(destination_point(center, bearing, radius_km));
        }
    }

    points.push(center);
    points
}

/// Initial great-circle bearing from `from` to `to`, in `[0, 360)`.
#[must_use]
pub fn initial_bearing(from: LatLng, to: LatLng) -> f64 {
    let delta_lon = (to.lng - from.lng).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();
    (x.atan2(y).to_degrees() + 360.0) % 360.0
}

/// Whether `bearing_deg` falls inside the aperture centred on `facing_deg`.
#[must_use]
pub fn is_within_fov(bearing_deg: f64, facing_deg: f64, fov_deg: f64) -> bool {
    if fov_deg >= MAX_APERTURE_DEGREES {
        return true;
    }
    let half = fov_deg / 2.0;
    let lower = (facing_deg - half).rem_euclid(360.0);
    let upper = (facing_deg + half).rem_euclid(360.0);
    let bearing = bearing_deg.rem_euclid(360.0);

    if lower < upper {
        (lower..=upper).contains(&bearing)
    } else {
        bearing >= lower || bearing <= upper
    }
}

/// Great-circle distance in kilometres.
#[must_use]
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
