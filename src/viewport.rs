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

//! Map view state: Web Mercator projection, panning, zooming and animated
//! flights between views.

use std::time::Duration;

use flight_map::renderer::FitOptions;
use flight_map::{LatLng, ViewCommand};

const TILE_SIZE: f64 = 256.0;
const MAX_LATITUDE: f64 = 85.051_128;

pub const MIN_ZOOM: f64 = 2.0;
pub const MAX_ZOOM: f64 = 18.0;

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Project to world pixel coordinates at a (fractional) zoom level
    #[must_use]
    pub fn project(point: LatLng, zoom: f64) -> (f64, f64) {
        let scale = TILE_SIZE * zoom.exp2();
        let lat_rad = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let x = (point.lng + 180.0) / 360.0;
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        (x * scale, y * scale)
    }

    /// Convert world pixel coordinates back to latitude/longitude
    #[must_use]
    pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLng {
        let scale = TILE_SIZE * zoom.exp2();
        let lng = x / scale * 360.0 - 180.0;
        let lat = (std::f64::consts::PI * (1.0 - 2.0 * y / scale))
            .sinh()
            .atan()
            .to_degrees();
        LatLng::new(lat, lng)
    }
}

#[derive(Debug, Clone, Copy)]
struct Animation {
    from_center: LatLng,
    from_zoom: f64,
    to_center: LatLng,
    to_zoom: f64,
    elapsed: Duration,
    duration: Duration,
}

impl Animation {
    fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}

/// The visible window onto the map.
#[derive(Debug, Clone)]
pub struct Viewport {
    center: LatLng,
    zoom: f64,
    width: f64,
    height: f64,
    animation: Option<Animation>,
}

impl Viewport {
    #[must_use]
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            width: 0.0,
            height: 0.0,
            animation: None,
        }
    }

    #[must_use]
    pub fn center(&self) -> LatLng {
        self.center
    }

    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Update the drawing surface size. Returns `true` if it changed.
    pub fn set_size(&mut self, width: f64, height: f64) -> bool {
        let changed = (self.width - width).abs() > f64::EPSILON
            || (self.height - height).abs() > f64::EPSILON;
        self.width = width;
        self.height = height;
        changed
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Screen offset of `point` from the top-left corner of the view
    #[must_use]
    pub fn to_screen(&self, point: LatLng) -> (f64, f64) {
        let (cx, cy) = WebMercator::project(self.center, self.zoom);
        let (x, y) = WebMercator::project(point, self.zoom);
        (x - cx + self.width / 2.0, y - cy + self.height / 2.0)
    }

    #[must_use]
    pub fn from_screen(&self, x: f64, y: f64) -> LatLng {
        let (cx, cy) = WebMercator::project(self.center, self.zoom);
        WebMercator::unproject(
            cx + x - self.width / 2.0,
            cy + y - self.height / 2.0,
            self.zoom,
        )
    }

    /// Move the map by a pixel drag. Cancels any running animation.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.animation = None;
        let center = self.from_screen(self.width / 2.0 - dx, self.height / 2.0 - dy);
        self.center = clamp_center(center);
    }

    /// Zoom by `delta` levels keeping the screen point `(x, y)` fixed.
    pub fn zoom_about(&mut self, delta: f64, x: f64, y: f64) {
        self.animation = None;
        let anchor = self.from_screen(x, y);
        self.zoom = (self.zoom + delta).clamp(MIN_ZOOM, MAX_ZOOM);

        let (ax, ay) = WebMercator::project(anchor, self.zoom);
        let center = WebMercator::unproject(
            ax - (x - self.width / 2.0),
            ay - (y - self.height / 2.0),
            self.zoom,
        );
        self.center = clamp_center(center);
    }

    pub fn set_view(&mut self, center: LatLng, zoom: f64) {
        self.animation = None;
        self.center = clamp_center(center);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Animate to a view. A new flight replaces one in progress.
    pub fn fly_to(&mut self, center: LatLng, zoom: f64, duration: Duration) {
        let to_center = clamp_center(center);
        let to_zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if duration.is_zero() {
            self.set_view(to_center, to_zoom);
            return;
        }
        self.animation = Some(Animation {
            from_center: self.center,
            from_zoom: self.zoom,
            to_center,
            to_zoom,
            elapsed: Duration::ZERO,
            duration,
        });
    }

    /// Animate to the view that frames every point.
    pub fn fit_bounds(&mut self, points: &[LatLng], options: FitOptions) {
        let Some((center, zoom)) = self.bounds_view(points, options) else {
            return;
        };
        self.fly_to(center, zoom, options.duration);
    }

    /// Center and zoom that frame `points` within the padded view.
    #[must_use]
    pub fn bounds_view(&self, points: &[LatLng], options: FitOptions) -> Option<(LatLng, f64)> {
        let first = points.first()?;
        let (mut min_x, mut min_y) = WebMercator::project(*first, 0.0);
        let (mut max_x, mut max_y) = (min_x, min_y);
        for point in &points[1..] {
            let (x, y) = WebMercator::project(*point, 0.0);
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        let span_x = max_x - min_x;
        let span_y = max_y - min_y;
        let avail_x = (self.width - 2.0 * options.padding).max(1.0);
        let avail_y = (self.height - 2.0 * options.padding).max(1.0);

        let zoom = if span_x <= f64::EPSILON && span_y <= f64::EPSILON {
            options.max_zoom
        } else {
            let scale_x = if span_x > f64::EPSILON { avail_x / span_x } else { f64::INFINITY };
            let scale_y = if span_y > f64::EPSILON { avail_y / span_y } else { f64::INFINITY };
            scale_x.min(scale_y).log2().min(options.max_zoom)
        };

        let center = WebMercator::unproject((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, 0.0);
        Some((center, zoom.clamp(MIN_ZOOM, MAX_ZOOM)))
    }

    /// Execute a view command queued by the map engine.
    pub fn apply(&mut self, command: &ViewCommand) {
        match command {
            ViewCommand::Set { center, zoom } => self.set_view(*center, *zoom),
            ViewCommand::FlyTo {
                center,
                zoom,
                duration,
            } => self.fly_to(*center, *zoom, *duration),
            ViewCommand::FitBounds { points, options } => self.fit_bounds(points, *options),
        }
    }

    /// Advance a running animation. Returns `true` on the step that lands it.
    pub fn advance(&mut self, dt: Duration) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        animation.elapsed += dt;
        let t = ease_in_out(animation.progress());

        self.zoom = animation.from_zoom + (animation.to_zoom - animation.from_zoom) * t;
        self.center = LatLng::new(
            animation.from_center.lat + (animation.to_center.lat - animation.from_center.lat) * t,
            animation.from_center.lng + (animation.to_center.lng - animation.from_center.lng) * t,
        );

        if animation.progress() >= 1.0 {
            self.center = animation.to_center;
            self.zoom = animation.to_zoom;
            self.animation = None;
            return true;
        }
        false
    }
}

fn clamp_center(center: LatLng) -> LatLng {
    let lng = if (-180.0..=180.0).contains(&center.lng) {
        center.lng
    } else {
        (center.lng + 180.0).rem_euclid(360.0) - 180.0
    };
    LatLng::new(center.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE), lng)
}

fn ease_in_out(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}
