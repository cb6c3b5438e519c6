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

//! Per-flight color assignment.
//!
//! Colors are produced by stepping a hue around the color wheel by the golden
//! ratio conjugate, which keeps consecutive colors far apart no matter how many
//! are requested. A color, once assigned to a flight id, never changes for the
//! lifetime of the assigner.

use std::collections::HashMap;

use log::debug;

/// Hue step between consecutive assignments.
pub const GOLDEN_RATIO_CONJUGATE: f64 = 0.618_033_988_75;

const SATURATION: f64 = 0.8;
const LIGHTNESS: f64 = 0.5;

/// Hands out a stable, well separated color per flight id.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    seed: f64,
    hue: f64,
    cache: HashMap<String, String>,
    hues: Vec<f64>,
}

impl Default for ColorAssigner {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorAssigner {
    /// Create an assigner seeded with a random starting hue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::random::<f64>())
    }

    /// Create an assigner with a fixed starting hue, wrapped into `[0, 1)`.
    #[must_use]
    pub fn with_seed(seed: f64) -> Self {
        let seed = seed.rem_euclid(1.0);
        Self {
            seed,
            hue: seed,
            cache: HashMap::new(),
            hues: Vec::new(),
        }
    }

    /// Color for a flight id, assigning the next one in sequence on first use.
    pub fn color_for(&mut self, id: &str) -> String {
        if let Some(color) = self.cache.get(id) {
            return color.clone();
        }

        self.hue = (self.hue + GOLDEN_RATIO_CONJUGATE) % 1.0;
        self.hues.push(self.hue);
        let (r, g, b) = hsl_to_rgb(self.hue, SATURATION, LIGHTNESS);
        let color = rgb_to_hex(r, g, b);
        debug!("Assigned color {color} to flight {id}");
        self.cache.insert(id.to_string(), color.clone());
        color
    }

    /// Previously assigned color, without assigning a new one.
    #[must_use]
    pub fn cached(&self, id: &str) -> Option<&str> {
        self.cache.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn seed(&self) -> f64 {
        self.seed
    }

    /// Hues handed out so far, in assignment order.
    #[must_use]
    pub fn hue_history(&self) -> &[f64] {
        &self.hues
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let mut t = t;
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 1.0 / 2.0 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "channel is clamped to 0..=255 before the cast"
)]
fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert HSL components (all in `[0, 1]`) to 8-bit RGB.
#[must_use]
pub fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    if s == 0.0 {
        let v = to_byte(l);
        return (v, v, v);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    (
        to_byte(hue_to_channel(p, q, h + 1.0 / 3.0)),
        to_byte(hue_to_channel(p, q, h)),
        to_byte(hue_to_channel(p, q, h - 1.0 / 3.0)),
    )
}

/// Format as a lowercase `#rrggbb` string.
#[must_use]
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Parse a `#rrggbb` string back into its channels.
#[must_use]
pub fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_is_stable_per_id() {
        let mut colors = ColorAssigner::with_seed(0.25);
        let first = colors.color_for("BAW12");
        for _ in 0..10 {
            assert_eq!(colors.color_for("BAW12"), first);
        }
        assert_eq!(colors.len(), 1);
        assert_eq!(colors.cached("BAW12"), Some(first.as_str()));
    }

    #[test]
    fn test_hue_advances_only_on_new_ids() {
        let seed = 0.1;
        let mut colors = ColorAssigner::with_seed(seed);
        colors.color_for("A");
        colors.color_for("A");
        colors.color_for("B");
        colors.color_for("A");
        colors.color_for("C");

        let hues = colors.hue_history();
        assert_eq!(hues.len(), 3);
        let mut expected = seed;
        for hue in hues {
            expected = (expected + GOLDEN_RATIO_CONJUGATE) % 1.0;
            assert!((hue - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_distinct_ids_get_distinct_colors() {
        let mut colors = ColorAssigner::with_seed(0.5);
        let a = colors.color_for("A");
        let b = colors.color_for("B");
        assert_ne!(a, b);
    }

    #[test]
    fn test_random_seed_in_range() {
        let colors = ColorAssigner::new();
        assert!((0.0..1.0).contains(&colors.seed()));
        assert!(colors.is_empty());
    }

    #[test]
    fn test_seed_wraps() {
        assert!((ColorAssigner::with_seed(1.25).seed() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(0.5, 0.0, 0.5), (128, 128, 128));
    }

    #[test]
    fn test_hex_formatting() {
        assert_eq!(rgb_to_hex(255, 0, 10), "#ff000a");
        assert_eq!(parse_hex("#3cb44b"), Some((0x3c, 0xb4, 0x4b)));
        assert_eq!(parse_hex("3cb44b"), None);
        assert_eq!(parse_hex("#3cb4"), None);
    }

    #[test]
    fn test_assigned_colors_are_hex() {
        let mut colors = ColorAssigner::with_seed(0.0);
        for id in ["A", "B", "C", "D"] {
            let color = colors.color_for(id);
            assert_eq!(color.len(), 7);
            assert!(parse_hex(&color).is_some());
            assert_eq!(color, color.to_lowercase());
        }
    }
}
