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

//! Selection-driven opacity and stroke weights.
//!
//! A single pure function decides how every map entity looks for a given
//! selection state. Markers, both trail strokes and the non-flight overlays all
//! go through it, so dimming stays consistent across the map.

use crate::selection::SelectionState;

/// Opacity applied to everything that is not the selected flight.
pub const DIMMED_OPACITY: f64 = 0.3;
/// Outline stroke opacity relative to its entity.
pub const OUTLINE_OPACITY_FACTOR: f64 = 0.8;
/// Inline stroke opacity relative to its entity.
pub const INLINE_OPACITY_FACTOR: f64 = 0.9;

pub const BASE_OUTLINE_WEIGHT: f64 = 4.0;
pub const BASE_INLINE_WEIGHT: f64 = 2.0;
pub const EMPHASIS_OUTLINE_WEIGHT: f64 = 6.0;
pub const EMPHASIS_INLINE_WEIGHT: f64 = 4.0;

/// Visual parameters for one flight's marker and trail strokes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParams {
    pub marker_opacity: f64,
    pub outline_opacity: f64,
    pub inline_opacity: f64,
    pub outline_weight: f64,
    pub inline_weight: f64,
}

impl VisualParams {
    fn resting(opacity: f64) -> Self {
        Self {
            marker_opacity: opacity,
            outline_opacity: opacity * OUTLINE_OPACITY_FACTOR,
            inline_opacity: opacity * INLINE_OPACITY_FACTOR,
            outline_weight: BASE_OUTLINE_WEIGHT,
            inline_weight: BASE_INLINE_WEIGHT,
        }
    }

    /// Full emphasis while the pointer is over the flight.
    #[must_use]
    pub const fn hover() -> Self {
        Self {
            marker_opacity: 1.0,
            outline_opacity: 1.0,
            inline_opacity: 1.0,
            outline_weight: EMPHASIS_OUTLINE_WEIGHT,
            inline_weight: EMPHASIS_INLINE_WEIGHT,
        }
    }

    /// Invisible, used while a view animation is running.
    #[must_use]
    pub const fn hidden() -> Self {
        Self {
            marker_opacity: 0.0,
            outline_opacity: 0.0,
            inline_opacity: 0.0,
            outline_weight: BASE_OUTLINE_WEIGHT,
            inline_weight: BASE_INLINE_WEIGHT,
        }
    }
}

/// What is being styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTarget<'a> {
    /// A flight, by id.
    Flight(&'a str),
    /// Observer marker, field of view and other non-flight overlays.
    Overlay,
}

/// The styling policy.
///
/// With no selection everything is fully opaque at baseline weights. With a
/// selection, the selected flight is opaque with emphasized weights and
/// everything else, overlays included, is dimmed.
#[must_use]
pub fn visual_params(selection: &SelectionState, target: StyleTarget<'_>) -> VisualParams {
    match (selection.selected_id(), target) {
        (None, _) => VisualParams::resting(1.0),
        (Some(selected), StyleTarget::Flight(id)) if selected == id => VisualParams {
            outline_weight: EMPHASIS_OUTLINE_WEIGHT,
            inline_weight: EMPHASIS_INLINE_WEIGHT,
            ..VisualParams::resting(1.0)
        },
        (Some(_), _) => VisualParams::resting(DIMMED_OPACITY),
    }
}

/// Shorthand for styling a flight.
#[must_use]
pub fn flight_params(selection: &SelectionState, id: &str) -> VisualParams {
    visual_params(selection, StyleTarget::Flight(id))
}

/// Opacity of the non-flight overlays.
#[must_use]
pub fn overlay_opacity(selection: &SelectionState) -> f64 {
    visual_params(selection, StyleTarget::Overlay).marker_opacity
}
