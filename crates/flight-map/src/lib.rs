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

//! Flight rendering and synchronization engine for live aircraft maps.
//!
//! This library turns periodically pushed flight snapshots into stable,
//! colored and styled map primitives, drives a single-selection model with
//! dimming and an information panel, and draws the observer's field of view.
//! It never draws pixels itself; a host implements [`MapRenderer`] and reports
//! pointer activity back as [`MapEvent`]s.
//!
//! - **Model**: host state and flight records ([`snapshot`])
//! - **Engine**: colors, styling, selection and reconciliation ([`color`],
//!   [`style`], [`selection`], [`reconciler`]) plus field of view geometry ([`geo`])
//! - **Widget**: lifecycle, navigation, info panel and layer preferences
//!   ([`widget`], [`navigation`], [`panel`], [`prefs`])
//! - **Plumbing**: coalescing redraws and an async file feed ([`scheduler`], [`feed`])
//!
//! # Quick Start
//!
//! ```
//! use flight_map::{CardConfig, ColorAssigner, HostState, MapWidget, MemoryStore, Scene};
//!
//! let mut widget = MapWidget::new(
//!     CardConfig::for_entity("sensor.whats_that_plane"),
//!     MemoryStore::new(),
//!     ColorAssigner::new(),
//! );
//! widget.attach(Ok::<_, String>(Scene::new())).unwrap();
//!
//! let state = HostState::from_json(r#"{
//!     "sensor.whats_that_plane": {"attributes": {
//!         "flights": [{"callsign": "BAW12", "latitude": 51.5, "longitude": -0.4}]
//!     }}
//! }"#).unwrap();
//! widget.push_state(state);
//!
//! // Once per paint frame:
//! if let Some(Ok(outcome)) = widget.on_frame() {
//!     println!("Drew {} flights", outcome.drawn);
//! }
//! ```
//!
//! # Field of View Only
//!
//! ```
//! use flight_map::geo::fov_polygon;
//!
//! let sector = fov_polygon(51.47, -0.45, 270.0, 90.0, 10.0);
//! assert_eq!(sector.len(), 93);
//! ```

pub mod color;
pub mod feed;
pub mod geo;
pub mod navigation;
pub mod panel;
pub mod prefs;
pub mod reconciler;
pub mod renderer;
pub mod scene;
pub mod scheduler;
pub mod selection;
pub mod snapshot;
pub mod style;
pub mod widget;

pub use color::ColorAssigner;
pub use feed::{FeedConfig, FeedEvent, SnapshotFeed};
pub use navigation::{NavigationCommand, ViewTarget};
pub use panel::InfoPanel;
pub use prefs::{KeyValueStore, LayerPreferences, MemoryStore, PreferencesError};
pub use reconciler::{FlightStateReconciler, ReconcileOutcome, RenderedEntity};
pub use renderer::{Layer, MapEvent, MapRenderer, PrimitiveId};
pub use scene::{Scene, ViewCommand};
pub use scheduler::RedrawScheduler;
pub use selection::{SelectionChange, SelectionController, SelectionState};
pub use snapshot::{Flight, FlightClass, HostState, LatLng, ObserverConfig, Snapshot, SnapshotError};
pub use style::VisualParams;
pub use widget::{CardConfig, MapWidget, WidgetError, WidgetStatus};
