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

//! Single-selection state machine.
//!
//! The controller only tracks which flight is selected and whether its
//! information panel is collapsed. It reports each transition as a
//! [`SelectionChange`]; the caller performs the visual side effects.

use log::{debug, info};

use crate::snapshot::Flight;

/// The current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Unselected,
    Selected(String),
}

impl SelectionState {
    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        match self {
            Self::Unselected => None,
            Self::Selected(id) => Some(id),
        }
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_id() == Some(id)
    }
}

/// Why a selection was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeselectReason {
    /// The user clicked the map outside any flight.
    BackgroundClick,
    /// The selected flight is no longer in the latest snapshot.
    Vanished,
}

/// Outcome of feeding an input into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Selected {
        id: String,
        previous: Option<String>,
    },
    Deselected {
        previous: String,
        reason: DeselectReason,
    },
    Unchanged,
}

impl SelectionChange {
    #[must_use]
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Owns the selection and the record shown in the information panel.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    state: SelectionState,
    flight: Option<Flight>,
    panel_collapsed: bool,
}

impl SelectionController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Latest record of the selected flight.
    #[must_use]
    pub fn flight(&self) -> Option<&Flight> {
        self.flight.as_ref()
    }

    /// Select a flight. Records without an id cannot be selected.
    pub fn select(&mut self, flight: &Flight) -> SelectionChange {
        let Some(id) = flight.id() else {
            debug!("Ignoring selection of a flight without id");
            return SelectionChange::Unchanged;
        };

        let previous = self.state.selected_id().map(str::to_string);
        info!("Selected flight {id}");
        self.state = SelectionState::Selected(id.to_string());
        self.flight = Some(flight.clone());
        self.panel_collapsed = false;

        SelectionChange::Selected {
            id: id.to_string(),
            previous,
        }
    }

    /// Click on the map outside every flight primitive.
    pub fn background_click(&mut self) -> SelectionChange {
        self.clear(DeselectReason::BackgroundClick)
    }

    /// Reconcile against the latest snapshot.
    ///
    /// `latest` is the selected flight's record in the new snapshot, or `None`
    /// when it is gone.
    pub fn on_snapshot(&mut self, latest: Option<&Flight>) -> SelectionChange {
        if self.state == SelectionState::Unselected {
            return SelectionChange::Unchanged;
        }
        match latest {
            Some(flight) => {
                self.flight = Some(flight.clone());
                SelectionChange::Unchanged
            }
            None => self.clear(DeselectReason::Vanished),
        }
    }

    fn clear(&mut self, reason: DeselectReason) -> SelectionChange {
        match std::mem::take(&mut self.state) {
            SelectionState::Unselected => SelectionChange::Unchanged,
            SelectionState::Selected(previous) => {
                info!("Deselected flight {previous} ({reason:?})");
                self.flight = None;
                self.panel_collapsed = false;
                SelectionChange::Deselected { previous, reason }
            }
        }
    }

    /// Whether the information panel should be shown expanded.
    #[must_use]
    pub fn panel_visible(&self) -> bool {
        self.flight.is_some() && !self.panel_collapsed
    }

    #[must_use]
    pub fn panel_collapsed(&self) -> bool {
        self.flight.is_some() && self.panel_collapsed
    }

    /// Collapse the panel, keeping the selection.
    pub fn collapse_panel(&mut self) {
        if self.flight.is_some() {
            self.panel_collapsed = true;
        }
    }

    pub fn expand_panel(&mut self) {
        self.panel_collapsed = false;
    }
}
