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

//! Persisted overlay visibility.
//!
//! The layer toggles are stored as one JSON object (layer name to boolean)
//! under a fixed key in a host-provided [`KeyValueStore`]. Layers that were
//! never toggled default to visible.

use std::collections::{BTreeMap, HashMap};

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::renderer::Layer;

/// Key the layer record is stored under.
pub const LAYER_STORAGE_KEY: &str = "whats-that-plane-layers";

#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("failed to encode preferences: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("preference store unavailable: {0}")]
    Store(String),
}

/// Durable string storage supplied by the host.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&mut self, key: &str, value: String) -> Result<(), PreferencesError>;
}

/// Volatile store, for tests and hosts without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PreferencesError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Per-layer visibility record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerPreferences {
    layers: BTreeMap<String, bool>,
}

impl LayerPreferences {
    /// Read the record from `store`. A missing or unreadable record counts as
    /// empty.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let Some(raw) = store.get(LAYER_STORAGE_KEY) else {
            return Self::default();
        };
        match serde_json::from_str(&raw) {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("Ignoring unreadable layer preferences: {e}");
                Self::default()
            }
        }
    }

    #[must_use]
    pub fn is_visible(&self, layer: Layer) -> bool {
        self.layers.get(layer.name()).copied().unwrap_or(true)
    }

    pub fn set(&mut self, layer: Layer, visible: bool) {
        self.layers.insert(layer.name().to_string(), visible);
    }

    /// Write the record back to `store`.
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), PreferencesError> {
        let encoded = serde_json::to_string(self)?;
        store.set(LAYER_STORAGE_KEY, encoded)
    }
}
