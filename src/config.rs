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

//! Application configuration management.
//!
//! Settings persist in TOML via `confy`. The same file doubles as the
//! durable key-value store behind the map's layer toggles, so overlay
//! visibility survives restarts.

use std::collections::BTreeMap;
use std::path::PathBuf;

use flight_map::{KeyValueStore, PreferencesError};
use log::{debug, info};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "whats-that-plane";
const CONFIG_NAME: &str = "config";

/// Default sensor entity holding the flight snapshot.
pub const DEFAULT_ENTITY: &str = "sensor.whats_that_plane";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Host entity whose attributes carry the flight snapshot
    #[serde(default = "default_entity")]
    pub entity: String,

    /// Host state JSON file watched for new snapshots
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    /// Seconds between checks of the snapshot file
    #[serde(default = "default_poll_secs")]
    pub poll_secs: u64,

    /// Map zoom before the first snapshot places the observer
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,

    /// Fixed starting hue for flight colors (0.0 - 1.0); random when unset
    #[serde(default)]
    pub color_seed: Option<f64>,

    /// Raw entries written through [`ConfyStore`]
    #[serde(default)]
    pub preferences: BTreeMap<String, String>,
}

fn default_entity() -> String {
    DEFAULT_ENTITY.to_string()
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("states.json")
}

fn default_poll_secs() -> u64 {
    10
}

fn default_zoom() -> f64 {
    7.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            entity: default_entity(),
            snapshot_path: default_snapshot_path(),
            poll_secs: default_poll_secs(),
            default_zoom: default_zoom(),
            color_seed: None,
            preferences: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        let config: Self = confy::load(APP_NAME, CONFIG_NAME)?;
        debug!("Loaded configuration for entity {}", config.entity);
        Ok(config)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Apply command-line overrides on top of the stored values
    #[must_use]
    pub fn with_overrides(
        mut self,
        entity: Option<String>,
        snapshot: Option<PathBuf>,
        poll_secs: Option<u64>,
        seed: Option<f64>,
    ) -> Self {
        if let Some(entity) = entity {
            self.entity = entity;
        }
        if let Some(path) = snapshot {
            self.snapshot_path = path;
        }
        if let Some(secs) = poll_secs {
            self.poll_secs = secs.max(1);
        }
        if seed.is_some() {
            self.color_seed = seed;
        }
        self
    }
}

/// [`KeyValueStore`] backed by the `confy` config file.
#[derive(Debug, Clone)]
pub struct ConfyStore {
    config: AppConfig,
    persist: bool,
}

impl ConfyStore {
    /// Store that writes the whole config back on every change.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            persist: true,
        }
    }

    /// Store that only keeps changes in memory.
    #[must_use]
    pub fn detached(config: AppConfig) -> Self {
        Self {
            config,
            persist: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl KeyValueStore for ConfyStore {
    fn get(&self, key: &str) -> Option<String> {
        self.config.preferences.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PreferencesError> {
        self.config.preferences.insert(key.to_string(), value);
        if self.persist {
            self.config
                .save()
                .map_err(|e| PreferencesError::Store(e.to_string()))?;
            info!("Saved preference {key}");
        }
        Ok(())
    }
}
