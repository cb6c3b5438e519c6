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

//! Async host state feed.
//!
//! Watches a host state JSON file and pushes a snapshot whenever its contents
//! change. The feed runs as a background tokio task; dropping the handle stops
//! it.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::snapshot::HostState;

/// Configuration for a snapshot feed.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Host state file to watch.
    pub path: PathBuf,
    /// How often the file is checked for changes.
    pub poll_interval: Duration,
    /// Channel buffer size for events.
    pub buffer_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("states.json"),
            poll_interval: Duration::from_secs(10),
            buffer_size: 16,
        }
    }
}

/// Events emitted by the feed.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The host state changed.
    Snapshot {
        state: HostState,
        received_at: DateTime<Utc>,
    },
    /// The file could not be read or decoded.
    Error(String),
}

/// Handle to a running snapshot feed.
pub struct SnapshotFeed {
    event_rx: mpsc::Receiver<FeedEvent>,
    path_tx: watch::Sender<PathBuf>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for SnapshotFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotFeed")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl SnapshotFeed {
    /// Spawn the feed task. Must be called within a tokio runtime.
    #[must_use]
    pub fn spawn(config: FeedConfig) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.buffer_size.max(1));
        let (path_tx, path_rx) = watch::channel(config.path);
        let cancel_token = CancellationToken::new();

        let task_cancel = cancel_token.clone();
        let poll_interval = config.poll_interval;

        tokio::spawn(async move {
            feed_loop(event_tx, path_rx, task_cancel, poll_interval).await;
        });

        Self {
            event_rx,
            path_tx,
            cancel_token,
        }
    }

    /// Next event, or `None` once the feed has stopped.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.event_rx.recv().await
    }

    /// Next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Watch a different file. The next poll reads it immediately.
    ///
    /// Returns `false` when the feed has already stopped.
    pub fn set_path(&self, path: PathBuf) -> bool {
        match self.path_tx.send(path) {
            Ok(()) => true,
            Err(e) => {
                debug!("Feed stopped, ignoring new path {}", e.0.display());
                false
            }
        }
    }

    #[must_use]
    pub fn current_path(&self) -> PathBuf {
        self.path_tx.borrow().clone()
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for SnapshotFeed {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn feed_loop(
    event_tx: mpsc::Sender<FeedEvent>,
    mut path_rx: watch::Receiver<PathBuf>,
    cancel_token: CancellationToken,
    poll_interval: Duration,
) {
    let mut path = path_rx.borrow_and_update().clone();
    let mut last_contents: Option<String> = None;
    let mut last_error: Option<String> = None;
    info!("Watching host state at {}", path.display());

    loop {
        if cancel_token.is_cancelled() {
            info!("Snapshot feed cancelled");
            return;
        }

        let event = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if last_contents.as_ref() == Some(&contents) => None,
            Ok(contents) => {
                let event = match HostState::from_json(&contents) {
                    Ok(state) => {
                        debug!("Host state changed ({} entities)", state.len());
                        last_error = None;
                        Some(FeedEvent::Snapshot {
                            state,
                            received_at: Utc::now(),
                        })
                    }
                    Err(e) => report(&mut last_error, format!("{}: {e}", path.display())),
                };
                last_contents = Some(contents);
                event
            }
            Err(e) => {
                last_contents = None;
                report(&mut last_error, format!("{}: {e}", path.display()))
            }
        };

        if let Some(event) = event {
            if event_tx.send(event).await.is_err() {
                return; // Receiver dropped
            }
        }

        tokio::select! {
            () = sleep(poll_interval) => {}
            changed = path_rx.changed() => {
                if changed.is_err() {
                    return;
                }
                path = path_rx.borrow_and_update().clone();
                last_contents = None;
                last_error = None;
                info!("Now watching host state at {}", path.display());
            }
            () = cancel_token.cancelled() => {
                info!("Snapshot feed cancelled");
                return;
            }
        }
    }
}

/// Emit an error once until it changes or clears.
fn report(last_error: &mut Option<String>, message: String) -> Option<FeedEvent> {
    if last_error.as_ref() == Some(&message) {
        return None;
    }
    warn!("Snapshot feed error: {message}");
    *last_error = Some(message.clone());
    Some(FeedEvent::Error(message))
}
