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

//! Coalescing redraw slot.
//!
//! State pushes may arrive faster than frames are painted. The scheduler holds
//! at most one pending redraw; scheduling again replaces it, and the host takes
//! the survivor once per paint frame.

use chrono::{DateTime, Utc};
use log::trace;

#[derive(Debug)]
struct Pending<T> {
    value: T,
    scheduled_at: DateTime<Utc>,
}

/// Latest-wins pending redraw.
#[derive(Debug)]
pub struct RedrawScheduler<T> {
    pending: Option<Pending<T>>,
    scheduled: u64,
    coalesced: u64,
    executed: u64,
}

impl<T> Default for RedrawScheduler<T> {
    fn default() -> Self {
        Self {
            pending: None,
            scheduled: 0,
            coalesced: 0,
            executed: 0,
        }
    }
}

impl<T> RedrawScheduler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a redraw with `value`, cancelling any pending one.
    ///
    /// Returns `true` when a pending redraw was replaced.
    pub fn schedule(&mut self, value: T) -> bool {
        self.scheduled += 1;
        let replaced = self
            .pending
            .replace(Pending {
                value,
                scheduled_at: Utc::now(),
            })
            .is_some();
        if replaced {
            self.coalesced += 1;
            trace!("Coalesced pending redraw");
        }
        replaced
    }

    /// Take the pending redraw, if any. Call once per paint frame.
    pub fn take_due(&mut self) -> Option<T> {
        let pending = self.pending.take()?;
        self.executed += 1;
        let waited = Utc::now() - pending.scheduled_at;
        trace!("Running redraw after {} ms", waited.num_milliseconds());
        Some(pending.value)
    }

    /// Drop the pending redraw without running it.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending redraw was scheduled.
    #[must_use]
    pub fn scheduled_at(&self) -> Option<DateTime<Utc>> {
        self.pending.as_ref().map(|p| p.scheduled_at)
    }

    #[must_use]
    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    #[must_use]
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }

    #[must_use]
    pub fn executed_count(&self) -> u64 {
        self.executed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_push_wins() {
        let mut scheduler = RedrawScheduler::new();
        assert!(!scheduler.schedule(1));
        assert!(scheduler.schedule(2));
        assert!(scheduler.schedule(3));

        assert_eq!(scheduler.take_due(), Some(3));
        assert_eq!(scheduler.take_due(), None);
        assert_eq!(scheduler.scheduled_count(), 3);
        assert_eq!(scheduler.coalesced_count(), 2);
        assert_eq!(scheduler.executed_count(), 1);
    }

    #[test]
    fn test_each_frame_runs_once() {
        let mut scheduler = RedrawScheduler::new();
        scheduler.schedule("a");
        assert_eq!(scheduler.take_due(), Some("a"));
        scheduler.schedule("b");
        assert!(scheduler.is_pending());
        assert!(scheduler.scheduled_at().is_some());
        assert_eq!(scheduler.take_due(), Some("b"));
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_cancel() {
        let mut scheduler = RedrawScheduler::new();
        assert!(!scheduler.cancel());
        scheduler.schedule(());
        assert!(scheduler.cancel());
        assert_eq!(scheduler.take_due(), None);
        assert_eq!(scheduler.executed_count(), 0);
    }
}
