//! Event types for DJM matching runs
//!
//! Events are broadcast to any number of subscribers (UI, exporters, log
//! bridges). Emission never blocks the matching pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Per-track progress snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Run this event belongs to
    pub run_id: Uuid,
    /// Tracks finished so far (matched or not)
    pub completed_count: usize,
    /// Tracks in the run
    pub total_count: usize,
    /// Tracks finished with an accepted match
    pub matched_count: usize,
    /// Track whose completion produced this event
    pub current_track_id: String,
    pub timestamp: DateTime<Utc>,
}

/// DJM event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchEvent {
    /// A batch run started
    RunStarted {
        run_id: Uuid,
        total_count: usize,
        /// "initial" or "research"
        pass: String,
        timestamp: DateTime<Utc>,
    },

    /// One track finished
    TrackProgress(ProgressEvent),

    /// A batch run finished (possibly cancelled)
    RunCompleted {
        run_id: Uuid,
        total_count: usize,
        matched_count: usize,
        cancelled: bool,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcast bus for [`MatchEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MatchEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MatchEvent) {
        let _ = self.tx.send(event);
    }
}
