//! Run progress aggregation
//!
//! Workers report finished tracks over an mpsc channel to a single actor task,
//! which owns the counters and forwards snapshots to a [`ProgressSink`].
//! Counts are never lost or duplicated under concurrent reporting.

use crate::types::SearchPass;
use chrono::Utc;
use djm_common::{EventBus, MatchEvent, ProgressEvent};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Receiver of run progress
///
/// Called from the aggregator task only, one event at a time.
pub trait ProgressSink: Send + Sync {
    fn on_run_started(&self, _run_id: Uuid, _total_count: usize, _pass: SearchPass) {}

    fn on_progress(&self, event: &ProgressEvent);

    fn on_run_completed(&self, _run_id: Uuid, _total_count: usize, _matched_count: usize, _cancelled: bool) {}
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

fn pass_label(pass: SearchPass) -> &'static str {
    match pass {
        SearchPass::Initial => "initial",
        SearchPass::ReSearch => "research",
    }
}

impl ProgressSink for EventBus {
    fn on_run_started(&self, run_id: Uuid, total_count: usize, pass: SearchPass) {
        self.emit_lossy(MatchEvent::RunStarted {
            run_id,
            total_count,
            pass: pass_label(pass).to_string(),
            timestamp: Utc::now(),
        });
    }

    fn on_progress(&self, event: &ProgressEvent) {
        self.emit_lossy(MatchEvent::TrackProgress(event.clone()));
    }

    fn on_run_completed(&self, run_id: Uuid, total_count: usize, matched_count: usize, cancelled: bool) {
        self.emit_lossy(MatchEvent::RunCompleted {
            run_id,
            total_count,
            matched_count,
            cancelled,
            timestamp: Utc::now(),
        });
    }
}

/// Final counters of one aggregated run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressTotals {
    pub completed_count: usize,
    pub matched_count: usize,
}

#[derive(Debug)]
struct TrackFinished {
    track_id: String,
    matched: bool,
}

/// Cloneable handle workers use to report finished tracks
#[derive(Debug, Clone)]
pub struct ProgressHandle {
    tx: mpsc::UnboundedSender<TrackFinished>,
}

impl ProgressHandle {
    pub fn track_finished(&self, track_id: &str, matched: bool) {
        // Closed channel means the aggregator already finished
        let _ = self.tx.send(TrackFinished {
            track_id: track_id.to_string(),
            matched,
        });
    }
}

/// Owner side of the aggregator task
pub struct ProgressAggregator {
    run_id: Uuid,
    total_count: usize,
    handle: ProgressHandle,
    task: JoinHandle<ProgressTotals>,
    sink: Arc<dyn ProgressSink>,
}

impl ProgressAggregator {
    /// Announce the run and start the aggregator task
    pub fn start(run_id: Uuid, total_count: usize, pass: SearchPass, sink: Arc<dyn ProgressSink>) -> Self {
        sink.on_run_started(run_id, total_count, pass);

        let (tx, mut rx) = mpsc::unbounded_channel::<TrackFinished>();
        let actor_sink = Arc::clone(&sink);
        let task = tokio::spawn(async move {
            let mut totals = ProgressTotals::default();
            while let Some(finished) = rx.recv().await {
                totals.completed_count += 1;
                if finished.matched {
                    totals.matched_count += 1;
                }
                actor_sink.on_progress(&ProgressEvent {
                    run_id,
                    completed_count: totals.completed_count,
                    total_count,
                    matched_count: totals.matched_count,
                    current_track_id: finished.track_id,
                    timestamp: Utc::now(),
                });
            }
            totals
        });

        Self {
            run_id,
            total_count,
            handle: ProgressHandle { tx },
            task,
            sink,
        }
    }

    pub fn handle(&self) -> ProgressHandle {
        self.handle.clone()
    }

    /// Drain pending reports, announce completion and return the totals
    ///
    /// Every [`ProgressHandle`] clone must be dropped first or this waits for them.
    pub async fn finish(self, cancelled: bool) -> ProgressTotals {
        let Self {
            run_id,
            total_count,
            handle,
            task,
            sink,
        } = self;
        drop(handle);

        let totals = match task.await {
            Ok(totals) => totals,
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Progress aggregator task failed");
                ProgressTotals::default()
            }
        };
        sink.on_run_completed(run_id, total_count, totals.matched_count, cancelled);
        totals
    }
}
