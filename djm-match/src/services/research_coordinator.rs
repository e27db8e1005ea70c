//! Relaxed second pass over unmatched tracks
//!
//! Re-runs the search for every unmatched outcome under a wider configuration.
//! A new outcome replaces the old one only when its best final score is
//! strictly higher, so accepted matches are never touched and repeating the
//! pass with the same configuration changes nothing.

use super::progress::{NoopProgress, ProgressAggregator, ProgressSink};
use super::search_orchestrator::SearchOrchestrator;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::types::{CandidateSource, InputTrack, MatchOutcome, SearchPass};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Re-search driver for one relaxed configuration
pub struct ReSearchCoordinator {
    orchestrator: SearchOrchestrator,
    track_workers: usize,
    progress: Arc<dyn ProgressSink>,
}

impl ReSearchCoordinator {
    /// Validates `relaxed_config` and the worker count before anything runs
    pub fn new(relaxed_config: MatchConfig, track_workers: usize) -> Result<Self, MatchError> {
        if track_workers == 0 {
            return Err(MatchError::InvalidWorkers(track_workers));
        }
        Ok(Self {
            orchestrator: SearchOrchestrator::new(relaxed_config)?,
            track_workers,
            progress: Arc::new(NoopProgress),
        })
    }

    /// Report re-search progress to `sink`
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn config(&self) -> &MatchConfig {
        self.orchestrator.config()
    }

    /// Re-search every unmatched outcome, returning the updated list in the same order
    ///
    /// `tracks` supplies the inputs by id; an unmatched outcome whose track is
    /// missing is kept as is.
    pub async fn research_unmatched<S>(
        &self,
        tracks: &[InputTrack],
        outcomes: Vec<MatchOutcome>,
        source: &S,
        cancel_token: &CancellationToken,
    ) -> Vec<MatchOutcome>
    where
        S: CandidateSource + ?Sized,
    {
        let by_id: HashMap<&str, &InputTrack> = tracks.iter().map(|t| (t.id.as_str(), t)).collect();

        let pending: Vec<(usize, &InputTrack)> = outcomes
            .iter()
            .enumerate()
            .filter(|(_, outcome)| !outcome.matched)
            .filter_map(|(index, outcome)| match by_id.get(outcome.track_id.as_str()) {
                Some(track) => Some((index, *track)),
                None => {
                    tracing::warn!(track_id = %outcome.track_id, "No input track for unmatched outcome, skipping re-search");
                    None
                }
            })
            .collect();

        let run_id = Uuid::new_v4();
        tracing::info!(
            run_id = %run_id,
            unmatched = pending.len(),
            total = outcomes.len(),
            "Starting re-search pass"
        );

        let aggregator = ProgressAggregator::start(run_id, pending.len(), SearchPass::ReSearch, Arc::clone(&self.progress));
        let progress = aggregator.handle();
        let orchestrator = &self.orchestrator;

        let results: Vec<(usize, Option<MatchOutcome>)> = stream::iter(pending)
            .map(|(index, track)| {
                let progress = progress.clone();
                async move {
                    if cancel_token.is_cancelled() {
                        return (index, None);
                    }
                    let outcome = orchestrator
                        .find_best_match_in_pass(track, source, cancel_token, SearchPass::ReSearch)
                        .await;
                    progress.track_finished(&track.id, outcome.matched);
                    (index, Some(outcome))
                }
            })
            .buffer_unordered(self.track_workers)
            .collect()
            .await;
        drop(progress);
        aggregator.finish(cancel_token.is_cancelled()).await;

        let mut outcomes = outcomes;
        let mut replaced = 0usize;
        for (index, candidate) in results {
            let Some(candidate) = candidate else { continue };
            if improves(&candidate, &outcomes[index]) {
                tracing::debug!(
                    track_id = %candidate.track_id,
                    before = ?outcomes[index].best_final_score(),
                    after = ?candidate.best_final_score(),
                    "Re-search improved outcome"
                );
                outcomes[index] = candidate;
                replaced += 1;
            }
        }

        tracing::info!(
            run_id = %run_id,
            replaced,
            matched = outcomes.iter().filter(|o| o.matched).count(),
            "Re-search pass finished"
        );
        outcomes
    }
}

/// Strictly higher best final score; no best counts as lowest
fn improves(candidate: &MatchOutcome, current: &MatchOutcome) -> bool {
    match (candidate.best_final_score(), current.best_final_score()) {
        (Some(new), Some(old)) => new > old,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
