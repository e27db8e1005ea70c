//! Batch matching over a track list
//!
//! **Track-level workers:** a bounded pool (`track_workers`) searches distinct
//! tracks concurrently. Outcomes come back in input order. An optional relaxed
//! re-search pass follows for the tracks left unmatched.

use super::progress::{NoopProgress, ProgressAggregator, ProgressSink};
use super::research_coordinator::ReSearchCoordinator;
use super::search_orchestrator::SearchOrchestrator;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::types::{CandidateSource, Confidence, InputTrack, MatchOutcome, SearchPass, StopReason};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome counts per confidence tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// No non-rejected candidate at all
    pub none: usize,
}

/// Aggregate view of one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    /// Outcomes produced by the re-search pass
    pub researched: usize,
    pub confidence: ConfidenceCounts,
    pub stop_reasons: BTreeMap<String, usize>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Tally `outcomes`, classifying each under the configuration of its pass
    pub fn from_outcomes(
        run_id: Uuid,
        outcomes: &[MatchOutcome],
        initial: &MatchConfig,
        research: Option<&MatchConfig>,
    ) -> Self {
        let mut confidence = ConfidenceCounts::default();
        let mut stop_reasons: BTreeMap<String, usize> = BTreeMap::new();

        for outcome in outcomes {
            let config = match outcome.pass {
                SearchPass::ReSearch => research.unwrap_or(initial),
                SearchPass::Initial => initial,
            };
            match outcome.confidence(config) {
                Some(Confidence::High) => confidence.high += 1,
                Some(Confidence::Medium) => confidence.medium += 1,
                Some(Confidence::Low) => confidence.low += 1,
                None => confidence.none += 1,
            }
            *stop_reasons
                .entry(outcome.stop_reason.as_str().to_string())
                .or_default() += 1;
        }

        let matched = outcomes.iter().filter(|o| o.matched).count();
        Self {
            run_id,
            total: outcomes.len(),
            matched,
            unmatched: outcomes.len() - matched,
            researched: outcomes.iter().filter(|o| o.pass == SearchPass::ReSearch).count(),
            confidence,
            stop_reasons,
            cancelled: false,
            elapsed_ms: 0,
        }
    }
}

/// Outcomes in input order plus their summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<MatchOutcome>,
    pub summary: RunSummary,
}

/// Batch driver
pub struct BatchRunner {
    orchestrator: SearchOrchestrator,
    research: Option<ReSearchCoordinator>,
    track_workers: usize,
    progress: Arc<dyn ProgressSink>,
}

impl BatchRunner {
    /// Validates `config` and `track_workers`; nothing runs on failure
    pub fn new(config: MatchConfig, track_workers: usize) -> Result<Self, MatchError> {
        if track_workers == 0 {
            return Err(MatchError::InvalidWorkers(track_workers));
        }
        Ok(Self {
            orchestrator: SearchOrchestrator::new(config)?,
            research: None,
            track_workers,
            progress: Arc::new(NoopProgress),
        })
    }

    /// Enable a re-search pass with `relaxed_config` after the initial pass
    pub fn with_research(mut self, relaxed_config: MatchConfig) -> Result<Self, MatchError> {
        let coordinator = ReSearchCoordinator::new(relaxed_config, self.track_workers)?
            .with_progress(Arc::clone(&self.progress));
        self.research = Some(coordinator);
        Ok(self)
    }

    /// Report progress of both passes to `sink`
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.research = self.research.map(|r| r.with_progress(Arc::clone(&sink)));
        self.progress = sink;
        self
    }

    /// Match every track in `tracks`
    ///
    /// Tracks not started before `cancel_token` fires end as
    /// [`StopReason::Cancelled`] with no queries. The re-search pass is skipped
    /// once the run is cancelled.
    pub async fn run<S>(&self, tracks: &[InputTrack], source: &S, cancel_token: &CancellationToken) -> BatchReport
    where
        S: CandidateSource + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        tracing::info!(
            run_id = %run_id,
            tracks = tracks.len(),
            track_workers = self.track_workers,
            research = self.research.is_some(),
            "Starting batch run"
        );

        let aggregator = ProgressAggregator::start(run_id, tracks.len(), SearchPass::Initial, Arc::clone(&self.progress));
        let progress = aggregator.handle();
        let orchestrator = &self.orchestrator;

        let mut indexed: Vec<(usize, MatchOutcome)> = stream::iter(tracks.iter().enumerate())
            .map(|(index, track)| {
                let progress = progress.clone();
                async move {
                    if cancel_token.is_cancelled() {
                        tracing::debug!(track_id = %track.id, "Run cancelled before track started");
                        return (
                            index,
                            MatchOutcome::unsearched(track.id.clone(), StopReason::Cancelled, SearchPass::Initial),
                        );
                    }
                    let outcome = orchestrator.find_best_match(track, source, cancel_token).await;
                    progress.track_finished(&track.id, outcome.matched);
                    (index, outcome)
                }
            })
            .buffer_unordered(self.track_workers)
            .collect()
            .await;
        drop(progress);

        indexed.sort_by_key(|(index, _)| *index);
        let mut outcomes: Vec<MatchOutcome> = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        let cancelled = cancel_token.is_cancelled();
        let totals = aggregator.finish(cancelled).await;
        tracing::info!(
            run_id = %run_id,
            completed = totals.completed_count,
            matched = totals.matched_count,
            cancelled,
            "Initial pass finished"
        );

        if let Some(research) = &self.research {
            if !cancelled {
                outcomes = research
                    .research_unmatched(tracks, outcomes, source, cancel_token)
                    .await;
            }
        }

        let mut summary = RunSummary::from_outcomes(
            run_id,
            &outcomes,
            self.orchestrator.config(),
            self.research.as_ref().map(|r| r.config()),
        );
        summary.cancelled = cancel_token.is_cancelled();
        summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::info!(
            run_id = %run_id,
            total = summary.total,
            matched = summary.matched,
            researched = summary.researched,
            high = summary.confidence.high,
            medium = summary.confidence.medium,
            elapsed_ms = summary.elapsed_ms,
            "Batch run finished"
        );

        BatchReport { outcomes, summary }
    }
}

/// One-shot batch run without re-search
pub async fn run_batch<S>(
    tracks: &[InputTrack],
    source: &S,
    config: MatchConfig,
    track_workers: usize,
    cancel_token: &CancellationToken,
) -> Result<BatchReport, MatchError>
where
    S: CandidateSource + ?Sized,
{
    let runner = BatchRunner::new(config, track_workers)?;
    Ok(runner.run(tracks, source, cancel_token).await)
}
