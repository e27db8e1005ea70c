//! Per-track search loop
//!
//! Runs the generated queries in rank order against a [`CandidateSource`],
//! scores every candidate and keeps the running best. The loop stops on early
//! exit, query exhaustion, time budget or cancellation.
//!
//! Candidate hydration for one query runs on a bounded pool; results are put
//! back into provider order before scoring so the tie-break never depends on
//! completion order.

use super::candidate_scorer::score;
use super::query_generator::make_search_queries;
use crate::config::MatchConfig;
use crate::error::MatchError;
use crate::types::{
    CandidateRaw, CandidateSource, EvaluatedCandidate, FetchFailure, InputTrack, MatchOutcome,
    SearchPass, SearchQuery, StopReason,
};
use futures::stream::{self, StreamExt};
use std::cmp::Ordering;
use std::collections::HashSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifecycle of one track's search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Pending,
    Searching,
    Done,
}

/// Drives the query loop for single tracks under one [`MatchConfig`]
#[derive(Debug, Clone)]
pub struct SearchOrchestrator {
    config: MatchConfig,
}

impl SearchOrchestrator {
    /// Create an orchestrator; fails if `config` violates its contract
    pub fn new(config: MatchConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Search for the best catalog entry for `track` (initial pass)
    pub async fn find_best_match<S>(
        &self,
        track: &InputTrack,
        source: &S,
        cancel_token: &CancellationToken,
    ) -> MatchOutcome
    where
        S: CandidateSource + ?Sized,
    {
        self.find_best_match_in_pass(track, source, cancel_token, SearchPass::Initial)
            .await
    }

    /// Search for `track`, tagging the outcome with `pass`
    pub async fn find_best_match_in_pass<S>(
        &self,
        track: &InputTrack,
        source: &S,
        cancel_token: &CancellationToken,
        pass: SearchPass,
    ) -> MatchOutcome
    where
        S: CandidateSource + ?Sized,
    {
        let started = Instant::now();
        let budget = self.config.time_budget();
        let limit = self.config.max_candidates_per_query;
        let mut state = SearchState::Pending;

        let queries = make_search_queries(track, self.config.title_gram_max);
        tracing::debug!(
            track_id = %track.id,
            queries = queries.len(),
            source = source.name(),
            ?pass,
            "Generated search queries"
        );

        let mut queries_issued: Vec<SearchQuery> = Vec::new();
        let mut evaluated: Vec<EvaluatedCandidate> = Vec::new();
        let mut fetch_failures: Vec<FetchFailure> = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut best: Option<usize> = None;
        let mut stop_reason = StopReason::QueriesExhausted;

        if queries.is_empty() {
            tracing::info!(track_id = %track.id, "No searchable text, track left unmatched");
        }

        for query in queries {
            if cancel_token.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }
            if started.elapsed() >= budget {
                stop_reason = StopReason::TimeBudgetExceeded;
                break;
            }
            if state == SearchState::Pending {
                state = transition(&track.id, state, SearchState::Searching);
            }

            queries_issued.push(query.clone());

            let fetched = match source.fetch(&query, limit).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::warn!(
                        track_id = %track.id,
                        query = %query.text,
                        error = %e,
                        "Candidate fetch failed, continuing with next query"
                    );
                    fetch_failures.push(FetchFailure {
                        query: query.clone(),
                        message: e.to_string(),
                    });
                    Vec::new()
                }
            };

            let candidates: Vec<CandidateRaw> = fetched
                .into_iter()
                .filter_map(CandidateRaw::validated)
                .take(limit)
                .collect();
            let candidates = self.hydrate_all(source, candidates).await;

            // Results that arrive after cancellation are discarded unscored
            if cancel_token.is_cancelled() {
                stop_reason = StopReason::Cancelled;
                break;
            }

            let mut scored = 0usize;
            for (position, candidate) in candidates.into_iter().enumerate() {
                if !candidate.url.is_empty() && !seen_urls.insert(candidate.url.clone()) {
                    continue;
                }
                let breakdown = score(track, &candidate, &self.config);
                let entry = EvaluatedCandidate {
                    query_rank: query.rank,
                    position,
                    candidate,
                    score: breakdown,
                };
                if !entry.score.is_rejected()
                    && best.map_or(true, |i| outranks(&entry, &evaluated[i]))
                {
                    best = Some(evaluated.len());
                }
                evaluated.push(entry);
                scored += 1;
            }

            let best_final = best.map(|i| evaluated[i].score.final_score);
            tracing::debug!(
                track_id = %track.id,
                query = %query.text,
                rank = query.rank,
                scored,
                best_final = ?best_final,
                "Query evaluated"
            );

            if best_final.is_some_and(|s| s >= self.config.early_exit_score)
                && queries_issued.len() >= self.config.min_queries_before_exit
            {
                stop_reason = StopReason::EarlyExit;
                break;
            }
        }

        transition(&track.id, state, SearchState::Done);

        let (best_candidate, best_score) = match best {
            Some(i) => (
                Some(evaluated[i].candidate.clone()),
                Some(evaluated[i].score.clone()),
            ),
            None => (None, None),
        };
        let matched = best_score
            .as_ref()
            .is_some_and(|s| s.final_score >= self.config.min_accept_score);

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            track_id = %track.id,
            matched,
            stop_reason = stop_reason.as_str(),
            queries = queries_issued.len(),
            candidates = evaluated.len(),
            best = ?best_score.as_ref().map(|s| s.explain()),
            elapsed_ms,
            "Track search finished"
        );

        MatchOutcome {
            track_id: track.id.clone(),
            matched,
            best_candidate,
            best_score,
            candidates_evaluated: evaluated,
            queries_issued,
            fetch_failures,
            stop_reason,
            pass,
            elapsed_ms,
        }
    }

    /// Hydrate one query's candidates concurrently, returned in input order
    ///
    /// A failed or empty hydration keeps the candidate as fetched.
    async fn hydrate_all<S>(&self, source: &S, candidates: Vec<CandidateRaw>) -> Vec<CandidateRaw>
    where
        S: CandidateSource + ?Sized,
    {
        let mut hydrated: Vec<(usize, CandidateRaw)> = stream::iter(candidates.into_iter().enumerate())
            .map(|(position, candidate)| async move {
                let fetched = candidate.clone();
                match source.hydrate(candidate).await {
                    Ok(detailed) => (position, detailed.validated().unwrap_or(fetched)),
                    Err(e) => {
                        tracing::debug!(url = %fetched.url, error = %e, "Hydration failed, keeping listing data");
                        (position, fetched)
                    }
                }
            })
            .buffer_unordered(self.config.fetch_workers)
            .collect()
            .await;

        hydrated.sort_by_key(|(position, _)| *position);
        hydrated.into_iter().map(|(_, candidate)| candidate).collect()
    }
}

fn transition(track_id: &str, from: SearchState, to: SearchState) -> SearchState {
    tracing::trace!(track_id = %track_id, ?from, ?to, "Search state transition");
    to
}

/// Whether `challenger` beats `incumbent`
///
/// Higher final score, then higher artist similarity, then lower query rank,
/// then earlier position. Equal keys keep the incumbent.
fn outranks(challenger: &EvaluatedCandidate, incumbent: &EvaluatedCandidate) -> bool {
    let ordering = challenger
        .score
        .final_score
        .total_cmp(&incumbent.score.final_score)
        .then_with(|| challenger.score.artist_sim.total_cmp(&incumbent.score.artist_sim))
        .then_with(|| incumbent.query_rank.cmp(&challenger.query_rank))
        .then_with(|| incumbent.position.cmp(&challenger.position));
    ordering == Ordering::Greater
}
