//! Scripted candidate source
//!
//! Answers each query from canned results keyed by query text or rank, with
//! optional failures, fetch delays, per-candidate hydration delays and a hook
//! that cancels a token while a given query is in flight.

use async_trait::async_trait;
use djm_match::{CandidateRaw, CandidateSource, FetchError, SearchQuery};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
pub struct ScriptedSource {
    by_text: HashMap<String, Vec<CandidateRaw>>,
    by_rank: HashMap<u32, Vec<CandidateRaw>>,
    fallback: Vec<CandidateRaw>,
    failing_ranks: HashSet<u32>,
    fetch_delay: Duration,
    hydrate_delays: HashMap<String, Duration>,
    cancel_during: Option<(u32, CancellationToken)>,
    calls: Mutex<Vec<SearchQuery>>,
    hydrations: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results for an exact (normalized) query text
    pub fn on_text(mut self, text: &str, candidates: Vec<CandidateRaw>) -> Self {
        self.by_text.insert(text.to_string(), candidates);
        self
    }

    /// Results for the query with `rank`
    pub fn on_rank(mut self, rank: u32, candidates: Vec<CandidateRaw>) -> Self {
        self.by_rank.insert(rank, candidates);
        self
    }

    /// Results for every query without a more specific script
    pub fn otherwise(mut self, candidates: Vec<CandidateRaw>) -> Self {
        self.fallback = candidates;
        self
    }

    pub fn failing(mut self, rank: u32) -> Self {
        self.failing_ranks.insert(rank);
        self
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Delay hydration of the candidate with `url`
    pub fn with_hydrate_delay(mut self, url: &str, delay: Duration) -> Self {
        self.hydrate_delays.insert(url.to_string(), delay);
        self
    }

    /// Cancel `token` while the query with `rank` is being fetched
    pub fn cancel_during(mut self, rank: u32, token: CancellationToken) -> Self {
        self.cancel_during = Some((rank, token));
        self
    }

    /// Ranks of every fetch call, in call order
    pub fn ranks_called(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|q| q.rank).collect()
    }

    /// Texts of every fetch call, in call order
    pub fn texts_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|q| q.text.clone()).collect()
    }

    /// URLs in hydration completion order
    pub fn hydration_order(&self) -> Vec<String> {
        self.hydrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandidateSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, query: &SearchQuery, _limit: usize) -> Result<Vec<CandidateRaw>, FetchError> {
        self.calls.lock().unwrap().push(query.clone());

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if let Some((rank, token)) = &self.cancel_during {
            if *rank == query.rank {
                token.cancel();
            }
        }
        if self.failing_ranks.contains(&query.rank) {
            return Err(FetchError::Network(format!("scripted failure for rank {}", query.rank)));
        }

        Ok(self
            .by_text
            .get(&query.text)
            .or_else(|| self.by_rank.get(&query.rank))
            .unwrap_or(&self.fallback)
            .clone())
    }

    async fn hydrate(&self, mut candidate: CandidateRaw) -> Result<CandidateRaw, FetchError> {
        if let Some(delay) = self.hydrate_delays.get(&candidate.url) {
            tokio::time::sleep(*delay).await;
        }
        self.hydrations.lock().unwrap().push(candidate.url.clone());
        candidate.label.get_or_insert_with(|| "Hydrated Records".to_string());
        Ok(candidate)
    }
}
