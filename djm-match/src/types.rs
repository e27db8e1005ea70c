//! Core Types and Trait Definitions for DJM matching
//!
//! Defines the records that flow through the matching pipeline:
//! - **Input:** [`InputTrack`] from the collection parser
//! - **Search:** [`SearchQuery`] and [`CandidateRaw`] from a [`CandidateSource`]
//! - **Scoring:** [`ScoreBreakdown`] per (track, candidate) pair
//! - **Output:** [`MatchOutcome`] per track, including the full audit trail

use crate::config::MatchConfig;
use djm_common::config::load_json_file;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Input
// ============================================================================

/// One track from the user's collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputTrack {
    /// Opaque identifier assigned by the collection parser
    pub id: String,
    /// Title as stored in the collection (may carry mix annotations)
    pub title: String,
    /// Declared artist field (may be empty)
    #[serde(default)]
    pub artists: String,
}

impl InputTrack {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artists: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artists: artists.into(),
        }
    }

    /// Load a track list from a JSON array
    ///
    /// Ids must be non-empty and unique; outcomes are keyed by them.
    pub fn load_list(path: &Path) -> djm_common::Result<Vec<Self>> {
        let tracks: Vec<Self> = load_json_file(path)?;
        let mut seen = HashSet::new();
        for track in &tracks {
            if track.id.trim().is_empty() {
                return Err(djm_common::Error::InvalidInput(format!(
                    "Track with empty id (title '{}')",
                    track.title
                )));
            }
            if !seen.insert(track.id.as_str()) {
                return Err(djm_common::Error::InvalidInput(format!(
                    "Duplicate track id '{}'",
                    track.id
                )));
            }
        }
        tracing::info!(path = %path.display(), tracks = tracks.len(), "Loaded track list");
        Ok(tracks)
    }
}

/// One search string sent to the candidate source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Generation order; 0 is tried first
    pub rank: u32,
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} \"{}\"", self.rank, self.text)
    }
}

// ============================================================================
// Candidates
// ============================================================================

/// One external catalog entry returned for a query
///
/// Optional fields are whatever the provider exposes; scoring only reads
/// `title` and `artists`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateRaw {
    pub title: String,
    #[serde(default)]
    pub artists: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub bpm: Option<f32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl CandidateRaw {
    pub fn new(title: impl Into<String>, artists: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artists: artists.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// Boundary validation applied once to everything a source returns
    ///
    /// Trims text fields, blanks out empty optionals and nonsensical BPMs.
    /// Returns `None` for entries without a title.
    pub fn validated(mut self) -> Option<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return None;
        }
        self.artists = self.artists.trim().to_string();
        self.url = self.url.trim().to_string();
        for field in [
            &mut self.key,
            &mut self.label,
            &mut self.release,
            &mut self.release_date,
            &mut self.external_id,
        ] {
            if field.as_deref().map(str::trim).is_some_and(str::is_empty) {
                *field = None;
            }
        }
        if self.bpm.is_some_and(|b| !b.is_finite() || b <= 0.0) {
            self.bpm = None;
        }
        self.genres.retain(|g| !g.trim().is_empty());
        Some(self)
    }
}

/// Candidate source errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// External catalog search capability
///
/// Implementations perform the network/browser I/O. Failures are recovered by
/// the orchestrator (the query yields zero candidates).
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str {
        "source"
    }

    /// Execute one query, returning at most roughly `limit` candidates in
    /// provider order
    async fn fetch(&self, query: &SearchQuery, limit: usize) -> Result<Vec<CandidateRaw>, FetchError>;

    /// Fill in detail fields for one candidate (e.g. a detail-page fetch)
    ///
    /// Called concurrently for the candidates of a single query.
    async fn hydrate(&self, candidate: CandidateRaw) -> Result<CandidateRaw, FetchError> {
        Ok(candidate)
    }
}

#[async_trait::async_trait]
impl<S: CandidateSource + ?Sized> CandidateSource for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn fetch(&self, query: &SearchQuery, limit: usize) -> Result<Vec<CandidateRaw>, FetchError> {
        (**self).fetch(query, limit).await
    }

    async fn hydrate(&self, candidate: CandidateRaw) -> Result<CandidateRaw, FetchError> {
        (**self).hydrate(candidate).await
    }
}

// ============================================================================
// Scoring
// ============================================================================

/// Hard rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardReason {
    /// One title is a short token subset of the other
    SubsetMismatch,
    /// Title similarity under the configured floor
    TitleFloor,
}

impl GuardReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardReason::SubsetMismatch => "subset_mismatch",
            GuardReason::TitleFloor => "title_floor",
        }
    }
}

impl fmt::Display for GuardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named additive score delta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreAdjustment {
    pub name: String,
    pub delta: f64,
}

impl ScoreAdjustment {
    pub fn new(name: impl Into<String>, delta: f64) -> Self {
        Self {
            name: name.into(),
            delta,
        }
    }
}

/// Explanation of one (track, candidate) score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Title similarity (0-100)
    pub title_sim: f64,
    /// Artist similarity (0-100); 0 when either side has no artist
    pub artist_sim: f64,
    /// Weighted combination before bonuses and penalties
    pub base_score: f64,
    pub bonuses: Vec<ScoreAdjustment>,
    /// Penalties; deltas are stored as positive magnitudes
    pub penalties: Vec<ScoreAdjustment>,
    pub final_score: f64,
    pub guard_failed: Option<GuardReason>,
}

impl ScoreBreakdown {
    pub fn is_rejected(&self) -> bool {
        self.guard_failed.is_some()
    }

    /// One-line human readable summary
    pub fn explain(&self) -> String {
        let mut out = format!(
            "title {:.1} / artist {:.1}",
            self.title_sim, self.artist_sim
        );
        if let Some(reason) = self.guard_failed {
            out.push_str(&format!(" -> rejected ({})", reason));
            return out;
        }
        out.push_str(&format!(" -> base {:.1}", self.base_score));
        for bonus in &self.bonuses {
            out.push_str(&format!(" +{} {:.1}", bonus.name, bonus.delta));
        }
        for penalty in &self.penalties {
            out.push_str(&format!(" -{} {:.1}", penalty.name, penalty.delta));
        }
        out.push_str(&format!(" = {:.1}", self.final_score));
        out
    }
}

/// Display tier derived from a final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Classify a final score under `config`
    pub fn classify(final_score: f64, config: &MatchConfig) -> Self {
        if final_score >= config.early_exit_score {
            Confidence::High
        } else if final_score >= config.min_accept_score {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Why the query loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EarlyExit,
    QueriesExhausted,
    TimeBudgetExceeded,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::EarlyExit => "early_exit",
            StopReason::QueriesExhausted => "queries_exhausted",
            StopReason::TimeBudgetExceeded => "time_budget_exceeded",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Which pass produced an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPass {
    #[default]
    Initial,
    ReSearch,
}

/// One scored candidate in the audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCandidate {
    /// Rank of the query that returned this candidate
    pub query_rank: u32,
    /// Position within that query's results
    pub position: usize,
    pub candidate: CandidateRaw,
    pub score: ScoreBreakdown,
}

/// A query whose fetch failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub query: SearchQuery,
    pub message: String,
}

/// Result of searching for one track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub track_id: String,
    pub matched: bool,
    pub best_candidate: Option<CandidateRaw>,
    pub best_score: Option<ScoreBreakdown>,
    pub candidates_evaluated: Vec<EvaluatedCandidate>,
    pub queries_issued: Vec<SearchQuery>,
    pub fetch_failures: Vec<FetchFailure>,
    pub stop_reason: StopReason,
    pub pass: SearchPass,
    pub elapsed_ms: u64,
}

impl MatchOutcome {
    /// Outcome for a track that never issued a query
    pub fn unsearched(track_id: impl Into<String>, stop_reason: StopReason, pass: SearchPass) -> Self {
        Self {
            track_id: track_id.into(),
            matched: false,
            best_candidate: None,
            best_score: None,
            candidates_evaluated: Vec::new(),
            queries_issued: Vec::new(),
            fetch_failures: Vec::new(),
            stop_reason,
            pass,
            elapsed_ms: 0,
        }
    }

    pub fn best_final_score(&self) -> Option<f64> {
        self.best_score.as_ref().map(|s| s.final_score)
    }

    /// Display tier of the best candidate; `None` when nothing was found
    pub fn confidence(&self, config: &MatchConfig) -> Option<Confidence> {
        self.best_final_score()
            .map(|score| Confidence::classify(score, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validated_trims_and_drops_empty_optionals() {
        let raw = CandidateRaw {
            title: "  Archangel ".to_string(),
            artists: " Burial ".to_string(),
            key: Some("  ".to_string()),
            label: Some("Hyperdub".to_string()),
            bpm: Some(-3.0),
            genres: vec!["".to_string(), "UK Garage".to_string()],
            ..Default::default()
        };

        let c = raw.validated().unwrap();
        assert_eq!(c.title, "Archangel");
        assert_eq!(c.artists, "Burial");
        assert_eq!(c.key, None);
        assert_eq!(c.label.as_deref(), Some("Hyperdub"));
        assert_eq!(c.bpm, None);
        assert_eq!(c.genres, vec!["UK Garage".to_string()]);
    }

    #[test]
    fn validated_rejects_missing_title() {
        assert!(CandidateRaw::new("   ", "Someone", "u").validated().is_none());
    }

    #[test]
    fn confidence_tiers_follow_thresholds() {
        let config = MatchConfig::default();
        assert_eq!(Confidence::classify(config.early_exit_score, &config), Confidence::High);
        assert_eq!(Confidence::classify(config.min_accept_score, &config), Confidence::Medium);
        assert_eq!(Confidence::classify(config.min_accept_score - 0.1, &config), Confidence::Low);
    }

    #[test]
    fn confidence_is_monotonic_in_score() {
        let config = MatchConfig::default();
        let mut previous = Confidence::Low;
        for step in 0..=240 {
            let score = step as f64 * 0.5;
            let tier = Confidence::classify(score, &config);
            assert!(tier >= previous, "tier dropped at score {}", score);
            previous = tier;
        }
    }

    #[test]
    fn explain_lists_adjustments() {
        let breakdown = ScoreBreakdown {
            title_sim: 100.0,
            artist_sim: 100.0,
            base_score: 100.0,
            bonuses: vec![ScoreAdjustment::new("remixer_match", 5.0)],
            penalties: vec![],
            final_score: 105.0,
            guard_failed: None,
        };
        assert_eq!(
            breakdown.explain(),
            "title 100.0 / artist 100.0 -> base 100.0 +remixer_match 5.0 = 105.0"
        );
    }

    #[test]
    fn explain_reports_guard() {
        let breakdown = ScoreBreakdown {
            title_sim: 70.0,
            artist_sim: 0.0,
            base_score: 0.0,
            bonuses: vec![],
            penalties: vec![],
            final_score: 0.0,
            guard_failed: Some(GuardReason::SubsetMismatch),
        };
        assert!(breakdown.explain().ends_with("rejected (subset_mismatch)"));
    }

    #[test]
    fn track_list_rejects_duplicate_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tracks.json");
        std::fs::write(
            &path,
            r#"[{"id": "a", "title": "Home"}, {"id": "a", "title": "Sun", "artists": "Solomun"}]"#,
        )
        .unwrap();

        let err = InputTrack::load_list(&path).unwrap_err();
        assert!(err.to_string().contains("Duplicate track id 'a'"));
    }

    #[test]
    fn track_list_defaults_missing_artists() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tracks.json");
        std::fs::write(&path, r#"[{"id": "a", "title": "Home"}]"#).unwrap();

        let tracks = InputTrack::load_list(&path).unwrap();
        assert_eq!(tracks, vec![InputTrack::new("a", "Home", "")]);
    }

    #[test]
    fn unsearched_outcome_is_unmatched() {
        let outcome = MatchOutcome::unsearched("t1", StopReason::QueriesExhausted, SearchPass::Initial);
        assert!(!outcome.matched);
        assert!(outcome.queries_issued.is_empty());
        assert_eq!(outcome.confidence(&MatchConfig::default()), None);
    }
}
