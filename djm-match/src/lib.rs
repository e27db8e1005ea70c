//! djm-match library interface
//!
//! Matching and ranking engine for DJ track enrichment: normalizes track
//! titles, generates search queries, scores catalog candidates and picks the
//! best match per track, with an optional relaxed re-search pass.

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use crate::config::{ConfigValidationError, MatchConfig, MatcherSettings};
pub use crate::error::{MatchError, MatchResult};
pub use crate::services::{
    run_batch, BatchReport, BatchRunner, CatalogSource, ReSearchCoordinator, RunSummary,
    SearchOrchestrator, ThrottledSource,
};
pub use crate::types::{
    CandidateRaw, CandidateSource, Confidence, FetchError, InputTrack, MatchOutcome,
    ScoreBreakdown, SearchPass, SearchQuery, StopReason,
};
