//! Error types for djm-match
//!
//! Per-track failures never surface here: they degrade into an unmatched
//! [`MatchOutcome`](crate::types::MatchOutcome) with an audit trail. Only
//! problems detected before any track is processed are returned as errors.

use crate::config::ConfigValidationError;
use thiserror::Error;

/// Run-level error
#[derive(Debug, Error)]
pub enum MatchError {
    /// Configuration contract violated (caller bug, fails fast)
    #[error(transparent)]
    InvalidConfig(#[from] ConfigValidationError),

    /// Worker count of zero passed to a runner
    #[error("Invalid worker count: {0} (must be at least 1)")]
    InvalidWorkers(usize),

    /// djm-common error (settings or input loading)
    #[error("Common error: {0}")]
    Common(#[from] djm_common::Error),
}

/// Convenience result type
pub type MatchResult<T> = Result<T, MatchError>;
