//! Matching configuration
//!
//! [`MatchConfig`] is an explicit, immutable value passed to every matching
//! call. Presets provide the numeric bundles; a settings file may override
//! individual fields on top of a preset.
//!
//! Settings file layout:
//!
//! ```toml
//! preset = "thorough"
//!
//! [matching]          # overrides for the initial pass
//! min_accept_score = 72.0
//!
//! [research]          # overrides on top of the "relaxed" preset
//! max_candidates_per_query = 60
//!
//! [runner]
//! track_workers = 4
//!
//! [logging]
//! level = "debug"
//! ```

use djm_common::config::{load_toml_file, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Names accepted by [`MatchConfig::preset`]
pub const PRESET_NAMES: [&str; 4] = ["fast", "balanced", "thorough", "relaxed"];

/// Configuration contract violations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("Unknown preset '{0}' (expected one of: fast, balanced, thorough, relaxed)")]
    UnknownPreset(String),

    #[error("Invalid configuration: {}", .0.join("; "))]
    Violations(Vec<String>),
}

/// Thresholds and scoring constants for one matching pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// A best candidate at or above this score is an accepted match
    pub min_accept_score: f64,
    /// Score that allows stopping the query loop early (also the "high" tier)
    pub early_exit_score: f64,
    /// Queries that must be issued before an early exit is allowed
    pub min_queries_before_exit: usize,
    /// Candidates scored per query
    pub max_candidates_per_query: usize,
    /// Wall-clock budget per track, in seconds
    pub time_budget_secs: f64,
    /// Longest title n-gram turned into a sub-query
    pub title_gram_max: usize,
    /// Artist similarity below this (with a declared artist) is penalized
    pub artist_sim_floor: f64,
    /// Title similarity below this rejects the candidate
    pub title_sim_floor: f64,
    pub subset_guard_enabled: bool,
    /// Shorter/longer token-count ratio under which a strict subset is rejected
    pub subset_ratio_threshold: f64,
    /// Weight of title similarity in the base score
    pub title_weight: f64,
    /// Weight of artist similarity in the base score
    pub artist_weight: f64,
    /// Both sides carry the same mix descriptor
    pub mix_match_bonus: f64,
    /// The track's remixer is credited on the candidate
    pub remixer_match_bonus: f64,
    /// Both sides carry a mix descriptor and they differ
    pub mix_mismatch_penalty: f64,
    /// Declared artist present but candidate artist similarity under the floor
    pub artist_mismatch_penalty: f64,
    /// Subtracted when the track names a remixer but the candidate is an uncredited plain version
    pub remixer_missing_penalty: f64,
    /// Upper clamp of the final score
    pub score_cap: f64,
    /// Concurrent candidate hydrations per query
    pub fetch_workers: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_accept_score: 70.0,
            early_exit_score: 90.0,
            min_queries_before_exit: 2,
            max_candidates_per_query: 25,
            time_budget_secs: 45.0,
            title_gram_max: 3,
            artist_sim_floor: 35.0,
            title_sim_floor: 55.0,
            subset_guard_enabled: true,
            subset_ratio_threshold: 0.6,
            title_weight: 0.7,
            artist_weight: 0.3,
            mix_match_bonus: 5.0,
            remixer_match_bonus: 5.0,
            mix_mismatch_penalty: 8.0,
            artist_mismatch_penalty: 25.0,
            remixer_missing_penalty: 15.0,
            score_cap: 120.0,
            fetch_workers: 4,
        }
    }
}

impl MatchConfig {
    /// Resolve a named preset
    ///
    /// - `fast`: fewer queries and candidates, short budget
    /// - `balanced`: the defaults
    /// - `thorough`: more n-grams and candidates, longer budget
    /// - `relaxed`: wide search with a lower acceptance bar, used for re-search
    pub fn preset(name: &str) -> Result<Self, ConfigValidationError> {
        let base = Self::default();
        match name.trim().to_lowercase().as_str() {
            "fast" => Ok(Self {
                min_queries_before_exit: 1,
                max_candidates_per_query: 10,
                time_budget_secs: 15.0,
                title_gram_max: 2,
                fetch_workers: 2,
                ..base
            }),
            "balanced" => Ok(base),
            "thorough" => Ok(Self {
                early_exit_score: 95.0,
                min_queries_before_exit: 3,
                max_candidates_per_query: 40,
                time_budget_secs: 90.0,
                title_gram_max: 4,
                fetch_workers: 6,
                ..base
            }),
            "relaxed" => Ok(Self {
                min_accept_score: 60.0,
                early_exit_score: 92.0,
                min_queries_before_exit: 3,
                max_candidates_per_query: 50,
                time_budget_secs: 90.0,
                title_gram_max: 4,
                title_sim_floor: 45.0,
                artist_sim_floor: 25.0,
                ..base
            }),
            _ => Err(ConfigValidationError::UnknownPreset(name.to_string())),
        }
    }

    /// Per-track time budget
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeded.
    pub fn time_budget(&self) -> Duration {
        // Saturates past Duration::MAX
        Duration::try_from_secs_f64(self.time_budget_secs).unwrap_or(Duration::MAX)
    }

    /// Check every contract; reports all violations at once
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let mut violations = Vec::new();

        let scores = [
            ("min_accept_score", self.min_accept_score),
            ("early_exit_score", self.early_exit_score),
            ("artist_sim_floor", self.artist_sim_floor),
            ("title_sim_floor", self.title_sim_floor),
            ("mix_match_bonus", self.mix_match_bonus),
            ("remixer_match_bonus", self.remixer_match_bonus),
            ("mix_mismatch_penalty", self.mix_mismatch_penalty),
            ("artist_mismatch_penalty", self.artist_mismatch_penalty),
            ("remixer_missing_penalty", self.remixer_missing_penalty),
            ("title_weight", self.title_weight),
            ("artist_weight", self.artist_weight),
        ];
        for (name, value) in scores {
            if !value.is_finite() || value < 0.0 {
                violations.push(format!("{name} must be a non-negative number (got {value})"));
            }
        }

        if !self.time_budget_secs.is_finite() || self.time_budget_secs <= 0.0 {
            violations.push(format!(
                "time_budget_secs must be positive (got {})",
                self.time_budget_secs
            ));
        }
        if self.early_exit_score < self.min_accept_score {
            violations.push(format!(
                "early_exit_score ({}) must not be below min_accept_score ({})",
                self.early_exit_score, self.min_accept_score
            ));
        }
        if !self.score_cap.is_finite() || self.score_cap < 100.0 {
            violations.push(format!("score_cap must be at least 100 (got {})", self.score_cap));
        }
        if !(self.subset_ratio_threshold.is_finite()
            && self.subset_ratio_threshold > 0.0
            && self.subset_ratio_threshold <= 1.0)
        {
            violations.push(format!(
                "subset_ratio_threshold must be in (0, 1] (got {})",
                self.subset_ratio_threshold
            ));
        }
        if self.title_weight + self.artist_weight <= 0.0 {
            violations.push("title_weight + artist_weight must be positive".to_string());
        }
        if self.min_queries_before_exit == 0 {
            violations.push("min_queries_before_exit must be at least 1".to_string());
        }
        if self.max_candidates_per_query == 0 {
            violations.push("max_candidates_per_query must be at least 1".to_string());
        }
        if self.title_gram_max == 0 {
            violations.push("title_gram_max must be at least 1".to_string());
        }
        if self.fetch_workers == 0 {
            violations.push("fetch_workers must be at least 1".to_string());
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ConfigValidationError::Violations(violations))
        }
    }
}

/// Optional per-field overrides from a settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfigOverrides {
    pub min_accept_score: Option<f64>,
    pub early_exit_score: Option<f64>,
    pub min_queries_before_exit: Option<usize>,
    pub max_candidates_per_query: Option<usize>,
    pub time_budget_secs: Option<f64>,
    pub title_gram_max: Option<usize>,
    pub artist_sim_floor: Option<f64>,
    pub title_sim_floor: Option<f64>,
    pub subset_guard_enabled: Option<bool>,
    pub subset_ratio_threshold: Option<f64>,
    pub title_weight: Option<f64>,
    pub artist_weight: Option<f64>,
    pub mix_match_bonus: Option<f64>,
    pub remixer_match_bonus: Option<f64>,
    pub mix_mismatch_penalty: Option<f64>,
    pub artist_mismatch_penalty: Option<f64>,
    pub remixer_missing_penalty: Option<f64>,
    pub score_cap: Option<f64>,
    pub fetch_workers: Option<usize>,
}

macro_rules! apply_overrides {
    ($target:expr, $overrides:expr, [$($field:ident),* $(,)?]) => {
        $(
            if let Some(value) = $overrides.$field {
                $target.$field = value;
            }
        )*
    };
}

impl MatchConfigOverrides {
    /// Apply every present override to `base`
    pub fn apply_to(&self, mut base: MatchConfig) -> MatchConfig {
        apply_overrides!(base, self, [
            min_accept_score,
            early_exit_score,
            min_queries_before_exit,
            max_candidates_per_query,
            time_budget_secs,
            title_gram_max,
            artist_sim_floor,
            title_sim_floor,
            subset_guard_enabled,
            subset_ratio_threshold,
            title_weight,
            artist_weight,
            mix_match_bonus,
            remixer_match_bonus,
            mix_mismatch_penalty,
            artist_mismatch_penalty,
            remixer_missing_penalty,
            score_cap,
            fetch_workers,
        ]);
        base
    }
}

/// Batch runner section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Tracks processed concurrently
    pub track_workers: usize,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self { track_workers: 4 }
    }
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSettings {
    /// Preset for the initial pass (default "balanced")
    pub preset: Option<String>,
    pub matching: MatchConfigOverrides,
    /// Overrides applied on top of the "relaxed" preset for re-search
    pub research: MatchConfigOverrides,
    pub runner: RunnerSettings,
    pub logging: LoggingConfig,
}

impl MatcherSettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> djm_common::Result<Self> {
        load_toml_file(path)
    }

    /// Initial-pass configuration; `preset_override` wins over the file's preset
    pub fn initial_config(&self, preset_override: Option<&str>) -> Result<MatchConfig, ConfigValidationError> {
        let name = preset_override
            .or(self.preset.as_deref())
            .unwrap_or("balanced");
        Ok(self.matching.apply_to(MatchConfig::preset(name)?))
    }

    /// Re-search configuration
    pub fn research_config(&self) -> Result<MatchConfig, ConfigValidationError> {
        Ok(self.research.apply_to(MatchConfig::preset("relaxed")?))
    }
}
