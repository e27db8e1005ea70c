//! Candidate scoring
//!
//! Scores one (track, candidate) pair into a [`ScoreBreakdown`]:
//!
//! 1. Split both titles into bare title and mix phrase, sanitize the bare titles
//! 2. Fuzzy title and artist similarity (0-100)
//! 3. Guards: subset mismatch, then title floor (rejected pairs score 0)
//! 4. Weighted base score, then named bonuses and penalties
//! 5. Clamp into `[0, score_cap]`
//!
//! Scoring is pure: the same inputs always produce the same breakdown.

use super::mix_phrase_parser::{extract_mix_info, featured_artists, resolve_title_artists};
use super::text_normalizer::{sanitize_title_for_search, word_tokens};
use crate::config::MatchConfig;
use crate::types::{CandidateRaw, GuardReason, InputTrack, ScoreAdjustment, ScoreBreakdown};
use std::collections::BTreeMap;

/// Similarity at which a credited artist counts as the track's remixer
const REMIXER_MATCH_RATIO: f64 = 90.0;

/// Comparable view of one side of a pair
#[derive(Debug, Clone)]
struct ScoredSide {
    title: String,
    mix_phrase: Option<String>,
    remixer: Option<String>,
    artists: Vec<String>,
}

impl ScoredSide {
    fn new(title: &str, artists: &str, include_features: bool) -> Self {
        let mix = extract_mix_info(title);
        let (title_part, mut names) = resolve_title_artists(&mix.bare_title, artists);
        if include_features {
            names.extend(featured_artists(title));
        }

        let mut artists: Vec<String> = Vec::new();
        for name in names {
            let clean = sanitize_title_for_search(&name);
            if !clean.is_empty() && !artists.contains(&clean) {
                artists.push(clean);
            }
        }

        Self {
            title: sanitize_title_for_search(title_part),
            mix_phrase: clean_optional(mix.mix_phrase.as_deref()),
            remixer: clean_optional(mix.remixer.as_deref()),
            artists,
        }
    }
}

fn clean_optional(text: Option<&str>) -> Option<String> {
    text.map(sanitize_title_for_search).filter(|t| !t.is_empty())
}

/// Fuzzy ratio (0-100) of two sanitized strings
///
/// Best of plain and token-sorted normalized Levenshtein, so reordered words
/// still compare equal. Empty input on either side scores 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let direct = strsim::normalized_levenshtein(a, b);
    let sorted = strsim::normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b));
    direct.max(sorted) * 100.0
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Mean over track artists of the best ratio against any candidate artist
fn artist_similarity(track_artists: &[String], candidate_artists: &[String]) -> f64 {
    if track_artists.is_empty() || candidate_artists.is_empty() {
        return 0.0;
    }
    let total: f64 = track_artists
        .iter()
        .map(|t| {
            candidate_artists
                .iter()
                .map(|c| similarity(t, c))
                .fold(0.0, f64::max)
        })
        .sum();
    total / track_artists.len() as f64
}

/// Word counts of a sanitized title
fn token_counts(title: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for token in word_tokens(title) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// True when the shorter title's words are a small strict sub-multiset of the longer one's
///
/// Repeated words count, so "Bam" is a subset of "Bam Bam".
fn is_subset_mismatch(track_title: &str, candidate_title: &str, ratio_threshold: f64) -> bool {
    let a = token_counts(track_title);
    let b = token_counts(candidate_title);
    let a_len: usize = a.values().sum();
    let b_len: usize = b.values().sum();
    if a_len == 0 || b_len == 0 || a_len == b_len {
        return false;
    }
    let ((shorter, shorter_len), (longer, longer_len)) = if a_len < b_len {
        ((&a, a_len), (&b, b_len))
    } else {
        ((&b, b_len), (&a, a_len))
    };
    let contained = shorter
        .iter()
        .all(|(token, count)| longer.get(token).is_some_and(|n| n >= count));
    contained && (shorter_len as f64 / longer_len as f64) < ratio_threshold
}

/// Score `candidate` against `track`
pub fn score(track: &InputTrack, candidate: &CandidateRaw, config: &MatchConfig) -> ScoreBreakdown {
    let ours = ScoredSide::new(&track.title, &track.artists, false);
    let theirs = ScoredSide::new(&candidate.title, &candidate.artists, true);

    let title_sim = similarity(&ours.title, &theirs.title);
    let artist_sim = artist_similarity(&ours.artists, &theirs.artists);

    let guard = if config.subset_guard_enabled
        && is_subset_mismatch(&ours.title, &theirs.title, config.subset_ratio_threshold)
    {
        Some(GuardReason::SubsetMismatch)
    } else if title_sim < config.title_sim_floor {
        Some(GuardReason::TitleFloor)
    } else {
        None
    };

    if let Some(reason) = guard {
        return ScoreBreakdown {
            title_sim,
            artist_sim,
            base_score: 0.0,
            bonuses: Vec::new(),
            penalties: Vec::new(),
            final_score: 0.0,
            guard_failed: Some(reason),
        };
    }

    // Without a declared artist the title carries the whole score
    let base_score = if ours.artists.is_empty() {
        title_sim
    } else {
        let weights = config.title_weight + config.artist_weight;
        ((config.title_weight * title_sim + config.artist_weight * artist_sim) / weights).min(100.0)
    };

    let mut bonuses = Vec::new();
    let mut penalties = Vec::new();

    let remixer_matched = ours.remixer.as_deref().is_some_and(|remixer| {
        theirs.remixer.as_deref() == Some(remixer)
            || theirs
                .artists
                .iter()
                .any(|a| similarity(remixer, a) >= REMIXER_MATCH_RATIO)
    });
    if remixer_matched {
        bonuses.push(ScoreAdjustment::new("remixer_match", config.remixer_match_bonus));
    }

    match (&ours.mix_phrase, &theirs.mix_phrase) {
        (Some(ours_mix), Some(theirs_mix)) => {
            if ours_mix == theirs_mix {
                bonuses.push(ScoreAdjustment::new("mix_match", config.mix_match_bonus));
            } else if !remixer_matched {
                penalties.push(ScoreAdjustment::new("mix_mismatch", config.mix_mismatch_penalty));
            }
        }
        // A remix scored against an uncredited plain version
        (Some(_), None) if ours.remixer.is_some() && !remixer_matched => {
            penalties.push(ScoreAdjustment::new(
                "remixer_missing",
                config.remixer_missing_penalty,
            ));
        }
        _ => {}
    }

    if !ours.artists.is_empty() && !theirs.artists.is_empty() && artist_sim < config.artist_sim_floor {
        penalties.push(ScoreAdjustment::new(
            "artist_mismatch",
            config.artist_mismatch_penalty,
        ));
    }

    let total_bonus: f64 = bonuses.iter().map(|b| b.delta).sum();
    let total_penalty: f64 = penalties.iter().map(|p| p.delta).sum();
    let final_score = (base_score + total_bonus - total_penalty).clamp(0.0, config.score_cap);

    ScoreBreakdown {
        title_sim,
        artist_sim,
        base_score,
        bonuses,
        penalties,
        final_score,
        guard_failed: None,
    }
}
