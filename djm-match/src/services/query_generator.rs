//! Search query generation
//!
//! Produces the ordered, de-duplicated list of query strings tried for one
//! track. Full-title queries come first; title n-grams paired with the
//! primary artist follow, longest phrases first.

use super::mix_phrase_parser::{extract_mix_info, merge_artist_candidates, resolve_title_artists, split_artists};
use super::text_normalizer::{normalize, sanitize_title_for_search, word_tokens};
use crate::types::{InputTrack, SearchQuery};
use std::collections::HashSet;

/// Single-word n-grams that carry no search signal
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "and", "in", "on", "to", "at", "for", "is", "de", "la", "le", "el",
    "les", "der", "die", "das", "und",
];

/// Artist names available for querying
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArtistContext {
    /// First declared artist, or the first name recovered from the title
    primary: Option<String>,
    /// Remaining declared and recovered names, in order
    others: Vec<String>,
}

fn artist_context(track: &InputTrack) -> ArtistContext {
    let mut names: Vec<String> = split_artists(&track.artists);
    for recovered in merge_artist_candidates(&track.title, &track.artists) {
        for name in split_artists(&recovered) {
            if !names.iter().any(|n| normalize(n) == normalize(&name)) {
                names.push(name);
            }
        }
    }
    let mut names = names
        .into_iter()
        .map(|n| sanitize_title_for_search(&n))
        .filter(|n| !n.is_empty());
    ArtistContext {
        primary: names.next(),
        others: names.collect(),
    }
}

/// Ordered list of search queries for `track`
///
/// Deterministic given `(track, title_gram_max)`. Returns an empty list when
/// neither a title nor an artist is searchable.
pub fn make_search_queries(track: &InputTrack, title_gram_max: usize) -> Vec<SearchQuery> {
    let mix = extract_mix_info(&track.title);
    let (title_part, _) = resolve_title_artists(&mix.bare_title, &track.artists);
    let bare = sanitize_title_for_search(title_part);
    let artists = artist_context(track);
    let remixer = mix
        .remixer
        .as_deref()
        .map(sanitize_title_for_search)
        .filter(|r| !r.is_empty());
    let mix_phrase = mix
        .mix_phrase
        .as_deref()
        .map(sanitize_title_for_search)
        .filter(|p| !p.is_empty());

    let mut texts: Vec<String> = Vec::new();

    if bare.is_empty() {
        if let Some(primary) = &artists.primary {
            texts.push(primary.clone());
        }
        return finalize(texts);
    }

    // Full-title queries
    texts.push(join(&bare, artists.primary.as_deref()));
    if let Some(remixer) = &remixer {
        texts.push(join(&bare, Some(remixer)));
    } else if let Some(phrase) = &mix_phrase {
        texts.push(join(&bare, Some(phrase)));
    }
    for other in &artists.others {
        texts.push(join(&bare, Some(other)));
    }
    if artists.primary.is_some() {
        texts.push(bare.clone());
    }

    // Title n-grams, longest first, left to right
    let tokens = word_tokens(&bare);
    let max_n = title_gram_max.min(tokens.len());
    for n in (1..=max_n).rev() {
        for window in tokens.windows(n) {
            if n == 1 && STOPWORDS.contains(&window[0].as_str()) {
                continue;
            }
            let gram = window.join(" ");
            texts.push(join(&gram, artists.primary.as_deref()));
        }
    }

    finalize(texts)
}

fn join(text: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(s) if !s.is_empty() => format!("{text} {s}"),
        _ => text.to_string(),
    }
}

/// Drop duplicates (first occurrence wins) and assign ranks in order
fn finalize(texts: Vec<String>) -> Vec<SearchQuery> {
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .map(|t| normalize(&t))
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .enumerate()
        .map(|(rank, text)| SearchQuery {
            text,
            rank: rank as u32,
        })
        .collect()
}
