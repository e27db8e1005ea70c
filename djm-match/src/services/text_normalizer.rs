//! Text normalization for comparison and querying
//!
//! All functions are pure and total: any input, including the empty string,
//! produces a value.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Bracketed annotation: `(...)`, `[...]` or `{...}`
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[\{]([^\(\)\[\]\{\}]*)[\)\]\}]").expect("valid regex"));

/// Purely numeric/punctuation tags such as `[8-9]`, `(2)` or `[04:31]`
static NUMERIC_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\d\s\-/.:,#]*$").expect("valid regex"));

/// Generic qualifiers that never identify a recording
static GENERIC_QUALIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)^\s*(?:
            explicit|clean|dirty|censored
            |(?:\d{4}\s+)?(?:digital(?:ly)?\s+)?remaster(?:ed)?(?:\s+\d{4})?
            |official(?:\s+(?:music\s+)?(?:video|audio))?
            |(?:official\s+)?(?:lyric|music)\s+video
            |free\s+(?:download|dl)|premiere|out\s+now|hq|hd|4k
            |bonus(?:\s+track)?|preview|snippet
            |(?:feat\.?|ft\.?|featuring|with)\s+.+
        )\s*$",
    )
    .expect("valid regex")
});

/// Unbracketed featured-artist credit, up to the next bracket
static FEAT_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s+[^\(\)\[\]\{\}]*").expect("valid regex")
});

/// Leading track number: `01 - `, `3. `, `12_`
static TRACK_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d{1,3}\s*[.\-_)]\s+").expect("valid regex"));

/// Lower-case, strip diacritics, collapse whitespace
pub fn normalize(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.nfkd() {
        if is_combining_mark(c) {
            continue;
        }
        match fold_special(c) {
            Some(replacement) => folded.push_str(replacement),
            None => folded.extend(c.to_lowercase()),
        }
    }
    collapse_whitespace(&folded)
}

/// Letters NFKD does not decompose into a base letter
fn fold_special(c: char) -> Option<&'static str> {
    Some(match c {
        'ø' | 'Ø' => "o",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ß' => "ss",
        'đ' | 'Đ' => "d",
        'ł' | 'Ł' => "l",
        'þ' | 'Þ' => "th",
        'ı' => "i",
        '\u{2019}' | '\u{2018}' | '`' | '\u{00B4}' => "'",
        '\u{2013}' | '\u{2014}' => "-",
        _ => return None,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized title suitable for searching and comparison
///
/// Removes numeric tags, generic qualifiers, featured-artist credits and
/// leading track numbers. Mix descriptors such as `(Extended Mix)` are kept;
/// callers run the mix phrase parser first when they need the bare title.
/// Remaining punctuation becomes whitespace and apostrophes are dropped.
pub fn sanitize_title_for_search(text: &str) -> String {
    // Feature credits first: the pattern stops at the next bracket
    let without_feat = FEAT_SUFFIX.replace_all(text, " ");
    let without_tags = BRACKETED.replace_all(&without_feat, |caps: &regex::Captures| {
        let inner = &caps[1];
        if NUMERIC_TAG.is_match(inner) || GENERIC_QUALIFIER.is_match(inner) {
            " ".to_string()
        } else {
            format!(" {} ", inner)
        }
    });
    let without_number = TRACK_NUMBER_PREFIX.replace(&without_tags, "");

    strip_punctuation(&normalize(&without_number))
}

/// Normalized word tokens in order, duplicates preserved
pub fn word_tokens(text: &str) -> Vec<String> {
    normalize(text)
        .replace('\'', "")
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Punctuation to spaces, apostrophes removed, whitespace collapsed
fn strip_punctuation(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '\'')
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    collapse_whitespace(&cleaned)
}
