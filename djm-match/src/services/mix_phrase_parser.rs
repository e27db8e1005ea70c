//! Mix descriptor and remixer extraction
//!
//! Separates a title such as `Never Sleep Again (Keinemusik Remix)` into the
//! bare title, the mix phrase and the remixer. Only a closed vocabulary of
//! descriptors is recognized; text is returned as written (not normalized).

use super::text_normalizer::normalize;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Descriptor words that make a bracket group or dash suffix a mix phrase
const DESCRIPTOR: &str = r"(?:re-?mix(?:ed)?|rmx|mix(?:ed)?|edit(?:ed)?|re-?work(?:ed)?|dub|version|vip|bootleg|flip|re-?fix|remake|instrumental|acapella|a\s+cappella)";

/// Any single-level bracket group
static BRACKET_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\(\[]([^\(\)\[\]]*)[\)\]]").expect("valid regex"));

static HAS_DESCRIPTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b{DESCRIPTOR}\b")).expect("valid regex"));

/// `Title - Some Remix` form
static DASH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<bare>.+?)\s+[-\u{2013}\u{2014}]\s+(?P<phrase>[^-\u{2013}\u{2014}\(\)\[\]]+?)\s*$")
        .expect("valid regex")
});

/// `<Name> Remix`, `<Name> Edit`, ...
static NAMED_DESCRIPTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<name>.+?)(?:'s)?\s+(?:re-?mix|rmx|edit|re-?work|dub|bootleg|flip|re-?fix|remake|vip|mix)\b.*$")
        .expect("valid regex")
});

/// `Remixed by <Name>`
static BY_DESCRIPTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:re-?mix(?:ed)?|edit(?:ed)?|mix(?:ed)?|rework(?:ed)?)\s+by\s+(?P<name>.+)$")
        .expect("valid regex")
});

/// Featured-artist credit anywhere in a title
static FEAT_CREDIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s\(\[])(?:feat\.?|ft\.?|featuring)\s+(?P<names>[^\(\)\[\]]+)").expect("valid regex")
});

/// Separators inside an artist field
static ARTIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:,|;|&|\+|/)\s*|\s+(?:x|vs\.?|feat\.?|ft\.?|featuring)\s+").expect("valid regex")
});

/// Words that qualify a mix without naming anyone
const GENERIC_MIX_WORDS: &[&str] = &[
    "original", "extended", "radio", "club", "dub", "instrumental", "album", "single", "short",
    "long", "main", "vocal", "clean", "dirty", "explicit", "acapella", "version", "edit", "mix",
    "remix", "rmx", "vip", "re", "deluxe", "special", "bonus", "live", "studio", "alternate",
    "alt", "reprise", "continuous", "dj", "full", "length", "dance", "intro", "outro", "mixed",
    "remaster", "remastered", "rework", "the", "a", "an", "official", "new", "inch", "12", "7",
    "12\"", "7\"", "12''", "7''",
];

/// Title split into bare title and mix descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixInfo {
    pub bare_title: String,
    pub mix_phrase: Option<String>,
    pub remixer: Option<String>,
}

impl MixInfo {
    fn unrecognized(title: &str) -> Self {
        Self {
            bare_title: title.to_string(),
            mix_phrase: None,
            remixer: None,
        }
    }
}

/// Extract the mix phrase and remixer from a title
///
/// The last bracket group containing a descriptor wins; otherwise a
/// `Title - <descriptor phrase>` suffix is tried. When nothing is recognized
/// the input comes back unchanged as `bare_title`.
pub fn extract_mix_info(title: &str) -> MixInfo {
    if let Some(info) = extract_bracketed(title).or_else(|| extract_dash_suffix(title)) {
        return info;
    }
    MixInfo::unrecognized(title)
}

fn extract_bracketed(title: &str) -> Option<MixInfo> {
    let group = BRACKET_GROUP
        .captures_iter(title)
        .filter(|caps| HAS_DESCRIPTOR.is_match(&caps[1]))
        .last()?;

    let whole = group.get(0)?;
    let phrase = group[1].trim();
    let before = title[..whole.start()].trim_end();
    let after = title[whole.end()..].trim_start();
    let bare = format!("{before} {after}").trim().to_string();
    if bare.is_empty() || phrase.is_empty() {
        return None;
    }

    Some(MixInfo {
        bare_title: bare,
        mix_phrase: Some(phrase.to_string()),
        remixer: remixer_from_phrase(phrase),
    })
}

fn extract_dash_suffix(title: &str) -> Option<MixInfo> {
    let caps = DASH_SUFFIX.captures(title)?;
    let phrase = caps["phrase"].trim();
    if !HAS_DESCRIPTOR.is_match(phrase) {
        return None;
    }
    Some(MixInfo {
        bare_title: caps["bare"].trim().to_string(),
        mix_phrase: Some(phrase.to_string()),
        remixer: remixer_from_phrase(phrase),
    })
}

/// Name part of a mix phrase, with generic qualifiers removed
fn remixer_from_phrase(phrase: &str) -> Option<String> {
    let name = BY_DESCRIPTOR
        .captures(phrase)
        .or_else(|| NAMED_DESCRIPTOR.captures(phrase))
        .map(|caps| caps["name"].trim().to_string())?;

    let mut words: Vec<&str> = name.split_whitespace().collect();
    while let Some(last) = words.last() {
        if is_generic_word(last) {
            words.pop();
        } else {
            break;
        }
    }
    if words.is_empty() || words.iter().all(|w| is_generic_word(w)) {
        return None;
    }
    Some(words.join(" "))
}

fn is_generic_word(word: &str) -> bool {
    let lower = normalize(word);
    lower.chars().all(|c| c.is_ascii_digit()) || GENERIC_MIX_WORDS.contains(&lower.as_str())
}

/// Split an artist field into individual names, in order
pub fn split_artists(artists: &str) -> Vec<String> {
    ARTIST_SEPARATOR
        .split(artists.trim())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Declared artist field followed by artist names recovered from the title
///
/// Recovered names come from a `<title> - <artist>` suffix, the remixer of
/// the mix phrase and featured-artist credits. Entries equal (after
/// normalization) to an earlier entry or to one of the declared names are
/// dropped.
pub fn merge_artist_candidates(title: &str, artists: &str) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();

    let declared = artists.trim();
    if !declared.is_empty() {
        merged.push(declared.to_string());
        seen.push(normalize(declared));
        seen.extend(split_artists(declared).iter().map(|n| normalize(n)));
    }

    let info = extract_mix_info(title);
    let mut recovered: Vec<String> = Vec::new();
    if let Some((_, tail)) = split_dash(&info.bare_title) {
        let name = strip_credits(tail);
        if !name.is_empty() {
            recovered.push(name.to_string());
        }
    }
    if let Some(remixer) = info.remixer {
        recovered.push(remixer);
    }
    recovered.extend(featured_artists(title));

    for name in recovered {
        let key = normalize(&name);
        if key.is_empty() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        merged.push(name);
    }
    merged
}

/// Names credited with `feat.`/`ft.`/`featuring` anywhere in a title
pub fn featured_artists(title: &str) -> Vec<String> {
    FEAT_CREDIT
        .captures_iter(title)
        .flat_map(|caps| split_artists(&caps["names"]))
        .collect()
}

/// Title part and artist names of a bare title
///
/// When the declared artist field is empty, a `<title> - <artist>` tail is
/// taken as the artist and cut from the title.
pub fn resolve_title_artists<'a>(bare_title: &'a str, artists: &str) -> (&'a str, Vec<String>) {
    let declared = split_artists(artists);
    if declared.is_empty() {
        if let Some((left, right)) = split_dash(bare_title) {
            let names = split_artists(strip_credits(right));
            if !names.is_empty() {
                return (left, names);
            }
        }
    }
    (bare_title, declared)
}

/// Artist text before any bracket group or featured-artist credit
fn strip_credits(text: &str) -> &str {
    let mut end = text.find(['(', '[']).unwrap_or(text.len());
    if let Some(m) = FEAT_CREDIT.find(&text[..end]) {
        end = m.start();
    }
    text[..end].trim()
}

/// Split `left - right` on the first spaced dash
fn split_dash(text: &str) -> Option<(&str, &str)> {
    ["-", "\u{2013}", "\u{2014}"]
        .iter()
        .filter_map(|dash| {
            let sep = format!(" {dash} ");
            text.find(&sep).map(|idx| (idx, sep.len()))
        })
        .min_by_key(|(idx, _)| *idx)
        .and_then(|(idx, len)| {
            let left = text[..idx].trim();
            let right = text[idx + len..].trim();
            (!left.is_empty() && !right.is_empty()).then_some((left, right))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_named_remix() {
        let info = extract_mix_info("Never Sleep Again (Keinemusik Remix)");
        assert_eq!(info.bare_title, "Never Sleep Again");
        assert_eq!(info.mix_phrase.as_deref(), Some("Keinemusik Remix"));
        assert_eq!(info.remixer.as_deref(), Some("Keinemusik"));
    }

    #[test]
    fn generic_mix_has_no_remixer() {
        for title in ["Track (Original Mix)", "Track (Extended Mix)", "Track [Radio Edit]", "Track (12\" Club Mix)"] {
            let info = extract_mix_info(title);
            assert_eq!(info.bare_title, "Track", "{title}");
            assert!(info.mix_phrase.is_some(), "{title}");
            assert_eq!(info.remixer, None, "{title}");
        }
    }

    #[test]
    fn trailing_qualifiers_stripped_from_remixer() {
        let info = extract_mix_info("Home (Solomun Extended Remix)");
        assert_eq!(info.remixer.as_deref(), Some("Solomun"));
    }

    #[test]
    fn remixed_by_form() {
        let info = extract_mix_info("Home (Remixed by Dixon)");
        assert_eq!(info.remixer.as_deref(), Some("Dixon"));
    }

    #[test]
    fn dash_suffix_form() {
        let info = extract_mix_info("Opus - Four Tet Remix");
        assert_eq!(info.bare_title, "Opus");
        assert_eq!(info.mix_phrase.as_deref(), Some("Four Tet Remix"));
        assert_eq!(info.remixer.as_deref(), Some("Four Tet"));
    }

    #[test]
    fn last_descriptor_group_wins() {
        let info = extract_mix_info("Cola (feat. Elderbrook) (Dixon Edit)");
        assert_eq!(info.bare_title, "Cola (feat. Elderbrook)");
        assert_eq!(info.remixer.as_deref(), Some("Dixon"));
    }

    #[test]
    fn unrecognized_title_unchanged() {
        for title in ["Son of Sun", "Mixmag Anthem (Live)", "  Spaced  ", "", "Title - Artist"] {
            let info = extract_mix_info(title);
            assert_eq!(info.bare_title, title);
            assert_eq!(info.mix_phrase, None);
            assert_eq!(info.remixer, None);
        }
    }

    #[test]
    fn descriptor_only_title_unchanged() {
        let info = extract_mix_info("(Original Mix)");
        assert_eq!(info.bare_title, "(Original Mix)");
        assert_eq!(info.mix_phrase, None);
    }

    #[test]
    fn split_artists_on_common_separators() {
        assert_eq!(split_artists("Solomun, Keinemusik"), vec!["Solomun", "Keinemusik"]);
        assert_eq!(split_artists("Kölsch x Dixon & Âme"), vec!["Kölsch", "Dixon", "Âme"]);
        assert_eq!(split_artists("A feat. B"), vec!["A", "B"]);
        assert!(split_artists("  ").is_empty());
    }

    #[test]
    fn merge_puts_declared_field_first() {
        let merged = merge_artist_candidates("Never Sleep Again (Keinemusik Remix)", "Solomun");
        assert_eq!(merged, vec!["Solomun", "Keinemusik"]);
    }

    #[test]
    fn merge_recovers_dash_artist_and_features() {
        let merged = merge_artist_candidates("Cola - CamelPhat (feat. Elderbrook)", "");
        assert_eq!(merged, vec!["CamelPhat", "Elderbrook"]);
    }

    #[test]
    fn merge_drops_duplicates_by_normalized_text() {
        let merged = merge_artist_candidates("Track (KEINEMUSIK Remix)", "Solomun, Keinemusik");
        assert_eq!(merged, vec!["Solomun, Keinemusik"]);
    }

    #[test]
    fn resolve_uses_dash_tail_only_without_declared_artist() {
        let (title, names) = resolve_title_artists("Cola - CamelPhat (feat. Elderbrook)", "");
        assert_eq!(title, "Cola");
        assert_eq!(names, vec!["CamelPhat"]);

        let (title, names) = resolve_title_artists("Cola - Live", "CamelPhat & Elderbrook");
        assert_eq!(title, "Cola - Live");
        assert_eq!(names, vec!["CamelPhat", "Elderbrook"]);
    }

    #[test]
    fn featured_artists_from_bracket_and_suffix() {
        assert_eq!(featured_artists("Cola (feat. Elderbrook)"), vec!["Elderbrook"]);
        assert_eq!(featured_artists("Lose Yourself ft. A & B"), vec!["A", "B"]);
        assert!(featured_artists("Left Feet").is_empty());
    }

    #[test]
    fn merge_with_nothing_to_add() {
        assert!(merge_artist_candidates("", "").is_empty());
        assert_eq!(merge_artist_candidates("Plain", "Artist"), vec!["Artist"]);
    }
}
