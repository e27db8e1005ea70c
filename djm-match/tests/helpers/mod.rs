//! Test Helper Utilities
//!
//! Shared fixtures and candidate source doubles for djm-match integration tests

#![allow(dead_code)]

pub mod log_capture;
pub mod scripted_source;

#[allow(unused_imports)]
pub use log_capture::{capture_logs, LogCapture};
#[allow(unused_imports)]
pub use scripted_source::ScriptedSource;

use djm_match::{CandidateRaw, InputTrack};

/// Catalog entry with a URL derived from `slug`
pub fn candidate(title: &str, artists: &str, slug: &str) -> CandidateRaw {
    CandidateRaw::new(title, artists, format!("https://catalog.test/track/{slug}"))
}

pub fn track(id: &str, title: &str, artists: &str) -> InputTrack {
    InputTrack::new(id, title, artists)
}

/// Small catalog used across the end-to-end tests
pub fn sample_catalog() -> Vec<CandidateRaw> {
    vec![
        candidate("Never Sleep Again (Extended Mix)", "Solomun", "nsa-extended"),
        candidate("Never Sleep Again", "Solomun, Keinemusik", "nsa-keinemusik"),
        candidate("Son of Sun", "Solomun", "son-of-sun"),
        candidate("Cola (Original Mix)", "CamelPhat, Elderbrook", "cola"),
        candidate("Home", "Kölsch", "home"),
        candidate("Opus (Four Tet Remix)", "Eric Prydz, Four Tet", "opus-four-tet"),
    ]
}
