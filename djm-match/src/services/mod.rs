//! Matching engine services
//!
//! Bottom-up: text normalization, mix phrase parsing, query generation and
//! scoring are pure functions; the orchestrator, re-search coordinator and
//! batch runner drive them against a [`CandidateSource`](crate::types::CandidateSource).

pub mod batch_runner;
pub mod candidate_scorer;
pub mod catalog_source;
pub mod mix_phrase_parser;
pub mod progress;
pub mod query_generator;
pub mod research_coordinator;
pub mod search_orchestrator;
pub mod text_normalizer;
pub mod throttled_source;

pub use batch_runner::{run_batch, BatchReport, BatchRunner, ConfidenceCounts, RunSummary};
pub use candidate_scorer::{score, similarity};
pub use catalog_source::CatalogSource;
pub use mix_phrase_parser::{extract_mix_info, merge_artist_candidates, split_artists, MixInfo};
pub use progress::{NoopProgress, ProgressAggregator, ProgressHandle, ProgressSink, ProgressTotals};
pub use query_generator::make_search_queries;
pub use research_coordinator::ReSearchCoordinator;
pub use search_orchestrator::SearchOrchestrator;
pub use text_normalizer::{normalize, sanitize_title_for_search, word_tokens};
pub use throttled_source::ThrottledSource;
