//! # DJM Common Library
//!
//! Shared code for the DJM crates:
//! - Error type
//! - Settings file resolution and loading
//! - Event types and the broadcast event bus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{EventBus, MatchEvent, ProgressEvent};
