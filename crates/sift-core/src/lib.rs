//! Core types, configuration, and error handling for Sift.
//!
//! This crate provides the shared foundation used by the other Sift crates:
//! - [`SearchMatch`] and [`SearchResults`]: the validated, immutable result model
//! - [`SearchError`] and the stage errors it wraps, using `thiserror`
//! - [`SiftConfig`]: configuration loaded from `.sift.toml`

mod config;
mod error;
mod types;

pub use config::{LlmConfig, SearchConfig, SiftConfig, CONFIG_FILE_NAME};
pub use error::{BackendError, ExtractionError, ParseError, ResponseError, SearchError, SiftError};
pub use types::{OutputFormat, SearchMatch, SearchResults};

/// A convenience `Result` type for Sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;
