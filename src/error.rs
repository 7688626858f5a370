//! Error types for fefinder

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// fefinder errors
///
/// Only the `Setup` variant can abort an analysis, and only before any
/// processing starts. Everything that goes wrong mid-analysis degrades
/// gracefully and is reported through the log facade instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Setup error: {0}")]
    Setup(String),

    #[error("Invalid relevant-variables pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Malformed source unit {unit}: {reason}")]
    MalformedUnit { unit: String, reason: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_norway::Error),
}
