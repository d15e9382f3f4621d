//! Error types for preset lookups.

use thiserror::Error;

/// Errors that can occur when querying the preset catalog.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PresetError {
    /// No preset carries the requested profile key.
    #[error("stack preset profile not found: {0}")]
    NotFound(String),
}

/// Result type for preset operations.
pub type Result<T> = std::result::Result<T, PresetError>;
