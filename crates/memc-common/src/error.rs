//! Error types for memc-load

use thiserror::Error;

/// Result type alias for memc-load operations
pub type Result<T> = std::result::Result<T, MemcError>;

/// Main error type shared across the workspace
#[derive(Error, Debug)]
pub enum MemcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode UserApps payload: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Round-trip mismatch: {0}")]
    RoundTrip(String),
}
