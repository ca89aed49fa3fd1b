//! Error types for the analysis cache
//!
//! None of these reach a user: `get` turns them into misses and callers of
//! `put` log and drop them.

use advisor_primitives::KeyError;

/// Cache-layer errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CacheError {
    /// Key could not be derived from the request
    #[error("cannot derive cache key: {0}")]
    Key(#[from] KeyError),

    /// Quality estimate was NaN or infinite
    #[error("quality must be a finite number, got {0}")]
    InvalidQuality(f64),

    /// Configuration rejected at construction time
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
}
