//! Error types for primitives

/// Errors while deriving a cache key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Analysis type was empty after trimming
    #[error("analysis type must not be empty")]
    EmptyAnalysisType,

    /// Hex string did not decode into a 32-byte key
    #[error("invalid key encoding: {0}")]
    InvalidEncoding(String),
}
