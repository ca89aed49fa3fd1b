//! Error types for advisor core

use advisor_alerts::AlertError;
use advisor_cache::CacheError;
use advisor_metrics::ErrorCategory;
use std::path::PathBuf;

/// Failure reported by the AI-generation collaborator
///
/// Passed through the optimizer unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// Network or upstream failure
    #[error("generation transport error: {0}")]
    Transport(String),

    /// Credentials rejected
    #[error("generation not authorized: {0}")]
    Auth(String),

    /// Quota or rate limit exhausted
    #[error("generation quota exceeded: {0}")]
    Quota(String),
}

impl GenerationError {
    /// Metrics category this failure is counted under
    #[inline]
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::AiGeneration,
            Self::Auth(_) => ErrorCategory::Authentication,
            Self::Quota(_) => ErrorCategory::RateLimit,
        }
    }
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML did not parse into the expected shape
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Cache section rejected
    #[error("cache config: {0}")]
    Cache(#[from] CacheError),

    /// Alerts section rejected
    #[error("alerts config: {0}")]
    Alerts(#[from] AlertError),

    /// Any other inconsistent setting
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            GenerationError::Auth("403".into()).category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            GenerationError::Quota("429".into()).category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(
            GenerationError::Transport("reset".into()).category(),
            ErrorCategory::AiGeneration
        );
    }
}
