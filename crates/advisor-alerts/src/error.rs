//! Error types for alerting
//!
//! Not-found and validation failures are returned to the caller that asked
//! for the change. Delivery failures stay inside the dispatcher and are only
//! logged.

use crate::channel::ChannelKind;
use std::time::Duration;

/// Alert management errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertError {
    /// No active alert with this id
    #[error("alert not found: {0}")]
    AlertNotFound(String),

    /// No rule with this id
    #[error("alert rule not found: {0}")]
    RuleNotFound(String),

    /// No channel with this id
    #[error("alert channel not found: {0}")]
    ChannelNotFound(String),

    /// Channel filter is malformed
    #[error("invalid channel filter: {0}")]
    InvalidFilter(String),

    /// Rule definition is malformed
    #[error("invalid alert rule: {0}")]
    InvalidRule(String),

    /// Channel definition is malformed
    #[error("invalid alert channel: {0}")]
    InvalidChannel(String),
}

impl AlertError {
    /// Whether this is a not-found condition
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AlertNotFound(_) | Self::RuleNotFound(_) | Self::ChannelNotFound(_)
        )
    }
}

/// Failure delivering one alert to one channel
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeliveryError {
    /// Delivery did not finish in time
    #[error("delivery timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Transport-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// No transport registered for the channel kind
    #[error("no transport for channel kind {0}")]
    UnsupportedKind(ChannelKind),

    /// Channel config lacks a required option
    #[error("channel config missing {0}")]
    MissingConfig(&'static str),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_class_is_distinct() {
        assert!(AlertError::RuleNotFound("r".into()).is_not_found());
        assert!(!AlertError::InvalidRule("r".into()).is_not_found());
    }

    #[test]
    fn timeout_message() {
        let err = DeliveryError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "delivery timed out after 30s");
    }
}
