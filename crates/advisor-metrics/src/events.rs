//! Event families accepted by the aggregator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Connection lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Connection established
    Opened,
    /// Connection closed after `duration`
    Closed {
        /// How long the connection lived
        duration: Duration,
    },
    /// Connection attempt failed
    Failed,
    /// Client reconnected
    Reconnected,
    /// Error on an established connection
    Errored,
}

/// Message events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageEvent {
    /// Message sent to a client
    Sent,
    /// Message received from a client
    Received,
    /// Message handling failed
    Error,
    /// Message delivery retried
    Retry,
    /// Message broadcast to several clients
    Broadcast,
}

/// One completed AI-generation request
#[derive(Debug, Clone, PartialEq)]
pub struct AiRequestRecord {
    /// Whether the call returned a usable result
    pub success: bool,
    /// Wall time of the call
    pub response_time: Duration,
    /// Tokens consumed
    pub tokens: u64,
    /// Model identifier
    pub model_id: String,
    /// Estimated cost in the billing currency
    pub estimated_cost: f64,
}

impl AiRequestRecord {
    /// Successful request
    #[must_use]
    pub fn success(model_id: impl Into<String>, response_time: Duration, tokens: u64, estimated_cost: f64) -> Self {
        Self {
            success: true,
            response_time,
            tokens,
            model_id: model_id.into(),
            estimated_cost,
        }
    }

    /// Failed request
    #[must_use]
    pub fn failure(model_id: impl Into<String>, response_time: Duration) -> Self {
        Self {
            success: false,
            response_time,
            tokens: 0,
            model_id: model_id.into(),
            estimated_cost: 0.0,
        }
    }
}

/// User engagement event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementKind {
    /// Chat session started
    SessionStarted,
    /// Chat session ended after `duration`
    SessionEnded {
        /// Session length
        duration: Duration,
    },
    /// User sent a chat message
    MessageSent,
    /// Report generated for the user
    ReportGenerated,
    /// Inquiry submitted
    InquirySubmitted,
}

/// User engagement event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEngagement {
    /// Acting user
    pub user_id: String,
    /// What happened
    pub kind: EngagementKind,
}

impl UserEngagement {
    /// Create engagement event
    #[must_use]
    pub fn new(user_id: impl Into<String>, kind: EngagementKind) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
        }
    }
}

/// Typed error categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Transport-level connection problem
    Connection,
    /// Message handling problem
    Message,
    /// AI-generation call failed
    AiGeneration,
    /// Authentication failed
    Authentication,
    /// Input rejected
    Validation,
    /// Upstream quota or rate limit hit
    RateLimit,
    /// Anything else
    Internal,
}

impl ErrorCategory {
    /// Stable snake_case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Message => "message",
            Self::AiGeneration => "ai_generation",
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::RateLimit => "rate_limit",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
