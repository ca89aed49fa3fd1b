//! Immutable point-in-time metric views
//!
//! Every rate here is derived at snapshot time from raw counters. Field
//! names double as the dotted metric paths alert rules refer to, for
//! example `ai.success_rate` or `performance.p95_response_ms`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Divide, yielding `default` for a zero denominator
#[inline]
#[must_use]
pub fn ratio_or(numerator: f64, denominator: f64, default: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        default
    }
}

/// Aggregated metrics at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
    /// Last reset
    pub since: DateTime<Utc>,
    /// Connection section
    pub connections: ConnectionSnapshot,
    /// Message section
    pub messages: MessageSnapshot,
    /// AI usage section
    pub ai: AiSnapshot,
    /// User engagement section
    pub users: UserSnapshot,
    /// Error section
    pub errors: ErrorSnapshot,
    /// Derived performance figures
    pub performance: PerformanceSnapshot,
}

/// Connection counters and rates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionSnapshot {
    /// Connection attempts (opened + failed)
    pub total: u64,
    /// Currently open
    pub active: u64,
    /// Failed attempts
    pub failures: u64,
    /// Reconnections
    pub reconnections: u64,
    /// Errors on established connections
    pub errors: u64,
    /// `(total - failures) / total`, 1.0 when no attempts
    pub success_rate: f64,
    /// Mean lifetime of closed connections
    pub average_duration_ms: f64,
}

/// Message counters and rates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSnapshot {
    /// Sent
    pub sent: u64,
    /// Received
    pub received: u64,
    /// Failed
    pub errors: u64,
    /// Retried
    pub retries: u64,
    /// Broadcast
    pub broadcasts: u64,
    /// `(sent + received - errors) / (sent + received)`, 1.0 when none
    pub success_rate: f64,
    /// Mean processing time of messages that reported one
    pub average_processing_ms: f64,
}

/// Per-model AI usage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelUsage {
    /// Requests
    pub requests: u64,
    /// Tokens
    pub tokens: u64,
    /// Estimated cost
    pub cost: f64,
}

/// AI-generation counters and rates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiSnapshot {
    /// Requests
    pub total: u64,
    /// Successful requests
    pub successful: u64,
    /// Failed requests
    pub failed: u64,
    /// `successful / total`, 1.0 when none
    pub success_rate: f64,
    /// Tokens consumed
    pub total_tokens: u64,
    /// Mean tokens per successful request
    pub average_tokens: f64,
    /// Estimated cost since reset
    pub total_cost: f64,
    /// Estimated cost for the current UTC day
    pub daily_cost: f64,
    /// Mean response time
    pub average_response_ms: f64,
    /// Breakdown by model id
    pub per_model: BTreeMap<String, ModelUsage>,
}

/// User engagement counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSnapshot {
    /// Distinct users seen since reset
    pub active_users: u64,
    /// Sessions started
    pub sessions_started: u64,
    /// Sessions ended
    pub sessions_ended: u64,
    /// Mean session length
    pub average_session_secs: f64,
    /// Chat messages sent by users
    pub messages: u64,
    /// Reports generated
    pub reports_generated: u64,
    /// Inquiries submitted
    pub inquiries: u64,
}

/// Typed error counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorSnapshot {
    /// All typed errors
    pub total: u64,
    /// Count per category name
    pub by_category: BTreeMap<String, u64>,
    /// `total / (messages + ai requests + connections)`, 0.0 when idle
    pub error_rate: f64,
    /// Authentication failures in the trailing minute
    pub auth_failures_per_minute: u64,
}

/// Derived performance figures
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSnapshot {
    /// Seconds since the last reset
    pub uptime_secs: f64,
    /// `(sent + received) / uptime_secs`, 0.0 at zero uptime
    pub throughput_per_sec: f64,
    /// Mean AI response time
    pub average_response_ms: f64,
    /// Approximate 95th percentile AI response time
    pub p95_response_ms: f64,
    /// Approximate 99th percentile AI response time
    pub p99_response_ms: f64,
}
