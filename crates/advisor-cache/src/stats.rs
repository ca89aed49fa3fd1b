//! Read-only cache diagnostics

use crate::entry::AnalysisTypeMetrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Point-in-time cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatistics {
    /// Stored entries
    pub size: usize,
    /// Current capacity
    pub capacity: usize,
    /// Lookups served from cache
    pub hits: u64,
    /// Lookups that missed or hit an expired entry
    pub misses: u64,
    /// `hits + misses`
    pub lookups: u64,
    /// `hits / lookups`, or 0.0 before the first lookup
    pub hit_rate: f64,
    /// Entries dropped for capacity
    pub evictions: u64,
    /// Entries dropped for age
    pub expirations: u64,
    /// Tokens not spent thanks to hits
    pub tokens_saved: u64,
    /// Last strategy optimization
    pub last_optimized: Option<DateTime<Utc>>,
    /// Per analysis type breakdown
    pub per_type: BTreeMap<String, AnalysisTypeMetrics>,
}

/// TTL change applied to one analysis type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TtlAdjustment {
    /// Analysis type
    pub analysis_type: String,
    /// Hit rate that drove the change
    pub hit_rate: f64,
    /// Optimal TTL before
    pub before: Duration,
    /// Optimal TTL after clamping
    pub after: Duration,
}

/// Outcome of one `optimize_strategy` pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    /// Hit rate across all types
    pub overall_hit_rate: f64,
    /// Capacity before the pass
    pub capacity_before: usize,
    /// Capacity after the pass
    pub capacity_after: usize,
    /// Entries evicted to fit a reduced capacity
    pub evicted: usize,
    /// Per-type TTL changes, sorted by type
    pub adjustments: Vec<TtlAdjustment>,
}
