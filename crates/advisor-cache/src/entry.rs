//! Cache entries and per-type bookkeeping

use advisor_primitives::{elapsed_between, CacheKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Recognized [`CachedAnalysis::metadata`] keys
pub mod metadata_keys {
    /// How the entry got into the cache: `generated` or `warm_up`
    pub const SOURCE: &str = "source";
    /// Model that produced the result, when known
    pub const MODEL: &str = "model";
}

/// One cached analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnalysis {
    /// Lookup key
    pub key: CacheKey,
    /// Analysis type the entry belongs to
    pub analysis_type: String,
    /// Cached result body
    pub content: String,
    /// Tokens spent producing the result
    pub tokens_used: u64,
    /// Usefulness estimate in `[0, 1]`
    pub quality: f64,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Last hit (or insertion) time
    pub last_accessed_at: DateTime<Utc>,
    /// Number of hits served
    pub access_count: u64,
    /// Lifetime from `created_at`
    pub ttl: Duration,
    /// Open metadata, see [`metadata_keys`]
    pub metadata: BTreeMap<String, String>,
}

impl CachedAnalysis {
    /// Whether the entry is past its TTL at `now`
    #[inline]
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        elapsed_between(self.created_at, now) >= self.ttl
    }

    /// Time left before expiry
    #[inline]
    #[must_use]
    pub fn remaining_ttl(&self, now: DateTime<Utc>) -> Duration {
        self.ttl.saturating_sub(elapsed_between(self.created_at, now))
    }
}

/// Running statistics for one analysis type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisTypeMetrics {
    /// Analysis type name
    pub analysis_type: String,
    /// Lookups observed
    pub request_count: u64,
    /// Lookups served from cache
    pub hits: u64,
    /// Lookups that missed or found an expired entry
    pub misses: u64,
    /// Running mean of hit (1) / miss (0) outcomes
    pub cache_hit_rate: f64,
    /// Entries stored for this type
    pub stored_count: u64,
    /// Running mean of tokens per stored result
    pub average_tokens: f64,
    /// Running mean of quality per stored result
    pub average_quality: f64,
    /// Current base TTL, clamped to the configured band
    pub optimal_ttl: Duration,
    /// Last time the TTL was tuned
    pub last_optimized: Option<DateTime<Utc>>,
}

impl AnalysisTypeMetrics {
    pub(crate) fn new(analysis_type: &str, optimal_ttl: Duration) -> Self {
        Self {
            analysis_type: analysis_type.to_string(),
            request_count: 0,
            hits: 0,
            misses: 0,
            cache_hit_rate: 0.0,
            stored_count: 0,
            average_tokens: 0.0,
            average_quality: 0.0,
            optimal_ttl,
            last_optimized: None,
        }
    }

    pub(crate) fn record_lookup(&mut self, hit: bool) {
        self.request_count += 1;
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        let sample = if hit { 1.0 } else { 0.0 };
        self.cache_hit_rate += (sample - self.cache_hit_rate) / self.request_count as f64;
        self.cache_hit_rate = self.cache_hit_rate.clamp(0.0, 1.0);
    }

    pub(crate) fn record_store(&mut self, tokens: u64, quality: f64) {
        self.stored_count += 1;
        let n = self.stored_count as f64;
        self.average_tokens += (tokens as f64 - self.average_tokens) / n;
        self.average_quality += (quality - self.average_quality) / n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_hit_rate_matches_ratio() {
        let mut metrics = AnalysisTypeMetrics::new("cost_analysis", Duration::from_secs(3600));
        for hit in [true, false, true, true, false, false, true] {
            metrics.record_lookup(hit);
        }
        assert_eq!(metrics.request_count, 7);
        assert!((metrics.cache_hit_rate - 4.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn store_averages() {
        let mut metrics = AnalysisTypeMetrics::new("cost_analysis", Duration::from_secs(3600));
        metrics.record_store(100, 0.5);
        metrics.record_store(300, 1.0);
        assert!((metrics.average_tokens - 200.0).abs() < 1e-9);
        assert!((metrics.average_quality - 0.75).abs() < 1e-9);
    }
}
