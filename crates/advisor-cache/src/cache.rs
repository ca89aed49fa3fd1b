//! Adaptive analysis cache
//!
//! Stores AI analysis results keyed by (analysis type, normalized content).
//! Each analysis type carries its own base TTL which is tuned from the
//! observed hit rate; capacity is tuned from the overall hit rate.
//!
//! Entries live in an [`LruCache`] behind one `parking_lot::RwLock`. Lookups
//! take the write half because a hit promotes the entry; only
//! [`AnalysisCache::statistics`] and presence checks are pure reads.

use crate::config::CacheConfig;
use crate::entry::{metadata_keys, AnalysisTypeMetrics, CachedAnalysis};
use crate::error::CacheError;
use crate::stats::{CacheStatistics, OptimizationReport, TtlAdjustment};
use crate::warmup::WarmUpPattern;
use advisor_primitives::{CacheKey, Clock, SharedClock, SystemClock};
use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Hit rate above which a type's TTL grows
const STABLE_HIT_RATE: f64 = 0.8;
/// Hit rate below which a type's TTL shrinks
const CHURN_HIT_RATE: f64 = 0.3;
const TTL_GROWTH: f64 = 1.2;
const TTL_DECAY: f64 = 0.8;

/// Overall hit rate below which capacity shrinks
const CAPACITY_SHRINK_BELOW: f64 = 0.5;
/// Overall hit rate above which capacity grows
const CAPACITY_GROW_ABOVE: f64 = 0.8;
const CAPACITY_STEP: f64 = 0.1;

/// Mutable cache state, guarded as a unit
#[derive(Debug)]
struct CacheState {
    entries: LruCache<CacheKey, CachedAnalysis>,
    type_metrics: HashMap<String, AnalysisTypeMetrics>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
    tokens_saved: u64,
    last_optimized: Option<DateTime<Utc>>,
}

impl CacheState {
    fn new(capacity: usize) -> Self {
        Self {
            entries: LruCache::new(non_zero(capacity)),
            type_metrics: HashMap::new(),
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            tokens_saved: 0,
            last_optimized: None,
        }
    }

    fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    fn type_metrics_mut(&mut self, analysis_type: &str, default_ttl: Duration) -> &mut AnalysisTypeMetrics {
        self.type_metrics
            .entry(analysis_type.to_string())
            .or_insert_with(|| AnalysisTypeMetrics::new(analysis_type, default_ttl))
    }

    fn evict_lru(&mut self) -> Option<CachedAnalysis> {
        let (_, entry) = self.entries.pop_lru()?;
        self.evictions += 1;
        Some(entry)
    }

    /// Evict down to `capacity`, then shrink or grow the LRU to it
    fn resize(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.entries.len() > capacity {
            if self.evict_lru().is_none() {
                break;
            }
            evicted += 1;
        }
        self.entries.resize(non_zero(capacity));
        evicted
    }

    fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            n => self.hits as f64 / n as f64,
        }
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Capacity after one 10% step, moving by at least one slot
fn scale_capacity(capacity: usize, grow: bool) -> usize {
    let step = ((capacity as f64 * CAPACITY_STEP).round() as usize).max(1);
    if grow {
        capacity.saturating_add(step)
    } else {
        capacity.saturating_sub(step)
    }
}

/// Size-bounded, self-tuning cache of analysis results
#[derive(Debug)]
pub struct AnalysisCache {
    config: CacheConfig,
    clock: SharedClock,
    state: RwLock<CacheState>,
}

impl AnalysisCache {
    /// Create cache, validating configuration
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidConfig`] if the bounds are inconsistent
    pub fn try_new(config: CacheConfig, clock: SharedClock) -> Result<Self, CacheError> {
        config.validate()?;
        Ok(Self {
            state: RwLock::new(CacheState::new(config.initial_capacity)),
            config,
            clock,
        })
    }

    /// Create cache, falling back to defaults on a bad configuration
    #[must_use]
    pub fn new(config: CacheConfig, clock: SharedClock) -> Self {
        match config.validate() {
            Ok(()) => Self {
                state: RwLock::new(CacheState::new(config.initial_capacity)),
                config,
                clock,
            },
            Err(e) => {
                tracing::warn!("cache configuration rejected, using defaults: {}", e);
                let config = CacheConfig::default();
                Self {
                    state: RwLock::new(CacheState::new(config.initial_capacity)),
                    config,
                    clock,
                }
            }
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a cached result
    ///
    /// A live hit promotes the entry and bumps its access count. An expired entry is
    /// removed and reported as a miss. Key errors are treated as misses.
    pub fn get(&self, analysis_type: &str, content: &str) -> Option<CachedAnalysis> {
        let key = match CacheKey::derive(analysis_type, content) {
            Ok(key) => key,
            Err(e) => {
                tracing::debug!("cache lookup skipped: {}", e);
                return None;
            }
        };
        let analysis_type = analysis_type.trim();
        let now = self.clock.now();
        let default_ttl = self.config.default_ttl();

        let mut state = self.state.write();

        let expired = match state.entries.peek(&key) {
            Some(entry) => entry.is_expired(now),
            None => {
                state.misses += 1;
                state.type_metrics_mut(analysis_type, default_ttl).record_lookup(false);
                tracing::debug!(key = %key.short(), analysis_type, "cache miss");
                return None;
            }
        };

        if expired {
            state.entries.pop(&key);
            state.expirations += 1;
            state.misses += 1;
            state.type_metrics_mut(analysis_type, default_ttl).record_lookup(false);
            tracing::debug!(key = %key.short(), analysis_type, "cache entry expired");
            return None;
        }

        let (tokens, hit) = {
            let entry = state.entries.get_mut(&key)?;
            entry.last_accessed_at = now;
            entry.access_count += 1;
            (entry.tokens_used, entry.clone())
        };
        state.hits += 1;
        state.tokens_saved += tokens;
        state.type_metrics_mut(analysis_type, default_ttl).record_lookup(true);
        tracing::debug!(key = %key.short(), analysis_type, access_count = hit.access_count, "cache hit");

        Some(hit)
    }

    /// Store a result
    ///
    /// Evicts the least recently used entry first when full. The entry TTL is
    /// the type's optimal TTL scaled by `0.5 + 0.5 * quality`, clamped to the
    /// configured band.
    ///
    /// # Errors
    /// Returns [`CacheError`] if the key cannot be derived or quality is not finite
    pub fn put(
        &self,
        analysis_type: &str,
        content: &str,
        result: impl Into<String>,
        tokens_used: u64,
        quality: f64,
    ) -> Result<CachedAnalysis, CacheError> {
        self.put_with_metadata(analysis_type, content, result, tokens_used, quality, BTreeMap::new())
    }

    /// Store a result with metadata attached
    ///
    /// # Errors
    /// Same as [`AnalysisCache::put`]
    pub fn put_with_metadata(
        &self,
        analysis_type: &str,
        content: &str,
        result: impl Into<String>,
        tokens_used: u64,
        quality: f64,
        metadata: BTreeMap<String, String>,
    ) -> Result<CachedAnalysis, CacheError> {
        let key = CacheKey::derive(analysis_type, content)?;
        if !quality.is_finite() {
            return Err(CacheError::InvalidQuality(quality));
        }
        let quality = quality.clamp(0.0, 1.0);
        let analysis_type = analysis_type.trim();
        let now = self.clock.now();
        let default_ttl = self.config.default_ttl();

        let mut state = self.state.write();

        let optimal_ttl = state.type_metrics_mut(analysis_type, default_ttl).optimal_ttl;
        let ttl = self.entry_ttl(optimal_ttl, quality);

        if state.entries.pop(&key).is_none() && state.entries.len() >= state.capacity() {
            if let Some(evicted) = state.evict_lru() {
                tracing::debug!(key = %evicted.key.short(), "evicted least recently used entry");
            }
        }

        let entry = CachedAnalysis {
            key,
            analysis_type: analysis_type.to_string(),
            content: result.into(),
            tokens_used,
            quality,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            ttl,
            metadata,
        };
        state.entries.put(key, entry.clone());
        state
            .type_metrics_mut(analysis_type, default_ttl)
            .record_store(tokens_used, quality);

        tracing::debug!(key = %key.short(), analysis_type, ttl_secs = ttl.as_secs(), "cached analysis");
        Ok(entry)
    }

    /// Per-entry TTL for a given base TTL and quality
    #[inline]
    #[must_use]
    pub fn entry_ttl(&self, optimal_ttl: Duration, quality: f64) -> Duration {
        let multiplier = 0.5 + 0.5 * quality.clamp(0.0, 1.0);
        self.config.scale_ttl(optimal_ttl, multiplier)
    }

    /// Tune per-type TTLs and overall capacity from observed hit rates
    pub fn optimize_strategy(&self) -> OptimizationReport {
        let now = self.clock.now();
        let min_requests = self.config.min_requests_for_tuning;
        let mut state = self.state.write();

        let mut adjustments = Vec::new();
        for metrics in state.type_metrics.values_mut() {
            if metrics.request_count < min_requests {
                continue;
            }
            let factor = if metrics.cache_hit_rate > STABLE_HIT_RATE {
                TTL_GROWTH
            } else if metrics.cache_hit_rate < CHURN_HIT_RATE {
                TTL_DECAY
            } else {
                continue;
            };
            let before = metrics.optimal_ttl;
            metrics.optimal_ttl = self.config.scale_ttl(before, factor);
            metrics.last_optimized = Some(now);
            adjustments.push(TtlAdjustment {
                analysis_type: metrics.analysis_type.clone(),
                hit_rate: metrics.cache_hit_rate,
                before,
                after: metrics.optimal_ttl,
            });
        }
        adjustments.sort_by(|a, b| a.analysis_type.cmp(&b.analysis_type));

        let capacity_before = state.capacity();
        let overall = state.hit_rate();
        let mut new_capacity = capacity_before;
        if state.lookups() >= min_requests {
            let scaled = if overall < CAPACITY_SHRINK_BELOW {
                Some(scale_capacity(capacity_before, false))
            } else if overall > CAPACITY_GROW_ABOVE {
                Some(scale_capacity(capacity_before, true))
            } else {
                None
            };
            if let Some(scaled) = scaled {
                new_capacity = scaled.clamp(self.config.min_capacity, self.config.max_capacity);
            }
        }
        let evicted = state.resize(new_capacity);
        state.last_optimized = Some(now);

        let report = OptimizationReport {
            overall_hit_rate: overall,
            capacity_before,
            capacity_after: state.capacity(),
            evicted,
            adjustments,
        };
        drop(state);

        tracing::info!(
            hit_rate = report.overall_hit_rate,
            capacity = report.capacity_after,
            adjusted_types = report.adjustments.len(),
            evicted = report.evicted,
            "cache strategy optimized"
        );
        report
    }

    /// Pre-populate known-common requests, skipping live entries
    ///
    /// Returns the number of entries inserted.
    pub fn warm_up(&self, patterns: &[WarmUpPattern]) -> usize {
        let mut inserted = 0;
        for pattern in patterns {
            if self.contains(&pattern.analysis_type, &pattern.content) {
                continue;
            }
            let metadata = BTreeMap::from([(metadata_keys::SOURCE.to_string(), "warm_up".to_string())]);
            match self.put_with_metadata(
                &pattern.analysis_type,
                &pattern.content,
                pattern.result.clone(),
                pattern.tokens_used,
                pattern.quality,
                metadata,
            ) {
                Ok(_) => inserted += 1,
                Err(e) => tracing::warn!(analysis_type = %pattern.analysis_type, "warm-up pattern skipped: {}", e),
            }
        }
        tracing::info!("cache warm-up inserted {} of {} patterns", inserted, patterns.len());
        inserted
    }

    /// Whether a live entry exists, without promoting it or touching statistics
    #[must_use]
    pub fn contains(&self, analysis_type: &str, content: &str) -> bool {
        let Ok(key) = CacheKey::derive(analysis_type, content) else {
            return false;
        };
        let now = self.clock.now();
        self.state
            .read()
            .entries
            .peek(&key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Drop one entry explicitly
    pub fn invalidate(&self, analysis_type: &str, content: &str) -> bool {
        let Ok(key) = CacheKey::derive(analysis_type, content) else {
            return false;
        };
        self.state.write().entries.pop(&key).is_some()
    }

    /// Drop every entry, keeping per-type tuning
    pub fn clear(&self) {
        self.state.write().entries.clear();
    }

    /// Remove entries past their TTL
    ///
    /// Lazy expiry on read stays authoritative; this only reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write();
        let expired: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| *key)
            .collect();
        for key in &expired {
            state.entries.pop(key);
        }
        state.expirations += expired.len() as u64;
        if !expired.is_empty() {
            tracing::debug!("purged {} expired cache entries", expired.len());
        }
        expired.len()
    }

    /// Number of stored entries (expired ones included until touched)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the cache holds no entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current capacity
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.read().capacity()
    }

    /// Per-type metrics for one analysis type
    #[must_use]
    pub fn type_metrics(&self, analysis_type: &str) -> Option<AnalysisTypeMetrics> {
        self.state.read().type_metrics.get(analysis_type.trim()).cloned()
    }

    /// Read-only diagnostic snapshot
    #[must_use]
    pub fn statistics(&self) -> CacheStatistics {
        let state = self.state.read();
        CacheStatistics {
            size: state.entries.len(),
            capacity: state.capacity(),
            hits: state.hits,
            misses: state.misses,
            lookups: state.lookups(),
            hit_rate: state.hit_rate(),
            evictions: state.evictions,
            expirations: state.expirations,
            tokens_saved: state.tokens_saved,
            last_optimized: state.last_optimized,
            per_type: state
                .type_metrics
                .iter()
                .map(|(name, metrics)| (name.clone(), metrics.clone()))
                .collect(),
        }
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(CacheConfig::default(), SystemClock::shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_TTL_CEILING_SECS;
    use advisor_primitives::ManualClock;
    use std::sync::Arc;

    fn small_cache(capacity: usize) -> (AnalysisCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let config = CacheConfig::new().with_capacity(capacity, 1, 100);
        let cache = AnalysisCache::try_new(config, clock.clone()).unwrap();
        (cache, clock)
    }

    #[test]
    fn put_then_get_returns_content() {
        let (cache, _clock) = small_cache(10);
        cache.put("cost_analysis", "aws s3 cost", "result-A", 100, 0.9).unwrap();

        let hit = cache.get("cost_analysis", "AWS S3 COST").unwrap();
        assert_eq!(hit.content, "result-A");
        assert_eq!(hit.access_count, 1);
        assert_eq!(hit.tokens_used, 100);
    }

    #[test]
    fn expired_entry_is_removed_on_read() {
        let (cache, clock) = small_cache(10);
        let entry = cache.put("cost_analysis", "gcp", "r", 10, 0.0).unwrap();

        clock.advance(entry.ttl);
        assert!(cache.get("cost_analysis", "gcp").is_none());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.statistics().expirations, 1);
    }

    #[test]
    fn entry_live_just_before_ttl() {
        let (cache, clock) = small_cache(10);
        let entry = cache.put("cost_analysis", "gcp", "r", 10, 0.5).unwrap();
        clock.advance(entry.ttl - Duration::from_secs(1));
        assert!(cache.get("cost_analysis", "gcp").is_some());
    }

    #[test]
    fn quality_scales_ttl() {
        let (cache, _clock) = small_cache(10);
        let low = cache.put("cost_analysis", "a", "r", 1, 0.0).unwrap();
        let high = cache.put("cost_analysis", "b", "r", 1, 1.0).unwrap();
        assert_eq!(low.ttl, Duration::from_secs(30 * 60));
        assert_eq!(high.ttl, Duration::from_secs(60 * 60));
    }

    #[test]
    fn full_cache_evicts_least_recently_accessed() {
        let (cache, clock) = small_cache(3);
        cache.put("t", "one", "1", 1, 0.5).unwrap();
        clock.advance(Duration::from_secs(1));
        cache.put("t", "two", "2", 1, 0.5).unwrap();
        clock.advance(Duration::from_secs(1));
        cache.put("t", "three", "3", 1, 0.5).unwrap();
        clock.advance(Duration::from_secs(1));

        // Touch "one" so "two" becomes the LRU entry
        assert!(cache.get("t", "one").is_some());
        cache.put("t", "four", "4", 1, 0.5).unwrap();

        assert_eq!(cache.len(), 3);
        assert!(cache.contains("t", "one"));
        assert!(!cache.contains("t", "two"));
        assert!(cache.contains("t", "three"));
        assert!(cache.contains("t", "four"));
        assert_eq!(cache.statistics().evictions, 1);
    }

    #[test]
    fn overwrite_does_not_evict() {
        let (cache, _clock) = small_cache(2);
        cache.put("t", "one", "1", 1, 0.5).unwrap();
        cache.put("t", "two", "2", 1, 0.5).unwrap();
        cache.put("t", "ONE", "1b", 1, 0.5).unwrap();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("t", "one").unwrap().content, "1b");
        assert_eq!(cache.statistics().evictions, 0);
    }

    #[test]
    fn hit_rate_tracks_lookups() {
        let (cache, _clock) = small_cache(10);
        cache.put("cost_analysis", "x", "r", 1, 0.5).unwrap();
        for _ in 0..3 {
            cache.get("cost_analysis", "x");
        }
        cache.get("cost_analysis", "missing-1");
        cache.get("cost_analysis", "missing-2");

        let metrics = cache.type_metrics("cost_analysis").unwrap();
        assert_eq!(metrics.request_count, 5);
        assert!((metrics.cache_hit_rate - 0.6).abs() < 1e-9);
    }

    #[test]
    fn blank_type_is_a_silent_miss() {
        let (cache, _clock) = small_cache(10);
        assert!(cache.get("  ", "x").is_none());
        assert!(matches!(cache.put("", "x", "r", 1, 0.5), Err(CacheError::Key(_))));
        assert_eq!(cache.statistics().lookups, 0);
    }

    #[test]
    fn nan_quality_rejected() {
        let (cache, _clock) = small_cache(10);
        assert!(matches!(
            cache.put("t", "x", "r", 1, f64::NAN),
            Err(CacheError::InvalidQuality(_))
        ));
    }

    #[test]
    fn optimize_grows_ttl_for_stable_types() {
        let (cache, _clock) = small_cache(10);
        cache.put("cost_analysis", "x", "r", 1, 1.0).unwrap();
        for _ in 0..10 {
            cache.get("cost_analysis", "x");
        }
        let report = cache.optimize_strategy();
        let metrics = cache.type_metrics("cost_analysis").unwrap();
        assert_eq!(metrics.optimal_ttl, Duration::from_secs(72 * 60));
        assert!(metrics.last_optimized.is_some());
        assert_eq!(report.adjustments.len(), 1);
        // all hits: capacity grows 10%
        assert_eq!(report.capacity_after, 11);
    }

    #[test]
    fn optimize_shrinks_ttl_and_capacity_on_churn() {
        let (cache, _clock) = small_cache(50);
        for i in 0..12 {
            cache.get("security_assessment", &format!("q{i}"));
        }
        let report = cache.optimize_strategy();
        let metrics = cache.type_metrics("security_assessment").unwrap();
        assert_eq!(metrics.optimal_ttl, Duration::from_secs(48 * 60));
        assert_eq!(report.capacity_before, 50);
        assert_eq!(report.capacity_after, 45);
    }

    #[test]
    fn optimize_skips_types_below_threshold() {
        let (cache, _clock) = small_cache(10);
        for i in 0..5 {
            cache.get("rare", &format!("q{i}"));
        }
        let report = cache.optimize_strategy();
        assert!(report.adjustments.is_empty());
        assert_eq!(report.capacity_after, 10);
        assert_eq!(
            cache.type_metrics("rare").unwrap().optimal_ttl,
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn capacity_shrink_evicts_overflow() {
        let (cache, _clock) = small_cache(10);
        for i in 0..10 {
            cache.put("t", &format!("k{i}"), "r", 1, 0.5).unwrap();
        }
        for i in 0..10 {
            cache.get("t", &format!("absent{i}"));
        }
        let report = cache.optimize_strategy();
        assert_eq!(report.capacity_after, 9);
        assert_eq!(report.evicted, 1);
        assert_eq!(cache.len(), 9);
        assert!(!cache.contains("t", "k0"));
    }

    #[test]
    fn capacity_growth_keeps_entries_and_lru_order() {
        let (cache, _clock) = small_cache(10);
        for i in 0..10 {
            cache.put("t", &format!("k{i}"), "r", 1, 0.5).unwrap();
        }
        for _ in 0..10 {
            cache.get("t", "k0");
        }
        let report = cache.optimize_strategy();
        assert_eq!(report.capacity_after, 11);
        assert_eq!(report.evicted, 0);
        assert_eq!(cache.capacity(), 11);
        assert_eq!(cache.len(), 10);

        // One free slot after growth, then k1 is the oldest untouched entry
        cache.put("t", "k10", "r", 1, 0.5).unwrap();
        cache.put("t", "k11", "r", 1, 0.5).unwrap();
        assert_eq!(cache.len(), 11);
        assert!(cache.contains("t", "k0"));
        assert!(!cache.contains("t", "k1"));
        assert_eq!(cache.statistics().evictions, 1);
    }

    #[test]
    fn contains_does_not_promote() {
        let (cache, _clock) = small_cache(2);
        cache.put("t", "one", "1", 1, 0.5).unwrap();
        cache.put("t", "two", "2", 1, 0.5).unwrap();
        assert!(cache.contains("t", "one"));
        cache.put("t", "three", "3", 1, 0.5).unwrap();
        assert!(!cache.contains("t", "one"));
        assert!(cache.contains("t", "two"));
    }

    #[test]
    fn huge_ttl_band_tunes_without_overflow() {
        let clock = Arc::new(ManualClock::starting_now());
        let config = CacheConfig::new()
            .with_capacity(10, 1, 100)
            .with_ttl_bounds(Duration::from_secs(300), Duration::from_secs(MAX_TTL_CEILING_SECS))
            .with_default_ttl(Duration::from_secs(MAX_TTL_CEILING_SECS));
        let cache = AnalysisCache::try_new(config, clock).unwrap();
        cache.put("t", "x", "r", 1, 1.0).unwrap();
        for _ in 0..10 {
            cache.get("t", "x");
        }
        cache.optimize_strategy();
        assert_eq!(
            cache.type_metrics("t").unwrap().optimal_ttl,
            Duration::from_secs(MAX_TTL_CEILING_SECS)
        );
    }

    #[test]
    fn ttl_never_leaves_band_after_repeated_tuning() {
        let (cache, _clock) = small_cache(10);
        cache.put("t", "x", "r", 1, 1.0).unwrap();
        for _ in 0..20 {
            for _ in 0..10 {
                cache.get("t", "x");
            }
            cache.optimize_strategy();
        }
        let metrics = cache.type_metrics("t").unwrap();
        assert_eq!(metrics.optimal_ttl, Duration::from_secs(7200));
    }

    #[test]
    fn purge_expired_reclaims_memory() {
        let (cache, clock) = small_cache(10);
        cache.put("t", "low", "r", 1, 0.0).unwrap();
        cache.put("t", "high", "r", 1, 1.0).unwrap();
        clock.advance(Duration::from_secs(45 * 60));

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.contains("t", "high"));
    }

    #[test]
    fn tokens_saved_counts_hits() {
        let (cache, _clock) = small_cache(10);
        cache.put("t", "x", "r", 250, 0.5).unwrap();
        cache.get("t", "x");
        cache.get("t", "x");
        assert_eq!(cache.statistics().tokens_saved, 500);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let config = CacheConfig::new().with_capacity(0, 0, 0);
        let cache = AnalysisCache::new(config, SystemClock::shared());
        assert_eq!(cache.capacity(), 1000);
    }
}
