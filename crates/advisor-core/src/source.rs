//! Cache statistics as an alert metric source

use advisor_alerts::MetricSource;
use advisor_cache::AnalysisCache;
use serde_json::{json, Value};
use std::sync::Arc;

/// Section name cache metrics are published under
pub const CACHE_SOURCE: &str = "cache";

/// Publishes cache statistics as the `cache` metric section
///
/// `hit_rate` is `null` until the first lookup, so hit-rate rules stay quiet
/// on a cold cache.
#[derive(Debug, Clone)]
pub struct CacheMetricSource(pub Arc<AnalysisCache>);

impl MetricSource for CacheMetricSource {
    fn name(&self) -> &str {
        CACHE_SOURCE
    }

    fn metrics(&self) -> Option<Value> {
        let stats = self.0.statistics();
        let hit_rate = if stats.lookups == 0 {
            Value::Null
        } else {
            json!(stats.hit_rate)
        };
        Some(json!({
            "hit_rate": hit_rate,
            "size": stats.size,
            "capacity": stats.capacity,
            "hits": stats.hits,
            "misses": stats.misses,
            "lookups": stats.lookups,
            "evictions": stats.evictions,
            "expirations": stats.expirations,
            "tokens_saved": stats.tokens_saved,
        }))
    }
}
