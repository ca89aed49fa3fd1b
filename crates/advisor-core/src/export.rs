//! Combined metrics exposition for scraping

use advisor_alerts::AlertStatistics;
use advisor_cache::CacheStatistics;
use advisor_metrics::{write_snapshot, ExpositionWriter, MetricKind, MetricsSnapshot};

/// Write cache families
pub fn write_cache_statistics(writer: &mut ExpositionWriter, stats: &CacheStatistics) {
    writer
        .gauge("cache_entries", "Entries in the analysis cache", stats.size as f64)
        .gauge("cache_capacity", "Current analysis cache capacity", stats.capacity as f64)
        .counter("cache_hits_total", "Analysis cache hits", stats.hits)
        .counter("cache_misses_total", "Analysis cache misses", stats.misses)
        .gauge("cache_hit_rate", "Analysis cache hit rate", stats.hit_rate)
        .counter("cache_evictions_total", "Entries evicted for capacity", stats.evictions)
        .counter("cache_expirations_total", "Entries dropped for age", stats.expirations)
        .counter("cache_tokens_saved_total", "Tokens served from cache", stats.tokens_saved)
        .labeled(
            "cache_type_hit_rate",
            MetricKind::Gauge,
            "Hit rate per analysis type",
            "analysis_type",
            stats
                .per_type
                .iter()
                .map(|(name, m)| (name.as_str(), m.cache_hit_rate)),
        )
        .labeled(
            "cache_type_ttl_seconds",
            MetricKind::Gauge,
            "Tuned base TTL per analysis type",
            "analysis_type",
            stats
                .per_type
                .iter()
                .map(|(name, m)| (name.as_str(), m.optimal_ttl.as_secs_f64())),
        );
}

/// Write alerting families
pub fn write_alert_statistics(writer: &mut ExpositionWriter, stats: &AlertStatistics) {
    writer
        .gauge("alerts_active", "Unresolved alerts", stats.active as f64)
        .counter("alerts_created_total", "Alerts raised", stats.total_created)
        .counter("alerts_resolved_total", "Alerts resolved", stats.total_resolved)
        .labeled(
            "alerts_by_severity",
            MetricKind::Gauge,
            "Alerts in history per severity",
            "severity",
            stats
                .by_severity
                .iter()
                .map(|(severity, count)| (severity.as_str(), *count as f64)),
        );
}

/// Full exposition: request metrics, cache and alerting
#[must_use]
pub fn render_full_exposition(
    snapshot: &MetricsSnapshot,
    cache: &CacheStatistics,
    alerts: &AlertStatistics,
) -> String {
    let mut writer = ExpositionWriter::new();
    write_snapshot(&mut writer, snapshot);
    write_cache_statistics(&mut writer, cache);
    write_alert_statistics(&mut writer, alerts);
    writer.finish()
}
