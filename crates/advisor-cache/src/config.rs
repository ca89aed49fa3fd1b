//! Cache configuration

use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest accepted `max_ttl_secs` (30 days)
pub const MAX_TTL_CEILING_SECS: u64 = 30 * 24 * 60 * 60;

/// Tuning bounds for [`AnalysisCache`](crate::AnalysisCache)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Capacity at construction
    pub initial_capacity: usize,
    /// Lower bound for capacity tuning
    pub min_capacity: usize,
    /// Upper bound for capacity tuning
    pub max_capacity: usize,
    /// Shortest TTL any entry or type may get, in seconds
    pub min_ttl_secs: u64,
    /// Longest TTL any entry or type may get, in seconds
    pub max_ttl_secs: u64,
    /// Starting optimal TTL for a newly seen analysis type, in seconds
    pub default_ttl_secs: u64,
    /// Requests a type needs before its TTL is tuned
    pub min_requests_for_tuning: u64,
    /// Pre-populate with the default warm-up patterns on start
    pub warm_up_on_start: bool,
}

impl CacheConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With capacity band and initial capacity
    #[inline]
    #[must_use]
    pub fn with_capacity(mut self, initial: usize, min: usize, max: usize) -> Self {
        self.initial_capacity = initial;
        self.min_capacity = min;
        self.max_capacity = max;
        self
    }

    /// With TTL band
    #[inline]
    #[must_use]
    pub fn with_ttl_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_ttl_secs = min.as_secs();
        self.max_ttl_secs = max.as_secs();
        self
    }

    /// With default per-type TTL
    #[inline]
    #[must_use]
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl_secs = ttl.as_secs();
        self
    }

    /// With tuning threshold
    #[inline]
    #[must_use]
    pub fn with_min_requests_for_tuning(mut self, requests: u64) -> Self {
        self.min_requests_for_tuning = requests;
        self
    }

    /// Shortest TTL
    #[inline]
    #[must_use]
    pub fn min_ttl(&self) -> Duration {
        Duration::from_secs(self.min_ttl_secs)
    }

    /// Longest TTL
    #[inline]
    #[must_use]
    pub fn max_ttl(&self) -> Duration {
        Duration::from_secs(self.max_ttl_secs)
    }

    /// Starting TTL for new types
    #[inline]
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Clamp a TTL into the configured band
    #[inline]
    #[must_use]
    pub fn clamp_ttl(&self, ttl: Duration) -> Duration {
        ttl.clamp(self.min_ttl(), self.max_ttl())
    }

    /// Scale a TTL by `factor` and clamp it into the band, saturating at the ceiling
    #[must_use]
    pub fn scale_ttl(&self, ttl: Duration, factor: f64) -> Duration {
        Duration::try_from_secs_f64(ttl.as_secs_f64() * factor)
            .map_or_else(|_| self.max_ttl(), |scaled| self.clamp_ttl(scaled))
    }

    /// Check bounds are consistent
    ///
    /// # Errors
    /// Returns [`CacheError::InvalidConfig`] on zero or inverted bounds
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.min_capacity == 0 {
            return Err(CacheError::InvalidConfig("min_capacity must be at least 1".into()));
        }
        if self.min_capacity > self.max_capacity {
            return Err(CacheError::InvalidConfig(format!(
                "capacity band inverted: {} > {}",
                self.min_capacity, self.max_capacity
            )));
        }
        if !(self.min_capacity..=self.max_capacity).contains(&self.initial_capacity) {
            return Err(CacheError::InvalidConfig(format!(
                "initial_capacity {} outside [{}, {}]",
                self.initial_capacity, self.min_capacity, self.max_capacity
            )));
        }
        if self.min_ttl_secs == 0 || self.min_ttl_secs > self.max_ttl_secs {
            return Err(CacheError::InvalidConfig(format!(
                "ttl band invalid: [{}s, {}s]",
                self.min_ttl_secs, self.max_ttl_secs
            )));
        }
        if self.max_ttl_secs > MAX_TTL_CEILING_SECS {
            return Err(CacheError::InvalidConfig(format!(
                "max_ttl {}s above ceiling {}s",
                self.max_ttl_secs, MAX_TTL_CEILING_SECS
            )));
        }
        if !(self.min_ttl_secs..=self.max_ttl_secs).contains(&self.default_ttl_secs) {
            return Err(CacheError::InvalidConfig(format!(
                "default_ttl {}s outside ttl band",
                self.default_ttl_secs
            )));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1000,
            min_capacity: 100,
            max_capacity: 10_000,
            min_ttl_secs: 5 * 60,
            max_ttl_secs: 2 * 60 * 60,
            default_ttl_secs: 60 * 60,
            min_requests_for_tuning: 10,
            warm_up_on_start: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_capacity_band_rejected() {
        let config = CacheConfig::new().with_capacity(10, 20, 5);
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = CacheConfig::new().with_capacity(0, 0, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_ttl_must_sit_in_band() {
        let config = CacheConfig::new().with_default_ttl(Duration::from_secs(60));
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_ttl_band_rejected() {
        let config = CacheConfig::new().with_ttl_bounds(Duration::from_secs(300), Duration::MAX);
        assert!(matches!(config.validate(), Err(CacheError::InvalidConfig(_))));

        let at_ceiling = CacheConfig::new()
            .with_ttl_bounds(Duration::from_secs(300), Duration::from_secs(MAX_TTL_CEILING_SECS));
        assert!(at_ceiling.validate().is_ok());
    }

    #[test]
    fn scale_ttl_saturates_instead_of_overflowing() {
        let config = CacheConfig {
            max_ttl_secs: u64::MAX,
            ..CacheConfig::default()
        };
        assert_eq!(config.scale_ttl(Duration::from_secs(u64::MAX), 1.2), config.max_ttl());
        assert_eq!(
            CacheConfig::default().scale_ttl(Duration::from_secs(3600), 0.8),
            Duration::from_secs(48 * 60)
        );
    }

    #[test]
    fn clamp_ttl_respects_band() {
        let config = CacheConfig::default();
        assert_eq!(config.clamp_ttl(Duration::from_secs(1)), Duration::from_secs(300));
        assert_eq!(config.clamp_ttl(Duration::from_secs(100_000)), Duration::from_secs(7200));
    }

    #[test]
    fn empty_toml_like_json_uses_defaults() {
        let config: CacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CacheConfig::default());
    }
}
