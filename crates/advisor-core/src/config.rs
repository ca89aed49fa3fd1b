//! Advisor configuration
//!
//! Loaded from TOML. Every field has a default so an empty file is a valid
//! configuration.

use crate::error::ConfigError;
use advisor_alerts::AlertConfig;
use advisor_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Background loop intervals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between cache strategy optimizations
    pub optimize_interval_secs: u64,
    /// Seconds between expired-entry sweeps
    pub cleanup_interval_secs: u64,
}

impl SchedulerConfig {
    /// Optimization interval
    #[inline]
    #[must_use]
    pub fn optimize_interval(&self) -> Duration {
        Duration::from_secs(self.optimize_interval_secs)
    }

    /// Cleanup interval
    #[inline]
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            optimize_interval_secs: 10 * 60,
            cleanup_interval_secs: 5 * 60,
        }
    }
}

/// Generation collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Answer from canned responses when no generator is wired, and fall back
    /// to them when the generator rejects credentials. Development only.
    pub use_canned_responses: bool,
    /// Model requested when the caller names none
    pub default_model: String,
    /// Estimated cost per 1000 tokens, by model id
    pub cost_per_1k_tokens: BTreeMap<String, f64>,
    /// Estimated cost per 1000 tokens for unlisted models
    pub default_cost_per_1k_tokens: f64,
}

impl GeneratorConfig {
    /// Estimated cost of `tokens` on `model`
    #[must_use]
    pub fn estimate_cost(&self, model: &str, tokens: u64) -> f64 {
        let rate = self
            .cost_per_1k_tokens
            .get(model)
            .copied()
            .unwrap_or(self.default_cost_per_1k_tokens);
        tokens as f64 / 1000.0 * rate
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            use_canned_responses: false,
            default_model: "gpt-4o-mini".to_string(),
            cost_per_1k_tokens: BTreeMap::from([
                ("gpt-4o".to_string(), 0.01),
                ("gpt-4o-mini".to_string(), 0.0006),
            ]),
            default_cost_per_1k_tokens: 0.002,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Analysis cache
    pub cache: CacheConfig,
    /// Alert rules and channels
    pub alerts: AlertConfig,
    /// Background loops
    pub scheduler: SchedulerConfig,
    /// Generation collaborator
    pub generator: GeneratorConfig,
}

impl AdvisorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With cache section
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With alerts section
    #[must_use]
    pub fn with_alerts(mut self, alerts: AlertConfig) -> Self {
        self.alerts = alerts;
        self
    }

    /// With scheduler section
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// With generator section
    #[must_use]
    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    /// Parse and validate TOML text
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on bad syntax or shape, otherwise whatever
    /// [`Self::validate`] rejects
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`ConfigError::Io`] if unreadable, otherwise as [`Self::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Check every section
    ///
    /// # Errors
    /// The first inconsistency found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.alerts.validate()?;
        if self.scheduler.optimize_interval_secs == 0 || self.scheduler.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler intervals must be positive".into(),
            ));
        }
        let rates = std::iter::once(&self.generator.default_cost_per_1k_tokens)
            .chain(self.generator.cost_per_1k_tokens.values());
        for rate in rates {
            if !rate.is_finite() || *rate < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "token cost {rate} is not a non-negative number"
                )));
            }
        }
        if self.generator.default_model.trim().is_empty() {
            return Err(ConfigError::Invalid("default model is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_alerts::{AlertError, ChannelKind};

    #[test]
    fn empty_toml_is_default() {
        let config = AdvisorConfig::from_toml_str("").unwrap();
        assert_eq!(config, AdvisorConfig::default());
        assert_eq!(config.scheduler.optimize_interval(), Duration::from_secs(600));
        assert_eq!(config.alerts.delivery_timeout(), Duration::from_secs(30));
        assert!(!config.generator.use_canned_responses);
    }

    #[test]
    fn sections_parse() {
        let config = AdvisorConfig::from_toml_str(
            r#"
            [cache]
            initial_capacity = 200
            min_capacity = 50

            [alerts]
            daily_cost_budget = 20.0

            [[alerts.channels]]
            id = "ops"
            name = "Ops hook"
            type = "webhook"
            config = { url = "https://hooks.example.com/ops" }
            filters = [{ field = "severity", operator = "in", value = ["high", "critical"] }]

            [generator]
            use_canned_responses = true
            cost_per_1k_tokens = { "gpt-4o" = 0.02 }
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.initial_capacity, 200);
        assert_eq!(config.cache.max_capacity, 10_000);
        assert_eq!(config.alerts.channels[0].kind, ChannelKind::Webhook);
        assert!(config.generator.use_canned_responses);
        assert!((config.generator.estimate_cost("gpt-4o", 500) - 0.01).abs() < 1e-12);
        assert!((config.generator.estimate_cost("other", 1000) - 0.002).abs() < 1e-12);
    }

    #[test]
    fn bad_filter_operator_fails_to_parse() {
        let err = AdvisorConfig::from_toml_str(
            r#"
            [[alerts.channels]]
            id = "ops"
            name = "ops"
            type = "log"
            filters = [{ field = "severity", operator = "matches", value = "h" }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn malformed_filter_operand_rejected() {
        let err = AdvisorConfig::from_toml_str(
            r#"
            [[alerts.channels]]
            id = "ops"
            name = "ops"
            type = "log"
            filters = [{ field = "severity", operator = "in", value = "high" }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Alerts(AlertError::InvalidFilter(_))));
    }

    #[test]
    fn inverted_cache_band_rejected() {
        let err = AdvisorConfig::from_toml_str("[cache]\nmin_capacity = 500\nmax_capacity = 100\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Cache(_)));
    }

    #[test]
    fn zero_interval_rejected() {
        let config = AdvisorConfig::new().with_scheduler(SchedulerConfig {
            optimize_interval_secs: 0,
            ..SchedulerConfig::default()
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AdvisorConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
