//! Alerting configuration

use crate::channel::AlertChannel;
use crate::error::AlertError;
use crate::rule::{default_rules, AlertRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Alert manager settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Seconds between rule evaluation cycles
    pub check_interval_secs: u64,
    /// Alerts kept in history
    pub history_capacity: usize,
    /// Threshold for the daily AI cost rule
    pub daily_cost_budget: f64,
    /// Per-delivery timeout in seconds
    pub delivery_timeout_secs: u64,
    /// Load the built-in rule set
    pub include_default_rules: bool,
    /// Rules added after the defaults
    pub rules: Vec<AlertRule>,
    /// Notification channels
    pub channels: Vec<AlertChannel>,
}

impl AlertConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With evaluation interval
    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_secs = interval.as_secs();
        self
    }

    /// With history capacity
    #[must_use]
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// With daily AI cost budget
    #[must_use]
    pub fn with_daily_cost_budget(mut self, budget: f64) -> Self {
        self.daily_cost_budget = budget;
        self
    }

    /// Without the built-in rules
    #[must_use]
    pub fn without_default_rules(mut self) -> Self {
        self.include_default_rules = false;
        self
    }

    /// With an extra rule
    #[must_use]
    pub fn with_rule(mut self, rule: AlertRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// With a channel
    #[must_use]
    pub fn with_channel(mut self, channel: AlertChannel) -> Self {
        self.channels.push(channel);
        self
    }

    /// Evaluation interval
    #[inline]
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Delivery timeout
    #[inline]
    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_secs(self.delivery_timeout_secs)
    }

    /// Built-in rules (if enabled) followed by the configured ones
    #[must_use]
    pub fn effective_rules(&self) -> Vec<AlertRule> {
        let mut rules = if self.include_default_rules {
            default_rules(self.daily_cost_budget)
        } else {
            Vec::new()
        };
        rules.extend(self.rules.iter().cloned());
        rules
    }

    /// Check settings, rules and channels
    ///
    /// # Errors
    /// Returns the first invalid setting, rule, channel or filter found
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.check_interval_secs == 0 {
            return Err(AlertError::InvalidRule("check interval must be positive".into()));
        }
        if self.history_capacity == 0 {
            return Err(AlertError::InvalidRule("history capacity must be positive".into()));
        }
        if self.delivery_timeout_secs == 0 {
            return Err(AlertError::InvalidChannel("delivery timeout must be positive".into()));
        }
        if !self.daily_cost_budget.is_finite() || self.daily_cost_budget < 0.0 {
            return Err(AlertError::InvalidRule(format!(
                "daily cost budget {} is not a non-negative number",
                self.daily_cost_budget
            )));
        }

        let mut rule_ids = HashSet::new();
        for rule in self.effective_rules() {
            rule.validate()?;
            if !rule_ids.insert(rule.id.clone()) {
                return Err(AlertError::InvalidRule(format!("duplicate rule id {}", rule.id)));
            }
        }

        let mut channel_ids = HashSet::new();
        for channel in &self.channels {
            channel.validate()?;
            if !channel_ids.insert(channel.id.as_str()) {
                return Err(AlertError::InvalidChannel(format!(
                    "duplicate channel id {}",
                    channel.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            history_capacity: 1000,
            daily_cost_budget: 50.0,
            delivery_timeout_secs: 30,
            include_default_rules: true,
            rules: Vec::new(),
            channels: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSeverity;
    use crate::channel::{ChannelFilter, ChannelKind, FilterOperator};
    use crate::rule::ComparisonOperator;

    #[test]
    fn default_is_valid() {
        let config = AlertConfig::default();
        config.validate().unwrap();
        assert_eq!(config.effective_rules().len(), 6);
        assert_eq!(config.check_interval(), Duration::from_secs(60));
    }

    #[test]
    fn rule_colliding_with_default_rejected() {
        let config = AlertConfig::new().with_rule(AlertRule::new(
            "high_error_rate",
            "errors.error_rate",
            ComparisonOperator::Gt,
            0.1,
            AlertSeverity::Critical,
        ));
        assert!(matches!(config.validate(), Err(AlertError::InvalidRule(_))));
        assert!(config.without_default_rules().validate().is_ok());
    }

    #[test]
    fn malformed_channel_filter_rejected() {
        let config = AlertConfig::new().with_channel(
            AlertChannel::new("c", "c", ChannelKind::Log)
                .with_filter(ChannelFilter::new("severity", FilterOperator::In, "high")),
        );
        assert!(matches!(config.validate(), Err(AlertError::InvalidFilter(_))));
    }

    #[test]
    fn zero_intervals_rejected() {
        let config = AlertConfig::new().with_check_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = AlertConfig {
            delivery_timeout_secs: 0,
            ..AlertConfig::default()
        };
        assert!(matches!(config.validate(), Err(AlertError::InvalidChannel(_))));
    }

    #[test]
    fn budget_flows_into_cost_rule() {
        let rules = AlertConfig::new().with_daily_cost_budget(12.5).effective_rules();
        let cost = rules.iter().find(|r| r.id == "daily_cost_exceeded").unwrap();
        assert_eq!(cost.threshold, 12.5);
    }
}
