//! Threshold rules

use crate::alert::{AlertSeverity, AlertType};
use crate::error::AlertError;
use advisor_primitives::elapsed_between;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Numeric comparison applied as `value <op> threshold`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `==` within `f64::EPSILON`
    Eq,
    /// `!=` beyond `f64::EPSILON`
    Ne,
}

impl ComparisonOperator {
    /// Apply the comparison; NaN never matches
    #[must_use]
    pub fn evaluate(self, value: f64, threshold: f64) -> bool {
        if value.is_nan() || threshold.is_nan() {
            return false;
        }
        match self {
            Self::Gt => value > threshold,
            Self::Gte => value >= threshold,
            Self::Lt => value < threshold,
            Self::Lte => value <= threshold,
            Self::Eq => (value - threshold).abs() <= f64::EPSILON,
            Self::Ne => (value - threshold).abs() > f64::EPSILON,
        }
    }

    /// Short name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Eq => "eq",
            Self::Ne => "ne",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" | ">" => Ok(Self::Gt),
            "gte" | ">=" => Ok(Self::Gte),
            "lt" | "<" => Ok(Self::Lt),
            "lte" | "<=" => Ok(Self::Lte),
            "eq" | "==" => Ok(Self::Eq),
            "ne" | "!=" => Ok(Self::Ne),
            other => Err(AlertError::InvalidRule(format!("unknown operator {other:?}"))),
        }
    }
}

/// Declarative threshold rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique id
    pub id: String,
    /// Display name, used as alert title
    pub name: String,
    /// Dotted metric path, e.g. `ai.success_rate`
    pub metric: String,
    /// Comparison against the threshold
    pub operator: ComparisonOperator,
    /// Threshold value
    pub threshold: f64,
    /// Severity of raised alerts
    pub severity: AlertSeverity,
    /// Type of raised alerts
    pub alert_type: AlertType,
    /// How long the condition should hold before firing.
    /// Stored and reported only; evaluation samples once per cycle.
    #[serde(default)]
    pub min_duration_secs: u64,
    /// Minimum gap between two firings
    pub cooldown_secs: u64,
    /// Disabled rules are skipped
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Last firing time
    #[serde(default)]
    pub last_fired_at: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

impl AlertRule {
    /// Create an enabled rule with no cooldown
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        metric: impl Into<String>,
        operator: ComparisonOperator,
        threshold: f64,
        severity: AlertSeverity,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            metric: metric.into(),
            operator,
            threshold,
            severity,
            alert_type: AlertType::Custom,
            min_duration_secs: 0,
            cooldown_secs: 0,
            enabled: true,
            last_fired_at: None,
        }
    }

    /// With display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// With alert type
    #[must_use]
    pub fn with_type(mut self, alert_type: AlertType) -> Self {
        self.alert_type = alert_type;
        self
    }

    /// With cooldown
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown_secs = cooldown.as_secs();
        self
    }

    /// With reserved sustain duration
    #[must_use]
    pub fn with_min_duration(mut self, duration: Duration) -> Self {
        self.min_duration_secs = duration.as_secs();
        self
    }

    /// Cooldown as a duration
    #[inline]
    #[must_use]
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Whether the rule fired less than one cooldown before `now`
    #[must_use]
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.last_fired_at
            .is_some_and(|fired| elapsed_between(fired, now) < self.cooldown())
    }

    /// Whether `value` trips the rule
    #[inline]
    #[must_use]
    pub fn matches(&self, value: f64) -> bool {
        self.operator.evaluate(value, self.threshold)
    }

    /// Check the definition
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidRule`] for an empty id or metric, or a
    /// non-finite threshold
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.id.trim().is_empty() {
            return Err(AlertError::InvalidRule("rule id is empty".into()));
        }
        if self.metric.trim().is_empty() {
            return Err(AlertError::InvalidRule(format!("rule {} has no metric", self.id)));
        }
        if !self.threshold.is_finite() {
            return Err(AlertError::InvalidRule(format!(
                "rule {} threshold is not finite",
                self.id
            )));
        }
        Ok(())
    }
}

/// Partial rule update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleUpdate {
    /// New display name
    pub name: Option<String>,
    /// New operator
    pub operator: Option<ComparisonOperator>,
    /// New threshold
    pub threshold: Option<f64>,
    /// New severity
    pub severity: Option<AlertSeverity>,
    /// New cooldown in seconds
    pub cooldown_secs: Option<u64>,
    /// New sustain duration in seconds
    pub min_duration_secs: Option<u64>,
    /// Enable or disable
    pub enabled: Option<bool>,
}

impl RuleUpdate {
    /// Apply onto `rule`
    pub fn apply(self, rule: &mut AlertRule) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(operator) = self.operator {
            rule.operator = operator;
        }
        if let Some(threshold) = self.threshold {
            rule.threshold = threshold;
        }
        if let Some(severity) = self.severity {
            rule.severity = severity;
        }
        if let Some(cooldown) = self.cooldown_secs {
            rule.cooldown_secs = cooldown;
        }
        if let Some(duration) = self.min_duration_secs {
            rule.min_duration_secs = duration;
        }
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
    }
}

/// Built-in rule set
#[must_use]
pub fn default_rules(daily_cost_budget: f64) -> Vec<AlertRule> {
    const MINUTE: u64 = 60;
    vec![
        AlertRule::new(
            "high_error_rate",
            "errors.error_rate",
            ComparisonOperator::Gt,
            0.05,
            AlertSeverity::High,
        )
        .with_name("High error rate")
        .with_type(AlertType::ErrorRate)
        .with_min_duration(Duration::from_secs(2 * MINUTE))
        .with_cooldown(Duration::from_secs(10 * MINUTE)),
        AlertRule::new(
            "low_connection_success",
            "connections.success_rate",
            ComparisonOperator::Lt,
            0.95,
            AlertSeverity::Medium,
        )
        .with_name("Low connection success rate")
        .with_type(AlertType::Connectivity)
        .with_cooldown(Duration::from_secs(15 * MINUTE)),
        AlertRule::new(
            "slow_responses",
            "performance.p95_response_ms",
            ComparisonOperator::Gt,
            2000.0,
            AlertSeverity::Medium,
        )
        .with_name("Slow AI responses")
        .with_type(AlertType::Performance)
        .with_cooldown(Duration::from_secs(10 * MINUTE)),
        AlertRule::new(
            "low_cache_hit_rate",
            "cache.hit_rate",
            ComparisonOperator::Lt,
            0.70,
            AlertSeverity::Low,
        )
        .with_name("Low cache hit rate")
        .with_type(AlertType::Cache)
        .with_cooldown(Duration::from_secs(30 * MINUTE)),
        AlertRule::new(
            "daily_cost_exceeded",
            "ai.daily_cost",
            ComparisonOperator::Gt,
            daily_cost_budget,
            AlertSeverity::Medium,
        )
        .with_name("Daily AI cost over budget")
        .with_type(AlertType::Cost)
        .with_cooldown(Duration::from_secs(6 * 60 * MINUTE)),
        AlertRule::new(
            "auth_failure_spike",
            "errors.auth_failures_per_minute",
            ComparisonOperator::Gt,
            10.0,
            AlertSeverity::High,
        )
        .with_name("Authentication failure spike")
        .with_type(AlertType::Security)
        .with_cooldown(Duration::from_secs(5 * MINUTE)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators() {
        use ComparisonOperator::*;
        assert!(Gt.evaluate(10.0, 5.0));
        assert!(!Gt.evaluate(5.0, 5.0));
        assert!(Gte.evaluate(5.0, 5.0));
        assert!(Lt.evaluate(0.94, 0.95));
        assert!(Lte.evaluate(0.95, 0.95));
        assert!(Eq.evaluate(1.0, 1.0));
        assert!(Ne.evaluate(1.0, 2.0));
        assert!(!Gt.evaluate(f64::NAN, 0.0));
    }

    #[test]
    fn operator_parsing() {
        assert_eq!("gte".parse::<ComparisonOperator>().unwrap(), ComparisonOperator::Gte);
        assert_eq!("!=".parse::<ComparisonOperator>().unwrap(), ComparisonOperator::Ne);
        assert!(matches!(
            "approx".parse::<ComparisonOperator>(),
            Err(AlertError::InvalidRule(_))
        ));
    }

    #[test]
    fn cooldown_window() {
        let now = Utc::now();
        let mut rule = AlertRule::new("r", "m", ComparisonOperator::Gt, 1.0, AlertSeverity::Low)
            .with_cooldown(Duration::from_secs(600));
        assert!(!rule.is_cooling_down(now));

        rule.last_fired_at = Some(now);
        assert!(rule.is_cooling_down(now + chrono::Duration::seconds(599)));
        assert!(!rule.is_cooling_down(now + chrono::Duration::seconds(600)));
    }

    #[test]
    fn defaults_are_valid_and_unique() {
        let rules = default_rules(50.0);
        assert_eq!(rules.len(), 6);
        let mut ids: Vec<_> = rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
        for rule in &rules {
            rule.validate().unwrap();
        }
        let cost = rules.iter().find(|r| r.metric == "ai.daily_cost").unwrap();
        assert_eq!(cost.threshold, 50.0);
        assert_eq!(cost.cooldown(), Duration::from_secs(6 * 3600));
    }

    #[test]
    fn non_finite_threshold_rejected() {
        let rule = AlertRule::new("r", "m", ComparisonOperator::Gt, f64::INFINITY, AlertSeverity::Low);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn partial_update() {
        let mut rule = AlertRule::new("r", "m", ComparisonOperator::Gt, 1.0, AlertSeverity::Low);
        RuleUpdate {
            threshold: Some(3.0),
            enabled: Some(false),
            ..RuleUpdate::default()
        }
        .apply(&mut rule);
        assert_eq!(rule.threshold, 3.0);
        assert!(!rule.enabled);
        assert_eq!(rule.operator, ComparisonOperator::Gt);
    }
}
