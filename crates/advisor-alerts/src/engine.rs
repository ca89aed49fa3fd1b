//! Rule evaluation with per-rule cooldown
//!
//! Each cycle is a stateless check of every enabled rule against one
//! [`MetricView`]; the only memory carried between cycles is each rule's
//! `last_fired_at`. Evaluation holds the rules write lock for the whole cycle,
//! so two overlapping cycles cannot both see a rule as cooled down.

use crate::alert::{metadata_keys, NewAlert};
use crate::error::AlertError;
use crate::rule::{AlertRule, RuleUpdate};
use crate::source::MetricView;
use advisor_primitives::{Clock, SharedClock};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Threshold rule set and its evaluator
#[derive(Debug)]
pub struct AlertRuleEngine {
    clock: SharedClock,
    rules: RwLock<BTreeMap<String, AlertRule>>,
}

impl AlertRuleEngine {
    /// Create engine over `rules`, rejecting invalid ones
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidRule`] for an invalid or duplicate rule
    pub fn new(clock: SharedClock, rules: Vec<AlertRule>) -> Result<Self, AlertError> {
        let engine = Self {
            clock,
            rules: RwLock::new(BTreeMap::new()),
        };
        for rule in rules {
            engine.add_rule(rule)?;
        }
        Ok(engine)
    }

    /// Evaluate every enabled rule, stamping the ones that fire
    pub fn evaluate(&self, view: &MetricView) -> Vec<NewAlert> {
        let now = self.clock.now();
        let mut rules = self.rules.write();
        let mut fired = Vec::new();

        for rule in rules.values_mut() {
            if !rule.enabled || rule.is_cooling_down(now) {
                continue;
            }
            let Some(value) = view.resolve(&rule.metric) else {
                tracing::debug!(rule = %rule.id, metric = %rule.metric, "metric unavailable, rule skipped");
                continue;
            };
            if !rule.matches(value) {
                continue;
            }

            rule.last_fired_at = Some(now);
            tracing::info!(
                rule = %rule.id,
                metric = %rule.metric,
                value,
                threshold = rule.threshold,
                "alert rule fired"
            );
            fired.push(
                NewAlert::new(
                    rule.alert_type,
                    rule.severity,
                    rule.name.clone(),
                    format!(
                        "{} is {value} ({} {})",
                        rule.metric, rule.operator, rule.threshold
                    ),
                )
                .with_metadata(metadata_keys::RULE_ID, rule.id.clone())
                .with_metadata(metadata_keys::METRIC, rule.metric.clone())
                .with_metadata(metadata_keys::VALUE, value)
                .with_metadata(metadata_keys::THRESHOLD, rule.threshold)
                .with_metadata(metadata_keys::OPERATOR, rule.operator.as_str()),
            );
        }
        fired
    }

    /// All rules, ordered by id
    #[must_use]
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().values().cloned().collect()
    }

    /// One rule
    #[must_use]
    pub fn rule(&self, id: &str) -> Option<AlertRule> {
        self.rules.read().get(id).cloned()
    }

    /// Number of rules
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Whether there are no rules
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }

    /// Add a new rule
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidRule`] if invalid or the id is taken
    pub fn add_rule(&self, rule: AlertRule) -> Result<(), AlertError> {
        rule.validate()?;
        let mut rules = self.rules.write();
        if rules.contains_key(&rule.id) {
            return Err(AlertError::InvalidRule(format!("duplicate rule id {}", rule.id)));
        }
        rules.insert(rule.id.clone(), rule);
        Ok(())
    }

    /// Apply a partial update; the rule is unchanged if the result is invalid
    ///
    /// # Errors
    /// [`AlertError::RuleNotFound`] for an unknown id, [`AlertError::InvalidRule`]
    /// if the updated rule fails validation
    pub fn update_rule(&self, id: &str, update: RuleUpdate) -> Result<AlertRule, AlertError> {
        let mut rules = self.rules.write();
        let current = rules
            .get_mut(id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))?;
        let mut updated = current.clone();
        update.apply(&mut updated);
        updated.validate()?;
        *current = updated.clone();
        Ok(updated)
    }

    /// Remove a rule
    ///
    /// # Errors
    /// Returns [`AlertError::RuleNotFound`] for an unknown id
    pub fn remove_rule(&self, id: &str) -> Result<AlertRule, AlertError> {
        self.rules
            .write()
            .remove(id)
            .ok_or_else(|| AlertError::RuleNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSeverity;
    use crate::rule::ComparisonOperator;
    use advisor_primitives::ManualClock;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn engine_with(rule: AlertRule) -> (AlertRuleEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = AlertRuleEngine::new(clock.clone(), vec![rule]).unwrap();
        (engine, clock)
    }

    fn view(value: f64) -> MetricView {
        MetricView::from_value(json!({"errors": {"count": value}}))
    }

    #[test]
    fn cooldown_suppresses_refiring() {
        let rule = AlertRule::new("r", "errors.count", ComparisonOperator::Gt, 5.0, AlertSeverity::High)
            .with_cooldown(Duration::from_secs(600));
        let (engine, clock) = engine_with(rule);

        assert_eq!(engine.evaluate(&view(10.0)).len(), 1);
        clock.advance(Duration::from_secs(60));
        assert!(engine.evaluate(&view(10.0)).is_empty());
        clock.advance(Duration::from_secs(10 * 60));
        assert_eq!(engine.evaluate(&view(10.0)).len(), 1);
    }

    #[test]
    fn fired_alert_carries_metadata() {
        let rule = AlertRule::new("r", "errors.count", ComparisonOperator::Gt, 5.0, AlertSeverity::High);
        let (engine, clock) = engine_with(rule);

        let alerts = engine.evaluate(&view(7.0));
        let alert = &alerts[0];
        assert_eq!(alert.severity, AlertSeverity::High);
        assert_eq!(alert.metadata[metadata_keys::RULE_ID], json!("r"));
        assert_eq!(alert.metadata[metadata_keys::METRIC], json!("errors.count"));
        assert_eq!(alert.metadata[metadata_keys::VALUE], json!(7.0));
        assert_eq!(alert.metadata[metadata_keys::THRESHOLD], json!(5.0));
        assert_eq!(alert.metadata[metadata_keys::OPERATOR], json!("gt"));
        assert_eq!(engine.rule("r").unwrap().last_fired_at, Some(clock.now()));
    }

    #[test]
    fn missing_metric_skips_only_that_rule() {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = AlertRuleEngine::new(
            clock,
            vec![
                AlertRule::new("cache", "cache.hit_rate", ComparisonOperator::Lt, 0.7, AlertSeverity::Low),
                AlertRule::new("errs", "errors.count", ComparisonOperator::Gt, 1.0, AlertSeverity::High),
            ],
        )
        .unwrap();

        let alerts = engine.evaluate(&view(3.0));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metadata[metadata_keys::RULE_ID], json!("errs"));
        assert!(engine.rule("cache").unwrap().last_fired_at.is_none());
    }

    #[test]
    fn disabled_rules_never_fire() {
        let mut rule = AlertRule::new("r", "errors.count", ComparisonOperator::Gt, 0.0, AlertSeverity::Low);
        rule.enabled = false;
        let (engine, _clock) = engine_with(rule);
        assert!(engine.evaluate(&view(1.0)).is_empty());
    }

    #[test]
    fn update_and_remove() {
        let rule = AlertRule::new("r", "errors.count", ComparisonOperator::Gt, 5.0, AlertSeverity::Low);
        let (engine, _clock) = engine_with(rule);

        let bad = RuleUpdate {
            threshold: Some(f64::NAN),
            ..RuleUpdate::default()
        };
        assert!(matches!(engine.update_rule("r", bad), Err(AlertError::InvalidRule(_))));
        assert_eq!(engine.rule("r").unwrap().threshold, 5.0);

        let missing = engine.update_rule("nope", RuleUpdate::default());
        assert!(matches!(missing, Err(AlertError::RuleNotFound(_))));

        engine.remove_rule("r").unwrap();
        assert!(engine.is_empty());
        assert!(matches!(engine.remove_rule("r"), Err(AlertError::RuleNotFound(_))));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let rule = AlertRule::new("r", "m", ComparisonOperator::Gt, 1.0, AlertSeverity::Low);
        let clock = Arc::new(ManualClock::starting_now());
        assert!(AlertRuleEngine::new(clock, vec![rule.clone(), rule]).is_err());
    }
}
