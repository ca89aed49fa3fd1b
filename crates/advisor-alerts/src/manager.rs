//! Alert lifecycle, rule and channel administration, periodic checks
//!
//! Active alerts are indexed by id in a `DashMap` until resolved; every
//! alert is also appended to a bounded history ring. Notification happens
//! after the alert has been stored and all locks are released.

use crate::alert::{Alert, AlertSeverity, NewAlert};
use crate::channel::{AlertChannel, ChannelUpdate};
use crate::config::AlertConfig;
use crate::dispatcher::{DeliveryOutcome, NotificationDispatcher};
use crate::engine::AlertRuleEngine;
use crate::error::AlertError;
use crate::rule::{AlertRule, RuleUpdate};
use crate::source::{MetricSource, MetricView};
use advisor_metrics::MetricsAggregator;
use advisor_primitives::{Clock, SharedClock};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Shortest interval accepted by [`AlertManager::start_periodic_checks`]
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Counts over active alerts and history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlertStatistics {
    /// Unresolved alerts
    pub active: usize,
    /// Alerts currently in history
    pub history_len: usize,
    /// Alerts created since start
    pub total_created: u64,
    /// Alerts resolved since start
    pub total_resolved: u64,
    /// History count per severity
    pub by_severity: BTreeMap<String, u64>,
    /// History count per type
    pub by_type: BTreeMap<String, u64>,
}

/// Owns rules, channels, active alerts and history
pub struct AlertManager {
    clock: SharedClock,
    metrics: Arc<MetricsAggregator>,
    engine: AlertRuleEngine,
    channels: RwLock<BTreeMap<String, AlertChannel>>,
    sources: RwLock<Vec<Arc<dyn MetricSource>>>,
    active: DashMap<String, Alert>,
    history: RwLock<VecDeque<Alert>>,
    history_capacity: usize,
    dispatcher: Arc<NotificationDispatcher>,
    created: AtomicU64,
    resolved: AtomicU64,
}

impl fmt::Debug for AlertManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertManager")
            .field("rules", &self.engine.len())
            .field("channels", &self.channels.read().len())
            .field("active", &self.active.len())
            .field("history_capacity", &self.history_capacity)
            .finish_non_exhaustive()
    }
}

impl AlertManager {
    /// Build from configuration
    ///
    /// # Errors
    /// Returns the first configuration error found
    pub fn new(
        config: &AlertConfig,
        metrics: Arc<MetricsAggregator>,
        dispatcher: NotificationDispatcher,
        clock: SharedClock,
    ) -> Result<Self, AlertError> {
        config.validate()?;
        let engine = AlertRuleEngine::new(Arc::clone(&clock), config.effective_rules())?;
        let channels = config
            .channels
            .iter()
            .map(|c| (c.id.clone(), c.clone()))
            .collect();

        tracing::info!(
            rules = engine.len(),
            channels = config.channels.len(),
            "alert manager initialized"
        );

        Ok(Self {
            clock,
            metrics,
            engine,
            channels: RwLock::new(channels),
            sources: RwLock::new(Vec::new()),
            active: DashMap::new(),
            history: RwLock::new(VecDeque::with_capacity(config.history_capacity.min(1024))),
            history_capacity: config.history_capacity.max(1),
            dispatcher: Arc::new(dispatcher),
            created: AtomicU64::new(0),
            resolved: AtomicU64::new(0),
        })
    }

    /// Register an extra metric section for rules to read
    pub fn register_source(&self, source: Arc<dyn MetricSource>) {
        let mut sources = self.sources.write();
        sources.retain(|s| s.name() != source.name());
        sources.push(source);
    }

    /// Store a new alert and notify matching channels in the background
    pub fn create_alert(&self, draft: NewAlert) -> Alert {
        let alert = self.store(draft);
        self.notify(&alert);
        alert
    }

    /// Store a new alert and wait for every delivery to finish
    pub async fn create_alert_and_wait(&self, draft: NewAlert) -> (Alert, Vec<DeliveryOutcome>) {
        let alert = self.store(draft);
        let channels = self.get_alert_channels();
        let outcomes = self.dispatcher.deliver(&alert, &channels).await;
        (alert, outcomes)
    }

    fn store(&self, draft: NewAlert) -> Alert {
        let alert = Alert::from_new(draft, self.clock.now());
        self.active.insert(alert.id.clone(), alert.clone());
        {
            let mut history = self.history.write();
            if history.len() == self.history_capacity {
                history.pop_front();
            }
            history.push_back(alert.clone());
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            alert_id = %alert.id,
            severity = %alert.severity,
            alert_type = %alert.alert_type,
            "alert created: {}",
            alert.title
        );
        alert
    }

    fn notify(&self, alert: &Alert) {
        let channels = self.get_alert_channels();
        if channels.is_empty() {
            return;
        }
        // Fire-and-forget: outcomes are logged by the dispatcher
        let _ = self.dispatcher.dispatch(alert.clone(), channels);
    }

    /// Mark an active alert resolved
    ///
    /// # Errors
    /// Returns [`AlertError::AlertNotFound`] if no active alert has this id
    pub fn resolve_alert(&self, id: &str) -> Result<Alert, AlertError> {
        let (_, mut alert) = self
            .active
            .remove(id)
            .ok_or_else(|| AlertError::AlertNotFound(id.to_string()))?;
        let now = self.clock.now();
        alert.resolved = true;
        alert.resolved_at = Some(now);

        if let Some(entry) = self.history.write().iter_mut().rev().find(|a| a.id == id) {
            entry.resolved = true;
            entry.resolved_at = Some(now);
        }
        self.resolved.fetch_add(1, Ordering::Relaxed);
        tracing::info!(alert_id = %id, "alert resolved");
        Ok(alert)
    }

    /// Unresolved alerts, newest first
    #[must_use]
    pub fn get_active_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self.active.iter().map(|e| e.value().clone()).collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts
    }

    /// One active alert
    #[must_use]
    pub fn get_active_alert(&self, id: &str) -> Option<Alert> {
        self.active.get(id).map(|e| e.value().clone())
    }

    /// History page, newest first, skipping `offset` alerts
    #[must_use]
    pub fn get_alert_history(&self, limit: usize, offset: usize) -> Vec<Alert> {
        self.history
            .read()
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    /// All rules
    #[must_use]
    pub fn get_alert_rules(&self) -> Vec<AlertRule> {
        self.engine.rules()
    }

    /// Partially update a rule
    ///
    /// # Errors
    /// [`AlertError::RuleNotFound`] or [`AlertError::InvalidRule`]
    pub fn update_alert_rule(&self, id: &str, update: RuleUpdate) -> Result<AlertRule, AlertError> {
        let rule = self.engine.update_rule(id, update)?;
        tracing::info!(rule = %id, "alert rule updated");
        Ok(rule)
    }

    /// Add a rule
    ///
    /// # Errors
    /// [`AlertError::InvalidRule`] if invalid or the id is taken
    pub fn add_alert_rule(&self, rule: AlertRule) -> Result<(), AlertError> {
        let id = rule.id.clone();
        self.engine.add_rule(rule)?;
        tracing::info!(rule = %id, "alert rule added");
        Ok(())
    }

    /// Remove a rule
    ///
    /// # Errors
    /// [`AlertError::RuleNotFound`] for an unknown id
    pub fn remove_alert_rule(&self, id: &str) -> Result<AlertRule, AlertError> {
        let rule = self.engine.remove_rule(id)?;
        tracing::info!(rule = %id, "alert rule removed");
        Ok(rule)
    }

    /// All channels, ordered by id
    #[must_use]
    pub fn get_alert_channels(&self) -> Vec<AlertChannel> {
        self.channels.read().values().cloned().collect()
    }

    /// Partially update a channel; unchanged if the result is invalid
    ///
    /// # Errors
    /// [`AlertError::ChannelNotFound`], [`AlertError::InvalidChannel`] or
    /// [`AlertError::InvalidFilter`]
    pub fn update_alert_channel(
        &self,
        id: &str,
        update: ChannelUpdate,
    ) -> Result<AlertChannel, AlertError> {
        let mut channels = self.channels.write();
        let current = channels
            .get_mut(id)
            .ok_or_else(|| AlertError::ChannelNotFound(id.to_string()))?;
        let mut updated = current.clone();
        update.apply(&mut updated);
        updated.validate()?;
        *current = updated.clone();
        drop(channels);
        tracing::info!(channel = %id, "alert channel updated");
        Ok(updated)
    }

    /// Add a channel
    ///
    /// # Errors
    /// Validation errors, or [`AlertError::InvalidChannel`] if the id is taken
    pub fn add_alert_channel(&self, channel: AlertChannel) -> Result<(), AlertError> {
        channel.validate()?;
        let mut channels = self.channels.write();
        if channels.contains_key(&channel.id) {
            return Err(AlertError::InvalidChannel(format!(
                "duplicate channel id {}",
                channel.id
            )));
        }
        tracing::info!(channel = %channel.id, kind = %channel.kind, "alert channel added");
        channels.insert(channel.id.clone(), channel);
        Ok(())
    }

    /// Remove a channel
    ///
    /// # Errors
    /// [`AlertError::ChannelNotFound`] for an unknown id
    pub fn remove_alert_channel(&self, id: &str) -> Result<AlertChannel, AlertError> {
        let channel = self
            .channels
            .write()
            .remove(id)
            .ok_or_else(|| AlertError::ChannelNotFound(id.to_string()))?;
        tracing::info!(channel = %id, "alert channel removed");
        Ok(channel)
    }

    /// Counts over active alerts and history
    #[must_use]
    pub fn alert_statistics(&self) -> AlertStatistics {
        let history = self.history.read();
        let mut stats = AlertStatistics {
            active: self.active.len(),
            history_len: history.len(),
            total_created: self.created.load(Ordering::Relaxed),
            total_resolved: self.resolved.load(Ordering::Relaxed),
            ..AlertStatistics::default()
        };
        for severity in [
            AlertSeverity::Low,
            AlertSeverity::Medium,
            AlertSeverity::High,
            AlertSeverity::Critical,
        ] {
            stats.by_severity.insert(severity.as_str().to_string(), 0);
        }
        for alert in history.iter() {
            *stats
                .by_severity
                .entry(alert.severity.as_str().to_string())
                .or_default() += 1;
            *stats
                .by_type
                .entry(alert.alert_type.as_str().to_string())
                .or_default() += 1;
        }
        stats
    }

    /// Metric view for one evaluation cycle
    #[must_use]
    pub fn current_view(&self) -> MetricView {
        let mut view = MetricView::from_snapshot(&self.metrics.snapshot());
        for source in self.sources.read().iter() {
            view.add_source(source.as_ref());
        }
        view
    }

    /// Run one evaluation cycle, raising an alert per fired rule
    pub fn check_alerts(&self) -> Vec<Alert> {
        let view = self.current_view();
        self.engine
            .evaluate(&view)
            .into_iter()
            .map(|draft| self.create_alert(draft))
            .collect()
    }

    /// Evaluate every `interval` until `shutdown` flips to `true`
    ///
    /// Returns at once if `shutdown` is already `true`. A zero interval is
    /// raised to [`MIN_CHECK_INTERVAL`].
    pub fn start_periodic_checks(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let interval = if interval < MIN_CHECK_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis(),
                "alert check interval below minimum, using {}s",
                MIN_CHECK_INTERVAL.as_secs()
            );
            MIN_CHECK_INTERVAL
        } else {
            interval
        };
        tokio::spawn(async move {
            if *shutdown.borrow() {
                return;
            }
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;
            tracing::info!(interval_secs = interval.as_secs(), "periodic alert checks started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let fired = manager.check_alerts();
                        if !fired.is_empty() {
                            tracing::debug!(count = fired.len(), "alert check raised alerts");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("periodic alert checks stopped");
        })
    }
}
