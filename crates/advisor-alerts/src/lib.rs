//! Threshold alerting over aggregated metrics
//!
//! - [`AlertRuleEngine`] checks [`AlertRule`]s against a [`MetricView`] with a
//!   per-rule cooldown
//! - [`NotificationDispatcher`] fans alerts out to the [`AlertChannel`]s whose
//!   filters all match
//! - [`AlertManager`] ties both to a [`MetricsAggregator`](advisor_metrics::MetricsAggregator),
//!   keeps active alerts and history, and runs the periodic check loop

pub mod alert;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod manager;
pub mod rule;
pub mod source;

pub use alert::{metadata_keys, Alert, AlertSeverity, AlertType, NewAlert};
pub use channel::{
    AlertChannel, ChannelConfig, ChannelFilter, ChannelKind, ChannelUpdate, FilterOperator,
};
pub use config::AlertConfig;
pub use dispatcher::{
    ChannelTransport, DeliveryOutcome, EmailSender, EmailTransport, LogTransport,
    NotificationDispatcher, WebhookPayload, WebhookTransport, DEFAULT_DELIVERY_TIMEOUT,
};
pub use engine::AlertRuleEngine;
pub use error::{AlertError, DeliveryError};
pub use manager::{AlertManager, AlertStatistics, MIN_CHECK_INTERVAL};
pub use rule::{default_rules, AlertRule, ComparisonOperator, RuleUpdate};
pub use source::{MetricSource, MetricView};
