//! Notification channels and their filters

use crate::alert::Alert;
use crate::error::AlertError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Delivery mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// HTTP POST of a JSON payload
    Webhook,
    /// Structured log event
    Log,
    /// Email through an injected sender
    Email,
}

impl ChannelKind {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::Log => "log",
            Self::Email => "email",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Webhook endpoint
    pub url: Option<String>,
    /// Extra webhook headers
    pub headers: BTreeMap<String, String>,
    /// Email recipients
    pub recipients: Vec<String>,
    /// Per-channel delivery timeout overriding the dispatcher default
    pub timeout_secs: Option<u64>,
}

impl ChannelConfig {
    /// Delivery timeout override
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Filter predicate operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Field equals value
    Equals,
    /// Field absent or different from value
    NotEquals,
    /// Field contains value as a substring
    Contains,
    /// Field is one of a list of values
    In,
}

/// One field/operator/value predicate over an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFilter {
    /// Alert field, see [`Alert::field`]
    pub field: String,
    /// Operator
    pub operator: FilterOperator,
    /// Scalar operand, or an array for [`FilterOperator::In`]
    pub value: Value,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl ChannelFilter {
    /// Create filter
    #[must_use]
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Shorthand for an `equals` filter
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Equals, Value::String(value.into()))
    }

    /// Check operand shape against the operator
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidFilter`] on an empty field, a non-scalar
    /// operand, or an `in` operand that is not a non-empty array of scalars
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.field.trim().is_empty() {
            return Err(AlertError::InvalidFilter("filter field is empty".into()));
        }
        match self.operator {
            FilterOperator::In => {
                let items = self.value.as_array().ok_or_else(|| {
                    AlertError::InvalidFilter(format!("`in` on {} needs an array", self.field))
                })?;
                if items.is_empty() || items.iter().any(|v| scalar_text(v).is_none()) {
                    return Err(AlertError::InvalidFilter(format!(
                        "`in` on {} needs a non-empty array of scalars",
                        self.field
                    )));
                }
            }
            _ => {
                if scalar_text(&self.value).is_none() {
                    return Err(AlertError::InvalidFilter(format!(
                        "{:?} on {} needs a scalar value",
                        self.operator, self.field
                    )));
                }
            }
        }
        Ok(())
    }

    /// Whether `alert` satisfies this predicate
    #[must_use]
    pub fn matches(&self, alert: &Alert) -> bool {
        let actual = alert.field(&self.field);
        match self.operator {
            FilterOperator::Equals => {
                actual.is_some() && actual == scalar_text(&self.value)
            }
            FilterOperator::NotEquals => actual.is_none() || actual != scalar_text(&self.value),
            FilterOperator::Contains => match (actual, scalar_text(&self.value)) {
                (Some(actual), Some(needle)) => actual.contains(&needle),
                _ => false,
            },
            FilterOperator::In => {
                let (Some(actual), Some(items)) = (actual, self.value.as_array()) else {
                    return false;
                };
                items
                    .iter()
                    .filter_map(scalar_text)
                    .any(|candidate| candidate == actual)
            }
        }
    }
}

/// Delivery target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertChannel {
    /// Unique id
    pub id: String,
    /// Display name, sent as `channelName` to webhooks
    pub name: String,
    /// Delivery mechanism
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Kind-specific options
    #[serde(default)]
    pub config: ChannelConfig,
    /// Disabled channels receive nothing
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// All must match for delivery
    #[serde(default)]
    pub filters: Vec<ChannelFilter>,
}

fn enabled_by_default() -> bool {
    true
}

impl AlertChannel {
    /// Create an enabled, unfiltered channel
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            config: ChannelConfig::default(),
            enabled: true,
            filters: Vec::new(),
        }
    }

    /// Webhook channel posting to `url`
    #[must_use]
    pub fn webhook(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        let mut channel = Self::new(id, name, ChannelKind::Webhook);
        channel.config.url = Some(url.into());
        channel
    }

    /// With a filter
    #[must_use]
    pub fn with_filter(mut self, filter: ChannelFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// With a webhook header
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// With email recipients
    #[must_use]
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Self {
        self.config.recipients = recipients;
        self
    }

    /// With delivery timeout override
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Whether `alert` should be delivered here
    #[must_use]
    pub fn accepts(&self, alert: &Alert) -> bool {
        self.enabled && self.filters.iter().all(|f| f.matches(alert))
    }

    /// Check kind-specific options and filters
    ///
    /// # Errors
    /// Returns [`AlertError::InvalidChannel`] for missing or malformed
    /// options and [`AlertError::InvalidFilter`] for a bad filter
    pub fn validate(&self) -> Result<(), AlertError> {
        if self.id.trim().is_empty() {
            return Err(AlertError::InvalidChannel("channel id is empty".into()));
        }
        match self.kind {
            ChannelKind::Webhook => {
                let url = self.config.url.as_deref().ok_or_else(|| {
                    AlertError::InvalidChannel(format!("webhook {} has no url", self.id))
                })?;
                let parsed = reqwest::Url::parse(url).map_err(|e| {
                    AlertError::InvalidChannel(format!("webhook {} url: {e}", self.id))
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AlertError::InvalidChannel(format!(
                        "webhook {} url must be http(s)",
                        self.id
                    )));
                }
            }
            ChannelKind::Email => {
                if self.config.recipients.is_empty() {
                    return Err(AlertError::InvalidChannel(format!(
                        "email channel {} has no recipients",
                        self.id
                    )));
                }
            }
            ChannelKind::Log => {}
        }
        if self.config.timeout_secs == Some(0) {
            return Err(AlertError::InvalidChannel(format!(
                "channel {} timeout must be positive",
                self.id
            )));
        }
        self.filters.iter().try_for_each(ChannelFilter::validate)
    }
}

/// Partial channel update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelUpdate {
    /// New display name
    pub name: Option<String>,
    /// New options
    pub config: Option<ChannelConfig>,
    /// Enable or disable
    pub enabled: Option<bool>,
    /// Replacement filter list
    pub filters: Option<Vec<ChannelFilter>>,
}

impl ChannelUpdate {
    /// Apply onto `channel`
    pub fn apply(self, channel: &mut AlertChannel) {
        if let Some(name) = self.name {
            channel.name = name;
        }
        if let Some(config) = self.config {
            channel.config = config;
        }
        if let Some(enabled) = self.enabled {
            channel.enabled = enabled;
        }
        if let Some(filters) = self.filters {
            channel.filters = filters;
        }
    }
}
