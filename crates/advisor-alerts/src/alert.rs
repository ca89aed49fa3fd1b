//! Alert events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Recognized [`Alert::metadata`] keys set by the rule engine
pub mod metadata_keys {
    /// Id of the rule that fired
    pub const RULE_ID: &str = "rule_id";
    /// Dotted metric path the rule watches
    pub const METRIC: &str = "metric";
    /// Observed metric value
    pub const VALUE: &str = "value";
    /// Rule threshold
    pub const THRESHOLD: &str = "threshold";
    /// Comparison operator name
    pub const OPERATOR: &str = "operator";
}

/// Alert severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational
    Low,
    /// Needs attention soon
    Medium,
    /// Needs attention now
    High,
    /// Service is failing
    Critical,
}

impl AlertSeverity {
    /// Lowercase name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an alert is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Latency or throughput
    Performance,
    /// Error volume
    ErrorRate,
    /// Client connectivity
    Connectivity,
    /// Cache effectiveness
    Cache,
    /// AI spend
    Cost,
    /// Authentication and abuse
    Security,
    /// Raised by hand
    Custom,
}

impl AlertType {
    /// snake_case name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::ErrorRate => "error_rate",
            Self::Connectivity => "connectivity",
            Self::Cache => "cache",
            Self::Cost => "cost",
            Self::Security => "security",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert contents before the manager assigns id and timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    /// Category
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Urgency
    pub severity: AlertSeverity,
    /// One-line summary
    pub title: String,
    /// Details
    pub description: String,
    /// Request correlation id
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Affected user
    #[serde(default)]
    pub user_id: Option<String>,
    /// Affected session
    #[serde(default)]
    pub session_id: Option<String>,
    /// Open metadata, see [`metadata_keys`]
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl NewAlert {
    /// Create alert contents
    #[must_use]
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            alert_type,
            severity,
            title: title.into(),
            description: description.into(),
            correlation_id: None,
            user_id: None,
            session_id: None,
            metadata: BTreeMap::new(),
        }
    }

    /// With correlation id
    #[must_use]
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// With user id
    #[must_use]
    pub fn with_user_id(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }

    /// With session id
    #[must_use]
    pub fn with_session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    /// With one metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A raised alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique id
    pub id: String,
    /// Category
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    /// Urgency
    pub severity: AlertSeverity,
    /// One-line summary
    pub title: String,
    /// Details
    pub description: String,
    /// Request correlation id
    pub correlation_id: Option<String>,
    /// Affected user
    pub user_id: Option<String>,
    /// Affected session
    pub session_id: Option<String>,
    /// Open metadata, see [`metadata_keys`]
    pub metadata: BTreeMap<String, Value>,
    /// When it was raised
    pub timestamp: DateTime<Utc>,
    /// Whether it was resolved
    pub resolved: bool,
    /// When it was resolved
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Stamp `draft` with a fresh id and `timestamp`
    #[must_use]
    pub fn from_new(draft: NewAlert, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type: draft.alert_type,
            severity: draft.severity,
            title: draft.title,
            description: draft.description,
            correlation_id: draft.correlation_id,
            user_id: draft.user_id,
            session_id: draft.session_id,
            metadata: draft.metadata,
            timestamp,
            resolved: false,
            resolved_at: None,
        }
    }

    /// String view of a field, for channel filters
    ///
    /// Recognizes the top-level fields by their serialized names plus
    /// `metadata.<key>`. Absent optionals yield `None`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.clone()),
            "type" => Some(self.alert_type.as_str().to_string()),
            "severity" => Some(self.severity.as_str().to_string()),
            "title" => Some(self.title.clone()),
            "description" => Some(self.description.clone()),
            "correlation_id" => self.correlation_id.clone(),
            "user_id" => self.user_id.clone(),
            "session_id" => self.session_id.clone(),
            "resolved" => Some(self.resolved.to_string()),
            other => {
                let key = other.strip_prefix("metadata.")?;
                self.metadata.get(key).map(|v| match v {
                    Value::String(s) => s.clone(),
                    v => v.to_string(),
                })
            }
        }
    }
}
