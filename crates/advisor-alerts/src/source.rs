//! Metric resolution for rule evaluation
//!
//! Rules name metrics by dotted path. The first segment selects a section of
//! the [`MetricsSnapshot`] (`ai`, `errors`, ...) or a registered
//! [`MetricSource`] (`cache`), the rest walks into its JSON view.

use advisor_metrics::MetricsSnapshot;
use serde_json::{Map, Value};

/// Extra metric section contributed by another subsystem
pub trait MetricSource: Send + Sync {
    /// Section name, the first segment of metric paths
    fn name(&self) -> &str;

    /// Current values, or `None` when the source cannot answer this cycle
    fn metrics(&self) -> Option<Value>;
}

/// Read-only view over one evaluation cycle's metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricView {
    sections: Map<String, Value>,
}

impl MetricView {
    /// View over a metrics snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        match serde_json::to_value(snapshot) {
            Ok(Value::Object(sections)) => Self { sections },
            Ok(_) => Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "metrics snapshot not serializable, rules see no metrics");
                Self::default()
            }
        }
    }

    /// View over an arbitrary JSON object
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(sections) => Self { sections },
            _ => Self::default(),
        }
    }

    /// Add or replace one section
    pub fn insert_section(&mut self, name: impl Into<String>, value: Value) {
        self.sections.insert(name.into(), value);
    }

    /// Pull a section from `source`; an unavailable source adds nothing
    pub fn add_source(&mut self, source: &dyn MetricSource) {
        match source.metrics() {
            Some(value) => self.insert_section(source.name(), value),
            None => tracing::debug!(source = source.name(), "metric source unavailable"),
        }
    }

    /// Numeric value at a dotted path; missing or non-numeric is `None`
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<f64> {
        let mut segments = path.split('.');
        let mut current = self.sections.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        current.as_f64()
    }
}
