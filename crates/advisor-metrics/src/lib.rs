//! Metrics aggregation for the consulting backend
//!
//! Request paths report connection, message, AI-generation, engagement and
//! error events to a shared [`MetricsAggregator`]. Readers take consistent
//! [`MetricsSnapshot`]s with rates derived on demand, and
//! [`render_exposition`] turns a snapshot into scrapeable text.
//!
//! ```
//! use advisor_metrics::{MetricsAggregator, MessageEvent};
//!
//! let metrics = MetricsAggregator::default();
//! metrics.record_message(MessageEvent::Sent, None);
//! assert_eq!(metrics.snapshot().messages.sent, 1);
//! ```

pub mod aggregator;
pub mod events;
pub mod exposition;
pub mod snapshot;
mod window;

pub use aggregator::{MetricsAggregator, MAX_TRACKED_USERS, RESPONSE_WINDOW};
pub use events::{
    AiRequestRecord, ConnectionEvent, EngagementKind, ErrorCategory, MessageEvent, UserEngagement,
};
pub use exposition::{render_exposition, write_snapshot, ExpositionWriter, MetricKind, METRIC_PREFIX};
pub use snapshot::{
    ratio_or, AiSnapshot, ConnectionSnapshot, ErrorSnapshot, MessageSnapshot, MetricsSnapshot,
    ModelUsage, PerformanceSnapshot, UserSnapshot,
};
