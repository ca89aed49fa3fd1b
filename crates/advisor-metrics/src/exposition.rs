//! Plain-text metric exposition
//!
//! Renders snapshots in the line-oriented `# HELP` / `# TYPE` format that
//! Prometheus-style scrapers understand. Every metric name carries the
//! [`METRIC_PREFIX`].

use crate::snapshot::MetricsSnapshot;
use std::fmt::Write as _;

/// Prefix applied to every exported metric name
pub const METRIC_PREFIX: &str = "advisor_";

/// Metric family type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Monotonic since last reset
    Counter,
    /// Point-in-time value
    Gauge,
}

impl MetricKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }
}

/// Incremental exposition builder
#[derive(Debug, Default)]
pub struct ExpositionWriter {
    out: String,
}

impl ExpositionWriter {
    /// Create empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a single unlabeled sample with its header
    pub fn sample(&mut self, name: &str, kind: MetricKind, help: &str, value: f64) -> &mut Self {
        self.header(name, kind, help);
        let _ = writeln!(self.out, "{METRIC_PREFIX}{name} {}", format_value(value));
        self
    }

    /// Unlabeled counter
    pub fn counter(&mut self, name: &str, help: &str, value: u64) -> &mut Self {
        self.sample(name, MetricKind::Counter, help, value as f64)
    }

    /// Unlabeled gauge
    pub fn gauge(&mut self, name: &str, help: &str, value: f64) -> &mut Self {
        self.sample(name, MetricKind::Gauge, help, value)
    }

    /// One family with a sample per `(label value, value)` pair
    pub fn labeled<'a, I>(
        &mut self,
        name: &str,
        kind: MetricKind,
        help: &str,
        label: &str,
        samples: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        self.header(name, kind, help);
        for (label_value, value) in samples {
            let _ = writeln!(
                self.out,
                "{METRIC_PREFIX}{name}{{{label}=\"{}\"}} {}",
                escape_label(label_value),
                format_value(value)
            );
        }
        self
    }

    /// Finish and take the rendered text
    #[must_use]
    pub fn finish(self) -> String {
        self.out
    }

    fn header(&mut self, name: &str, kind: MetricKind, help: &str) {
        let _ = writeln!(self.out, "# HELP {METRIC_PREFIX}{name} {help}");
        let _ = writeln!(self.out, "# TYPE {METRIC_PREFIX}{name} {}", kind.as_str());
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        value.to_string()
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Write every family of `snapshot` into `writer`
pub fn write_snapshot(writer: &mut ExpositionWriter, snapshot: &MetricsSnapshot) {
    let c = &snapshot.connections;
    writer
        .counter("connections_total", "Connection attempts", c.total)
        .gauge("connections_active", "Currently open connections", c.active as f64)
        .counter("connection_failures_total", "Failed connection attempts", c.failures)
        .counter("reconnections_total", "Client reconnections", c.reconnections)
        .gauge("connection_success_rate", "Share of successful connection attempts", c.success_rate);

    let m = &snapshot.messages;
    writer
        .counter("messages_sent_total", "Messages sent", m.sent)
        .counter("messages_received_total", "Messages received", m.received)
        .counter("message_errors_total", "Failed messages", m.errors)
        .counter("message_retries_total", "Retried messages", m.retries)
        .counter("message_broadcasts_total", "Broadcast messages", m.broadcasts)
        .gauge("message_success_rate", "Share of messages handled without error", m.success_rate);

    let a = &snapshot.ai;
    writer
        .counter("ai_requests_total", "AI generation requests", a.total)
        .counter("ai_requests_failed_total", "Failed AI generation requests", a.failed)
        .gauge("ai_success_rate", "Share of successful AI requests", a.success_rate)
        .counter("ai_tokens_total", "Tokens consumed", a.total_tokens)
        .gauge("ai_cost_total", "Estimated AI cost since reset", a.total_cost)
        .gauge("ai_daily_cost", "Estimated AI cost for the current UTC day", a.daily_cost)
        .labeled(
            "ai_model_requests_total",
            MetricKind::Counter,
            "AI requests per model",
            "model",
            a.per_model.iter().map(|(k, v)| (k.as_str(), v.requests as f64)),
        );

    let u = &snapshot.users;
    writer
        .gauge("active_users", "Distinct users since reset", u.active_users as f64)
        .counter("sessions_started_total", "Chat sessions started", u.sessions_started)
        .counter("reports_generated_total", "Reports generated", u.reports_generated)
        .counter("inquiries_total", "Inquiries submitted", u.inquiries);

    let e = &snapshot.errors;
    writer
        .counter("errors_total", "Typed errors", e.total)
        .gauge("error_rate", "Errors per unit of activity", e.error_rate)
        .gauge(
            "auth_failures_per_minute",
            "Authentication failures in the trailing minute",
            e.auth_failures_per_minute as f64,
        )
        .labeled(
            "errors_by_category_total",
            MetricKind::Counter,
            "Typed errors per category",
            "category",
            e.by_category.iter().map(|(k, v)| (k.as_str(), *v as f64)),
        );

    let p = &snapshot.performance;
    writer
        .gauge("uptime_seconds", "Seconds since last reset", p.uptime_secs)
        .gauge("throughput_per_second", "Messages per second since reset", p.throughput_per_sec)
        .gauge("response_time_avg_ms", "Mean AI response time", p.average_response_ms)
        .gauge("response_time_p95_ms", "95th percentile AI response time", p.p95_response_ms)
        .gauge("response_time_p99_ms", "99th percentile AI response time", p.p99_response_ms);
}

/// Render a snapshot as exposition text
#[must_use]
pub fn render_exposition(snapshot: &MetricsSnapshot) -> String {
    let mut writer = ExpositionWriter::new();
    write_snapshot(&mut writer, snapshot);
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_has_help_and_type() {
        let mut w = ExpositionWriter::new();
        w.counter("things_total", "Things", 3);
        let text = w.finish();
        assert_eq!(
            text,
            "# HELP advisor_things_total Things\n# TYPE advisor_things_total counter\nadvisor_things_total 3\n"
        );
    }

    #[test]
    fn labels_are_escaped() {
        let mut w = ExpositionWriter::new();
        w.labeled("x", MetricKind::Gauge, "X", "model", [("a\"b", 1.5)]);
        assert!(w.finish().contains("advisor_x{model=\"a\\\"b\"} 1.5"));
    }

    #[test]
    fn non_finite_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
    }
}
