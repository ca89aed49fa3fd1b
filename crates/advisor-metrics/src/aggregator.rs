//! Concurrent metrics aggregator
//!
//! Every `record_*` call takes the write half of a single
//! `parking_lot::RwLock` for O(1) bookkeeping, so multi-field aggregates are
//! never torn and no increment is lost. Snapshots share the read half.
//! [`MetricsAggregator::reset`] swaps in fresh state and the new `since`
//! stamp under the same write lock, so no concurrent record can land between
//! zeroing and re-stamping.

use crate::events::{
    AiRequestRecord, ConnectionEvent, EngagementKind, ErrorCategory, MessageEvent, UserEngagement,
};
use crate::snapshot::{
    ratio_or, AiSnapshot, ConnectionSnapshot, ErrorSnapshot, MessageSnapshot, MetricsSnapshot,
    ModelUsage, PerformanceSnapshot, UserSnapshot,
};
use crate::window::SampleWindow;
use advisor_primitives::{elapsed_between, Clock, SharedClock, SystemClock};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

/// Response-time samples kept for percentile approximation
pub const RESPONSE_WINDOW: usize = 1024;

/// Distinct user ids tracked for `active_users` before new ids are ignored
pub const MAX_TRACKED_USERS: usize = 10_000;

const AUTH_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct DurationSum {
    total: Duration,
    count: u64,
}

impl DurationSum {
    fn add(&mut self, d: Duration) {
        self.total += d;
        self.count += 1;
    }

    fn mean_ms(&self) -> f64 {
        ratio_or(self.total.as_secs_f64() * 1000.0, self.count as f64, 0.0)
    }
}

#[derive(Debug, Default)]
struct ConnectionCounters {
    opened: u64,
    closed: u64,
    failures: u64,
    reconnections: u64,
    errors: u64,
    lifetime: DurationSum,
}

#[derive(Debug, Default)]
struct MessageCounters {
    sent: u64,
    received: u64,
    errors: u64,
    retries: u64,
    broadcasts: u64,
    processing: DurationSum,
}

#[derive(Debug)]
struct AiCounters {
    total: u64,
    successful: u64,
    tokens: u64,
    cost: f64,
    response: DurationSum,
    samples: SampleWindow,
    per_model: BTreeMap<String, ModelUsage>,
    cost_day: Option<NaiveDate>,
    daily_cost: f64,
}

impl Default for AiCounters {
    fn default() -> Self {
        Self {
            total: 0,
            successful: 0,
            tokens: 0,
            cost: 0.0,
            response: DurationSum::default(),
            samples: SampleWindow::new(RESPONSE_WINDOW),
            per_model: BTreeMap::new(),
            cost_day: None,
            daily_cost: 0.0,
        }
    }
}

#[derive(Debug, Default)]
struct UserCounters {
    seen: HashSet<String>,
    sessions_started: u64,
    sessions_ended: u64,
    session_length: DurationSum,
    messages: u64,
    reports: u64,
    inquiries: u64,
}

#[derive(Debug, Default)]
struct ErrorCounters {
    total: u64,
    by_category: BTreeMap<ErrorCategory, u64>,
    auth_failures: VecDeque<DateTime<Utc>>,
}

#[derive(Debug)]
struct MetricsState {
    since: DateTime<Utc>,
    connections: ConnectionCounters,
    messages: MessageCounters,
    ai: AiCounters,
    users: UserCounters,
    errors: ErrorCounters,
}

impl MetricsState {
    fn new(since: DateTime<Utc>) -> Self {
        Self {
            since,
            connections: ConnectionCounters::default(),
            messages: MessageCounters::default(),
            ai: AiCounters::default(),
            users: UserCounters::default(),
            errors: ErrorCounters::default(),
        }
    }
}

/// Accumulates raw counters from many concurrent request paths
#[derive(Debug)]
pub struct MetricsAggregator {
    clock: SharedClock,
    user_capacity: usize,
    state: RwLock<MetricsState>,
}

impl MetricsAggregator {
    /// Create aggregator reading time from `clock`
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        let since = clock.now();
        Self {
            clock,
            user_capacity: MAX_TRACKED_USERS,
            state: RwLock::new(MetricsState::new(since)),
        }
    }

    /// With a different bound on tracked user ids
    #[must_use]
    pub fn with_user_capacity(mut self, capacity: usize) -> Self {
        self.user_capacity = capacity;
        self
    }

    /// Record a connection lifecycle event
    pub fn record_connection(&self, event: ConnectionEvent) {
        let mut state = self.state.write();
        let c = &mut state.connections;
        match event {
            ConnectionEvent::Opened => c.opened += 1,
            ConnectionEvent::Closed { duration } => {
                c.closed += 1;
                c.lifetime.add(duration);
            }
            ConnectionEvent::Failed => c.failures += 1,
            ConnectionEvent::Reconnected => c.reconnections += 1,
            ConnectionEvent::Errored => c.errors += 1,
        }
    }

    /// Record a message event with optional processing time
    pub fn record_message(&self, event: MessageEvent, processing: Option<Duration>) {
        let mut state = self.state.write();
        let m = &mut state.messages;
        match event {
            MessageEvent::Sent => m.sent += 1,
            MessageEvent::Received => m.received += 1,
            MessageEvent::Error => m.errors += 1,
            MessageEvent::Retry => m.retries += 1,
            MessageEvent::Broadcast => m.broadcasts += 1,
        }
        if let Some(d) = processing {
            m.processing.add(d);
        }
    }

    /// Record a completed AI-generation request
    pub fn record_ai_request(&self, record: &AiRequestRecord) {
        let today = self.clock.now().date_naive();
        let cost = if record.estimated_cost.is_finite() {
            record.estimated_cost.max(0.0)
        } else {
            0.0
        };

        let mut state = self.state.write();
        let ai = &mut state.ai;
        ai.total += 1;
        if record.success {
            ai.successful += 1;
        }
        ai.tokens += record.tokens;
        ai.cost += cost;
        ai.response.add(record.response_time);
        ai.samples.push(record.response_time.as_secs_f64() * 1000.0);

        if ai.cost_day != Some(today) {
            ai.cost_day = Some(today);
            ai.daily_cost = 0.0;
        }
        ai.daily_cost += cost;

        let usage = ai.per_model.entry(record.model_id.clone()).or_default();
        usage.requests += 1;
        usage.tokens += record.tokens;
        usage.cost += cost;
    }

    /// Record a user engagement event
    pub fn record_user_event(&self, event: &UserEngagement) {
        let mut state = self.state.write();
        let u = &mut state.users;
        if u.seen.len() < self.user_capacity
            && u.seen.insert(event.user_id.clone())
            && u.seen.len() == self.user_capacity
        {
            tracing::warn!(
                capacity = self.user_capacity,
                "active user set full, further new users are not counted until reset"
            );
        }
        match event.kind {
            EngagementKind::SessionStarted => u.sessions_started += 1,
            EngagementKind::SessionEnded { duration } => {
                u.sessions_ended += 1;
                u.session_length.add(duration);
            }
            EngagementKind::MessageSent => u.messages += 1,
            EngagementKind::ReportGenerated => u.reports += 1,
            EngagementKind::InquirySubmitted => u.inquiries += 1,
        }
    }

    /// Record a typed error
    pub fn record_error(&self, category: ErrorCategory, detail: &str) {
        let now = self.clock.now();
        tracing::debug!(category = %category, "recorded error: {}", detail);

        let mut state = self.state.write();
        let e = &mut state.errors;
        e.total += 1;
        *e.by_category.entry(category).or_default() += 1;
        if category == ErrorCategory::Authentication {
            e.auth_failures.push_back(now);
            while e
                .auth_failures
                .front()
                .is_some_and(|t| elapsed_between(*t, now) > AUTH_WINDOW)
            {
                e.auth_failures.pop_front();
            }
        }
    }

    /// Zero every counter and restart the throughput window
    pub fn reset(&self) {
        let now = self.clock.now();
        let mut state = self.state.write();
        *state = MetricsState::new(now);
        drop(state);
        tracing::info!("metrics reset");
    }

    /// Start of the current measurement window
    #[must_use]
    pub fn since(&self) -> DateTime<Utc> {
        self.state.read().since
    }

    /// Derive a snapshot from the raw counters
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = self.clock.now();
        let state = self.state.read();

        let c = &state.connections;
        let conn_total = c.opened + c.failures;
        let connections = ConnectionSnapshot {
            total: conn_total,
            active: c.opened.saturating_sub(c.closed),
            failures: c.failures,
            reconnections: c.reconnections,
            errors: c.errors,
            success_rate: ratio_or(
                conn_total.saturating_sub(c.failures) as f64,
                conn_total as f64,
                1.0,
            ),
            average_duration_ms: c.lifetime.mean_ms(),
        };

        let m = &state.messages;
        let exchanged = m.sent + m.received;
        let messages = MessageSnapshot {
            sent: m.sent,
            received: m.received,
            errors: m.errors,
            retries: m.retries,
            broadcasts: m.broadcasts,
            success_rate: ratio_or(exchanged.saturating_sub(m.errors) as f64, exchanged as f64, 1.0),
            average_processing_ms: m.processing.mean_ms(),
        };

        let a = &state.ai;
        let ai = AiSnapshot {
            total: a.total,
            successful: a.successful,
            failed: a.total - a.successful,
            success_rate: ratio_or(a.successful as f64, a.total as f64, 1.0),
            total_tokens: a.tokens,
            average_tokens: ratio_or(a.tokens as f64, a.successful as f64, 0.0),
            total_cost: a.cost,
            daily_cost: if a.cost_day == Some(now.date_naive()) {
                a.daily_cost
            } else {
                0.0
            },
            average_response_ms: a.response.mean_ms(),
            per_model: a.per_model.clone(),
        };

        let u = &state.users;
        let users = UserSnapshot {
            active_users: u.seen.len() as u64,
            sessions_started: u.sessions_started,
            sessions_ended: u.sessions_ended,
            average_session_secs: u.session_length.mean_ms() / 1000.0,
            messages: u.messages,
            reports_generated: u.reports,
            inquiries: u.inquiries,
        };

        let e = &state.errors;
        let activity = exchanged + a.total + conn_total;
        let errors = ErrorSnapshot {
            total: e.total,
            by_category: e
                .by_category
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), *v))
                .collect(),
            error_rate: ratio_or(e.total as f64, activity as f64, 0.0),
            auth_failures_per_minute: e
                .auth_failures
                .iter()
                .filter(|t| elapsed_between(**t, now) <= AUTH_WINDOW)
                .count() as u64,
        };

        let uptime_secs = elapsed_between(state.since, now).as_secs_f64();
        let performance = PerformanceSnapshot {
            uptime_secs,
            throughput_per_sec: ratio_or(exchanged as f64, uptime_secs, 0.0),
            average_response_ms: ai.average_response_ms,
            p95_response_ms: a.samples.percentile(0.95),
            p99_response_ms: a.samples.percentile(0.99),
        };

        MetricsSnapshot {
            taken_at: now,
            since: state.since,
            connections,
            messages,
            ai,
            users,
            errors,
            performance,
        }
    }
}

impl Default for MetricsAggregator {
    fn default() -> Self {
        Self::new(SystemClock::shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_primitives::ManualClock;
    use std::sync::Arc;

    fn aggregator() -> (MetricsAggregator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (MetricsAggregator::new(clock.clone()), clock)
    }

    #[test]
    fn fresh_snapshot_is_zero_safe() {
        let (metrics, _clock) = aggregator();
        let snap = metrics.snapshot();
        assert_eq!(snap.connections.success_rate, 1.0);
        assert_eq!(snap.messages.success_rate, 1.0);
        assert_eq!(snap.ai.success_rate, 1.0);
        assert_eq!(snap.performance.throughput_per_sec, 0.0);
        assert_eq!(snap.errors.error_rate, 0.0);
        assert_eq!(snap.performance.p95_response_ms, 0.0);
        assert!(!snap.users.average_session_secs.is_nan());
    }

    #[test]
    fn connection_success_rate() {
        let (metrics, _clock) = aggregator();
        for _ in 0..9 {
            metrics.record_connection(ConnectionEvent::Opened);
        }
        metrics.record_connection(ConnectionEvent::Failed);
        metrics.record_connection(ConnectionEvent::Closed {
            duration: Duration::from_secs(2),
        });

        let snap = metrics.snapshot();
        assert_eq!(snap.connections.total, 10);
        assert_eq!(snap.connections.active, 8);
        assert!((snap.connections.success_rate - 0.9).abs() < 1e-9);
        assert!((snap.connections.average_duration_ms - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn message_rates_and_throughput() {
        let (metrics, clock) = aggregator();
        for _ in 0..6 {
            metrics.record_message(MessageEvent::Sent, Some(Duration::from_millis(10)));
        }
        for _ in 0..4 {
            metrics.record_message(MessageEvent::Received, None);
        }
        metrics.record_message(MessageEvent::Error, None);
        clock.advance(Duration::from_secs(5));

        let snap = metrics.snapshot();
        assert!((snap.messages.success_rate - 0.9).abs() < 1e-9);
        assert!((snap.messages.average_processing_ms - 10.0).abs() < 1e-9);
        assert!((snap.performance.throughput_per_sec - 2.0).abs() < 1e-9);
    }

    #[test]
    fn ai_success_rate_and_per_model() {
        let (metrics, _clock) = aggregator();
        for _ in 0..94 {
            metrics.record_ai_request(&AiRequestRecord::success(
                "gpt-4o",
                Duration::from_millis(500),
                100,
                0.01,
            ));
        }
        for _ in 0..6 {
            metrics.record_ai_request(&AiRequestRecord::failure("gpt-4o", Duration::from_millis(100)));
        }

        let snap = metrics.snapshot();
        assert!((snap.ai.success_rate - 0.94).abs() < 1e-9);
        assert_eq!(snap.ai.failed, 6);
        assert_eq!(snap.ai.total_tokens, 9400);
        assert_eq!(snap.ai.per_model["gpt-4o"].requests, 100);
        assert!((snap.ai.daily_cost - 0.94).abs() < 1e-9);
        assert_eq!(snap.performance.p95_response_ms, 500.0);
    }

    #[test]
    fn daily_cost_rolls_over() {
        let (metrics, clock) = aggregator();
        metrics.record_ai_request(&AiRequestRecord::success("m", Duration::ZERO, 1, 5.0));
        clock.advance(Duration::from_secs(25 * 60 * 60));
        assert_eq!(metrics.snapshot().ai.daily_cost, 0.0);

        metrics.record_ai_request(&AiRequestRecord::success("m", Duration::ZERO, 1, 2.0));
        let snap = metrics.snapshot();
        assert!((snap.ai.daily_cost - 2.0).abs() < 1e-9);
        assert!((snap.ai.total_cost - 7.0).abs() < 1e-9);
    }

    #[test]
    fn error_rate_over_activity() {
        let (metrics, _clock) = aggregator();
        for _ in 0..10 {
            metrics.record_message(MessageEvent::Received, None);
        }
        metrics.record_error(ErrorCategory::Validation, "bad input");
        metrics.record_error(ErrorCategory::Internal, "oops");

        let snap = metrics.snapshot();
        assert!((snap.errors.error_rate - 0.2).abs() < 1e-9);
        assert_eq!(snap.errors.by_category["validation"], 1);
    }

    #[test]
    fn auth_failures_slide_out_of_window() {
        let (metrics, clock) = aggregator();
        for _ in 0..5 {
            metrics.record_error(ErrorCategory::Authentication, "bad token");
        }
        assert_eq!(metrics.snapshot().errors.auth_failures_per_minute, 5);

        clock.advance(Duration::from_secs(61));
        metrics.record_error(ErrorCategory::Authentication, "bad token");
        assert_eq!(metrics.snapshot().errors.auth_failures_per_minute, 1);
    }

    #[test]
    fn users_are_counted_once() {
        let (metrics, _clock) = aggregator();
        metrics.record_user_event(&UserEngagement::new("u1", EngagementKind::SessionStarted));
        metrics.record_user_event(&UserEngagement::new("u1", EngagementKind::MessageSent));
        metrics.record_user_event(&UserEngagement::new("u2", EngagementKind::ReportGenerated));
        metrics.record_user_event(&UserEngagement::new(
            "u1",
            EngagementKind::SessionEnded {
                duration: Duration::from_secs(120),
            },
        ));

        let snap = metrics.snapshot();
        assert_eq!(snap.users.active_users, 2);
        assert_eq!(snap.users.reports_generated, 1);
        assert!((snap.users.average_session_secs - 120.0).abs() < 1e-9);
    }

    #[test]
    fn tracked_users_stay_bounded() {
        let (metrics, _clock) = aggregator();
        let metrics = metrics.with_user_capacity(2);
        for user in ["u1", "u2", "u3", "u1", "u4"] {
            metrics.record_user_event(&UserEngagement::new(user, EngagementKind::MessageSent));
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.users.active_users, 2);
        assert_eq!(snap.users.messages, 5);

        metrics.reset();
        metrics.record_user_event(&UserEngagement::new("u3", EngagementKind::MessageSent));
        assert_eq!(metrics.snapshot().users.active_users, 1);
    }

    #[test]
    fn reset_zeroes_and_restamps() {
        let (metrics, clock) = aggregator();
        metrics.record_message(MessageEvent::Sent, None);
        metrics.record_error(ErrorCategory::Internal, "x");
        clock.advance(Duration::from_secs(30));
        metrics.reset();

        let snap = metrics.snapshot();
        assert_eq!(snap.messages.sent, 0);
        assert_eq!(snap.errors.total, 0);
        assert_eq!(snap.since, clock.now());
        assert_eq!(snap.performance.throughput_per_sec, 0.0);
    }
}
