//! Alert fan-out to notification channels
//!
//! Each matching channel gets its own delivery future with its own timeout.
//! Deliveries run concurrently and never affect each other; outcomes are
//! logged and handed back for inspection but never retried.

use crate::alert::{Alert, AlertSeverity};
use crate::channel::{AlertChannel, ChannelKind};
use crate::error::DeliveryError;
use advisor_primitives::{Clock, SharedClock, SystemClock};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default per-delivery timeout
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers one alert over one channel kind
#[async_trait::async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Deliver `alert` to `channel`
    async fn deliver(&self, channel: &AlertChannel, alert: &Alert) -> Result<(), DeliveryError>;
}

/// JSON body POSTed to webhook channels
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload<'a> {
    /// The alert
    pub alert: &'a Alert,
    /// Receiving channel's name
    pub channel_name: &'a str,
    /// Send time
    pub timestamp: DateTime<Utc>,
}

/// POSTs a [`WebhookPayload`] to the channel's url
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    client: reqwest::Client,
    clock: SharedClock,
}

impl WebhookTransport {
    /// Create with a fresh HTTP client
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a preconfigured client
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            clock: SystemClock::shared(),
        }
    }

    /// With time source for payload timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Body sent for `alert` on `channel`, stamped now
    #[must_use]
    pub fn payload<'a>(&self, channel: &'a AlertChannel, alert: &'a Alert) -> WebhookPayload<'a> {
        WebhookPayload {
            alert,
            channel_name: &channel.name,
            timestamp: self.clock.now(),
        }
    }
}

impl Default for WebhookTransport {
    fn default() -> Self {
        Self::with_client(reqwest::Client::new())
    }
}

#[async_trait::async_trait]
impl ChannelTransport for WebhookTransport {
    async fn deliver(&self, channel: &AlertChannel, alert: &Alert) -> Result<(), DeliveryError> {
        let url = channel
            .config
            .url
            .as_deref()
            .ok_or(DeliveryError::MissingConfig("url"))?;

        let payload = self.payload(channel, alert);

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&payload);
        for (name, value) in &channel.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request.send().await?.error_for_status()?;
        Ok(())
    }
}

/// Emits the alert as a tracing event
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait::async_trait]
impl ChannelTransport for LogTransport {
    async fn deliver(&self, channel: &AlertChannel, alert: &Alert) -> Result<(), DeliveryError> {
        match alert.severity {
            AlertSeverity::High | AlertSeverity::Critical => tracing::error!(
                channel = %channel.name,
                alert_id = %alert.id,
                severity = %alert.severity,
                "{}: {}",
                alert.title,
                alert.description
            ),
            AlertSeverity::Medium => tracing::warn!(
                channel = %channel.name,
                alert_id = %alert.id,
                severity = %alert.severity,
                "{}: {}",
                alert.title,
                alert.description
            ),
            AlertSeverity::Low => tracing::info!(
                channel = %channel.name,
                alert_id = %alert.id,
                severity = %alert.severity,
                "{}: {}",
                alert.title,
                alert.description
            ),
        }
        Ok(())
    }
}

/// Outbound email collaborator
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    /// Send one message to every recipient
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), DeliveryError>;
}

/// Formats alerts as email and hands them to an [`EmailSender`]
#[derive(Clone)]
pub struct EmailTransport {
    sender: Arc<dyn EmailSender>,
}

impl EmailTransport {
    /// Create over `sender`
    #[must_use]
    pub fn new(sender: Arc<dyn EmailSender>) -> Self {
        Self { sender }
    }
}

impl fmt::Debug for EmailTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailTransport").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl ChannelTransport for EmailTransport {
    async fn deliver(&self, channel: &AlertChannel, alert: &Alert) -> Result<(), DeliveryError> {
        if channel.config.recipients.is_empty() {
            return Err(DeliveryError::MissingConfig("recipients"));
        }
        let subject = format!("[{}] {}", alert.severity.as_str().to_uppercase(), alert.title);
        let body = format!(
            "{}\n\nType: {}\nRaised: {}\nAlert id: {}",
            alert.description,
            alert.alert_type,
            alert.timestamp.to_rfc3339(),
            alert.id
        );
        self.sender.send(&channel.config.recipients, &subject, &body).await
    }
}

/// Result of delivering to one channel
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryOutcome {
    /// Channel id
    pub channel_id: String,
    /// What happened
    pub result: Result<(), DeliveryError>,
}

/// Routes alerts to the transports of matching channels
#[derive(Clone)]
pub struct NotificationDispatcher {
    transports: HashMap<ChannelKind, Arc<dyn ChannelTransport>>,
    default_timeout: Duration,
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.transports.keys().collect();
        kinds.sort();
        f.debug_struct("NotificationDispatcher")
            .field("kinds", &kinds)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl NotificationDispatcher {
    /// Dispatcher with no transports
    #[must_use]
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            transports: HashMap::new(),
            default_timeout,
        }
    }

    /// Webhook and log transports; email needs [`Self::with_transport`]
    #[must_use]
    pub fn standard(default_timeout: Duration) -> Self {
        Self::standard_with_clock(default_timeout, SystemClock::shared())
    }

    /// Like [`Self::standard`], stamping webhook payloads from `clock`
    #[must_use]
    pub fn standard_with_clock(default_timeout: Duration, clock: SharedClock) -> Self {
        Self::new(default_timeout)
            .with_transport(
                ChannelKind::Webhook,
                Arc::new(WebhookTransport::new().with_clock(clock)),
            )
            .with_transport(ChannelKind::Log, Arc::new(LogTransport))
    }

    /// Register or replace the transport for `kind`
    #[must_use]
    pub fn with_transport(mut self, kind: ChannelKind, transport: Arc<dyn ChannelTransport>) -> Self {
        self.transports.insert(kind, transport);
        self
    }

    /// Timeout used when a channel sets none
    #[inline]
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Deliver to every channel accepting `alert`, concurrently
    pub async fn deliver(&self, alert: &Alert, channels: &[AlertChannel]) -> Vec<DeliveryOutcome> {
        let deliveries = channels
            .iter()
            .filter(|channel| channel.accepts(alert))
            .map(|channel| async move {
                let result = self.deliver_one(channel, alert).await;
                match &result {
                    Ok(()) => tracing::debug!(channel = %channel.id, alert_id = %alert.id, "alert delivered"),
                    Err(err) => tracing::warn!(
                        channel = %channel.id,
                        alert_id = %alert.id,
                        error = %err,
                        "alert delivery failed"
                    ),
                }
                DeliveryOutcome {
                    channel_id: channel.id.clone(),
                    result,
                }
            });
        futures::future::join_all(deliveries).await
    }

    /// Fire-and-forget [`Self::deliver`] on the current runtime
    ///
    /// Returns `None` outside a Tokio runtime; the alert is then only logged.
    pub fn dispatch(
        self: &Arc<Self>,
        alert: Alert,
        channels: Vec<AlertChannel>,
    ) -> Option<JoinHandle<Vec<DeliveryOutcome>>> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(alert_id = %alert.id, "no async runtime, alert not dispatched");
            return None;
        };
        let dispatcher = Arc::clone(self);
        Some(handle.spawn(async move { dispatcher.deliver(&alert, &channels).await }))
    }

    async fn deliver_one(&self, channel: &AlertChannel, alert: &Alert) -> Result<(), DeliveryError> {
        let transport = self
            .transports
            .get(&channel.kind)
            .ok_or(DeliveryError::UnsupportedKind(channel.kind))?;
        let timeout = channel.config.timeout().unwrap_or(self.default_timeout);
        tokio::time::timeout(timeout, transport.deliver(channel, alert))
            .await
            .map_err(|_| DeliveryError::Timeout(timeout))?
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::standard(DEFAULT_DELIVERY_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{AlertType, NewAlert};
    use crate::channel::ChannelFilter;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ChannelTransport for Recorder {
        async fn deliver(&self, channel: &AlertChannel, _alert: &Alert) -> Result<(), DeliveryError> {
            self.seen.lock().push(channel.id.clone());
            Ok(())
        }
    }

    struct Hang;

    #[async_trait::async_trait]
    impl ChannelTransport for Hang {
        async fn deliver(&self, _channel: &AlertChannel, _alert: &Alert) -> Result<(), DeliveryError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(Vec<String>, String)>>,
    }

    #[async_trait::async_trait]
    impl EmailSender for Outbox {
        async fn send(&self, recipients: &[String], subject: &str, _body: &str) -> Result<(), DeliveryError> {
            self.sent.lock().push((recipients.to_vec(), subject.to_string()));
            Ok(())
        }
    }

    fn alert(severity: AlertSeverity) -> Alert {
        Alert::from_new(
            NewAlert::new(AlertType::Performance, severity, "Slow responses", "p95 over 2s"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn filters_select_channels() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher =
            NotificationDispatcher::new(DEFAULT_DELIVERY_TIMEOUT).with_transport(ChannelKind::Log, recorder.clone());
        let channels = vec![
            AlertChannel::new("all", "all", ChannelKind::Log),
            AlertChannel::new("high", "high", ChannelKind::Log)
                .with_filter(ChannelFilter::equals("severity", "high")),
        ];

        let outcomes = dispatcher.deliver(&alert(AlertSeverity::Low), &channels).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(*recorder.seen.lock(), vec!["all".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_channel_times_out_without_blocking_others() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = NotificationDispatcher::new(Duration::from_secs(30))
            .with_transport(ChannelKind::Webhook, Arc::new(Hang))
            .with_transport(ChannelKind::Log, recorder.clone());
        let channels = vec![
            AlertChannel::webhook("hook", "hook", "https://hooks.example.com/x"),
            AlertChannel::new("log", "log", ChannelKind::Log),
        ];

        let outcomes = dispatcher.deliver(&alert(AlertSeverity::High), &channels).await;
        assert_eq!(outcomes[0].result, Err(DeliveryError::Timeout(Duration::from_secs(30))));
        assert_eq!(outcomes[1].result, Ok(()));
        assert_eq!(recorder.seen.lock().len(), 1);
    }

    #[tokio::test]
    async fn missing_transport_is_reported() {
        let dispatcher = NotificationDispatcher::new(DEFAULT_DELIVERY_TIMEOUT);
        let channels = vec![AlertChannel::new("mail", "mail", ChannelKind::Email)];
        let outcomes = dispatcher.deliver(&alert(AlertSeverity::High), &channels).await;
        assert_eq!(
            outcomes[0].result,
            Err(DeliveryError::UnsupportedKind(ChannelKind::Email))
        );
    }

    #[tokio::test]
    async fn email_subject_carries_severity() {
        let outbox = Arc::new(Outbox::default());
        let dispatcher = NotificationDispatcher::new(DEFAULT_DELIVERY_TIMEOUT)
            .with_transport(ChannelKind::Email, Arc::new(EmailTransport::new(outbox.clone())));
        let channels = vec![AlertChannel::new("mail", "ops", ChannelKind::Email)
            .with_recipients(vec!["ops@example.com".into()])];

        dispatcher.deliver(&alert(AlertSeverity::Critical), &channels).await;
        let sent = outbox.sent.lock();
        assert_eq!(sent[0].0, vec!["ops@example.com".to_string()]);
        assert_eq!(sent[0].1, "[CRITICAL] Slow responses");
    }

    #[tokio::test]
    async fn dispatch_runs_in_background() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Arc::new(
            NotificationDispatcher::new(DEFAULT_DELIVERY_TIMEOUT).with_transport(ChannelKind::Log, recorder.clone()),
        );
        let handle = dispatcher
            .dispatch(alert(AlertSeverity::Medium), vec![AlertChannel::new("log", "log", ChannelKind::Log)])
            .unwrap();
        let outcomes = handle.await.unwrap();
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn webhook_payload_shape() {
        let alert = alert(AlertSeverity::High);
        let payload = WebhookPayload {
            alert: &alert,
            channel_name: "ops",
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["channelName"], "ops");
        assert_eq!(value["alert"]["severity"], "high");
        assert!(value.get("timestamp").is_some());
    }

    #[test]
    fn webhook_timestamp_comes_from_clock() {
        let clock = Arc::new(advisor_primitives::ManualClock::starting_now());
        let transport = WebhookTransport::new().with_clock(clock.clone());
        let channel = AlertChannel::webhook("hook", "ops", "https://hooks.example.com/x");
        let alert = alert(AlertSeverity::High);

        clock.advance(Duration::from_secs(90));
        let payload = transport.payload(&channel, &alert);
        assert_eq!(payload.timestamp, clock.now());
        assert_eq!(payload.channel_name, "ops");

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value["timestamp"],
            serde_json::to_value(clock.now()).unwrap()
        );
    }

    #[test]
    fn dispatch_outside_runtime_is_none() {
        let dispatcher = Arc::new(NotificationDispatcher::new(DEFAULT_DELIVERY_TIMEOUT));
        assert!(dispatcher.dispatch(alert(AlertSeverity::Low), Vec::new()).is_none());
    }
}
