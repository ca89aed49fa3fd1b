//! Testing utilities for the advisor workspace
//!
//! Shared fixtures and test doubles: a manually driven clock, small cache
//! configurations, a recording channel transport and a scripted generator.

#![allow(missing_docs)]

use advisor_alerts::{Alert, AlertChannel, ChannelTransport, DeliveryError};
use advisor_cache::CacheConfig;
use advisor_core::{AnalysisGenerator, Generated, GenerationError, GenerationOptions};
use advisor_primitives::ManualClock;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Monday 2025-01-06 09:00:00 UTC
pub fn fixed_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()
}

pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(fixed_start()))
}

/// Cache fixed at `capacity` entries until tuned
pub fn small_cache_config(capacity: usize) -> CacheConfig {
    CacheConfig::new().with_capacity(capacity, 1, capacity.max(100))
}

pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// Records every delivery and lets tests wait for them
#[derive(Debug, Default)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<(String, Alert)>>,
    notify: Notify,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deliveries(&self) -> Vec<(String, Alert)> {
        self.deliveries.lock().clone()
    }

    pub fn delivered_to(&self, channel_id: &str) -> Vec<Alert> {
        self.deliveries
            .lock()
            .iter()
            .filter(|(id, _)| id == channel_id)
            .map(|(_, alert)| alert.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.deliveries.lock().len()
    }

    /// Wait until at least `count` deliveries were seen; false on timeout
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.count() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait::async_trait]
impl ChannelTransport for RecordingTransport {
    async fn deliver(&self, channel: &AlertChannel, alert: &Alert) -> Result<(), DeliveryError> {
        self.deliveries
            .lock()
            .push((channel.id.clone(), alert.clone()));
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Fails every delivery with a fixed error
#[derive(Debug)]
pub struct FailingTransport {
    error: DeliveryError,
    attempts: AtomicUsize,
}

impl FailingTransport {
    pub fn new(error: DeliveryError) -> Arc<Self> {
        Arc::new(Self {
            error,
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChannelTransport for FailingTransport {
    async fn deliver(&self, _channel: &AlertChannel, _alert: &Alert) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Generator answering from a script, then from a fallback response
#[derive(Debug)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Generated, GenerationError>>>,
    fallback: Generated,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: generated("# Analysis\n- default scripted answer", 120, "gpt-4o"),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, outcome: Result<Generated, GenerationError>) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    pub fn with_fallback(mut self, fallback: Generated) -> Self {
        self.fallback = fallback;
        self
    }

    /// Sleep this long (on the Tokio clock) before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AnalysisGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<Generated, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

pub fn generated(content: &str, tokens_used: u64, model_id: &str) -> Generated {
    Generated {
        content: content.to_string(),
        tokens_used,
        model_id: model_id.to_string(),
    }
}
