//! Repeating background tasks with cooperative shutdown
//!
//! A [`PeriodicTask`] runs a synchronous tick on a Tokio interval until its
//! [`Shutdown`] fires. Ticks run in-memory bookkeeping only, so they never
//! hold a lock across an await point. With a paused Tokio clock the loop is
//! driven deterministically by `tokio::time::advance`.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Broadcast shutdown flag for background loops
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    /// Create an untriggered signal
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Receiver for one loop
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Ask every subscribed loop to stop
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether [`Self::trigger`] was called
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Named repeating task
#[derive(Debug, Clone)]
pub struct PeriodicTask {
    name: String,
    interval: Duration,
}

impl PeriodicTask {
    /// Create task definition
    #[must_use]
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
        }
    }

    /// Task name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tick interval
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the loop; the first tick happens one interval after spawning
    pub fn spawn<F>(self, mut shutdown: watch::Receiver<bool>, mut tick: F) -> JoinHandle<()>
    where
        F: FnMut() + Send + 'static,
    {
        tokio::spawn(async move {
            if *shutdown.borrow() {
                return;
            }
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            tracing::info!(task = %self.name, interval_secs = self.interval.as_secs(), "periodic task started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracing::debug!(task = %self.name, "periodic tick");
                        tick();
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!(task = %self.name, "periodic task stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_interval() {
        let shutdown = Shutdown::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = PeriodicTask::new("count", Duration::from_secs(60))
            .spawn(shutdown.subscribe(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        for expected in 1..=3 {
            tokio::time::advance(Duration::from_secs(60)).await;
            settle().await;
            assert_eq!(count.load(Ordering::SeqCst), expected);
        }

        shutdown.trigger();
        handle.await.unwrap();
        assert!(shutdown.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_without_ticking_after_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        PeriodicTask::new("never", Duration::from_secs(1))
            .spawn(shutdown.subscribe(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
