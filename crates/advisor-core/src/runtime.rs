//! Component wiring and background loop lifecycle
//!
//! [`AdvisorRuntime`] owns one instance of every component, built explicitly
//! from an [`AdvisorConfig`]. Background loops start only on
//! [`AdvisorRuntime::start`] and stop on [`AdvisorRuntime::shutdown`].

use crate::config::AdvisorConfig;
use crate::error::ConfigError;
use crate::export::render_full_exposition;
use crate::generator::{AnalysisGenerator, CannedFallback, CannedGenerator};
use crate::optimizer::PerformanceOptimizer;
use crate::periodic::{PeriodicTask, Shutdown};
use crate::session::{PassthroughAssigner, SessionAssigner};
use crate::source::CacheMetricSource;
use advisor_alerts::{AlertManager, ChannelKind, EmailSender, EmailTransport, NotificationDispatcher};
use advisor_cache::{default_warm_up_patterns, AnalysisCache};
use advisor_metrics::MetricsAggregator;
use advisor_primitives::{SharedClock, SystemClock};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Builder for [`AdvisorRuntime`]
pub struct RuntimeBuilder {
    config: AdvisorConfig,
    clock: SharedClock,
    generator: Option<Arc<dyn AnalysisGenerator>>,
    sessions: Arc<dyn SessionAssigner>,
    dispatcher: Option<NotificationDispatcher>,
    email: Option<Arc<dyn EmailSender>>,
}

impl fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("config", &self.config)
            .field("has_generator", &self.generator.is_some())
            .finish_non_exhaustive()
    }
}

impl RuntimeBuilder {
    /// With time source
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// With AI-generation collaborator
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn AnalysisGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// With session assignment collaborator
    #[must_use]
    pub fn with_session_assigner(mut self, sessions: Arc<dyn SessionAssigner>) -> Self {
        self.sessions = sessions;
        self
    }

    /// With a custom notification dispatcher
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// With email delivery for `email` channels
    #[must_use]
    pub fn with_email_sender(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email = Some(sender);
        self
    }

    /// Validate configuration and construct every component
    ///
    /// # Errors
    /// Any [`ConfigError`] from validation or component construction
    pub fn build(self) -> Result<AdvisorRuntime, ConfigError> {
        let config = self.config;
        config.validate()?;

        let cache = Arc::new(AnalysisCache::try_new(
            config.cache.clone(),
            Arc::clone(&self.clock),
        )?);
        if config.cache.warm_up_on_start {
            let inserted = cache.warm_up(&default_warm_up_patterns());
            tracing::info!(inserted, "cache warmed up");
        }

        let metrics = Arc::new(MetricsAggregator::new(Arc::clone(&self.clock)));

        let mut dispatcher = self
            .dispatcher
            .unwrap_or_else(|| {
                NotificationDispatcher::standard_with_clock(
                    config.alerts.delivery_timeout(),
                    Arc::clone(&self.clock),
                )
            });
        if let Some(sender) = self.email {
            dispatcher = dispatcher.with_transport(ChannelKind::Email, Arc::new(EmailTransport::new(sender)));
        }

        let alerts = Arc::new(AlertManager::new(
            &config.alerts,
            Arc::clone(&metrics),
            dispatcher,
            Arc::clone(&self.clock),
        )?);
        alerts.register_source(Arc::new(CacheMetricSource(Arc::clone(&cache))));

        let generator: Option<Arc<dyn AnalysisGenerator>> =
            match (self.generator, config.generator.use_canned_responses) {
                (Some(real), true) => Some(Arc::new(CannedFallback::new(real))),
                (Some(real), false) => Some(real),
                (None, true) => Some(Arc::new(CannedGenerator)),
                (None, false) => None,
            };
        if config.generator.use_canned_responses {
            tracing::warn!("canned responses enabled, not for production use");
        }

        let optimizer = generator.map(|generator| {
            Arc::new(PerformanceOptimizer::new(
                Arc::clone(&cache),
                Arc::clone(&metrics),
                generator,
                self.sessions,
                config.generator.clone(),
            ))
        });

        Ok(AdvisorRuntime {
            config,
            cache,
            metrics,
            alerts,
            optimizer,
            shutdown: Shutdown::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }
}

/// Every component plus its background loops
pub struct AdvisorRuntime {
    config: AdvisorConfig,
    cache: Arc<AnalysisCache>,
    metrics: Arc<MetricsAggregator>,
    alerts: Arc<AlertManager>,
    optimizer: Option<Arc<PerformanceOptimizer>>,
    shutdown: Shutdown,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for AdvisorRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisorRuntime")
            .field("cache_entries", &self.cache.len())
            .field("alerts", &self.alerts)
            .field("running_tasks", &self.tasks.lock().len())
            .finish_non_exhaustive()
    }
}

impl AdvisorRuntime {
    /// Start building from `config` with the system clock
    #[must_use]
    pub fn builder(config: AdvisorConfig) -> RuntimeBuilder {
        RuntimeBuilder {
            config,
            clock: SystemClock::shared(),
            generator: None,
            sessions: Arc::new(PassthroughAssigner),
            dispatcher: None,
            email: None,
        }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Shared cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Shared metrics
    #[inline]
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// Alert manager
    #[inline]
    #[must_use]
    pub fn alerts(&self) -> &Arc<AlertManager> {
        &self.alerts
    }

    /// Request-path orchestrator, present when a generator is available
    #[inline]
    #[must_use]
    pub fn optimizer(&self) -> Option<&Arc<PerformanceOptimizer>> {
        self.optimizer.as_ref()
    }

    /// Spawn the alert check, cache optimization and cache cleanup loops
    ///
    /// Calling it again while running, or after [`Self::shutdown`], is a no-op.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if self.shutdown.is_triggered() {
            tracing::warn!("runtime already shut down, not starting loops");
            return;
        }
        if !tasks.is_empty() {
            tracing::debug!("background loops already running");
            return;
        }

        tasks.push(
            self.alerts
                .start_periodic_checks(self.config.alerts.check_interval(), self.shutdown.subscribe()),
        );

        let cache = Arc::clone(&self.cache);
        tasks.push(
            PeriodicTask::new("cache-optimize", self.config.scheduler.optimize_interval()).spawn(
                self.shutdown.subscribe(),
                move || {
                    cache.optimize_strategy();
                },
            ),
        );

        let cache = Arc::clone(&self.cache);
        tasks.push(
            PeriodicTask::new("cache-cleanup", self.config.scheduler.cleanup_interval()).spawn(
                self.shutdown.subscribe(),
                move || {
                    let purged = cache.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "expired cache entries purged");
                    }
                },
            ),
        );
        tracing::info!("advisor runtime started");
    }

    /// Signal every loop to stop and wait for them
    ///
    /// Terminal: a later [`Self::start`] spawns nothing.
    pub async fn shutdown(&self) {
        self.shutdown.trigger();
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "background loop ended abnormally");
            }
        }
        tracing::info!("advisor runtime stopped");
    }

    /// Exposition text for the current state
    #[must_use]
    pub fn export_metrics(&self) -> String {
        render_full_exposition(
            &self.metrics.snapshot(),
            &self.cache.statistics(),
            &self.alerts.alert_statistics(),
        )
    }
}
