//! Advisor core
//!
//! Wires the analysis cache, metrics aggregator and alert manager into one
//! [`AdvisorRuntime`]. [`PerformanceOptimizer`] fronts the external
//! [`AnalysisGenerator`] with the cache on the request path; periodic loops
//! tune the cache, purge expired entries and evaluate alert rules.

pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod optimizer;
pub mod periodic;
pub mod runtime;
pub mod session;
pub mod source;
pub mod telemetry;

pub use config::{AdvisorConfig, GeneratorConfig, SchedulerConfig};
pub use error::{ConfigError, GenerationError};
pub use export::{render_full_exposition, write_alert_statistics, write_cache_statistics};
pub use generator::{
    AnalysisGenerator, CannedFallback, CannedGenerator, Generated, GenerationOptions, CANNED_MODEL,
};
pub use optimizer::{build_prompt, estimate_quality, AnalysisRequest, AnalysisResponse, PerformanceOptimizer};
pub use periodic::{PeriodicTask, Shutdown};
pub use runtime::{AdvisorRuntime, RuntimeBuilder};
pub use session::{PassthroughAssigner, SessionAssigner, ShardedAssigner};
pub use source::{CacheMetricSource, CACHE_SOURCE};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
