//! Advisor Cache - adaptive analysis cache
//!
//! Sits in front of the expensive AI-generation calls:
//! - Keys by (analysis type, normalized content) so equivalent requests collide
//! - Scales each entry's TTL by the result's quality
//! - Tunes per-type TTL and overall capacity from observed hit rates
//! - Evicts strictly least-recently-used when full
//!
//! # Example
//!
//! ```rust
//! use advisor_cache::{AnalysisCache, CacheConfig};
//! use advisor_primitives::SystemClock;
//!
//! let cache = AnalysisCache::new(CacheConfig::default(), SystemClock::shared());
//! cache.put("cost_analysis", "aws s3 cost", "result-A", 100, 0.9).unwrap();
//!
//! let hit = cache.get("cost_analysis", "AWS S3 COST").unwrap();
//! assert_eq!(hit.content, "result-A");
//! ```

#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod entry;
pub mod error;
pub mod stats;
pub mod warmup;

pub use cache::AnalysisCache;
pub use config::{CacheConfig, MAX_TTL_CEILING_SECS};
pub use entry::{metadata_keys, AnalysisTypeMetrics, CachedAnalysis};
pub use error::CacheError;
pub use stats::{CacheStatistics, OptimizationReport, TtlAdjustment};
pub use warmup::{default_warm_up_patterns, WarmUpPattern};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
