//! Advisor Primitives
//!
//! Building blocks shared by the cache, metrics and alerting crates:
//! - [`CacheKey`]: deterministic content hash over a normalized request
//! - [`Clock`]: time source seam, with a [`ManualClock`] for tests

#![warn(unreachable_pub)]

pub mod clock;
pub mod error;
pub mod key;

pub use clock::{elapsed_between, Clock, ManualClock, SharedClock, SystemClock};
pub use error::KeyError;
pub use key::{normalize_content, CacheKey};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
