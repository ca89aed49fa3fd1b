//! Time source abstraction
//!
//! Cache expiry, alert cooldowns and throughput all read the current time
//! through [`Clock`], so tests can drive them with a [`ManualClock`] instead
//! of sleeping on the wall clock.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Source of "now"
pub trait Clock: Debug + Send + Sync {
    /// Current instant in UTC
    fn now(&self) -> DateTime<Utc>;
}

/// Shared, dynamically dispatched clock
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Wall clock behind a [`SharedClock`]
    #[inline]
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    #[inline]
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Create a clock frozen at the current wall-clock time
    #[inline]
    #[must_use]
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::MAX);
        let mut now = self.now.write();
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write() = to;
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Non-negative time elapsed from `earlier` to `later`
///
/// Returns zero when `later` precedes `earlier` (clock skew).
#[inline]
#[must_use]
pub fn elapsed_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    (later - earlier).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(90));
        assert_eq!(elapsed_between(start, clock.now()), Duration::from_secs(90));
    }

    #[test]
    fn elapsed_saturates_on_skew() {
        let later = Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(elapsed_between(later, earlier), Duration::ZERO);
    }

    #[test]
    fn system_clock_is_monotone_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
