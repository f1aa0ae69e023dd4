//! Wall clock
//!
//! The scheduler reads time only through [`Clock`], so tests can pin "now"
//! to a known instant instead of racing the system clock.

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

/// Length of one trading interval.
pub const QUARTER_HOUR_SECS: i64 = 15 * 60;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }

    pub fn advance(&self, delta: Duration) {
        let mut current = self.current.lock();
        *current += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

/// Next :00/:15/:30/:45 boundary strictly after `now`.
///
/// Computed on the UTC timeline, which is correct for any zone whose offset
/// is a whole number of quarter hours (Europe/Prague included, DST or not).
pub fn next_quarter_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = now.timestamp();
    let next = (secs.div_euclid(QUARTER_HOUR_SECS) + 1) * QUARTER_HOUR_SECS;
    Utc.timestamp_opt(next, 0)
        .single()
        .unwrap_or(now + Duration::seconds(QUARTER_HOUR_SECS))
}

/// How long to sleep from `now` until the next quarter-hour boundary.
pub fn until_next_quarter_hour(now: DateTime<Utc>) -> std::time::Duration {
    (next_quarter_hour(now) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}
