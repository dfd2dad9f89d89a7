//! # Clock
//! Time source shared by the validator (freshness ceiling) and the section
//! providers (record timestamps).
//!
//! Production code uses [`SystemClock`]; tests pin time with [`FixedClock`].
//! The offset of `now()` is also the zone in which naive timestamps (no
//! explicit offset) are interpreted.

use chrono::{DateTime, FixedOffset, Local, Utc};
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Wall clock in the host's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }

    pub fn utc(at: DateTime<Utc>) -> Self {
        Self {
            at: at.fixed_offset(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}

pub type SharedClock = Arc<dyn Clock>;

pub fn system() -> SharedClock {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fixed_clock_is_stable() {
        let at = Utc.with_ymd_and_hms(2025, 10, 19, 8, 0, 0).unwrap();
        let c = FixedClock::utc(at);
        assert_eq!(c.now(), c.now());
        assert_eq!(c.now().offset().local_minus_utc(), 0);
    }
}
