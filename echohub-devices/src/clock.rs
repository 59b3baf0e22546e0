//! Wall-clock source for registry timestamps.

use std::sync::Mutex;

use chrono::{Duration, NaiveDateTime, SubsecRound, Utc};

/// Supplies "now" to the registry.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// UTC wall-clock time as a naive timestamp, truncated to the microsecond
/// precision the registry file stores. UTC has no DST jumps, so the offline
/// sweep never sees an hour appear or vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc().trunc_subsecs(6)
    }
}

/// A clock that only moves when told to. Used to drive the offline sweep
/// deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Starts at the current system time.
    pub fn starting_now() -> Self {
        Self::new(SystemClock.now())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    pub fn set(&self, to: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::starting_now();
        let before = clock.now();
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now() - before, Duration::seconds(90));
    }

    #[test]
    fn system_clock_tracks_utc() {
        let drift = SystemClock.now() - Utc::now().naive_utc();
        assert!(drift.num_seconds().abs() < 5, "drift {drift}");
    }

    #[test]
    fn manual_clock_set_overrides() {
        let clock = ManualClock::starting_now();
        let target = clock.now() - Duration::days(1);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
