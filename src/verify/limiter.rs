//! Hourly and daily call budgets.

use std::time::{Duration, Instant};

use chrono::NaiveDate;

use crate::clock::SharedClock;
use crate::constants::verification::HOUR_WINDOW_SECS;

/// Rolling-hour and calendar-day call counter.
///
/// The hour window restarts once at least an hour has passed since it
/// opened; the day counter restarts when the local date advances.
pub struct RateLimiter {
    max_per_hour: u32,
    max_per_day: u32,
    calls_this_hour: u32,
    calls_this_day: u32,
    hour_started: Instant,
    day: NaiveDate,
    clock: SharedClock,
}

impl RateLimiter {
    /// Create a limiter with both windows starting now.
    pub fn new(max_per_hour: u32, max_per_day: u32, clock: SharedClock) -> Self {
        let hour_started = clock.now();
        let day = clock.local().date_naive();
        Self {
            max_per_hour,
            max_per_day,
            calls_this_hour: 0,
            calls_this_day: 0,
            hour_started,
            day,
            clock,
        }
    }

    fn roll_windows(&mut self) {
        let now = self.clock.now();
        if now.duration_since(self.hour_started) >= Duration::from_secs(HOUR_WINDOW_SECS) {
            self.calls_this_hour = 0;
            self.hour_started = now;
        }
        let today = self.clock.local().date_naive();
        if today > self.day {
            self.calls_this_day = 0;
            self.day = today;
        }
    }

    /// Whether either budget is exhausted.
    pub fn is_limited(&mut self) -> bool {
        self.roll_windows();
        self.calls_this_hour >= self.max_per_hour || self.calls_this_day >= self.max_per_day
    }

    /// Consume one unit of both budgets.
    pub fn record_call(&mut self) {
        self.roll_windows();
        self.calls_this_hour += 1;
        self.calls_this_day += 1;
    }

    /// Calls counted in the current hour window.
    pub fn calls_this_hour(&self) -> u32 {
        self.calls_this_hour
    }

    /// Calls counted today.
    pub fn calls_this_day(&self) -> u32 {
        self.calls_this_day
    }
}
