//! Time sources for episode bookkeeping.
//!
//! Decision timers, frame timestamps and verification budgets all read time
//! through [`Clock`] so tests can drive them deterministically.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

/// Source of monotonic and wall-clock time.
pub trait Clock: Send + Sync {
    /// Monotonic instant.
    fn now(&self) -> Instant;

    /// Local wall-clock time.
    fn local(&self) -> DateTime<Local>;
}

/// Clock backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn local(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// Default shared system clock.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Manually advanced clock for tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<(Instant, DateTime<Local>)>,
}

impl ManualClock {
    /// Start a manual clock at the current system time.
    pub fn new() -> Self {
        Self::starting_at(Local::now())
    }

    /// Start a manual clock at a specific wall-clock time.
    pub fn starting_at(local: DateTime<Local>) -> Self {
        Self {
            state: Mutex::new((Instant::now(), local)),
        }
    }

    /// Advance both monotonic and wall-clock time.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0 += by;
        if let Ok(delta) = chrono::Duration::from_std(by) {
            state.1 += delta;
        }
    }

    /// Advance by fractional seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).0
    }

    fn local(&self) -> DateTime<Local> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_both_timelines() {
        let clock = ManualClock::new();
        let start = clock.now();
        let start_local = clock.local();

        clock.advance_secs(2.5);

        assert_eq!(clock.now() - start, Duration::from_millis(2500));
        assert_eq!((clock.local() - start_local).num_milliseconds(), 2500);
    }
}
