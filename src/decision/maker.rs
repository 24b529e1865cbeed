//! Episode decisions: when to stop recording and when to announce a species.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{AcceptedResult, accept_tracks};
use crate::clock::SharedClock;
use crate::error::{Error, Result};
use crate::tracking::TrackSet;

/// Per-episode decision state machine.
///
/// The stop and species decisions each fire at most once between resets.
pub struct DecisionMaker {
    max_record: Duration,
    max_inactive: Duration,
    min_track_duration: f64,
    clock: SharedClock,
    start_time: Instant,
    inactive_start_time: Option<Instant>,
    stop_recording_decided: bool,
    species_decided: bool,
}

impl DecisionMaker {
    /// Create a decision maker. All durations are in seconds.
    ///
    /// Rejects non-positive recording or inactivity limits and a negative
    /// minimum track duration.
    pub fn new(
        max_record_seconds: f64,
        max_inactive_seconds: f64,
        min_track_duration: f64,
        clock: SharedClock,
    ) -> Result<Self> {
        let positive = |name: &str, value: f64| {
            if !(value.is_finite() && value > 0.0) {
                return Err(Error::ConfigValidation {
                    message: format!("{name} must be positive, got {value}"),
                });
            }
            Duration::try_from_secs_f64(value).map_err(|e| Error::ConfigValidation {
                message: format!("{name} is out of range ({value}): {e}"),
            })
        };
        let max_record = positive("max_record_seconds", max_record_seconds)?;
        let max_inactive = positive("max_inactive_seconds", max_inactive_seconds)?;
        if !(min_track_duration.is_finite() && min_track_duration >= 0.0) {
            return Err(Error::ConfigValidation {
                message: format!("min_track_duration must be non-negative, got {min_track_duration}"),
            });
        }

        let start_time = clock.now();
        Ok(Self {
            max_record,
            max_inactive,
            min_track_duration,
            clock,
            start_time,
            inactive_start_time: None,
            stop_recording_decided: false,
            species_decided: false,
        })
    }

    /// Start a new episode: clear both decisions and restart the timers.
    pub fn reset(&mut self) {
        self.stop_recording_decided = false;
        self.species_decided = false;
        self.start_time = self.clock.now();
        self.inactive_start_time = None;
    }

    /// Feed whether the latest frame produced detections.
    pub fn update_has_detections(&mut self, has_detections: bool) {
        if has_detections {
            self.inactive_start_time = None;
        } else if self.inactive_start_time.is_none() {
            self.inactive_start_time = Some(self.clock.now());
        }
    }

    /// Whether the episode should stop now. Returns `true` at most once per episode.
    pub fn decide_stop_recording(&mut self) -> bool {
        if self.stop_recording_decided {
            return false;
        }
        let now = self.clock.now();
        let reached_max_record = now.duration_since(self.start_time) >= self.max_record;
        let reached_max_inactive = self
            .inactive_start_time
            .is_some_and(|t| now.duration_since(t) >= self.max_inactive);

        let decision = reached_max_record || reached_max_inactive;
        if decision {
            info!(
                "Stop recording decided (max record reached: {}, inactive: {})",
                reached_max_record, reached_max_inactive
            );
        }
        self.stop_recording_decided = decision;
        decision
    }

    /// Species for an early notification. Returns `Some` at most once per episode.
    pub fn decide_species(&mut self, tracks: &TrackSet) -> Option<String> {
        if self.species_decided {
            return None;
        }
        let best = self
            .get_results(tracks)
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))?;
        debug!("Species decided: {}", best.species_name);
        self.species_decided = true;
        Some(best.species_name)
    }

    /// Accepted results for the given tracks. Does not touch decision state.
    pub fn get_results(&self, tracks: &TrackSet) -> Vec<AcceptedResult> {
        accept_tracks(tracks, self.min_track_duration)
    }

    /// Whether the stop decision has fired this episode.
    pub fn stop_recording_decided(&self) -> bool {
        self.stop_recording_decided
    }

    /// Whether the species decision has fired this episode.
    pub fn species_decided(&self) -> bool {
        self.species_decided
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    #[test]
    fn test_rejects_non_positive_durations() {
        let clock: SharedClock = Arc::new(ManualClock::new());
        assert!(DecisionMaker::new(0.0, 10.0, 2.0, clock.clone()).is_err());
        assert!(DecisionMaker::new(60.0, -1.0, 2.0, clock.clone()).is_err());
        assert!(DecisionMaker::new(60.0, 10.0, -0.5, clock.clone()).is_err());
        assert!(DecisionMaker::new(60.0, 10.0, 0.0, clock).is_ok());
    }

    #[test]
    fn test_rejects_durations_beyond_range() {
        let clock: SharedClock = Arc::new(ManualClock::new());
        let err = DecisionMaker::new(1e20, 10.0, 2.0, clock.clone()).err().unwrap();
        assert!(matches!(err, Error::ConfigValidation { .. }));
        assert!(err.to_string().contains("max_record_seconds"));
        assert!(matches!(
            DecisionMaker::new(60.0, f64::MAX, 2.0, clock),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_max_record_fires_once() {
        let clock = Arc::new(ManualClock::new());
        let mut maker = DecisionMaker::new(5.0, 10.0, 2.0, clock.clone()).unwrap();
        maker.update_has_detections(true);
        assert!(!maker.decide_stop_recording());
        clock.advance_secs(5.0);
        assert!(maker.decide_stop_recording());
        assert!(!maker.decide_stop_recording());
    }
}
