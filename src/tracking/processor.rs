//! Frame processor: runs the light gate and strategy, and folds detections into tracks.

use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use super::{Track, TrackSet};
use crate::clock::SharedClock;
use crate::detection::{Detection, DetectionStrategy};
use crate::vision::{Frame, LightGate};

/// Owns the detection strategy and the episode's track set.
pub struct FrameProcessor {
    strategy: Box<dyn DetectionStrategy>,
    light_gate: LightGate,
    low_light_sleep: Duration,
    min_detection_confidence: f32,
    clock: SharedClock,
    start: Instant,
    tracks: TrackSet,
    frame_count: u64,
}

impl FrameProcessor {
    /// Create a processor. Call [`FrameProcessor::reset`] at each episode start.
    pub fn new(
        strategy: Box<dyn DetectionStrategy>,
        light_gate: LightGate,
        low_light_sleep: Duration,
        min_detection_confidence: f32,
        clock: SharedClock,
    ) -> Self {
        let start = clock.now();
        debug!("FrameProcessor initialized with strategy {}", strategy.name());
        Self {
            strategy,
            light_gate,
            low_light_sleep,
            min_detection_confidence,
            clock,
            start,
            tracks: TrackSet::new(),
            frame_count: 0,
        }
    }

    /// Process one frame. Returns `true` iff at least one valid detection was produced.
    pub fn run(&mut self, frame: &Frame) -> bool {
        if frame.is_empty() {
            warn!("Received empty frame, skipping");
            return false;
        }
        self.frame_count += 1;

        // Timestamp before detection so latency does not skew track timing.
        let frame_time = round2(self.elapsed_secs());

        if !self.light_gate.has_sufficient_light(frame) {
            if !self.low_light_sleep.is_zero() {
                std::thread::sleep(self.low_light_sleep);
            }
            return false;
        }

        let started = Instant::now();
        let detections = match self.strategy.detect(frame, self.min_detection_confidence) {
            Ok(detections) => detections,
            Err(e) => {
                error!("Detection failed: {e}");
                return false;
            }
        };

        if detections.is_empty() {
            debug!("No detections");
            return false;
        }

        let count = detections.len();
        for detection in detections {
            self.update_track(detection, frame_time);
        }

        debug!(
            "Detection time: {} ms | valid: {}",
            started.elapsed().as_millis(),
            count
        );
        true
    }

    fn update_track(&mut self, detection: Detection, frame_time: f64) {
        let track = self
            .tracks
            .entry(detection.track_id)
            .or_insert_with(|| Track::new(frame_time));

        if let Some(species) = detection.class_name {
            track.predictions.push((species, detection.confidence));
        }
        track.observe(frame_time, detection.bbox);

        if let (Some(crop), Some(blur)) = (detection.crop.as_ref(), detection.blur_variance) {
            track.offer_best_frame(crop, blur);
        }
    }

    /// Tracks accumulated so far this episode.
    pub fn tracks(&self) -> &TrackSet {
        &self.tracks
    }

    /// Frames seen since the last reset.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Seconds since the episode started.
    pub fn elapsed_secs(&self) -> f64 {
        self.clock.now().duration_since(self.start).as_secs_f64()
    }

    /// Drop all tracks, reset the strategy and restart the episode clock.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.strategy.reset();
        self.start = self.clock.now();
        self.frame_count = 0;
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
