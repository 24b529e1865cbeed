//! Detector and classifier capabilities consumed by the strategies.

use image::RgbImage;

use super::{IouTracker, RawBox, TrackedBox};
use crate::error::Result;
use crate::vision::Frame;

/// Object detector producing untracked boxes.
pub trait ObjectDetector: Send {
    /// Backend name for logs and errors.
    fn name(&self) -> &'static str;

    /// Detect objects at or above `min_confidence`.
    fn detect(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<RawBox>>;
}

/// Detector with a stable tracker: ids persist across consecutive frames.
pub trait PresenceTracker: Send {
    /// Detect and associate boxes in this frame.
    fn track(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<TrackedBox>>;

    /// Forget all track identities so ids restart for a new episode.
    fn reset(&mut self);
}

/// Species classifier run on a single crop.
pub trait SpeciesClassifier: Send {
    /// Raw `(label, score)` pairs, best first.
    fn classify(&mut self, crop: &RgbImage) -> Result<Vec<(String, f32)>>;
}

/// Object detector paired with an [`IouTracker`].
pub struct TrackingDetector {
    detector: Box<dyn ObjectDetector>,
    tracker: IouTracker,
}

impl TrackingDetector {
    /// Wrap a detector with a tracker.
    pub fn new(detector: Box<dyn ObjectDetector>, tracker: IouTracker) -> Self {
        Self { detector, tracker }
    }
}

impl PresenceTracker for TrackingDetector {
    fn track(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<TrackedBox>> {
        let boxes = self.detector.detect(frame, min_confidence)?;
        Ok(self.tracker.update(boxes))
    }

    fn reset(&mut self) {
        self.tracker.reset();
    }
}
