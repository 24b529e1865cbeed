//! Detection strategy interface.

use crate::error::Result;
use crate::vision::Frame;

use super::Detection;

/// Turns one frame into per-track detections, classifying a budgeted subset.
///
/// Implementations hold per-episode state (tracker identities, scheduling
/// cursor) that [`DetectionStrategy::reset`] clears.
pub trait DetectionStrategy: Send {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// Detect, filter and classify candidates in `frame`.
    fn detect(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<Detection>>;

    /// Clear scheduling state and tracker identities for a new episode.
    fn reset(&mut self);
}
