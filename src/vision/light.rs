//! Low-light suppression.

use super::Frame;
use tracing::debug;

/// Cheap per-frame check that skips detection when the scene is too dark.
#[derive(Debug, Clone, Copy)]
pub struct LightGate {
    min_brightness: f64,
}

impl LightGate {
    /// Create a gate requiring at least `min_brightness` mean luma (0-255).
    pub fn new(min_brightness: f64) -> Self {
        Self { min_brightness }
    }

    /// Whether the frame is bright enough to run detection on.
    pub fn has_sufficient_light(&self, frame: &Frame) -> bool {
        let brightness = frame.mean_luma();
        let sufficient = brightness >= self.min_brightness;
        if !sufficient {
            debug!(
                "Insufficient light: brightness={:.1} < {:.1}",
                brightness, self.min_brightness
            );
        }
        sufficient
    }
}

impl Default for LightGate {
    fn default() -> Self {
        Self::new(crate::constants::light::DEFAULT_MIN_BRIGHTNESS)
    }
}
