//! Candidate validity and sharpness checks shared by every strategy.

use image::RgbImage;
use tracing::info;

use crate::constants::filters::{
    DEFAULT_BLUR_THRESHOLD, DEFAULT_MAX_BLUR_CHECKS, DEFAULT_MIN_BOX_SIZE_PX,
    DEFAULT_MIN_CENTER_DIST,
};
use crate::vision::{BBox, PixelRect, laplacian_variance};

/// Rejects partial, tiny, low-confidence and blurry candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFilter {
    /// Minimum normalized distance between the box center and any edge.
    pub min_center_dist: f32,
    /// Minimum box side in pixels, measured after clamping to the frame.
    pub min_box_size_px: u32,
    /// Laplacian variance at or above which a crop is sharp.
    pub blur_threshold: f64,
    /// Candidates examined for sharpness per frame.
    pub max_blur_checks: usize,
}

impl CandidateFilter {
    /// Whether the box is far enough from the edges and confident enough.
    pub fn is_valid(&self, bbox: &BBox, confidence: f32, min_confidence: f32) -> bool {
        bbox.is_finite()
            && bbox.center_within_margin(self.min_center_dist)
            && confidence >= min_confidence
    }

    /// Clamped pixel rectangle for a box, or `None` if it is empty or too small.
    pub fn crop_rect(&self, bbox: &BBox, width: u32, height: u32) -> Option<PixelRect> {
        let rect = bbox.to_pixels(width, height)?;
        if rect.width < self.min_box_size_px || rect.height < self.min_box_size_px {
            return None;
        }
        Some(rect)
    }

    /// Sharpness check. Returns `(is_blurry, variance)`.
    pub fn check_blur(&self, crop: &RgbImage) -> (bool, f64) {
        let variance = laplacian_variance(crop);
        let blurry = variance < self.blur_threshold;
        if blurry {
            info!(
                "Blur detected: variance={:.1} < threshold={}",
                variance, self.blur_threshold
            );
        }
        (blurry, variance)
    }
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self {
            min_center_dist: DEFAULT_MIN_CENTER_DIST,
            min_box_size_px: DEFAULT_MIN_BOX_SIZE_PX,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            max_blur_checks: DEFAULT_MAX_BLUR_CHECKS,
        }
    }
}
