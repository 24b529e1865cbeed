//! Per-frame detection records.

use image::RgbImage;

use crate::vision::BBox;

/// Untracked box straight from an object detector.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBox {
    /// Normalized box coordinates.
    pub bbox: BBox,
    /// Detector confidence.
    pub confidence: f32,
    /// Class label, for detectors that also classify.
    pub label: Option<String>,
}

/// Box with a track id that is stable across frames of one episode.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedBox {
    /// Tracker-assigned id.
    pub track_id: u32,
    /// Normalized box coordinates.
    pub bbox: BBox,
    /// Detector confidence.
    pub confidence: f32,
    /// Class label, for detectors that also classify.
    pub label: Option<String>,
}

/// One strategy output for one track in one frame.
///
/// `class_name`, `crop` and `blur_variance` are only present on boxes that
/// were classified this frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Tracker-assigned id.
    pub track_id: u32,
    /// Species name, when this box was classified.
    pub class_name: Option<String>,
    /// Detector confidence, or detector x classifier confidence once classified.
    pub confidence: f32,
    /// Normalized box coordinates.
    pub bbox: BBox,
    /// Laplacian variance of the crop.
    pub blur_variance: Option<f64>,
    /// Crop used for classification.
    pub crop: Option<RgbImage>,
}

impl Detection {
    /// Detection for a tracked but unclassified box.
    pub fn unclassified(track_id: u32, bbox: BBox, confidence: f32) -> Self {
        Self {
            track_id,
            class_name: None,
            confidence,
            bbox,
            blur_variance: None,
            crop: None,
        }
    }
}
