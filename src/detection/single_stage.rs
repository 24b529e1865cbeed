//! Detector that labels species directly.

use tracing::{debug, info};

use super::{CandidateFilter, Detection, DetectionStrategy, PresenceTracker, RegionalFilter};
use crate::detection::normalize_class_name;
use crate::error::Result;
use crate::vision::Frame;

/// Single-pass strategy: every valid, sharp box carries its detector label.
pub struct SingleStageStrategy {
    detector: Box<dyn PresenceTracker>,
    filter: CandidateFilter,
    regional: RegionalFilter,
}

impl SingleStageStrategy {
    /// Create a strategy around a labelling detector.
    pub fn new(
        detector: Box<dyn PresenceTracker>,
        filter: CandidateFilter,
        regional: RegionalFilter,
    ) -> Self {
        Self {
            detector,
            filter,
            regional,
        }
    }
}

impl DetectionStrategy for SingleStageStrategy {
    fn name(&self) -> &'static str {
        "single_stage"
    }

    fn detect(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<Detection>> {
        let boxes = self.detector.track(frame, min_confidence)?;
        let mut detections = Vec::new();

        for tracked in boxes {
            let Some(label) = tracked.label.as_deref() else {
                continue;
            };
            let class_name = normalize_class_name(label);
            if !self.regional.allows(&class_name) {
                continue;
            }
            if !self
                .filter
                .is_valid(&tracked.bbox, tracked.confidence, min_confidence)
            {
                continue;
            }
            let Some(rect) = self
                .filter
                .crop_rect(&tracked.bbox, frame.width(), frame.height())
            else {
                continue;
            };

            let crop = frame.crop(rect);
            let (blurry, variance) = self.filter.check_blur(&crop);
            if blurry {
                continue;
            }

            info!(
                "Track {}: {} ({:.1}%) | blur_var: {:.1}",
                tracked.track_id,
                class_name,
                tracked.confidence * 100.0,
                variance
            );
            detections.push(Detection {
                track_id: tracked.track_id,
                class_name: Some(class_name),
                confidence: tracked.confidence,
                bbox: tracked.bbox,
                blur_variance: Some(variance),
                crop: Some(crop),
            });
        }

        if !detections.is_empty() {
            debug!("Frame summary: {} detections", detections.len());
        }
        Ok(detections)
    }

    fn reset(&mut self) {
        self.detector.reset();
    }
}
