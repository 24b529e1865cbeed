//! Presence detection followed by round-robin species classification.

use image::RgbImage;
use tracing::{debug, info};

use super::{
    CandidateFilter, Detection, DetectionStrategy, PresenceTracker, RegionalFilter,
    SpeciesClassifier,
};
use crate::error::Result;
use crate::vision::{BBox, Frame, PixelRect};

struct Candidate {
    track_id: u32,
    confidence: f32,
    bbox: BBox,
    rect: PixelRect,
}

struct Chosen {
    track_id: u32,
    crop: RgbImage,
    blur_variance: f64,
}

/// Two-stage strategy: a cheap presence tracker plus one classification per frame.
///
/// Valid candidates are ordered by track id. A cursor that advances once per
/// call picks where the scan starts; the scan wraps and inspects up to
/// `max_blur_checks` candidates, classifying the first sharp one.
pub struct TwoStageStrategy {
    name: &'static str,
    presence: Box<dyn PresenceTracker>,
    classifier: Box<dyn SpeciesClassifier>,
    filter: CandidateFilter,
    regional: RegionalFilter,
    classification_index: usize,
}

impl TwoStageStrategy {
    /// Create a strategy from its detector and classifier.
    pub fn new(
        presence: Box<dyn PresenceTracker>,
        classifier: Box<dyn SpeciesClassifier>,
        filter: CandidateFilter,
        regional: RegionalFilter,
    ) -> Self {
        if regional.is_active() {
            info!(
                "Regional species filter active: {} names enabled",
                regional.len()
            );
        }
        Self {
            name: "two_stage",
            presence,
            classifier,
            filter,
            regional,
            classification_index: 0,
        }
    }

    /// Override the name reported in logs.
    #[must_use]
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Current value of the round-robin cursor.
    pub fn classification_index(&self) -> usize {
        self.classification_index
    }

    fn collect_candidates(
        &mut self,
        frame: &Frame,
        min_confidence: f32,
    ) -> Result<Vec<Candidate>> {
        let boxes = self.presence.track(frame, min_confidence)?;
        let mut candidates: Vec<Candidate> = boxes
            .into_iter()
            .filter(|b| self.filter.is_valid(&b.bbox, b.confidence, min_confidence))
            .filter_map(|b| {
                let rect = self.filter.crop_rect(&b.bbox, frame.width(), frame.height())?;
                Some(Candidate {
                    track_id: b.track_id,
                    confidence: b.confidence,
                    bbox: b.bbox,
                    rect,
                })
            })
            .collect();
        candidates.sort_by_key(|c| c.track_id);
        Ok(candidates)
    }

    fn choose(&mut self, frame: &Frame, candidates: &[Candidate]) -> Option<Chosen> {
        let n = candidates.len();
        let start = self.classification_index % n;
        self.classification_index += 1;

        for offset in 0..n.min(self.filter.max_blur_checks) {
            let candidate = &candidates[(start + offset) % n];
            let crop = frame.crop(candidate.rect);
            let (blurry, variance) = self.filter.check_blur(&crop);
            if !blurry {
                return Some(Chosen {
                    track_id: candidate.track_id,
                    crop,
                    blur_variance: variance,
                });
            }
        }
        None
    }
}

impl DetectionStrategy for TwoStageStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<Detection>> {
        let candidates = self.collect_candidates(frame, min_confidence)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut chosen = self.choose(frame, &candidates);
        let mut detections = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            let mut detection =
                Detection::unclassified(candidate.track_id, candidate.bbox, candidate.confidence);

            if let Some(pick) = chosen.take_if(|c| c.track_id == candidate.track_id) {
                debug!(
                    "Classifying track {} (detector conf: {:.1}%)",
                    candidate.track_id,
                    candidate.confidence * 100.0
                );
                let scores = self.classifier.classify(&pick.crop)?;
                if let Some((species, cls_conf)) = self.regional.pick(&scores) {
                    let combined = candidate.confidence * cls_conf;
                    info!(
                        "Track {}: {} | det:{:.1}% x cls:{:.1}% = {:.1}%",
                        candidate.track_id,
                        species,
                        candidate.confidence * 100.0,
                        cls_conf * 100.0,
                        combined * 100.0
                    );
                    detection.class_name = Some(species);
                    detection.confidence = combined;
                } else {
                    debug!("Classification returned no results");
                }
                detection.crop = Some(pick.crop);
                detection.blur_variance = Some(pick.blur_variance);
            }
            detections.push(detection);
        }

        debug!(
            "Frame summary: {} valid detections, {} classified",
            detections.len(),
            detections.iter().filter(|d| d.crop.is_some()).count()
        );
        Ok(detections)
    }

    fn reset(&mut self) {
        self.classification_index = 0;
        self.presence.reset();
    }
}
