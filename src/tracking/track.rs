//! Per-track evidence accumulated over one episode.

use std::collections::BTreeMap;

use image::RgbImage;
use serde::Serialize;

use crate::constants::best_frame::SHARPNESS_WEIGHT;
use crate::vision::BBox;

/// One entry of a track's geometry trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FramePosition {
    /// Seconds since the episode started.
    pub t: f64,
    /// Box in this frame, rounded to two decimals.
    pub bbox: BBox,
}

/// Evidence for one physically persistent subject.
#[derive(Debug, Clone)]
pub struct Track {
    /// First sighting, seconds since episode start.
    pub start_time: f64,
    /// Latest sighting, seconds since episode start.
    pub end_time: f64,
    /// `(species, confidence)` for every frame in which this track was classified.
    pub predictions: Vec<(String, f32)>,
    /// Highest-scoring crop seen so far.
    pub best_frame: Option<RgbImage>,
    /// Score of `best_frame`.
    pub best_frame_score: f64,
    /// Geometry trail, one entry per sighting.
    pub frames: Vec<FramePosition>,
}

impl Track {
    /// Start a track at time `t`.
    pub fn new(t: f64) -> Self {
        Self {
            start_time: t,
            end_time: t,
            predictions: Vec::new(),
            best_frame: None,
            best_frame_score: 0.0,
            frames: Vec::new(),
        }
    }

    /// Seconds between first and latest sighting.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Record a sighting at `t`.
    pub fn observe(&mut self, t: f64, bbox: BBox) {
        if t > self.end_time {
            self.end_time = t;
        }
        self.frames.push(FramePosition {
            t: (t * 100.0).round() / 100.0,
            bbox: bbox.rounded(),
        });
    }

    /// Offer a crop as best frame; kept only if its score strictly improves.
    ///
    /// Returns whether the crop replaced the stored one.
    pub fn offer_best_frame(&mut self, crop: &RgbImage, blur_variance: f64) -> bool {
        let score = best_frame_score(blur_variance, crop.width(), crop.height());
        if score > self.best_frame_score {
            self.best_frame_score = score;
            self.best_frame = Some(crop.clone());
            true
        } else {
            false
        }
    }
}

/// Weighted log score balancing sharpness against size.
#[allow(clippy::cast_precision_loss)]
pub fn best_frame_score(blur_variance: f64, width: u32, height: u32) -> f64 {
    let pixels = f64::from(width) * f64::from(height);
    SHARPNESS_WEIGHT * (blur_variance.max(0.0) + 1.0).ln() + (pixels + 1.0).ln()
}

/// All tracks of an episode, keyed by track id.
pub type TrackSet = BTreeMap<u32, Track>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sharper_crop_wins_at_equal_size() {
        let crop = RgbImage::new(100, 100);
        let mut track = Track::new(0.0);
        assert!(track.offer_best_frame(&crop, 50.0));
        assert!(track.offer_best_frame(&crop, 200.0));
        assert!(!track.offer_best_frame(&crop, 200.0));
        assert!(!track.offer_best_frame(&crop, 10.0));
        assert!((track.best_frame_score - best_frame_score(200.0, 100, 100)).abs() < 1e-9);
    }

    #[test]
    fn test_end_time_never_decreases() {
        let mut track = Track::new(1.0);
        track.observe(3.0, BBox::new(0.1, 0.1, 0.2, 0.2));
        track.observe(2.0, BBox::new(0.1, 0.1, 0.2, 0.2));
        assert!((track.end_time - 3.0).abs() < f64::EPSILON);
        assert_eq!(track.frames.len(), 2);
    }

    #[test]
    fn test_sharpness_weighted_above_size() {
        // 10x sharpness outweighs 10x pixels
        let sharp_small = best_frame_score(1000.0, 100, 100);
        let blurry_large = best_frame_score(100.0, 316, 316);
        assert!(sharp_small > blurry_large);
    }
}
