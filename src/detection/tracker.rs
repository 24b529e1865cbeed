//! Greedy IoU multi-object tracker.
//!
//! Boxes are associated with live tracks by descending IoU. Unmatched boxes
//! open new tracks; tracks without a match coast for a bounded number of
//! frames before they are dropped.

use tracing::trace;

use super::{RawBox, TrackedBox};
use crate::constants::tracker::{DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_MISSED_FRAMES};
use crate::vision::BBox;

#[derive(Debug, Clone)]
struct Tracklet {
    id: u32,
    bbox: BBox,
    missed: u32,
}

/// IoU tracker with monotonically increasing ids.
#[derive(Debug, Clone)]
pub struct IouTracker {
    iou_threshold: f32,
    max_missed_frames: u32,
    next_id: u32,
    tracks: Vec<Tracklet>,
}

impl IouTracker {
    /// Create a tracker.
    pub fn new(iou_threshold: f32, max_missed_frames: u32) -> Self {
        Self {
            iou_threshold,
            max_missed_frames,
            next_id: 1,
            tracks: Vec::new(),
        }
    }

    /// Number of live tracks, including coasting ones.
    pub fn live_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// Associate this frame's boxes with tracks, in input order.
    pub fn update(&mut self, boxes: Vec<RawBox>) -> Vec<TrackedBox> {
        let mut pairs: Vec<(f32, usize, usize)> = Vec::new();
        for (ti, track) in self.tracks.iter().enumerate() {
            for (bi, raw) in boxes.iter().enumerate() {
                let iou = track.bbox.iou(&raw.bbox);
                if iou >= self.iou_threshold {
                    pairs.push((iou, ti, bi));
                }
            }
        }
        pairs.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut track_matched = vec![false; self.tracks.len()];
        let mut box_track: Vec<Option<usize>> = vec![None; boxes.len()];
        for (_, ti, bi) in pairs {
            if track_matched[ti] || box_track[bi].is_some() {
                continue;
            }
            track_matched[ti] = true;
            box_track[bi] = Some(ti);
        }

        for (ti, matched) in track_matched.iter().enumerate() {
            if !matched {
                self.tracks[ti].missed += 1;
            }
        }

        let mut output = Vec::with_capacity(boxes.len());
        for (raw, assigned) in boxes.into_iter().zip(box_track) {
            let id = if let Some(ti) = assigned {
                let track = &mut self.tracks[ti];
                track.bbox = raw.bbox;
                track.missed = 0;
                track.id
            } else {
                let id = self.next_id;
                self.next_id += 1;
                trace!("New track {id}");
                self.tracks.push(Tracklet {
                    id,
                    bbox: raw.bbox,
                    missed: 0,
                });
                id
            };
            output.push(TrackedBox {
                track_id: id,
                bbox: raw.bbox,
                confidence: raw.confidence,
                label: raw.label,
            });
        }

        let max_missed = self.max_missed_frames;
        self.tracks.retain(|t| t.missed <= max_missed);
        output
    }

    /// Drop all tracks and restart ids at 1.
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_MISSED_FRAMES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x1: f32, y1: f32, x2: f32, y2: f32) -> RawBox {
        RawBox {
            bbox: BBox::new(x1, y1, x2, y2),
            confidence: 0.9,
            label: None,
        }
    }

    #[test]
    fn test_ids_stable_for_overlapping_boxes() {
        let mut tracker = IouTracker::default();
        let first = tracker.update(vec![raw(0.1, 0.1, 0.3, 0.3), raw(0.6, 0.6, 0.8, 0.8)]);
        let second = tracker.update(vec![raw(0.62, 0.61, 0.82, 0.8), raw(0.11, 0.1, 0.31, 0.3)]);

        assert_eq!(first[0].track_id, 1);
        assert_eq!(first[1].track_id, 2);
        assert_eq!(second[0].track_id, 2);
        assert_eq!(second[1].track_id, 1);
    }

    #[test]
    fn test_disjoint_box_gets_new_id() {
        let mut tracker = IouTracker::default();
        tracker.update(vec![raw(0.1, 0.1, 0.2, 0.2)]);
        let next = tracker.update(vec![raw(0.7, 0.7, 0.9, 0.9)]);
        assert_eq!(next[0].track_id, 2);
    }

    #[test]
    fn test_track_coasts_then_expires() {
        let mut tracker = IouTracker::new(0.3, 2);
        tracker.update(vec![raw(0.1, 0.1, 0.3, 0.3)]);
        tracker.update(vec![]);
        tracker.update(vec![]);
        assert_eq!(tracker.live_tracks(), 1);
        let back = tracker.update(vec![raw(0.1, 0.1, 0.3, 0.3)]);
        assert_eq!(back[0].track_id, 1);

        for _ in 0..3 {
            tracker.update(vec![]);
        }
        assert_eq!(tracker.live_tracks(), 0);
    }

    #[test]
    fn test_reset_restarts_ids() {
        let mut tracker = IouTracker::default();
        tracker.update(vec![raw(0.1, 0.1, 0.3, 0.3), raw(0.5, 0.5, 0.7, 0.7)]);
        tracker.reset();
        let after = tracker.update(vec![raw(0.5, 0.5, 0.7, 0.7)]);
        assert_eq!(after[0].track_id, 1);
    }
}
