//! Audio detections and adjacent-merge fusion.

use serde::Serialize;

use crate::constants::audio::MERGE_GAP_SECS;

/// One species call heard in a recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioDetection {
    /// Common name.
    pub species_name: String,
    /// Start, seconds from the start of the recording.
    pub start_time: f64,
    /// End, seconds from the start of the recording.
    pub end_time: f64,
    /// Model confidence.
    pub confidence: f64,
}

/// Merge consecutive same-species detections separated by at most one second.
///
/// Input is sorted by start time first. A merged detection spans the union of
/// its parts and keeps the highest confidence.
pub fn merge_detections(mut detections: Vec<AudioDetection>) -> Vec<AudioDetection> {
    detections.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut merged: Vec<AudioDetection> = Vec::with_capacity(detections.len());
    for next in detections {
        match merged.last_mut() {
            Some(current)
                if current.species_name == next.species_name
                    && next.start_time - current.end_time <= MERGE_GAP_SECS =>
            {
                current.end_time = current.end_time.max(next.end_time);
                current.confidence = current.confidence.max(next.confidence);
            }
            _ => merged.push(next),
        }
    }
    merged
}
