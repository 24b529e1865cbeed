//! Track acceptance: majority vote, confidence floor and minimum duration.

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::constants::MIN_CONFIDENCE_TO_PROCESS;
use crate::tracking::{FramePosition, Track, TrackSet};

/// Where an accepted detection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    /// Camera track.
    Video,
    /// BirdNET audio detection.
    Audio,
}

/// Final judgment for one accepted track.
#[derive(Debug, Clone)]
pub struct AcceptedResult {
    /// Track id within the episode.
    pub track_id: u32,
    /// Winning species.
    pub species_name: String,
    /// First sighting, seconds since episode start.
    pub start_time: f64,
    /// Latest sighting, seconds since episode start.
    pub end_time: f64,
    /// Voting share times mean classifier confidence of the winner.
    pub confidence: f64,
    /// Best crop of the track.
    pub best_frame: Option<RgbImage>,
    /// Geometry trail.
    pub frames: Vec<FramePosition>,
    /// Always [`DetectionSource::Video`] for tracks.
    pub source: DetectionSource,
}

/// Reason a track cannot be evaluated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackDefect {
    /// Start or end time is NaN or infinite.
    #[error("non-finite timing (start={start}, end={end})")]
    NonFiniteTiming {
        /// Start time.
        start: f64,
        /// End time.
        end: f64,
    },
    /// End time precedes start time.
    #[error("end time {end} precedes start time {start}")]
    EndBeforeStart {
        /// Start time.
        start: f64,
        /// End time.
        end: f64,
    },
    /// A prediction has an empty species name.
    #[error("prediction {index} has an empty species name")]
    EmptySpecies {
        /// Position in the prediction list.
        index: usize,
    },
    /// A prediction confidence is outside [0, 1].
    #[error("prediction {index} has invalid confidence {confidence}")]
    InvalidConfidence {
        /// Position in the prediction list.
        index: usize,
        /// Offending value.
        confidence: f32,
    },
}

/// Check a track's shape before voting on it.
pub fn check_track(track: &Track) -> Result<(), TrackDefect> {
    let (start, end) = (track.start_time, track.end_time);
    if !start.is_finite() || !end.is_finite() {
        return Err(TrackDefect::NonFiniteTiming { start, end });
    }
    if end < start {
        return Err(TrackDefect::EndBeforeStart { start, end });
    }
    for (index, (species, confidence)) in track.predictions.iter().enumerate() {
        if species.is_empty() {
            return Err(TrackDefect::EmptySpecies { index });
        }
        if !(0.0..=1.0).contains(confidence) {
            return Err(TrackDefect::InvalidConfidence {
                index,
                confidence: *confidence,
            });
        }
    }
    Ok(())
}

/// Most frequent species; ties go to the one seen first.
fn majority(predictions: &[(String, f32)]) -> Option<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (species, _) in predictions {
        if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == species.as_str()) {
            entry.1 += 1;
        } else {
            counts.push((species.as_str(), 1));
        }
    }
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
}

/// Evaluate every track and return the accepted ones, ordered by track id.
pub fn accept_tracks(tracks: &TrackSet, min_track_duration: f64) -> Vec<AcceptedResult> {
    let mut accepted = Vec::new();

    for (&track_id, track) in tracks {
        if track.predictions.is_empty() {
            continue;
        }
        if let Err(defect) = check_track(track) {
            warn!("Skipping malformed track {track_id}: {defect}");
            continue;
        }
        let Some((species, count)) = majority(&track.predictions) else {
            continue;
        };

        #[allow(clippy::cast_precision_loss)]
        let voting_confidence = count as f64 / track.predictions.len() as f64;
        let relevant: Vec<f64> = track
            .predictions
            .iter()
            .filter(|(s, _)| s == species)
            .map(|(_, c)| f64::from(*c))
            .collect();
        #[allow(clippy::cast_precision_loss)]
        let avg_classifier_confidence = relevant.iter().sum::<f64>() / relevant.len() as f64;
        let confidence = voting_confidence * avg_classifier_confidence;

        if confidence < MIN_CONFIDENCE_TO_PROCESS {
            debug!(
                "Skipping track {track_id} with {:.0}% confidence, below threshold",
                confidence * 100.0
            );
            continue;
        }

        let duration = track.duration();
        if duration < min_track_duration {
            debug!(
                "Track {track_id} REJECTED (duration): {species} | duration: {duration:.1}s < min: {min_track_duration}s"
            );
            continue;
        }

        info!(
            "Track {track_id} ACCEPTED: {species} | confidence: {:.1}% (voting: {:.1}%, avg_cls: {:.1}%) | duration: {duration:.1}s | predictions: {}",
            confidence * 100.0,
            voting_confidence * 100.0,
            avg_classifier_confidence * 100.0,
            track.predictions.len()
        );
        accepted.push(AcceptedResult {
            track_id,
            species_name: species.to_string(),
            start_time: track.start_time,
            end_time: track.end_time,
            confidence,
            best_frame: track.best_frame.clone(),
            frames: track.frames.clone(),
            source: DetectionSource::Video,
        });
    }

    if accepted.is_empty() {
        debug!(
            "No tracks met acceptance criteria (processed {} tracks)",
            tracks.len()
        );
    } else {
        info!("Final results: {} tracks accepted", accepted.len());
    }
    accepted
}
