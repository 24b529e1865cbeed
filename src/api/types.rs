//! Backend payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::AudioDetection;
use crate::constants::PROCESSOR_VERSION;
use crate::decision::{AcceptedResult, DetectionSource};
use crate::tracking::FramePosition;

/// One species entry of a video record, from either source.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesEntry {
    /// Track id for video detections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u32>,
    /// Species name.
    pub species_name: String,
    /// Start, seconds from the start of the recording.
    pub start_time: f64,
    /// End, seconds from the start of the recording.
    pub end_time: f64,
    /// Final confidence.
    pub confidence: f64,
    /// Video or audio.
    pub source: DetectionSource,
    /// Geometry trail for video detections.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub frames: Vec<FramePosition>,
    /// Saved best frame, inside the episode directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_frame_path: Option<String>,
}

impl SpeciesEntry {
    /// Entry for an accepted video track.
    pub fn from_video(result: &AcceptedResult, best_frame_path: Option<String>) -> Self {
        Self {
            track_id: Some(result.track_id),
            species_name: result.species_name.clone(),
            start_time: result.start_time,
            end_time: result.end_time,
            confidence: result.confidence,
            source: DetectionSource::Video,
            frames: result.frames.clone(),
            best_frame_path,
        }
    }

    /// Entry for an audio detection.
    pub fn from_audio(detection: &AudioDetection) -> Self {
        Self {
            track_id: None,
            species_name: detection.species_name.clone(),
            start_time: detection.start_time,
            end_time: detection.end_time,
            confidence: detection.confidence,
            source: DetectionSource::Audio,
            frames: Vec::new(),
            best_frame_path: None,
        }
    }
}

/// Body of the video creation call.
#[derive(Debug, Clone, Serialize)]
pub struct VideoPayload {
    /// Processor version string.
    pub processor_version: String,
    /// Video detections followed by audio detections.
    pub species: Vec<SpeciesEntry>,
    /// Episode start, RFC 3339 UTC.
    pub start_time: DateTime<Utc>,
    /// Episode end, RFC 3339 UTC.
    pub end_time: DateTime<Utc>,
    /// Recorded video.
    pub video_path: String,
    /// Spectrogram image, when rendered.
    pub spectrogram_path: Option<String>,
}

impl VideoPayload {
    /// Assemble the payload for a finished episode.
    pub fn new(
        video: Vec<SpeciesEntry>,
        audio: &[AudioDetection],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        video_path: String,
        spectrogram_path: Option<String>,
    ) -> Self {
        let mut species = video;
        species.extend(audio.iter().map(SpeciesEntry::from_audio));
        Self {
            processor_version: PROCESSOR_VERSION.to_string(),
            species,
            start_time,
            end_time,
            video_path,
            spectrogram_path,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ActivityLogRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub data: serde_json::Value,
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivityLogResponse {
    pub id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActiveSpeciesResponse {
    pub active_feeder_names: Option<Vec<String>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_appends_audio_with_source() {
        let audio = vec![AudioDetection {
            species_name: "Blue Jay".to_string(),
            start_time: 0.0,
            end_time: 3.0,
            confidence: 0.8,
        }];
        let now = Utc::now();
        let payload = VideoPayload::new(Vec::new(), &audio, now, now, "video.mp4".to_string(), None);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["processor_version"], "1");
        assert_eq!(json["species"][0]["source"], "audio");
        assert!(json["species"][0].get("track_id").is_none());
        assert!(json["spectrogram_path"].is_null());
    }
}
