//! Audio analysis of finished recordings.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Datelike;
use tracing::{debug, error, info, warn};

use super::{
    AudioDetection, DecodedAudio, extract_audio, merge_detections, read_wav, render_spectrogram,
    segment_audio, spectrogram_path,
};
use crate::clock::SharedClock;
use crate::constants::audio::DEFAULT_SPECTROGRAM_PX_PER_SEC;
use crate::error::Result;
use crate::inference::{BirdNetClassifier, RangeFilter, common_name};

/// Result of analysing one recording.
#[derive(Debug, Clone, Default)]
pub struct AudioAnalysis {
    /// Merged detections.
    pub detections: Vec<AudioDetection>,
    /// Rendered spectrogram, when one was produced.
    pub spectrogram_path: Option<PathBuf>,
}

/// Audio analysis collaborator. Failures yield an empty analysis.
pub trait AudioAnalyzer: Send {
    /// Analyse the audio track of a finished video.
    fn analyze(&self, video: &Path) -> AudioAnalysis;
}

/// Pair merged detections with a spectrogram next to `video`.
///
/// The spectrogram is drawn only when there are detections. A rendering
/// failure is logged and leaves the detections untouched.
pub fn with_spectrogram(
    detections: Vec<AudioDetection>,
    audio: &DecodedAudio,
    video: &Path,
    px_per_sec: u32,
) -> AudioAnalysis {
    if detections.is_empty() {
        return AudioAnalysis {
            detections,
            spectrogram_path: None,
        };
    }

    let path = spectrogram_path(video, px_per_sec);
    let started = Instant::now();
    let rendered = match render_spectrogram(&audio.samples, audio.sample_rate, px_per_sec, &path) {
        Ok(()) => {
            info!(
                "Spectrogram written to {} in {} ms",
                path.display(),
                started.elapsed().as_millis()
            );
            Some(path)
        }
        Err(e) => {
            error!("Failed to generate spectrogram: {e}");
            None
        }
    };
    AudioAnalysis {
        detections,
        spectrogram_path: rendered,
    }
}

/// BirdNET analyzer with an optional location filter.
pub struct BirdNetAnalyzer {
    classifier: BirdNetClassifier,
    range_filter: Option<(RangeFilter, f64, f64)>,
    extract_timeout: Duration,
    spectrogram_px_per_sec: u32,
    clock: SharedClock,
}

impl BirdNetAnalyzer {
    /// Create an analyzer.
    pub fn new(classifier: BirdNetClassifier, extract_timeout: Duration, clock: SharedClock) -> Self {
        Self {
            classifier,
            range_filter: None,
            extract_timeout,
            spectrogram_px_per_sec: DEFAULT_SPECTROGRAM_PX_PER_SEC,
            clock,
        }
    }

    /// Restrict detections to species expected at a location.
    #[must_use]
    pub fn with_location(mut self, filter: RangeFilter, latitude: f64, longitude: f64) -> Self {
        self.range_filter = Some((filter, latitude, longitude));
        self
    }

    /// Spectrogram width per second of audio.
    #[must_use]
    pub fn with_spectrogram_resolution(mut self, px_per_sec: u32) -> Self {
        self.spectrogram_px_per_sec = px_per_sec;
        self
    }

    fn detect(&self, audio: &DecodedAudio) -> Result<Vec<AudioDetection>> {
        let segments = segment_audio(
            &audio.samples,
            audio.sample_rate,
            self.classifier.segment_duration(),
        );
        debug!(
            "Analysing {:.1}s of audio in {} segments",
            audio.duration_secs(),
            segments.len()
        );

        let location_scores = match &self.range_filter {
            Some((filter, lat, lon)) => {
                let today = self.clock.local();
                Some((filter, filter.predict(*lat, *lon, today.month(), today.day())?))
            }
            None => None,
        };

        let mut detections = Vec::new();
        for segment in &segments {
            let result = self.classifier.predict(&segment.samples)?;
            let predictions = match &location_scores {
                Some((filter, scores)) => filter.filter_predictions(&result.predictions, scores),
                None => result.predictions,
            };
            detections.extend(predictions.into_iter().map(|p| AudioDetection {
                species_name: common_name(&p.species).to_string(),
                start_time: segment.start_time,
                end_time: segment.end_time,
                confidence: f64::from(p.confidence),
            }));
        }
        Ok(merge_detections(detections))
    }
}

impl AudioAnalyzer for BirdNetAnalyzer {
    fn analyze(&self, video: &Path) -> AudioAnalysis {
        info!("Processing audio from video \"{}\"", video.display());
        let started = Instant::now();

        if !video.exists() {
            error!("Video file does not exist: {}", video.display());
            return AudioAnalysis::default();
        }

        let wav = match extract_audio(video, self.classifier.sample_rate(), self.extract_timeout) {
            Ok(path) => path,
            Err(e) => {
                error!("Error processing audio: {e}");
                return AudioAnalysis::default();
            }
        };

        let decoded = read_wav(&wav);
        if let Err(e) = std::fs::remove_file(&wav) {
            warn!("Failed to remove temp audio file {}: {e}", wav.display());
        }
        let analysis = match decoded {
            Ok(audio) => match self.detect(&audio) {
                Ok(detections) => {
                    with_spectrogram(detections, &audio, video, self.spectrogram_px_per_sec)
                }
                Err(e) => {
                    error!("Error processing audio: {e}");
                    AudioAnalysis::default()
                }
            },
            Err(e) => {
                error!("Error processing audio: {e}");
                AudioAnalysis::default()
            }
        };

        info!(
            "Total audio processing time: {} ms, {} detections",
            started.elapsed().as_millis(),
            analysis.detections.len()
        );
        analysis
    }
}
