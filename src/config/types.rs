//! Configuration type definitions.

use crate::constants::{
    audio, backend, camera, episode, filters, light, motion, output, tracker, verification,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detection pipeline settings.
    pub processor: ProcessorConfig,

    /// Camera and recording hardware.
    pub camera: CameraConfig,

    /// Motion trigger.
    pub motion: MotionConfig,

    /// Audio analysis.
    pub audio: AudioConfig,

    /// Feeder location.
    pub location: LocationConfig,

    /// External AI services.
    pub ai: AiConfig,

    /// Reporting backend.
    pub backend: BackendConfig,
}

/// Detection strategy selected at startup.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Detector labels species directly.
    SingleStage,
    /// Presence detector followed by a regional species classifier.
    #[default]
    TwoStage,
    /// Presence detector followed by a global species classifier.
    Global,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SingleStage => write!(f, "single_stage"),
            Self::TwoStage => write!(f, "two_stage"),
            Self::Global => write!(f, "global"),
        }
    }
}

/// Episode timing and per-frame processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Hard cap on recording length, in seconds.
    pub max_record_seconds: f64,

    /// Continuous inactivity that stops a recording, in seconds.
    pub max_inactive_seconds: f64,

    /// Minimum track lifetime for acceptance, in seconds.
    pub min_track_duration: f64,

    /// Minimum detector confidence.
    pub min_detection_confidence: f32,

    /// Detection strategy.
    pub strategy: StrategyKind,

    /// Mean luma (0-255) below which frames are skipped.
    pub min_brightness: f64,

    /// Pause after a dark frame, in milliseconds.
    pub low_light_sleep_ms: u64,

    /// Run audio analysis on finished recordings.
    pub enable_audio_processing: bool,

    /// Horizontal resolution of the audio spectrogram.
    pub spectrogram_px_per_sec: u32,

    /// Root directory for episode folders; relative paths resolve against the config file.
    pub recordings_dir: PathBuf,

    /// Candidate filters.
    pub filters: FiltersConfig,

    /// Presence tracker.
    pub tracker: TrackerConfig,

    /// Inference service endpoints.
    pub models: ModelsConfig,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_record_seconds: episode::DEFAULT_MAX_RECORD_SECONDS,
            max_inactive_seconds: episode::DEFAULT_MAX_INACTIVE_SECONDS,
            min_track_duration: episode::DEFAULT_MIN_TRACK_DURATION,
            min_detection_confidence: episode::DEFAULT_MIN_DETECTION_CONFIDENCE,
            strategy: StrategyKind::default(),
            min_brightness: light::DEFAULT_MIN_BRIGHTNESS,
            low_light_sleep_ms: light::DEFAULT_LOW_LIGHT_SLEEP_MS,
            enable_audio_processing: true,
            spectrogram_px_per_sec: audio::DEFAULT_SPECTROGRAM_PX_PER_SEC,
            recordings_dir: PathBuf::from(output::DEFAULT_RECORDINGS_DIR),
            filters: FiltersConfig::default(),
            tracker: TrackerConfig::default(),
            models: ModelsConfig::default(),
        }
    }
}

/// Candidate filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Minimum normalized distance from a box center to the frame edge.
    pub min_center_dist: f32,

    /// Minimum box side length in pixels.
    pub min_box_size_px: u32,

    /// Laplacian variance at or above which a crop is sharp.
    pub blur_threshold: f64,

    /// Candidates examined for sharpness per frame.
    pub max_blur_checks: usize,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            min_center_dist: filters::DEFAULT_MIN_CENTER_DIST,
            min_box_size_px: filters::DEFAULT_MIN_BOX_SIZE_PX,
            blur_threshold: filters::DEFAULT_BLUR_THRESHOLD,
            max_blur_checks: filters::DEFAULT_MAX_BLUR_CHECKS,
        }
    }
}

/// IoU tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum IoU to continue a track.
    pub iou_threshold: f32,

    /// Frames a track may coast without a match.
    pub max_missed_frames: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: tracker::DEFAULT_IOU_THRESHOLD,
            max_missed_frames: tracker::DEFAULT_MAX_MISSED_FRAMES,
        }
    }
}

/// Inference service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Object detector endpoint (presence boxes, or labeled boxes for `single_stage`).
    pub detector_url: Option<String>,

    /// Regional species classifier endpoint.
    pub classifier_url: Option<String>,

    /// Global species classifier endpoint.
    pub global_classifier_url: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            detector_url: None,
            classifier_url: None,
            global_classifier_url: None,
            timeout_secs: backend::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Camera and recording settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// V4L2 capture device.
    pub device: String,

    /// ALSA device recorded alongside video.
    pub audio_device: String,

    /// Recording resolution.
    pub main_size: (u32, u32),

    /// Detection resolution.
    pub lores_size: (u32, u32),

    /// Capture frame rate.
    pub fps: u32,

    /// MJPEG preview port, or `None` to disable the preview server.
    pub preview_port: Option<u16>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: camera::DEFAULT_DEVICE.to_string(),
            audio_device: camera::DEFAULT_AUDIO_DEVICE.to_string(),
            main_size: camera::DEFAULT_MAIN_SIZE,
            lores_size: camera::DEFAULT_LORES_SIZE,
            fps: camera::DEFAULT_FPS,
            preview_port: Some(camera::DEFAULT_PREVIEW_PORT),
        }
    }
}

/// Motion trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// GPIO pin of the PIR sensor.
    pub pir_pin: u32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            pir_pin: motion::DEFAULT_PIR_PIN,
        }
    }
}

/// Audio analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// BirdNET ONNX model.
    pub model: Option<PathBuf>,

    /// BirdNET labels file.
    pub labels: Option<PathBuf>,

    /// BirdNET meta model for location filtering.
    pub meta_model: Option<PathBuf>,

    /// Minimum confidence for an audio detection.
    pub min_confidence: f32,

    /// Range filter threshold.
    pub range_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            model: None,
            labels: None,
            meta_model: None,
            min_confidence: audio::DEFAULT_MIN_CONFIDENCE,
            range_threshold: audio::DEFAULT_RANGE_THRESHOLD,
        }
    }
}

/// Feeder location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Latitude (-90.0 to 90.0).
    pub latitude: Option<f64>,

    /// Longitude (-180.0 to 180.0).
    pub longitude: Option<f64>,
}

impl LocationConfig {
    /// Both coordinates, if configured.
    pub const fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// External AI services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Gemini API key.
    pub gemini_api_key: Option<String>,

    /// Plausibility verification.
    pub llm_verification: LlmVerificationConfig,
}

/// Plausibility verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmVerificationConfig {
    /// Enable verification (requires an API key).
    pub enabled: bool,

    /// Gemini model name.
    pub model: String,

    /// Detections below this confidence are verified.
    pub min_confidence: f64,

    /// Verification calls per rolling hour.
    pub max_calls_per_hour: u32,

    /// Verification calls per day.
    pub max_calls_per_day: u32,

    /// Directory for verification logs.
    pub log_dir: Option<PathBuf>,
}

impl Default for LlmVerificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: verification::DEFAULT_MODEL.to_string(),
            min_confidence: verification::DEFAULT_MIN_CONFIDENCE,
            max_calls_per_hour: verification::DEFAULT_MAX_CALLS_PER_HOUR,
            max_calls_per_day: verification::DEFAULT_MAX_CALLS_PER_DAY,
            log_dir: Some(PathBuf::from(output::DEFAULT_VERIFICATION_LOG_DIR)),
        }
    }
}

/// Reporting backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend API.
    pub api_url_base: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Attempts per request.
    pub max_retries: u32,

    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url_base: None,
            timeout_secs: backend::DEFAULT_TIMEOUT_SECS,
            max_retries: backend::DEFAULT_MAX_RETRIES,
            heartbeat_interval_secs: backend::DEFAULT_HEARTBEAT_INTERVAL_SECS,
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_processor_defaults() {
        let processor = ProcessorConfig::default();
        assert_eq!(processor.max_record_seconds, 60.0);
        assert_eq!(processor.max_inactive_seconds, 10.0);
        assert_eq!(processor.min_track_duration, 2.0);
        assert_eq!(processor.strategy, StrategyKind::TwoStage);
        assert_eq!(processor.filters.max_blur_checks, 3);
    }

    #[test]
    fn test_strategy_kind_display() {
        assert_eq!(StrategyKind::SingleStage.to_string(), "single_stage");
        assert_eq!(StrategyKind::Global.to_string(), "global");
    }

    #[test]
    fn test_coordinates_require_both() {
        let mut location = LocationConfig {
            latitude: Some(42.0),
            longitude: None,
        };
        assert!(location.coordinates().is_none());
        location.longitude = Some(-71.0);
        assert_eq!(location.coordinates(), Some((42.0, -71.0)));
    }
}
