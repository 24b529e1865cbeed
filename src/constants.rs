//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "feedercam";

/// Processor version reported to the backend with every video.
pub const PROCESSOR_VERSION: &str = "1";

/// Minimum combined confidence for an accepted track.
///
/// Tracks below this are treated as noise and never reach verification or storage.
pub const MIN_CONFIDENCE_TO_PROCESS: f64 = 0.10;

/// Species name that never goes through plausibility verification.
pub const VERIFICATION_EXEMPT_SPECIES: &str = "Squirrel";

/// Species name used when no allowed class could be scored.
pub const UNKNOWN_SPECIES: &str = "Unknown";

/// Episode timing defaults.
pub mod episode {
    /// Maximum recording length in seconds.
    pub const DEFAULT_MAX_RECORD_SECONDS: f64 = 60.0;
    /// Continuous inactivity that ends a recording, in seconds.
    pub const DEFAULT_MAX_INACTIVE_SECONDS: f64 = 10.0;
    /// Minimum track lifetime for acceptance, in seconds.
    pub const DEFAULT_MIN_TRACK_DURATION: f64 = 2.0;
    /// Minimum detector confidence passed to the detection strategy.
    pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.1;
}

/// Candidate filter defaults shared by all detection strategies.
pub mod filters {
    /// Minimum normalized distance between a box center and any frame edge.
    pub const DEFAULT_MIN_CENTER_DIST: f32 = 0.1;
    /// Minimum box side length in pixels.
    pub const DEFAULT_MIN_BOX_SIZE_PX: u32 = 50;
    /// Laplacian variance at or above which a crop counts as sharp.
    pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;
    /// Candidates examined for sharpness per frame.
    pub const DEFAULT_MAX_BLUR_CHECKS: usize = 3;
}

/// IoU tracker defaults.
pub mod tracker {
    /// Minimum IoU to associate a box with an existing track.
    pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;
    /// Frames a track survives without a matching box.
    pub const DEFAULT_MAX_MISSED_FRAMES: u32 = 30;
}

/// Best-frame scoring weights.
pub mod best_frame {
    /// Weight of the log sharpness term relative to the log pixel-count term.
    pub const SHARPNESS_WEIGHT: f64 = 1.5;
}

/// Light gate defaults.
pub mod light {
    /// Mean luma (0-255) required to run detection.
    pub const DEFAULT_MIN_BRIGHTNESS: f64 = 30.0;
    /// Pause applied when the scene is too dark, in milliseconds.
    pub const DEFAULT_LOW_LIGHT_SLEEP_MS: u64 = 1000;
}

/// Audio analysis defaults.
pub mod audio {
    /// Maximum gap in seconds between same-species detections that still merge.
    pub const MERGE_GAP_SECS: f64 = 1.0;
    /// Minimum BirdNET confidence for an audio detection.
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;
    /// Range filter threshold for the regional species list.
    pub const DEFAULT_RANGE_THRESHOLD: f32 = 0.03;
    /// Timeout for extracting audio from a recording, in seconds.
    pub const EXTRACT_TIMEOUT_SECS: u64 = 300;
    /// Number of top predictions requested per segment.
    pub const TOP_K: usize = 5;
    /// Default spectrogram horizontal resolution.
    pub const DEFAULT_SPECTROGRAM_PX_PER_SEC: u32 = 200;
    /// Spectrogram image height in pixels.
    pub const SPECTROGRAM_HEIGHT_PX: u32 = 256;
    /// FFT window length.
    pub const SPECTROGRAM_N_FFT: usize = 2048;
    /// Mel bands.
    pub const SPECTROGRAM_MELS: usize = 128;
    /// Lowest frequency shown, in Hz.
    pub const SPECTROGRAM_FMIN: f32 = 200.0;
    /// Highest frequency shown, in Hz.
    pub const SPECTROGRAM_FMAX: f32 = 12_000.0;
    /// Dynamic range below the loudest bin, in dB.
    pub const SPECTROGRAM_TOP_DB: f32 = 60.0;
    /// JPEG quality of the rendered image.
    pub const SPECTROGRAM_JPEG_QUALITY: u8 = 85;
}

/// Plausibility verification defaults.
pub mod verification {
    /// Gemini model used when none is configured.
    pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
    /// Detections at or above this confidence skip verification.
    pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;
    /// Verification calls allowed per rolling hour.
    pub const DEFAULT_MAX_CALLS_PER_HOUR: u32 = 20;
    /// Verification calls allowed per calendar day.
    pub const DEFAULT_MAX_CALLS_PER_DAY: u32 = 200;
    /// Length of the hourly budget window, in seconds.
    pub const HOUR_WINDOW_SECS: u64 = 3600;
    /// JPEG quality for crops sent to the verifier.
    pub const JPEG_QUALITY: u8 = 85;
    /// Maximum length of an error message kept as reasoning.
    pub const MAX_ERROR_REASONING_CHARS: usize = 100;
    /// Request timeout in seconds.
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
}

/// Backend client defaults.
pub mod backend {
    /// Request timeout in seconds.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    /// Attempts per request for transient failures.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    /// Base delay for exponential backoff, in milliseconds.
    pub const RETRY_BASE_DELAY_MS: u64 = 500;
    /// Heartbeat interval in seconds.
    pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 60;
    /// First heartbeat retry delay after a failure, in seconds.
    pub const HEARTBEAT_RETRY_SECS: u64 = 5;
}

/// Camera and hardware worker defaults.
pub mod camera {
    /// Capture device.
    pub const DEFAULT_DEVICE: &str = "/dev/video0";
    /// ALSA audio device used for recordings.
    pub const DEFAULT_AUDIO_DEVICE: &str = "default";
    /// Recording resolution.
    pub const DEFAULT_MAIN_SIZE: (u32, u32) = (1280, 720);
    /// Detection resolution.
    pub const DEFAULT_LORES_SIZE: (u32, u32) = (640, 480);
    /// Capture frame rate.
    pub const DEFAULT_FPS: u32 = 15;
    /// Preview server port.
    pub const DEFAULT_PREVIEW_PORT: u16 = 8082;
    /// Capacity of the worker command queue.
    pub const COMMAND_QUEUE_CAPACITY: usize = 16;
    /// How long a frame wait blocks before re-checking shutdown, in milliseconds.
    pub const FRAME_POLL_MS: u64 = 200;
    /// Grace period for the worker to acknowledge exit, in seconds.
    pub const EXIT_TIMEOUT_SECS: u64 = 10;
    /// JPEG quality for preview frames.
    pub const PREVIEW_JPEG_QUALITY: u8 = 60;
    /// Audio sample rate for recordings.
    pub const RECORDING_AUDIO_SAMPLE_RATE: u32 = 48_000;
    /// Consecutive capture failures that end an episode.
    pub const MAX_CAPTURE_FAILURES: u32 = 3;
}

/// Motion sensor defaults.
pub mod motion {
    /// GPIO pin of the PIR sensor.
    pub const DEFAULT_PIR_PIN: u32 = 4;
    /// GPIO polling interval, in milliseconds.
    pub const PIR_POLL_MS: u64 = 50;
    /// Wait used by the fake motion sensor, in seconds.
    pub const FAKE_WAIT_SECS: u64 = 10;
}

/// Confidence value bounds.
pub mod confidence {
    /// Minimum valid confidence value.
    pub const MIN: f32 = 0.0;
    /// Maximum valid confidence value.
    pub const MAX: f32 = 1.0;
}

/// Episode output layout.
pub mod output {
    /// Default recordings root.
    pub const DEFAULT_RECORDINGS_DIR: &str = "data/recordings";
    /// Video file name inside an episode directory.
    pub const VIDEO_FILE: &str = "video.mp4";
    /// Detection summary file name inside an episode directory.
    pub const DETECTIONS_FILE: &str = "detections.json";
    /// JPEG quality for saved best frames.
    pub const BEST_FRAME_JPEG_QUALITY: u8 = 90;
    /// Default verification log directory.
    pub const DEFAULT_VERIFICATION_LOG_DIR: &str = "data/llm_verification_logs";
}
