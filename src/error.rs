//! Error types for feedercam.

/// Result type alias for feedercam operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for feedercam.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Failed to initialize ONNX runtime.
    #[error("failed to initialize ONNX runtime: {reason}")]
    RuntimeInitialization {
        /// Description of the initialization failure.
        reason: String,
    },

    /// Failed to build a classifier.
    #[error("failed to build classifier: {reason}")]
    ClassifierBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Labels file does not exist.
    #[error("labels file does not exist: {path}")]
    LabelsFileNotFound {
        /// Path to the missing labels file.
        path: std::path::PathBuf,
    },

    /// Audio inference failed.
    #[error("inference failed: {reason}")]
    Inference {
        /// Description of the inference failure.
        reason: String,
    },

    /// Object detector or species classifier failed on a frame.
    #[error("detector '{backend}' failed: {reason}")]
    Detector {
        /// Backend name.
        backend: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to build range filter.
    #[error("failed to build range filter: {reason}")]
    RangeFilterBuild {
        /// Description of the build failure.
        reason: String,
    },

    /// Failed to predict location scores.
    #[error("failed to predict location scores: {reason}")]
    RangeFilterPredict {
        /// Description of the prediction failure.
        reason: String,
    },

    /// Failed to encode an image.
    #[error("failed to encode image")]
    ImageEncode {
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Spectrogram rendering failed.
    #[error("failed to render spectrogram: {reason}")]
    Spectrogram {
        /// Why the spectrogram could not be drawn.
        reason: String,
    },

    /// Failed to write an image file.
    #[error("failed to write image '{path}'")]
    ImageWrite {
        /// Path to the image file.
        path: std::path::PathBuf,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Camera or encoder hardware failed.
    #[error("media device error: {reason}")]
    MediaDevice {
        /// Description of the device failure.
        reason: String,
    },

    /// Hardware worker channel was closed unexpectedly.
    #[error("media worker channel closed unexpectedly")]
    MediaChannelClosed,

    /// Failed to spawn an external program.
    #[error("failed to spawn '{program}'")]
    Spawn {
        /// Program name.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Audio extraction from a recording failed.
    #[error("failed to extract audio from '{path}': {reason}")]
    AudioExtract {
        /// Path to the recording.
        path: std::path::PathBuf,
        /// Description of the failure.
        reason: String,
    },

    /// Failed to decode WAV audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying decoder error.
        #[source]
        source: hound::Error,
    },

    /// Motion sensor could not be read.
    #[error("motion sensor error: {reason}")]
    MotionSensor {
        /// Description of the sensor failure.
        reason: String,
    },

    /// HTTP request failed at the transport level.
    #[error("request to '{url}' failed")]
    ApiRequest {
        /// Request URL.
        url: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request returned an error status.
    #[error("request to '{url}' returned HTTP {status}")]
    ApiStatus {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Backend base URL is not configured.
    #[error("backend URL is not configured (set API_URL_BASE or backend.api_url_base)")]
    ApiUrlMissing,

    /// Plausibility check returned an unusable response.
    #[error("verification response invalid: {reason}")]
    Verification {
        /// Description of the problem.
        reason: String,
    },

    /// Failed to write JSON output file.
    #[error("failed to write JSON output file '{path}'")]
    JsonWrite {
        /// Path to the JSON file.
        path: std::path::PathBuf,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    /// Whether the failure is transient and worth retrying.
    ///
    /// Only transport timeouts, connection failures and device glitches
    /// qualify; HTTP error statuses are final.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ApiRequest { source, .. } => source.is_timeout() || source.is_connect(),
            Self::MediaDevice { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_glitches_are_transient() {
        let err = Error::MediaDevice {
            reason: "frame timeout".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_configuration_errors_are_final() {
        let err = Error::ConfigValidation {
            message: "bad".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!Error::MediaChannelClosed.is_transient());
    }
}
