//! Configuration validation.

use std::time::Duration;

use crate::config::Config;
use crate::constants::confidence;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_processor(config)?;
    validate_camera(config)?;
    validate_location(config)?;
    validate_verification(config)?;
    Ok(())
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}

fn check_confidence(name: &str, value: f64) -> Result<()> {
    if (f64::from(confidence::MIN)..=f64::from(confidence::MAX)).contains(&value) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{name} must be between {} and {}, got {value}",
            confidence::MIN,
            confidence::MAX
        )))
    }
}

/// A positive number of seconds that fits in a `Duration`.
fn check_seconds(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || value <= 0.0 {
        return Err(invalid(format!("{name} must be positive, got {value}")));
    }
    Duration::try_from_secs_f64(value)
        .map(drop)
        .map_err(|e| invalid(format!("{name} is out of range ({value}): {e}")))
}

/// Validate episode timing and filters.
fn validate_processor(config: &Config) -> Result<()> {
    let processor = &config.processor;

    check_seconds("max_record_seconds", processor.max_record_seconds)?;
    check_seconds("max_inactive_seconds", processor.max_inactive_seconds)?;

    if processor.min_track_duration.is_nan() || processor.min_track_duration < 0.0 {
        return Err(invalid(format!(
            "min_track_duration must be non-negative, got {}",
            processor.min_track_duration
        )));
    }

    check_confidence(
        "min_detection_confidence",
        f64::from(processor.min_detection_confidence),
    )?;

    let filters = &processor.filters;
    if !(0.0..0.5).contains(&filters.min_center_dist) {
        return Err(invalid(format!(
            "min_center_dist must be in [0, 0.5), got {}",
            filters.min_center_dist
        )));
    }

    if processor.spectrogram_px_per_sec == 0 {
        return Err(invalid("spectrogram_px_per_sec must be at least 1".to_string()));
    }

    if filters.max_blur_checks == 0 {
        return Err(invalid("max_blur_checks must be at least 1".to_string()));
    }

    if filters.blur_threshold.is_nan() || filters.blur_threshold < 0.0 {
        return Err(invalid(format!(
            "blur_threshold must be non-negative, got {}",
            filters.blur_threshold
        )));
    }

    if !(0.0..=1.0).contains(&processor.tracker.iou_threshold) {
        return Err(invalid(format!(
            "iou_threshold must be between 0 and 1, got {}",
            processor.tracker.iou_threshold
        )));
    }

    Ok(())
}

fn validate_camera(config: &Config) -> Result<()> {
    let camera = &config.camera;
    let sizes = [("main_size", camera.main_size), ("lores_size", camera.lores_size)];
    for (name, (width, height)) in sizes {
        if width == 0 || height == 0 {
            return Err(invalid(format!("camera.{name} must be non-zero, got {width}x{height}")));
        }
    }
    if camera.fps == 0 {
        return Err(invalid("camera.fps must be at least 1".to_string()));
    }
    Ok(())
}

/// Validate location coordinates.
fn validate_location(config: &Config) -> Result<()> {
    if let Some(lat) = config.location.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        return Err(invalid(format!("latitude must be between -90 and 90, got {lat}")));
    }

    if let Some(lon) = config.location.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        return Err(invalid(format!("longitude must be between -180 and 180, got {lon}")));
    }

    check_confidence("audio.min_confidence", f64::from(config.audio.min_confidence))?;
    check_confidence("audio.range_threshold", f64::from(config.audio.range_threshold))?;
    Ok(())
}

fn validate_verification(config: &Config) -> Result<()> {
    let llm = &config.ai.llm_verification;
    check_confidence("llm_verification.min_confidence", llm.min_confidence)?;
    if llm.enabled && config.ai.gemini_api_key.is_none() {
        return Err(invalid(
            "llm_verification is enabled but no Gemini API key is set (GEMINI_API_KEY)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_non_positive_durations() {
        let mut config = Config::default();
        config.processor.max_record_seconds = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.processor.max_inactive_seconds = -1.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.processor.max_record_seconds = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_durations_beyond_range() {
        let mut config = Config::default();
        config.processor.max_record_seconds = 1e20;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("max_record_seconds"));

        let mut config = Config::default();
        config.processor.max_inactive_seconds = f64::INFINITY;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_spectrogram_resolution() {
        let mut config = Config::default();
        config.processor.spectrogram_px_per_sec = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_track_duration_allowed() {
        let mut config = Config::default();
        config.processor.min_track_duration = 0.0;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_invalid_confidence() {
        let mut config = Config::default();
        config.processor.min_detection_confidence = 1.5;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.ai.llm_verification.min_confidence = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_filters() {
        let mut config = Config::default();
        config.processor.filters.min_center_dist = 0.5;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.processor.filters.max_blur_checks = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_invalid_latitude() {
        let mut config = Config::default();
        config.location.latitude = Some(100.0);
        let result = validate_config(&config);
        assert!(matches!(result, Err(Error::ConfigValidation { .. })));
    }

    #[test]
    fn test_validate_invalid_longitude() {
        let mut config = Config::default();
        config.location.longitude = Some(200.0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_verification_requires_key() {
        let mut config = Config::default();
        config.ai.llm_verification.enabled = true;
        assert!(validate_config(&config).is_err());

        config.ai.gemini_api_key = Some("key".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
