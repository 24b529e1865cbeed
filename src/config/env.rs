//! Environment variable overrides.

use crate::config::Config;
use tracing::warn;

/// Backend base URL.
pub const ENV_API_URL_BASE: &str = "API_URL_BASE";
/// Audio processing toggle.
pub const ENV_ENABLE_AUDIO_PROCESSING: &str = "ENABLE_AUDIO_PROCESSING";
/// Gemini API key.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` to read variables.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL_BASE).filter(|v| !v.trim().is_empty()) {
        config.backend.api_url_base = Some(url.trim().to_string());
    }

    if let Some(raw) = lookup(ENV_ENABLE_AUDIO_PROCESSING) {
        match parse_bool(&raw) {
            Some(enabled) => config.processor.enable_audio_processing = enabled,
            None => warn!(
                "Ignoring {ENV_ENABLE_AUDIO_PROCESSING}={raw:?}: expected true/false, 1/0 or yes/no"
            ),
        }
    }

    if let Some(key) = lookup(ENV_GEMINI_API_KEY).filter(|v| !v.is_empty()) {
        config.ai.gemini_api_key = Some(key);
    }
}

/// Parse a boolean flag value.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
