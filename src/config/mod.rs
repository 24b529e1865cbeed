//! Configuration loading and management.

mod env;
mod file;
mod paths;
mod types;
mod validate;

pub use env::{
    ENV_API_URL_BASE, ENV_ENABLE_AUDIO_PROCESSING, ENV_GEMINI_API_KEY, apply_env_overrides,
    apply_overrides_from, parse_bool,
};
pub use file::{load_config_file, load_default_config, save_config, save_default_config};
pub use paths::{config_dir, config_file_path, resolve_data_path, resolve_data_paths};
pub use types::{
    AiConfig, AudioConfig, BackendConfig, CameraConfig, Config, FiltersConfig, LlmVerificationConfig,
    LocationConfig, ModelsConfig, MotionConfig, ProcessorConfig, StrategyKind, TrackerConfig,
};
pub use validate::validate_config;
