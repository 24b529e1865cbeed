//! Assembly of pipeline components from configuration.

use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::audio::{AudioAnalyzer, BirdNetAnalyzer, regional_species};
use crate::clock::SharedClock;
use crate::config::{Config, FiltersConfig, ProcessorConfig, StrategyKind};
use crate::constants::audio::EXTRACT_TIMEOUT_SECS;
use crate::constants::verification::REQUEST_TIMEOUT_SECS;
use crate::constants::VERIFICATION_EXEMPT_SPECIES;
use crate::detection::{
    CandidateFilter, DetectionStrategy, IouTracker, PresenceTracker, RegionalFilter,
    RemoteClassifier, RemoteDetector, SingleStageStrategy, TrackingDetector, TwoStageStrategy,
};
use crate::error::{Error, Result};
use crate::inference::{BirdNetClassifier, RangeFilter};
use crate::verify::{GateSettings, GeminiClient, PlausibilityGate};

impl From<&FiltersConfig> for CandidateFilter {
    fn from(filters: &FiltersConfig) -> Self {
        Self {
            min_center_dist: filters.min_center_dist,
            min_box_size_px: filters.min_box_size_px,
            blur_threshold: filters.blur_threshold,
            max_blur_checks: filters.max_blur_checks,
        }
    }
}

fn required_url(url: Option<&String>, key: &str) -> Result<String> {
    url.filter(|u| !u.trim().is_empty())
        .cloned()
        .ok_or_else(|| Error::ConfigValidation {
            message: format!("processor.models.{key} is required for the selected strategy"),
        })
}

/// Build the configured detection strategy.
pub fn build_strategy(
    processor: &ProcessorConfig,
    regional: RegionalFilter,
    runtime: &Handle,
) -> Result<Box<dyn DetectionStrategy>> {
    let models = &processor.models;
    let timeout = Duration::from_secs(models.timeout_secs);
    let detector_url = required_url(models.detector_url.as_ref(), "detector_url")?;

    let detector = RemoteDetector::new(detector_url, timeout, runtime.clone())?;
    let tracker = IouTracker::new(
        processor.tracker.iou_threshold,
        processor.tracker.max_missed_frames,
    );
    let presence: Box<dyn PresenceTracker> =
        Box::new(TrackingDetector::new(Box::new(detector), tracker));
    let filter = CandidateFilter::from(&processor.filters);

    let strategy: Box<dyn DetectionStrategy> = match processor.strategy {
        StrategyKind::SingleStage => Box::new(SingleStageStrategy::new(presence, filter, regional)),
        StrategyKind::TwoStage => {
            let url = required_url(models.classifier_url.as_ref(), "classifier_url")?;
            let classifier = RemoteClassifier::new(url, timeout, runtime.clone())?;
            Box::new(TwoStageStrategy::new(presence, Box::new(classifier), filter, regional))
        }
        StrategyKind::Global => {
            let url = required_url(models.global_classifier_url.as_ref(), "global_classifier_url")?;
            let classifier = RemoteClassifier::new(url, timeout, runtime.clone())?;
            Box::new(
                TwoStageStrategy::new(presence, Box::new(classifier), filter, regional)
                    .with_name("global"),
            )
        }
    };
    Ok(strategy)
}

/// Species expected at the configured location today.
///
/// Empty when location or the BirdNET meta model is not configured, which
/// leaves classification unfiltered. A non-empty list always admits
/// squirrels.
pub fn load_regional_species(config: &Config, clock: &SharedClock) -> Result<Vec<String>> {
    let (Some((lat, lon)), Some(meta), Some(labels)) = (
        config.location.coordinates(),
        config.audio.meta_model.as_ref(),
        config.audio.labels.as_ref(),
    ) else {
        info!("No location or meta model configured, species filter disabled");
        return Ok(Vec::new());
    };

    let labels = read_labels(labels)?;
    let filter = RangeFilter::load(meta, &labels, config.audio.range_threshold)?;
    let mut species = regional_species(
        &filter,
        lat,
        lon,
        clock.local().date_naive(),
        config.audio.range_threshold,
    )?;
    if !species.is_empty() && !species.iter().any(|s| s == VERIFICATION_EXEMPT_SPECIES) {
        species.push(VERIFICATION_EXEMPT_SPECIES.to_string());
    }
    Ok(species)
}

fn read_labels(path: &std::path::Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(Error::LabelsFileNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// BirdNET audio analyzer, when enabled and configured.
pub fn build_audio_analyzer(
    config: &Config,
    clock: &SharedClock,
) -> Result<Option<Box<dyn AudioAnalyzer>>> {
    if !config.processor.enable_audio_processing {
        info!("Audio processing disabled");
        return Ok(None);
    }
    let (Some(model), Some(labels)) = (config.audio.model.as_ref(), config.audio.labels.as_ref())
    else {
        warn!("Audio processing enabled but audio.model/audio.labels not set, skipping audio");
        return Ok(None);
    };

    let classifier = BirdNetClassifier::load(model, labels, config.audio.min_confidence)?;
    let location_filter = match (config.location.coordinates(), config.audio.meta_model.as_ref()) {
        (Some(coords), Some(meta)) => Some((
            RangeFilter::load(meta, classifier.labels(), config.audio.range_threshold)?,
            coords,
        )),
        _ => None,
    };

    let mut analyzer = BirdNetAnalyzer::new(
        classifier,
        Duration::from_secs(EXTRACT_TIMEOUT_SECS),
        clock.clone(),
    )
    .with_spectrogram_resolution(config.processor.spectrogram_px_per_sec);
    if let Some((filter, (lat, lon))) = location_filter {
        analyzer = analyzer.with_location(filter, lat, lon);
    }
    Ok(Some(Box::new(analyzer)))
}

/// Plausibility gate, when verification is enabled.
pub fn build_gate(
    config: &Config,
    runtime: &Handle,
    clock: &SharedClock,
) -> Result<Option<PlausibilityGate>> {
    let llm = &config.ai.llm_verification;
    if !llm.enabled {
        return Ok(None);
    }
    let Some(api_key) = config.ai.gemini_api_key.clone() else {
        return Err(Error::ConfigValidation {
            message: "llm_verification is enabled but no Gemini API key is set".to_string(),
        });
    };

    let client = GeminiClient::new(
        api_key,
        llm.model.clone(),
        Duration::from_secs(REQUEST_TIMEOUT_SECS),
        runtime.clone(),
    )?;
    let settings = GateSettings {
        min_confidence: llm.min_confidence,
        max_calls_per_hour: llm.max_calls_per_hour,
        max_calls_per_day: llm.max_calls_per_day,
        latitude: config.location.latitude,
        longitude: config.location.longitude,
        log_dir: llm.log_dir.clone(),
    };
    PlausibilityGate::new(Box::new(client), settings, clock.clone()).map(Some)
}

/// Log the effective configuration at startup.
pub fn log_banner(
    config: &Config,
    strategy: &str,
    regional_species: usize,
    audio_enabled: bool,
    gate_enabled: bool,
) {
    let processor = &config.processor;
    info!("========================================");
    info!("Processor configuration");
    info!("  strategy:             {strategy}");
    info!("  max_record_seconds:   {}", processor.max_record_seconds);
    info!("  max_inactive_seconds: {}", processor.max_inactive_seconds);
    info!("  min_track_duration:   {}", processor.min_track_duration);
    info!("  blur_threshold:       {}", processor.filters.blur_threshold);
    info!("  min_box_size_px:      {}", processor.filters.min_box_size_px);
    info!("  regional species:     {regional_species}");
    info!("  audio analysis:       {}", on_off(audio_enabled));
    info!("  llm verification:     {}", on_off(gate_enabled));
    info!("========================================");
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}
