//! Confidence-gated, rate-limited plausibility verification.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::RateLimiter;
use crate::clock::SharedClock;
use crate::constants::VERIFICATION_EXEMPT_SPECIES;
use crate::constants::verification::{JPEG_QUALITY, MAX_ERROR_REASONING_CHARS};
use crate::decision::AcceptedResult;
use crate::error::{Error, Result};
use crate::vision::{encode_jpeg, save_jpeg};

/// Answer of one plausibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Whether the detection is plausible.
    pub is_plausible: bool,
    /// One-sentence explanation.
    pub reasoning: String,
}

impl VerificationOutcome {
    fn rejected(reasoning: &str) -> Self {
        Self {
            is_plausible: false,
            reasoning: reasoning.to_string(),
        }
    }
}

/// External judge asked whether an image plausibly shows the named species.
pub trait PlausibilityCheck: Send {
    /// Evaluate a JPEG crop against the prompt.
    fn check(&self, jpeg: &[u8], prompt: &str) -> Result<VerificationOutcome>;
}

/// Gate settings.
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// Detections at or above this confidence skip verification.
    pub min_confidence: f64,
    /// Verification calls per rolling hour.
    pub max_calls_per_hour: u32,
    /// Verification calls per day.
    pub max_calls_per_day: u32,
    /// Feeder latitude for the prompt.
    pub latitude: Option<f64>,
    /// Feeder longitude for the prompt.
    pub longitude: Option<f64>,
    /// Directory for verification logs; `None` disables logging.
    pub log_dir: Option<PathBuf>,
}

/// Build the verification prompt.
pub fn build_prompt(
    species: &str,
    observation_time: Option<DateTime<Local>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> String {
    let when = observation_time.map_or_else(
        || "Unknown".to_string(),
        |t| t.format("%Y-%m-%d %H:%M").to_string(),
    );
    let coord = |v: Option<f64>| v.map_or_else(|| "Unknown".to_string(), |v| v.to_string());
    format!(
        "You are verifying a bird detection from a feeder camera.\n\
         The ML model detected: \"{species}\"\n\
         Observation time: {when}\n\
         Location: {}, {}\n\n\
         Is this detection plausible? Check:\n\
         - Is there an actual bird clearly visible? The image must show a real bird with \
         identifiable features (shape, feathers, beak, etc.) - reject silhouettes, shadows, \
         blurs, leaves, or other objects\n\
         - Could it reasonably be a {species}?\n\
         - Is this species plausible for this location and time of year?\n\n\
         Be lenient on exact species ID - only reject if obviously wrong or if no actual bird is visible.",
        coord(latitude),
        coord(longitude),
    )
}

#[derive(Serialize)]
struct VerificationLog<'a> {
    species: &'a str,
    confidence: f64,
    llm_result: &'a VerificationOutcome,
}

/// Second opinion on low-confidence results, failing open on errors and exhausted budgets.
pub struct PlausibilityGate {
    checker: Box<dyn PlausibilityCheck>,
    limiter: RateLimiter,
    settings: GateSettings,
    clock: SharedClock,
}

impl PlausibilityGate {
    /// Create a gate. Rejects a confidence floor outside [0, 1].
    pub fn new(
        checker: Box<dyn PlausibilityCheck>,
        settings: GateSettings,
        clock: SharedClock,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&settings.min_confidence) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "verification min_confidence must be in [0, 1], got {}",
                    settings.min_confidence
                ),
            });
        }
        info!(
            "Plausibility gate initialized (min_conf: {}, limits: {}/hour, {}/day)",
            settings.min_confidence, settings.max_calls_per_hour, settings.max_calls_per_day
        );
        let limiter = RateLimiter::new(
            settings.max_calls_per_hour,
            settings.max_calls_per_day,
            clock.clone(),
        );
        Ok(Self {
            checker,
            limiter,
            settings,
            clock,
        })
    }

    /// Borrow the rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Whether a detection with this confidence should be verified now.
    pub fn should_verify(&mut self, confidence: f64) -> bool {
        if confidence >= self.settings.min_confidence {
            return false;
        }
        if self.limiter.is_limited() {
            warn!("Verification skipped: rate limit reached");
            return false;
        }
        true
    }

    /// Ask the checker about one crop. Consumes budget unless the input is unusable.
    pub fn verify(
        &mut self,
        crop: &RgbImage,
        species: &str,
        observation_time: Option<DateTime<Local>>,
    ) -> VerificationOutcome {
        if crop.width() == 0 || crop.height() == 0 {
            return VerificationOutcome::rejected("Empty image");
        }
        if species.trim().is_empty() {
            return VerificationOutcome::rejected("Invalid species name");
        }

        self.limiter.record_call();

        let prompt = build_prompt(
            species,
            observation_time,
            self.settings.latitude,
            self.settings.longitude,
        );
        let outcome = encode_jpeg(crop, JPEG_QUALITY)
            .and_then(|jpeg| self.checker.check(&jpeg, &prompt));

        match outcome {
            Ok(outcome) => {
                info!(
                    "Verification: plausible={} - {}",
                    outcome.is_plausible, outcome.reasoning
                );
                outcome
            }
            Err(e) => {
                warn!("Verification failed: {e}");
                let message: String = e.to_string().chars().take(MAX_ERROR_REASONING_CHARS).collect();
                VerificationOutcome {
                    is_plausible: true,
                    reasoning: format!("Error: {message}"),
                }
            }
        }
    }

    /// Keep plausible results; exempt species and unverifiable results pass through.
    pub fn validate_detections(
        &mut self,
        results: Vec<AcceptedResult>,
        observation_time: Option<DateTime<Local>>,
    ) -> Vec<AcceptedResult> {
        let mut validated = Vec::with_capacity(results.len());
        for result in results {
            if result.species_name == VERIFICATION_EXEMPT_SPECIES {
                validated.push(result);
                continue;
            }
            if !self.should_verify(result.confidence) {
                validated.push(result);
                continue;
            }
            let Some(crop) = result.best_frame.as_ref() else {
                validated.push(result);
                continue;
            };

            let outcome = self.verify(crop, &result.species_name, observation_time);
            if let Some(dir) = self.settings.log_dir.clone()
                && let Err(e) = self.save_log(&dir, &result, crop, &outcome)
            {
                warn!("Failed to save verification log: {e}");
            }

            if outcome.is_plausible {
                validated.push(result);
            } else {
                info!(
                    "Verification rejected: {} - {}",
                    result.species_name, outcome.reasoning
                );
            }
        }
        validated
    }

    fn save_log(
        &self,
        dir: &Path,
        result: &AcceptedResult,
        crop: &RgbImage,
        outcome: &VerificationOutcome,
    ) -> Result<()> {
        let now = self.clock.local();
        let folder = dir.join(now.format("%Y/%m/%d").to_string());
        std::fs::create_dir_all(&folder)?;
        let stem = format!("{}_track{}", now.format("%H%M%S"), result.track_id);

        save_jpeg(crop, &folder.join(format!("{stem}.jpg")), JPEG_QUALITY)?;

        let json_path = folder.join(format!("{stem}.json"));
        let log = VerificationLog {
            species: &result.species_name,
            confidence: result.confidence,
            llm_result: outcome,
        };
        let file = std::fs::File::create(&json_path)?;
        serde_json::to_writer_pretty(file, &log).map_err(|source| Error::JsonWrite {
            path: json_path,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_mentions_species_time_and_location() {
        let prompt = build_prompt("Blue Jay", None, Some(40.5), None);
        assert!(prompt.contains("\"Blue Jay\""));
        assert!(prompt.contains("Observation time: Unknown"));
        assert!(prompt.contains("Location: 40.5, Unknown"));
    }
}
