//! Plausibility verification of low-confidence results.

mod gate;
mod gemini;
mod limiter;

pub use gate::{GateSettings, PlausibilityCheck, PlausibilityGate, VerificationOutcome, build_prompt};
pub use gemini::GeminiClient;
pub use limiter::RateLimiter;
