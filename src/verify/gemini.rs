//! Gemini `generateContent` client used as the plausibility judge.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::json;
use tokio::runtime::Handle;
use tracing::debug;

use super::{PlausibilityCheck, VerificationOutcome};
use crate::error::{Error, Result};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Gemini REST client with a structured JSON response schema.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    runtime: Handle,
}

impl GeminiClient {
    /// Create a client for `model`.
    pub fn new(api_key: String, model: String, timeout: Duration, runtime: Handle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Verification {
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            api_key,
            model,
            runtime,
        })
    }

    fn request_body(jpeg: &[u8], prompt: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"inline_data": {"mime_type": "image/jpeg", "data": STANDARD.encode(jpeg)}},
                    {"text": prompt}
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "is_plausible": {
                            "type": "BOOLEAN",
                            "description": "Is this a plausible bird detection?"
                        },
                        "reasoning": {
                            "type": "STRING",
                            "description": "One sentence brief explanation"
                        }
                    },
                    "required": ["is_plausible", "reasoning"]
                }
            }
        })
    }
}

/// Extract the structured verdict from a `generateContent` response.
fn parse_verdict(response: &GenerateResponse) -> Result<VerificationOutcome> {
    let text = response
        .candidates
        .iter()
        .filter_map(|c| c.content.as_ref())
        .flat_map(|c| c.parts.iter())
        .find_map(|p| p.text.as_deref())
        .ok_or_else(|| Error::Verification {
            reason: "response has no text part".to_string(),
        })?;
    serde_json::from_str(text).map_err(|e| Error::Verification {
        reason: e.to_string(),
    })
}

impl PlausibilityCheck for GeminiClient {
    fn check(&self, jpeg: &[u8], prompt: &str) -> Result<VerificationOutcome> {
        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let body = Self::request_body(jpeg, prompt);
        debug!("Requesting verification from {}", self.model);

        let response: GenerateResponse = self.runtime.block_on(async {
            let response = self
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|source| Error::ApiRequest {
                    url: url.clone(),
                    source,
                })?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::ApiStatus {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }
            response.json().await.map_err(|source| Error::ApiRequest {
                url: url.clone(),
                source,
            })
        })?;

        parse_verdict(&response)
    }
}
