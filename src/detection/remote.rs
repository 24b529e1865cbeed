//! HTTP inference-service backends.
//!
//! Both clients upload the image as a multipart JPEG part named `image` and
//! read a JSON body back. Detector responses carry normalized boxes:
//!
//! ```json
//! {"detections": [{"bbox": [0.1, 0.2, 0.4, 0.6], "confidence": 0.91, "label": "bird"}]}
//! ```
//!
//! Classifier responses carry ranked labels:
//!
//! ```json
//! {"predictions": [{"label": "Blue_Jay", "score": 0.83}]}
//! ```

use std::time::Duration;

use image::RgbImage;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tokio::runtime::Handle;

use super::{ObjectDetector, RawBox, SpeciesClassifier};
use crate::error::{Error, Result};
use crate::vision::{BBox, Frame, encode_jpeg};

const UPLOAD_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    detections: Vec<WireBox>,
}

#[derive(Debug, Deserialize)]
struct WireBox {
    bbox: [f32; 4],
    confidence: f32,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    predictions: Vec<WireScore>,
}

#[derive(Debug, Deserialize)]
struct WireScore {
    label: String,
    score: f32,
}

/// Shared HTTP plumbing for the inference clients.
struct InferenceEndpoint {
    backend: &'static str,
    client: reqwest::Client,
    url: String,
    runtime: Handle,
}

impl InferenceEndpoint {
    fn new(backend: &'static str, url: String, timeout: Duration, runtime: Handle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Detector {
                backend,
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            backend,
            client,
            url,
            runtime,
        })
    }

    fn post<T: serde::de::DeserializeOwned>(
        &self,
        image: &RgbImage,
        fields: &[(&'static str, String)],
    ) -> Result<T> {
        let jpeg = encode_jpeg(image, UPLOAD_JPEG_QUALITY)?;
        let backend = self.backend;
        let fail = |reason: String| Error::Detector { backend, reason };

        let part = Part::bytes(jpeg)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| fail(e.to_string()))?;
        let mut form = Form::new().part("image", part);
        for (name, value) in fields {
            form = form.text(*name, value.clone());
        }

        self.runtime.block_on(async {
            let response = self
                .client
                .post(&self.url)
                .multipart(form)
                .send()
                .await
                .map_err(|e| fail(e.to_string()))?;
            let status = response.status();
            if !status.is_success() {
                return Err(fail(format!("HTTP {status}")));
            }
            response.json::<T>().await.map_err(|e| fail(e.to_string()))
        })
    }
}

/// Object detector served over HTTP.
pub struct RemoteDetector {
    endpoint: InferenceEndpoint,
}

impl RemoteDetector {
    /// Create a detector client for `url`.
    pub fn new(url: String, timeout: Duration, runtime: Handle) -> Result<Self> {
        Ok(Self {
            endpoint: InferenceEndpoint::new("remote_detector", url, timeout, runtime)?,
        })
    }
}

impl ObjectDetector for RemoteDetector {
    fn name(&self) -> &'static str {
        self.endpoint.backend
    }

    fn detect(&mut self, frame: &Frame, min_confidence: f32) -> Result<Vec<RawBox>> {
        let response: DetectResponse = self.endpoint.post(
            frame.image(),
            &[("min_confidence", min_confidence.to_string())],
        )?;
        Ok(response
            .detections
            .into_iter()
            .map(|d| RawBox {
                bbox: BBox(d.bbox),
                confidence: d.confidence,
                label: d.label,
            })
            .filter(|b| b.bbox.is_finite() && b.confidence >= min_confidence)
            .collect())
    }
}

/// Species classifier served over HTTP.
pub struct RemoteClassifier {
    endpoint: InferenceEndpoint,
}

impl RemoteClassifier {
    /// Create a classifier client for `url`.
    pub fn new(url: String, timeout: Duration, runtime: Handle) -> Result<Self> {
        Ok(Self {
            endpoint: InferenceEndpoint::new("remote_classifier", url, timeout, runtime)?,
        })
    }
}

impl SpeciesClassifier for RemoteClassifier {
    fn classify(&mut self, crop: &RgbImage) -> Result<Vec<(String, f32)>> {
        let response: ClassifyResponse = self.endpoint.post(crop, &[])?;
        let mut scores: Vec<(String, f32)> = response
            .predictions
            .into_iter()
            .map(|p| (p.label, p.score))
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        Ok(scores)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_response_parses() {
        let body = r#"{"detections":[{"bbox":[0.1,0.2,0.3,0.4],"confidence":0.8}]}"#;
        let parsed: DetectResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.detections.len(), 1);
        assert!(parsed.detections[0].label.is_none());
    }

    #[test]
    fn test_classify_response_defaults_empty() {
        let parsed: ClassifyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.predictions.is_empty());
    }
}
