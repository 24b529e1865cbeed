//! BirdNET audio classifier wrapper around birdnet-onnx.

use std::path::Path;

use birdnet_onnx::{Classifier, ClassifierBuilder, InferenceOptions, PredictionResult};
use tracing::info;

use crate::constants::audio::TOP_K;
use crate::error::{Error, Result};

/// Loaded BirdNET model with its labels.
pub struct BirdNetClassifier {
    inner: Classifier,
    options: InferenceOptions,
}

impl BirdNetClassifier {
    /// Load a model and its labels file.
    pub fn load(model_path: &Path, labels_path: &Path, min_confidence: f32) -> Result<Self> {
        if !labels_path.exists() {
            return Err(Error::LabelsFileNotFound {
                path: labels_path.to_path_buf(),
            });
        }

        let inner = ClassifierBuilder::new()
            .model_path(model_path.to_string_lossy().to_string())
            .labels_path(labels_path.to_string_lossy().to_string())
            .top_k(TOP_K)
            .min_confidence(min_confidence)
            .build()
            .map_err(|e| Error::ClassifierBuild {
                reason: e.to_string(),
            })?;

        info!(
            "Loaded audio model: {:?}, sample_rate: {}, segment_duration: {}s",
            inner.config().model_type,
            inner.config().sample_rate,
            inner.config().segment_duration
        );

        Ok(Self {
            inner,
            options: InferenceOptions::default(),
        })
    }

    /// Sample rate the model expects.
    pub fn sample_rate(&self) -> u32 {
        self.inner.config().sample_rate
    }

    /// Segment length in seconds.
    pub fn segment_duration(&self) -> f32 {
        self.inner.config().segment_duration
    }

    /// Model labels, `Scientific name_Common name`.
    pub fn labels(&self) -> &[String] {
        self.inner.labels()
    }

    /// Run inference on one segment.
    pub fn predict(&self, segment: &[f32]) -> Result<PredictionResult> {
        self.inner
            .predict(segment, &self.options)
            .map_err(|e| Error::Inference {
                reason: e.to_string(),
            })
    }
}
