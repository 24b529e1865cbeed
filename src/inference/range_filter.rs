//! Location-based species filtering with the BirdNET meta model.

use std::path::Path;

use birdnet_onnx::{LocationScore, Prediction, RangeFilter as BirdnetRangeFilter};

use crate::error::{Error, Result};

/// Wrapper around the birdnet-onnx range filter.
pub struct RangeFilter {
    inner: BirdnetRangeFilter,
}

impl RangeFilter {
    /// Build a range filter for the classifier's labels.
    pub fn load(meta_model_path: &Path, classifier_labels: &[String], threshold: f32) -> Result<Self> {
        let inner = BirdnetRangeFilter::builder()
            .model_path(meta_model_path.to_string_lossy().to_string())
            .from_classifier_labels(classifier_labels)
            .threshold(threshold)
            .build()
            .map_err(|e| Error::RangeFilterBuild {
                reason: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    /// Species scores for a location and date.
    pub fn predict(
        &self,
        latitude: f64,
        longitude: f64,
        month: u32,
        day: u32,
    ) -> Result<Vec<LocationScore>> {
        #[allow(clippy::cast_possible_truncation)]
        self.inner
            .predict(latitude as f32, longitude as f32, month, day)
            .map_err(|e| Error::RangeFilterPredict {
                reason: e.to_string(),
            })
    }

    /// Drop predictions for species not expected at the location.
    pub fn filter_predictions(
        &self,
        predictions: &[Prediction],
        location_scores: &[LocationScore],
    ) -> Vec<Prediction> {
        self.inner
            .filter_predictions(predictions, location_scores, false)
    }
}
