//! Baseline score models.
//!
//! Real sequence models live outside this workspace and plug in through
//! `ScoreModel`; these two keep the pipeline usable without one.

use async_trait::async_trait;
use ndarray::{s, Array1, Array2};
use panel_core::{PipelineError, ScoreModel, WindowedFeatureTensor};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::Path;

use crate::error::{PredictError, PredictResult};

/// Scores each ticker by its mean daily change over the window
#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumModel;

impl MomentumModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ScoreModel for MomentumModel {
    fn name(&self) -> &str {
        "momentum"
    }

    async fn score(&self, features: &WindowedFeatureTensor) -> Result<Array2<f64>, PipelineError> {
        let values = features.values();
        Ok(Array2::from_shape_fn(
            (features.len(), features.ticker_count()),
            |(i, k)| values.slice(s![i, .., k]).iter().mean(),
        ))
    }
}

/// `score = bias + sum_t weights[t] * change[t]`, applied per ticker column.
///
/// Weights are ordered oldest day first and must match the window length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearWindowModel {
    pub weights: Vec<f64>,
    #[serde(default)]
    pub bias: f64,
}

impl LinearWindowModel {
    pub fn new(weights: Vec<f64>, bias: f64) -> PredictResult<Self> {
        if weights.is_empty() {
            return Err(PredictError::Config("linear model needs at least one weight".into()));
        }
        Ok(Self { weights, bias })
    }

    /// Load weights from a JSON file: `{"weights": [...], "bias": 0.0}`
    pub fn load(path: &Path) -> PredictResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let model: LinearWindowModel = serde_json::from_str(&raw)?;
        tracing::info!(
            "Loaded linear window model from {} ({} weights)",
            path.display(),
            model.weights.len()
        );
        Self::new(model.weights, model.bias)
    }
}

#[async_trait]
impl ScoreModel for LinearWindowModel {
    fn name(&self) -> &str {
        "linear-window"
    }

    async fn score(&self, features: &WindowedFeatureTensor) -> Result<Array2<f64>, PipelineError> {
        if features.window_length() != self.weights.len() {
            return Err(PipelineError::shape(
                "linear model weights",
                self.weights.len(),
                features.window_length(),
            ));
        }

        let weights = Array1::from(self.weights.clone());
        let mut scores = Array2::zeros((features.len(), features.ticker_count()));
        for (mut row, window) in scores.outer_iter_mut().zip(features.iter()) {
            row.assign(&(weights.dot(&window) + self.bias));
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;
    use tempfile::TempDir;

    fn tensor() -> WindowedFeatureTensor {
        // 2 windows x 3 days x 2 tickers
        let values = Array3::from_shape_vec(
            (2, 3, 2),
            vec![
                0.01, -0.02, 0.03, -0.01, 0.02, 0.0, //
                0.03, -0.01, 0.02, 0.0, -0.01, 0.05,
            ],
        )
        .unwrap();
        WindowedFeatureTensor::new(values, vec![1, 2]).unwrap()
    }

    #[tokio::test]
    async fn test_momentum_scores_mean_change() {
        let scores = MomentumModel::new().score(&tensor()).await.unwrap();
        assert_eq!(scores.dim(), (2, 2));
        assert_relative_eq!(scores[[0, 0]], 0.02, epsilon = 1e-12);
        assert_relative_eq!(scores[[0, 1]], -0.01, epsilon = 1e-12);
        assert_relative_eq!(scores[[1, 1]], 0.04 / 3.0, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_linear_last_day_weight() {
        let model = LinearWindowModel::new(vec![0.0, 0.0, 1.0], 0.5).unwrap();
        let scores = model.score(&tensor()).await.unwrap();
        assert_relative_eq!(scores[[0, 0]], 0.52, epsilon = 1e-12);
        assert_relative_eq!(scores[[1, 1]], 0.55, epsilon = 1e-12);
    }

    #[tokio::test]
    async fn test_linear_rejects_wrong_window() {
        let model = LinearWindowModel::new(vec![1.0; 5], 0.0).unwrap();
        let err = model.score(&tensor()).await.unwrap_err();
        assert_eq!(err, PipelineError::shape("linear model weights", 5, 3));
    }

    #[test]
    fn test_linear_load_from_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("linear.json");
        std::fs::write(&path, r#"{"weights": [0.25, 0.75]}"#).unwrap();

        let model = LinearWindowModel::load(&path).unwrap();
        assert_eq!(model.weights, vec![0.25, 0.75]);
        assert_eq!(model.bias, 0.0);

        std::fs::write(&path, r#"{"weights": []}"#).unwrap();
        assert!(LinearWindowModel::load(&path).is_err());
        assert!(LinearWindowModel::load(&tmp.path().join("missing.json")).is_err());
    }
}
