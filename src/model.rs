//! Binary classifier capability
//!
//! The ensemble trains one binary model per product through the
//! `ClassifierTrainer` trait, keeping the learning algorithm swappable. The
//! built-in implementation is weighted logistic regression trained by
//! full-batch gradient descent, with the positive class upweighted to cope
//! with the heavy imbalance the synthesized labels produce.

use crate::config::LogisticConfig;
use crate::error::EngineError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// A trained binary model bound to one product
pub trait BinaryClassifier: Send + Sync {
    /// Probability of the positive class for one standardized feature row.
    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, EngineError>;

    /// Serializes the trained state into an opaque blob for the artifact set.
    fn to_blob(&self) -> Result<Vec<u8>, EngineError>;
}

/// Trains and revives the binary classifiers of the ensemble
pub trait ClassifierTrainer: Send + Sync {
    /// Fits a model on a standardized matrix with 0/1 labels.
    ///
    /// `positive_weight` scales the loss contribution of positive examples.
    fn fit(
        &self,
        matrix: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        positive_weight: f64,
    ) -> Result<Box<dyn BinaryClassifier>, EngineError>;

    /// Revives a model from a blob produced by `BinaryClassifier::to_blob`.
    fn from_blob(&self, blob: &[u8]) -> Result<Box<dyn BinaryClassifier>, EngineError>;
}

/// Logistic regression coefficients for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: Vec<f64>,
    bias: f64,
}

impl BinaryClassifier for LogisticModel {
    fn predict_probability(&self, row: ArrayView1<'_, f64>) -> Result<f64, EngineError> {
        if row.len() != self.weights.len() {
            return Err(EngineError::DimensionMismatch {
                expected: self.weights.len(),
                got: row.len(),
            });
        }
        let z: f64 = self
            .weights
            .iter()
            .zip(row.iter())
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias;
        Ok(sigmoid(z))
    }

    fn to_blob(&self) -> Result<Vec<u8>, EngineError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Weighted logistic regression trained by full-batch gradient descent
#[derive(Debug, Clone, Default)]
pub struct LogisticTrainer {
    config: LogisticConfig,
}

impl LogisticTrainer {
    pub fn new(config: LogisticConfig) -> Self {
        Self { config }
    }
}

impl ClassifierTrainer for LogisticTrainer {
    fn fit(
        &self,
        matrix: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        positive_weight: f64,
    ) -> Result<Box<dyn BinaryClassifier>, EngineError> {
        let samples = matrix.nrows();
        if samples == 0 {
            return Err(EngineError::TrainingError(
                "empty training matrix".to_string(),
            ));
        }
        if labels.len() != samples {
            return Err(EngineError::TrainingError(format!(
                "label count {} does not match sample count {}",
                labels.len(),
                samples
            )));
        }

        let targets = labels.to_owned();
        let sample_weights: Array1<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { positive_weight } else { 1.0 })
            .collect();
        let scale = 1.0 / samples as f64;

        let mut weights = Array1::<f64>::zeros(matrix.ncols());
        let mut bias = 0.0;
        for _ in 0..self.config.epochs {
            // err_i = weight_i * (sigmoid(z_i) - y_i)
            let mut err = (matrix.dot(&weights) + bias).mapv(sigmoid);
            err -= &targets;
            err *= &sample_weights;

            let mut gradient = matrix.t().dot(&err);
            gradient.mapv_inplace(|g| g * scale);
            gradient.scaled_add(self.config.l2, &weights);

            weights.scaled_add(-self.config.learning_rate, &gradient);
            bias -= self.config.learning_rate * err.sum() * scale;
        }

        Ok(Box::new(LogisticModel {
            weights: weights.to_vec(),
            bias,
        }))
    }

    fn from_blob(&self, blob: &[u8]) -> Result<Box<dyn BinaryClassifier>, EngineError> {
        let model: LogisticModel = serde_json::from_slice(blob)
            .map_err(|e| EngineError::ArtifactError(format!("unreadable classifier blob: {e}")))?;
        Ok(Box::new(model))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_separates_a_clean_split() {
        let x = array![[-2.0], [-1.0], [1.0], [2.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let trainer = LogisticTrainer::default();
        let model = trainer.fit(x.view(), y.view(), 1.0).unwrap();

        let high = model.predict_probability(array![2.0].view()).unwrap();
        let low = model.predict_probability(array![-2.0].view()).unwrap();
        assert!(high > 0.9, "positive side scored {high}");
        assert!(low < 0.1, "negative side scored {low}");
    }

    #[test]
    fn test_positive_weight_raises_minority_probability() {
        let x = array![[0.0], [0.0], [0.0], [1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0];
        let trainer = LogisticTrainer::default();

        let plain = trainer.fit(x.view(), y.view(), 1.0).unwrap();
        let weighted = trainer.fit(x.view(), y.view(), 5.0).unwrap();
        let plain_p = plain.predict_probability(array![1.0].view()).unwrap();
        let weighted_p = weighted.predict_probability(array![1.0].view()).unwrap();
        assert!(weighted_p > plain_p);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let y = array![0.0, 1.0];
        let trainer = LogisticTrainer::default();
        let model = trainer.fit(x.view(), y.view(), 1.0).unwrap();
        let err = model
            .predict_probability(array![1.0, 2.0, 3.0].view())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        ));
    }

    #[test]
    fn test_blob_round_trip_preserves_predictions() {
        let x = array![[-1.0, 0.5], [1.0, -0.5], [0.5, 1.0], [-0.5, -1.0]];
        let y = array![0.0, 1.0, 1.0, 0.0];
        let trainer = LogisticTrainer::default();
        let model = trainer.fit(x.view(), y.view(), 2.0).unwrap();

        let blob = model.to_blob().unwrap();
        let revived = trainer.from_blob(&blob).unwrap();
        let row = array![0.3, -0.7];
        let before = model.predict_probability(row.view()).unwrap();
        let after = revived.predict_probability(row.view()).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_from_blob_rejects_garbage() {
        let trainer = LogisticTrainer::default();
        assert!(matches!(
            trainer.from_blob(b"not a model"),
            Err(EngineError::ArtifactError(_))
        ));
    }

    #[test]
    fn test_fit_rejects_empty_matrix() {
        let x = ndarray::Array2::<f64>::zeros((0, 3));
        let y = ndarray::Array1::<f64>::zeros(0);
        let trainer = LogisticTrainer::default();
        assert!(matches!(
            trainer.fit(x.view(), y.view(), 1.0),
            Err(EngineError::TrainingError(_))
        ));
    }
}
