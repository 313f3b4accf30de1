//! Per-product classifier ensemble
//!
//! One-vs-rest training over the catalog: every product gets its own binary
//! classifier, or is skipped when the synthesized labels cannot support one.
//! A product without a classifier simply never surfaces in predictions; it
//! is not an error.

use crate::catalog::ProductCatalog;
use crate::config::TrainingConfig;
use crate::error::EngineError;
use crate::model::{BinaryClassifier, ClassifierTrainer};
use crate::targets::LabelSet;
use crate::types::{EvaluationReport, ProductOutcome, ProductReport};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Binary classifiers keyed by product id, kept in catalog order
pub struct ClassifierEnsemble {
    trained_ids: Vec<String>,
    handles: HashMap<String, Box<dyn BinaryClassifier>>,
}

impl ClassifierEnsemble {
    /// Trains one classifier per catalog product on the training split.
    ///
    /// Products with fewer than `min_positives` positive labels are skipped.
    /// The positive class weight compensates for imbalance the way boosted
    /// tree stacks do: negatives / (positives + 1).
    pub fn train(
        trainer: &dyn ClassifierTrainer,
        catalog: &ProductCatalog,
        matrix: ArrayView2<'_, f64>,
        labels: &[LabelSet],
        config: &TrainingConfig,
    ) -> (Self, Vec<ProductReport>) {
        let mut trained_ids = Vec::new();
        let mut handles: HashMap<String, Box<dyn BinaryClassifier>> = HashMap::new();
        let mut reports = Vec::with_capacity(catalog.len());

        for entry in catalog.iter() {
            let mut column = Array1::<f64>::zeros(labels.len());
            let mut positives = 0usize;
            for (i, set) in labels.iter().enumerate() {
                if set.contains(entry.id.as_str()) {
                    column[i] = 1.0;
                    positives += 1;
                }
            }

            if positives < config.min_positives {
                debug!(product_id = %entry.id, positives, "Skipping product with too few positives");
                reports.push(ProductReport {
                    product_id: entry.id.clone(),
                    outcome: ProductOutcome::Skipped { positives },
                });
                continue;
            }

            let negatives = labels.len() - positives;
            let positive_weight = negatives as f64 / (positives as f64 + 1.0);
            match trainer.fit(matrix, column.view(), positive_weight) {
                Ok(handle) => {
                    debug!(
                        product_id = %entry.id,
                        positives,
                        positive_weight,
                        "Trained product classifier"
                    );
                    trained_ids.push(entry.id.clone());
                    handles.insert(entry.id.clone(), handle);
                    reports.push(ProductReport {
                        product_id: entry.id.clone(),
                        outcome: ProductOutcome::Trained {
                            positives,
                            positive_weight,
                        },
                    });
                }
                Err(e) => {
                    warn!(product_id = %entry.id, error = %e, "Product training failed");
                    reports.push(ProductReport {
                        product_id: entry.id.clone(),
                        outcome: ProductOutcome::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }

        let trained = trained_ids.len();
        let failed = reports
            .iter()
            .filter(|r| matches!(r.outcome, ProductOutcome::Failed { .. }))
            .count();
        info!(
            trained,
            skipped = reports.len() - trained - failed,
            failed,
            "Ensemble training complete"
        );
        (
            Self {
                trained_ids,
                handles,
            },
            reports,
        )
    }

    /// Rebuilds an ensemble from already-trained handles, preserving order.
    pub(crate) fn from_handles(parts: Vec<(String, Box<dyn BinaryClassifier>)>) -> Self {
        let mut trained_ids = Vec::with_capacity(parts.len());
        let mut handles = HashMap::with_capacity(parts.len());
        for (id, handle) in parts {
            trained_ids.push(id.clone());
            handles.insert(id, handle);
        }
        Self {
            trained_ids,
            handles,
        }
    }

    /// Product ids with a usable classifier, in catalog order
    pub fn trained_ids(&self) -> &[String] {
        &self.trained_ids
    }

    pub fn len(&self) -> usize {
        self.trained_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trained_ids.is_empty()
    }

    pub fn handle(&self, product_id: &str) -> Option<&dyn BinaryClassifier> {
        self.handles.get(product_id).map(|h| h.as_ref())
    }

    /// Probability that the product is relevant for one standardized row.
    pub fn predict_probability(
        &self,
        product_id: &str,
        row: ArrayView1<'_, f64>,
    ) -> Result<f64, EngineError> {
        match self.handle(product_id) {
            Some(handle) => handle.predict_probability(row),
            None => Err(EngineError::PredictionError(format!(
                "no classifier trained for {product_id}"
            ))),
        }
    }

    /// Labels predicted at or above the threshold. Untrained products stay
    /// negative, and a failing classifier counts as negative too.
    pub fn predict_labels(&self, row: ArrayView1<'_, f64>, threshold: f64) -> LabelSet {
        let mut predicted = LabelSet::new();
        for id in &self.trained_ids {
            match self.predict_probability(id, row) {
                Ok(probability) if probability >= threshold => {
                    predicted.insert(id.clone());
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(product_id = %id, error = %e, "Prediction failed during evaluation")
                }
            }
        }
        predicted
    }

    /// Multi-label metrics over a held-out split.
    ///
    /// All catalog products count as label columns, so skipped products cost
    /// accuracy wherever the ground truth marks them relevant.
    pub fn evaluate(
        &self,
        catalog: &ProductCatalog,
        matrix: ArrayView2<'_, f64>,
        labels: &[LabelSet],
        threshold: f64,
    ) -> EvaluationReport {
        let users = labels.len();
        let products = catalog.len();
        let mut mismatches = 0usize;
        let mut jaccard_sum = 0.0;
        let mut covered_users = 0usize;

        for (i, truth) in labels.iter().enumerate() {
            let predicted = self.predict_labels(matrix.row(i), threshold);
            let mut truth_count = 0usize;
            let mut predicted_count = 0usize;
            let mut intersection = 0usize;
            for entry in catalog.iter() {
                let id = entry.id.as_str();
                let in_truth = truth.contains(id);
                let in_predicted = predicted.contains(id);
                if in_truth {
                    truth_count += 1;
                }
                if in_predicted {
                    predicted_count += 1;
                }
                if in_truth && in_predicted {
                    intersection += 1;
                }
                if in_truth != in_predicted {
                    mismatches += 1;
                }
            }
            let union = truth_count + predicted_count - intersection;
            jaccard_sum += if union == 0 {
                1.0
            } else {
                intersection as f64 / union as f64
            };
            if predicted_count > 0 {
                covered_users += 1;
            }
        }

        let cells = users * products;
        EvaluationReport {
            hamming_loss: if cells == 0 {
                0.0
            } else {
                mismatches as f64 / cells as f64
            },
            jaccard_score: if users == 0 {
                0.0
            } else {
                jaccard_sum / users as f64
            },
            coverage: if users == 0 {
                0.0
            } else {
                covered_users as f64 / users as f64
            },
            evaluated_users: users,
            evaluated_products: products,
        }
    }
}

/// Splits row indices into train and test sets with a seeded shuffle.
/// Fractional test sizes round up, so any positive fraction holds out at
/// least one row.
pub(crate) fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let test_len = ((n as f64) * test_fraction).ceil() as usize;
    let test_len = test_len.min(n);
    let train_len = n - test_len;
    let test = indices.split_off(train_len);
    (indices, test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductEntry;
    use crate::model::LogisticTrainer;
    use crate::types::ProductCategory;
    use ndarray::array;

    struct FixedProbability(f64);

    impl BinaryClassifier for FixedProbability {
        fn predict_probability(&self, _row: ArrayView1<'_, f64>) -> Result<f64, EngineError> {
            Ok(self.0)
        }

        fn to_blob(&self) -> Result<Vec<u8>, EngineError> {
            Ok(Vec::new())
        }
    }

    struct FailingTrainer;

    impl ClassifierTrainer for FailingTrainer {
        fn fit(
            &self,
            _matrix: ArrayView2<'_, f64>,
            _labels: ArrayView1<'_, f64>,
            _positive_weight: f64,
        ) -> Result<Box<dyn BinaryClassifier>, EngineError> {
            Err(EngineError::TrainingError("induced failure".to_string()))
        }

        fn from_blob(&self, _blob: &[u8]) -> Result<Box<dyn BinaryClassifier>, EngineError> {
            Err(EngineError::ArtifactError("induced failure".to_string()))
        }
    }

    fn make_catalog(ids: &[&str]) -> ProductCatalog {
        let entries = ids
            .iter()
            .map(|id| ProductEntry {
                id: id.to_string(),
                category: ProductCategory::Cards,
                priority: 5,
                min_age: 18,
            })
            .collect();
        ProductCatalog::from_entries(entries).unwrap()
    }

    fn label_set(ids: &[&str]) -> LabelSet {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_products_below_positive_floor_are_skipped() {
        let catalog = make_catalog(&["a", "b", "c"]);
        let matrix = array![[0.0], [1.0], [2.0], [3.0]];
        let labels = vec![
            label_set(&["a", "b"]),
            label_set(&["b"]),
            label_set(&["b"]),
            label_set(&[]),
        ];
        let trainer = LogisticTrainer::default();
        let (ensemble, reports) = ClassifierEnsemble::train(
            &trainer,
            &catalog,
            matrix.view(),
            &labels,
            &TrainingConfig::default(),
        );

        assert_eq!(ensemble.trained_ids(), &["b".to_string()]);
        assert_eq!(
            reports[0].outcome,
            ProductOutcome::Skipped { positives: 1 }
        );
        match &reports[1].outcome {
            ProductOutcome::Trained {
                positives,
                positive_weight,
            } => {
                assert_eq!(*positives, 3);
                // one negative over (three positives + 1)
                assert!((positive_weight - 0.25).abs() < 0.001);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(reports[2].outcome, ProductOutcome::Skipped { positives: 0 });
    }

    #[test]
    fn test_failed_training_is_reported_not_fatal() {
        let catalog = make_catalog(&["a", "b"]);
        let matrix = array![[0.0], [1.0], [2.0]];
        let labels = vec![label_set(&["a"]), label_set(&["a"]), label_set(&[])];
        let (ensemble, reports) = ClassifierEnsemble::train(
            &FailingTrainer,
            &catalog,
            matrix.view(),
            &labels,
            &TrainingConfig::default(),
        );

        assert!(ensemble.is_empty());
        assert!(matches!(
            reports[0].outcome,
            ProductOutcome::Failed { .. }
        ));
        assert_eq!(reports[1].outcome, ProductOutcome::Skipped { positives: 0 });
    }

    #[test]
    fn test_predict_labels_applies_threshold() {
        let ensemble = ClassifierEnsemble::from_handles(vec![
            ("a".to_string(), Box::new(FixedProbability(0.9)) as Box<dyn BinaryClassifier>),
            ("b".to_string(), Box::new(FixedProbability(0.3))),
            ("c".to_string(), Box::new(FixedProbability(0.5))),
        ]);
        let row = array![0.0];
        let predicted = ensemble.predict_labels(row.view(), 0.5);
        // The threshold is inclusive.
        assert_eq!(predicted, label_set(&["a", "c"]));
    }

    #[test]
    fn test_untrained_product_prediction_is_an_error() {
        let ensemble = ClassifierEnsemble::from_handles(Vec::new());
        let row = array![0.0];
        assert!(matches!(
            ensemble.predict_probability("ghost", row.view()),
            Err(EngineError::PredictionError(_))
        ));
    }

    #[test]
    fn test_evaluate_metrics_on_known_fixture() {
        let catalog = make_catalog(&["a", "b", "c"]);
        let ensemble = ClassifierEnsemble::from_handles(vec![
            ("a".to_string(), Box::new(FixedProbability(0.9)) as Box<dyn BinaryClassifier>),
            ("b".to_string(), Box::new(FixedProbability(0.2))),
        ]);
        let matrix = array![[0.0], [0.0]];
        let labels = vec![label_set(&["a", "c"]), label_set(&[])];
        let report = ensemble.evaluate(&catalog, matrix.view(), &labels, 0.5);

        // User 1 predicts {a}, truth {a, c}: one mismatch, jaccard 1/2.
        // User 2 predicts {a}, truth {}: one mismatch, jaccard 0.
        assert!((report.hamming_loss - 2.0 / 6.0).abs() < 0.001);
        assert!((report.jaccard_score - 0.25).abs() < 0.001);
        assert!((report.coverage - 1.0).abs() < 0.001);
        assert_eq!(report.evaluated_users, 2);
        assert_eq!(report.evaluated_products, 3);
    }

    #[test]
    fn test_empty_prediction_is_perfect_for_empty_truth() {
        let catalog = make_catalog(&["a"]);
        let ensemble = ClassifierEnsemble::from_handles(vec![(
            "a".to_string(),
            Box::new(FixedProbability(0.1)) as Box<dyn BinaryClassifier>,
        )]);
        let matrix = array![[0.0]];
        let labels = vec![label_set(&[])];
        let report = ensemble.evaluate(&catalog, matrix.view(), &labels, 0.5);
        assert!((report.jaccard_score - 1.0).abs() < 0.001);
        assert!((report.coverage - 0.0).abs() < 0.001);
        assert!((report.hamming_loss - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_split_is_deterministic_for_a_seed() {
        let (train_a, test_a) = split_indices(10, 0.2, 42);
        let (train_b, test_b) = split_indices(10, 0.2, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(train_a.len(), 8);
        assert_eq!(test_a.len(), 2);

        let mut all: Vec<usize> = train_a.iter().chain(test_a.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_zero_test_fraction_keeps_every_row() {
        let (train, test) = split_indices(5, 0.0, 42);
        assert_eq!(train.len(), 5);
        assert!(test.is_empty());
    }

    #[test]
    fn test_fractional_test_size_rounds_up() {
        // 7 rows at 0.2 is 1.4 held-out rows, which rounds up to 2.
        let (train, test) = split_indices(7, 0.2, 42);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 5);
    }
}
