//! Pipeline orchestration
//!
//! This module provides the public API for Finrec. `Recommender` wires the
//! stages together: ingest a feature frame, synthesize ground-truth labels,
//! standardize, train the per-product ensemble, then serve boosted and
//! explained recommendations from the trained state.

use crate::archetype::UserTypeClassifier;
use crate::artifacts::TrainedArtifacts;
use crate::catalog::ProductCatalog;
use crate::config::{CoverageOptions, RecommendOptions, TrainingConfig};
use crate::ensemble::{split_indices, ClassifierEnsemble};
use crate::error::EngineError;
use crate::explain::ExplanationGenerator;
use crate::features::FeatureFrame;
use crate::model::{ClassifierTrainer, LogisticTrainer};
use crate::scaler::StandardScaler;
use crate::scoring::{rank_candidates, BoostTables, ScoringEngine};
use crate::targets::{LabelSet, TargetSynthesizer};
use crate::types::{
    CoverageReport, FeatureVector, ProductCategory, ProductOutcome, Recommendation,
    ScoredCandidate, TrainingReport,
};
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

/// Serving state produced by training or restored from artifacts.
struct TrainedState {
    feature_names: Vec<String>,
    scaler: StandardScaler,
    ensemble: ClassifierEnsemble,
}

/// Stateful trainer and server for product recommendations.
///
/// Use one instance per model generation: train it (or load saved
/// artifacts), then serve any number of recommendation requests from the
/// trained state.
pub struct Recommender {
    catalog: ProductCatalog,
    trainer: Box<dyn ClassifierTrainer>,
    scoring: ScoringEngine,
    config: TrainingConfig,
    state: Option<TrainedState>,
}

impl Default for Recommender {
    fn default() -> Self {
        Self::new()
    }
}

impl Recommender {
    /// Create a recommender over the built-in catalog with the default
    /// logistic trainer and boost tables
    pub fn new() -> Self {
        Self::with_catalog(ProductCatalog::default_catalog())
    }

    /// Create a recommender over a custom catalog
    pub fn with_catalog(catalog: ProductCatalog) -> Self {
        let config = TrainingConfig::default();
        Self {
            catalog,
            trainer: Box::new(LogisticTrainer::new(config.logistic.clone())),
            scoring: ScoringEngine::default(),
            config,
            state: None,
        }
    }

    /// Replace the training configuration.
    ///
    /// This also resets the trainer to the built-in logistic implementation
    /// with the new hyperparameters; apply `with_trainer` afterwards when
    /// combining both.
    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.trainer = Box::new(LogisticTrainer::new(config.logistic.clone()));
        self.config = config;
        self
    }

    /// Swap in a custom classifier trainer
    pub fn with_trainer(mut self, trainer: Box<dyn ClassifierTrainer>) -> Self {
        self.trainer = trainer;
        self
    }

    /// Replace the boost tables used for scoring
    pub fn with_boosts(mut self, boosts: BoostTables) -> Self {
        self.scoring = ScoringEngine::new(boosts);
        self
    }

    /// The catalog this recommender serves from
    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    /// The active training configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Whether a trained state is available for serving
    pub fn is_trained(&self) -> bool {
        self.state.is_some()
    }

    /// Train one classifier per catalog product from a feature frame.
    ///
    /// Pipeline stages:
    /// 1. TargetSynthesizer - derive ground-truth label sets from the rules
    /// 2. StandardScaler - fit on the full matrix, then split train/test
    /// 3. ClassifierEnsemble - train one weighted model per product
    /// 4. Evaluation - multi-label metrics on the held-out split
    pub fn train(&mut self, frame: &FeatureFrame) -> Result<TrainingReport, EngineError> {
        if frame.is_empty() {
            return Err(EngineError::EmptyFrame);
        }
        let feature_names = frame.feature_names().to_vec();
        info!(
            users = frame.len(),
            features = feature_names.len(),
            "Starting training run"
        );

        // Stage 1: synthesize ground-truth label sets
        let labels: Vec<LabelSet> = frame
            .rows()
            .iter()
            .map(TargetSynthesizer::synthesize)
            .collect();
        let label_total: usize = labels.iter().map(|set| set.len()).sum();
        let mut covered: HashSet<&str> = HashSet::new();
        for set in &labels {
            for id in set {
                if self.catalog.contains(id) {
                    covered.insert(id.as_str());
                }
            }
        }
        let label_coverage = covered.len();
        let mean_labels_per_user = label_total as f64 / frame.len() as f64;
        info!(
            label_coverage,
            catalog_size = self.catalog.len(),
            mean_labels_per_user,
            "Synthesized training labels"
        );

        // Stage 2: standardize the full matrix, then split rows
        let matrix = frame.to_matrix(&feature_names);
        let scaler = StandardScaler::fit(&matrix);
        let scaled = scaler.transform(&matrix)?;
        let (train_idx, test_idx) =
            split_indices(frame.len(), self.config.test_fraction, self.config.seed);
        let train_matrix = scaled.select(Axis(0), &train_idx);
        let train_labels: Vec<LabelSet> = train_idx.iter().map(|&i| labels[i].clone()).collect();

        // Stage 3: train the per-product ensemble
        let (ensemble, products) = ClassifierEnsemble::train(
            self.trainer.as_ref(),
            &self.catalog,
            train_matrix.view(),
            &train_labels,
            &self.config,
        );

        // Stage 4: held-out evaluation, skipped when the test split is empty
        let evaluation = if test_idx.is_empty() {
            None
        } else {
            let test_matrix = scaled.select(Axis(0), &test_idx);
            let test_labels: Vec<LabelSet> = test_idx.iter().map(|&i| labels[i].clone()).collect();
            Some(ensemble.evaluate(
                &self.catalog,
                test_matrix.view(),
                &test_labels,
                self.config.decision_threshold,
            ))
        };

        let trained = products.iter().filter(|r| r.outcome.is_trained()).count();
        let failed = products
            .iter()
            .filter(|r| matches!(r.outcome, ProductOutcome::Failed { .. }))
            .count();

        self.state = Some(TrainedState {
            feature_names: feature_names.clone(),
            scaler,
            ensemble,
        });

        Ok(TrainingReport {
            users: frame.len(),
            features: feature_names.len(),
            trained,
            skipped: products.len() - trained - failed,
            failed,
            label_coverage,
            mean_labels_per_user,
            products,
            evaluation,
        })
    }

    /// Score every trained catalog product for one user, optionally
    /// restricted to a category.
    ///
    /// Candidates come back in catalog order, unsorted and without score
    /// filtering. An untrained recommender scores nothing.
    pub fn score_candidates(
        &self,
        features: &FeatureVector,
        category: Option<ProductCategory>,
    ) -> Vec<ScoredCandidate> {
        let state = match &self.state {
            Some(state) => state,
            None => return Vec::new(),
        };
        let archetype = UserTypeClassifier::classify(features);
        let row = FeatureFrame::vector_to_row(features, &state.feature_names);
        let scaled = match state.scaler.transform_row(&row) {
            Ok(scaled) => scaled,
            Err(e) => {
                warn!(error = %e, "Failed to standardize user features");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        for id in state.ensemble.trained_ids() {
            let entry = match self.catalog.get(id) {
                Ok(entry) => entry,
                Err(_) => continue,
            };
            if category.map_or(false, |c| entry.category != c) {
                continue;
            }
            match state.ensemble.predict_probability(id, scaled.view()) {
                Ok(probability) => {
                    candidates.push(self.scoring.score(features, archetype, entry, probability));
                }
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Dropping product after prediction failure");
                }
            }
        }
        candidates
    }

    /// Rank, filter and format recommendations for one user.
    ///
    /// An untrained engine, an unknown category name, or a filter matching
    /// nothing all yield an empty list rather than an error.
    pub fn recommend(
        &self,
        features: &FeatureVector,
        options: &RecommendOptions,
    ) -> Vec<Recommendation> {
        let category = match options.category.as_deref() {
            Some(name) => match ProductCategory::parse(name) {
                Some(category) => Some(category),
                None => {
                    debug!(category = name, "Unknown category filter");
                    return Vec::new();
                }
            },
            None => None,
        };

        let mut candidates = self.score_candidates(features, category);
        if let Some(min_score) = options.min_score {
            candidates.retain(|c| c.final_score > min_score);
        }
        let ranked = rank_candidates(candidates, options.top_n);

        let archetype = UserTypeClassifier::classify(features);
        ranked
            .into_iter()
            .map(|c| Recommendation {
                explanation: ExplanationGenerator::explain(features, c.category, archetype),
                product_id: c.product_id,
                category: c.category,
                score: format!("{:.3}", c.final_score),
                probability: format!("{:.1}%", c.probability * 100.0),
                priority: c.priority,
            })
            .collect()
    }

    /// Serialize the trained state to a JSON artifact set
    pub fn save_artifacts(&self) -> Result<String, EngineError> {
        let state = match &self.state {
            Some(state) => state,
            None => {
                return Err(EngineError::ArtifactError(
                    "no trained state to save".to_string(),
                ))
            }
        };
        let mut classifiers = BTreeMap::new();
        for id in state.ensemble.trained_ids() {
            if let Some(handle) = state.ensemble.handle(id) {
                classifiers.insert(id.clone(), handle.to_blob()?);
            }
        }
        let artifacts = TrainedArtifacts::new(
            self.catalog.clone(),
            state.feature_names.clone(),
            state.scaler.clone(),
            classifiers,
            state.ensemble.trained_ids().to_vec(),
        );
        artifacts.to_json().map_err(EngineError::from)
    }

    /// Restore the catalog and trained state from a JSON artifact set
    pub fn load_artifacts(&mut self, json: &str) -> Result<(), EngineError> {
        let artifacts = TrainedArtifacts::from_json(json)?;
        artifacts.validate()?;

        let mut parts = Vec::with_capacity(artifacts.trained_ids.len());
        for id in &artifacts.trained_ids {
            let blob = artifacts.classifiers.get(id).ok_or_else(|| {
                EngineError::ArtifactError(format!("no classifier blob stored for {id}"))
            })?;
            parts.push((id.clone(), self.trainer.from_blob(blob)?));
        }
        info!(
            generation_id = %artifacts.generation_id,
            engine_version = %artifacts.engine_version,
            trained = parts.len(),
            "Loaded trained artifacts"
        );
        self.catalog = artifacts.catalog;
        self.state = Some(TrainedState {
            feature_names: artifacts.feature_names,
            scaler: artifacts.scaler,
            ensemble: ClassifierEnsemble::from_handles(parts),
        });
        Ok(())
    }

    /// Measure catalog reach over a seeded sample of frame users
    pub fn coverage_analysis(
        &self,
        frame: &FeatureFrame,
        options: &CoverageOptions,
    ) -> CoverageReport {
        let sample = options.sample.min(frame.len());
        let mut indices: Vec<usize> = (0..frame.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        indices.shuffle(&mut rng);
        indices.truncate(sample);

        let recommend_options = RecommendOptions {
            top_n: options.top_n,
            category: None,
            min_score: Some(options.min_score),
        };
        let mut recommended: BTreeSet<String> = BTreeSet::new();
        for &i in &indices {
            for recommendation in self.recommend(&frame.rows()[i], &recommend_options) {
                recommended.insert(recommendation.product_id);
            }
        }

        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut never_recommended = Vec::new();
        for entry in self.catalog.iter() {
            if recommended.contains(&entry.id) {
                *by_category
                    .entry(entry.category.as_str().to_string())
                    .or_insert(0) += 1;
            } else {
                never_recommended.push(entry.id.clone());
            }
        }

        CoverageReport {
            sampled_users: sample,
            catalog_size: self.catalog.len(),
            recommended: recommended.len(),
            by_category,
            never_recommended,
        }
    }
}
