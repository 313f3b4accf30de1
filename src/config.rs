//! Engine configuration
//!
//! Training and serving knobs with defaults matching the reference
//! deployment. Every section deserializes with per-field defaults, so a
//! config file only needs the values it overrides.

use serde::{Deserialize, Serialize};

/// Training-time configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of users held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test shuffle
    pub seed: u64,
    /// Minimum positive examples required to train a product classifier
    pub min_positives: usize,
    /// Probability at or above which a label counts as predicted during
    /// evaluation
    pub decision_threshold: f64,
    pub logistic: LogisticConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            min_positives: 2,
            decision_threshold: 0.5,
            logistic: LogisticConfig::default(),
        }
    }
}

/// Hyperparameters for the built-in logistic regression trainer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// L2 regularization strength
    pub l2: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            epochs: 200,
            learning_rate: 0.1,
            l2: 1e-4,
        }
    }
}

/// Serving-time options for one recommendation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendOptions {
    /// Maximum number of recommendations returned
    pub top_n: usize,
    /// Restrict results to one category wire name; unknown names yield an
    /// empty result rather than an error
    pub category: Option<String>,
    /// Drop candidates whose final score does not exceed this floor
    pub min_score: Option<f64>,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            category: None,
            min_score: None,
        }
    }
}

/// Options for catalog coverage analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageOptions {
    /// Maximum number of users sampled from the frame
    pub sample: usize,
    /// Recommendations requested per sampled user
    pub top_n: usize,
    /// Score floor applied to each recommendation list
    pub min_score: f64,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self {
            sample: 100,
            top_n: 7,
            min_score: 0.05,
        }
    }
}
