//! Error types for the recommendation engine

use thiserror::Error;

/// Errors that can occur while ingesting data, training, or serving
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Duplicate product id: {0}")]
    DuplicateProduct(String),

    #[error("Priority {priority} out of range for product {id} (expected 1-10)")]
    InvalidPriority { id: String, priority: u8 },

    #[error("Failed to parse feature table: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Dimension mismatch: expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Prediction error: {0}")]
    PredictionError(String),

    #[error("Invalid artifact set: {0}")]
    ArtifactError(String),

    #[error("Feature table contains no rows")]
    EmptyFrame,
}
