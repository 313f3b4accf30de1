//! Finrec - Rule-grounded recommendation engine for financial products
//!
//! Finrec turns behavioral feature vectors into ranked, explained product
//! recommendations through a deterministic pipeline: target synthesis →
//! standardization → per-product classification → boosted scoring →
//! explanation.
//!
//! ## Modules
//!
//! - **Training**: Synthesize ground-truth labels from business rules and fit
//!   one weighted classifier per catalog product
//! - **Serving**: Score every trained product for a user, then rank, filter
//!   and explain the winners

pub mod archetype;
pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod explain;
pub mod features;
pub mod model;
pub mod personas;
pub mod pipeline;
pub mod scaler;
pub mod scoring;
pub mod targets;
pub mod types;

pub use error::EngineError;
pub use pipeline::Recommender;
pub use types::{
    FeatureVector, ProductCategory, Recommendation, TrainingReport, UserArchetype,
};

// Rule-layer exports
pub use archetype::UserTypeClassifier;
pub use catalog::{ProductCatalog, ProductEntry};
pub use targets::TargetSynthesizer;

// Configuration exports
pub use config::{CoverageOptions, RecommendOptions, TrainingConfig};

// Data and demo exports
pub use features::{parse_user, FeatureFrame};
pub use personas::Persona;

/// Engine version embedded in all saved artifact sets
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for artifact sets and diagnostics
pub const ENGINE_NAME: &str = "finrec";
