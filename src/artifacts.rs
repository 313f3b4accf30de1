//! Trained artifact persistence
//!
//! Everything needed to serve recommendations travels as one JSON document:
//! the catalog snapshot, the feature column layout, the fitted scaler and
//! the opaque per-product classifier blobs. Loading validates structure
//! before any blob is revived.

use crate::catalog::ProductCatalog;
use crate::error::EngineError;
use crate::scaler::StandardScaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Serialized state of a trained recommender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedArtifacts {
    /// Version of the engine that produced this set
    pub engine_version: String,
    /// Unique id of this training generation
    pub generation_id: String,
    pub trained_at: DateTime<Utc>,
    /// Catalog snapshot the classifiers were trained against
    pub catalog: ProductCatalog,
    /// Feature column layout, in training order
    pub feature_names: Vec<String>,
    pub scaler: StandardScaler,
    /// Opaque classifier blobs keyed by product id
    pub classifiers: BTreeMap<String, Vec<u8>>,
    /// Products with a usable classifier, in catalog order
    pub trained_ids: Vec<String>,
}

impl TrainedArtifacts {
    /// Stamps a new artifact set with a fresh generation id.
    pub fn new(
        catalog: ProductCatalog,
        feature_names: Vec<String>,
        scaler: StandardScaler,
        classifiers: BTreeMap<String, Vec<u8>>,
        trained_ids: Vec<String>,
    ) -> Self {
        Self {
            engine_version: crate::ENGINE_VERSION.to_string(),
            generation_id: Uuid::new_v4().to_string(),
            trained_at: Utc::now(),
            catalog,
            feature_names,
            scaler,
            classifiers,
            trained_ids,
        }
    }

    /// Serialize artifacts to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Load artifacts from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Structural checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.feature_names.is_empty() {
            return Err(EngineError::ArtifactError(
                "no feature columns recorded".to_string(),
            ));
        }
        if self.scaler.len() != self.feature_names.len() {
            return Err(EngineError::ArtifactError(format!(
                "scaler covers {} columns but {} feature names recorded",
                self.scaler.len(),
                self.feature_names.len()
            )));
        }
        for id in &self.trained_ids {
            if !self.catalog.contains(id) {
                return Err(EngineError::ArtifactError(format!(
                    "trained product {id} is missing from the catalog snapshot"
                )));
            }
            if !self.classifiers.contains_key(id) {
                return Err(EngineError::ArtifactError(format!(
                    "no classifier blob stored for trained product {id}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductEntry;
    use crate::types::ProductCategory;
    use ndarray::array;

    fn make_artifacts() -> TrainedArtifacts {
        let catalog = ProductCatalog::from_entries(vec![ProductEntry {
            id: "card_cashback".to_string(),
            category: ProductCategory::Cards,
            priority: 8,
            min_age: 18,
        }])
        .unwrap();
        let scaler = StandardScaler::fit(&array![[1.0, 2.0], [3.0, 4.0]]);
        let mut classifiers = BTreeMap::new();
        classifiers.insert("card_cashback".to_string(), vec![1, 2, 3]);
        TrainedArtifacts::new(
            catalog,
            vec!["market_events".to_string(), "engagement_ratio".to_string()],
            scaler,
            classifiers,
            vec!["card_cashback".to_string()],
        )
    }

    #[test]
    fn test_new_stamps_provenance() {
        let artifacts = make_artifacts();
        assert_eq!(artifacts.engine_version, env!("CARGO_PKG_VERSION"));
        assert!(Uuid::parse_str(&artifacts.generation_id).is_ok());
        assert!(artifacts.trained_at <= Utc::now());
    }

    #[test]
    fn test_json_round_trip() {
        let artifacts = make_artifacts();
        let json = artifacts.to_json().unwrap();
        let back = TrainedArtifacts::from_json(&json).unwrap();
        assert_eq!(back.generation_id, artifacts.generation_id);
        assert_eq!(back.feature_names, artifacts.feature_names);
        assert_eq!(back.scaler, artifacts.scaler);
        assert_eq!(back.trained_ids, artifacts.trained_ids);
        assert_eq!(back.classifiers["card_cashback"], vec![1, 2, 3]);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_scaler_width_mismatch() {
        let mut artifacts = make_artifacts();
        artifacts.feature_names.push("extra".to_string());
        assert!(matches!(
            artifacts.validate(),
            Err(EngineError::ArtifactError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_trained_product() {
        let mut artifacts = make_artifacts();
        artifacts.trained_ids.push("ghost_product".to_string());
        assert!(matches!(
            artifacts.validate(),
            Err(EngineError::ArtifactError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_blob() {
        let mut artifacts = make_artifacts();
        artifacts.classifiers.clear();
        assert!(matches!(
            artifacts.validate(),
            Err(EngineError::ArtifactError(_))
        ));
    }
}
