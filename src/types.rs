//! Core types for the recommendation engine
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: feature vectors, rule clauses, scored candidates, presentation-ready
//! recommendations, and the reports produced by training and evaluation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// Feature names referenced by the built-in rule tables.
pub const MARKET_EVENTS: &str = "market_events";
pub const ENGAGEMENT_RATIO: &str = "engagement_ratio";
pub const OFFERS_ENGAGEMENT: &str = "offers_engagement";
pub const TECH_INTEREST_RATIO: &str = "tech_interest_ratio";
pub const HOME_INTEREST_RATIO: &str = "home_interest_ratio";
pub const SPORTS_INTEREST_RATIO: &str = "sports_interest_ratio";
pub const DIVERSITY_RATIO: &str = "diversity_ratio";
pub const RETAIL_EVENTS: &str = "retail_events";

/// Product category within the bank's catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Savings,
    Premium,
    Cards,
    PartnerCards,
    Loans,
    Investments,
    Insurance,
}

impl ProductCategory {
    /// All categories, in catalog declaration order
    pub const ALL: [ProductCategory; 7] = [
        ProductCategory::Savings,
        ProductCategory::Premium,
        ProductCategory::Cards,
        ProductCategory::PartnerCards,
        ProductCategory::Loans,
        ProductCategory::Investments,
        ProductCategory::Insurance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Savings => "savings",
            ProductCategory::Premium => "premium",
            ProductCategory::Cards => "cards",
            ProductCategory::PartnerCards => "partner_cards",
            ProductCategory::Loans => "loans",
            ProductCategory::Investments => "investments",
            ProductCategory::Insurance => "insurance",
        }
    }

    /// Parses a category from its wire name. Returns `None` for unknown names.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "savings" => Some(ProductCategory::Savings),
            "premium" => Some(ProductCategory::Premium),
            "cards" => Some(ProductCategory::Cards),
            "partner_cards" => Some(ProductCategory::PartnerCards),
            "loans" => Some(ProductCategory::Loans),
            "investments" => Some(ProductCategory::Investments),
            "insurance" => Some(ProductCategory::Insurance),
            _ => None,
        }
    }
}

/// Behavioral archetype assigned by the first matching classification rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserArchetype {
    Vip,
    Digital,
    Investor,
    Family,
    Sports,
    Business,
    Senior,
    Conservative,
    Active,
    Casual,
}

impl UserArchetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserArchetype::Vip => "vip",
            UserArchetype::Digital => "digital",
            UserArchetype::Investor => "investor",
            UserArchetype::Family => "family",
            UserArchetype::Sports => "sports",
            UserArchetype::Business => "business",
            UserArchetype::Senior => "senior",
            UserArchetype::Conservative => "conservative",
            UserArchetype::Active => "active",
            UserArchetype::Casual => "casual",
        }
    }
}

/// Behavioral feature vector for one user, keyed by feature name
///
/// Absent features read as 0.0 so rule predicates and scoring see the same
/// value whether a column was missing from the source table or simply zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: HashMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self {
            values: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }

    /// Returns the feature value, or 0.0 when the feature is absent
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// One strict threshold comparison against a named feature
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clause {
    /// Feature value strictly above the threshold
    Above(&'static str, f64),
    /// Feature value strictly below the threshold
    Below(&'static str, f64),
}

impl Clause {
    pub fn matches(&self, features: &FeatureVector) -> bool {
        match *self {
            Clause::Above(name, threshold) => features.get(name) > threshold,
            Clause::Below(name, threshold) => features.get(name) < threshold,
        }
    }
}

/// One product scored for a user, before presentation formatting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub product_id: String,
    pub category: ProductCategory,
    /// Classifier probability of relevance (0-1)
    pub probability: f64,
    /// Catalog priority (1-10)
    pub priority: u8,
    /// Archetype affinity multiplier
    pub type_boost: f64,
    /// Behavioral signal multiplier
    pub behavior_boost: f64,
    /// probability * priority/10 * type_boost * behavior_boost
    pub final_score: f64,
}

/// Presentation-ready recommendation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub product_id: String,
    pub category: ProductCategory,
    /// Final score, formatted to three decimals
    pub score: String,
    /// Relevance probability, formatted as a percentage with one decimal
    pub probability: String,
    pub priority: u8,
    pub explanation: String,
}

/// Per-product outcome of an ensemble training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProductOutcome {
    Trained { positives: usize, positive_weight: f64 },
    Skipped { positives: usize },
    Failed { reason: String },
}

impl ProductOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, ProductOutcome::Trained { .. })
    }
}

/// Training outcome for a single catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReport {
    pub product_id: String,
    pub outcome: ProductOutcome,
}

/// Summary of a full training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Number of users in the feature table
    pub users: usize,
    /// Number of feature columns retained after ingestion
    pub features: usize,
    /// Products with a usable classifier
    pub trained: usize,
    /// Products skipped for lack of positive examples
    pub skipped: usize,
    /// Products whose training attempt failed
    pub failed: usize,
    /// Distinct products appearing in at least one synthesized label set
    pub label_coverage: usize,
    /// Mean synthesized labels per user
    pub mean_labels_per_user: f64,
    pub products: Vec<ProductReport>,
    /// Held-out evaluation, absent when the test split is empty
    pub evaluation: Option<EvaluationReport>,
}

/// Multi-label quality metrics on the held-out split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Fraction of label cells predicted incorrectly
    pub hamming_loss: f64,
    /// Mean per-user Jaccard similarity between predicted and true label sets
    pub jaccard_score: f64,
    /// Fraction of users receiving at least one predicted label
    pub coverage: f64,
    pub evaluated_users: usize,
    pub evaluated_products: usize,
}

/// Catalog reach over a sample of users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub sampled_users: usize,
    pub catalog_size: usize,
    /// Distinct products that appeared in at least one recommendation list
    pub recommended: usize,
    /// Recommended product counts keyed by category name
    pub by_category: BTreeMap<String, usize>,
    /// Catalog products that never surfaced for the sample
    pub never_recommended: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_names_round_trip() {
        for category in ProductCategory::ALL {
            assert_eq!(ProductCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(ProductCategory::parse("crypto"), None);
    }

    #[test]
    fn test_category_serializes_snake_case() {
        let json = serde_json::to_string(&ProductCategory::PartnerCards).unwrap();
        assert_eq!(json, "\"partner_cards\"");
    }

    #[test]
    fn test_missing_feature_reads_as_zero() {
        let features = FeatureVector::from_pairs(&[(MARKET_EVENTS, 42.0)]);
        assert_eq!(features.get(MARKET_EVENTS), 42.0);
        assert_eq!(features.get(ENGAGEMENT_RATIO), 0.0);
        assert!(!features.contains(ENGAGEMENT_RATIO));
    }

    #[test]
    fn test_clause_thresholds_are_strict() {
        let features = FeatureVector::from_pairs(&[(MARKET_EVENTS, 100.0)]);
        assert!(!Clause::Above(MARKET_EVENTS, 100.0).matches(&features));
        assert!(!Clause::Below(MARKET_EVENTS, 100.0).matches(&features));
        assert!(Clause::Above(MARKET_EVENTS, 99.9).matches(&features));
        assert!(Clause::Below(MARKET_EVENTS, 100.1).matches(&features));
    }

    #[test]
    fn test_clause_on_absent_feature_compares_against_zero() {
        let features = FeatureVector::new();
        assert!(Clause::Below(ENGAGEMENT_RATIO, 0.08).matches(&features));
        assert!(!Clause::Above(MARKET_EVENTS, 30.0).matches(&features));
    }

    #[test]
    fn test_product_outcome_serde_tag() {
        let outcome = ProductOutcome::Skipped { positives: 1 };
        let json = serde_json::to_string(&outcome).unwrap();
        assert_eq!(json, "{\"status\":\"skipped\",\"positives\":1}");
        let back: ProductOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, outcome);
    }
}
