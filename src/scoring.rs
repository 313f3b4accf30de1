//! Candidate scoring
//!
//! Combines classifier probability, catalog priority and two boost tables
//! into the final ranking score:
//! probability * (priority / 10) * type_boost * behavior_boost.
//! The boost tables are plain data handed to the engine at construction, so
//! a deployment can reweight categories without touching scoring code.

use crate::catalog::ProductEntry;
use crate::types::{
    Clause, FeatureVector, ProductCategory, ScoredCandidate, UserArchetype, ENGAGEMENT_RATIO,
    MARKET_EVENTS, TECH_INTEREST_RATIO,
};
use std::cmp::Ordering;

/// Affinity multiplier for one archetype and category pair
#[derive(Debug, Clone, Copy)]
pub struct TypeBoost {
    pub archetype: UserArchetype,
    pub category: ProductCategory,
    pub factor: f64,
}

/// Behavioral multiplier applied to a category while a clause holds
#[derive(Debug, Clone, Copy)]
pub struct BehaviorBoost {
    pub category: ProductCategory,
    pub when: Clause,
    pub factor: f64,
}

const fn type_boost(
    archetype: UserArchetype,
    category: ProductCategory,
    factor: f64,
) -> TypeBoost {
    TypeBoost {
        archetype,
        category,
        factor,
    }
}

/// Archetype affinity table. Pairs not listed multiply by 1.0.
pub const TYPE_BOOSTS: &[TypeBoost] = &[
    type_boost(UserArchetype::Vip, ProductCategory::Premium, 2.0),
    type_boost(UserArchetype::Vip, ProductCategory::Investments, 1.5),
    type_boost(UserArchetype::Vip, ProductCategory::Cards, 1.3),
    type_boost(UserArchetype::Digital, ProductCategory::Cards, 1.8),
    type_boost(UserArchetype::Digital, ProductCategory::Investments, 1.6),
    type_boost(UserArchetype::Digital, ProductCategory::Premium, 1.4),
    type_boost(UserArchetype::Investor, ProductCategory::Investments, 2.0),
    type_boost(UserArchetype::Investor, ProductCategory::Premium, 1.5),
    type_boost(UserArchetype::Family, ProductCategory::Loans, 1.8),
    type_boost(UserArchetype::Family, ProductCategory::Insurance, 1.6),
    type_boost(UserArchetype::Family, ProductCategory::Savings, 1.4),
    type_boost(UserArchetype::Sports, ProductCategory::Cards, 1.7),
    type_boost(UserArchetype::Sports, ProductCategory::Insurance, 1.5),
    type_boost(UserArchetype::Business, ProductCategory::Loans, 1.8),
    type_boost(UserArchetype::Business, ProductCategory::Premium, 1.6),
    type_boost(UserArchetype::Business, ProductCategory::Investments, 1.4),
    type_boost(UserArchetype::Senior, ProductCategory::Savings, 1.8),
    type_boost(UserArchetype::Senior, ProductCategory::Cards, 1.6),
    type_boost(UserArchetype::Senior, ProductCategory::Insurance, 1.4),
    type_boost(UserArchetype::Conservative, ProductCategory::Savings, 1.7),
    type_boost(UserArchetype::Conservative, ProductCategory::Insurance, 1.3),
];

/// Behavioral boost table. Factors compound multiplicatively when several
/// rows apply to the same category.
pub const BEHAVIOR_BOOSTS: &[BehaviorBoost] = &[
    BehaviorBoost {
        category: ProductCategory::Premium,
        when: Clause::Above(MARKET_EVENTS, 150.0),
        factor: 1.5,
    },
    BehaviorBoost {
        category: ProductCategory::Investments,
        when: Clause::Above(TECH_INTEREST_RATIO, 0.6),
        factor: 1.4,
    },
    BehaviorBoost {
        category: ProductCategory::Cards,
        when: Clause::Above(ENGAGEMENT_RATIO, 0.15),
        factor: 1.3,
    },
];

/// Boost tables handed to the scoring engine at startup
#[derive(Debug, Clone)]
pub struct BoostTables {
    pub type_boosts: Vec<TypeBoost>,
    pub behavior_boosts: Vec<BehaviorBoost>,
}

impl Default for BoostTables {
    fn default() -> Self {
        Self {
            type_boosts: TYPE_BOOSTS.to_vec(),
            behavior_boosts: BEHAVIOR_BOOSTS.to_vec(),
        }
    }
}

/// Turns classifier probabilities into boosted, rankable scores
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    boosts: BoostTables,
}

impl ScoringEngine {
    pub fn new(boosts: BoostTables) -> Self {
        Self { boosts }
    }

    /// Archetype affinity for a category, 1.0 when no table row applies
    pub fn type_boost(&self, archetype: UserArchetype, category: ProductCategory) -> f64 {
        self.boosts
            .type_boosts
            .iter()
            .find(|b| b.archetype == archetype && b.category == category)
            .map(|b| b.factor)
            .unwrap_or(1.0)
    }

    /// Product of all behavior boost factors whose clause holds
    pub fn behavior_boost(&self, features: &FeatureVector, category: ProductCategory) -> f64 {
        self.boosts
            .behavior_boosts
            .iter()
            .filter(|b| b.category == category && b.when.matches(features))
            .map(|b| b.factor)
            .product()
    }

    /// Scores one candidate product for a user.
    pub fn score(
        &self,
        features: &FeatureVector,
        archetype: UserArchetype,
        entry: &ProductEntry,
        probability: f64,
    ) -> ScoredCandidate {
        let type_boost = self.type_boost(archetype, entry.category);
        let behavior_boost = self.behavior_boost(features, entry.category);
        let base = probability * (entry.priority as f64 / 10.0);
        ScoredCandidate {
            product_id: entry.id.clone(),
            category: entry.category,
            probability,
            priority: entry.priority,
            type_boost,
            behavior_boost,
            final_score: base * type_boost * behavior_boost,
        }
    }
}

/// Sorts candidates by final score descending and keeps the top `limit`.
///
/// The sort is stable, so candidates built in catalog order keep that order
/// on score ties.
pub fn rank_candidates(
    mut candidates: Vec<ScoredCandidate>,
    limit: usize,
) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(limit);
    candidates
}
