//! Recommendation explanations
//!
//! Short human-readable reasons attached to each recommendation, assembled
//! from the same signals that drive classification and scoring.

use crate::types::{
    FeatureVector, ProductCategory, UserArchetype, ENGAGEMENT_RATIO, HOME_INTEREST_RATIO,
    MARKET_EVENTS, TECH_INTEREST_RATIO,
};

/// Builds one-line explanations for recommended products
pub struct ExplanationGenerator;

impl ExplanationGenerator {
    /// Returns comma-joined reasons a product suits a user.
    ///
    /// Activity fragments are mutually exclusive; archetype and category
    /// fragments stack. A profile triggering nothing gets a generic closer.
    pub fn explain(
        features: &FeatureVector,
        category: ProductCategory,
        archetype: UserArchetype,
    ) -> String {
        let mut reasons: Vec<&str> = Vec::new();

        let market_events = features.get(MARKET_EVENTS);
        if market_events > 100.0 {
            reasons.push("high activity");
        } else if market_events < 30.0 {
            reasons.push("stable behavior");
        }

        match archetype {
            UserArchetype::Vip => reasons.push("VIP status"),
            UserArchetype::Digital => reasons.push("strong digital engagement"),
            UserArchetype::Family => reasons.push("family-oriented profile"),
            _ => {}
        }

        if category == ProductCategory::Premium && features.get(ENGAGEMENT_RATIO) > 0.15 {
            reasons.push("high loyalty");
        }
        if category == ProductCategory::Investments && features.get(TECH_INTEREST_RATIO) > 0.5 {
            reasons.push("interest in innovation");
        }
        if category == ProductCategory::Loans && features.get(HOME_INTEREST_RATIO) > 0.6 {
            reasons.push("financing need");
        }

        if reasons.is_empty() {
            reasons.push("a close fit for your profile");
        }
        reasons.join(", ")
    }
}
