//! Demo personas
//!
//! Hand-built behavioral profiles covering the main customer archetypes,
//! used by the CLI to sanity-check a trained model and to compare how
//! recommendations shift across profiles.

use crate::types::{
    FeatureVector, ENGAGEMENT_RATIO, HOME_INTEREST_RATIO, MARKET_EVENTS, OFFERS_ENGAGEMENT,
    SPORTS_INTEREST_RATIO, TECH_INTEREST_RATIO,
};
use serde::{Deserialize, Serialize};

/// A canned user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    YoungActive,
    FamilyMortgage,
    Retiree,
    PremiumClient,
    Investor,
    Athlete,
}

impl Persona {
    pub const ALL: [Persona; 6] = [
        Persona::YoungActive,
        Persona::FamilyMortgage,
        Persona::Retiree,
        Persona::PremiumClient,
        Persona::Investor,
        Persona::Athlete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::YoungActive => "young_active",
            Persona::FamilyMortgage => "family_mortgage",
            Persona::Retiree => "retiree",
            Persona::PremiumClient => "premium_client",
            Persona::Investor => "investor",
            Persona::Athlete => "athlete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == value)
    }

    /// The persona's behavioral feature vector.
    pub fn features(&self) -> FeatureVector {
        let pairs: &[(&str, f64)] = match self {
            Persona::YoungActive => &[
                (MARKET_EVENTS, 120.0),
                ("market_clicks", 35.0),
                (ENGAGEMENT_RATIO, 0.29),
                (TECH_INTEREST_RATIO, 0.65),
                (SPORTS_INTEREST_RATIO, 0.25),
                (HOME_INTEREST_RATIO, 0.10),
                (OFFERS_ENGAGEMENT, 10.0),
                ("offers_engagement_ratio", 0.22),
                ("retail_purchase_intent", 0.18),
            ],
            Persona::FamilyMortgage => &[
                (MARKET_EVENTS, 65.0),
                ("market_clicks", 15.0),
                (ENGAGEMENT_RATIO, 0.23),
                (TECH_INTEREST_RATIO, 0.20),
                (SPORTS_INTEREST_RATIO, 0.10),
                (HOME_INTEREST_RATIO, 0.75),
                (OFFERS_ENGAGEMENT, 8.0),
                ("offers_engagement_ratio", 0.18),
                ("retail_purchase_intent", 0.25),
            ],
            Persona::Retiree => &[
                (MARKET_EVENTS, 15.0),
                ("market_clicks", 3.0),
                (ENGAGEMENT_RATIO, 0.20),
                (TECH_INTEREST_RATIO, 0.05),
                (SPORTS_INTEREST_RATIO, 0.05),
                (HOME_INTEREST_RATIO, 0.20),
                (OFFERS_ENGAGEMENT, 2.0),
                ("offers_engagement_ratio", 0.08),
                ("retail_purchase_intent", 0.10),
            ],
            Persona::PremiumClient => &[
                (MARKET_EVENTS, 180.0),
                ("market_clicks", 50.0),
                (ENGAGEMENT_RATIO, 0.28),
                (TECH_INTEREST_RATIO, 0.50),
                (SPORTS_INTEREST_RATIO, 0.30),
                (HOME_INTEREST_RATIO, 0.20),
                (OFFERS_ENGAGEMENT, 18.0),
                ("offers_engagement_ratio", 0.30),
                ("retail_purchase_intent", 0.35),
            ],
            Persona::Investor => &[
                (MARKET_EVENTS, 95.0),
                ("market_clicks", 20.0),
                (ENGAGEMENT_RATIO, 0.21),
                (TECH_INTEREST_RATIO, 0.70),
                (SPORTS_INTEREST_RATIO, 0.10),
                (HOME_INTEREST_RATIO, 0.15),
                (OFFERS_ENGAGEMENT, 12.0),
                ("offers_engagement_ratio", 0.25),
                ("retail_purchase_intent", 0.15),
            ],
            Persona::Athlete => &[
                (MARKET_EVENTS, 85.0),
                ("market_clicks", 25.0),
                (ENGAGEMENT_RATIO, 0.29),
                (TECH_INTEREST_RATIO, 0.30),
                (SPORTS_INTEREST_RATIO, 0.65),
                (HOME_INTEREST_RATIO, 0.05),
                (OFFERS_ENGAGEMENT, 9.0),
                ("offers_engagement_ratio", 0.19),
                ("retail_purchase_intent", 0.22),
            ],
        };
        FeatureVector::from_pairs(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::UserTypeClassifier;
    use crate::types::UserArchetype;

    #[test]
    fn test_persona_names_round_trip() {
        for persona in Persona::ALL {
            assert_eq!(Persona::parse(persona.as_str()), Some(persona));
        }
        assert_eq!(Persona::parse("crypto_whale"), None);
    }

    #[test]
    fn test_personas_land_on_expected_archetypes() {
        let expect = [
            (Persona::YoungActive, UserArchetype::Active),
            (Persona::FamilyMortgage, UserArchetype::Family),
            (Persona::Retiree, UserArchetype::Senior),
            // High offers engagement routes the premium profile through the
            // investor rule before the business rule is reached.
            (Persona::PremiumClient, UserArchetype::Investor),
            (Persona::Investor, UserArchetype::Active),
            (Persona::Athlete, UserArchetype::Sports),
        ];
        for (persona, archetype) in expect {
            assert_eq!(
                UserTypeClassifier::classify(&persona.features()),
                archetype,
                "persona {}",
                persona.as_str()
            );
        }
    }

    #[test]
    fn test_persona_profiles_are_fully_populated() {
        for persona in Persona::ALL {
            let features = persona.features();
            assert_eq!(features.len(), 9, "persona {}", persona.as_str());
            assert!(features.get(MARKET_EVENTS) > 0.0);
        }
    }
}
