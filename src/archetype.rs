//! User archetype classification
//!
//! An ordered rule table assigns each user exactly one behavioral archetype.
//! Rules are evaluated top to bottom and the first match wins, so the more
//! specific profiles must stay above the broader ones they would shadow.

use crate::types::{
    Clause, FeatureVector, UserArchetype, ENGAGEMENT_RATIO, HOME_INTEREST_RATIO, MARKET_EVENTS,
    OFFERS_ENGAGEMENT, SPORTS_INTEREST_RATIO, TECH_INTEREST_RATIO,
};

/// Condition over a feature vector: a conjunction or disjunction of clauses
#[derive(Debug, Clone, Copy)]
pub enum Requirement {
    All(&'static [Clause]),
    Any(&'static [Clause]),
}

impl Requirement {
    pub fn matches(&self, features: &FeatureVector) -> bool {
        match self {
            Requirement::All(clauses) => clauses.iter().all(|c| c.matches(features)),
            Requirement::Any(clauses) => clauses.iter().any(|c| c.matches(features)),
        }
    }
}

/// One row of the classification table
#[derive(Debug, Clone, Copy)]
pub struct ArchetypeRule {
    pub archetype: UserArchetype,
    pub when: Requirement,
}

/// Classification rules in evaluation order. Users matching no rule fall
/// back to `Casual`.
pub const ARCHETYPE_RULES: &[ArchetypeRule] = &[
    ArchetypeRule {
        archetype: UserArchetype::Vip,
        when: Requirement::All(&[
            Clause::Above(MARKET_EVENTS, 200.0),
            Clause::Above(ENGAGEMENT_RATIO, 0.2),
            Clause::Above(TECH_INTEREST_RATIO, 0.6),
        ]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Digital,
        when: Requirement::All(&[
            Clause::Above(MARKET_EVENTS, 150.0),
            Clause::Above(TECH_INTEREST_RATIO, 0.5),
        ]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Investor,
        when: Requirement::All(&[
            Clause::Above(MARKET_EVENTS, 100.0),
            Clause::Above(OFFERS_ENGAGEMENT, 15.0),
        ]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Family,
        when: Requirement::All(&[Clause::Above(HOME_INTEREST_RATIO, 0.7)]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Sports,
        when: Requirement::All(&[Clause::Above(SPORTS_INTEREST_RATIO, 0.6)]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Business,
        when: Requirement::All(&[
            Clause::Above(MARKET_EVENTS, 120.0),
            Clause::Above(ENGAGEMENT_RATIO, 0.15),
        ]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Senior,
        when: Requirement::Any(&[
            Clause::Below(MARKET_EVENTS, 30.0),
            Clause::Above(HOME_INTEREST_RATIO, 0.8),
        ]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Conservative,
        when: Requirement::All(&[Clause::Below(ENGAGEMENT_RATIO, 0.08)]),
    },
    ArchetypeRule {
        archetype: UserArchetype::Active,
        when: Requirement::All(&[Clause::Above(MARKET_EVENTS, 80.0)]),
    },
];

/// Assigns behavioral archetypes from the rule table
pub struct UserTypeClassifier;

impl UserTypeClassifier {
    /// Returns the archetype of the first matching rule, `Casual` otherwise.
    pub fn classify(features: &FeatureVector) -> UserArchetype {
        ARCHETYPE_RULES
            .iter()
            .find(|rule| rule.when.matches(features))
            .map(|rule| rule.archetype)
            .unwrap_or(UserArchetype::Casual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(pairs: &[(&str, f64)]) -> UserArchetype {
        UserTypeClassifier::classify(&FeatureVector::from_pairs(pairs))
    }

    #[test]
    fn test_first_match_wins_over_later_rules() {
        // Satisfies both the vip rule and the family rule; vip sits first.
        let archetype = classify(&[
            (MARKET_EVENTS, 250.0),
            (ENGAGEMENT_RATIO, 0.25),
            (TECH_INTEREST_RATIO, 0.7),
            (HOME_INTEREST_RATIO, 0.9),
        ]);
        assert_eq!(archetype, UserArchetype::Vip);
    }

    #[test]
    fn test_each_rule_is_reachable() {
        assert_eq!(
            classify(&[(MARKET_EVENTS, 160.0), (TECH_INTEREST_RATIO, 0.55)]),
            UserArchetype::Digital
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 110.0), (OFFERS_ENGAGEMENT, 16.0)]),
            UserArchetype::Investor
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 60.0), (HOME_INTEREST_RATIO, 0.75), (ENGAGEMENT_RATIO, 0.1)]),
            UserArchetype::Family
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 85.0), (SPORTS_INTEREST_RATIO, 0.65), (ENGAGEMENT_RATIO, 0.29)]),
            UserArchetype::Sports
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 130.0), (ENGAGEMENT_RATIO, 0.2)]),
            UserArchetype::Business
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 15.0), (ENGAGEMENT_RATIO, 0.2)]),
            UserArchetype::Senior
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 50.0), (ENGAGEMENT_RATIO, 0.05)]),
            UserArchetype::Conservative
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 90.0), (ENGAGEMENT_RATIO, 0.1)]),
            UserArchetype::Active
        );
        assert_eq!(
            classify(&[(MARKET_EVENTS, 50.0), (ENGAGEMENT_RATIO, 0.1)]),
            UserArchetype::Casual
        );
    }

    #[test]
    fn test_high_activity_with_offers_precedes_business() {
        // Rule order matters: the investor rule fires before the business
        // rule ever sees this profile.
        let archetype = classify(&[
            (MARKET_EVENTS, 180.0),
            (ENGAGEMENT_RATIO, 0.28),
            (TECH_INTEREST_RATIO, 0.5),
            (OFFERS_ENGAGEMENT, 18.0),
        ]);
        assert_eq!(archetype, UserArchetype::Investor);
    }

    #[test]
    fn test_empty_vector_classifies_as_senior() {
        // Absent features read as zero, and zero market events is below the
        // senior activity floor.
        assert_eq!(classify(&[]), UserArchetype::Senior);
    }

    #[test]
    fn test_strict_thresholds_do_not_fire_on_equality() {
        // Exactly 120 market events misses the business rule and falls
        // through to the active rule.
        assert_eq!(
            classify(&[(MARKET_EVENTS, 120.0), (ENGAGEMENT_RATIO, 0.2)]),
            UserArchetype::Active
        );
    }
}
