//! Target label synthesis
//!
//! Deterministic rules turn each user's behavior into the set of catalog
//! products judged relevant for them. These synthesized label sets are the
//! training ground truth for the classifier ensemble, so the tables here
//! define what the models learn.

use crate::archetype::UserTypeClassifier;
use crate::types::{
    Clause, FeatureVector, UserArchetype, DIVERSITY_RATIO, ENGAGEMENT_RATIO, HOME_INTEREST_RATIO,
    MARKET_EVENTS, OFFERS_ENGAGEMENT, RETAIL_EVENTS, SPORTS_INTEREST_RATIO, TECH_INTEREST_RATIO,
};
use std::collections::BTreeSet;

/// Products judged relevant for one user
pub type LabelSet = BTreeSet<String>;

/// Condition attached to a synthesis rule
#[derive(Debug, Clone, Copy)]
pub enum Trigger {
    /// Applies to every user
    Always,
    /// Applies when the user's archetype is in the list
    ArchetypeIn(&'static [UserArchetype]),
    /// Applies when every clause holds
    AllOf(&'static [Clause]),
}

impl Trigger {
    pub fn matches(&self, archetype: UserArchetype, features: &FeatureVector) -> bool {
        match self {
            Trigger::Always => true,
            Trigger::ArchetypeIn(list) => list.contains(&archetype),
            Trigger::AllOf(clauses) => clauses.iter().all(|c| c.matches(features)),
        }
    }
}

/// One synthesis rule: a trigger and the products it labels
#[derive(Debug, Clone, Copy)]
pub struct TargetRule {
    pub trigger: Trigger,
    pub products: &'static [&'static str],
}

/// How the rules of a group combine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// Every matching rule contributes its products
    Independent,
    /// Only the first matching rule contributes
    FirstMatch,
}

/// A named block of synthesis rules
#[derive(Debug, Clone, Copy)]
pub struct TargetRuleGroup {
    pub name: &'static str,
    pub mode: GroupMode,
    pub rules: &'static [TargetRule],
}

use Clause::{Above, Below};
use Trigger::{AllOf, Always, ArchetypeIn};
use UserArchetype::{Business, Conservative, Digital, Family, Investor, Senior, Sports, Vip};

/// The synthesis rule tables, one group per product domain.
///
/// The premium group is first-match so a VIP profile takes the full bundle
/// and everyone else gets at most one premium product.
pub const TARGET_RULE_GROUPS: &[TargetRuleGroup] = &[
    TargetRuleGroup {
        name: "savings",
        mode: GroupMode::Independent,
        rules: &[
            TargetRule {
                trigger: ArchetypeIn(&[Conservative, Senior, Family]),
                products: &["deposit_savings", "deposit_pension"],
            },
            TargetRule {
                trigger: AllOf(&[Below(ENGAGEMENT_RATIO, 0.1)]),
                products: &["savings_free", "deposit_profitable"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 100.0), Above(ENGAGEMENT_RATIO, 0.15)]),
                products: &["deposit_special"],
            },
        ],
    },
    TargetRuleGroup {
        name: "premium",
        mode: GroupMode::FirstMatch,
        rules: &[
            TargetRule {
                trigger: ArchetypeIn(&[Vip]),
                products: &["premium_card", "premium_package", "premium_investment"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 150.0), Above(TECH_INTEREST_RATIO, 0.6)]),
                products: &["premium_investment"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 120.0), Above(ENGAGEMENT_RATIO, 0.2)]),
                products: &["premium_card"],
            },
        ],
    },
    TargetRuleGroup {
        name: "cards",
        mode: GroupMode::Independent,
        rules: &[
            TargetRule {
                trigger: Always,
                products: &["card_cashback"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Digital]),
                products: &["credit_card_180", "card_psb_iz", "card_strong_people"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Sports]),
                products: &["sports_card", "card_sportmaster", "card_spartak", "card_cska"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Senior, Conservative]),
                products: &["pension_card"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 50.0)]),
                products: &["salary_card_pro", "card_salary_plus"],
            },
            TargetRule {
                trigger: AllOf(&[Above(TECH_INTEREST_RATIO, 0.4)]),
                products: &["card_mvideo"],
            },
            TargetRule {
                trigger: AllOf(&[Above(RETAIL_EVENTS, 50.0)]),
                products: &["card_lenta", "card_vkusvill", "card_post_market", "card_new_world"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 30.0)]),
                products: &["card_resident"],
            },
        ],
    },
    TargetRuleGroup {
        name: "loans",
        mode: GroupMode::Independent,
        rules: &[
            TargetRule {
                trigger: ArchetypeIn(&[Family]),
                products: &["mortgage_family", "mortgage_new", "mortgage_secondary"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Business]),
                products: &["consumer_loan", "refinancing"],
            },
            TargetRule {
                trigger: AllOf(&[Above(HOME_INTEREST_RATIO, 0.5)]),
                products: &["mortgage_military", "mortgage_far_east"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 80.0), Above(OFFERS_ENGAGEMENT, 10.0)]),
                products: &["mortgage_alternative", "mortgage_castle", "mortgage_easy"],
            },
            TargetRule {
                trigger: AllOf(&[Above(OFFERS_ENGAGEMENT, 15.0)]),
                products: &["refinancing"],
            },
        ],
    },
    TargetRuleGroup {
        name: "investments",
        mode: GroupMode::Independent,
        rules: &[
            TargetRule {
                trigger: ArchetypeIn(&[Investor]),
                products: &["investment_stocks", "investment_mixed", "investment_opportunities"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Conservative, Senior]),
                products: &["investment_bonds", "investment_cushion", "investment_defense"],
            },
            TargetRule {
                trigger: AllOf(&[Above(TECH_INTEREST_RATIO, 0.5)]),
                products: &["investment_perspective", "investment_flow"],
            },
            TargetRule {
                trigger: AllOf(&[Above(HOME_INTEREST_RATIO, 0.4)]),
                products: &["investment_resources"],
            },
            TargetRule {
                trigger: AllOf(&[Above(DIVERSITY_RATIO, 0.3)]),
                products: &["investment_world", "investment_east"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 100.0)]),
                products: &["investment_dividend", "investment_stocks"],
            },
        ],
    },
    TargetRuleGroup {
        name: "insurance",
        mode: GroupMode::Independent,
        rules: &[
            TargetRule {
                trigger: Always,
                products: &["insurance_life"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 20.0)]),
                products: &["insurance_osago", "insurance_card"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Family]),
                products: &["insurance_property", "insurance_mortgage", "insurance_emergency"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Sports]),
                products: &["insurance_health", "insurance_drive", "insurance_emergency"],
            },
            TargetRule {
                trigger: ArchetypeIn(&[Business]),
                products: &["insurance_credit", "insurance_legal", "insurance_job_loss"],
            },
            TargetRule {
                trigger: AllOf(&[Above(HOME_INTEREST_RATIO, 0.6)]),
                products: &["insurance_property", "insurance_construction"],
            },
            TargetRule {
                trigger: AllOf(&[Above(SPORTS_INTEREST_RATIO, 0.4)]),
                products: &["insurance_drive"],
            },
            TargetRule {
                trigger: AllOf(&[Above(DIVERSITY_RATIO, 0.4)]),
                products: &["insurance_travel"],
            },
            TargetRule {
                trigger: AllOf(&[Above(MARKET_EVENTS, 60.0)]),
                products: &["insurance_deposit"],
            },
        ],
    },
];

/// Produces ground-truth label sets from the synthesis rule tables
pub struct TargetSynthesizer;

impl TargetSynthesizer {
    /// Labels one user with every product the rule groups judge relevant.
    pub fn synthesize(features: &FeatureVector) -> LabelSet {
        let archetype = UserTypeClassifier::classify(features);
        Self::synthesize_for(archetype, features)
    }

    /// Labels one user whose archetype is already known.
    pub fn synthesize_for(archetype: UserArchetype, features: &FeatureVector) -> LabelSet {
        let mut labels = LabelSet::new();
        for group in TARGET_RULE_GROUPS {
            for rule in group.rules {
                if rule.trigger.matches(archetype, features) {
                    labels.extend(rule.products.iter().map(|id| id.to_string()));
                    if group.mode == GroupMode::FirstMatch {
                        break;
                    }
                }
            }
        }
        labels
    }
}
