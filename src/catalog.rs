//! Product catalog
//!
//! The catalog is the closed set of products the engine may recommend. Entry
//! order is load order and doubles as the tie-break order during ranking, so
//! the catalog preserves it instead of sorting.

use crate::error::EngineError;
use crate::types::ProductCategory;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One recommendable product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEntry {
    pub id: String,
    pub category: ProductCategory,
    /// Business priority, 1-10
    pub priority: u8,
    /// Minimum customer age for eligibility
    pub min_age: u8,
}

/// Ordered, validated set of recommendable products
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<ProductEntry>", into = "Vec<ProductEntry>")]
pub struct ProductCatalog {
    entries: Vec<ProductEntry>,
    index: HashMap<String, usize>,
}

impl ProductCatalog {
    /// Builds a catalog from entries, rejecting duplicate ids and priorities
    /// outside 1-10.
    pub fn from_entries(entries: Vec<ProductEntry>) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !(1..=10).contains(&entry.priority) {
                return Err(EngineError::InvalidPriority {
                    id: entry.id.clone(),
                    priority: entry.priority,
                });
            }
            if !seen.insert(entry.id.clone()) {
                return Err(EngineError::DuplicateProduct(entry.id.clone()));
            }
        }
        Ok(Self::build(entries))
    }

    fn build(entries: Vec<ProductEntry>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id.clone(), position))
            .collect();
        Self { entries, index }
    }

    /// The built-in retail banking catalog.
    pub fn default_catalog() -> Self {
        use ProductCategory::*;
        Self::build(vec![
            // Savings
            entry("deposit_savings", Savings, 8, 18),
            entry("deposit_profitable", Savings, 9, 18),
            entry("deposit_pension", Savings, 7, 55),
            entry("deposit_special", Savings, 10, 18),
            entry("savings_free", Savings, 8, 18),
            // Premium
            entry("premium_card", Premium, 10, 25),
            entry("premium_package", Premium, 10, 30),
            entry("premium_investment", Premium, 9, 30),
            // Cards
            entry("credit_card_180", Cards, 9, 21),
            entry("salary_card_pro", Cards, 8, 18),
            entry("sports_card", Cards, 7, 18),
            entry("pension_card", Cards, 6, 55),
            entry("card_strong_people", Cards, 9, 21),
            entry("card_resident", Cards, 6, 18),
            entry("card_cashback", Cards, 8, 18),
            entry("card_salary_plus", Cards, 7, 18),
            entry("card_psb_iz", Cards, 8, 21),
            // Partner cards
            entry("card_spartak", PartnerCards, 7, 18),
            entry("card_cska", PartnerCards, 7, 18),
            entry("card_lenta", PartnerCards, 8, 18),
            entry("card_vkusvill", PartnerCards, 7, 18),
            entry("card_sportmaster", PartnerCards, 7, 18),
            entry("card_mvideo", PartnerCards, 8, 18),
            entry("card_post_market", PartnerCards, 6, 18),
            entry("card_new_world", PartnerCards, 6, 18),
            // Loans
            entry("consumer_loan", Loans, 9, 21),
            entry("refinancing", Loans, 8, 23),
            entry("mortgage_new", Loans, 10, 21),
            entry("mortgage_family", Loans, 10, 21),
            entry("mortgage_military", Loans, 9, 20),
            entry("mortgage_far_east", Loans, 8, 21),
            entry("mortgage_alternative", Loans, 7, 25),
            entry("mortgage_secondary", Loans, 9, 21),
            entry("mortgage_castle", Loans, 8, 25),
            entry("mortgage_easy", Loans, 7, 23),
            // Investments
            entry("investment_stocks", Investments, 8, 25),
            entry("investment_bonds", Investments, 7, 25),
            entry("investment_mixed", Investments, 7, 25),
            entry("investment_defense", Investments, 8, 25),
            entry("investment_dividend", Investments, 7, 25),
            entry("investment_perspective", Investments, 8, 25),
            entry("investment_opportunities", Investments, 7, 25),
            entry("investment_world", Investments, 6, 30),
            entry("investment_cushion", Investments, 6, 23),
            entry("investment_flow", Investments, 7, 25),
            entry("investment_resources", Investments, 7, 25),
            entry("investment_east", Investments, 6, 25),
            // Insurance
            entry("insurance_osago", Insurance, 9, 18),
            entry("insurance_job_loss", Insurance, 7, 21),
            entry("insurance_construction", Insurance, 6, 25),
            entry("insurance_life", Insurance, 8, 18),
            entry("insurance_credit", Insurance, 7, 21),
            entry("insurance_mortgage", Insurance, 8, 21),
            entry("insurance_legal", Insurance, 6, 25),
            entry("insurance_deposit", Insurance, 5, 30),
            entry("insurance_card", Insurance, 6, 18),
            entry("insurance_emergency", Insurance, 7, 18),
            entry("insurance_drive", Insurance, 8, 18),
            entry("insurance_health", Insurance, 7, 18),
            entry("insurance_property", Insurance, 7, 25),
            entry("insurance_travel", Insurance, 7, 18),
        ])
    }

    /// Looks up a product, failing with `UnknownProduct` when absent.
    pub fn get(&self, id: &str) -> Result<&ProductEntry, EngineError> {
        self.index
            .get(id)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| EngineError::UnknownProduct(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Product ids in catalog order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }

    /// Entries in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &ProductEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<ProductEntry>> for ProductCatalog {
    type Error = EngineError;

    fn try_from(entries: Vec<ProductEntry>) -> Result<Self, Self::Error> {
        Self::from_entries(entries)
    }
}

impl From<ProductCatalog> for Vec<ProductEntry> {
    fn from(catalog: ProductCatalog) -> Self {
        catalog.entries
    }
}

fn entry(id: &str, category: ProductCategory, priority: u8, min_age: u8) -> ProductEntry {
    ProductEntry {
        id: id.to_string(),
        category,
        priority,
        min_age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_catalog_is_valid_and_complete() {
        let catalog = ProductCatalog::default_catalog();
        assert_eq!(catalog.len(), 61);
        // The built-in table must satisfy its own validation rules.
        let revalidated = ProductCatalog::from_entries(catalog.iter().cloned().collect());
        assert!(revalidated.is_ok());
    }

    #[test]
    fn test_default_catalog_category_counts() {
        let catalog = ProductCatalog::default_catalog();
        let count = |category: ProductCategory| {
            catalog.iter().filter(|e| e.category == category).count()
        };
        assert_eq!(count(ProductCategory::Savings), 5);
        assert_eq!(count(ProductCategory::Premium), 3);
        assert_eq!(count(ProductCategory::Cards), 9);
        assert_eq!(count(ProductCategory::PartnerCards), 8);
        assert_eq!(count(ProductCategory::Loans), 10);
        assert_eq!(count(ProductCategory::Investments), 12);
        assert_eq!(count(ProductCategory::Insurance), 14);
    }

    #[test]
    fn test_lookup_and_age_gates() {
        let catalog = ProductCatalog::default_catalog();
        let pension = catalog.get("deposit_pension").unwrap();
        assert_eq!(pension.category, ProductCategory::Savings);
        assert_eq!(pension.min_age, 55);
        assert!(matches!(
            catalog.get("deposit_bitcoin"),
            Err(EngineError::UnknownProduct(_))
        ));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let entries = vec![
            entry("a", ProductCategory::Savings, 5, 18),
            entry("a", ProductCategory::Cards, 6, 18),
        ];
        assert!(matches!(
            ProductCatalog::from_entries(entries),
            Err(EngineError::DuplicateProduct(id)) if id == "a"
        ));
    }

    #[test]
    fn test_priority_outside_range_is_rejected() {
        let entries = vec![entry("a", ProductCategory::Savings, 11, 18)];
        assert!(matches!(
            ProductCatalog::from_entries(entries),
            Err(EngineError::InvalidPriority { priority: 11, .. })
        ));
        let entries = vec![entry("b", ProductCategory::Savings, 0, 18)];
        assert!(matches!(
            ProductCatalog::from_entries(entries),
            Err(EngineError::InvalidPriority { priority: 0, .. })
        ));
    }

    #[test]
    fn test_serde_round_trip_preserves_order() {
        let catalog = ProductCatalog::default_catalog();
        let json = serde_json::to_string(&catalog).unwrap();
        let back: ProductCatalog = serde_json::from_str(&json).unwrap();
        let original: Vec<String> = catalog.ids().map(String::from).collect();
        let restored: Vec<String> = back.ids().map(String::from).collect();
        assert_eq!(original, restored);
        assert!(back.get("premium_card").is_ok());
    }
}
