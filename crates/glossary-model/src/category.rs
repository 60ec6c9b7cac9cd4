//! The closed category set.
//!
//! Categories are fixed at compile time. Matching an authored category string
//! accepts the display label (ASCII case-insensitive) or the slug; nothing is
//! ever defaulted or coerced to a "closest" category.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    BudgetFinance,
    PublicSafety,
    HousingDevelopment,
    TransportationInfrastructure,
    Education,
    HealthHumanServices,
    EnvironmentSustainability,
    EconomicDevelopment,
    LaborWorkforce,
    CivicEngagement,
    ElectionsGovernance,
    LegalJustice,
    ParksRecreation,
    TechnologyInnovation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category `{0}`")]
pub struct UnknownCategory(pub String);

impl Category {
    pub const ALL: [Category; 14] = [
        Category::BudgetFinance,
        Category::PublicSafety,
        Category::HousingDevelopment,
        Category::TransportationInfrastructure,
        Category::Education,
        Category::HealthHumanServices,
        Category::EnvironmentSustainability,
        Category::EconomicDevelopment,
        Category::LaborWorkforce,
        Category::CivicEngagement,
        Category::ElectionsGovernance,
        Category::LegalJustice,
        Category::ParksRecreation,
        Category::TechnologyInnovation,
    ];

    /// Human-readable label as shown on the site.
    pub fn label(self) -> &'static str {
        match self {
            Category::BudgetFinance => "Budget & Finance",
            Category::PublicSafety => "Public Safety",
            Category::HousingDevelopment => "Housing & Development",
            Category::TransportationInfrastructure => "Transportation & Infrastructure",
            Category::Education => "Education",
            Category::HealthHumanServices => "Health & Human Services",
            Category::EnvironmentSustainability => "Environment & Sustainability",
            Category::EconomicDevelopment => "Economic Development",
            Category::LaborWorkforce => "Labor & Workforce",
            Category::CivicEngagement => "Civic Engagement",
            Category::ElectionsGovernance => "Elections & Governance",
            Category::LegalJustice => "Legal & Justice",
            Category::ParksRecreation => "Parks & Recreation",
            Category::TechnologyInnovation => "Technology & Innovation",
        }
    }

    /// URL slug (matches the serde representation).
    pub fn slug(self) -> &'static str {
        match self {
            Category::BudgetFinance => "budget-finance",
            Category::PublicSafety => "public-safety",
            Category::HousingDevelopment => "housing-development",
            Category::TransportationInfrastructure => "transportation-infrastructure",
            Category::Education => "education",
            Category::HealthHumanServices => "health-human-services",
            Category::EnvironmentSustainability => "environment-sustainability",
            Category::EconomicDevelopment => "economic-development",
            Category::LaborWorkforce => "labor-workforce",
            Category::CivicEngagement => "civic-engagement",
            Category::ElectionsGovernance => "elections-governance",
            Category::LegalJustice => "legal-justice",
            Category::ParksRecreation => "parks-recreation",
            Category::TechnologyInnovation => "technology-innovation",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(needle) || c.slug() == needle)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn fourteen_distinct_categories() {
        let labels: HashSet<_> = Category::ALL.iter().map(|c| c.label()).collect();
        let slugs: HashSet<_> = Category::ALL.iter().map(|c| c.slug()).collect();
        assert_eq!(labels.len(), 14);
        assert_eq!(slugs.len(), 14);
    }

    #[test]
    fn parses_label_and_slug() {
        assert_eq!("Budget & Finance".parse(), Ok(Category::BudgetFinance));
        assert_eq!("  public safety ".parse(), Ok(Category::PublicSafety));
        assert_eq!("parks-recreation".parse(), Ok(Category::ParksRecreation));
    }

    #[test]
    fn rejects_anything_else() {
        assert_eq!(
            "Not A Real Category".parse::<Category>(),
            Err(UnknownCategory("Not A Real Category".to_string()))
        );
        // Close is not good enough.
        assert!("Budget and Finance".parse::<Category>().is_err());
        assert!("".parse::<Category>().is_err());
    }

    #[test]
    fn slug_matches_serde_name() {
        for c in Category::ALL {
            let json = serde_json::to_string(&c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.slug()));
        }
    }
}
