use serde::{Deserialize, Serialize};

/// NOVA food processing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingLevel {
    Unprocessed,
    ProcessedCulinary,
    Processed,
    UltraProcessed,
}

impl ProcessingLevel {
    /// Classes outside 1..=4 are treated as ultra-processed.
    pub fn from_nova(class: u8) -> Self {
        match class {
            1 => Self::Unprocessed,
            2 => Self::ProcessedCulinary,
            3 => Self::Processed,
            _ => Self::UltraProcessed,
        }
    }

    pub fn nova_class(&self) -> u8 {
        match self {
            Self::Unprocessed => 1,
            Self::ProcessedCulinary => 2,
            Self::Processed => 3,
            Self::UltraProcessed => 4,
        }
    }
}

/// Five-level verdict derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationLevel {
    Avoid,
    Poor,
    Moderate,
    Good,
    Excellent,
}

impl RecommendationLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Excellent,
            65..=79 => Self::Good,
            45..=64 => Self::Moderate,
            25..=44 => Self::Poor,
            _ => Self::Avoid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "EXCELLENT",
            Self::Good => "GOOD",
            Self::Moderate => "MODERATE",
            Self::Poor => "POOR",
            Self::Avoid => "AVOID",
        }
    }
}

impl std::fmt::Display for RecommendationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calorie shares of the three macronutrients and how well they fit AMDR.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MacronutrientBalance {
    pub protein_pct: f64,
    pub carb_pct: f64,
    pub fat_pct: f64,
    /// 100 minus 20 per macronutrient outside its range; 0 without calories.
    pub balance_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactRating {
    LowRisk,
    ModerateRisk,
    HighRisk,
    Favorable,
    Concerning,
    Supportive,
    Neutral,
    PotentiallyDisruptive,
    AntiInflammatory,
    ProInflammatory,
}

impl ImpactRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowRisk => "LOW RISK",
            Self::ModerateRisk => "MODERATE RISK",
            Self::HighRisk => "HIGH RISK",
            Self::Favorable => "FAVORABLE",
            Self::Concerning => "CONCERNING",
            Self::Supportive => "SUPPORTIVE",
            Self::Neutral => "NEUTRAL",
            Self::PotentiallyDisruptive => "POTENTIALLY DISRUPTIVE",
            Self::AntiInflammatory => "ANTI-INFLAMMATORY",
            Self::ProInflammatory => "PRO-INFLAMMATORY",
        }
    }
}

/// One body-system impact: a coarse rating plus what triggered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactAssessment {
    pub rating: ImpactRating,
    pub factors: Vec<String>,
}

impl ImpactAssessment {
    pub fn new(rating: ImpactRating, factors: Vec<String>) -> Self {
        Self { rating, factors }
    }

    /// `MODERATE RISK (high sodium)`, or just the rating without factors.
    pub fn label(&self) -> String {
        if self.factors.is_empty() {
            self.rating.as_str().to_string()
        } else {
            format!("{} ({})", self.rating.as_str(), self.factors.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthImpacts {
    pub cardiovascular: ImpactAssessment,
    pub metabolic: ImpactAssessment,
    pub digestive: ImpactAssessment,
    pub inflammatory: ImpactAssessment,
}

/// Ingredient-list risk scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IngredientRisk {
    pub beneficial: Vec<String>,
    pub concerning: Vec<String>,
    /// 0..=100
    pub score: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MicronutrientSnapshot {
    pub vitamin_c_mg: f64,
    pub calcium_mg: f64,
    pub iron_mg: f64,
}

/// Complete deterministic assessment of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScienceAssessment {
    pub nova_class: u8,
    pub processing_level: ProcessingLevel,
    pub nutrient_density_score: f64,
    pub macronutrient_balance: MacronutrientBalance,
    pub additive_risk_score: u8,
    pub beneficial_ingredients: Vec<String>,
    pub concerning_ingredients: Vec<String>,
    pub health_impacts: HealthImpacts,
    pub findings: Vec<String>,
    pub benefits: Vec<String>,
    pub concerns: Vec<String>,
    pub recommendations: Vec<String>,
    pub overall_score: u8,
    pub recommendation_level: RecommendationLevel,
    pub micronutrients: MicronutrientSnapshot,
    pub ingredient_complexity_index: f64,
    pub nutrient_profiling_score: f64,
    pub caloric_efficiency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_brackets() {
        assert_eq!(RecommendationLevel::from_score(100), RecommendationLevel::Excellent);
        assert_eq!(RecommendationLevel::from_score(80), RecommendationLevel::Excellent);
        assert_eq!(RecommendationLevel::from_score(79), RecommendationLevel::Good);
        assert_eq!(RecommendationLevel::from_score(65), RecommendationLevel::Good);
        assert_eq!(RecommendationLevel::from_score(64), RecommendationLevel::Moderate);
        assert_eq!(RecommendationLevel::from_score(45), RecommendationLevel::Moderate);
        assert_eq!(RecommendationLevel::from_score(44), RecommendationLevel::Poor);
        assert_eq!(RecommendationLevel::from_score(25), RecommendationLevel::Poor);
        assert_eq!(RecommendationLevel::from_score(24), RecommendationLevel::Avoid);
        assert_eq!(RecommendationLevel::from_score(0), RecommendationLevel::Avoid);
    }

    #[test]
    fn level_monotonic_in_score() {
        let mut previous = RecommendationLevel::from_score(0);
        for score in 1..=100u8 {
            let level = RecommendationLevel::from_score(score);
            assert!(level >= previous, "score {score}");
            previous = level;
        }
    }

    #[test]
    fn processing_level_round_trips_nova() {
        for class in 1..=4u8 {
            assert_eq!(ProcessingLevel::from_nova(class).nova_class(), class);
        }
        assert_eq!(ProcessingLevel::from_nova(9), ProcessingLevel::UltraProcessed);
    }

    #[test]
    fn impact_label_with_and_without_factors() {
        let low = ImpactAssessment::new(ImpactRating::LowRisk, vec![]);
        assert_eq!(low.label(), "LOW RISK");
        let high = ImpactAssessment::new(
            ImpactRating::HighRisk,
            vec!["high sodium".into(), "high saturated fat".into()],
        );
        assert_eq!(high.label(), "HIGH RISK (high sodium, high saturated fat)");
    }

    #[test]
    fn level_serializes_uppercase() {
        let json = serde_json::to_string(&RecommendationLevel::Moderate).unwrap();
        assert_eq!(json, "\"MODERATE\"");
    }
}
