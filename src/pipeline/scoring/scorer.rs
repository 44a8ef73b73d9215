use super::impacts::assess_health_impacts;
use super::narrative::{generate_insights, generate_recommendations};
use super::nova::classify_nova;
use super::nutrients::{
    caloric_efficiency, macronutrient_balance, micronutrient_snapshot, nutrient_density,
};
use super::risk::assess_ingredient_risk;
use super::types::{ProcessingLevel, RecommendationLevel, ScienceAssessment};
use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::standards::round_to;

const BASE_SCORE: f64 = 50.0;
const MAX_DENSITY_BONUS: f64 = 30.0;
const DENSITY_WEIGHT: f64 = 2.0;
const NOVA_PENALTY_PER_CLASS: f64 = 10.0;
const BALANCE_WEIGHT: f64 = 0.2;
const RISK_WEIGHT: f64 = 0.3;

/// Overall 0..=100 health score.
///
/// `50 + min(30, 2·density) − 10·(nova−1) + 0.2·balance − 0.3·risk`,
/// truncated toward zero and clamped.
pub fn overall_score(density: f64, nova_class: u8, balance_score: f64, additive_risk: u8) -> u8 {
    let raw = BASE_SCORE + (density * DENSITY_WEIGHT).min(MAX_DENSITY_BONUS)
        - f64::from(nova_class.saturating_sub(1)) * NOVA_PENALTY_PER_CLASS
        + balance_score * BALANCE_WEIGHT
        - f64::from(additive_risk) * RISK_WEIGHT;
    raw.trunc().clamp(0.0, 100.0) as u8
}

/// Deterministic nutrition science assessment of one product.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScienceScorer;

impl ScienceScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, facts: &NutrientMap, ingredients: &[String]) -> ScienceAssessment {
        let _span = tracing::info_span!(
            "science_score",
            nutrients = facts.len(),
            ingredients = ingredients.len()
        )
        .entered();

        let density = nutrient_density(facts);
        let nova_class = classify_nova(ingredients);
        let balance = macronutrient_balance(facts);
        let risk = assess_ingredient_risk(ingredients);
        let impacts = assess_health_impacts(facts, ingredients);

        let score = overall_score(density, nova_class, balance.balance_score, risk.score);
        let level = RecommendationLevel::from_score(score);

        let insights = generate_insights(facts, nova_class, density);
        let recommendations = generate_recommendations(score, &impacts, &risk.concerning);

        tracing::info!(
            overall_score = score,
            level = %level,
            nova_class,
            additive_risk = risk.score,
            density = round_to(density, 1),
            "Science assessment complete"
        );

        ScienceAssessment {
            nova_class,
            processing_level: ProcessingLevel::from_nova(nova_class),
            nutrient_density_score: round_to(density, 1),
            macronutrient_balance: balance,
            additive_risk_score: risk.score,
            beneficial_ingredients: risk.beneficial,
            concerning_ingredients: risk.concerning,
            health_impacts: impacts,
            findings: insights.findings,
            benefits: insights.benefits,
            concerns: insights.concerns,
            recommendations,
            overall_score: score,
            recommendation_level: level,
            micronutrients: micronutrient_snapshot(facts),
            ingredient_complexity_index: round_to(ingredients.len() as f64 / 5.0, 1),
            nutrient_profiling_score: round_to((density + balance.balance_score) / 2.0, 1),
            caloric_efficiency: caloric_efficiency(density, facts),
        }
    }

    /// Assessment of a product about which nothing is known. Used when
    /// scoring could not run.
    pub fn baseline(&self) -> ScienceAssessment {
        self.score(&NutrientMap::new(), &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::standards::NutrientKey;

    fn facts(entries: &[(NutrientKey, f64)]) -> NutrientMap {
        entries.iter().copied().collect()
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn formula_weights() {
        // 50 + 30 - 0 + 20 - 0 = 100
        assert_eq!(overall_score(20.0, 1, 100.0, 0), 100);
        // 50 + 10 - 30 + 8 - 15 = 23
        assert_eq!(overall_score(5.0, 4, 40.0, 50), 23);
        // 50 + 0 - 30 + 0 - 30 = -10 → 0
        assert_eq!(overall_score(0.0, 4, 0.0, 100), 0);
    }

    #[test]
    fn fractional_scores_truncate() {
        // 50 + 2.4 - 10 + 12 - 1.5 = 52.9 → 52
        assert_eq!(overall_score(1.2, 2, 60.0, 5), 52);
    }

    #[test]
    fn score_in_range_for_extremes() {
        let scorer = ScienceScorer::new();
        let cases = [
            (NutrientMap::new(), Vec::new()),
            (
                facts(&[(NutrientKey::Calories, 1.0), (NutrientKey::Protein, 100.0)]),
                list(&["Spinach"]),
            ),
            (
                facts(&[(NutrientKey::Calories, 2000.0), (NutrientKey::Sodium, 5000.0)]),
                list(&[
                    "Sodium Nitrite",
                    "BHA",
                    "BHT",
                    "Red Dye 40",
                    "High Fructose Corn Syrup",
                    "Partially Hydrogenated Oil",
                ]),
            ),
        ];
        for (f, ingredients) in cases {
            let assessment = scorer.score(&f, &ingredients);
            assert!(assessment.overall_score <= 100);
            assert_eq!(
                assessment.recommendation_level,
                RecommendationLevel::from_score(assessment.overall_score)
            );
        }
    }

    #[test]
    fn hfcs_pho_scenario() {
        let assessment = ScienceScorer::new().score(
            &NutrientMap::new(),
            &list(&["High Fructose Corn Syrup", "Partially Hydrogenated Soybean Oil"]),
        );
        assert!(assessment.additive_risk_score >= 45);
        assert_eq!(assessment.nova_class, 4);
        assert_eq!(assessment.processing_level, ProcessingLevel::UltraProcessed);
        assert_eq!(assessment.health_impacts.metabolic.label(), "CONCERNING (HFCS concerns)");
    }

    #[test]
    fn wholesome_product_scores_well() {
        let assessment = ScienceScorer::new().score(
            &facts(&[
                (NutrientKey::Calories, 150.0),
                (NutrientKey::Protein, 8.0),
                (NutrientKey::TotalFat, 4.0),
                (NutrientKey::TotalCarbs, 21.0),
                (NutrientKey::DietaryFiber, 6.0),
                (NutrientKey::Sodium, 10.0),
            ]),
            &list(&["Whole Grain Oats", "Almonds"]),
        );
        // density (32+12)/150*100 = 29.3 → +30; nova 1; balance 100 → +20
        assert_eq!(assessment.nova_class, 1);
        assert_eq!(assessment.overall_score, 100);
        assert_eq!(assessment.recommendation_level, RecommendationLevel::Excellent);
        assert!(assessment.recommendations[0].starts_with("Excellent choice"));
    }

    #[test]
    fn derived_metrics() {
        let assessment = ScienceScorer::new().score(
            &facts(&[(NutrientKey::Calories, 200.0), (NutrientKey::Protein, 5.0)]),
            &list(&["A", "B", "C", "D", "E", "F", "G"]),
        );
        // density 20/200*100 = 10
        assert_eq!(assessment.nutrient_density_score, 10.0);
        assert_eq!(assessment.ingredient_complexity_index, 1.4);
        assert_eq!(assessment.caloric_efficiency, 5.0);
        // protein 10% in range, fat 0% and carbs 0% out → 60
        assert_eq!(assessment.macronutrient_balance.balance_score, 60.0);
        assert_eq!(assessment.nutrient_profiling_score, 35.0);
    }

    #[test]
    fn deterministic() {
        let f = facts(&[(NutrientKey::Calories, 250.0), (NutrientKey::Sodium, 700.0)]);
        let ingredients = list(&["Flour", "Sugar", "Maltodextrin"]);
        let scorer = ScienceScorer::new();
        assert_eq!(scorer.score(&f, &ingredients), scorer.score(&f, &ingredients));
    }

    #[test]
    fn baseline_is_worst_case_processing_with_zero_density() {
        let baseline = ScienceScorer::new().baseline();
        assert_eq!(baseline.nova_class, 4);
        assert_eq!(baseline.nutrient_density_score, 0.0);
        assert_eq!(baseline.additive_risk_score, 0);
    }
}
