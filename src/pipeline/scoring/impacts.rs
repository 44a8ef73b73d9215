use super::types::{HealthImpacts, ImpactAssessment, ImpactRating};
use super::vocabulary::{
    count_mentions, ingredient_text, ANTI_INFLAMMATORY_INGREDIENTS, ARTIFICIAL_COLORS,
};
use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::standards::NutrientKey;

const HIGH_SODIUM_MG: f64 = 500.0;
const HIGH_SATURATED_FAT_G: f64 = 5.0;
const HIGH_SUGARS_G: f64 = 15.0;
const SUPPORTIVE_FIBER_G: f64 = 3.0;

fn amount(facts: &NutrientMap, key: NutrientKey) -> f64 {
    facts.get(&key).copied().unwrap_or(0.0)
}

/// Coarse per-system impact ratings from nutrient thresholds and ingredient flags.
pub fn assess_health_impacts(facts: &NutrientMap, ingredients: &[String]) -> HealthImpacts {
    let text = ingredient_text(ingredients);
    HealthImpacts {
        cardiovascular: cardiovascular(facts),
        metabolic: metabolic(facts, &text),
        digestive: digestive(facts, &text),
        inflammatory: inflammatory(&text),
    }
}

fn cardiovascular(facts: &NutrientMap) -> ImpactAssessment {
    let mut factors = Vec::new();
    if amount(facts, NutrientKey::Sodium) > HIGH_SODIUM_MG {
        factors.push("high sodium".to_string());
    }
    if amount(facts, NutrientKey::SaturatedFat) > HIGH_SATURATED_FAT_G {
        factors.push("high saturated fat".to_string());
    }
    let rating = match factors.len() {
        0 => ImpactRating::LowRisk,
        1 => ImpactRating::ModerateRisk,
        _ => ImpactRating::HighRisk,
    };
    ImpactAssessment::new(rating, factors)
}

fn metabolic(facts: &NutrientMap, text: &str) -> ImpactAssessment {
    let mut factors = Vec::new();
    if amount(facts, NutrientKey::TotalSugars) > HIGH_SUGARS_G {
        factors.push("high sugar content".to_string());
    }
    if text.contains("high fructose corn syrup") {
        factors.push("HFCS concerns".to_string());
    }
    let rating = if factors.is_empty() {
        ImpactRating::Favorable
    } else {
        ImpactRating::Concerning
    };
    ImpactAssessment::new(rating, factors)
}

fn digestive(facts: &NutrientMap, text: &str) -> ImpactAssessment {
    if text.contains("artificial sweetener") {
        return ImpactAssessment::new(
            ImpactRating::PotentiallyDisruptive,
            vec!["artificial sweetener".to_string()],
        );
    }
    let rating = if amount(facts, NutrientKey::DietaryFiber) >= SUPPORTIVE_FIBER_G {
        ImpactRating::Supportive
    } else {
        ImpactRating::Neutral
    };
    ImpactAssessment::new(rating, Vec::new())
}

fn inflammatory(text: &str) -> ImpactAssessment {
    let anti = count_mentions(text, &ANTI_INFLAMMATORY_INGREDIENTS);

    let mut pro = Vec::new();
    if text.contains("trans fat") {
        pro.push("trans fats".to_string());
    }
    if ARTIFICIAL_COLORS.iter().any(|c| text.contains(c)) {
        pro.push("artificial colors".to_string());
    }

    if anti > pro.len() {
        ImpactAssessment::new(ImpactRating::AntiInflammatory, Vec::new())
    } else if !pro.is_empty() {
        ImpactAssessment::new(ImpactRating::ProInflammatory, pro)
    } else {
        ImpactAssessment::new(ImpactRating::Neutral, Vec::new())
    }
}
