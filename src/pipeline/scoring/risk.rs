use super::types::IngredientRisk;
use super::vocabulary::{
    ingredient_text, mentions, BENEFICIAL_INGREDIENTS, HARMFUL_INGREDIENTS,
    HIGH_CONCERN_INGREDIENTS,
};
use crate::pipeline::parsing::text::title_case;

const HIGH_CONCERN_PENALTY: u32 = 15;
const HARMFUL_PENALTY: u32 = 5;
const HFCS_PENALTY: u32 = 20;
const PARTIALLY_HYDROGENATED_PENALTY: u32 = 25;
const LONG_LIST_PENALTY: u32 = 10;
/// Ingredient counts above this suggest industrial formulation.
const LONG_LIST_THRESHOLD: usize = 20;
const MAX_RISK: u32 = 100;
/// Cap on each reported ingredient list.
const MAX_LISTED: usize = 10;

/// Scan ingredients for harmful and beneficial terms and total the risk.
pub fn assess_ingredient_risk(ingredients: &[String]) -> IngredientRisk {
    if ingredients.is_empty() {
        return IngredientRisk::default();
    }
    let text = ingredient_text(ingredients);

    let beneficial: Vec<String> = BENEFICIAL_INGREDIENTS
        .iter()
        .filter(|term| mentions(&text, term))
        .map(|term| title_case(term))
        .collect();

    let mut score = 0u32;
    let mut concerning = Vec::new();
    for term in HARMFUL_INGREDIENTS.iter().filter(|t| mentions(&text, t)) {
        concerning.push(title_case(term));
        score += if HIGH_CONCERN_INGREDIENTS.contains(term) {
            HIGH_CONCERN_PENALTY
        } else {
            HARMFUL_PENALTY
        };
    }

    if text.contains("high fructose corn syrup") {
        score += HFCS_PENALTY;
    }
    if text.contains("partially hydrogenated") {
        score += PARTIALLY_HYDROGENATED_PENALTY;
    }
    if ingredients.len() > LONG_LIST_THRESHOLD {
        score += LONG_LIST_PENALTY;
    }

    IngredientRisk {
        beneficial: beneficial.into_iter().take(MAX_LISTED).collect(),
        concerning: concerning.into_iter().take(MAX_LISTED).collect(),
        score: score.min(MAX_RISK) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn hfcs_and_pho_reach_forty_five() {
        let risk = assess_ingredient_risk(&list(&[
            "High Fructose Corn Syrup",
            "Partially Hydrogenated Soybean Oil",
        ]));
        // 5 + 5 for the harmful hits, then +20 and +25
        assert_eq!(risk.score, 55);
        assert!(risk.score >= 45);
        assert_eq!(
            risk.concerning,
            vec!["Partially Hydrogenated", "High Fructose Corn Syrup"]
        );
    }

    #[test]
    fn high_concern_weighting() {
        let risk = assess_ingredient_risk(&list(&["Pork", "Sodium Nitrite"]));
        assert_eq!(risk.score, 15);
        let risk = assess_ingredient_risk(&list(&["Water", "Sodium Benzoate"]));
        assert_eq!(risk.score, 5);
    }

    #[test]
    fn long_lists_penalized() {
        let ingredients: Vec<String> = (0..21).map(|i| format!("plant{i}")).collect();
        assert_eq!(assess_ingredient_risk(&ingredients).score, 10);
    }

    #[test]
    fn capped_at_one_hundred() {
        let ingredients = list(&[
            "Sodium Nitrite",
            "BHA",
            "BHT",
            "Red Dye 40",
            "Yellow 6",
            "Blue 1",
            "High Fructose Corn Syrup",
            "Partially Hydrogenated Oil",
            "Aspartame",
        ]);
        assert_eq!(assess_ingredient_risk(&ingredients).score, 100);
    }

    #[test]
    fn beneficial_terms_listed() {
        let risk = assess_ingredient_risk(&list(&["Organic Whole Grain Oats", "Chia Seeds"]));
        assert!(risk.beneficial.contains(&"Oats".to_string()));
        assert!(risk.beneficial.contains(&"Organic".to_string()));
        assert!(risk.beneficial.contains(&"Chia Seeds".to_string()));
        assert_eq!(risk.score, 0);
    }

    #[test]
    fn empty_list_is_riskless() {
        assert_eq!(assess_ingredient_risk(&[]), IngredientRisk::default());
    }
}
