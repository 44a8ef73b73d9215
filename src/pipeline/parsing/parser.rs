use super::claims::parse_claims;
use super::ingredients::{find_ingredient_section, parse_allergens, parse_ingredients};
use super::nutrients::{
    has_table_keywords, scan_calories_only, scan_inline_daily_values, scan_nutrient_table,
};
use super::serving::parse_serving_info;
use super::types::StructuredNutritionData;
use super::validation::validate_nutrients;

/// Converts free label text into a validated nutrition record.
///
/// Stateless: `parse` is a pure function of its input and never fails.
/// Unparseable text yields empty collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct NutritionFactsParser;

impl NutritionFactsParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, text: &str) -> StructuredNutritionData {
        if text.trim().is_empty() {
            return StructuredNutritionData::empty(text);
        }

        let _span = tracing::info_span!("parse_label", chars = text.len()).entered();

        // 1. Nutrient amounts: full table only when the text looks like one
        let full_table = has_table_keywords(text);
        let (raw_amounts, raw_percents) = if full_table {
            (scan_nutrient_table(text), scan_inline_daily_values(text))
        } else {
            tracing::debug!("No nutrient table keywords, calorie-only scan");
            (scan_calories_only(text), Default::default())
        };

        // 2. Range validation + %DV back-fill
        let validated = validate_nutrients(raw_amounts, raw_percents);

        // 3. Serving, ingredients, allergens
        let serving = parse_serving_info(text);
        let ingredients = parse_ingredients(text);
        let allergens = parse_allergens(text);

        // 4. Claims, read outside the ingredient list
        let claims = match find_ingredient_section(text) {
            Some(range) => {
                let mut outside = String::with_capacity(text.len());
                outside.push_str(&text[..range.start]);
                outside.push('\n');
                outside.push_str(&text[range.end..]);
                parse_claims(&outside)
            }
            None => parse_claims(text),
        };

        tracing::info!(
            nutrients = validated.amounts.len(),
            ingredients = ingredients.len(),
            claims = claims.len(),
            warnings = validated.warnings.len(),
            full_table,
            "Label parsed"
        );

        StructuredNutritionData {
            nutrition_facts: validated.amounts,
            daily_values: validated.daily_values,
            serving,
            ingredients,
            allergens,
            claims,
            raw_text: text.to_string(),
            warnings: validated.warnings,
        }
    }
}

/// Shorthand for `NutritionFactsParser::new().parse(text)`.
pub fn parse_label(text: &str) -> StructuredNutritionData {
    NutritionFactsParser::new().parse(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::standards::NutrientKey;

    const CEREAL: &str = "Nutrition Facts\n\
        8 servings per container\n\
        Serving Size 3/4 cup (28g)\n\
        Calories 110\n\
        Total Fat 1g 1%\n\
        Sodium 140mg 6%\n\
        Total Carbohydrate 23g 8%\n\
        Dietary Fiber 5g 18%\n\
        Total Sugars 1g\n\
        Protein 3g\n\
        Iron 8mg 45%\n\
        INGREDIENTS: Whole Grain Oats, Corn Starch, Salt, Natural Flavor.\n\
        Contains: Wheat.\n\
        Low fat. High fiber. Whole grain.";

    #[test]
    fn parses_complete_label() {
        let data = parse_label(CEREAL);
        assert_eq!(data.fact(NutrientKey::Calories), Some(110.0));
        assert_eq!(data.fact(NutrientKey::TotalFat), Some(1.0));
        assert_eq!(data.fact(NutrientKey::DietaryFiber), Some(5.0));
        assert_eq!(data.fact(NutrientKey::Iron), Some(8.0));
        assert_eq!(data.serving.serving_size.as_deref(), Some("3/4 cup"));
        assert_eq!(data.serving.servings_per_container, Some(8.0));
        assert_eq!(
            data.ingredients,
            vec!["Whole Grain Oats", "Corn Starch", "Salt", "Natural Flavor"]
        );
        assert_eq!(data.allergens, vec!["Wheat"]);
        assert_eq!(data.claims, vec!["Low Fat", "High Fiber", "Whole Grain"]);
        assert!(data.warnings.is_empty());
    }

    #[test]
    fn ingredient_words_are_not_claims() {
        let data = parse_label(CEREAL);
        assert!(!data.claims.iter().any(|c| c == "Natural"), "{:?}", data.claims);
    }

    #[test]
    fn inline_and_backfilled_daily_values() {
        let data = parse_label(CEREAL);
        assert_eq!(data.daily_values.get(&NutrientKey::Iron), Some(&45.0));
        // Protein 3g has no printed %DV: 3 / 50 = 6%
        assert_eq!(data.daily_values.get(&NutrientKey::Protein), Some(&6.0));
        // Calories 110 / 2000 = 5.5%
        assert_eq!(data.daily_values.get(&NutrientKey::Calories), Some(&5.5));
    }

    #[test]
    fn calories_not_taken_from_serving_size() {
        let data = parse_label("Calories 120\nTotal Fat 3g\nServing Size 1 cup (240 ml)");
        assert_eq!(data.fact(NutrientKey::Calories), Some(120.0));
        assert_eq!(data.fact(NutrientKey::TotalFat), Some(3.0));
    }

    #[test]
    fn calcium_never_becomes_calories() {
        let data = parse_label("Ingredients: Water\nCalcium 20 mg\nBest Before: 2026");
        assert_eq!(data.fact(NutrientKey::Calories), None);
    }

    #[test]
    fn calories_from_fat_tracked_separately() {
        let data = parse_label("Nutrition Facts\nCalories 120\nCalories from fat 30\n");
        assert_eq!(data.fact(NutrientKey::Calories), Some(120.0));
        assert_eq!(data.fact(NutrientKey::CaloriesFromFat), Some(30.0));
    }

    #[test]
    fn energy_kcal_line() {
        let data = parse_label("Per serving: Energy 350 kcal, Protein 5 g, Sodium 200 mg");
        assert_eq!(data.fact(NutrientKey::Calories), Some(350.0));
    }

    #[test]
    fn number_then_cal_without_table() {
        let data = parse_label("Per bar: 120 cal");
        assert_eq!(data.fact(NutrientKey::Calories), Some(120.0));
    }

    #[test]
    fn implausible_value_dropped_and_reported() {
        let data = parse_label("Nutrition Facts\nCalories 120\nSodium 9000mg");
        assert_eq!(data.fact(NutrientKey::Sodium), None);
        assert_eq!(data.warnings.len(), 1);
        assert_eq!(data.warnings[0].key, NutrientKey::Sodium);
    }

    #[test]
    fn every_kept_value_in_range() {
        let data = parse_label(CEREAL);
        for (key, value) in &data.nutrition_facts {
            assert!(key.in_range(*value), "{key:?}={value}");
        }
    }

    #[test]
    fn empty_and_garbage_input() {
        let empty = parse_label("");
        assert!(empty.nutrition_facts.is_empty());
        assert!(empty.ingredients.is_empty());
        assert!(empty.claims.is_empty());

        let garbage = parse_label("@@##\u{0}!!");
        assert!(garbage.nutrition_facts.is_empty());
        assert!(!garbage.has_content());
    }

    #[test]
    fn parse_is_pure() {
        let parser = NutritionFactsParser::new();
        let first = parser.parse(CEREAL);
        let second = parser.parse(CEREAL);
        assert_eq!(first, second);
    }

    #[test]
    fn raw_text_preserved() {
        let data = parse_label(CEREAL);
        assert_eq!(data.raw_text, CEREAL);
    }
}
