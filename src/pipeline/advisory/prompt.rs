use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::standards::{format_amount, NutrientKey};

pub const CLAIM_SYSTEM_PROMPT: &str =
    "You are a nutrition scientist who verifies product claims against nutrition facts and FDA guidelines.";

pub const PRODUCT_SYSTEM_PROMPT: &str = r#"
You are a food scientist and registered dietitian specializing in nutritional
biochemistry, food technology and public health nutrition. You give evidence-based
analysis using NOVA food classification and established dietary guidelines.
Be quantitative and cite the guideline behind every judgement.
"#;

/// Ingredients beyond this are left out of the product prompt.
const PROMPT_INGREDIENT_LIMIT: usize = 20;

/// `- Total Fat: 3g` lines in canonical key order.
fn facts_block(facts: &NutrientMap) -> String {
    if facts.is_empty() {
        return "- (no nutrition facts recognized)".to_string();
    }
    facts
        .iter()
        .map(|(key, value)| {
            format!("- {}: {}{}", key.display_name(), format_amount(*value), key.unit().as_str())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_claim_prompt(claim: &str, facts: &NutrientMap) -> String {
    format!(
        r#"Analyze this health claim against the nutrition facts:

Claim: "{claim}"
Nutrition Facts:
{facts}

Based on FDA regulations and nutritional science, is this claim:
1. Verified (accurate and supported by data)
2. Misleading (technically true but potentially deceptive)
3. False (contradicted by the data)

Provide a brief explanation with scientific reasoning."#,
        facts = facts_block(facts),
    )
}

pub fn build_product_prompt(facts: &NutrientMap, ingredients: &[String], raw_text: &str) -> String {
    let amount = |key: NutrientKey| {
        facts
            .get(&key)
            .map_or_else(|| "unknown".to_string(), |v| format_amount(*v))
    };
    let ingredient_list = if ingredients.is_empty() {
        "(not recognized)".to_string()
    } else {
        ingredients
            .iter()
            .take(PROMPT_INGREDIENT_LIMIT)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        r#"Conduct a scientific analysis of this food product.

PRODUCT NUTRITIONAL PROFILE:
Calories: {calories}
Total Fat: {fat}g | Saturated Fat: {sat}g
Sodium: {sodium}mg | Total Carbs: {carbs}g
Dietary Fiber: {fiber}g | Total Sugars: {sugars}g | Protein: {protein}g

COMPLETE NUTRITION DATA:
{facts}

INGREDIENT LIST: {ingredient_list}

<label>
{raw_text}
</label>

Cover, with headings:
1. Nutrient density and macronutrient distribution against AMDR.
2. Glycemic, lipid and blood-pressure implications.
3. NOVA classification and notable additives.
4. Cardiovascular, metabolic, inflammatory and digestive considerations.
5. Population-specific suitability.
6. An overall rating: EXCELLENT, GOOD, MODERATE, POOR or AVOID.
7. Practical recommendations on portion, frequency and alternatives."#,
        calories = amount(NutrientKey::Calories),
        fat = amount(NutrientKey::TotalFat),
        sat = amount(NutrientKey::SaturatedFat),
        sodium = amount(NutrientKey::Sodium),
        carbs = amount(NutrientKey::TotalCarbs),
        fiber = amount(NutrientKey::DietaryFiber),
        sugars = amount(NutrientKey::TotalSugars),
        protein = amount(NutrientKey::Protein),
        facts = facts_block(facts),
        raw_text = raw_text.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_prompt_embeds_claim_and_facts() {
        let facts: NutrientMap = [(NutrientKey::TotalFat, 3.0)].into_iter().collect();
        let prompt = build_claim_prompt("Heart Healthy", &facts);
        assert!(prompt.contains("Claim: \"Heart Healthy\""));
        assert!(prompt.contains("- Total Fat: 3g"));
    }

    #[test]
    fn product_prompt_marks_missing_values() {
        let prompt = build_product_prompt(&NutrientMap::new(), &[], "");
        assert!(prompt.contains("Calories: unknown"));
        assert!(prompt.contains("INGREDIENT LIST: (not recognized)"));
    }

    #[test]
    fn product_prompt_limits_ingredients() {
        let ingredients: Vec<String> = (0..30).map(|i| format!("item{i}")).collect();
        let prompt = build_product_prompt(&NutrientMap::new(), &ingredients, "label");
        assert!(prompt.contains("item19"));
        assert!(!prompt.contains("item20"));
    }
}
