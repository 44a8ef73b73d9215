//! Ingredient vocabularies shared by the NOVA, risk and impact rules.

use crate::pipeline::parsing::text::contains_term;

/// Additives and ingredients with documented health concerns.
pub const HARMFUL_INGREDIENTS: [&str; 28] = [
    // Preservatives
    "sodium nitrite",
    "sodium nitrate",
    "bha",
    "bht",
    "tbhq",
    "potassium bromate",
    "sodium benzoate",
    "potassium sorbate",
    // Artificial colors
    "red dye 40",
    "yellow 6",
    "blue 1",
    "red 3",
    "yellow 5",
    "sunset yellow",
    "allura red",
    "tartrazine",
    // Artificial sweeteners
    "aspartame",
    "acesulfame potassium",
    "sucralose",
    "saccharin",
    // Fats
    "partially hydrogenated",
    "trans fat",
    "shortening",
    // Other
    "monosodium glutamate",
    "high fructose corn syrup",
    "phosphoric acid",
    "sodium phosphate",
    "carrageenan",
];

/// Harmful items weighted 15 instead of 5.
pub const HIGH_CONCERN_INGREDIENTS: [&str; 4] = ["sodium nitrite", "bha", "bht", "red dye 40"];

pub const BENEFICIAL_INGREDIENTS: [&str; 26] = [
    // Whole grains
    "whole wheat",
    "brown rice",
    "quinoa",
    "oats",
    "barley",
    "whole grain",
    "steel cut oats",
    // Fats
    "olive oil",
    "avocado oil",
    "coconut oil",
    "nuts",
    "seeds",
    "omega-3",
    "flaxseed",
    "chia seeds",
    // Sourcing and protein
    "organic",
    "grass fed",
    "free range",
    "wild caught",
    "plant protein",
    "legumes",
    "lentils",
    // Functional
    "probiotics",
    "prebiotics",
    "fiber",
    "antioxidants",
];

/// NOVA group 4 markers.
pub const ULTRA_PROCESSED_INDICATORS: [&str; 15] = [
    "high fructose corn syrup",
    "hydrogenated",
    "modified starch",
    "maltodextrin",
    "dextrose",
    "fructose",
    "glucose syrup",
    "artificial",
    "natural flavor",
    "preservative",
    "emulsifier",
    "stabilizer",
    "thickener",
    "colorant",
    "sweetener",
];

/// Processed culinary ingredient markers.
pub const PROCESSED_INDICATORS: [&str; 6] = ["oil", "sugar", "salt", "vinegar", "flour", "butter"];

pub const ANTI_INFLAMMATORY_INGREDIENTS: [&str; 3] = ["omega-3", "turmeric", "ginger"];

pub const ARTIFICIAL_COLORS: [&str; 3] = ["red dye 40", "yellow 6", "blue 1"];

/// Terms this short are matched on word edges so "bha" stays out of longer words.
const SHORT_TERM_CHARS: usize = 3;

/// All ingredients joined into one lowercase string for term scans.
pub fn ingredient_text(ingredients: &[String]) -> String {
    ingredients.join(" ").to_lowercase()
}

/// Whether `text` (already lowercase) mentions `term`. Longer terms match as
/// substrings so plurals ("sugars", "oils") still count.
pub fn mentions(text: &str, term: &str) -> bool {
    if term.len() <= SHORT_TERM_CHARS {
        contains_term(text, term)
    } else {
        text.contains(term)
    }
}

pub fn count_mentions(text: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| mentions(text, t)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_text_is_lowercase() {
        let text = ingredient_text(&["Sugar".into(), "Palm OIL".into()]);
        assert_eq!(text, "sugar palm oil");
    }

    #[test]
    fn short_terms_need_word_edges() {
        assert!(mentions("bha (preservative)", "bha"));
        assert!(!mentions("abhaya herb", "bha"));
        assert!(mentions("cane sugars", "sugar"));
    }

    #[test]
    fn high_concern_items_are_harmful() {
        for item in HIGH_CONCERN_INGREDIENTS {
            assert!(HARMFUL_INGREDIENTS.contains(&item));
        }
    }
}
