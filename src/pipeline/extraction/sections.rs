// Heuristic line partitioner for recognized label text. Used only when the
// winning tier supplied no structured data; the parser never depends on it.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::pipeline::parsing::text::contains_term;

/// Opens the ingredient capture. Matched on the original line so the offset
/// is always a char boundary of that line.
static INGREDIENT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ingredient").expect("valid regex"));

/// Lines that belong to the nutrition panel.
const NUTRITION_KEYWORDS: &[&str] = &[
    "calories",
    "fat",
    "protein",
    "carbohydrate",
    "sugars",
    "sodium",
    "fiber",
    "serving",
    "daily value",
    "per 100",
];

/// Marketing vocabulary marking a claim line.
const CLAIM_KEYWORDS: &[&str] = &[
    "free",
    "no added",
    "low",
    "reduced",
    "organic",
    "natural",
    "non-gmo",
    "high in",
    "source of",
    "whole grain",
];

/// Best-effort partition of label lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMap {
    pub ingredients_text: String,
    pub nutrition_text: String,
    pub claims_text: String,
    pub other_text: String,
}

impl SectionMap {
    pub fn is_empty(&self) -> bool {
        self.ingredients_text.is_empty()
            && self.nutrition_text.is_empty()
            && self.claims_text.is_empty()
            && self.other_text.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Ingredients,
    Nutrition,
    Claims,
    Other,
}

/// Partition lines into ingredients, nutrition, claims and other.
///
/// An "ingredient" line opens the ingredient capture, which continues
/// across wrapped lines (a trailing comma always wraps) until a line
/// matches another section or starts a "Contains" statement. Nutrition
/// keywords take priority over claim keywords ("Low fat" on a panel row
/// stays with the panel only when it carries a number).
pub fn split_sections(text: &str) -> SectionMap {
    let mut ingredients: Vec<String> = Vec::new();
    let mut nutrition: Vec<&str> = Vec::new();
    let mut claims: Vec<&str> = Vec::new();
    let mut other: Vec<&str> = Vec::new();
    let mut capturing_ingredients = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();

        if let Some(marker) = INGREDIENT_MARKER.find(line) {
            capturing_ingredients = true;
            let rest = &line[marker.start()..];
            let body = match rest.find(':') {
                Some(colon) => rest[colon + 1..].trim(),
                None => rest
                    .split_once(char::is_whitespace)
                    .map(|(_, b)| b.trim())
                    .unwrap_or(""),
            };
            if !body.is_empty() {
                ingredients.push(body.to_string());
            }
            continue;
        }

        let section = classify_line(&lower);
        if capturing_ingredients {
            let wrapped = ingredients
                .last()
                .is_some_and(|prev| prev.ends_with(',') || prev.ends_with(';'));
            if (wrapped || section == Section::Other) && !lower.starts_with("contains") {
                ingredients.push(line.to_string());
                continue;
            }
            capturing_ingredients = false;
        }

        match section {
            Section::Nutrition => nutrition.push(line),
            Section::Claims => claims.push(line),
            Section::Other | Section::Ingredients => other.push(line),
        }
    }

    SectionMap {
        ingredients_text: ingredients.join(" "),
        nutrition_text: nutrition.join("\n"),
        claims_text: claims.join("\n"),
        other_text: other.join("\n"),
    }
}

fn classify_line(lower: &str) -> Section {
    let has_number = lower.chars().any(|c| c.is_ascii_digit());
    let nutrition = NUTRITION_KEYWORDS.iter().any(|k| contains_term(lower, k));
    let claim = CLAIM_KEYWORDS.iter().any(|k| lower.contains(k));

    match (nutrition, claim) {
        (true, true) if has_number => Section::Nutrition,
        (_, true) => Section::Claims,
        (true, false) => Section::Nutrition,
        (false, false) => Section::Other,
    }
}
