//! Table-driven nutrient amount extraction.
//!
//! Each nutrient has one or more patterns tried in order; the first pattern
//! that matches anywhere in the text decides that nutrient's amount. Calories
//! get their own pass because "calories from fat" and "calcium" both look
//! like calorie lines to a naive pattern.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use super::text::contains_term;
use crate::pipeline::standards::{NutrientKey, Unit, SODIUM_MG_PER_SALT_G};

// ──────────────────────────────────────────────
// Pattern table
// ──────────────────────────────────────────────

/// Separator between a nutrient label and its amount: `Sodium: <5mg`, `Fat less than 1g`.
const SEP: &str = r"\s*[:.]?\s*(?:<\s*|less\s+than\s+)?";
const NUM: &str = r"(\d+(?:\.\d+)?)";
const MASS: &str = r"\s*(g|mg|mcg|µg|ug)\b";

/// At least one of these must appear before full table parsing is attempted.
pub const TABLE_KEYWORDS: [&str; 6] = [
    "calories",
    "nutrition facts",
    "total fat",
    "protein",
    "carbs",
    "sodium",
];

struct NutrientPattern {
    key: NutrientKey,
    regex: Regex,
}

/// `label` followed by an amount with a mass unit, anywhere in the text.
fn inline(key: NutrientKey, label: &str) -> NutrientPattern {
    NutrientPattern {
        key,
        regex: Regex::new(&format!(r"(?i){label}{SEP}{NUM}{MASS}")).expect("valid regex"),
    }
}

/// Same as `inline` but the label must open a line. Used for bare words like
/// "Fat" or "Sugars" that also occur inside longer nutrient names.
fn line_start(key: NutrientKey, label: &str) -> NutrientPattern {
    NutrientPattern {
        key,
        regex: Regex::new(&format!(r"(?im)^\s*{label}{SEP}{NUM}{MASS}")).expect("valid regex"),
    }
}

fn raw(key: NutrientKey, pattern: &str) -> NutrientPattern {
    NutrientPattern {
        key,
        regex: Regex::new(pattern).expect("valid regex"),
    }
}

static NUTRIENT_PATTERNS: LazyLock<Vec<NutrientPattern>> = LazyLock::new(|| {
    use NutrientKey::*;
    vec![
        inline(TotalFat, r"\btotal\s+fats?"),
        line_start(TotalFat, r"fats?"),
        inline(SaturatedFat, r"\bsat(?:urated|\.)?\s+fats?"),
        line_start(SaturatedFat, r"(?:of\s+which\s+)?saturates"),
        inline(TransFat, r"\btrans\s+fats?"),
        inline(PolyunsaturatedFat, r"\bpolyunsaturated(?:\s+fats?)?"),
        inline(MonounsaturatedFat, r"\bmonounsaturated(?:\s+fats?)?"),
        inline(Cholesterol, r"\bcholest(?:erol|\.)?"),
        inline(Sodium, r"\bsodium"),
        inline(TotalCarbs, r"\btotal\s+carb(?:ohydrates?|s|\.)?"),
        inline(TotalCarbs, r"\bcarbohydrates?"),
        inline(TotalCarbs, r"\bcarbs"),
        inline(DietaryFiber, r"\bdietary\s+fib(?:er|re)"),
        inline(DietaryFiber, r"\bfib(?:er|re)"),
        inline(TotalSugars, r"\btotal\s+sugars?"),
        line_start(TotalSugars, r"(?:of\s+which\s+)?sugars?"),
        raw(
            AddedSugars,
            r"(?i)\bincludes?\s+(\d+(?:\.\d+)?)\s*(g)\s+added\s+sugars?",
        ),
        inline(AddedSugars, r"\badded\s+sugars?"),
        inline(Protein, r"\bproteins?"),
        inline(VitaminA, r"\b(?:vitamin|vit\.?)\s*a\b"),
        inline(VitaminC, r"\b(?:vitamin|vit\.?)\s*c\b"),
        inline(VitaminC, r"\bascorbic\s+acid"),
        inline(VitaminD, r"\b(?:vitamin|vit\.?)\s*d[23]?\b"),
        inline(VitaminE, r"\b(?:vitamin|vit\.?)\s*e\b"),
        inline(VitaminK, r"\b(?:vitamin|vit\.?)\s*k\b"),
        inline(Folate, r"\bfol(?:ate|ic\s+acid)"),
        inline(Niacin, r"\bniacin"),
        inline(Thiamine, r"\bthiamine?"),
        inline(Riboflavin, r"\briboflavin"),
        inline(VitaminB6, r"\b(?:vitamin|vit\.?)\s*b-?6\b"),
        inline(VitaminB12, r"\b(?:vitamin|vit\.?)\s*b-?12\b"),
        inline(Calcium, r"\bcalcium"),
        inline(Iron, r"\biron"),
        inline(Potassium, r"\bpotassium"),
        inline(Magnesium, r"\bmagnesium"),
        inline(Phosphorus, r"\bphosphorus"),
        inline(Zinc, r"\bzinc"),
        inline(Selenium, r"\bselenium"),
        inline(Copper, r"\bcopper"),
        inline(Manganese, r"\bmanganese"),
    ]
});

/// Calorie patterns, most explicit first.
static CALORIE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)calories?\s*(?:per\s+serving|from\s+fat)?\s*[:.]?\s*(\d+(?:\.\d+)?)",
        r"(?i)energy\s*[:.]?\s*(\d+(?:\.\d+)?)\s*(?:kcal|cal)\b",
        r"(?i)(?:^|[^\d,.])(\d+(?:\.\d+)?)\s*(?:kcal|cal|calories?)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static SALT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bsalt{SEP}{NUM}\s*(g|mg)\b")).expect("valid regex")
});

static CALORIE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:calories?|kcal|cal)\b").expect("valid regex"));

static CALORIE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:kcal|cal|calories?)\b").expect("valid regex")
});

static PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid regex"));

/// Order in which a `%` line is attributed to a nutrient. Specific names
/// precede the generic names they contain ("saturated fat" before "fat").
const DAILY_VALUE_LINE_ORDER: [NutrientKey; 32] = [
    NutrientKey::SaturatedFat,
    NutrientKey::TransFat,
    NutrientKey::PolyunsaturatedFat,
    NutrientKey::MonounsaturatedFat,
    NutrientKey::Cholesterol,
    NutrientKey::Sodium,
    NutrientKey::AddedSugars,
    NutrientKey::TotalSugars,
    NutrientKey::DietaryFiber,
    NutrientKey::TotalCarbs,
    NutrientKey::TotalFat,
    NutrientKey::Protein,
    NutrientKey::VitaminA,
    NutrientKey::VitaminC,
    NutrientKey::VitaminD,
    NutrientKey::VitaminE,
    NutrientKey::VitaminK,
    NutrientKey::Folate,
    NutrientKey::Niacin,
    NutrientKey::Thiamine,
    NutrientKey::Riboflavin,
    NutrientKey::VitaminB6,
    NutrientKey::VitaminB12,
    NutrientKey::Calcium,
    NutrientKey::Iron,
    NutrientKey::Potassium,
    NutrientKey::Magnesium,
    NutrientKey::Phosphorus,
    NutrientKey::Zinc,
    NutrientKey::Selenium,
    NutrientKey::Copper,
    NutrientKey::Manganese,
];

// ──────────────────────────────────────────────
// Scanners
// ──────────────────────────────────────────────

/// Whether the text looks like it carries a nutrient table at all.
pub fn has_table_keywords(text: &str) -> bool {
    let lower = text.to_lowercase();
    TABLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Full table pass: every nutrient pattern plus calories and salt.
/// Amounts are unvalidated and in canonical units.
pub fn scan_nutrient_table(text: &str) -> BTreeMap<NutrientKey, f64> {
    let mut amounts = BTreeMap::new();

    let (calories, from_fat) = scan_calories(text);
    if let Some(v) = calories {
        amounts.insert(NutrientKey::Calories, v);
    }
    if let Some(v) = from_fat {
        amounts.insert(NutrientKey::CaloriesFromFat, v);
    }

    for pattern in NUTRIENT_PATTERNS.iter() {
        if amounts.contains_key(&pattern.key) {
            continue;
        }
        if let Some(value) = first_amount(&pattern.regex, pattern.key, text) {
            amounts.insert(pattern.key, value);
        }
    }

    if !amounts.contains_key(&NutrientKey::Sodium) {
        if let Some(sodium) = scan_salt_as_sodium(text) {
            amounts.insert(NutrientKey::Sodium, sodium);
        }
    }

    amounts
}

/// Narrow pass for text without a nutrient table: only an explicit calorie
/// token on the same line as a number counts, and "calcium" lines never do.
pub fn scan_calories_only(text: &str) -> BTreeMap<NutrientKey, f64> {
    let mut amounts = BTreeMap::new();
    for line in text.lines() {
        let lower = line.to_lowercase();
        if !CALORIE_TOKEN.is_match(&lower) || lower.contains("calcium") {
            continue;
        }
        let Some(value) = CALORIE_AMOUNT
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        else {
            continue;
        };
        if NutrientKey::Calories.in_range(value) {
            amounts.insert(NutrientKey::Calories, value);
            break;
        }
    }
    amounts
}

/// Per-line `%` values attributed to the nutrient named on that line.
pub fn scan_inline_daily_values(text: &str) -> BTreeMap<NutrientKey, f64> {
    let mut percents = BTreeMap::new();
    for line in text.lines() {
        let Some(percent) = PERCENT
            .captures(line)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
        else {
            continue;
        };
        let lower = line.to_lowercase();
        let named = DAILY_VALUE_LINE_ORDER
            .iter()
            .find(|key| key.aliases().iter().any(|alias| contains_term(&lower, alias)));
        if let Some(key) = named {
            percents.entry(*key).or_insert(percent);
        }
    }
    percents
}

/// Returns `(calories, calories_from_fat)`.
fn scan_calories(text: &str) -> (Option<f64>, Option<f64>) {
    let mut calories = None;
    let mut from_fat = None;

    for regex in CALORIE_PATTERNS.iter() {
        for caps in regex.captures_iter(text) {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Ok(value) = number.as_str().parse::<f64>() else {
                continue;
            };
            let matched = whole.as_str().to_lowercase();
            if matched.contains("calcium") {
                continue;
            }
            let line = line_containing(text, whole.start()).to_lowercase();
            if line.contains("daily value") || line.contains("diet") {
                continue;
            }
            if matched.contains("from fat") {
                from_fat.get_or_insert(value);
            } else {
                calories.get_or_insert(value);
            }
        }
        if calories.is_some() {
            break;
        }
    }

    (calories, from_fat)
}

fn scan_salt_as_sodium(text: &str) -> Option<f64> {
    let caps = SALT.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let salt_mg = match caps.get(2)?.as_str().to_lowercase().as_str() {
        "mg" => value,
        _ => value * 1000.0,
    };
    Some(salt_mg / 1000.0 * SODIUM_MG_PER_SALT_G)
}

/// First match of `regex` converted into `key`'s canonical unit.
fn first_amount(regex: &Regex, key: NutrientKey, text: &str) -> Option<f64> {
    let caps = regex.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let factor = match caps.get(2) {
        Some(unit) => key.unit().factor_from(Unit::from_label(unit.as_str())?)?,
        None => 1.0,
    };
    Some(value * factor)
}

fn line_containing(text: &str, offset: usize) -> &str {
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = text[offset..].find('\n').map_or(text.len(), |i| offset + i);
    &text[start..end]
}
