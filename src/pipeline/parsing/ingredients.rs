//! Ingredient list and allergen statement extraction.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::text::{contains_term, title_case};

/// Upper bound on returned ingredients.
pub const MAX_INGREDIENTS: usize = 25;

/// Scanned only when the label has no "Ingredients:" anchor.
const COMMON_INGREDIENTS: [&str; 14] = [
    "butter",
    "sugar",
    "flour",
    "eggs",
    "milk",
    "chocolate",
    "vanilla",
    "salt",
    "baking powder",
    "cocoa",
    "oil",
    "water",
    "cream",
    "nuts",
];

pub const COMMON_ALLERGENS: [&str; 12] = [
    "milk",
    "eggs",
    "fish",
    "shellfish",
    "tree nuts",
    "peanuts",
    "wheat",
    "soy",
    "sesame",
    "dairy",
    "gluten",
    "nuts",
];

static INGREDIENTS_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bingredients?(?:\s+list)?\s*[:.]?\s*").expect("valid regex")
});

/// Where an ingredient list stops even mid-line.
static INGREDIENTS_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bcontains?\s*[:.]|\ballergens?\b|\bmay\s+contain\b|\bnutrition\b")
        .expect("valid regex")
});

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("valid regex"));

static ITEM_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,;]").expect("valid regex"));

static ALLERGEN_STATEMENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bmay\s+contain\s*[:.]?\s*([^.\n]+)",
        r"(?i)\bcontains?\s*[:.]?\s*([^.\n]+)",
        r"(?i)\ballergens?\s*[:.]?\s*([^.\n]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Byte range of the ingredient list body, if the label has one.
///
/// The list starts after the anchor and continues onto following lines only
/// while the previous line ends mid-list (comma, semicolon, open bracket) or
/// the next line starts lowercase. It stops early at an allergen or
/// nutrition heading.
pub fn find_ingredient_section(text: &str) -> Option<Range<usize>> {
    let anchor = INGREDIENTS_ANCHOR.find(text)?;
    let start = anchor.end();
    let rest = &text[start..];

    let mut end = 0;
    let mut prev_line: Option<&str> = None;
    for line in rest.split_inclusive('\n') {
        let content = line.trim();
        if let Some(prev) = prev_line {
            let continues = prev.ends_with([',', ';', '(', '['])
                || content.chars().next().is_some_and(char::is_lowercase);
            if content.is_empty() || !continues {
                break;
            }
        }
        end += line.len();
        prev_line = Some(content);
    }

    let body = &rest[..end];
    let body_end = INGREDIENTS_END.find(body).map_or(end, |m| m.start());
    let trimmed_end = body[..body_end].trim_end().len();
    if trimmed_end == 0 {
        return None;
    }
    Some(start..start + trimmed_end)
}

/// Ingredient names in label order, Title-cased, parentheticals removed.
pub fn parse_ingredients(text: &str) -> Vec<String> {
    if let Some(range) = find_ingredient_section(text) {
        let body = PARENTHETICAL.replace_all(&text[range], "");
        let items: Vec<String> = ITEM_SPLIT
            .split(&body)
            .map(|item| {
                item.split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .trim_matches(|c: char| c == '.' || c == '*' || c == ':')
                    .trim()
                    .to_string()
            })
            .filter(|item| item.chars().count() > 1)
            .map(|item| title_case(&item))
            .take(MAX_INGREDIENTS)
            .collect();
        if !items.is_empty() {
            return items;
        }
    }

    let lower = text.to_lowercase();
    COMMON_INGREDIENTS
        .iter()
        .filter(|word| lower.contains(*word))
        .map(|word| title_case(word))
        .take(MAX_INGREDIENTS)
        .collect()
}

/// Allergens named in "Contains", "Allergens" or "May contain" statements.
/// Title-cased, de-duplicated, sorted.
pub fn parse_allergens(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for statement in ALLERGEN_STATEMENTS.iter() {
        for caps in statement.captures_iter(text) {
            let Some(body) = caps.get(1) else { continue };
            let mut body = body.as_str().to_lowercase();
            for allergen in COMMON_ALLERGENS {
                if contains_term(&body, allergen) {
                    let name = title_case(allergen);
                    if !found.contains(&name) {
                        found.push(name);
                    }
                    // "tree nuts" must not also count as plain "nuts"
                    body = body.replace(allergen, " ");
                }
            }
        }
    }
    found.sort();
    found
}
