use std::sync::LazyLock;

use regex::Regex;

use super::types::ServingInfo;

static SERVING_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:serving|portion)\s+size\s*[:.]?\s*([^\n(]+)").expect("valid regex")
});

static SERVINGS_PER_CONTAINER: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(?:servings?|portions?)\s+per\s+(?:container|package|pkg|pack)\s*[:.]?\s*(?:about\s+)?(\d+(?:\.\d+)?)",
        r"(?i)(?:about\s+)?(\d+(?:\.\d+)?)\s+(?:servings?|portions?)\s+per\s+(?:container|package|pkg|pack)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Serving size text (up to any parenthetical) and servings per container.
pub fn parse_serving_info(text: &str) -> ServingInfo {
    let serving_size = SERVING_SIZE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().trim_end_matches([',', ';']).trim().to_string())
        .filter(|s| !s.is_empty());

    let servings_per_container = SERVINGS_PER_CONTAINER.iter().find_map(|re| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    });

    ServingInfo {
        serving_size,
        servings_per_container,
    }
}
