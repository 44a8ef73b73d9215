use std::sync::LazyLock;

use regex::Regex;

use super::text::{normalize_phrase, title_case};

/// Upper bound on returned claims.
pub const MAX_CLAIMS: usize = 15;

/// Marketing and regulatory phrases, each with a single capture of the claim text.
static CLAIM_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(fat[- ]free|low[- ]fat|reduced[- ]fat|light)\b",
        r"(?i)\b(sugar[- ]free|no sugar added|no added sugars?|no sugar|low[- ]sugar|reduced[- ]sugar)\b",
        r"(?i)\b(sodium[- ]free|low[- ]sodium|reduced[- ]sodium|no salt|no added salt)\b",
        r"(?i)\b(high[- ]fib(?:er|re)|(?:good|excellent) source of fib(?:er|re))\b",
        r"(?i)\b(organic|all natural|100% natural|natural)\b",
        r"(?i)\b(non[- ]?gmo|gmo[- ]free)\b",
        r"(?i)\b(gluten[- ]free|dairy[- ]free|lactose[- ]free)\b",
        r"(?i)\b((?:fortified|enriched) with [^,.\n]+)",
        r"(?i)\b(whole grains?|multigrain)\b",
        r"(?i)\b(no artificial(?: [a-z]+)?|no preservatives|no additives)\b",
        r"(?i)\b(kosher|halal)\b",
        r"(?i)\b(vegan|vegetarian)\b",
        r"(?i)(\d+% daily value of [^,.\n]+)",
        r"(?i)\b((?:excellent|good) source of [^,.\n]+)",
        r"(?i)\b(high in [^,.\n]+)",
        r"(?i)\b(low in [^,.\n]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Claim phrases in order of appearance, Title-cased, de-duplicated.
///
/// Callers pass label text with the ingredient list removed so that
/// "natural flavor" in an ingredient list is not read as a claim.
pub fn parse_claims(text: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = Vec::new();
    for pattern in CLAIM_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            if let Some(m) = caps.get(1) {
                let phrase = m.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
                hits.push((m.start(), phrase));
            }
        }
    }
    hits.sort_by_key(|(pos, _)| *pos);

    let mut seen: Vec<String> = Vec::new();
    let mut claims = Vec::new();
    for (_, phrase) in hits {
        let key = normalize_phrase(&phrase);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        claims.push(title_case(&phrase));
        if claims.len() == MAX_CLAIMS {
            break;
        }
    }
    claims
}
