//! Reading structured verdicts out of free-form model replies.

use super::types::{ClaimAdvice, NarrativeLevel, ProductNarrative};
use super::AdvisoryError;
use crate::pipeline::verification::ClaimStatus;

pub const MAX_SUMMARY_CHARS: usize = 300;
pub const MAX_INSIGHTS: usize = 3;
pub const MAX_CONCERNS: usize = 3;
pub const MAX_TIPS: usize = 2;

/// Lines this short are headings or noise.
const MIN_LINE_CHARS: usize = 10;

const DEFAULT_TIPS: [&str; 2] = ["Consume in moderation", "Consider healthier alternatives"];

const INSIGHT_WORDS: [&str; 4] = ["benefit", "positive", "good", "healthy"];
const CONCERN_WORDS: [&str; 4] = ["concern", "risk", "avoid", "harmful"];
const TIP_WORDS: [&str; 4] = ["recommend", "suggest", "should", "consider"];

/// Status keyword table, checked in order.
const STATUS_WORDS: [(ClaimStatus, [&str; 2]); 3] = [
    (ClaimStatus::Verified, ["verified", "accurate"]),
    (ClaimStatus::Misleading, ["misleading", "deceptive"]),
    (ClaimStatus::False, ["false", "contradicted"]),
];

/// Map a claim reply to a status; the reply itself is the explanation.
pub fn interpret_claim_reply(reply: &str) -> Result<ClaimAdvice, AdvisoryError> {
    let text = reply.trim();
    if text.is_empty() {
        return Err(AdvisoryError::EmptyResponse);
    }
    let lower = text.to_lowercase();
    let status = STATUS_WORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map_or(ClaimStatus::Unknown, |(status, _)| *status);

    Ok(ClaimAdvice {
        status,
        explanation: text.to_string(),
    })
}

/// Classify a product narrative into level, insights, concerns and tips.
pub fn interpret_product_reply(reply: &str) -> Result<ProductNarrative, AdvisoryError> {
    let text = reply.trim();
    if text.is_empty() {
        return Err(AdvisoryError::EmptyResponse);
    }

    let upper = text.to_uppercase();
    let level = if upper.contains("EXCELLENT") || upper.contains("GOOD") {
        NarrativeLevel::Good
    } else if upper.contains("POOR") || upper.contains("AVOID") {
        NarrativeLevel::Avoid
    } else {
        NarrativeLevel::Moderate
    };

    let mut insights = Vec::new();
    let mut concerns = Vec::new();
    let mut tips = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.chars().count() <= MIN_LINE_CHARS {
            continue;
        }
        let lower = line.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&INSIGHT_WORDS) {
            insights.push(line.to_string());
        } else if has(&CONCERN_WORDS) {
            concerns.push(line.to_string());
        } else if has(&TIP_WORDS) {
            tips.push(line.to_string());
        }
    }
    insights.truncate(MAX_INSIGHTS);
    concerns.truncate(MAX_CONCERNS);
    tips.truncate(MAX_TIPS);
    if tips.is_empty() {
        tips = DEFAULT_TIPS.iter().map(|t| t.to_string()).collect();
    }

    Ok(ProductNarrative {
        level,
        summary: text.chars().take(MAX_SUMMARY_CHARS).collect(),
        concerns,
        tips,
        insights,
        full_text: text.to_string(),
    })
}
