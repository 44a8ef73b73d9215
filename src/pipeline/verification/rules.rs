//! Threshold rules for the regulated nutrient content claims.

use super::types::{ClaimStatus, ClaimVerification};
use crate::pipeline::parsing::text::normalize_phrase;
use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::standards::{claim_threshold, format_amount, ClaimKind, Comparator};

/// Claim phrasings, checked in order on the normalized claim text.
/// "fat free" precedes "low fat" so "low fat, fat free" resolves to the stricter rule.
/// "No sugar added" is a different claim from "sugar free" and has no threshold
/// rule, so it is listed ahead of "no sugar" with no kind.
const CLAIM_DISPATCH: [(&[&str], Option<ClaimKind>); 6] = [
    (&["no sugar added", "no added sugar"], None),
    (&["fat free", "0g fat", "zero fat"], Some(ClaimKind::FatFree)),
    (&["low fat"], Some(ClaimKind::LowFat)),
    (&["sugar free", "no sugar", "zero sugar"], Some(ClaimKind::SugarFree)),
    (&["low sodium"], Some(ClaimKind::LowSodium)),
    (&["high fiber", "high fibre"], Some(ClaimKind::HighFiber)),
];

/// Which regulated claim, if any, a phrase asserts.
pub fn match_claim_rule(claim: &str) -> Option<ClaimKind> {
    let normalized = normalize_phrase(claim);
    CLAIM_DISPATCH
        .iter()
        .find(|(phrases, _)| phrases.iter().any(|p| normalized.contains(p)))
        .and_then(|(_, kind)| *kind)
}

/// Status when the measured amount misses the threshold.
///
/// Zero-content claims ("free") and the fiber floor are flatly contradicted;
/// "low" claims that overshoot are misleading rather than false.
fn failure_status(kind: ClaimKind) -> ClaimStatus {
    match kind {
        ClaimKind::FatFree | ClaimKind::SugarFree | ClaimKind::HighFiber => ClaimStatus::False,
        ClaimKind::LowFat | ClaimKind::LowSodium => ClaimStatus::Misleading,
    }
}

/// Resolve a rule-matched claim by threshold comparison alone.
pub fn evaluate_rule(claim: &str, kind: ClaimKind, facts: &NutrientMap) -> ClaimVerification {
    let threshold = claim_threshold(kind);

    let Some(&value) = facts.get(&threshold.nutrient) else {
        return ClaimVerification::rule_based(
            claim,
            ClaimStatus::Unknown,
            format!(
                "Cannot verify '{claim}': no {} amount was found on the label.",
                threshold.noun
            ),
        );
    };

    let measured = format!(
        "{}{} {}",
        format_amount(value),
        threshold.nutrient.unit().as_str(),
        threshold.noun
    );
    let criterion = threshold.criterion();

    if threshold.is_met(value) {
        return ClaimVerification::rule_based(
            claim,
            ClaimStatus::Verified,
            format!(
                "Confirmed: Contains {measured}, meeting FDA criteria for '{}' ({criterion}).",
                threshold.label
            ),
        );
    }

    let status = failure_status(kind);
    let prefix = match status {
        ClaimStatus::Misleading => "Questionable",
        _ => "Contradicted",
    };
    let direction = match threshold.comparator {
        Comparator::AtMost => "exceeds",
        Comparator::AtLeast => "falls below",
    };
    ClaimVerification::rule_based(
        claim,
        status,
        format!(
            "{prefix}: Contains {measured}, which {direction} FDA criteria for '{}' ({criterion}).",
            threshold.label
        ),
    )
}
