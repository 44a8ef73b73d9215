use std::sync::Arc;

use super::rules::{evaluate_rule, match_claim_rule};
use super::types::{ClaimStatus, ClaimVerification};
use crate::pipeline::advisory::AdvisoryService;
use crate::pipeline::parsing::NutrientMap;

/// Checks label claims against FDA thresholds, delegating the rest.
///
/// Rule-matched claims never reach the advisory service. Each claim is
/// resolved independently, so an advisory failure on one claim leaves its
/// siblings untouched.
pub struct ClaimVerifier {
    advisor: Option<Arc<dyn AdvisoryService>>,
}

impl ClaimVerifier {
    pub fn new(advisor: Option<Arc<dyn AdvisoryService>>) -> Self {
        Self { advisor }
    }

    /// Rules only; unmatched claims resolve to unknown.
    pub fn rules_only() -> Self {
        Self { advisor: None }
    }

    /// One verification per claim, in input order.
    pub fn verify(&self, claims: &[String], facts: &NutrientMap) -> Vec<ClaimVerification> {
        let _span = tracing::info_span!("verify_claims", claims = claims.len()).entered();

        let results: Vec<ClaimVerification> = claims
            .iter()
            .map(|claim| self.verify_one(claim, facts))
            .collect();

        tracing::info!(
            verified = count(&results, ClaimStatus::Verified),
            misleading = count(&results, ClaimStatus::Misleading),
            false_claims = count(&results, ClaimStatus::False),
            unknown = count(&results, ClaimStatus::Unknown),
            "Claims verified"
        );
        results
    }

    fn verify_one(&self, claim: &str, facts: &NutrientMap) -> ClaimVerification {
        if let Some(kind) = match_claim_rule(claim) {
            return evaluate_rule(claim, kind, facts);
        }

        let Some(advisor) = &self.advisor else {
            return ClaimVerification::advisory(
                claim,
                ClaimStatus::Unknown,
                format!(
                    "No threshold rule covers '{claim}' and advisory verification is unavailable."
                ),
            );
        };

        match advisor.evaluate_claim(claim, facts) {
            Ok(advice) => ClaimVerification::advisory(claim, advice.status, advice.explanation),
            Err(e) => {
                tracing::warn!(
                    claim,
                    advisor = advisor.name(),
                    error = %e,
                    "Advisory claim check failed"
                );
                ClaimVerification::advisory(
                    claim,
                    ClaimStatus::Unknown,
                    format!("Advisory verification unavailable for '{claim}': {e}"),
                )
            }
        }
    }
}

fn count(results: &[ClaimVerification], status: ClaimStatus) -> usize {
    results.iter().filter(|r| r.status == status).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::advisory::MockAdvisor;
    use crate::pipeline::standards::NutrientKey;
    use crate::pipeline::verification::ClaimSource;

    fn claims(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fat(value: f64) -> NutrientMap {
        [(NutrientKey::TotalFat, value)].into_iter().collect()
    }

    #[test]
    fn fat_free_threshold_exactness() {
        let verifier = ClaimVerifier::rules_only();
        assert_eq!(
            verifier.verify(&claims(&["fat free"]), &fat(0.5))[0].status,
            ClaimStatus::Verified
        );
        assert_eq!(
            verifier.verify(&claims(&["fat free"]), &fat(0.6))[0].status,
            ClaimStatus::False
        );
    }

    #[test]
    fn output_order_matches_input() {
        let verifier = ClaimVerifier::rules_only();
        let input = claims(&["Organic", "Low Fat", "Fat Free"]);
        let results = verifier.verify(&input, &fat(1.0));
        let texts: Vec<&str> = results.iter().map(|r| r.claim_text.as_str()).collect();
        assert_eq!(texts, vec!["Organic", "Low Fat", "Fat Free"]);
        assert_eq!(results[0].status, ClaimStatus::Unknown);
        assert_eq!(results[1].status, ClaimStatus::Verified);
        assert_eq!(results[2].status, ClaimStatus::False);
    }

    #[test]
    fn rule_claims_never_reach_advisor() {
        let advisor = Arc::new(MockAdvisor::new("Verified."));
        let verifier = ClaimVerifier::new(Some(advisor.clone()));
        verifier.verify(&claims(&["Low Fat", "High Fiber"]), &fat(1.0));
        assert_eq!(advisor.claim_calls(), 0);
    }

    #[test]
    fn unmatched_claims_delegated() {
        let advisor = Arc::new(MockAdvisor::new("Misleading: whole grain is only 10% of flour."));
        let verifier = ClaimVerifier::new(Some(advisor.clone()));
        let results = verifier.verify(&claims(&["Whole Grain"]), &fat(1.0));
        assert_eq!(advisor.claim_calls(), 1);
        assert_eq!(results[0].status, ClaimStatus::Misleading);
        assert_eq!(results[0].source, ClaimSource::Advisory);
    }

    #[test]
    fn no_sugar_added_is_not_a_sugar_free_claim() {
        let advisor = Arc::new(MockAdvisor::new("Verified: no sugars are listed as added."));
        let verifier = ClaimVerifier::new(Some(advisor.clone()));
        let sugars: NutrientMap = [(NutrientKey::TotalSugars, 12.0)].into_iter().collect();
        let results = verifier.verify(&claims(&["No Sugar Added"]), &sugars);
        assert_eq!(advisor.claim_calls(), 1);
        assert_eq!(results[0].source, ClaimSource::Advisory);
        assert_eq!(results[0].status, ClaimStatus::Verified);
    }

    #[test]
    fn advisor_failure_isolated_per_claim() {
        let verifier = ClaimVerifier::new(Some(Arc::new(MockAdvisor::failing())));
        let results = verifier.verify(&claims(&["Organic", "Low Fat", "Non-Gmo"]), &fat(2.0));
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, ClaimStatus::Unknown);
        assert!(results[0].explanation.contains("unavailable"));
        assert_eq!(results[1].status, ClaimStatus::Verified);
        assert_eq!(results[2].status, ClaimStatus::Unknown);
    }

    #[test]
    fn no_advisor_notes_unavailability() {
        let results = ClaimVerifier::rules_only().verify(&claims(&["Kosher"]), &NutrientMap::new());
        assert_eq!(results[0].status, ClaimStatus::Unknown);
        assert!(results[0].explanation.contains("unavailable"));
    }

    #[test]
    fn empty_claim_list() {
        assert!(ClaimVerifier::rules_only().verify(&[], &fat(1.0)).is_empty());
    }
}
