use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::interpret::{interpret_claim_reply, interpret_product_reply};
use super::AdvisoryError;
use crate::pipeline::parsing::NutrientMap;
use crate::pipeline::verification::ClaimStatus;

/// Advisory verdict on a claim no threshold rule covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimAdvice {
    pub status: ClaimStatus,
    pub explanation: String,
}

/// Coarse verdict read out of a free-form product narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeLevel {
    Good,
    Moderate,
    Avoid,
}

/// Free-form product analysis plus the lines pulled out of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductNarrative {
    pub level: NarrativeLevel,
    pub summary: String,
    pub concerns: Vec<String>,
    pub tips: Vec<String>,
    pub insights: Vec<String>,
    pub full_text: String,
}

/// Language-model reasoning used where deterministic rules run out.
///
/// Best-effort: every caller must cope with `Err` by degrading, never by
/// aborting the request.
pub trait AdvisoryService: Send + Sync {
    fn evaluate_claim(&self, claim: &str, facts: &NutrientMap)
        -> Result<ClaimAdvice, AdvisoryError>;

    fn evaluate_product(
        &self,
        facts: &NutrientMap,
        ingredients: &[String],
        raw_text: &str,
    ) -> Result<ProductNarrative, AdvisoryError>;

    /// Name used in logs and explanations.
    fn name(&self) -> &str;
}

/// Advisory service stand-in for deployments without a model and for tests.
pub struct MockAdvisor {
    claim_reply: String,
    product_reply: String,
    fail: bool,
    claim_calls: AtomicUsize,
    product_calls: AtomicUsize,
}

impl MockAdvisor {
    pub fn new(reply: &str) -> Self {
        Self {
            claim_reply: reply.to_string(),
            product_reply: reply.to_string(),
            fail: false,
            claim_calls: AtomicUsize::new(0),
            product_calls: AtomicUsize::new(0),
        }
    }

    /// An advisor whose every call fails with a connection error.
    pub fn failing() -> Self {
        Self::new("").with_failure()
    }

    pub fn with_product_reply(mut self, reply: &str) -> Self {
        self.product_reply = reply.to_string();
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    pub fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }
}

impl AdvisoryService for MockAdvisor {
    fn evaluate_claim(
        &self,
        _claim: &str,
        _facts: &NutrientMap,
    ) -> Result<ClaimAdvice, AdvisoryError> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AdvisoryError::Connection("mock".into()));
        }
        interpret_claim_reply(&self.claim_reply)
    }

    fn evaluate_product(
        &self,
        _facts: &NutrientMap,
        _ingredients: &[String],
        _raw_text: &str,
    ) -> Result<ProductNarrative, AdvisoryError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AdvisoryError::Connection("mock".into()));
        }
        interpret_product_reply(&self.product_reply)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
