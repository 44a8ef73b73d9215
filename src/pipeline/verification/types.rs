use serde::{Deserialize, Serialize};

/// Outcome of checking one claim against the label's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Verified,
    Misleading,
    False,
    Unknown,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::Misleading => "misleading",
            Self::False => "false",
            Self::Unknown => "unknown",
        }
    }
}

/// Who decided the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    RuleBased,
    Advisory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimVerification {
    pub claim_text: String,
    pub status: ClaimStatus,
    pub explanation: String,
    pub source: ClaimSource,
}

impl ClaimVerification {
    pub fn rule_based(claim: &str, status: ClaimStatus, explanation: String) -> Self {
        Self {
            claim_text: claim.to_string(),
            status,
            explanation,
            source: ClaimSource::RuleBased,
        }
    }

    pub fn advisory(claim: &str, status: ClaimStatus, explanation: String) -> Self {
        Self {
            claim_text: claim.to_string(),
            status,
            explanation,
            source: ClaimSource::Advisory,
        }
    }
}
