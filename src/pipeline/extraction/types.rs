use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::sections::SectionMap;
use super::ExtractionError;
use crate::pipeline::parsing::StructuredNutritionData;

/// Trimmed text longer than this earns medium confidence from a recognizer.
pub const MEDIUM_CONFIDENCE_MIN_CHARS: usize = 10;

/// A label photo plus optional product identifiers. Owned by the caller and
/// borrowed by the orchestrator for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub barcode: Option<String>,
    pub product_name: Option<String>,
}

impl RawImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            ..Self::default()
        }
    }

    /// Blank identifiers are ignored.
    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = non_blank(barcode.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = non_blank(name.into());
        self
    }

    pub fn has_identifiers(&self) -> bool {
        self.barcode.is_some() || self.product_name.is_some()
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Which tier produced the final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    ProductLookup,
    CloudOcr,
    LocalOcr,
    None,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductLookup => "product_lookup",
            Self::CloudOcr => "cloud_ocr",
            Self::LocalOcr => "local_ocr",
            Self::None => "none",
        }
    }
}

/// Coarse extraction-quality signal, independent of any health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Recognizer output: medium when there is more than a fragment of text.
    pub fn for_recognized_text(text: &str) -> Self {
        if text.trim().chars().count() > MEDIUM_CONFIDENCE_MIN_CHARS {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierStatus {
    Succeeded,
    /// Not applicable to this request (e.g. no barcode for product lookup).
    Skipped,
    /// Ran without error but produced no usable text.
    Empty,
    Failed,
    Cancelled,
}

/// One line of the debug trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugEntry {
    pub tier: String,
    pub status: TierStatus,
    pub note: String,
}

/// Line-level text record with the producing tier's confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub text: String,
    pub confidence: f32,
}

/// Pre-structured data attached to an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredPayload {
    /// Authoritative data from a product database.
    Nutrition(StructuredNutritionData),
    /// Best-effort partition of recognized lines.
    Sections(SectionMap),
}

/// Final output of one extraction. Built once by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub structured: Option<StructuredPayload>,
    pub method: ExtractionMethod,
    pub confidence: Confidence,
    pub debug_trail: Vec<DebugEntry>,
    pub lines: Vec<LineRecord>,
}

impl ExtractionResult {
    /// Terminal state when every tier failed.
    pub fn exhausted(debug_trail: Vec<DebugEntry>) -> Self {
        Self {
            text: String::new(),
            structured: None,
            method: ExtractionMethod::None,
            confidence: Confidence::Low,
            debug_trail,
            lines: Vec::new(),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.method == ExtractionMethod::None
    }

    /// Product-database data, when the winning tier supplied it.
    pub fn nutrition_data(&self) -> Option<&StructuredNutritionData> {
        match &self.structured {
            Some(StructuredPayload::Nutrition(data)) => Some(data),
            _ => None,
        }
    }

    pub fn sections(&self) -> Option<&SectionMap> {
        match &self.structured {
            Some(StructuredPayload::Sections(map)) => Some(map),
            _ => None,
        }
    }
}

/// An extraction plus the nutrition record the rest of the pipeline consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub result: ExtractionResult,
    pub data: StructuredNutritionData,
}

/// Cooperative cancellation flag shared between a caller and the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

// ──────────────────────────────────────────────
// Collaborator contracts
// ──────────────────────────────────────────────

/// Product database hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub text: String,
    pub structured: Option<StructuredNutritionData>,
}

/// Product database lookup by barcode or name.
pub trait ProductLookup: Send + Sync {
    fn lookup(
        &self,
        barcode: Option<&str>,
        name: Option<&str>,
    ) -> Result<ProductRecord, ExtractionError>;
}

/// Image-to-text recognizer, cloud or local.
///
/// Errors must keep transient failures (`is_transient`) distinct from fatal
/// ones so the retry policy can tell them apart.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &[u8]) -> Result<String, ExtractionError>;

    fn name(&self) -> &str;
}
