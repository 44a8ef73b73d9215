//! Extraction tiers: one object per collaborator in the fallback chain.
//!
//! Each tier turns a `RawImage` into a `TierOutcome` and never returns an
//! error; the orchestrator iterates tiers in priority order and keeps the
//! first success.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::engine_pool::{EngineKey, EnginePool};
use super::preprocess::ImagePreprocessor;
use super::retry::RetryPolicy;
use super::types::{
    CancellationToken, Confidence, ExtractionMethod, ProductLookup, ProductRecord, RawImage,
    TextRecognizer, TierStatus,
};
use super::ExtractionError;
use crate::pipeline::parsing::StructuredNutritionData;

/// Per-line confidence attached to each tier's text.
pub const PRODUCT_LOOKUP_LINE_CONFIDENCE: f32 = 0.99;
pub const CLOUD_OCR_LINE_CONFIDENCE: f32 = 0.85;
pub const LOCAL_OCR_LINE_CONFIDENCE: f32 = 0.75;

/// Text and optional structure produced by a successful tier.
#[derive(Debug, Clone, PartialEq)]
pub struct TierPayload {
    pub text: String,
    pub structured: Option<StructuredNutritionData>,
    pub confidence: Confidence,
    pub line_confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierOutcome {
    pub status: TierStatus,
    pub payload: Option<TierPayload>,
    pub reason: String,
}

impl TierOutcome {
    pub fn succeeded(payload: TierPayload) -> Self {
        let reason = format!("{} chars", payload.text.trim().chars().count());
        Self {
            status: TierStatus::Succeeded,
            payload: Some(payload),
            reason,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::without_payload(TierStatus::Skipped, reason)
    }

    pub fn empty() -> Self {
        Self::without_payload(TierStatus::Empty, "no usable text returned")
    }

    /// Cancellation is reported as its own status, never as a failure.
    pub fn from_error(error: &ExtractionError) -> Self {
        match error {
            ExtractionError::Cancelled => {
                Self::without_payload(TierStatus::Cancelled, "request cancelled")
            }
            other => Self::without_payload(TierStatus::Failed, other.to_string()),
        }
    }

    fn without_payload(status: TierStatus, reason: impl Into<String>) -> Self {
        Self {
            status,
            payload: None,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TierStatus::Succeeded
    }
}

/// One step of the extraction fallback chain.
pub trait ExtractionTier: Send + Sync {
    fn name(&self) -> &str;

    fn method(&self) -> ExtractionMethod;

    fn attempt(&self, image: &RawImage, cancel: &CancellationToken) -> TierOutcome;
}

/// Shared tail of the recognizer tiers: retry, then accept non-empty text.
fn recognize_outcome(
    tier: &str,
    recognizer: &dyn TextRecognizer,
    bytes: &[u8],
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    line_confidence: f32,
) -> TierOutcome {
    match retry.run(tier, cancel, || recognizer.recognize(bytes)) {
        Ok(text) if text.trim().is_empty() => TierOutcome::empty(),
        Ok(text) => TierOutcome::succeeded(TierPayload {
            confidence: Confidence::for_recognized_text(&text),
            text,
            structured: None,
            line_confidence,
        }),
        Err(e) => TierOutcome::from_error(&e),
    }
}

// ──────────────────────────────────────────────
// Tier 1: product database
// ──────────────────────────────────────────────

pub struct ProductLookupTier {
    lookup: Arc<dyn ProductLookup>,
    retry: RetryPolicy,
}

impl ProductLookupTier {
    pub fn new(lookup: Arc<dyn ProductLookup>, retry: RetryPolicy) -> Self {
        Self { lookup, retry }
    }
}

impl ExtractionTier for ProductLookupTier {
    fn name(&self) -> &str {
        "product_lookup"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::ProductLookup
    }

    fn attempt(&self, image: &RawImage, cancel: &CancellationToken) -> TierOutcome {
        if !image.has_identifiers() {
            return TierOutcome::skipped("no barcode or product name");
        }
        let result = self.retry.run(self.name(), cancel, || {
            self.lookup
                .lookup(image.barcode.as_deref(), image.product_name.as_deref())
        });
        match result {
            Ok(record) if record.text.trim().is_empty() => TierOutcome::empty(),
            Ok(record) => TierOutcome::succeeded(TierPayload {
                text: record.text,
                structured: record.structured,
                confidence: Confidence::High,
                line_confidence: PRODUCT_LOOKUP_LINE_CONFIDENCE,
            }),
            Err(e) => TierOutcome::from_error(&e),
        }
    }
}

// ──────────────────────────────────────────────
// Tier 2: cloud recognition
// ──────────────────────────────────────────────

pub struct CloudOcrTier {
    recognizer: Arc<dyn TextRecognizer>,
    retry: RetryPolicy,
}

impl CloudOcrTier {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, retry: RetryPolicy) -> Self {
        Self { recognizer, retry }
    }
}

impl ExtractionTier for CloudOcrTier {
    fn name(&self) -> &str {
        "cloud_ocr"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::CloudOcr
    }

    fn attempt(&self, image: &RawImage, cancel: &CancellationToken) -> TierOutcome {
        if image.bytes.is_empty() {
            return TierOutcome::skipped("no image bytes");
        }
        recognize_outcome(
            self.name(),
            self.recognizer.as_ref(),
            &image.bytes,
            &self.retry,
            cancel,
            CLOUD_OCR_LINE_CONFIDENCE,
        )
    }
}

// ──────────────────────────────────────────────
// Tier 3: local recognition
// ──────────────────────────────────────────────

/// Preprocesses the image, then recognizes it with a pooled local engine.
pub struct LocalOcrTier {
    pool: Arc<EnginePool>,
    engine: EngineKey,
    preprocessor: Box<dyn ImagePreprocessor>,
    retry: RetryPolicy,
}

impl LocalOcrTier {
    pub fn new(
        pool: Arc<EnginePool>,
        engine: EngineKey,
        preprocessor: Box<dyn ImagePreprocessor>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            pool,
            engine,
            preprocessor,
            retry,
        }
    }
}

impl ExtractionTier for LocalOcrTier {
    fn name(&self) -> &str {
        "local_ocr"
    }

    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::LocalOcr
    }

    fn attempt(&self, image: &RawImage, cancel: &CancellationToken) -> TierOutcome {
        if image.bytes.is_empty() {
            return TierOutcome::skipped("no image bytes");
        }
        let prepared = match self.preprocessor.preprocess(&image.bytes) {
            Ok(prepared) => prepared,
            Err(e) => return TierOutcome::from_error(&e),
        };
        let recognizer = match self.pool.get_or_create(&self.engine) {
            Ok(recognizer) => recognizer,
            Err(e) => return TierOutcome::from_error(&e),
        };
        recognize_outcome(
            self.name(),
            recognizer.as_ref(),
            &prepared.png_bytes,
            &self.retry,
            cancel,
            LOCAL_OCR_LINE_CONFIDENCE,
        )
    }
}

// ──────────────────────────────────────────────
// Mock product lookup (testing)
// ──────────────────────────────────────────────

/// Returns a fixed record, or `NotFound` when built with `not_found()`.
pub struct MockProductLookup {
    record: Option<ProductRecord>,
    calls: AtomicUsize,
}

impl MockProductLookup {
    pub fn new(record: ProductRecord) -> Self {
        Self {
            record: Some(record),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn not_found() -> Self {
        Self {
            record: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProductLookup for MockProductLookup {
    fn lookup(
        &self,
        barcode: Option<&str>,
        name: Option<&str>,
    ) -> Result<ProductRecord, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.record.clone().ok_or_else(|| {
            ExtractionError::NotFound(barcode.or(name).unwrap_or_default().to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::local_ocr::MockRecognizer;
    use crate::pipeline::extraction::preprocess::MockImagePreprocessor;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            backoff: Duration::from_millis(1),
        }
    }

    fn image() -> RawImage {
        RawImage::new(vec![0u8; 128])
    }

    #[test]
    fn product_tier_skipped_without_identifiers() {
        let lookup = Arc::new(MockProductLookup::not_found());
        let tier = ProductLookupTier::new(lookup.clone(), fast_retry());
        let outcome = tier.attempt(&image(), &CancellationToken::new());
        assert_eq!(outcome.status, TierStatus::Skipped);
        assert_eq!(lookup.calls(), 0);
    }

    #[test]
    fn product_tier_high_confidence() {
        let lookup = Arc::new(MockProductLookup::new(ProductRecord {
            text: "Name: Oats".into(),
            structured: Some(StructuredNutritionData::empty("Name: Oats")),
        }));
        let tier = ProductLookupTier::new(lookup, fast_retry());
        let outcome = tier.attempt(&image().with_barcode("123"), &CancellationToken::new());
        assert!(outcome.is_success());
        let payload = outcome.payload.unwrap();
        assert_eq!(payload.confidence, Confidence::High);
        assert!(payload.structured.is_some());
    }

    #[test]
    fn product_not_found_is_failure_not_retried() {
        let lookup = Arc::new(MockProductLookup::not_found());
        let tier = ProductLookupTier::new(lookup.clone(), fast_retry());
        let outcome = tier.attempt(&image().with_product_name("Oats"), &CancellationToken::new());
        assert_eq!(outcome.status, TierStatus::Failed);
        assert!(outcome.reason.contains("Oats"));
        assert_eq!(lookup.calls(), 1);
    }

    #[test]
    fn cloud_tier_confidence_from_length() {
        let long = CloudOcrTier::new(
            Arc::new(MockRecognizer::new("Calories 120 Total Fat 3g")),
            fast_retry(),
        );
        let short = CloudOcrTier::new(Arc::new(MockRecognizer::new("Fat 3g")), fast_retry());
        let token = CancellationToken::new();
        assert_eq!(
            long.attempt(&image(), &token).payload.unwrap().confidence,
            Confidence::Medium
        );
        assert_eq!(
            short.attempt(&image(), &token).payload.unwrap().confidence,
            Confidence::Low
        );
    }

    #[test]
    fn cloud_tier_whitespace_reply_is_empty() {
        let tier = CloudOcrTier::new(Arc::new(MockRecognizer::new("  \n ")), fast_retry());
        let outcome = tier.attempt(&image(), &CancellationToken::new());
        assert_eq!(outcome.status, TierStatus::Empty);
    }

    #[test]
    fn cloud_tier_retries_transient_within_tier() {
        let recognizer =
            Arc::new(MockRecognizer::new("Calories 120 kcal").with_transient_failures(1));
        let tier = CloudOcrTier::new(recognizer.clone(), fast_retry());
        assert!(tier.attempt(&image(), &CancellationToken::new()).is_success());
        assert_eq!(recognizer.calls(), 2);
    }

    #[test]
    fn cloud_tier_fatal_error_fails_immediately() {
        let recognizer = Arc::new(MockRecognizer::failing());
        let tier = CloudOcrTier::new(recognizer.clone(), fast_retry());
        let outcome = tier.attempt(&image(), &CancellationToken::new());
        assert_eq!(outcome.status, TierStatus::Failed);
        assert_eq!(recognizer.calls(), 1);
    }

    #[test]
    fn local_tier_uses_pool_and_preprocessor() {
        let pool = Arc::new(EnginePool::new(|_| {
            Ok(Arc::new(MockRecognizer::new("Protein 5g per bar")) as Arc<dyn TextRecognizer>)
        }));
        let tier = LocalOcrTier::new(
            pool.clone(),
            EngineKey::new("llava:7b", &["en"]),
            Box::new(MockImagePreprocessor::new()),
            fast_retry(),
        );
        let token = CancellationToken::new();
        assert!(tier.attempt(&image(), &token).is_success());
        assert!(tier.attempt(&image(), &token).is_success());
        assert_eq!(pool.stats().misses, 1);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn local_tier_preprocess_failure() {
        let pool = Arc::new(EnginePool::new(|_| {
            Ok(Arc::new(MockRecognizer::new("x")) as Arc<dyn TextRecognizer>)
        }));
        let tier = LocalOcrTier::new(
            pool.clone(),
            EngineKey::new("m", &["en"]),
            Box::new(MockImagePreprocessor::failing()),
            fast_retry(),
        );
        let outcome = tier.attempt(&image(), &CancellationToken::new());
        assert_eq!(outcome.status, TierStatus::Failed);
        assert_eq!(pool.stats().misses, 0);
    }

    #[test]
    fn cancelled_token_reports_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let tier = CloudOcrTier::new(Arc::new(MockRecognizer::new("text here!")), fast_retry());
        assert_eq!(tier.attempt(&image(), &token).status, TierStatus::Cancelled);
    }

    #[test]
    fn empty_bytes_skip_recognizers() {
        let recognizer = Arc::new(MockRecognizer::new("text"));
        let tier = CloudOcrTier::new(recognizer.clone(), fast_retry());
        let outcome = tier.attempt(&RawImage::default(), &CancellationToken::new());
        assert_eq!(outcome.status, TierStatus::Skipped);
        assert_eq!(recognizer.calls(), 0);
    }
}
