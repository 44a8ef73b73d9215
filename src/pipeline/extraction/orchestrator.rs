use std::sync::Arc;

use super::cloud_ocr::HuggingFaceRecognizer;
use super::engine_pool::{EngineKey, EnginePool};
use super::local_ocr::OllamaVisionRecognizer;
use super::openfoodfacts::OpenFoodFactsClient;
use super::preprocess::{ImagePreprocessor, LabelPreprocessor};
use super::retry::RetryPolicy;
use super::sanitize::{sanitize_extracted_text, to_line_records};
use super::sections::split_sections;
use super::tiers::{CloudOcrTier, ExtractionTier, LocalOcrTier, ProductLookupTier, TierOutcome};
use super::types::{
    CancellationToken, DebugEntry, ExtractionOutcome, ExtractionResult, ProductLookup,
    RawImage, StructuredPayload, TextRecognizer, TierStatus,
};
use super::ExtractionError;
use crate::config::{LocalOcrConfig, PipelineConfig};
use crate::pipeline::parsing::NutritionFactsParser;

/// Languages the local engine is configured for.
const LOCAL_ENGINE_LANGUAGES: &[&str] = &["en"];

/// Resolves a label image (or barcode/name) to text by trying tiers in
/// priority order and stopping at the first one that yields text.
///
/// Tiers run sequentially; ordering is the fallback contract. `extract`
/// never fails: when every tier is exhausted the result has
/// `method = None`, `confidence = Low` and the full debug trail.
pub struct ExtractionOrchestrator {
    tiers: Vec<Box<dyn ExtractionTier>>,
    parser: NutritionFactsParser,
    engine_pool: Option<Arc<EnginePool>>,
}

impl ExtractionOrchestrator {
    pub fn builder() -> ExtractionOrchestratorBuilder {
        ExtractionOrchestratorBuilder::default()
    }

    /// Orchestrator over an explicit tier list.
    pub fn with_tiers(tiers: Vec<Box<dyn ExtractionTier>>) -> Self {
        Self {
            tiers,
            parser: NutritionFactsParser::new(),
            engine_pool: None,
        }
    }

    /// Production chain: OpenFoodFacts, HuggingFace, then a pooled local
    /// Ollama engine (a no-op when no local model is configured).
    ///
    /// Builds blocking HTTP clients; call outside an async context.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ExtractionError> {
        let local = config.local_ocr.clone();
        let engine_model = local.model.clone().unwrap_or_else(|| "none".into());

        Ok(Self::builder()
            .retry(RetryPolicy::from_config(&config.retry))
            .product_lookup(Arc::new(OpenFoodFactsClient::from_config(
                &config.product_lookup,
            )?))
            .cloud_recognizer(Arc::new(HuggingFaceRecognizer::from_config(
                &config.cloud_ocr,
            )?))
            .local_engines(
                EnginePool::new(move |key| local_engine(&local, key)),
                EngineKey::new(&engine_model, LOCAL_ENGINE_LANGUAGES),
            )
            .build())
    }

    pub fn tier_names(&self) -> Vec<&str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    pub fn engine_pool(&self) -> Option<&Arc<EnginePool>> {
        self.engine_pool.as_ref()
    }

    /// Run the tier chain for one image.
    pub fn extract(&self, image: &RawImage, cancel: &CancellationToken) -> ExtractionResult {
        let _span = tracing::info_span!(
            "extract",
            image_size = image.bytes.len(),
            barcode = image.barcode.is_some(),
            product_name = image.product_name.is_some(),
        )
        .entered();

        let mut trail = Vec::with_capacity(self.tiers.len());

        for tier in &self.tiers {
            if cancel.is_cancelled() {
                trail.push(entry(tier.as_ref(), TierStatus::Cancelled, "request cancelled"));
                tracing::info!(tier = tier.name(), "Extraction cancelled");
                return ExtractionResult::exhausted(trail);
            }

            let outcome = tier.attempt(image, cancel);
            match outcome.status {
                TierStatus::Succeeded => {
                    if let Some(result) = self.accept(tier.as_ref(), outcome, &mut trail) {
                        return result;
                    }
                }
                TierStatus::Cancelled => {
                    trail.push(entry(tier.as_ref(), TierStatus::Cancelled, &outcome.reason));
                    tracing::info!(tier = tier.name(), "Extraction cancelled");
                    return ExtractionResult::exhausted(trail);
                }
                TierStatus::Skipped => {
                    tracing::debug!(tier = tier.name(), reason = %outcome.reason, "Tier skipped");
                    trail.push(entry(tier.as_ref(), outcome.status, &outcome.reason));
                }
                TierStatus::Empty | TierStatus::Failed => {
                    tracing::warn!(
                        tier = tier.name(),
                        reason = %outcome.reason,
                        "Tier produced no text"
                    );
                    trail.push(entry(tier.as_ref(), outcome.status, &outcome.reason));
                }
            }
        }

        tracing::warn!(tiers = self.tiers.len(), "All extraction tiers exhausted");
        ExtractionResult::exhausted(trail)
    }

    /// Turn a successful outcome into the final result, or record it as
    /// empty when nothing survives sanitizing.
    fn accept(
        &self,
        tier: &dyn ExtractionTier,
        outcome: TierOutcome,
        trail: &mut Vec<DebugEntry>,
    ) -> Option<ExtractionResult> {
        let payload = outcome.payload?;
        let text = sanitize_extracted_text(&payload.text);
        if text.is_empty() {
            tracing::warn!(tier = tier.name(), "Tier text empty after sanitizing");
            trail.push(entry(tier, TierStatus::Empty, "no usable text after sanitizing"));
            return None;
        }

        let structured = match payload.structured {
            Some(data) => StructuredPayload::Nutrition(data),
            None => StructuredPayload::Sections(split_sections(&text)),
        };
        trail.push(entry(tier, TierStatus::Succeeded, &outcome.reason));

        tracing::info!(
            tier = tier.name(),
            method = tier.method().as_str(),
            confidence = ?payload.confidence,
            chars = text.len(),
            "Extraction succeeded"
        );

        Some(ExtractionResult {
            lines: to_line_records(&text, payload.line_confidence),
            text,
            structured: Some(structured),
            method: tier.method(),
            confidence: payload.confidence,
            debug_trail: std::mem::take(trail),
        })
    }

    /// Extract, then produce the nutrition record: the tier's structured
    /// data when it supplied some, otherwise a parse of the extracted text.
    pub fn extract_and_parse(
        &self,
        image: &RawImage,
        cancel: &CancellationToken,
    ) -> ExtractionOutcome {
        let result = self.extract(image, cancel);
        let data = match result.nutrition_data() {
            Some(data) => data.clone(),
            None => self.parser.parse(&result.text),
        };
        ExtractionOutcome { result, data }
    }
}

fn entry(tier: &dyn ExtractionTier, status: TierStatus, note: &str) -> DebugEntry {
    DebugEntry {
        tier: tier.name().to_string(),
        status,
        note: note.to_string(),
    }
}

fn local_engine(
    config: &LocalOcrConfig,
    key: &EngineKey,
) -> Result<Arc<dyn TextRecognizer>, ExtractionError> {
    let config = LocalOcrConfig {
        model: config.model.as_ref().map(|_| key.model.clone()),
        ..config.clone()
    };
    OllamaVisionRecognizer::from_config(&config)
}

// ──────────────────────────────────────────────
// Builder
// ──────────────────────────────────────────────

/// Assembles the standard three-tier chain from its collaborators.
/// Tiers whose collaborator is not supplied are left out.
#[derive(Default)]
pub struct ExtractionOrchestratorBuilder {
    retry: Option<RetryPolicy>,
    product_lookup: Option<Arc<dyn ProductLookup>>,
    cloud: Option<Arc<dyn TextRecognizer>>,
    local: Option<(EnginePool, EngineKey)>,
    preprocessor: Option<Box<dyn ImagePreprocessor>>,
}

impl ExtractionOrchestratorBuilder {
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn product_lookup(mut self, lookup: Arc<dyn ProductLookup>) -> Self {
        self.product_lookup = Some(lookup);
        self
    }

    pub fn cloud_recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.cloud = Some(recognizer);
        self
    }

    /// The orchestrator takes ownership of the pool.
    pub fn local_engines(mut self, pool: EnginePool, engine: EngineKey) -> Self {
        self.local = Some((pool, engine));
        self
    }

    /// Defaults to `LabelPreprocessor`.
    pub fn preprocessor(mut self, preprocessor: Box<dyn ImagePreprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    pub fn build(self) -> ExtractionOrchestrator {
        let retry = self.retry.unwrap_or_default();
        let mut tiers: Vec<Box<dyn ExtractionTier>> = Vec::with_capacity(3);

        if let Some(lookup) = self.product_lookup {
            tiers.push(Box::new(ProductLookupTier::new(lookup, retry)));
        }
        if let Some(recognizer) = self.cloud {
            tiers.push(Box::new(CloudOcrTier::new(recognizer, retry)));
        }
        let mut engine_pool = None;
        if let Some((pool, engine)) = self.local {
            let pool = Arc::new(pool);
            let preprocessor = self
                .preprocessor
                .unwrap_or_else(|| Box::new(LabelPreprocessor));
            tiers.push(Box::new(LocalOcrTier::new(
                Arc::clone(&pool),
                engine,
                preprocessor,
                retry,
            )));
            engine_pool = Some(pool);
        }

        ExtractionOrchestrator {
            tiers,
            parser: NutritionFactsParser::new(),
            engine_pool,
        }
    }
}
