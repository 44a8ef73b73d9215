//! Analysis assembly: extraction, then claim verification, science scoring
//! and the optional product narrative run concurrently over one record.
//!
//! Every sub-task degrades independently. A failed verification marks the
//! claims unknown, a failed score falls back to the baseline assessment, and
//! a failed narrative is simply absent. The caller always receives a
//! complete `AnalysisResult`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::advisory::{AdvisoryError, AdvisoryService, OpenRouterAdvisor, ProductNarrative};
use super::extraction::{
    CancellationToken, Confidence, DebugEntry, ExtractionError, ExtractionMethod,
    ExtractionOrchestrator, ExtractionResult, RawImage, TierStatus,
};
use super::parsing::{NutritionFactsParser, StructuredNutritionData};
use super::scoring::{ScienceAssessment, ScienceScorer};
use super::verification::{ClaimStatus, ClaimVerification, ClaimVerifier};
use crate::config::PipelineConfig;

/// Nutrient count treated as a fully populated label.
const COMPLETE_NUTRIENT_COUNT: f64 = 10.0;

/// Final report for one analysis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub request_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub method: ExtractionMethod,
    pub confidence: Confidence,
    pub debug_trail: Vec<DebugEntry>,
    pub nutrition: StructuredNutritionData,
    pub claims: Vec<ClaimVerification>,
    pub science: ScienceAssessment,
    pub narrative: Option<ProductNarrative>,
    /// Percent of the expected nutrient set that was recognized.
    pub data_completeness: f64,
    /// Degraded sub-task messages.
    pub notes: Vec<String>,
}

/// Share of `COMPLETE_NUTRIENT_COUNT` present, as a whole percent capped at 100.
pub fn data_completeness(data: &StructuredNutritionData) -> f64 {
    let count = data.nutrition_facts.len() as f64;
    (count / COMPLETE_NUTRIENT_COUNT * 100.0).min(100.0).round()
}

/// Cancels the extraction token when an in-flight analysis is abandoned.
struct CancelOnDrop(Option<CancellationToken>);

impl CancelOnDrop {
    fn new(token: CancellationToken) -> Self {
        Self(Some(token))
    }

    /// Extraction finished; leave the caller's token untouched.
    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.0.take() {
            tracing::info!("Analysis abandoned, cancelling extraction");
            token.cancel();
        }
    }
}

pub struct AnalysisAssembler {
    orchestrator: Arc<ExtractionOrchestrator>,
    verifier: Arc<ClaimVerifier>,
    scorer: ScienceScorer,
    advisor: Option<Arc<dyn AdvisoryService>>,
    parser: NutritionFactsParser,
}

impl AnalysisAssembler {
    pub fn new(
        orchestrator: ExtractionOrchestrator,
        advisor: Option<Arc<dyn AdvisoryService>>,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            verifier: Arc::new(ClaimVerifier::new(advisor.clone())),
            scorer: ScienceScorer::new(),
            advisor,
            parser: NutritionFactsParser::new(),
        }
    }

    /// Build the full pipeline from configuration.
    ///
    /// Must be called outside an async context: the HTTP clients are blocking.
    /// A missing advisory key disables advisory features without failing.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ExtractionError> {
        let orchestrator = ExtractionOrchestrator::from_config(config)?;
        let advisor: Option<Arc<dyn AdvisoryService>> =
            match OpenRouterAdvisor::from_config(&config.advisory) {
                Ok(advisor) => Some(Arc::new(advisor)),
                Err(AdvisoryError::NotConfigured) => {
                    tracing::info!("Advisory service not configured, rule-based checks only");
                    None
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Advisory service unavailable, rule-based checks only"
                    );
                    None
                }
            };
        Ok(Self::new(orchestrator, advisor))
    }

    pub fn has_advisor(&self) -> bool {
        self.advisor.is_some()
    }

    /// Analyze a label image, optionally identified by barcode or product name.
    pub async fn analyze(
        &self,
        image: Vec<u8>,
        barcode: Option<&str>,
        product_name: Option<&str>,
    ) -> AnalysisResult {
        let mut raw = RawImage::new(image);
        if let Some(code) = barcode {
            raw = raw.with_barcode(code);
        }
        if let Some(name) = product_name {
            raw = raw.with_product_name(name);
        }
        self.analyze_image(raw, CancellationToken::new()).await
    }

    /// Analyze a prepared request under a caller-held cancellation token.
    ///
    /// Dropping the returned future before extraction finishes cancels the
    /// token, so the blocking extraction stops at its next tier or retry.
    pub async fn analyze_image(
        &self,
        image: RawImage,
        cancel: CancellationToken,
    ) -> AnalysisResult {
        let guard = CancelOnDrop::new(cancel.clone());
        let orchestrator = Arc::clone(&self.orchestrator);
        let extracted = tokio::task::spawn_blocking(move || {
            orchestrator.extract_and_parse(&image, &cancel)
        })
        .await;
        guard.disarm();

        match extracted {
            Ok(outcome) => self.assemble(outcome.result, outcome.data, Vec::new()).await,
            Err(e) => {
                tracing::error!(error = %e, "Extraction task failed");
                let result = ExtractionResult::exhausted(vec![DebugEntry {
                    tier: "extraction".into(),
                    status: TierStatus::Failed,
                    note: e.to_string(),
                }]);
                let notes = vec![format!("Extraction failed: {e}")];
                self.assemble(result, StructuredNutritionData::empty(""), notes)
                    .await
            }
        }
    }

    /// Run the scoring half on text that was extracted elsewhere.
    pub async fn analyze_text(&self, text: &str) -> AnalysisResult {
        let data = self.parser.parse(text);
        let result = ExtractionResult {
            text: text.to_string(),
            structured: None,
            method: ExtractionMethod::None,
            confidence: Confidence::for_recognized_text(text),
            debug_trail: vec![DebugEntry {
                tier: "text_input".into(),
                status: TierStatus::Succeeded,
                note: "caller-supplied text".into(),
            }],
            lines: Vec::new(),
        };
        self.assemble(result, data, Vec::new()).await
    }

    async fn assemble(
        &self,
        extraction: ExtractionResult,
        data: StructuredNutritionData,
        mut notes: Vec<String>,
    ) -> AnalysisResult {
        let data = Arc::new(data);

        let verify = {
            let verifier = Arc::clone(&self.verifier);
            let data = Arc::clone(&data);
            tokio::task::spawn_blocking(move || {
                verifier.verify(&data.claims, &data.nutrition_facts)
            })
        };
        let score = {
            let scorer = self.scorer;
            let data = Arc::clone(&data);
            tokio::task::spawn_blocking(move || {
                scorer.score(&data.nutrition_facts, &data.ingredients)
            })
        };
        let narrate = async {
            let advisor = match &self.advisor {
                Some(advisor) if data.has_content() => Arc::clone(advisor),
                _ => return None,
            };
            let data = Arc::clone(&data);
            let joined = tokio::task::spawn_blocking(move || {
                advisor.evaluate_product(&data.nutrition_facts, &data.ingredients, &data.raw_text)
            })
            .await;
            Some(joined)
        };

        let (verified, scored, narrated) = tokio::join!(verify, score, narrate);

        let claims = match verified {
            Ok(claims) => claims,
            Err(e) => {
                tracing::error!(error = %e, "Claim verification task failed");
                notes.push(format!("Claim verification failed: {e}"));
                data.claims
                    .iter()
                    .map(|claim| {
                        ClaimVerification::rule_based(
                            claim,
                            ClaimStatus::Unknown,
                            "Verification could not be completed.".into(),
                        )
                    })
                    .collect()
            }
        };

        let science = match scored {
            Ok(science) => science,
            Err(e) => {
                tracing::error!(error = %e, "Science scoring task failed");
                notes.push(format!("Science scoring failed: {e}"));
                self.scorer.baseline()
            }
        };

        let narrative = match narrated {
            None => None,
            Some(Ok(Ok(narrative))) => Some(narrative),
            Some(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Product narrative unavailable");
                notes.push(format!("Product narrative unavailable: {e}"));
                None
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "Product narrative task failed");
                notes.push(format!("Product narrative failed: {e}"));
                None
            }
        };

        let data = Arc::try_unwrap(data).unwrap_or_else(|shared| (*shared).clone());
        let completeness = data_completeness(&data);

        tracing::info!(
            method = extraction.method.as_str(),
            confidence = ?extraction.confidence,
            nutrients = data.nutrition_facts.len(),
            claims = claims.len(),
            score = science.overall_score,
            notes = notes.len(),
            "Analysis assembled"
        );

        AnalysisResult {
            request_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            method: extraction.method,
            confidence: extraction.confidence,
            debug_trail: extraction.debug_trail,
            nutrition: data,
            claims,
            science,
            narrative,
            data_completeness: completeness,
            notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::advisory::{MockAdvisor, NarrativeLevel};
    use std::time::Duration;

    use crate::pipeline::advisory::ClaimAdvice;
    use crate::pipeline::extraction::{
        EngineKey, EnginePool, MockImagePreprocessor, MockProductLookup, MockRecognizer,
        ProductRecord, RetryPolicy, TextRecognizer,
    };
    use crate::pipeline::parsing::NutrientMap;
    use crate::pipeline::standards::NutrientKey;

    /// Advisor whose every call panics inside its blocking task.
    struct PanickingAdvisor;

    impl AdvisoryService for PanickingAdvisor {
        fn evaluate_claim(
            &self,
            _claim: &str,
            _facts: &NutrientMap,
        ) -> Result<ClaimAdvice, AdvisoryError> {
            panic!("advisor crashed on claim");
        }

        fn evaluate_product(
            &self,
            _facts: &NutrientMap,
            _ingredients: &[String],
            _raw_text: &str,
        ) -> Result<ProductNarrative, AdvisoryError> {
            panic!("advisor crashed on product");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    const LABEL: &str = "\
Low Fat. High Fiber.
Nutrition Facts
Serving Size 1 cup (240g)
Calories 90
Total Fat 0.5g
Sodium 20mg
Total Carbohydrate 18g
Dietary Fiber 6g
Total Sugars 2g
Protein 4g
Ingredients: whole grain oats, water, sea salt.";

    fn cloud_only(recognizer: MockRecognizer) -> ExtractionOrchestrator {
        ExtractionOrchestrator::builder()
            .retry(RetryPolicy::none())
            .cloud_recognizer(Arc::new(recognizer))
            .build()
    }

    #[tokio::test]
    async fn analyze_image_end_to_end() {
        let assembler = AnalysisAssembler::new(cloud_only(MockRecognizer::new(LABEL)), None);
        let result = assembler.analyze(vec![1, 2, 3], None, None).await;

        assert_eq!(result.method, ExtractionMethod::CloudOcr);
        assert_eq!(result.nutrition.fact(NutrientKey::Calories), Some(90.0));
        assert!(!result.claims.is_empty());
        assert!(result
            .claims
            .iter()
            .any(|c| c.status == ClaimStatus::Verified));
        assert!(result.narrative.is_none());
        assert!(result.notes.is_empty());
        assert!(result.data_completeness > 0.0);
    }

    #[tokio::test]
    async fn exhausted_extraction_still_reports() {
        let assembler = AnalysisAssembler::new(cloud_only(MockRecognizer::failing()), None);
        let result = assembler.analyze(vec![1], None, None).await;

        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(result.confidence, Confidence::Low);
        assert!(result.claims.is_empty());
        assert_eq!(result.data_completeness, 0.0);
        assert!(!result.debug_trail.is_empty());
    }

    #[tokio::test]
    async fn product_lookup_identifiers_flow_through() {
        let mut data = StructuredNutritionData::empty("Name: Oat Drink");
        data.nutrition_facts.insert(NutrientKey::Protein, 3.0);
        let lookup = Arc::new(MockProductLookup::new(ProductRecord {
            text: "Name: Oat Drink".into(),
            structured: Some(data),
        }));
        let orchestrator = ExtractionOrchestrator::builder()
            .retry(RetryPolicy::none())
            .product_lookup(lookup.clone())
            .build();
        let assembler = AnalysisAssembler::new(orchestrator, None);

        let result = assembler
            .analyze(Vec::new(), Some("5000112637922"), None)
            .await;
        assert_eq!(result.method, ExtractionMethod::ProductLookup);
        assert_eq!(result.confidence, Confidence::High);
        assert_eq!(result.nutrition.fact(NutrientKey::Protein), Some(3.0));
        assert_eq!(result.data_completeness, 10.0);
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn narrative_attached_when_advisor_present() {
        let advisor = Arc::new(
            MockAdvisor::new("Verified: fits the label.").with_product_reply(
                "GOOD choice overall.\nHigh in fiber which supports digestion.",
            ),
        );
        let assembler = AnalysisAssembler::new(
            cloud_only(MockRecognizer::new(LABEL)),
            Some(advisor.clone()),
        );
        let result = assembler.analyze(vec![1], None, None).await;

        let narrative = result.narrative.expect("narrative");
        assert_eq!(narrative.level, NarrativeLevel::Good);
        assert_eq!(advisor.product_calls(), 1);
        assert!(result.notes.is_empty());
    }

    #[tokio::test]
    async fn failing_advisor_degrades_to_notes() {
        let advisor = Arc::new(MockAdvisor::failing());
        let assembler =
            AnalysisAssembler::new(cloud_only(MockRecognizer::new(LABEL)), Some(advisor));
        let result = assembler.analyze(vec![1], None, None).await;

        assert!(result.narrative.is_none());
        assert_eq!(result.notes.len(), 1);
        assert!(result.notes[0].contains("narrative"));
        // Rule-matched claims are unaffected by the advisor failure.
        assert!(result
            .claims
            .iter()
            .any(|c| c.status == ClaimStatus::Verified));
    }

    #[tokio::test]
    async fn narrative_skipped_for_empty_record() {
        let advisor = Arc::new(MockAdvisor::new("GOOD"));
        let assembler =
            AnalysisAssembler::new(cloud_only(MockRecognizer::failing()), Some(advisor.clone()));
        let result = assembler.analyze(vec![1], None, None).await;

        assert!(result.narrative.is_none());
        assert_eq!(advisor.product_calls(), 0);
    }

    #[tokio::test]
    async fn analyze_text_skips_extraction() {
        let recognizer = Arc::new(MockRecognizer::new("unused"));
        let orchestrator = ExtractionOrchestrator::builder()
            .cloud_recognizer(recognizer.clone())
            .build();
        let assembler = AnalysisAssembler::new(orchestrator, None);

        let result = assembler.analyze_text(LABEL).await;
        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(result.debug_trail[0].tier, "text_input");
        assert_eq!(result.nutrition.fact(NutrientKey::Sodium), Some(20.0));
        assert_eq!(recognizer.calls(), 0);
    }

    #[tokio::test]
    async fn cancelled_request_returns_terminal_result() {
        let assembler = AnalysisAssembler::new(cloud_only(MockRecognizer::new(LABEL)), None);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = assembler
            .analyze_image(RawImage::new(vec![1]), cancel)
            .await;

        assert_eq!(result.method, ExtractionMethod::None);
        assert!(result
            .debug_trail
            .iter()
            .any(|e| e.status == TierStatus::Cancelled));
    }

    #[tokio::test]
    async fn request_ids_are_unique() {
        let assembler = AnalysisAssembler::new(cloud_only(MockRecognizer::new(LABEL)), None);
        let a = assembler.analyze_text(LABEL).await;
        let b = assembler.analyze_text(LABEL).await;
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn completeness_is_capped() {
        let mut data = StructuredNutritionData::empty("");
        assert_eq!(data_completeness(&data), 0.0);
        for (i, key) in [
            NutrientKey::Calories,
            NutrientKey::TotalFat,
            NutrientKey::SaturatedFat,
            NutrientKey::Sodium,
        ]
        .into_iter()
        .enumerate()
        {
            data.nutrition_facts.insert(key, i as f64);
        }
        assert_eq!(data_completeness(&data), 40.0);
        for key in [
            NutrientKey::Protein,
            NutrientKey::DietaryFiber,
            NutrientKey::TotalSugars,
            NutrientKey::TotalCarbs,
            NutrientKey::Cholesterol,
            NutrientKey::TransFat,
            NutrientKey::Calcium,
            NutrientKey::Iron,
        ] {
            data.nutrition_facts.insert(key, 1.0);
        }
        assert_eq!(data_completeness(&data), 100.0);
    }

    #[tokio::test]
    async fn case_changing_letters_keep_the_read() {
        let reply = "\u{212A} Ingredients: oats, salt\nCalories 120\nTotal Fat 3g";
        let assembler = AnalysisAssembler::new(cloud_only(MockRecognizer::new(reply)), None);
        let result = assembler.analyze(vec![1], None, None).await;

        assert_eq!(result.method, ExtractionMethod::CloudOcr);
        assert_eq!(result.nutrition.fact(NutrientKey::Calories), Some(120.0));
        assert!(result.notes.is_empty());
    }

    #[tokio::test]
    async fn abandoned_request_stops_before_later_tiers() {
        let cloud = Arc::new(MockRecognizer::new("unused").with_transient_failures(usize::MAX));
        let local = Arc::new(MockRecognizer::new("Calories 120").with_name("local"));
        let engine = Arc::clone(&local);
        let pool = EnginePool::new(move |_| Ok(Arc::clone(&engine) as Arc<dyn TextRecognizer>));
        let orchestrator = ExtractionOrchestrator::builder()
            .retry(RetryPolicy {
                max_retries: 2,
                backoff: Duration::from_millis(200),
            })
            .cloud_recognizer(cloud.clone())
            .local_engines(pool, EngineKey::new("llava:7b", &["en"]))
            .preprocessor(Box::new(MockImagePreprocessor::new()))
            .build();
        let assembler = AnalysisAssembler::new(orchestrator, None);

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            assembler.analyze(vec![1, 2, 3], None, None),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(cloud.calls(), 1);
        assert_eq!(local.calls(), 0);
    }

    #[tokio::test]
    async fn completed_request_leaves_caller_token_alone() {
        let assembler = AnalysisAssembler::new(cloud_only(MockRecognizer::new(LABEL)), None);
        let cancel = CancellationToken::new();
        let result = assembler
            .analyze_image(RawImage::new(vec![1]), cancel.clone())
            .await;

        assert_eq!(result.method, ExtractionMethod::CloudOcr);
        assert!(!cancel.is_cancelled());
    }

    #[tokio::test]
    async fn panicking_advisor_does_not_block_scoring() {
        let assembler = AnalysisAssembler::new(
            cloud_only(MockRecognizer::new("unused")),
            Some(Arc::new(PanickingAdvisor)),
        );
        let text = "Organic Oats\nCalories 120\nTotal Fat 3g\nProtein 4g\nIngredients: oats, salt";
        let result = assembler.analyze_text(text).await;

        assert!(!result.claims.is_empty());
        assert!(result
            .claims
            .iter()
            .all(|c| c.status == ClaimStatus::Unknown));
        assert!(result
            .notes
            .iter()
            .any(|n| n.starts_with("Claim verification failed")));
        assert!(result
            .notes
            .iter()
            .any(|n| n.starts_with("Product narrative failed")));
        assert!(result.narrative.is_none());
        let expected = ScienceScorer::new().score(
            &result.nutrition.nutrition_facts,
            &result.nutrition.ingredients,
        );
        assert_eq!(result.science, expected);
    }
}
