pub mod standards;
pub mod parsing;
pub mod verification;
pub mod scoring;
pub mod extraction;
pub mod advisory;
pub mod assembler;

pub use assembler::{data_completeness, AnalysisAssembler, AnalysisResult};
pub use extraction::{CancellationToken, ExtractionOrchestrator, ExtractionResult, RawImage};
pub use parsing::{NutritionFactsParser, StructuredNutritionData};
pub use scoring::{ScienceAssessment, ScienceScorer};
pub use standards::NutrientKey;
pub use verification::{ClaimStatus, ClaimVerification, ClaimVerifier};
