/*!
 * Quality-gated translation.
 *
 * This module contains the translation pipeline. It is split into several
 * submodules:
 *
 * - `translator`: one provider call per translation, never fails loudly
 * - `evaluator`: one provider call per quality assessment
 * - `orchestrator`: the retry loop that keeps the best-scoring attempt
 * - `prompts`: prompt templates and the registry that renders them
 */

use std::time::Duration;

pub use self::evaluator::{
    EvaluationBasis, EvaluationMode, EvaluationOutcome, EvaluationResult, EvaluationScores, Evaluator,
};
pub use self::orchestrator::{
    AcceptedTranslation, Attempt, ContextAwareTranslator, FailedTranslation, FailureKind, QualityGate,
    QualityStatus, RequestOutcome, TranslationRequest,
};
pub use self::prompts::{PromptKind, PromptRegistry, PromptTemplate};
pub use self::translator::{LanguagePair, TokenUsage, TranslationOutcome, TranslationResult, Translator};

pub mod evaluator;
pub mod orchestrator;
pub mod prompts;
pub mod translator;

/// Seconds rounded to millisecond precision, for reporting
pub(crate) fn elapsed_secs(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}
