/*!
 * Quality-gated retry loop.
 *
 * `ContextAwareTranslator` translates, asks the evaluator to score the
 * result against the request context, and tries again with a slightly
 * higher temperature until the best score reaches the quality threshold
 * or the retry budget runs out. The best-scoring attempt wins; every
 * attempt is returned as history.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::TranslationError;
use crate::translation::elapsed_secs;
use crate::translation::evaluator::{EvaluationResult, Evaluator};
use crate::translation::translator::{DEFAULT_TEMPERATURE, LanguagePair, TranslationResult, Translator};

pub use crate::providers::MAX_TEMPERATURE;

const HIGH_QUALITY_MESSAGE: &str = "Translation meets quality standards.";
const LOW_QUALITY_MESSAGE: &str = "Could not achieve high-quality translation with the given context.";

/// Acceptance policy, fixed for the lifetime of an orchestrator
#[derive(Debug, Clone, PartialEq)]
pub struct QualityGate {
    /// Minimum overall score to accept a translation
    pub quality_threshold: f64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Temperature added per retry
    pub temperature_step: f32,
    /// Stop starting new attempts once this much time has passed
    pub deadline: Option<Duration>,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self {
            quality_threshold: 8.5,
            max_retries: 2,
            temperature_step: 0.1,
            deadline: None,
        }
    }
}

impl QualityGate {
    /// Temperature for zero-based attempt `index`, clamped and rounded to 2 decimals
    pub fn temperature_for(&self, base_temperature: f32, index: u32) -> f32 {
        self.temperature_within(base_temperature, index, MAX_TEMPERATURE)
    }

    /// Like `temperature_for`, clamped to a backend-specific `ceiling` instead
    pub fn temperature_within(&self, base_temperature: f32, index: u32, ceiling: f32) -> f32 {
        let raw = (base_temperature + index as f32 * self.temperature_step).min(ceiling.min(MAX_TEMPERATURE));
        let rounded = (raw * 100.0).round() / 100.0;
        // Rounding must not step over a ceiling finer than two decimals
        rounded.min(ceiling)
    }
}

/// Input to one orchestration call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    /// Domain context; required
    pub context: String,
    #[serde(default = "default_base_temperature")]
    pub base_temperature: f32,
}

fn default_base_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            context: context.into(),
            base_temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, base_temperature: f32) -> Self {
        self.base_temperature = base_temperature;
        self
    }

    pub fn languages(&self) -> LanguagePair {
        LanguagePair::new(&self.source_language, &self.target_language)
    }

    /// Check the preconditions of an orchestration call
    pub fn validate(&self) -> Result<(), TranslationError> {
        if self.text.trim().is_empty() {
            return Err(TranslationError::InvalidRequest("text must not be empty".to_string()));
        }
        if self.context.trim().is_empty() {
            return Err(TranslationError::InvalidRequest("context must not be empty".to_string()));
        }
        if self.source_language.trim().is_empty() || self.target_language.trim().is_empty() {
            return Err(TranslationError::InvalidRequest(
                "source and target language are required".to_string(),
            ));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.base_temperature) {
            return Err(TranslationError::InvalidRequest(format!(
                "base temperature {} is outside 0.0..={}",
                self.base_temperature, MAX_TEMPERATURE
            )));
        }
        Ok(())
    }
}

/// One translate-then-evaluate trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// 1-based attempt number
    pub attempt: u32,
    pub temperature: f32,
    pub translation: TranslationResult,
    /// Absent when the translation itself failed
    pub evaluation: Option<EvaluationResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    HighQuality,
    LowQuality,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidRequest,
    TranslatorFailed,
    NoUsableAttempt,
}

/// Best translation found, with full history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedTranslation {
    pub original_text: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub context: String,
    pub best_score: f64,
    pub quality_status: QualityStatus,
    pub message: String,
    pub attempts: Vec<Attempt>,
    pub attempts_count: usize,
    pub translation_model: String,
    pub evaluation_model: String,
    pub total_time_secs: f64,
}

/// Why no translation could be returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTranslation {
    pub error: String,
    pub kind: FailureKind,
    pub source_language: String,
    pub target_language: String,
    pub attempts: Vec<Attempt>,
    pub total_time_secs: f64,
}

/// Final result of an orchestration call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestOutcome {
    Accepted(AcceptedTranslation),
    Failed(FailedTranslation),
}

impl RequestOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn attempts(&self) -> &[Attempt] {
        match self {
            Self::Accepted(accepted) => &accepted.attempts,
            Self::Failed(failed) => &failed.attempts,
        }
    }

    pub fn best_score(&self) -> Option<f64> {
        match self {
            Self::Accepted(accepted) => Some(accepted.best_score),
            Self::Failed(_) => None,
        }
    }

    pub fn translated_text(&self) -> Option<&str> {
        match self {
            Self::Accepted(accepted) => Some(&accepted.translated_text),
            Self::Failed(_) => None,
        }
    }

    pub fn quality_status(&self) -> Option<QualityStatus> {
        match self {
            Self::Accepted(accepted) => Some(accepted.quality_status),
            Self::Failed(_) => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed(failed) => Some(failed.kind),
            Self::Accepted(_) => None,
        }
    }
}

/// Translator with evaluation-driven retries
#[derive(Debug, Clone)]
pub struct ContextAwareTranslator {
    translator: Translator,
    evaluator: Evaluator,
    gate: QualityGate,
}

impl ContextAwareTranslator {
    pub fn new(translator: Translator, evaluator: Evaluator, gate: QualityGate) -> Self {
        if translator.model() == evaluator.model() {
            warn!(
                "Using the same model ({}) for translation and evaluation may lead to biased results.",
                translator.model()
            );
        }
        Self {
            translator,
            evaluator,
            gate,
        }
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    pub fn translation_model(&self) -> &str {
        self.translator.model()
    }

    pub fn evaluation_model(&self) -> &str {
        self.evaluator.model()
    }

    /// Produce the best translation reachable within the attempt budget
    pub async fn translate(&self, request: &TranslationRequest) -> RequestOutcome {
        let start = Instant::now();
        let languages = request.languages();

        if let Err(e) = request.validate() {
            warn!("Rejected translation request: {}", e);
            return self.failure(request, e.to_string(), FailureKind::InvalidRequest, Vec::new(), start);
        }

        let ceiling = self.translator.max_temperature();
        if request.base_temperature > ceiling {
            let error = TranslationError::InvalidRequest(format!(
                "base temperature {} is above the {} maximum for the translation provider",
                request.base_temperature, ceiling
            ));
            warn!("Rejected translation request: {}", error);
            return self.failure(request, error.to_string(), FailureKind::InvalidRequest, Vec::new(), start);
        }

        let mut attempts: Vec<Attempt> = Vec::new();
        let mut best: Option<String> = None;
        let mut best_score = 0.0_f64;

        for index in 0..=self.gate.max_retries {
            if index > 0 {
                if let Some(deadline) = self.gate.deadline {
                    if start.elapsed() >= deadline {
                        info!(
                            "Deadline of {:?} reached after {} attempt(s), keeping best so far",
                            deadline,
                            attempts.len()
                        );
                        break;
                    }
                }
            }

            let number = index + 1;
            let temperature = self.gate.temperature_within(request.base_temperature, index, ceiling);
            debug!("Attempt {} for {} at temperature {:.2}", number, languages, temperature);

            let translation = self
                .translator
                .translate(&request.text, &languages, Some(request.context.as_str()), temperature)
                .await;

            let translated_text = match translation.text() {
                Some(text) => text.to_string(),
                None => {
                    let error = translation
                        .error()
                        .unwrap_or("translation failed")
                        .to_string();
                    warn!("Attempt {} translation failed, giving up: {}", number, error);
                    attempts.push(Attempt {
                        attempt: number,
                        temperature,
                        translation,
                        evaluation: None,
                    });
                    return self.failure(request, error, FailureKind::TranslatorFailed, attempts, start);
                }
            };

            let evaluation = self
                .evaluator
                .evaluate_with_context(&request.text, &translated_text, &request.context, &languages)
                .await;
            let scored = evaluation.scores().map(|s| s.overall_quality);

            attempts.push(Attempt {
                attempt: number,
                temperature,
                translation,
                evaluation: Some(evaluation),
            });

            let Some(score) = scored else {
                warn!("Attempt {} could not be evaluated, not scoring it", number);
                continue;
            };

            info!("Attempt {} scored {:.1} (best {:.1})", number, score, best_score);
            if score > best_score {
                best = Some(translated_text);
                best_score = score;
            }
            if best_score >= self.gate.quality_threshold {
                break;
            }
        }

        let Some(translated_text) = best else {
            return self.failure(
                request,
                TranslationError::NoUsableAttempt.to_string(),
                FailureKind::NoUsableAttempt,
                attempts,
                start,
            );
        };

        let (quality_status, message) = if best_score >= self.gate.quality_threshold {
            (QualityStatus::HighQuality, HIGH_QUALITY_MESSAGE)
        } else {
            (QualityStatus::LowQuality, LOW_QUALITY_MESSAGE)
        };

        RequestOutcome::Accepted(AcceptedTranslation {
            original_text: request.text.clone(),
            translated_text,
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            context: request.context.clone(),
            best_score,
            quality_status,
            message: message.to_string(),
            attempts_count: attempts.len(),
            attempts,
            translation_model: self.translator.model().to_string(),
            evaluation_model: self.evaluator.model().to_string(),
            total_time_secs: elapsed_secs(start.elapsed()),
        })
    }

    /// Run independent requests with at most `concurrency` in flight; results keep request order
    pub async fn translate_many(&self, requests: &[TranslationRequest], concurrency: usize) -> Vec<RequestOutcome> {
        self.translate_many_with(requests, concurrency, |_| {}).await
    }

    /// `translate_many`, calling `on_complete` as each request finishes
    pub async fn translate_many_with<F>(
        &self,
        requests: &[TranslationRequest],
        concurrency: usize,
        on_complete: F,
    ) -> Vec<RequestOutcome>
    where
        F: Fn(&RequestOutcome),
    {
        let on_complete = &on_complete;
        stream::iter(requests)
            .map(|request| async move {
                let outcome = self.translate(request).await;
                on_complete(&outcome);
                outcome
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    fn failure(
        &self,
        request: &TranslationRequest,
        error: String,
        kind: FailureKind,
        attempts: Vec<Attempt>,
        start: Instant,
    ) -> RequestOutcome {
        RequestOutcome::Failed(FailedTranslation {
            error,
            kind,
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            attempts,
            total_time_secs: elapsed_secs(start.elapsed()),
        })
    }
}
