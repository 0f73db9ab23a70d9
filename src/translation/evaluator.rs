/*!
 * LLM-based translation quality evaluation.
 *
 * The evaluator asks a (preferably stronger) model to score a translation
 * on a 0-10 scale and parses the JSON answer into `EvaluationScores`.
 * Three modes are supported: against a reference translation, against the
 * source alone, and against the domain context used for translating.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

use crate::cost_analyzer::usage_cost;
use crate::errors::EvaluationError;
use crate::providers::{CompletionRequest, Provider};
use crate::translation::elapsed_secs;
use crate::translation::prompts::{PromptPair, PromptRegistry};
use crate::translation::translator::{LanguagePair, TokenUsage, TranslationResult};

/// Default sampling temperature for evaluation calls
pub const DEFAULT_EVALUATION_TEMPERATURE: f32 = 0.1;

const DEFAULT_MAX_TOKENS: u32 = 500;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("code fence pattern is valid"));

/// Scores returned by the evaluation model
///
/// Keys are canonical snake_case; the capitalised and spaced spellings
/// models commonly produce are accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationScores {
    #[serde(alias = "Accuracy")]
    pub accuracy: f64,
    #[serde(alias = "Fluency")]
    pub fluency: f64,
    #[serde(default, alias = "Terminology", skip_serializing_if = "Option::is_none")]
    pub terminology: Option<f64>,
    #[serde(
        default,
        alias = "Context Relevance",
        alias = "Context relevance",
        alias = "context relevance",
        alias = "contextRelevance",
        skip_serializing_if = "Option::is_none"
    )]
    pub context_relevance: Option<f64>,
    #[serde(
        alias = "Overall quality",
        alias = "Overall Quality",
        alias = "overall quality",
        alias = "overallQuality"
    )]
    pub overall_quality: f64,
    #[serde(default, alias = "Explanation")]
    pub explanation: String,
}

impl EvaluationScores {
    /// Reject scores outside `0..=10`
    pub fn validate(&self) -> Result<(), EvaluationError> {
        let scores = [
            ("accuracy", Some(self.accuracy)),
            ("fluency", Some(self.fluency)),
            ("terminology", self.terminology),
            ("context_relevance", self.context_relevance),
            ("overall_quality", Some(self.overall_quality)),
        ];
        for (field, value) in scores {
            if let Some(value) = value {
                if !(0.0..=10.0).contains(&value) {
                    return Err(EvaluationError::ScoreOutOfRange { field, value });
                }
            }
        }
        Ok(())
    }
}

/// Parse raw model output into validated scores.
///
/// Surrounding Markdown code fences are stripped; anything that is not a
/// JSON object with the canonical keys (or their aliases) is a schema error.
pub fn parse_evaluation(raw: &str) -> Result<EvaluationScores, EvaluationError> {
    let body = match CODE_FENCE.captures(raw) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => raw.trim(),
    };
    let scores: EvaluationScores =
        serde_json::from_str(body).map_err(|e| EvaluationError::Schema(e.to_string()))?;
    scores.validate()?;
    Ok(scores)
}

/// What the translation is judged against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationBasis<'a> {
    Reference(&'a str),
    SourceOnly,
    Context(&'a str),
}

impl EvaluationBasis<'_> {
    pub fn mode(&self) -> EvaluationMode {
        match self {
            Self::Reference(_) => EvaluationMode::WithReference,
            Self::SourceOnly => EvaluationMode::WithoutReference,
            Self::Context(_) => EvaluationMode::WithContext,
        }
    }
}

/// Evaluation mode, as reported in results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMode {
    WithReference,
    WithoutReference,
    WithContext,
}

/// Parsed scores or the reason there are none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Scored { scores: EvaluationScores },
    Failed { error: String },
}

/// Result of one evaluation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub eval_model: String,
    pub mode: EvaluationMode,
    #[serde(flatten)]
    pub outcome: EvaluationOutcome,
    /// Unparsed model output, when the provider answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    pub usage: Option<TokenUsage>,
    pub cost_estimate: f64,
    pub elapsed_secs: f64,
}

impl EvaluationResult {
    fn failed(eval_model: &str, mode: EvaluationMode, error: &EvaluationError) -> Self {
        Self {
            eval_model: eval_model.to_string(),
            mode,
            outcome: EvaluationOutcome::Failed { error: error.to_string() },
            raw_response: None,
            usage: None,
            cost_estimate: 0.0,
            elapsed_secs: 0.0,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, EvaluationOutcome::Scored { .. })
    }

    /// Overall score, 0 when the evaluation failed
    pub fn overall_score(&self) -> f64 {
        self.scores().map(|s| s.overall_quality).unwrap_or(0.0)
    }

    pub fn scores(&self) -> Option<&EvaluationScores> {
        match &self.outcome {
            EvaluationOutcome::Scored { scores } => Some(scores),
            EvaluationOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            EvaluationOutcome::Failed { error } => Some(error),
            EvaluationOutcome::Scored { .. } => None,
        }
    }

    /// Total tokens, 0 when unreported
    pub fn tokens_used(&self) -> u64 {
        self.usage.map(|u| u.total_tokens).unwrap_or(0)
    }
}

/// Scores translations with one provider call per evaluation
#[derive(Debug, Clone)]
pub struct Evaluator {
    eval_model: String,
    client: Option<Arc<dyn Provider>>,
    prompts: Arc<PromptRegistry>,
    temperature: f32,
    max_tokens: u32,
}

impl Evaluator {
    /// Create an evaluator for `eval_model`, optionally bound to a default client
    pub fn new(eval_model: impl Into<String>, client: Option<Arc<dyn Provider>>, prompts: Arc<PromptRegistry>) -> Self {
        Self {
            eval_model: eval_model.into(),
            client,
            prompts,
            temperature: DEFAULT_EVALUATION_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the evaluation temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.eval_model
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Judge `translated_text` against a reference translation
    pub async fn evaluate_with_reference(
        &self,
        source_text: &str,
        translated_text: &str,
        reference_text: &str,
        languages: &LanguagePair,
    ) -> EvaluationResult {
        self.evaluate(
            source_text,
            translated_text,
            languages,
            EvaluationBasis::Reference(reference_text),
            None,
        )
        .await
    }

    /// Judge `translated_text` against the source alone
    pub async fn evaluate_without_reference(
        &self,
        source_text: &str,
        translated_text: &str,
        languages: &LanguagePair,
    ) -> EvaluationResult {
        self.evaluate(source_text, translated_text, languages, EvaluationBasis::SourceOnly, None)
            .await
    }

    /// Judge `translated_text` including its use of the domain context
    pub async fn evaluate_with_context(
        &self,
        source_text: &str,
        translated_text: &str,
        context: &str,
        languages: &LanguagePair,
    ) -> EvaluationResult {
        self.evaluate(
            source_text,
            translated_text,
            languages,
            EvaluationBasis::Context(context),
            None,
        )
        .await
    }

    /// Evaluate with an explicit basis, using `client` if given, else the default client
    pub async fn evaluate(
        &self,
        source_text: &str,
        translated_text: &str,
        languages: &LanguagePair,
        basis: EvaluationBasis<'_>,
        client: Option<&dyn Provider>,
    ) -> EvaluationResult {
        let mode = basis.mode();
        let start = Instant::now();

        let client = match client.or(self.client.as_deref()) {
            Some(client) => client,
            None => return EvaluationResult::failed(&self.eval_model, mode, &EvaluationError::MissingClient),
        };

        let prompts = match self.prompts_for(source_text, translated_text, languages, basis) {
            Ok(prompts) => prompts,
            Err(e) => return EvaluationResult::failed(&self.eval_model, mode, &e),
        };

        let request = CompletionRequest::new(&self.eval_model, prompts.user)
            .system(prompts.system)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .json_output();

        let (outcome, raw_response, usage) = match client.complete(request).await {
            Ok(response) => {
                let usage = TokenUsage::from_response(&response);
                let outcome = match parse_evaluation(&response.text) {
                    Ok(scores) => EvaluationOutcome::Scored { scores },
                    Err(e) => {
                        warn!("Could not parse evaluation from {}: {}", self.eval_model, e);
                        EvaluationOutcome::Failed { error: e.to_string() }
                    }
                };
                (outcome, Some(response.text), usage)
            }
            Err(e) => {
                let error = EvaluationError::from(e);
                warn!("Evaluation with {} failed: {}", self.eval_model, error);
                (EvaluationOutcome::Failed { error: error.to_string() }, None, None)
            }
        };

        let result = EvaluationResult {
            eval_model: self.eval_model.clone(),
            mode,
            outcome,
            raw_response,
            cost_estimate: usage_cost(&self.eval_model, usage.as_ref()),
            usage,
            elapsed_secs: elapsed_secs(start.elapsed()),
        };
        debug!(
            "Evaluated {} translation ({:?}): success={} overall={:.1}",
            languages,
            mode,
            result.success(),
            result.overall_score()
        );
        result
    }

    fn prompts_for(
        &self,
        source_text: &str,
        translated_text: &str,
        languages: &LanguagePair,
        basis: EvaluationBasis<'_>,
    ) -> Result<PromptPair, EvaluationError> {
        let (source, target) = (languages.source.as_str(), languages.target.as_str());
        let pair = match basis {
            EvaluationBasis::Reference(reference) => self
                .prompts
                .evaluation_prompts_with_reference(source, target, source_text, translated_text, reference)?,
            EvaluationBasis::SourceOnly => self
                .prompts
                .evaluation_prompts_without_reference(source, target, source_text, translated_text)?,
            EvaluationBasis::Context(context) => self
                .prompts
                .evaluation_prompts_with_context(source, target, source_text, translated_text, context)?,
        };
        Ok(pair)
    }

    /// Evaluate translations in order.
    ///
    /// Index `i` is judged against `references[i]` when present, otherwise
    /// against the source alone. Failed translations are not sent to the model.
    pub async fn batch_evaluate(
        &self,
        translations: &[TranslationResult],
        references: Option<&[String]>,
    ) -> Vec<EvaluationResult> {
        let mut results = Vec::with_capacity(translations.len());
        for (i, translation) in translations.iter().enumerate() {
            let reference = references.and_then(|refs| refs.get(i));
            let mode = if reference.is_some() {
                EvaluationMode::WithReference
            } else {
                EvaluationMode::WithoutReference
            };

            let Some(translated_text) = translation.text() else {
                results.push(EvaluationResult::failed(
                    &self.eval_model,
                    mode,
                    &EvaluationError::FailedTranslation,
                ));
                continue;
            };

            let basis = match reference {
                Some(reference) => EvaluationBasis::Reference(reference),
                None => EvaluationBasis::SourceOnly,
            };
            results.push(
                self.evaluate(
                    &translation.original_text,
                    translated_text,
                    &translation.languages,
                    basis,
                    None,
                )
                .await,
            );
        }
        results
    }
}
