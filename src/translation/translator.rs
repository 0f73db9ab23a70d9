/*!
 * Single-call translator.
 *
 * A `Translator` renders the translation prompts, sends one completion
 * request and folds the outcome into a `TranslationResult`. Provider and
 * prompt failures are captured in the result instead of being returned
 * as errors, so callers always get usage and timing back.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

use crate::cost_analyzer::usage_cost;
use crate::errors::TranslationError;
use crate::providers::{CompletionRequest, CompletionResponse, MAX_TEMPERATURE, Provider};
use crate::translation::elapsed_secs;
use crate::translation::prompts::PromptRegistry;

/// Default temperature for standalone translations
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default completion budget for a translation
pub const DEFAULT_MAX_TOKENS: u32 = 500;

const SUPPORTED_MODELS: [&str; 5] = ["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo", "gpt-4o", "gpt-4o-mini"];

/// Source and target language, as names used in prompts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub source: String,
    pub target: String,
}

impl LanguagePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Token usage reported for one provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Usage from a provider response, if the backend reported any
    pub fn from_response(response: &CompletionResponse) -> Option<Self> {
        response.total_tokens().map(|total_tokens| Self {
            prompt_tokens: response.prompt_tokens.unwrap_or(0),
            completion_tokens: response.completion_tokens.unwrap_or(0),
            total_tokens,
        })
    }
}

/// Translated text or the reason there is none
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranslationOutcome {
    Translated { translated_text: String },
    Failed { error: String },
}

/// Result of one translation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub languages: LanguagePair,
    pub context: Option<String>,
    /// Model identifier the request was sent to
    pub model: String,
    pub temperature: f32,
    #[serde(flatten)]
    pub outcome: TranslationOutcome,
    pub usage: Option<TokenUsage>,
    /// Estimated USD cost from the pricing table, 0 for unknown models
    pub cost_estimate: f64,
    /// Wall time in seconds, millisecond precision
    pub elapsed_secs: f64,
}

impl TranslationResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, TranslationOutcome::Translated { .. })
    }

    /// The translated text on success
    pub fn text(&self) -> Option<&str> {
        match &self.outcome {
            TranslationOutcome::Translated { translated_text } => Some(translated_text),
            TranslationOutcome::Failed { .. } => None,
        }
    }

    /// The error description on failure
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            TranslationOutcome::Failed { error } => Some(error),
            TranslationOutcome::Translated { .. } => None,
        }
    }

    /// Total tokens, 0 when unreported
    pub fn tokens_used(&self) -> u64 {
        self.usage.map(|u| u.total_tokens).unwrap_or(0)
    }
}

/// Outcome of a connection probe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionCheck {
    pub success: bool,
    pub message: String,
    pub model: String,
    pub test_translation: Option<String>,
}

/// Translates text with one provider call per request
#[derive(Debug, Clone)]
pub struct Translator {
    model: String,
    client: Option<Arc<dyn Provider>>,
    prompts: Arc<PromptRegistry>,
    max_tokens: u32,
}

impl Translator {
    /// Create a translator for `model`, optionally bound to a default client
    pub fn new(model: impl Into<String>, client: Option<Arc<dyn Provider>>, prompts: Arc<PromptRegistry>) -> Self {
        Self {
            model: model.into(),
            client,
            prompts,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Override the completion budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Temperature ceiling of the default client
    pub fn max_temperature(&self) -> f32 {
        self.client.as_ref().map_or(MAX_TEMPERATURE, |client| client.max_temperature())
    }

    /// Models this translator is known to work with
    pub fn supported_models() -> &'static [&'static str] {
        &SUPPORTED_MODELS
    }

    /// Translate using the default client
    pub async fn translate(
        &self,
        text: &str,
        languages: &LanguagePair,
        context: Option<&str>,
        temperature: f32,
    ) -> TranslationResult {
        self.translate_with_client(text, languages, context, temperature, None)
            .await
    }

    /// Translate using `client` if given, else the default client
    pub async fn translate_with_client(
        &self,
        text: &str,
        languages: &LanguagePair,
        context: Option<&str>,
        temperature: f32,
        client: Option<&dyn Provider>,
    ) -> TranslationResult {
        let start = Instant::now();
        let (outcome, usage) = match self.call(text, languages, context, temperature, client).await {
            Ok(response) => {
                let usage = TokenUsage::from_response(&response);
                let translated = response.text.trim();
                if translated.is_empty() {
                    warn!("{} returned an empty translation", self.model);
                    (
                        TranslationOutcome::Failed {
                            error: crate::errors::ProviderError::EmptyResponse.to_string(),
                        },
                        usage,
                    )
                } else {
                    (
                        TranslationOutcome::Translated {
                            translated_text: translated.to_string(),
                        },
                        usage,
                    )
                }
            }
            Err(e) => {
                warn!("Translation with {} failed: {}", self.model, e);
                (TranslationOutcome::Failed { error: e.to_string() }, None)
            }
        };

        let result = TranslationResult {
            original_text: text.to_string(),
            languages: languages.clone(),
            context: context.map(str::to_string),
            model: self.model.clone(),
            temperature,
            cost_estimate: usage_cost(&self.model, usage.as_ref()),
            outcome,
            usage,
            elapsed_secs: elapsed_secs(start.elapsed()),
        };
        debug!(
            "Translated {} chars ({}) at temperature {:.2}: success={} tokens={}",
            text.chars().count(),
            languages,
            temperature,
            result.success(),
            result.tokens_used()
        );
        result
    }

    async fn call(
        &self,
        text: &str,
        languages: &LanguagePair,
        context: Option<&str>,
        temperature: f32,
        client: Option<&dyn Provider>,
    ) -> Result<CompletionResponse, TranslationError> {
        let client = client
            .or(self.client.as_deref())
            .ok_or(TranslationError::MissingClient)?;

        if text.trim().is_empty() {
            return Err(TranslationError::InvalidRequest("text to translate is empty".to_string()));
        }

        let prompts = self
            .prompts
            .translation_prompts(&languages.source, &languages.target, text, context)?;
        let request = CompletionRequest::new(&self.model, prompts.user)
            .system(prompts.system)
            .temperature(temperature)
            .max_tokens(self.max_tokens);

        Ok(client.complete(request).await?)
    }

    /// Translate each text in order with the default temperature
    pub async fn batch_translate(
        &self,
        texts: &[String],
        languages: &LanguagePair,
        context: Option<&str>,
    ) -> Vec<TranslationResult> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.translate(text, languages, context, DEFAULT_TEMPERATURE).await);
        }
        results
    }

    /// Translate a fixed phrase to check the default client works
    pub async fn test_connection(&self) -> ConnectionCheck {
        let languages = LanguagePair::new("English", "Spanish");
        let result = self
            .translate("Hello, world!", &languages, None, DEFAULT_TEMPERATURE)
            .await;

        ConnectionCheck {
            success: result.success(),
            message: match result.error() {
                None => "Connection successful".to_string(),
                Some(error) => format!("Connection failed: {}", error),
            },
            model: self.model.clone(),
            test_translation: result.text().map(str::to_string),
        }
    }
}
