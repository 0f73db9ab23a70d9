/*!
 * Built-in prompt templates for translation and evaluation.
 *
 * Placeholders use the `{name}` form. Evaluation prompts name the JSON keys
 * the evaluator parses without quoting a JSON example, so template content
 * never contains braces other than placeholders.
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::PromptError;

/// Identifies one prompt template in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    TranslationSystem,
    TranslationUser,
    EvaluationSystemWithReference,
    EvaluationUserWithReference,
    EvaluationSystemWithoutReference,
    EvaluationUserWithoutReference,
    EvaluationSystemWithContext,
    EvaluationUserWithContext,
}

impl PromptKind {
    /// Every kind, in registry order
    pub const ALL: [PromptKind; 8] = [
        PromptKind::TranslationSystem,
        PromptKind::TranslationUser,
        PromptKind::EvaluationSystemWithReference,
        PromptKind::EvaluationUserWithReference,
        PromptKind::EvaluationSystemWithoutReference,
        PromptKind::EvaluationUserWithoutReference,
        PromptKind::EvaluationSystemWithContext,
        PromptKind::EvaluationUserWithContext,
    ];

    /// Stable snake_case name used in config files and listings
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranslationSystem => "translation_system",
            Self::TranslationUser => "translation_user",
            Self::EvaluationSystemWithReference => "evaluation_system_with_reference",
            Self::EvaluationUserWithReference => "evaluation_user_with_reference",
            Self::EvaluationSystemWithoutReference => "evaluation_system_without_reference",
            Self::EvaluationUserWithoutReference => "evaluation_user_without_reference",
            Self::EvaluationSystemWithContext => "evaluation_system_with_context",
            Self::EvaluationUserWithContext => "evaluation_user_with_context",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| PromptError::UnknownTemplate(s.to_string()))
    }
}

/// A prompt template with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Template text with `{name}` placeholders
    pub content: String,
    /// Human readable purpose
    pub description: String,
    /// Variables that must be supplied when rendering
    pub variables: Vec<String>,
    /// Template version string
    pub version: String,
}

impl PromptTemplate {
    /// Create a version 1.0 template
    pub fn new(content: &str, description: &str, variables: &[&str]) -> Self {
        Self {
            content: content.to_string(),
            description: description.to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            version: "1.0".to_string(),
        }
    }

    /// Whether `name` is a declared variable
    pub fn declares(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }
}

const TRANSLATION_SYSTEM: &str = "You are a professional translator. Provide accurate, natural translations that preserve the meaning and tone of the original text.";

const TRANSLATION_USER: &str = "Translate the following text from {source_lang} to {target_lang}:\n\n{text}{context_section}\n\nProvide only the translation, nothing else.";

/// Appended to the translation user prompt when context is given
pub const CONTEXT_SECTION: &str = "\n\nContext for this translation: {context}\nUse this context to ensure accurate translation of domain-specific terms and concepts.";

const EVALUATION_SYSTEM_WITH_REFERENCE: &str = r#"You are a professional translation evaluator fluent in both {source_lang} and {target_lang}.
Assess the quality of the machine translation compared to the reference translation.

Score on a scale of 0-10 for:
1. Accuracy (meaning preservation compared to reference)
2. Fluency (natural {target_lang} usage)
3. Terminology (appropriate use of domain-specific terms)
4. Overall quality

Respond with a single JSON object using the keys "accuracy", "fluency", "terminology", "overall_quality" and "explanation" (a brief justification)."#;

const EVALUATION_USER_WITH_REFERENCE: &str =
    "Source text: {source_text}\n\nMachine translation: {translated_text}\n\nReference translation: {reference_text}";

const EVALUATION_SYSTEM_WITHOUT_REFERENCE: &str = r#"You are a professional translation evaluator fluent in both {source_lang} and {target_lang}.
Assess the quality of the machine translation from {source_lang} to {target_lang}.

Score on a scale of 0-10 for:
1. Accuracy (meaning preservation)
2. Fluency (natural {target_lang} usage)
3. Terminology (appropriate use of domain-specific terms)
4. Overall quality

Respond with a single JSON object using the keys "accuracy", "fluency", "terminology", "overall_quality" and "explanation" (a brief justification)."#;

const EVALUATION_USER_WITHOUT_REFERENCE: &str =
    "Source text ({source_lang}): {source_text}\n\nMachine translation ({target_lang}): {translated_text}";

const EVALUATION_SYSTEM_WITH_CONTEXT: &str = r#"You are a professional translation evaluator fluent in both {source_lang} and {target_lang}.
Assess the quality of the machine translation from {source_lang} to {target_lang}.
The translation should accurately reflect the meaning of the source text while using appropriate terminology from the provided context.

Score on a scale of 0-10 for:
1. Accuracy (meaning preservation)
2. Fluency (natural {target_lang} usage)
3. Context relevance (appropriate use of domain-specific terminology from context)
4. Overall quality

Respond with a single JSON object using the keys "accuracy", "fluency", "context_relevance", "overall_quality" and "explanation" (a brief justification)."#;

const EVALUATION_USER_WITH_CONTEXT: &str = "Source text ({source_lang}): {source_text}\n\nMachine translation ({target_lang}): {translated_text}\n\nContext: {context}";

/// The built-in template for `kind`
pub fn default_template(kind: PromptKind) -> PromptTemplate {
    match kind {
        PromptKind::TranslationSystem => {
            PromptTemplate::new(TRANSLATION_SYSTEM, "System prompt for translation tasks", &[])
        }
        PromptKind::TranslationUser => PromptTemplate::new(
            TRANSLATION_USER,
            "User prompt for translation with optional context",
            &["source_lang", "target_lang", "text", "context_section"],
        ),
        PromptKind::EvaluationSystemWithReference => PromptTemplate::new(
            EVALUATION_SYSTEM_WITH_REFERENCE,
            "System prompt for evaluation with reference translation",
            &["source_lang", "target_lang"],
        ),
        PromptKind::EvaluationUserWithReference => PromptTemplate::new(
            EVALUATION_USER_WITH_REFERENCE,
            "User prompt for evaluation with reference",
            &["source_text", "translated_text", "reference_text"],
        ),
        PromptKind::EvaluationSystemWithoutReference => PromptTemplate::new(
            EVALUATION_SYSTEM_WITHOUT_REFERENCE,
            "System prompt for evaluation without reference",
            &["source_lang", "target_lang"],
        ),
        PromptKind::EvaluationUserWithoutReference => PromptTemplate::new(
            EVALUATION_USER_WITHOUT_REFERENCE,
            "User prompt for evaluation without reference",
            &["source_lang", "target_lang", "source_text", "translated_text"],
        ),
        PromptKind::EvaluationSystemWithContext => PromptTemplate::new(
            EVALUATION_SYSTEM_WITH_CONTEXT,
            "System prompt for evaluation with context",
            &["source_lang", "target_lang"],
        ),
        PromptKind::EvaluationUserWithContext => PromptTemplate::new(
            EVALUATION_USER_WITH_CONTEXT,
            "User prompt for evaluation with context",
            &["source_lang", "target_lang", "source_text", "translated_text", "context"],
        ),
    }
}
