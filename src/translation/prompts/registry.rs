/*!
 * Prompt registry.
 *
 * The registry maps each `PromptKind` to its template. It is built once,
 * optionally patched with configured overrides, then shared read-only
 * behind an `Arc` by the translator and the evaluator.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::errors::PromptError;
use crate::translation::prompts::templates::{CONTEXT_SECTION, PromptKind, PromptTemplate, default_template};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid"));

const PREVIEW_CHARS: usize = 100;

/// Rendered system and user prompts for one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Listing entry for one template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptSummary {
    pub kind: PromptKind,
    pub description: String,
    pub variables: Vec<String>,
    pub version: String,
    /// First 100 characters of the content, with "..." when truncated
    pub content_preview: String,
}

/// Registry of prompt templates keyed by kind
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    templates: BTreeMap<PromptKind, PromptTemplate>,
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRegistry {
    /// Registry with the built-in templates
    pub fn new() -> Self {
        let templates = PromptKind::ALL
            .iter()
            .map(|kind| (*kind, default_template(*kind)))
            .collect();
        Self { templates }
    }

    /// Registry with built-ins patched by `overrides` (kind name to content)
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, PromptError> {
        let mut registry = Self::new();
        for (name, content) in overrides {
            let kind: PromptKind = name.parse()?;
            registry.update(kind, content, None, None)?;
        }
        Ok(registry)
    }

    /// Template for `kind`
    pub fn get(&self, kind: PromptKind) -> Result<&PromptTemplate, PromptError> {
        self.templates
            .get(&kind)
            .ok_or_else(|| PromptError::UnknownTemplate(kind.to_string()))
    }

    /// Render `kind` with `vars`.
    ///
    /// Fails when a declared variable is not supplied, or when the content
    /// still holds a placeholder with no supplied value.
    pub fn render(&self, kind: PromptKind, vars: &[(&str, &str)]) -> Result<String, PromptError> {
        let template = self.get(kind)?;
        let supplied: BTreeMap<&str, &str> = vars.iter().copied().collect();

        let missing: Vec<String> = template
            .variables
            .iter()
            .filter(|v| !supplied.contains_key(v.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if !missing.is_empty() {
            return Err(PromptError::MissingVariables {
                kind: kind.to_string(),
                missing,
            });
        }

        if let Some(unresolved) = placeholders(&template.content)
            .into_iter()
            .find(|name| !supplied.contains_key(name.as_str()))
        {
            return Err(PromptError::UndeclaredPlaceholder {
                kind: kind.to_string(),
                placeholder: unresolved,
            });
        }

        // Single pass, so placeholder-like text inside values is left alone
        let rendered = PLACEHOLDER.replace_all(&template.content, |caps: &Captures| {
            supplied.get(&caps[1]).copied().unwrap_or_default().to_string()
        });
        Ok(rendered.into_owned())
    }

    /// System and user prompts for a translation
    pub fn translation_prompts(
        &self,
        source_lang: &str,
        target_lang: &str,
        text: &str,
        context: Option<&str>,
    ) -> Result<PromptPair, PromptError> {
        let context_section = match context {
            Some(context) if !context.trim().is_empty() => CONTEXT_SECTION.replace("{context}", context),
            _ => String::new(),
        };

        Ok(PromptPair {
            system: self.render(PromptKind::TranslationSystem, &[])?,
            user: self.render(
                PromptKind::TranslationUser,
                &[
                    ("source_lang", source_lang),
                    ("target_lang", target_lang),
                    ("text", text),
                    ("context_section", &context_section),
                ],
            )?,
        })
    }

    /// Evaluation prompts comparing against a reference translation
    pub fn evaluation_prompts_with_reference(
        &self,
        source_lang: &str,
        target_lang: &str,
        source_text: &str,
        translated_text: &str,
        reference_text: &str,
    ) -> Result<PromptPair, PromptError> {
        Ok(PromptPair {
            system: self.render(
                PromptKind::EvaluationSystemWithReference,
                &[("source_lang", source_lang), ("target_lang", target_lang)],
            )?,
            user: self.render(
                PromptKind::EvaluationUserWithReference,
                &[
                    ("source_text", source_text),
                    ("translated_text", translated_text),
                    ("reference_text", reference_text),
                ],
            )?,
        })
    }

    /// Evaluation prompts without a reference translation
    pub fn evaluation_prompts_without_reference(
        &self,
        source_lang: &str,
        target_lang: &str,
        source_text: &str,
        translated_text: &str,
    ) -> Result<PromptPair, PromptError> {
        let language_vars = [("source_lang", source_lang), ("target_lang", target_lang)];
        Ok(PromptPair {
            system: self.render(PromptKind::EvaluationSystemWithoutReference, &language_vars)?,
            user: self.render(
                PromptKind::EvaluationUserWithoutReference,
                &[
                    ("source_lang", source_lang),
                    ("target_lang", target_lang),
                    ("source_text", source_text),
                    ("translated_text", translated_text),
                ],
            )?,
        })
    }

    /// Evaluation prompts judging use of the supplied context
    pub fn evaluation_prompts_with_context(
        &self,
        source_lang: &str,
        target_lang: &str,
        source_text: &str,
        translated_text: &str,
        context: &str,
    ) -> Result<PromptPair, PromptError> {
        Ok(PromptPair {
            system: self.render(
                PromptKind::EvaluationSystemWithContext,
                &[("source_lang", source_lang), ("target_lang", target_lang)],
            )?,
            user: self.render(
                PromptKind::EvaluationUserWithContext,
                &[
                    ("source_lang", source_lang),
                    ("target_lang", target_lang),
                    ("source_text", source_text),
                    ("translated_text", translated_text),
                    ("context", context),
                ],
            )?,
        })
    }

    /// Summaries of every template in kind order
    pub fn list(&self) -> Vec<PromptSummary> {
        self.templates
            .iter()
            .map(|(kind, template)| PromptSummary {
                kind: *kind,
                description: template.description.clone(),
                variables: template.variables.clone(),
                version: template.version.clone(),
                content_preview: preview(&template.content),
            })
            .collect()
    }

    /// Replace the content of `kind`, optionally bumping description and version.
    ///
    /// Content may only use placeholders the template declares.
    pub fn update(
        &mut self,
        kind: PromptKind,
        content: &str,
        description: Option<&str>,
        version: Option<&str>,
    ) -> Result<(), PromptError> {
        let template = self
            .templates
            .get_mut(&kind)
            .ok_or_else(|| PromptError::UnknownTemplate(kind.to_string()))?;

        if let Some(undeclared) = placeholders(content)
            .into_iter()
            .find(|name| !template.declares(name))
        {
            return Err(PromptError::UndeclaredPlaceholder {
                kind: kind.to_string(),
                placeholder: undeclared,
            });
        }

        template.content = content.to_string();
        if let Some(description) = description {
            template.description = description.to_string();
        }
        if let Some(version) = version {
            template.version = version.to_string();
        }
        Ok(())
    }
}

fn placeholders(content: &str) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        content.to_string()
    }
}
