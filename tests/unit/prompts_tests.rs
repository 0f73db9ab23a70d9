/*!
 * Tests for the prompt registry
 */

use std::collections::BTreeMap;
use tranqual::errors::PromptError;
use tranqual::translation::prompts::{PromptKind, PromptRegistry};

#[test]
fn test_registry_new_shouldHoldEveryKind() {
    let registry = PromptRegistry::new();
    for kind in PromptKind::ALL {
        assert!(registry.get(kind).is_ok(), "missing {}", kind);
    }
    assert_eq!(registry.list().len(), PromptKind::ALL.len());
}

#[test]
fn test_translationPrompts_shouldNameLanguagesAndText() {
    let registry = PromptRegistry::new();
    let pair = registry
        .translation_prompts("English", "Japanese", "Deploy on Friday", Some("Release management"))
        .unwrap();

    assert!(pair.system.contains("professional translator"));
    assert!(pair.user.starts_with("Translate the following text from English to Japanese:"));
    assert!(pair.user.contains("Deploy on Friday"));
    assert!(pair.user.contains("Context for this translation: Release management"));
    assert!(pair.user.ends_with("Provide only the translation, nothing else."));
}

#[test]
fn test_evaluationPrompts_withoutReference_shouldNotMentionReference() {
    let registry = PromptRegistry::new();
    let pair = registry
        .evaluation_prompts_without_reference("English", "German", "Hello", "Hallo")
        .unwrap();

    assert!(pair.system.contains("fluent in both English and German"));
    assert!(!pair.user.contains("Reference"));
    assert_eq!(
        pair.user,
        "Source text (English): Hello\n\nMachine translation (German): Hallo"
    );
}

#[test]
fn test_render_missingVariable_shouldFail() {
    let registry = PromptRegistry::new();
    let err = registry
        .render(PromptKind::EvaluationUserWithReference, &[("source_text", "Hi")])
        .unwrap_err();

    assert_eq!(
        err,
        PromptError::MissingVariables {
            kind: "evaluation_user_with_reference".to_string(),
            missing: vec!["reference_text".to_string(), "translated_text".to_string()],
        }
    );
}

#[test]
fn test_withOverrides_shouldReplaceContent() {
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "translation_user".to_string(),
        "{source_lang} => {target_lang}: {text}{context_section}".to_string(),
    );
    let registry = PromptRegistry::with_overrides(&overrides).unwrap();

    let pair = registry.translation_prompts("English", "Italian", "Ciao", None).unwrap();
    assert_eq!(pair.user, "English => Italian: Ciao");
}

#[test]
fn test_withOverrides_unknownKind_shouldFail() {
    let mut overrides = BTreeMap::new();
    overrides.insert("summary".to_string(), "Summarize {text}".to_string());

    let err = PromptRegistry::with_overrides(&overrides).unwrap_err();
    assert_eq!(err, PromptError::UnknownTemplate("summary".to_string()));
}

#[test]
fn test_update_undeclaredPlaceholder_shouldLeaveTemplateUntouched() {
    let mut registry = PromptRegistry::new();
    let before = registry.get(PromptKind::TranslationSystem).unwrap().clone();

    let err = registry
        .update(PromptKind::TranslationSystem, "You translate for {audience}.", None, None)
        .unwrap_err();

    assert!(matches!(err, PromptError::UndeclaredPlaceholder { .. }));
    assert_eq!(registry.get(PromptKind::TranslationSystem).unwrap(), &before);
}

#[test]
fn test_list_shouldReportMetadata() {
    let registry = PromptRegistry::new();
    let summaries = registry.list();

    let user = summaries
        .iter()
        .find(|s| s.kind == PromptKind::TranslationUser)
        .unwrap();
    assert_eq!(user.version, "1.0");
    assert_eq!(
        user.variables,
        vec!["source_lang", "target_lang", "text", "context_section"]
    );
    assert!(user.content_preview.ends_with("..."));
}
