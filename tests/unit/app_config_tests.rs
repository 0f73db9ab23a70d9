/*!
 * Tests for application configuration
 */

use anyhow::Result;
use std::time::Duration;
use tranqual::app_config::{Config, LogLevel, ProviderConfig, TranslationProvider};

use crate::common;

#[test]
fn test_default_config_shouldUseOpenAIForBothRoles() {
    let config = Config::default();

    assert_eq!(config.translation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.evaluation.provider, TranslationProvider::OpenAI);
    assert_eq!(config.translation_model(), "gpt-3.5-turbo");
    assert_eq!(config.evaluation_model(), "gpt-4o");
    assert_eq!(config.quality.quality_threshold, 8.5);
    assert_eq!(config.quality.max_retries, 2);
    assert_eq!(config.common.concurrent_requests, 4);
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.available_providers.len(), 4);
}

#[test]
fn test_validate_withKeys_shouldSucceed() {
    let config = common::test_config();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_withoutRequiredKey_shouldFail() {
    let mut config = common::test_config();
    config.provider_config_mut(&TranslationProvider::OpenAI).api_key.clear();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("API key is required for OpenAI"));
}

#[test]
fn test_validate_localProviders_shouldNotNeedKeys() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::Ollama;
    config.translation.model.clear();
    config.evaluation.provider = TranslationProvider::LMStudio;
    config.evaluation.model.clear();

    assert!(config.validate().is_ok());
    assert_eq!(config.translation_model(), "llama3.2");
}

#[test]
fn test_validate_outOfRangeQuality_shouldFail() {
    let mut config = common::test_config();
    config.quality.quality_threshold = 11.0;
    assert!(config.validate().is_err());

    let mut config = common::test_config();
    config.quality.base_temperature = 2.5;
    assert!(config.validate().is_err());

    let mut config = common::test_config();
    config.common.concurrent_requests = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_anthropicTranslation_shouldCapBaseTemperatureAtOne() {
    let mut config = common::test_config();
    config.translation.provider = TranslationProvider::Anthropic;
    config.translation.model = "claude-3-haiku-20240307".to_string();

    config.quality.base_temperature = 0.95;
    assert!(config.validate().is_ok());

    config.quality.base_temperature = 1.2;
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Anthropic translation"));

    // The same value is fine once an OpenAI model translates
    config.translation.provider = TranslationProvider::OpenAI;
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_anthropicEvaluation_shouldCapEvaluationTemperature() {
    let mut config = common::test_config();
    config.evaluation.provider = TranslationProvider::Anthropic;
    config.quality.evaluation_temperature = 1.5;

    assert!(config.validate().is_err());
    assert_eq!(TranslationProvider::Anthropic.max_temperature(), 1.0);
    assert_eq!(TranslationProvider::Ollama.max_temperature(), 2.0);
}

#[test]
fn test_validate_hugeRetryBackoff_shouldFail() {
    let mut config = common::test_config();
    config.common.retry_backoff_ms = u64::MAX / 2;

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("retry_backoff_ms"));
}

#[test]
fn test_validate_invalidEndpoint_shouldFail() {
    let mut config = common::test_config();
    config.provider_config_mut(&TranslationProvider::OpenAI).endpoint = "not a url".to_string();

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Invalid endpoint"));
}

#[test]
fn test_validate_promptOverrideWithUnknownPlaceholder_shouldFail() {
    let mut config = common::test_config();
    config
        .prompt_overrides
        .insert("translation_user".to_string(), "Translate {text} for {audience}".to_string());

    assert!(config.validate().is_err());
}

#[test]
fn test_apiKeyFor_shouldPreferConfiguredKey() {
    let mut config = Config::default();
    let provider = config.provider_config_mut(&TranslationProvider::Anthropic);
    provider.api_key = "  sk-ant-configured  ".to_string();

    assert_eq!(config.api_key_for(&TranslationProvider::Anthropic), "sk-ant-configured");
}

#[test]
fn test_apiKeyFor_withMissingEnvVar_shouldBeEmpty() {
    let mut config = Config::default();
    config.provider_config_mut(&TranslationProvider::OpenAI).api_key_env =
        Some("TRANQUAL_TEST_KEY_THAT_IS_NEVER_SET".to_string());

    assert_eq!(config.api_key_for(&TranslationProvider::OpenAI), "");
}

#[test]
fn test_providerLookups_shouldFallBackToDefaults() {
    let mut config = Config::default();
    config.available_providers.clear();

    assert_eq!(config.endpoint_for(&TranslationProvider::Ollama), "http://localhost:11434");
    assert_eq!(config.rate_limit_for(&TranslationProvider::Anthropic), Some(45));
    assert_eq!(config.rate_limit_for(&TranslationProvider::Ollama), None);
    assert_eq!(config.timeout_for(&TranslationProvider::OpenAI), 60);
}

#[test]
fn test_providerConfig_new_shouldCarryProviderDefaults() {
    let provider = ProviderConfig::new(TranslationProvider::LMStudio);

    assert_eq!(provider.provider_type, "lmstudio");
    assert_eq!(provider.endpoint, "http://localhost:1234/v1");
    assert_eq!(provider.api_key_env, None);
}

#[test]
fn test_translationProvider_fromStr_shouldBeCaseInsensitive() -> Result<()> {
    assert_eq!("OpenAI".parse::<TranslationProvider>()?, TranslationProvider::OpenAI);
    assert_eq!("lmstudio".parse::<TranslationProvider>()?, TranslationProvider::LMStudio);
    assert!("deepl".parse::<TranslationProvider>().is_err());
    assert_eq!(TranslationProvider::Anthropic.to_string(), "anthropic");
    Ok(())
}

#[test]
fn test_fromFile_partialJson_shouldFillDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "translation": {"provider": "anthropic", "model": ""},
            "quality": {"quality_threshold": 9.0, "deadline_secs": 45},
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::from_file(&path)?;

    assert_eq!(config.translation.provider, TranslationProvider::Anthropic);
    assert_eq!(config.translation_model(), "claude-3-haiku-20240307");
    assert_eq!(config.evaluation_model(), "gpt-4o");
    assert_eq!(config.quality.max_retries, 2);
    assert_eq!(config.quality.gate().deadline, Some(Duration::from_secs(45)));
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_save_thenFromFile_shouldPreserveSettings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = common::test_config();
    config.quality.temperature_step = 0.2;
    config.prompt_overrides.insert(
        "translation_system".to_string(),
        "You translate release notes.".to_string(),
    );
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.quality, config.quality);
    assert_eq!(loaded.prompt_overrides, config.prompt_overrides);
    assert_eq!(loaded.api_key_for(&TranslationProvider::OpenAI), "test-key");
    Ok(())
}

#[test]
fn test_fromFile_invalidJson_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}
