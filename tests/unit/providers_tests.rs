/*!
 * Tests for provider request shapes, client construction and mock behavior
 */

use anyhow::Result;
use serde_json::Value;
use std::time::Duration;
use tranqual::app_config::TranslationProvider;
use tranqual::errors::ProviderError;
use tranqual::providers::anthropic::{Anthropic, AnthropicRequest, AnthropicResponse};
use tranqual::providers::mock::MockProvider;
use tranqual::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};
use tranqual::providers::{CompletionRequest, Provider, RetryPolicy, build_provider};

use crate::common;

fn evaluation_request() -> CompletionRequest {
    CompletionRequest::new("gpt-4o", "Score this translation")
        .system("You are an evaluator.")
        .temperature(0.1)
        .max_tokens(500)
        .json_output()
}

#[test]
fn test_completionRequest_defaults_shouldMatchTranslatorDefaults() {
    let request = CompletionRequest::new("gpt-3.5-turbo", "Hello");
    assert!((request.temperature - 0.3).abs() < f32::EPSILON);
    assert_eq!(request.max_tokens, 500);
    assert!(!request.json_output);
    assert!(request.system.is_none());
}

#[test]
fn test_openAIRequest_fromCompletion_shouldRequestJsonObject() -> Result<()> {
    let body = serde_json::to_value(OpenAIRequest::from(&evaluation_request()))?;

    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "Score this translation");
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["max_tokens"], 500);
    assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_openAIRequest_plainText_shouldOmitResponseFormat() -> Result<()> {
    let request = CompletionRequest::new("gpt-3.5-turbo", "Translate this");
    let body = serde_json::to_value(OpenAIRequest::from(&request))?;

    assert!(body.get("response_format").is_none());
    assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn test_anthropicRequest_jsonOutput_shouldExtendSystemPrompt() -> Result<()> {
    let body = serde_json::to_value(AnthropicRequest::from(&evaluation_request()))?;

    assert_eq!(
        body["system"],
        "You are an evaluator.\nRespond with a single JSON object only."
    );
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["max_tokens"], 500);
    Ok(())
}

#[test]
fn test_anthropicRequest_hotTemperature_shouldClampToApiMaximum() -> Result<()> {
    let request = CompletionRequest::new("claude-3-haiku-20240307", "Translate this").temperature(1.15);
    let body = serde_json::to_value(AnthropicRequest::from(&request))?;

    assert!(body["temperature"].as_f64().unwrap() <= 1.0);
    assert_eq!(Anthropic::new("key", "").max_temperature(), 1.0);
    assert_eq!(MockProvider::working().max_temperature(), 2.0);
    Ok(())
}

#[test]
fn test_extractText_shouldReadFirstChoiceAndTextBlocks() -> Result<()> {
    let openai: OpenAIResponse = serde_json::from_str(
        r#"{"choices": [{"message": {"role": "assistant", "content": "Hallo Welt"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}}"#,
    )?;
    assert_eq!(OpenAI::extract_text_from_response(&openai), "Hallo Welt");

    let anthropic: AnthropicResponse = serde_json::from_str(
        r#"{"content": [{"type": "tool_use"}, {"type": "text", "text": "Bonjour"}], "usage": {"input_tokens": 10, "output_tokens": 2}}"#,
    )?;
    assert_eq!(Anthropic::extract_text_from_response(&anthropic), "Bonjour");
    Ok(())
}

#[test]
fn test_buildProvider_shouldNameEachBackend() -> Result<()> {
    let config = common::test_config();

    let cases = [
        (TranslationProvider::OpenAI, "openai"),
        (TranslationProvider::Anthropic, "anthropic"),
        (TranslationProvider::Ollama, "ollama"),
        (TranslationProvider::LMStudio, "lmstudio"),
    ];
    for (kind, expected) in cases {
        let provider = build_provider(&config, &kind)?;
        assert_eq!(provider.name(), expected);
    }
    Ok(())
}

#[test]
fn test_buildProvider_invalidOllamaEndpoint_shouldFail() {
    let mut config = common::test_config();
    config.provider_config_mut(&TranslationProvider::Ollama).endpoint = "::not a url::".to_string();

    assert!(build_provider(&config, &TranslationProvider::Ollama).is_err());
}

#[tokio::test]
async fn test_retryPolicy_alwaysFailing_shouldGiveUpAfterRetries() {
    let provider = MockProvider::intermittent(1);
    let policy = RetryPolicy::new(2, 0);

    let mut calls = 0;
    let result: Result<(), ProviderError> = policy
        .run("mock", || {
            calls += 1;
            let provider = provider.clone();
            async move {
                provider
                    .complete(CompletionRequest::new("m", "Hello"))
                    .await
                    .map(|_| ())
            }
        })
        .await;

    // Every request fails, so the policy gives up after its retries
    assert!(result.is_err());
    assert_eq!(calls, 3);
    assert_eq!(provider.request_count(), 3);
}

#[test]
fn test_retryPolicy_hugeBackoff_shouldSaturateInsteadOfOverflowing() {
    let policy = RetryPolicy::new(3, u64::MAX / 2);

    let delay = policy.backoff_for(2);

    assert!(delay >= Duration::from_millis(u64::MAX / 2));
}

#[tokio::test]
async fn test_retryPolicy_nonTransientError_shouldNotRetry() {
    let provider = MockProvider::scripted(vec![
        Err(ProviderError::AuthenticationError("bad key".to_string())),
        Ok("never reached".to_string()),
    ]);

    let result = RetryPolicy::new(3, 0)
        .run("mock", || {
            let provider = provider.clone();
            async move { provider.complete(CompletionRequest::new("m", "Hi")).await }
        })
        .await;

    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_mockProvider_scripted_shouldRepeatLastEntry() -> Result<()> {
    let provider = MockProvider::replying(["first", "last"]);

    let mut texts = Vec::new();
    for _ in 0..3 {
        texts.push(provider.complete(CompletionRequest::new("m", "x")).await?.text);
    }

    assert_eq!(texts, vec!["first", "last", "last"]);
    Ok(())
}

#[tokio::test]
async fn test_mockProvider_evaluationResponse_shouldCarryCanonicalKeys() -> Result<()> {
    let provider = MockProvider::evaluations(&[7.5]);
    let response = provider.complete(CompletionRequest::new("m", "x").json_output()).await?;

    let value: Value = serde_json::from_str(&response.text)?;
    assert_eq!(value["overall_quality"], 7.5);
    assert_eq!(value["context_relevance"], 7.5);
    assert!(value["explanation"].is_string());
    assert!(provider.requests()[0].json_output);
    Ok(())
}

#[tokio::test]
async fn test_mockProvider_clones_shouldShareCounters() -> Result<()> {
    let provider = MockProvider::working();
    let clone = provider.clone();

    clone.complete(CompletionRequest::new("m", "one")).await?;
    provider.complete(CompletionRequest::new("m", "two")).await?;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(clone.requests()[1].prompt, "two");
    Ok(())
}

#[tokio::test]
async fn test_provider_defaultTestConnection_shouldReportFailures() {
    assert!(MockProvider::working().test_connection("m").await.is_ok());
    assert!(MockProvider::failing().test_connection("m").await.is_err());
}
