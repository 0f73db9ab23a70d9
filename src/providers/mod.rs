/*!
 * Provider implementations for LLM chat-completion services.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also used for LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: scripted provider used by tests and benchmarks
 *
 * Every client speaks the same `CompletionRequest`/`CompletionResponse`
 * shape so translators and evaluators can be pointed at any of them.
 */

use async_trait::async_trait;
use log::warn;
use rand::Rng;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::app_config::{Config, TranslationProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

/// Highest sampling temperature accepted by OpenAI-compatible backends and Ollama
pub const MAX_TEMPERATURE: f32 = 2.0;

/// A single chat-completion request, independent of the backend
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier understood by the backend
    pub model: String,
    /// System prompt, if any
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub max_tokens: u32,
    /// Ask the backend to constrain output to a JSON object
    pub json_output: bool,
}

impl CompletionRequest {
    /// Create a new request with default sampling settings
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 500,
            json_output: false,
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum number of generated tokens
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Request JSON-only output
    pub fn json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Text and token usage returned by a provider
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt (input) tokens, when reported
    pub prompt_tokens: Option<u64>,
    /// Completion (output) tokens, when reported
    pub completion_tokens: Option<u64>,
}

impl CompletionResponse {
    /// Total tokens, if the backend reported any usage at all
    pub fn total_tokens(&self) -> Option<u64> {
        match (self.prompt_tokens, self.completion_tokens) {
            (None, None) => None,
            (p, c) => Some(p.unwrap_or(0) + c.unwrap_or(0)),
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translator and the evaluator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short lowercase provider name used in logs
    fn name(&self) -> &str;

    /// Highest sampling temperature the backend accepts
    fn max_temperature(&self) -> f32 {
        MAX_TEMPERATURE
    }

    /// Complete a request using this provider
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider with a minimal request
    async fn test_connection(&self, model: &str) -> Result<(), ProviderError> {
        let request = CompletionRequest::new(model, "Hello").max_tokens(10);
        self.complete(request).await.map(|_| ())
    }
}

/// Exponential backoff for transient provider failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Base backoff time in milliseconds, doubled on each retry
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 1000,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_base_ms: 0,
        }
    }

    /// Create a policy from explicit values
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// Backoff before retry number `retry` (1-based), with up to 25% jitter
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let base = self.backoff_base_ms.saturating_mul(1u64 << exponent);
        let jitter = if base >= 4 {
            rand::rng().random_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    /// Run `operation`, retrying transient failures with backoff
    pub async fn run<T, F, Fut>(&self, provider: &str, mut operation: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retry < self.max_retries => {
                    retry += 1;
                    let backoff = self.backoff_for(retry);
                    warn!(
                        "{} request failed ({}), retrying in {:?} ({}/{})",
                        provider, e, backoff, retry, self.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Client-side rate limiter enforcing a minimum interval between requests
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter for `requests_per_minute`; `None` or zero disables limiting
    pub fn per_minute(requests_per_minute: Option<u32>) -> Option<Self> {
        match requests_per_minute {
            Some(rpm) if rpm > 0 => Some(Self {
                min_interval: Duration::from_millis(60_000 / rpm as u64),
                last_request: Mutex::new(None),
            }),
            _ => None,
        }
    }

    /// Minimum interval between two requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request is allowed
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Map a non-success HTTP status and body to a provider error
pub(crate) fn error_for_status(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(body),
        429 => ProviderError::RateLimitExceeded(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

/// Map a reqwest transport error to a provider error
pub(crate) fn error_for_transport(provider: &str, error: reqwest::Error) -> ProviderError {
    if error.is_connect() || error.is_timeout() {
        ProviderError::ConnectionError(format!("{}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, error))
    }
}

/// Build the provider client for a configured backend
pub fn build_provider(config: &Config, kind: &TranslationProvider) -> anyhow::Result<Arc<dyn Provider>> {
    let retry = RetryPolicy::new(config.common.retry_count, config.common.retry_backoff_ms);
    let timeout = Duration::from_secs(config.timeout_for(kind));
    let rate_limit = config.rate_limit_for(kind);
    let endpoint = config.endpoint_for(kind);

    let provider: Arc<dyn Provider> = match kind {
        TranslationProvider::OpenAI => Arc::new(openai::OpenAI::new_with_config(
            config.api_key_for(kind),
            endpoint,
            timeout,
            retry,
            rate_limit,
        )),
        TranslationProvider::LMStudio => {
            // LM Studio does not check the key, but the header must be present
            let api_key = {
                let key = config.api_key_for(kind);
                if key.is_empty() { "lm-studio".to_string() } else { key }
            };
            Arc::new(
                openai::OpenAI::new_with_config(api_key, endpoint, timeout, retry, rate_limit)
                    .named("lmstudio"),
            )
        }
        TranslationProvider::Anthropic => Arc::new(anthropic::Anthropic::new_with_config(
            config.api_key_for(kind),
            endpoint,
            timeout,
            retry,
            rate_limit,
        )),
        TranslationProvider::Ollama => Arc::new(ollama::Ollama::from_endpoint(
            &endpoint, timeout, retry, rate_limit,
        )?),
    };

    Ok(provider)
}
