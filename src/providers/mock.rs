/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::scripted(..)` - Replays a fixed sequence of responses
 *
 * Every request is recorded so tests can assert on temperatures, prompts
 * and JSON mode after the fact.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, MAX_TEMPERATURE, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
    /// Simulates slow response (for deadline testing)
    Slow { delay_ms: u64 },
    /// Pops responses from a script; the last entry repeats once reached
    Scripted,
}

type Script = Arc<Mutex<VecDeque<Result<String, ProviderError>>>>;

/// Mock provider for testing translation and evaluation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&CompletionRequest) -> String>,
    /// Remaining scripted responses
    script: Script,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Reported temperature ceiling
    max_temperature: f32,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
            script: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            max_temperature: MAX_TEMPERATURE,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Create a mock that replays `responses` in order
    pub fn scripted(responses: impl IntoIterator<Item = Result<String, ProviderError>>) -> Self {
        let provider = Self::new(MockBehavior::Scripted);
        provider.script.lock().extend(responses);
        provider
    }

    /// Scripted mock that only returns successful texts
    pub fn replying<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::scripted(texts.into_iter().map(|t| Ok(t.into())))
    }

    /// Scripted evaluator mock returning one evaluation per overall score
    pub fn evaluations(scores: &[f64]) -> Self {
        Self::replying(scores.iter().map(|s| Self::evaluation_response(*s)))
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&CompletionRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Report a lower temperature ceiling, like a backend with a narrower range
    pub fn with_max_temperature(mut self, max_temperature: f32) -> Self {
        self.max_temperature = max_temperature;
        self
    }

    /// A well-formed evaluation JSON document with the given overall score
    pub fn evaluation_response(overall: f64) -> String {
        serde_json::json!({
            "accuracy": overall,
            "fluency": overall,
            "terminology": overall,
            "context_relevance": overall,
            "overall_quality": overall,
            "explanation": format!("Scored {:.1} by the mock evaluator", overall),
        })
        .to_string()
    }

    /// Number of requests received so far (across clones)
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of received requests
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Temperatures of received requests, rounded to two decimals
    pub fn temperatures(&self) -> Vec<f32> {
        self.requests
            .lock()
            .iter()
            .map(|r| (r.temperature * 100.0).round() / 100.0)
            .collect()
    }

    fn next_scripted(&self) -> Result<String, ProviderError> {
        let mut script = self.script.lock();
        match script.len() {
            0 => Err(ProviderError::RequestFailed("mock script is empty".to_string())),
            1 => script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::EmptyResponse)),
            _ => script
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::EmptyResponse)),
        }
    }

    fn usage_for(request: &CompletionRequest, text: String) -> CompletionResponse {
        CompletionResponse {
            prompt_tokens: Some((request.prompt.len() / 4) as u64 + 1),
            completion_tokens: Some((text.len() / 4) as u64),
            text,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
            script: Arc::clone(&self.script),
            requests: Arc::clone(&self.requests),
            max_temperature: self.max_temperature,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn max_temperature(&self) -> f32 {
        self.max_temperature
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        match self.behavior {
            MockBehavior::Working => {
                let text = match self.custom_response {
                    Some(generator) => generator(&request),
                    None => format!("[TRANSLATED] {}", request.prompt),
                };
                Ok(Self::usage_for(&request, text))
            }

            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::usage_for(&request, format!("[TRANSLATED] {}", request.prompt)))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(CompletionResponse {
                text: String::new(),
                prompt_tokens: Some(0),
                completion_tokens: Some(0),
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(Self::usage_for(&request, format!("[TRANSLATED] {}", request.prompt)))
            }

            MockBehavior::Scripted => {
                let text = self.next_scripted()?;
                Ok(Self::usage_for(&request, text))
            }
        }
    }
}
