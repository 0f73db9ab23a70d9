/*!
 * # tranqual - quality-gated LLM translation
 *
 * A Rust library that translates text with one language model and scores
 * every attempt with another, retrying with a higher temperature until the
 * translation reaches a quality threshold.
 *
 * ## Features
 *
 * - Domain-context-aware translation prompts
 * - LLM-as-judge evaluation with or without a reference translation
 * - Retry loop that keeps the best-scoring attempt and its history
 * - Providers:
 *   - OpenAI API (and OpenAI-compatible servers such as LM Studio)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Cost tracking with daily and per-domain reports
 * - ISO 639-1 and ISO 639-2 language code support
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: The translation pipeline:
 *   - `translation::translator`: One provider call per translation
 *   - `translation::evaluator`: One provider call per quality assessment
 *   - `translation::orchestrator`: The quality-gated retry loop
 *   - `translation::prompts`: Prompt templates and their registry
 * - `cost_analyzer`: Token pricing and the cost ledger
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `providers`: Client implementations for various LLM providers:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::openai`: OpenAI API client
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::mock`: Scripted provider for tests and benchmarks
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod cost_analyzer;
pub mod errors;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use cost_analyzer::{CostAnalyzer, CostRecord};
pub use errors::{EvaluationError, PromptError, ProviderError, TranslationError};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t, resolve_language_name};
pub use providers::{CompletionRequest, CompletionResponse, Provider};
pub use translation::{
    ContextAwareTranslator, EvaluationResult, Evaluator, PromptRegistry, QualityGate, RequestOutcome,
    TranslationRequest, TranslationResult, Translator,
};
