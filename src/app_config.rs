use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::providers::MAX_TEMPERATURE;
use crate::providers::anthropic::ANTHROPIC_MAX_TEMPERATURE;
use crate::translation::orchestrator::QualityGate;
use crate::translation::prompts::PromptRegistry;

/// Application configuration module
/// This module handles loading, validating and saving the JSON configuration:
/// which provider and model translate, which evaluate, the quality gate, and
/// transport settings shared by all provider clients.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Provider and model used for translation
    #[serde(default = "default_translation_role")]
    pub translation: RoleConfig,

    /// Provider and model used for evaluation
    #[serde(default = "default_evaluation_role")]
    pub evaluation: RoleConfig,

    /// Quality gate settings
    #[serde(default)]
    pub quality: QualityConfig,

    /// Available providers
    #[serde(default = "default_providers")]
    pub available_providers: Vec<ProviderConfig>,

    /// Transport settings applicable to all providers
    #[serde(default)]
    pub common: CommonConfig,

    /// Prompt template overrides, keyed by prompt kind
    #[serde(default)]
    pub prompt_overrides: BTreeMap<String, String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// LLM provider type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    Ollama,
    // @provider: OpenAI
    #[default]
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Highest sampling temperature the provider's API accepts
    pub fn max_temperature(&self) -> f32 {
        match self {
            Self::Anthropic => ANTHROPIC_MAX_TEMPERATURE,
            Self::OpenAI | Self::Ollama | Self::LMStudio => MAX_TEMPERATURE,
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether requests fail without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }

    // @returns: Environment variable consulted when no key is configured
    pub fn default_api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Anthropic => Some("ANTHROPIC_API_KEY"),
            Self::Ollama | Self::LMStudio => None,
        }
    }

    fn default_model(&self) -> String {
        match self {
            Self::Ollama => "llama3.2".to_string(),
            Self::OpenAI => "gpt-3.5-turbo".to_string(),
            Self::Anthropic => "claude-3-haiku-20240307".to_string(),
            // Users should set this to the model loaded in LM Studio
            Self::LMStudio => "local-model".to_string(),
        }
    }

    fn default_endpoint(&self) -> String {
        match self {
            Self::Ollama => "http://localhost:11434".to_string(),
            Self::OpenAI => "https://api.openai.com/v1".to_string(),
            Self::Anthropic => "https://api.anthropic.com".to_string(),
            Self::LMStudio => "http://localhost:1234/v1".to_string(),
        }
    }

    fn default_rate_limit(&self) -> Option<u32> {
        match self {
            // Local servers are not rate limited
            Self::Ollama | Self::LMStudio => None,
            Self::OpenAI => Some(60),
            // Slightly below Anthropic's 50 requests per minute
            Self::Anthropic => Some(45),
        }
    }

    fn default_timeout_secs(&self) -> u64 {
        match self {
            Self::Anthropic | Self::Ollama => 120,
            Self::OpenAI | Self::LMStudio => 60,
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Which provider and model serve one role (translation or evaluation)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RoleConfig {
    /// Provider to call
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Model name; empty falls back to the provider entry's model
    #[serde(default)]
    pub model: String,
}

/// Provider configuration entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Default model name
    #[serde(default)]
    pub model: String,

    // @field: API key
    #[serde(default)]
    pub api_key: String,

    // @field: Env var read when api_key is empty
    #[serde(default)]
    pub api_key_env: Option<String>,

    // @field: Service URL
    #[serde(default)]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: provider_type.default_model(),
            api_key: String::new(),
            api_key_env: provider_type.default_api_key_env().map(str::to_string),
            endpoint: provider_type.default_endpoint(),
            timeout_secs: provider_type.default_timeout_secs(),
            rate_limit: provider_type.default_rate_limit(),
        }
    }
}

/// Quality gate settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct QualityConfig {
    /// Minimum overall score (0-10) to accept a translation
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Temperature of the first attempt
    #[serde(default = "default_base_temperature")]
    pub base_temperature: f32,

    /// Temperature added per retry
    #[serde(default = "default_temperature_step")]
    pub temperature_step: f32,

    /// Temperature of evaluation calls
    #[serde(default = "default_evaluation_temperature")]
    pub evaluation_temperature: f32,

    /// Stop starting new attempts after this many seconds
    #[serde(default)]
    pub deadline_secs: Option<u64>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_retries: default_max_retries(),
            base_temperature: default_base_temperature(),
            temperature_step: default_temperature_step(),
            evaluation_temperature: default_evaluation_temperature(),
            deadline_secs: None,
        }
    }
}

impl QualityConfig {
    /// Orchestrator policy for these settings
    pub fn gate(&self) -> QualityGate {
        QualityGate {
            quality_threshold: self.quality_threshold,
            max_retries: self.max_retries,
            temperature_step: self.temperature_step,
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

/// Settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommonConfig {
    /// Retry count for transient provider failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for retries in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Completion budget for translations
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Requests orchestrated concurrently in batch mode
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,
}

impl Default for CommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_tokens: default_max_tokens(),
            concurrent_requests: default_concurrent_requests(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(anyhow!("Invalid log level: {}", s)),
        }
    }
}

fn default_translation_role() -> RoleConfig {
    RoleConfig {
        provider: TranslationProvider::OpenAI,
        model: "gpt-3.5-turbo".to_string(),
    }
}

fn default_evaluation_role() -> RoleConfig {
    RoleConfig {
        provider: TranslationProvider::OpenAI,
        model: "gpt-4o".to_string(),
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig::new(TranslationProvider::OpenAI),
        ProviderConfig::new(TranslationProvider::Anthropic),
        ProviderConfig::new(TranslationProvider::Ollama),
        ProviderConfig::new(TranslationProvider::LMStudio),
    ]
}

fn default_quality_threshold() -> f64 {
    8.5
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_temperature() -> f32 {
    0.3
}

fn default_temperature_step() -> f32 {
    0.1
}

fn default_evaluation_temperature() -> f32 {
    0.1
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

/// Upper bound for the base backoff; retries double it
const MAX_RETRY_BACKOFF_MS: u64 = 60_000;

fn default_max_tokens() -> u32 {
    500
}

fn default_concurrent_requests() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Config {
            translation: default_translation_role(),
            evaluation: default_evaluation_role(),
            quality: QualityConfig::default(),
            available_providers: default_providers(),
            common: CommonConfig::default(),
            prompt_overrides: BTreeMap::new(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Write this configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Get a specific provider configuration by type
    pub fn provider_config(&self, provider: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable provider configuration, inserting defaults when missing
    pub fn provider_config_mut(&mut self, provider: &TranslationProvider) -> &mut ProviderConfig {
        let provider_str = provider.to_lowercase_string();
        let index = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(*provider));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Model for a role: explicit role model, else provider entry, else built-in default
    pub fn model_for(&self, role: &RoleConfig) -> String {
        if !role.model.is_empty() {
            return role.model.clone();
        }
        match self.provider_config(&role.provider) {
            Some(provider_config) if !provider_config.model.is_empty() => provider_config.model.clone(),
            _ => role.provider.default_model(),
        }
    }

    pub fn translation_model(&self) -> String {
        self.model_for(&self.translation)
    }

    pub fn evaluation_model(&self) -> String {
        self.model_for(&self.evaluation)
    }

    /// API key from the provider entry, else from its environment variable
    pub fn api_key_for(&self, provider: &TranslationProvider) -> String {
        let provider_config = self.provider_config(provider);
        if let Some(key) = provider_config.map(|p| p.api_key.trim()).filter(|k| !k.is_empty()) {
            return key.to_string();
        }

        let env_name = match provider_config {
            Some(p) => p.api_key_env.clone(),
            None => provider.default_api_key_env().map(str::to_string),
        };
        env_name
            .and_then(|name| std::env::var(name).ok())
            .map(|key| key.trim().to_string())
            .unwrap_or_default()
    }

    /// Endpoint from the provider entry, else the built-in default
    pub fn endpoint_for(&self, provider: &TranslationProvider) -> String {
        match self.provider_config(provider) {
            Some(p) if !p.endpoint.is_empty() => p.endpoint.clone(),
            _ => provider.default_endpoint(),
        }
    }

    pub fn timeout_for(&self, provider: &TranslationProvider) -> u64 {
        match self.provider_config(provider) {
            Some(p) if p.timeout_secs > 0 => p.timeout_secs,
            _ => provider.default_timeout_secs(),
        }
    }

    pub fn rate_limit_for(&self, provider: &TranslationProvider) -> Option<u32> {
        match self.provider_config(provider) {
            Some(p) => p.rate_limit,
            None => provider.default_rate_limit(),
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let quality = &self.quality;
        if !(quality.quality_threshold > 0.0 && quality.quality_threshold <= 10.0) {
            return Err(anyhow!(
                "quality_threshold must be within (0, 10], got {}",
                quality.quality_threshold
            ));
        }
        let translation_ceiling = self.translation.provider.max_temperature();
        if !(0.0..=translation_ceiling).contains(&quality.base_temperature) {
            return Err(anyhow!(
                "base_temperature must be within 0.0..={} for {} translation, got {}",
                translation_ceiling,
                self.translation.provider.display_name(),
                quality.base_temperature
            ));
        }
        if !(0.0..=1.0).contains(&quality.temperature_step) {
            return Err(anyhow!(
                "temperature_step must be within 0.0..=1.0, got {}",
                quality.temperature_step
            ));
        }
        let evaluation_ceiling = self.evaluation.provider.max_temperature();
        if !(0.0..=evaluation_ceiling).contains(&quality.evaluation_temperature) {
            return Err(anyhow!(
                "evaluation_temperature must be within 0.0..={} for {} evaluation, got {}",
                evaluation_ceiling,
                self.evaluation.provider.display_name(),
                quality.evaluation_temperature
            ));
        }
        if self.common.retry_backoff_ms > MAX_RETRY_BACKOFF_MS {
            return Err(anyhow!(
                "retry_backoff_ms must be at most {}, got {}",
                MAX_RETRY_BACKOFF_MS,
                self.common.retry_backoff_ms
            ));
        }
        if self.common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if self.common.max_tokens == 0 {
            return Err(anyhow!("max_tokens must be at least 1"));
        }

        for (role_name, role) in [("Translation", &self.translation), ("Evaluation", &self.evaluation)] {
            if role.provider.requires_api_key() && self.api_key_for(&role.provider).is_empty() {
                let hint = self
                    .provider_config(&role.provider)
                    .and_then(|p| p.api_key_env.clone())
                    .map(|env| format!(" (set api_key or {})", env))
                    .unwrap_or_default();
                return Err(anyhow!(
                    "{} API key is required for {} provider{}",
                    role_name,
                    role.provider.display_name(),
                    hint
                ));
            }

            let endpoint = self.endpoint_for(&role.provider);
            Url::parse(&endpoint).with_context(|| {
                format!("Invalid endpoint for {}: {}", role.provider.display_name(), endpoint)
            })?;
        }

        PromptRegistry::with_overrides(&self.prompt_overrides).context("Invalid prompt override")?;

        Ok(())
    }
}
