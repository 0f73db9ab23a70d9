use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use crate::app_config::Config;
use crate::cost_analyzer::CostAnalyzer;
use crate::language_utils;
use crate::providers::{self, Provider};
use crate::translation::evaluator::{EvaluationBasis, EvaluationResult, Evaluator};
use crate::translation::orchestrator::{ContextAwareTranslator, RequestOutcome, TranslationRequest};
use crate::translation::prompts::{PromptRegistry, PromptSummary};
use crate::translation::translator::{ConnectionCheck, LanguagePair, Translator};

// @module: Application controller wiring configuration to the translation pipeline

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Shared prompt templates, overrides applied
    prompts: Arc<PromptRegistry>,
    // @field: Client for the translation role
    translation_client: Arc<dyn Provider>,
    // @field: Client for the evaluation role
    evaluation_client: Arc<dyn Provider>,
    // @field: Cost ledger for every orchestrated request
    costs: Arc<CostAnalyzer>,
}

impl Controller {
    // @method: Create a controller, building provider clients from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let translation_client = providers::build_provider(&config, &config.translation.provider)
            .context("Failed to create translation provider")?;
        let evaluation_client = if config.evaluation.provider == config.translation.provider {
            Arc::clone(&translation_client)
        } else {
            providers::build_provider(&config, &config.evaluation.provider)
                .context("Failed to create evaluation provider")?
        };
        Self::with_providers(config, translation_client, evaluation_client)
    }

    // @method: Create a controller around existing clients
    pub fn with_providers(
        config: Config,
        translation_client: Arc<dyn Provider>,
        evaluation_client: Arc<dyn Provider>,
    ) -> Result<Self> {
        let prompts = PromptRegistry::with_overrides(&config.prompt_overrides)
            .context("Failed to apply prompt overrides")?;

        Ok(Self {
            config,
            prompts: Arc::new(prompts),
            translation_client,
            evaluation_client,
            costs: Arc::new(CostAnalyzer::new()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn costs(&self) -> &Arc<CostAnalyzer> {
        &self.costs
    }

    fn translator(&self) -> Translator {
        Translator::new(
            self.config.translation_model(),
            Some(Arc::clone(&self.translation_client)),
            Arc::clone(&self.prompts),
        )
        .with_max_tokens(self.config.common.max_tokens)
    }

    fn evaluator(&self) -> Evaluator {
        Evaluator::new(
            self.config.evaluation_model(),
            Some(Arc::clone(&self.evaluation_client)),
            Arc::clone(&self.prompts),
        )
        .with_temperature(self.config.quality.evaluation_temperature)
    }

    /// Orchestrator built from the current configuration
    pub fn orchestrator(&self) -> ContextAwareTranslator {
        ContextAwareTranslator::new(self.translator(), self.evaluator(), self.config.quality.gate())
    }

    /// Resolve language codes to the names used in prompts
    fn prepare(&self, mut request: TranslationRequest) -> Result<TranslationRequest> {
        request.source_language = language_utils::resolve_language_name(&request.source_language)
            .context("Invalid source language")?;
        request.target_language = language_utils::resolve_language_name(&request.target_language)
            .context("Invalid target language")?;
        Ok(request)
    }

    /// Run one request through the quality gate and record its cost
    pub async fn translate(&self, request: TranslationRequest, domain: &str) -> Result<RequestOutcome> {
        let request = self.prepare(request)?;
        let orchestrator = self.orchestrator();

        info!(
            "Translating {} -> {} with {} (evaluated by {})",
            request.source_language,
            request.target_language,
            orchestrator.translation_model(),
            orchestrator.evaluation_model()
        );

        let outcome = orchestrator.translate(&request).await;
        self.record(&outcome, domain);
        Ok(outcome)
    }

    /// Run independent requests concurrently, in input order, with a progress bar
    pub async fn translate_batch(&self, requests: Vec<TranslationRequest>, domain: &str) -> Result<Vec<RequestOutcome>> {
        let requests = requests
            .into_iter()
            .map(|request| self.prepare(request))
            .collect::<Result<Vec<_>>>()?;
        let concurrency = self.config.common.concurrent_requests;

        let progress_bar = ProgressBar::new(requests.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} requests ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message(format!("{} in flight", concurrency));

        let orchestrator = self.orchestrator();
        let outcomes = orchestrator
            .translate_many_with(&requests, concurrency, |outcome| {
                if !outcome.success() {
                    progress_bar.println(format!(
                        "Request failed: {}",
                        outcome_error(outcome).unwrap_or("unknown error")
                    ));
                }
                progress_bar.inc(1);
            })
            .await;

        let accepted = outcomes.iter().filter(|o| o.success()).count();
        progress_bar.finish_with_message(format!("{} accepted", accepted));

        for outcome in &outcomes {
            self.record(outcome, domain);
        }
        info!("Batch finished: {}/{} requests accepted", accepted, outcomes.len());
        Ok(outcomes)
    }

    /// Score an existing translation with the evaluation model
    pub async fn evaluate(
        &self,
        source_text: &str,
        translated_text: &str,
        source_language: &str,
        target_language: &str,
        basis: EvaluationBasis<'_>,
    ) -> Result<EvaluationResult> {
        if source_text.trim().is_empty() || translated_text.trim().is_empty() {
            return Err(anyhow!("Source text and translation must not be empty"));
        }
        let languages = LanguagePair::new(
            language_utils::resolve_language_name(source_language)?,
            language_utils::resolve_language_name(target_language)?,
        );
        Ok(self
            .evaluator()
            .evaluate(source_text, translated_text, &languages, basis, None)
            .await)
    }

    /// Probe both role clients; translation is checked with a real round trip
    pub async fn check_connections(&self) -> Vec<(String, ConnectionCheck)> {
        let translation = self.translator().test_connection().await;

        let evaluation_model = self.config.evaluation_model();
        let evaluation = match self.evaluation_client.test_connection(&evaluation_model).await {
            Ok(()) => ConnectionCheck {
                success: true,
                message: "Connection successful".to_string(),
                model: evaluation_model,
                test_translation: None,
            },
            Err(e) => ConnectionCheck {
                success: false,
                message: format!("Connection failed: {}", e),
                model: evaluation_model,
                test_translation: None,
            },
        };

        vec![
            (format!("translation ({})", self.translation_client.name()), translation),
            (format!("evaluation ({})", self.evaluation_client.name()), evaluation),
        ]
    }

    /// Templates currently in use
    pub fn prompts(&self) -> Vec<PromptSummary> {
        self.prompts.list()
    }

    /// Load an existing cost ledger, if the file exists
    pub fn load_costs(&self, path: &Path) -> Result<usize> {
        if !path.exists() {
            return Ok(0);
        }
        self.costs.load_json(path)
    }

    pub fn save_costs(&self, path: &Path) -> Result<usize> {
        self.costs.export_json(path)
    }

    fn record(&self, outcome: &RequestOutcome, domain: &str) {
        if self.costs.record_outcome(outcome, domain).is_none() {
            warn!("No provider call was made, nothing to record for cost tracking");
        }
    }
}

fn outcome_error(outcome: &RequestOutcome) -> Option<&str> {
    match outcome {
        RequestOutcome::Failed(failed) => Some(failed.error.as_str()),
        RequestOutcome::Accepted(_) => None,
    }
}
