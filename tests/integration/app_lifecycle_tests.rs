/*!
 * Application lifecycle tests: configuration to controller to recorded costs
 */

use anyhow::Result;
use std::sync::Arc;
use tranqual::app_config::{Config, TranslationProvider};
use tranqual::app_controller::Controller;
use tranqual::cost_analyzer::CostAnalyzer;
use tranqual::providers::mock::MockProvider;
use tranqual::translation::evaluator::{EvaluationBasis, EvaluationMode};
use tranqual::translation::orchestrator::{QualityStatus, TranslationRequest};

use crate::common;

fn controller_with(config: Config, translation: &MockProvider, evaluation: &MockProvider) -> Result<Controller> {
    Controller::with_providers(config, Arc::new(translation.clone()), Arc::new(evaluation.clone()))
}

#[test]
fn test_controller_withConfig_shouldBuildProviders() -> Result<()> {
    let mut config = common::test_config();
    config.evaluation.provider = TranslationProvider::Anthropic;
    config.evaluation.model = "claude-3-5-sonnet-20241022".to_string();

    let controller = Controller::with_config(config)?;

    assert_eq!(controller.orchestrator().translation_model(), "gpt-3.5-turbo");
    assert_eq!(controller.orchestrator().evaluation_model(), "claude-3-5-sonnet-20241022");
    Ok(())
}

#[test]
fn test_controller_invalidPromptOverride_shouldFailConstruction() {
    let mut config = common::test_config();
    config
        .prompt_overrides
        .insert("translation_user".to_string(), "{text} in {dialect}".to_string());

    let result = controller_with(config, &MockProvider::working(), &MockProvider::working());
    assert!(result.is_err());
}

#[test]
fn test_controller_qualitySettings_shouldReachOrchestrator() -> Result<()> {
    let mut config = common::test_config();
    config.quality.quality_threshold = 9.2;
    config.quality.max_retries = 4;
    config.quality.deadline_secs = Some(20);

    let controller = controller_with(config, &MockProvider::working(), &MockProvider::working())?;
    let orchestrator = controller.orchestrator();

    assert_eq!(orchestrator.gate().quality_threshold, 9.2);
    assert_eq!(orchestrator.gate().max_retries, 4);
    assert_eq!(orchestrator.gate().deadline, Some(std::time::Duration::from_secs(20)));
    Ok(())
}

#[test]
fn test_controller_translate_shouldRecordCostPerRequest() -> Result<()> {
    let translation = MockProvider::replying(["Bonjour", "Salut"]);
    let evaluation = MockProvider::evaluations(&[7.0, 9.0]);
    let controller = controller_with(common::test_config(), &translation, &evaluation)?;

    let outcome = tokio_test::block_on(
        controller.translate(TranslationRequest::new("Hello", "en", "fr", "Casual chat"), "chat"),
    )?;

    assert_eq!(outcome.quality_status(), Some(QualityStatus::HighQuality));
    assert_eq!(outcome.translated_text(), Some("Salut"));

    let records = controller.costs().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].attempts, 2);
    assert_eq!(records[0].domain, "chat");
    assert_eq!(records[0].target_language, "French");
    Ok(())
}

#[test]
fn test_controller_evaluationTemperature_shouldComeFromConfig() -> Result<()> {
    let mut config = common::test_config();
    config.quality.evaluation_temperature = 0.0;
    let evaluation = MockProvider::evaluations(&[9.0]);
    let controller = controller_with(config, &MockProvider::working(), &evaluation)?;

    tokio_test::block_on(controller.translate(TranslationRequest::new("Hi", "en", "de", "Greetings"), "general"))?;

    assert_eq!(evaluation.temperatures(), vec![0.0]);
    Ok(())
}

#[tokio::test]
async fn test_controller_translateBatch_shouldRecordEveryRequest() -> Result<()> {
    let translation = MockProvider::working();
    let evaluation = MockProvider::evaluations(&[9.0]);
    let mut config = common::test_config();
    config.common.concurrent_requests = 2;
    let controller = controller_with(config, &translation, &evaluation)?;

    let requests = vec![
        TranslationRequest::new("one", "en", "es", "Numbers"),
        TranslationRequest::new("two", "en", "es", "Numbers"),
        TranslationRequest::new("", "en", "es", "Numbers"),
    ];
    let outcomes = controller.translate_batch(requests, "numbers").await?;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success());
    assert!(outcomes[1].success());
    assert!(!outcomes[2].success());
    // The rejected request made no provider call and costs nothing
    assert_eq!(controller.costs().len(), 2);
    assert_eq!(translation.request_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_controller_evaluate_shouldPickModeFromBasis() -> Result<()> {
    let evaluation = MockProvider::evaluations(&[8.0]);
    let controller = controller_with(common::test_config(), &MockProvider::working(), &evaluation)?;

    let with_reference = controller
        .evaluate("Hello", "Hallo", "en", "de", EvaluationBasis::Reference("Hallo"))
        .await?;
    let source_only = controller
        .evaluate("Hello", "Hallo", "en", "de", EvaluationBasis::SourceOnly)
        .await?;

    assert_eq!(with_reference.mode, EvaluationMode::WithReference);
    assert_eq!(source_only.mode, EvaluationMode::WithoutReference);
    assert_eq!(source_only.overall_score(), 8.0);
    assert!(evaluation.requests()[1].prompt.contains("Source text (English): Hello"));

    assert!(
        controller
            .evaluate("", "Hallo", "en", "de", EvaluationBasis::SourceOnly)
            .await
            .is_err()
    );
    Ok(())
}

#[tokio::test]
async fn test_controller_checkConnections_shouldReportBothRoles() -> Result<()> {
    let controller = controller_with(common::test_config(), &MockProvider::working(), &MockProvider::failing())?;

    let checks = controller.check_connections().await;

    assert_eq!(checks.len(), 2);
    assert!(checks[0].0.starts_with("translation"));
    assert!(checks[0].1.success);
    assert!(checks[0].1.test_translation.is_some());
    assert!(!checks[1].1.success);
    assert!(checks[1].1.message.starts_with("Connection failed"));
    Ok(())
}

#[tokio::test]
async fn test_controller_costsFile_shouldAccumulateAcrossRuns() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let costs_file = temp_dir.path().join("costs.json");

    for _ in 0..2 {
        let controller = controller_with(
            common::test_config(),
            &MockProvider::working(),
            &MockProvider::evaluations(&[9.0]),
        )?;
        assert_eq!(controller.load_costs(&costs_file)?, controller.costs().len());
        controller
            .translate(TranslationRequest::new("Hi", "en", "it", "Greetings"), "general")
            .await?;
        controller.save_costs(&costs_file)?;
    }

    let ledger = CostAnalyzer::new();
    assert_eq!(ledger.load_json(&costs_file)?, 2);
    Ok(())
}

#[test]
fn test_controller_prompts_shouldListEveryTemplate() -> Result<()> {
    let controller = controller_with(common::test_config(), &MockProvider::working(), &MockProvider::working())?;
    assert_eq!(controller.prompts().len(), 8);
    Ok(())
}
