/*!
 * Tests for pricing and the cost ledger
 */

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tranqual::cost_analyzer::{CostAnalyzer, CostRecord, calculate_cost, pricing_for, usage_cost};
use tranqual::providers::mock::MockProvider;
use tranqual::translation::orchestrator::{QualityGate, TranslationRequest};
use tranqual::translation::translator::TokenUsage;

use crate::common;

fn record(domain: &str, model: &str, total_cost: f64, attempts: usize, quality_score: f64) -> CostRecord {
    CostRecord {
        timestamp: Utc::now(),
        source_language: "English".to_string(),
        target_language: "German".to_string(),
        text_length: 12,
        tokens_used: 300,
        translation_cost: total_cost / 2.0,
        evaluation_cost: total_cost / 2.0,
        total_cost,
        translation_model: model.to_string(),
        quality_score,
        attempts,
        domain: domain.to_string(),
    }
}

#[test]
fn test_calculateCost_knownModel_shouldSplitByRatio() {
    // 700 input at 0.0015/1K plus 300 output at 0.002/1K
    assert_eq!(calculate_cost(1000, "gpt-3.5-turbo", 0.7), 0.00165);
    // 500 input at 0.03/1K plus 500 output at 0.06/1K
    assert_eq!(calculate_cost(1000, "gpt-4", 0.5), 0.045);
}

#[test]
fn test_calculateCost_unknownModel_shouldBeFree() {
    assert_eq!(calculate_cost(10_000, "llama3.2", 0.7), 0.0);
    assert!(pricing_for("llama3.2").is_none());
}

#[test]
fn test_usageCost_withExactSplit_shouldPriceEachSide() {
    let usage = TokenUsage {
        prompt_tokens: 1000,
        completion_tokens: 1000,
        total_tokens: 2000,
    };
    assert_eq!(usage_cost("gpt-4o", Some(&usage)), 0.0125);
    assert_eq!(usage_cost("gpt-4o", None), 0.0);
}

#[tokio::test]
async fn test_recordOutcome_shouldSumEveryAttempt() {
    let translation = MockProvider::replying(["uno", "dos"]);
    let evaluation = MockProvider::evaluations(&[6.0, 9.0]);
    let orchestrator = common::orchestrator_with(&translation, &evaluation, QualityGate::default());

    let outcome = orchestrator
        .translate(&TranslationRequest::new("one", "English", "Spanish", "Counting"))
        .await;

    let analyzer = CostAnalyzer::new();
    let record = analyzer.record_outcome(&outcome, "education").unwrap();

    let expected_tokens: u64 = outcome
        .attempts()
        .iter()
        .map(|a| a.translation.tokens_used() + a.evaluation.as_ref().map_or(0, |e| e.tokens_used()))
        .sum();
    assert_eq!(record.attempts, 2);
    assert_eq!(record.tokens_used, expected_tokens);
    assert_eq!(record.quality_score, 9.0);
    assert_eq!(record.domain, "education");
    assert_eq!(record.translation_model, "gpt-3.5-turbo");
    assert!(record.translation_cost > 0.0);
    assert!(record.evaluation_cost > 0.0);
    assert_eq!(analyzer.len(), 1);
}

#[test]
fn test_dailySummary_shouldOnlyCountThatDay() {
    let analyzer = CostAnalyzer::new();
    analyzer.add_record(record("legal", "gpt-3.5-turbo", 0.002, 1, 9.0));
    analyzer.add_record(record("legal", "gpt-3.5-turbo", 0.004, 2, 8.0));

    let today = analyzer.daily_summary(Utc::now().date_naive());
    assert_eq!(today.total_translations, 2);
    assert_eq!(today.total_cost, 0.006);
    assert_eq!(today.avg_cost_per_translation, 0.003);
    assert_eq!(today.total_tokens, 600);

    let yesterday = analyzer.daily_summary(Utc::now().date_naive() - chrono::Duration::days(1));
    assert_eq!(yesterday.total_translations, 0);
    assert_eq!(yesterday.avg_cost_per_translation, 0.0);
}

#[test]
fn test_domainAnalysis_shouldGroupAndAverage() {
    let analyzer = CostAnalyzer::new();
    analyzer.add_record(record("medical", "gpt-4o", 0.01, 1, 9.0));
    analyzer.add_record(record("medical", "gpt-4o", 0.02, 3, 7.0));
    analyzer.add_record(record("legal", "gpt-4o", 0.001, 1, 8.5));

    let domains = analyzer.domain_analysis();
    let medical = &domains["medical"];
    assert_eq!(medical.count, 2);
    assert_eq!(medical.total_cost, 0.03);
    assert_eq!(medical.avg_cost, 0.015);
    assert_eq!(medical.avg_quality, 8.0);
    assert_eq!(medical.avg_attempts, 2.0);
    assert_eq!(domains["legal"].count, 1);
}

#[test]
fn test_optimizationSuggestions_shouldFlagRetriesModelsAndDomains() {
    let analyzer = CostAnalyzer::new();
    assert_eq!(analyzer.optimization_suggestions(), vec!["No data available for analysis"]);

    analyzer.add_record(record("finance", "gpt-4", 0.05, 3, 7.0));
    analyzer.add_record(record("finance", "gpt-4", 0.05, 1, 9.0));

    let suggestions = analyzer.optimization_suggestions();
    assert!(suggestions.iter().any(|s| s.contains("High retry rate")));
    assert!(suggestions.iter().any(|s| s.contains("gpt-3.5-turbo for translation")));
    assert!(suggestions.iter().any(|s| s.contains("High costs in finance domain")));
}

#[test]
fn test_optimizationSuggestions_cheapTraffic_shouldReportOptimized() {
    let analyzer = CostAnalyzer::new();
    analyzer.add_record(record("general", "gpt-3.5-turbo", 0.001, 1, 9.0));

    assert_eq!(analyzer.optimization_suggestions(), vec!["Cost usage appears optimized!"]);
}

#[test]
fn test_generateReport_shouldContainSections() {
    let analyzer = CostAnalyzer::new();
    assert_eq!(analyzer.generate_report(), "No cost data available for analysis.");

    analyzer.add_record(record("general", "gpt-3.5-turbo", 0.001, 1, 9.0));
    let report = analyzer.generate_report();
    assert!(report.starts_with("TRANSLATION COST ANALYSIS REPORT"));
    assert!(report.contains("Total Translations: 1"));
    assert!(report.contains("DOMAIN BREAKDOWN"));
    assert!(report.contains("OPTIMIZATION SUGGESTIONS"));
}

#[test]
fn test_exportJson_thenLoadJson_shouldRestoreRecords() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("costs.json");

    let analyzer = CostAnalyzer::new();
    analyzer.add_record(record("legal", "gpt-4o", 0.003, 2, 8.7));
    analyzer.add_record(record("general", "gpt-3.5-turbo", 0.001, 1, 9.1));
    assert_eq!(analyzer.export_json(&path)?, 2);

    let restored = CostAnalyzer::new();
    assert_eq!(restored.load_json(&path)?, 2);
    assert_eq!(restored.records(), analyzer.records());
    Ok(())
}

#[tokio::test]
async fn test_costAnalyzer_sharedAcrossTasks_shouldKeepEveryRecord() {
    let analyzer = Arc::new(CostAnalyzer::new());
    let mut handles = Vec::new();
    for i in 0..8 {
        let analyzer = Arc::clone(&analyzer);
        handles.push(tokio::spawn(async move {
            analyzer.add_record(record("general", "gpt-4o", 0.001 * i as f64, 1, 9.0));
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(analyzer.len(), 8);
}
