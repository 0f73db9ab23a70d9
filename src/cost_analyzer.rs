/*!
 * Cost tracking for translation requests.
 *
 * Prices token usage per model and keeps an in-process ledger of what each
 * quality-gated request cost, with per-day and per-domain summaries,
 * optimization suggestions and a plain-text report. The ledger can be
 * exported to and loaded from JSON.
 */

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::translation::orchestrator::RequestOutcome;
use crate::translation::translator::TokenUsage;

/// Default share of input tokens when only a total is known
pub const DEFAULT_INPUT_RATIO: f64 = 0.7;

const EXPENSIVE_MODELS: [&str; 2] = ["gpt-4", "gpt-4-turbo"];

/// USD price per 1K tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    /// Cost of an exact input/output split, rounded to 6 decimals
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        round_to(
            input_tokens as f64 / 1000.0 * self.input_per_1k
                + output_tokens as f64 / 1000.0 * self.output_per_1k,
            6,
        )
    }
}

static MODEL_PRICING: Lazy<HashMap<&'static str, ModelPricing>> = Lazy::new(|| {
    let mut pricing = HashMap::new();
    pricing.insert("gpt-3.5-turbo", ModelPricing { input_per_1k: 0.0015, output_per_1k: 0.002 });
    pricing.insert("gpt-4o", ModelPricing { input_per_1k: 0.0025, output_per_1k: 0.01 });
    pricing.insert("gpt-4-turbo", ModelPricing { input_per_1k: 0.01, output_per_1k: 0.03 });
    pricing.insert("gpt-4", ModelPricing { input_per_1k: 0.03, output_per_1k: 0.06 });
    pricing
});

/// Pricing for a model, if it is in the table
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    MODEL_PRICING.get(model).copied()
}

/// Cost of `tokens` total tokens, split by `input_ratio`. Unknown models cost 0.
pub fn calculate_cost(tokens: u64, model: &str, input_ratio: f64) -> f64 {
    match pricing_for(model) {
        Some(pricing) => {
            let input_tokens = (tokens as f64 * input_ratio) as u64;
            pricing.cost(input_tokens, tokens.saturating_sub(input_tokens))
        }
        None => 0.0,
    }
}

/// Cost of reported usage, using the exact split when the backend gave one
pub fn usage_cost(model: &str, usage: Option<&TokenUsage>) -> f64 {
    match (usage, pricing_for(model)) {
        (Some(usage), Some(pricing)) if usage.prompt_tokens + usage.completion_tokens > 0 => {
            pricing.cost(usage.prompt_tokens, usage.completion_tokens)
        }
        (Some(usage), Some(_)) => calculate_cost(usage.total_tokens, model, DEFAULT_INPUT_RATIO),
        _ => 0.0,
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Cost of one orchestrated request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub timestamp: DateTime<Utc>,
    pub source_language: String,
    pub target_language: String,
    /// Source text length in characters
    pub text_length: usize,
    pub tokens_used: u64,
    pub translation_cost: f64,
    pub evaluation_cost: f64,
    pub total_cost: f64,
    pub translation_model: String,
    pub quality_score: f64,
    pub attempts: usize,
    #[serde(default = "default_domain")]
    pub domain: String,
}

fn default_domain() -> String {
    "general".to_string()
}

/// Aggregate for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub total_translations: usize,
    pub total_cost: f64,
    pub translation_cost: f64,
    pub evaluation_cost: f64,
    pub avg_cost_per_translation: f64,
    pub total_tokens: u64,
}

/// Aggregate for one domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStats {
    pub count: usize,
    pub total_cost: f64,
    pub total_tokens: u64,
    pub avg_cost: f64,
    pub avg_quality: f64,
    pub avg_attempts: f64,
}

/// Thread-safe cost ledger
#[derive(Debug, Default)]
pub struct CostAnalyzer {
    records: RwLock<Vec<CostRecord>>,
}

impl CostAnalyzer {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a prepared record
    pub fn add_record(&self, record: CostRecord) {
        self.records.write().push(record);
    }

    /// Record the cost of every attempt of one request.
    ///
    /// Requests rejected before any attempt cost nothing and are not recorded.
    pub fn record_outcome(&self, outcome: &RequestOutcome, domain: &str) -> Option<CostRecord> {
        let attempts = outcome.attempts();
        let first = attempts.first()?;

        let mut tokens_used = 0;
        let mut translation_cost = 0.0;
        let mut evaluation_cost = 0.0;
        for attempt in attempts {
            tokens_used += attempt.translation.tokens_used();
            translation_cost += attempt.translation.cost_estimate;
            if let Some(evaluation) = &attempt.evaluation {
                tokens_used += evaluation.tokens_used();
                evaluation_cost += evaluation.cost_estimate;
            }
        }

        let record = CostRecord {
            timestamp: Utc::now(),
            source_language: first.translation.languages.source.clone(),
            target_language: first.translation.languages.target.clone(),
            text_length: first.translation.original_text.chars().count(),
            tokens_used,
            translation_cost: round_to(translation_cost, 6),
            evaluation_cost: round_to(evaluation_cost, 6),
            total_cost: round_to(translation_cost + evaluation_cost, 6),
            translation_model: first.translation.model.clone(),
            quality_score: outcome.best_score().unwrap_or(0.0),
            attempts: attempts.len(),
            domain: if domain.is_empty() { default_domain() } else { domain.to_string() },
        };

        debug!(
            "Recorded cost ${:.6} over {} attempt(s) in domain '{}'",
            record.total_cost, record.attempts, record.domain
        );
        self.add_record(record.clone());
        Some(record)
    }

    /// Snapshot of all records
    pub fn records(&self) -> Vec<CostRecord> {
        self.records.read().clone()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Summary of records whose UTC date is `date`
    pub fn daily_summary(&self, date: NaiveDate) -> DailySummary {
        let records = self.records.read();
        let daily: Vec<&CostRecord> = records
            .iter()
            .filter(|r| r.timestamp.date_naive() == date)
            .collect();

        let total_cost: f64 = daily.iter().map(|r| r.total_cost).sum();
        let translation_cost: f64 = daily.iter().map(|r| r.translation_cost).sum();
        let evaluation_cost: f64 = daily.iter().map(|r| r.evaluation_cost).sum();
        let avg = if daily.is_empty() { 0.0 } else { total_cost / daily.len() as f64 };

        DailySummary {
            date,
            total_translations: daily.len(),
            total_cost: round_to(total_cost, 4),
            translation_cost: round_to(translation_cost, 4),
            evaluation_cost: round_to(evaluation_cost, 4),
            avg_cost_per_translation: round_to(avg, 4),
            total_tokens: daily.iter().map(|r| r.tokens_used).sum(),
        }
    }

    /// Cost statistics grouped by domain
    pub fn domain_analysis(&self) -> BTreeMap<String, DomainStats> {
        let records = self.records.read();
        let mut grouped: BTreeMap<String, Vec<&CostRecord>> = BTreeMap::new();
        for record in records.iter() {
            grouped.entry(record.domain.clone()).or_default().push(record);
        }

        grouped
            .into_iter()
            .map(|(domain, records)| {
                let count = records.len() as f64;
                let total_cost: f64 = records.iter().map(|r| r.total_cost).sum();
                let stats = DomainStats {
                    count: records.len(),
                    total_cost: round_to(total_cost, 4),
                    total_tokens: records.iter().map(|r| r.tokens_used).sum(),
                    avg_cost: round_to(total_cost / count, 4),
                    avg_quality: round_to(records.iter().map(|r| r.quality_score).sum::<f64>() / count, 1),
                    avg_attempts: round_to(records.iter().map(|r| r.attempts as f64).sum::<f64>() / count, 1),
                };
                (domain, stats)
            })
            .collect()
    }

    /// Suggestions derived from retry, model and domain patterns
    pub fn optimization_suggestions(&self) -> Vec<String> {
        let (total, retry_heavy, expensive) = {
            let records = self.records.read();
            (
                records.len(),
                records.iter().filter(|r| r.attempts > 2).count(),
                records
                    .iter()
                    .filter(|r| EXPENSIVE_MODELS.contains(&r.translation_model.as_str()))
                    .count(),
            )
        };

        if total == 0 {
            return vec!["No data available for analysis".to_string()];
        }

        let mut suggestions = Vec::new();
        if retry_heavy as f64 > total as f64 * 0.2 {
            suggestions.push(
                "High retry rate detected. Consider lowering quality threshold or improving prompts.".to_string(),
            );
        }
        if expensive as f64 > total as f64 * 0.5 {
            suggestions.push(
                "Consider using gpt-3.5-turbo for translation and gpt-4o for evaluation only.".to_string(),
            );
        }
        for (domain, stats) in self.domain_analysis() {
            if stats.avg_cost > 0.01 {
                suggestions.push(format!(
                    "High costs in {} domain (${}/translation). Consider domain-specific optimization.",
                    domain, stats.avg_cost
                ));
            }
        }

        if suggestions.is_empty() {
            suggestions.push("Cost usage appears optimized!".to_string());
        }
        suggestions
    }

    /// Plain-text report of totals, recent activity, domains and suggestions
    pub fn generate_report(&self) -> String {
        let (total, total_cost, recent_count, recent_cost) = {
            let records = self.records.read();
            let week_ago = Utc::now() - ChronoDuration::days(7);
            let recent: Vec<&CostRecord> = records.iter().filter(|r| r.timestamp > week_ago).collect();
            (
                records.len(),
                records.iter().map(|r| r.total_cost).sum::<f64>(),
                recent.len(),
                recent.iter().map(|r| r.total_cost).sum::<f64>(),
            )
        };

        if total == 0 {
            return "No cost data available for analysis.".to_string();
        }

        let mut report = String::new();
        let _ = writeln!(report, "TRANSLATION COST ANALYSIS REPORT");
        let _ = writeln!(report, "{}", "=".repeat(50));
        let _ = writeln!(report);
        let _ = writeln!(report, "OVERALL STATISTICS");
        let _ = writeln!(report, "Total Translations: {}", total);
        let _ = writeln!(report, "Total Cost: ${:.4}", total_cost);
        let _ = writeln!(report, "Average Cost per Translation: ${:.4}", total_cost / total as f64);
        let _ = writeln!(report);
        let _ = writeln!(report, "RECENT ACTIVITY (Last 7 days)");
        let _ = writeln!(report, "Recent Translations: {}", recent_count);
        let _ = writeln!(report, "Recent Cost: ${:.4}", recent_cost);
        let _ = writeln!(report);
        let _ = writeln!(report, "DOMAIN BREAKDOWN");
        for (domain, stats) in self.domain_analysis() {
            let _ = writeln!(
                report,
                "{}: {} translations, ${:.4} total, ${:.4} avg",
                domain, stats.count, stats.total_cost, stats.avg_cost
            );
        }
        let _ = writeln!(report);
        let _ = writeln!(report, "OPTIMIZATION SUGGESTIONS");
        for (i, suggestion) in self.optimization_suggestions().iter().enumerate() {
            let _ = writeln!(report, "{}. {}", i + 1, suggestion);
        }
        report
    }

    /// Write all records to `path` as a JSON array; returns the count written
    pub fn export_json(&self, path: &Path) -> Result<usize> {
        let records = self.records();
        let file = File::create(path)
            .with_context(|| format!("Failed to create cost file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &records)
            .with_context(|| format!("Failed to write cost file: {}", path.display()))?;
        info!("Exported {} cost record(s) to {}", records.len(), path.display());
        Ok(records.len())
    }

    /// Append records from a JSON array at `path`; returns the count loaded
    pub fn load_json(&self, path: &Path) -> Result<usize> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open cost file: {}", path.display()))?;
        let loaded: Vec<CostRecord> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse cost file: {}", path.display()))?;
        let count = loaded.len();
        self.records.write().extend(loaded);
        info!("Loaded {} cost record(s) from {}", count, path.display());
        Ok(count)
    }
}
