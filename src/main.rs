// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::too_many_arguments)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use tranqual::app_config::{self, Config, TranslationProvider};
use tranqual::app_controller::Controller;
use tranqual::translation::evaluator::EvaluationBasis;
use tranqual::translation::orchestrator::{RequestOutcome, TranslationRequest};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Anthropic => TranslationProvider::Anthropic,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// tranqual - quality-gated translation with LLMs
///
/// Translates text with one model, scores it with another, and retries with
/// a higher temperature until the score reaches the quality threshold.
#[derive(Parser, Debug)]
#[command(name = "tranqual")]
#[command(version)]
#[command(about = "Quality-gated LLM translation")]
#[command(long_about = "tranqual translates text with one model and scores each attempt with another,
retrying until the translation reaches the configured quality threshold.

EXAMPLES:
    tranqual translate \"The build is green\" -s en -t de -x \"CI dashboards\"
    tranqual translate \"Bug\" -s en -t fr -x \"Software QA\" --threshold 9 --json
    tranqual batch requests.json -o outcomes.json --concurrency 8
    tranqual evaluate --source-text Hello --translation Hallo -s en -t de --reference Hallo
    tranqual prompts                              # List prompt templates
    tranqual check                                # Test provider connections
    tranqual costs --costs-file costs.json        # Print a cost report
    tranqual completions bash > tranqual.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file does not exist,
    a default one is written. API keys fall back to OPENAI_API_KEY and
    ANTHROPIC_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate one text, retrying until the quality threshold is met
    Translate(TranslateArgs),

    /// Translate a JSON array of requests concurrently
    Batch(BatchArgs),

    /// Score an existing translation
    Evaluate(EvaluateArgs),

    /// List prompt templates
    Prompts,

    /// Test the configured provider connections
    Check,

    /// Print a report for a cost ledger
    Costs {
        /// Cost ledger file
        #[arg(long, default_value = "costs.json")]
        costs_file: PathBuf,
    },

    /// Generate shell completions for tranqual
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Settings that override the configuration file for one run
#[derive(Args, Debug, Clone, Default)]
struct PipelineArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Evaluation provider to use
    #[arg(long, value_enum)]
    evaluation_provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(long)]
    translation_model: Option<String>,

    /// Model name to use for evaluation
    #[arg(long)]
    evaluation_model: Option<String>,

    /// Minimum overall score (0-10) to accept a translation
    #[arg(long)]
    threshold: Option<f64>,

    /// Retries after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,
}

impl PipelineArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = &self.provider {
            config.translation.provider = provider.clone().into();
            // Keep the model consistent with the new provider unless given explicitly
            config.translation.model.clear();
        }
        if let Some(provider) = &self.evaluation_provider {
            config.evaluation.provider = provider.clone().into();
            config.evaluation.model.clear();
        }
        if let Some(model) = &self.translation_model {
            config.translation.model = model.clone();
        }
        if let Some(model) = &self.evaluation_model {
            config.evaluation.model = model.clone();
        }
        if let Some(threshold) = self.threshold {
            config.quality.quality_threshold = threshold;
        }
        if let Some(max_retries) = self.max_retries {
            config.quality.max_retries = max_retries;
        }
    }
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Text to translate
    #[arg(value_name = "TEXT")]
    text: String,

    /// Source language code or name (e.g., 'en', 'English')
    #[arg(short, long)]
    source_language: String,

    /// Target language code or name (e.g., 'de', 'German')
    #[arg(short, long)]
    target_language: String,

    /// Domain context guiding terminology and register
    #[arg(short = 'x', long)]
    context: String,

    /// Temperature of the first attempt
    #[arg(long)]
    temperature: Option<f32>,

    /// Domain label for cost tracking
    #[arg(long, default_value = "general")]
    domain: String,

    /// Print the full outcome as JSON
    #[arg(long)]
    json: bool,

    /// Append the cost of this run to a ledger file
    #[arg(long)]
    costs_file: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// JSON array of requests ({text, source_language, target_language, context})
    #[arg(value_name = "INPUT_FILE")]
    input: PathBuf,

    /// Output file for the outcomes (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Requests orchestrated concurrently
    #[arg(long)]
    concurrency: Option<usize>,

    /// Domain label for cost tracking
    #[arg(long, default_value = "general")]
    domain: String,

    /// Append the cost of this run to a ledger file
    #[arg(long)]
    costs_file: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Source text
    #[arg(long)]
    source_text: String,

    /// Translation to score
    #[arg(long)]
    translation: String,

    /// Source language code or name
    #[arg(short, long)]
    source_language: String,

    /// Target language code or name
    #[arg(short, long)]
    target_language: String,

    /// Reference translation to compare against
    #[arg(long, conflicts_with = "context")]
    reference: Option<String>,

    /// Domain context the translation should respect
    #[arg(short = 'x', long)]
    context: Option<String>,

    /// Evaluation provider to use
    #[arg(long, value_enum)]
    evaluation_provider: Option<CliTranslationProvider>,

    /// Model name to use for evaluation
    #[arg(long)]
    evaluation_model: Option<String>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        // The logger accepts everything; the global max level filters
        let logger = Box::new(CustomLogger::new(LevelFilter::Trace));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "tranqual", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = load_or_create_config(&cli.config)?;
    match &cli.log_level {
        Some(level) => config.log_level = level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    match cli.command {
        Commands::Translate(args) => run_translate(config, args).await,
        Commands::Batch(args) => run_batch(config, args).await,
        Commands::Evaluate(args) => run_evaluate(config, args).await,
        Commands::Prompts => run_prompts(config),
        Commands::Check => run_check(config).await,
        Commands::Costs { costs_file } => run_costs(&costs_file),
        Commands::Completions { .. } => Ok(()),
    }
}

fn load_or_create_config(path: &Path) -> Result<Config> {
    if path.exists() {
        return Config::from_file(path);
    }

    warn!("Config file not found at '{}', creating default config.", path.display());
    let config = Config::default();
    config
        .save(path)
        .context("Failed to write default config")?;
    Ok(config)
}

fn build_controller(config: Config) -> Result<Controller> {
    config.validate().context("Configuration validation failed")?;
    Controller::with_config(config)
}

async fn run_translate(mut config: Config, args: TranslateArgs) -> Result<()> {
    args.pipeline.apply(&mut config);
    let base_temperature = args.temperature.unwrap_or(config.quality.base_temperature);
    let controller = build_controller(config)?;
    load_costs(&controller, args.costs_file.as_deref())?;

    let request = TranslationRequest::new(args.text, args.source_language, args.target_language, args.context)
        .with_temperature(base_temperature);
    let outcome = controller.translate(request, &args.domain).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    save_costs(&controller, args.costs_file.as_deref())?;

    if outcome.success() {
        Ok(())
    } else {
        Err(anyhow!("Translation failed"))
    }
}

async fn run_batch(mut config: Config, args: BatchArgs) -> Result<()> {
    args.pipeline.apply(&mut config);
    if let Some(concurrency) = args.concurrency {
        config.common.concurrent_requests = concurrency;
    }
    let base_temperature = config.quality.base_temperature;
    let controller = build_controller(config)?;
    load_costs(&controller, args.costs_file.as_deref())?;

    let content = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read batch file: {}", args.input.display()))?;
    let requests = parse_batch(&content, base_temperature)
        .with_context(|| format!("Failed to parse batch file: {}", args.input.display()))?;
    info!("Loaded {} request(s) from {}", requests.len(), args.input.display());

    let outcomes = controller.translate_batch(requests, &args.domain).await?;
    let json = serde_json::to_string_pretty(&outcomes)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write outcomes: {}", path.display()))?;
            info!("Wrote {} outcome(s) to {}", outcomes.len(), path.display());
        }
        None => println!("{}", json),
    }

    save_costs(&controller, args.costs_file.as_deref())
}

/// Requests without an explicit temperature take the configured base temperature
fn parse_batch(content: &str, base_temperature: f32) -> Result<Vec<TranslationRequest>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(content)?;
    values
        .into_iter()
        .map(|value| {
            let explicit = value.get("base_temperature").is_some();
            let request: TranslationRequest = serde_json::from_value(value)?;
            Ok(if explicit {
                request
            } else {
                request.with_temperature(base_temperature)
            })
        })
        .collect()
}

async fn run_evaluate(mut config: Config, args: EvaluateArgs) -> Result<()> {
    if let Some(provider) = &args.evaluation_provider {
        config.evaluation.provider = provider.clone().into();
        config.evaluation.model.clear();
    }
    if let Some(model) = &args.evaluation_model {
        config.evaluation.model = model.clone();
    }
    let controller = build_controller(config)?;

    let basis = match (&args.reference, &args.context) {
        (Some(reference), _) => EvaluationBasis::Reference(reference),
        (None, Some(context)) => EvaluationBasis::Context(context),
        (None, None) => EvaluationBasis::SourceOnly,
    };
    let result = controller
        .evaluate(
            &args.source_text,
            &args.translation,
            &args.source_language,
            &args.target_language,
            basis,
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    match result.error() {
        None => Ok(()),
        Some(error) => Err(anyhow!("Evaluation failed: {}", error)),
    }
}

fn run_prompts(config: Config) -> Result<()> {
    let registry = tranqual::PromptRegistry::with_overrides(&config.prompt_overrides)?;
    for summary in registry.list() {
        println!("{} (v{})", summary.kind, summary.version);
        println!("  {}", summary.description);
        println!("  variables: {}", summary.variables.join(", "));
        println!("  {}", summary.content_preview.replace('\n', " "));
        println!();
    }
    Ok(())
}

async fn run_check(config: Config) -> Result<()> {
    let controller = build_controller(config)?;
    let mut all_ok = true;
    for (role, check) in controller.check_connections().await {
        if check.success {
            info!("{} - {}: {}", role, check.model, check.message);
        } else {
            all_ok = false;
            log::error!("{} - {}: {}", role, check.model, check.message);
        }
    }
    if all_ok {
        Ok(())
    } else {
        Err(anyhow!("One or more provider connections failed"))
    }
}

fn run_costs(costs_file: &Path) -> Result<()> {
    if !costs_file.exists() {
        return Err(anyhow!("Cost file does not exist: {}", costs_file.display()));
    }
    let analyzer = tranqual::CostAnalyzer::new();
    analyzer.load_json(costs_file)?;
    println!("{}", analyzer.generate_report());
    Ok(())
}

fn load_costs(controller: &Controller, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        controller.load_costs(path)?;
    }
    Ok(())
}

fn save_costs(controller: &Controller, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        controller.save_costs(path)?;
    }
    Ok(())
}

fn print_outcome(outcome: &RequestOutcome) {
    match outcome {
        RequestOutcome::Accepted(accepted) => {
            println!("{}", accepted.translated_text);
            info!(
                "Score {:.1} after {} attempt(s) in {:.2}s: {}",
                accepted.best_score, accepted.attempts_count, accepted.total_time_secs, accepted.message
            );
        }
        RequestOutcome::Failed(failed) => {
            log::error!(
                "Translation failed after {} attempt(s): {}",
                failed.attempts.len(),
                failed.error
            );
        }
    }
}
