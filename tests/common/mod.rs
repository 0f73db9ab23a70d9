/*!
 * Common test utilities for the tranqual test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

use tranqual::app_config::Config;
use tranqual::providers::mock::MockProvider;
use tranqual::translation::evaluator::Evaluator;
use tranqual::translation::orchestrator::{ContextAwareTranslator, QualityGate};
use tranqual::translation::prompts::PromptRegistry;
use tranqual::translation::translator::Translator;

static INIT_LOGGING: Once = Once::new();

/// Route library logs to the test output when RUST_LOG is set
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Default config with keys that make validation independent of the environment
pub fn test_config() -> Config {
    let mut config = Config::default();
    for provider in config.available_providers.iter_mut() {
        provider.api_key = "test-key".to_string();
        provider.api_key_env = None;
    }
    config
}

/// Orchestrator over two mocks, translator at gpt-3.5-turbo and evaluator at gpt-4o
pub fn orchestrator_with(
    translation: &MockProvider,
    evaluation: &MockProvider,
    gate: QualityGate,
) -> ContextAwareTranslator {
    let prompts = Arc::new(PromptRegistry::new());
    let translator = Translator::new("gpt-3.5-turbo", Some(Arc::new(translation.clone())), Arc::clone(&prompts));
    let evaluator = Evaluator::new("gpt-4o", Some(Arc::new(evaluation.clone())), prompts);
    ContextAwareTranslator::new(translator, evaluator, gate)
}
