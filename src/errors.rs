/*!
 * Error types for the tranqual library.
 *
 * This module contains custom error types for the provider, prompt,
 * translation and evaluation layers, using the thiserror crate for
 * ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but produced no usable text
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether the failure is worth retrying after a backoff.
    ///
    /// Server errors, rate limiting and network failures are transient;
    /// authentication and request-shape problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::RateLimitExceeded(_) | Self::ConnectionError(_) | Self::RequestFailed(_) => true,
            Self::ParseError(_) | Self::AuthenticationError(_) | Self::EmptyResponse => false,
        }
    }
}

/// Errors raised while rendering or editing prompt templates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PromptError {
    /// The registry has no template of this kind
    #[error("Prompt template '{0}' not found")]
    UnknownTemplate(String),

    /// Required variables were not supplied
    #[error("Missing required variables for '{kind}': {}", .missing.join(", "))]
    MissingVariables {
        /// Template kind
        kind: String,
        /// Sorted names of the missing variables
        missing: Vec<String>,
    },

    /// A placeholder in the content is not declared by the template
    #[error("Undeclared placeholder '{{{placeholder}}}' in '{kind}'")]
    UndeclaredPlaceholder {
        /// Template kind
        kind: String,
        /// Placeholder name without braces
        placeholder: String,
    },
}

/// Errors that can occur while evaluating a translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// Neither the call site nor the evaluator provided a client
    #[error("No provider configured for evaluation")]
    MissingClient,

    /// The provider call failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Prompt rendering failed
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// The model output did not match the evaluation schema
    #[error("Evaluation output did not match the expected schema: {0}")]
    Schema(String),

    /// A score fell outside the 0-10 scale
    #[error("Score '{field}' out of range: {value}")]
    ScoreOutOfRange {
        /// Canonical field name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// The translation being evaluated had already failed
    #[error("Cannot evaluate failed translation")]
    FailedTranslation,
}

/// Errors that can occur during translation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// Neither the call site nor the translator provided a client
    #[error("No provider configured for translation")]
    MissingClient,

    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Prompt rendering failed
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// The request violated a precondition
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every attempt failed to translate or to be evaluated
    #[error("all attempts failed or could not be evaluated")]
    NoUsableAttempt,
}
