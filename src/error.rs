//! Error types for the evaluation pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while evaluating the chatbot.
///
/// Only errors that prevent a stage from reading its inputs surface as
/// `EvalError`. Failures local to one question or response are recorded on
/// the record itself and never abort a run.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The questions file does not exist.
    #[error("Questions file not found at '{0}'")]
    QuestionsNotFound(PathBuf),

    /// The responses file does not exist.
    #[error("Responses file not found at '{0}'")]
    ResponsesNotFound(PathBuf),

    /// Two questions share the same id.
    #[error("Duplicate question id '{0}'")]
    DuplicateQuestionId(String),

    /// The questions file parsed but its content is unusable.
    #[error("Invalid questions: {0}")]
    InvalidQuestions(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A CSV data source is missing or unreadable.
    #[error("Data source error: {0}")]
    DataSource(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error comes from setup (files, configuration, data
    /// sources) rather than from talking to an external service.
    pub fn is_config_error(&self) -> bool {
        !matches!(
            self,
            EvalError::LlmApi(_) | EvalError::LlmParse(_) | EvalError::Http(_)
        )
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::LlmParse(err.to_string())
    }
}
