//! Error types for the debate panel.

use thiserror::Error;

/// Failure of a single inference round-trip.
///
/// These never abort a debate; the orchestrator records them as a failure
/// marker (openings, rebuttals) or as a missing ballot (votes).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("model returned an empty response")]
    Empty,

    #[error("API error: {0}")]
    Api(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InferenceError::Timeout
        } else {
            InferenceError::Transport(err.to_string())
        }
    }
}

impl From<async_openai::error::OpenAIError> for InferenceError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        // Transport failures surface as a reqwest error somewhere in the chain.
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            if let Some(http) = cause.downcast_ref::<reqwest::Error>() {
                return if http.is_timeout() {
                    InferenceError::Timeout
                } else {
                    InferenceError::Transport(http.to_string())
                };
            }
            source = cause.source();
        }
        InferenceError::Api(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Invalid persona count: need at least {min}, got {actual}")]
    InvalidPersonaCount { min: usize, actual: usize },

    #[error("Duplicate persona name: {0}")]
    DuplicatePersona(String),

    #[error("Unknown persona: {0}")]
    UnknownPersona(String),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Transcript error: {0}")]
    Transcript(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("This debate has already been run")]
    AlreadyRun,
}
