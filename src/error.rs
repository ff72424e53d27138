//! Error types for flight-agent

use thiserror::Error;

use crate::search::{ProviderFailure, ProviderId};

/// Result type alias for flight-agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flight-agent
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid trip query: {0}")]
    InvalidQuery(String),

    #[error("{provider} authentication failed: {message}")]
    Authentication { provider: ProviderId, message: String },

    #[error("{provider} rate limit exceeded: {message}")]
    RateLimit { provider: ProviderId, message: String },

    #[error("{provider} upstream error: {message}")]
    Upstream { provider: ProviderId, message: String },

    #[error("{provider} did not respond within {seconds}s")]
    Timeout { provider: ProviderId, seconds: u64 },

    #[error("No flights found ({})", describe_failures(.failures))]
    NoResults { failures: Vec<ProviderFailure> },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Max iterations reached")]
    MaxIterations,

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn upstream(provider: ProviderId, message: impl Into<String>) -> Self {
        Error::Upstream {
            provider,
            message: message.into(),
        }
    }
}

fn describe_failures(failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return "all providers returned empty results".to_string();
    }
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}
