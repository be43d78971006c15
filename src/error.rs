use thiserror::Error;
use crate::types::State;
use crate::events::Event;

/// Faults of the loop itself. Provider failures never surface here;
/// they are absorbed into the miss path by the state handlers.
#[derive(Debug, Error)]
pub enum FinderError {
    #[error("car type query must not be empty")]
    EmptyQuery,

    #[error("Invalid transition: {from} + {event} not in transition table")]
    InvalidTransition { from: State, event: Event },

    #[error("No handler registered for state: {0}")]
    NoHandlerForState(String),

    #[error("Safety cap exceeded after {0} iterations")]
    SafetyCapExceeded(usize),

    #[error("Build error: {0}")]
    BuildError(String),
}

/// Failure of a single external capability call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{call} timed out after {secs}s")]
    Timeout { call: &'static str, secs: u64 },

    #[error("Network error: {0}")]
    Http(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Http(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("invalid bind address '{value}': {source}")]
    InvalidBind {
        value:  String,
        #[source]
        source: std::net::AddrParseError,
    },
}
