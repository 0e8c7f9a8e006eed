use thiserror::Error;

use dentalcare_core::DomainError;

/// Failure of one request against a remote collection.
///
/// Scoped to the screen that issued it; it never changes session state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataRequestError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("row not found")]
    NotFound,

    /// Refused before any request was issued.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error(transparent)]
    Validation(#[from] DomainError),
}

impl DataRequestError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for DataRequestError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<reqwest::Error> for DataRequestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
