use serde::Serialize;
use thiserror::Error;

/// Identity-provider failure, classified for the login screen.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("identity provider unreachable: {0}")]
    NetworkFailure(String),

    #[error("session expired")]
    SessionExpired,

    #[error("authentication failed: {0}")]
    Unknown(String),
}

impl AuthError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkFailure(msg.into())
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Worth retrying without user action.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}

/// Failure to resolve the profile of an authenticated principal.
///
/// Every variant results in *no role* for the session.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProfileFetchError {
    #[error("profile not found")]
    NotFound,

    #[error("profile service unreachable: {0}")]
    NetworkFailure(String),

    /// The row exists but cannot be trusted (e.g. unrecognized role).
    #[error("malformed profile: {0}")]
    Malformed(String),
}

impl ProfileFetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NetworkFailure(_))
    }
}
