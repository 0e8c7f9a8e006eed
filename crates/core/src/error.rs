//! Errors raised by clinic rules before anything is written.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// A form or state change rejected client-side.
///
/// Remote service failures live in `dentalcare-infra`; this type only
/// describes input the clinic rules refuse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Form input the record cannot accept (blank name, negative amount).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The change is not allowed from the record's current state.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The acting user's role does not allow the edit.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Text for a form's inline error, without the category prefix.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(m) | Self::InvariantViolation(m) | Self::InvalidId(m) => m,
            Self::Unauthorized => "you are not allowed to make this change",
        }
    }
}
