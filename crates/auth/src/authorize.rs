use thiserror::Error;

use crate::{Permission, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The session has no resolved role (missing or untrusted profile).
    #[error("forbidden: no role assigned")]
    NoRole,

    #[error("forbidden: role '{role}' lacks permission '{permission}'")]
    Forbidden { role: Role, permission: Permission },
}

/// Authorize an action for the current role.
///
/// - No IO
/// - No panics
/// - Fail-closed: no role means no permission
pub fn authorize(role: Option<Role>, required: Permission) -> Result<(), AuthzError> {
    let role = role.ok_or(AuthzError::NoRole)?;
    if role.grants(required) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            role,
            permission: required,
        })
    }
}
