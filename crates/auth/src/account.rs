//! Account provisioning and profile edits.
//!
//! Validation runs client-side before any request; privilege rules mirror
//! what the server enforces so the UI never offers an action that would be
//! rejected for authorization reasons.

use serde::{Deserialize, Serialize};

use dentalcare_core::DomainError;

use crate::{Permission, PrincipalId, Profile, Role, authorize};

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Request to provision a new staff account (identity + profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

impl NewAccount {
    /// Validate and normalize (trimmed name, lower-cased email).
    pub fn validated(self) -> Result<Self, DomainError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("invalid email format"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let full_name = self.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(DomainError::validation("full name cannot be empty"));
        }
        Ok(Self {
            email,
            password: self.password,
            full_name,
            role: self.role,
        })
    }
}

/// Partial update of a profile row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.role.is_none()
    }

    /// Check that `actor` may apply this update to `target`.
    ///
    /// - Anyone may rename themselves.
    /// - Editing someone else, or changing any role (including one's own),
    ///   requires `ManageUsers`.
    pub fn check(&self, actor: Option<&Profile>, target: PrincipalId) -> Result<(), DomainError> {
        let Some(actor) = actor else {
            return Err(DomainError::Unauthorized);
        };
        if let Some(name) = &self.full_name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("full name cannot be empty"));
            }
        }
        let needs_admin = actor.id != target || self.role.is_some();
        if needs_admin {
            authorize(Some(actor.role), Permission::ManageUsers).map_err(|_| DomainError::Unauthorized)?;
        }
        Ok(())
    }
}
