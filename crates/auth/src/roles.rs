use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Role of a clinic staff member.
///
/// This is a closed set. The remote profile table stores the role as a string;
/// anything outside this enumeration is rejected at parse time rather than
/// mapped onto a default, so a corrupted or unexpected value can never grant
/// access.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Role {
    Admin,
    Dentist,
    Assistant,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Dentist, Role::Assistant];

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Dentist => "dentist",
            Role::Assistant => "assistant",
        }
    }

    /// Human-readable label for badges and the sidebar footer.
    pub const fn label(self) -> &'static str {
        match self {
            Role::Admin => "Administrator",
            Role::Dentist => "Dentist",
            Role::Assistant => "Assistant",
        }
    }

    pub const fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Roles that can be assigned as the treating practitioner of an appointment.
    pub const fn is_practitioner(self) -> bool {
        matches!(self, Role::Admin | Role::Dentist)
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Exact, case-sensitive match on the stored value.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "dentist" => Ok(Role::Dentist),
            "assistant" => Ok(Role::Assistant),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Role> for &'static str {
    fn from(value: Role) -> Self {
        value.as_str()
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
