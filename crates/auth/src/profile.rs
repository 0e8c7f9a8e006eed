//! Application-level profile record and its parsing boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PrincipalId, ProfileFetchError, Role};

/// Remote collection holding one profile per principal.
pub const PROFILES_TABLE: &str = "user_profiles";

/// Raw profile row exactly as stored remotely.
///
/// Every column is optional here; [`Profile::try_from`] is the single place
/// where a row becomes a trusted, role-bearing profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: PrincipalId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProfileRow {
    /// Parsed role; `None` for missing or unrecognized values.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    /// Display name, falling back to the email, then to a placeholder.
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.email.as_deref())
            .unwrap_or("Unnamed")
    }
}

/// A trusted profile: the principal's display name and role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: PrincipalId,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

impl Profile {
    /// First letter of the display name, for avatars.
    pub fn initial(&self) -> Option<char> {
        self.full_name
            .chars()
            .chain(self.email.chars())
            .find(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
    }
}

impl TryFrom<ProfileRow> for Profile {
    type Error = ProfileFetchError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let raw_role = row
            .role
            .as_deref()
            .ok_or_else(|| ProfileFetchError::Malformed("role is missing".to_string()))?;
        let role: Role = raw_role
            .parse()
            .map_err(|e: crate::UnknownRole| ProfileFetchError::Malformed(e.to_string()))?;

        Ok(Profile {
            id: row.id,
            full_name: row.full_name.unwrap_or_default(),
            email: row.email.unwrap_or_default(),
            role,
        })
    }
}

impl From<&Profile> for ProfileRow {
    fn from(p: &Profile) -> Self {
        ProfileRow {
            id: p.id,
            email: Some(p.email.clone()),
            full_name: Some(p.full_name.clone()),
            role: Some(p.role.as_str().to_string()),
            created_at: None,
        }
    }
}
