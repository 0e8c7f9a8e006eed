use serde::{Deserialize, Serialize};

use crate::Role;

/// Access predicate a screen is annotated with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in user, whatever their role (or lack of one).
    Authenticated,
    /// Signed-in users whose profile role is admin.
    Admin,
}

impl Access {
    /// Whether an authenticated user with `role` satisfies the predicate.
    ///
    /// `None` means the profile could not be resolved; it satisfies only the
    /// role-agnostic predicates.
    pub fn permits_role(self, role: Option<Role>) -> bool {
        match self {
            Access::Public | Access::Authenticated => true,
            Access::Admin => role.is_some_and(Role::is_admin),
        }
    }

    pub const fn requires_authentication(self) -> bool {
        !matches!(self, Access::Public)
    }
}
