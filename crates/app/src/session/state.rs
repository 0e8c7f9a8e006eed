use serde::Serialize;
use thiserror::Error;

use dentalcare_auth::{AuthError, Principal, PrincipalId, Profile, ProfileFetchError, Role};

/// Lifecycle of the process-wide session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// `initialize()` has not been called.
    Uninitialized,
    /// Waiting for the identity provider's first notification.
    Loading,
    /// Signed in. `profile` is `None` when it could not be resolved; such a
    /// session holds no role.
    Authenticated {
        principal: Principal,
        profile: Option<Profile>,
    },
    Anonymous,
}

impl SessionState {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            SessionState::Authenticated { principal, .. } => Some(principal),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            SessionState::Authenticated { profile, .. } => profile.as_ref(),
            _ => None,
        }
    }

    pub fn principal_id(&self) -> Option<PrincipalId> {
        self.principal().map(|p| p.id)
    }

    /// Role of an authenticated session with a trusted profile.
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|p| p.role)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    /// Still waiting on the identity provider.
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionState::Uninitialized | SessionState::Loading)
    }
}

/// Identity or profile failure surfaced on the session.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "error", rename_all = "snake_case")]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Profile(#[from] ProfileFetchError),
}

/// Immutable view of the store, published on every committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub last_error: Option<SessionError>,
    /// Bumped whenever the signed-in principal changes (including to none).
    pub generation: u64,
    /// Bumped on every commit; listeners use it to drop out-of-order copies.
    pub seq: u64,
}

impl SessionSnapshot {
    pub fn role(&self) -> Option<Role> {
        self.state.role()
    }
}
