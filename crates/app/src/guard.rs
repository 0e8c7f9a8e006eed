//! Route guard: decides what a screen shows for the current session.
//!
//! Pure function of session state and the screen's access predicate. It is
//! re-run by the router on every session change, so a role downgrade takes
//! effect on the next evaluation.

use serde::Serialize;

use dentalcare_auth::Access;

use crate::session::SessionState;

/// Outcome of guarding a screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Render,
    /// Identity not known yet; show a neutral placeholder, never a redirect.
    Placeholder,
    RedirectToLogin,
    /// Fixed "access denied" view for a signed-in user lacking the role.
    AccessDenied,
}

pub fn evaluate(state: &SessionState, access: Access) -> Decision {
    if !access.requires_authentication() {
        return Decision::Render;
    }
    match state {
        SessionState::Uninitialized | SessionState::Loading => Decision::Placeholder,
        SessionState::Anonymous => Decision::RedirectToLogin,
        SessionState::Authenticated { .. } => {
            if access.permits_role(state.role()) {
                Decision::Render
            } else {
                Decision::AccessDenied
            }
        }
    }
}
