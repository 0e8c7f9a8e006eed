//! Sidebar and header around every authenticated screen.

use serde::Serialize;

use dentalcare_auth::AuthError;

use crate::context::AppContext;
use crate::router::{NavItem, View};

/// Signed-in user as shown in the sidebar footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserBadge {
    pub name: String,
    pub email: String,
    /// Role label; `None` while the profile is unavailable.
    pub role: Option<&'static str>,
    pub initial: Option<char>,
}

#[derive(Debug, Clone)]
pub struct Shell {
    ctx: AppContext,
}

impl Shell {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub fn nav(&self) -> Vec<NavItem> {
        self.ctx.router.nav_items()
    }

    pub fn user(&self) -> Option<UserBadge> {
        let state = self.ctx.store.state();
        let principal = state.principal()?;
        Some(match state.profile() {
            Some(profile) => UserBadge {
                name: profile.full_name.clone(),
                email: profile.email.clone(),
                role: Some(profile.role.label()),
                initial: profile.initial(),
            },
            None => UserBadge {
                name: principal.email.clone(),
                email: principal.email.clone(),
                role: None,
                initial: principal.email.chars().next().map(|c| c.to_ascii_uppercase()),
            },
        })
    }

    /// Sign out; the router has already moved off protected screens when
    /// this returns.
    pub async fn sign_out(&self) -> Result<View, AuthError> {
        self.ctx.store.sign_out().await?;
        Ok(self.ctx.router.view())
    }
}
