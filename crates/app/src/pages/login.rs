use dentalcare_auth::AuthError;

use crate::context::AppContext;
use crate::router::View;

/// Sign-in form.
#[derive(Debug, Clone)]
pub struct LoginPage {
    ctx: AppContext,
}

impl LoginPage {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Sign in and return the view the router moved to.
    ///
    /// Blank fields are rejected locally as invalid credentials.
    pub async fn submit(&self, email: &str, password: &str) -> Result<View, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        self.ctx.store.sign_in(email.trim(), password).await?;
        Ok(self.ctx.router.view())
    }

    /// Message for the form's error banner.
    pub fn error_message(&self) -> Option<String> {
        self.ctx.store.last_error().map(|e| e.to_string())
    }
}
