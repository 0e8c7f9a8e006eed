use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;

use dentalcare_auth::{AuthError, Principal, PrincipalId, SessionWindow};

use super::{ChangeFeed, IdentityChange, IdentityEventKind, IdentityProvider, SignedIn};
use crate::http::{Endpoint, error_message};

#[derive(Debug, Deserialize)]
struct UserBody {
    id: PrincipalId,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
    user: UserBody,
}

/// Sign-up answers with the user object, or with a session wrapping it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpBody {
    Session { user: UserBody },
    User(UserBody),
}

fn transport(e: reqwest::Error) -> AuthError {
    if e.is_decode() {
        AuthError::unknown(e.to_string())
    } else {
        AuthError::network(e.to_string())
    }
}

async fn classify(resp: reqwest::Response) -> AuthError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = error_message(&body);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
        s if s.is_server_error() => AuthError::network(format!("{}: {message}", s.as_u16())),
        s => AuthError::unknown(format!("{}: {message}", s.as_u16())),
    }
}

/// [`IdentityProvider`] over the hosted auth API (`/auth/v1`).
///
/// Writes the access token into the shared [`crate::SessionToken`] so data
/// requests run as the signed-in user.
#[derive(Debug)]
pub struct RestIdentityProvider {
    endpoint: Endpoint,
    feed: ChangeFeed,
    refresh_token: Mutex<Option<String>>,
}

impl RestIdentityProvider {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            feed: ChangeFeed::default(),
            refresh_token: Mutex::new(None),
        }
    }

    fn adopt(&self, body: TokenBody, fallback_email: &str, kind: IdentityEventKind) -> SignedIn {
        self.endpoint.token().set(body.access_token);
        if let Ok(mut rt) = self.refresh_token.lock() {
            *rt = body.refresh_token;
        }
        let principal = Principal::new(
            body.user.id,
            body.user.email.unwrap_or_else(|| fallback_email.to_string()),
            SessionWindow::starting_at(Utc::now(), body.expires_in),
        );
        let revision = self.feed.emit(kind, Some(principal.clone()));
        SignedIn { principal, revision }
    }

    fn drop_session(&self, kind: IdentityEventKind) -> u64 {
        self.endpoint.token().clear();
        if let Ok(mut rt) = self.refresh_token.lock() {
            *rt = None;
        }
        self.feed.emit(kind, None)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// A rejected refresh ends the session with `SessionExpired`.
    pub async fn refresh_session(&self) -> Result<SignedIn, AuthError> {
        let refresh = self
            .refresh_token
            .lock()
            .ok()
            .and_then(|rt| rt.clone())
            .ok_or(AuthError::SessionExpired)?;
        let email = self.feed.current().map(|p| p.email).unwrap_or_default();
        let resp = self
            .endpoint
            .post("/auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh }))
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            let err = classify(resp).await;
            if err == AuthError::InvalidCredentials {
                tracing::info!("refresh rejected; session expired");
                self.drop_session(IdentityEventKind::SessionExpired);
                return Err(AuthError::SessionExpired);
            }
            return Err(err);
        }
        let body: TokenBody = resp.json().await.map_err(transport)?;
        Ok(self.adopt(body, &email, IdentityEventKind::TokenRefreshed))
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<SignedIn, AuthError> {
        let resp = self
            .endpoint
            .post("/auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": secret }))
            .send()
            .await
            .map_err(transport)?;
        if !resp.status().is_success() {
            return Err(classify(resp).await);
        }
        let body: TokenBody = resp.json().await.map_err(transport)?;
        Ok(self.adopt(body, email, IdentityEventKind::SignedIn))
    }

    async fn sign_out(&self) -> Result<u64, AuthError> {
        let resp = self
            .endpoint
            .post("/auth/v1/logout")
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        // An already-invalid token still ends the local session.
        if !(status.is_success() || status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN) {
            return Err(classify(resp).await);
        }
        Ok(self.drop_session(IdentityEventKind::SignedOut))
    }

    async fn create_account(&self, email: &str, secret: &str) -> Result<PrincipalId, AuthError> {
        let resp = self
            .endpoint
            .post("/auth/v1/signup")
            .json(&json!({ "email": email, "password": secret }))
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::unknown(format!("{}: {}", status.as_u16(), error_message(&body))));
        }
        let body: SignUpBody = resp.json().await.map_err(transport)?;
        Ok(match body {
            SignUpBody::Session { user } | SignUpBody::User(user) => user.id,
        })
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<IdentityChange> {
        self.feed.subscribe(true)
    }
}
