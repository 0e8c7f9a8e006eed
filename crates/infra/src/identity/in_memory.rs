use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use dentalcare_auth::{AuthError, Principal, PrincipalId, SessionWindow};

use super::{ChangeFeed, IdentityChange, IdentityEventKind, IdentityProvider, SignedIn};

const DEFAULT_SESSION_SECS: i64 = 3600;

#[derive(Debug, Clone)]
struct Account {
    id: PrincipalId,
    secret: String,
}

/// Identity provider backed by an in-process account table.
///
/// Used by tests and local runs; exposes hooks to simulate provider-side
/// events (expiry, token refresh) and failures.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    feed: ChangeFeed,
    offline: AtomicBool,
    /// When false, subscribers never receive the initial snapshot.
    responsive: bool,
    latency: Mutex<Option<Duration>>,
    session_secs: i64,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            feed: ChangeFeed::default(),
            offline: AtomicBool::new(false),
            responsive: true,
            latency: Mutex::new(None),
            session_secs: DEFAULT_SESSION_SECS,
        }
    }

    /// A provider that accepts subscriptions but never reports a session.
    pub fn unresponsive() -> Self {
        Self {
            responsive: false,
            ..Self::new()
        }
    }

    pub fn with_session_secs(mut self, secs: i64) -> Self {
        self.session_secs = secs;
        self
    }

    pub fn add_account(&self, email: &str, secret: &str) -> PrincipalId {
        let id = PrincipalId::new();
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                email.trim().to_lowercase(),
                Account {
                    id,
                    secret: secret.to_string(),
                },
            );
        }
        id
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay applied to every sign-in and sign-out call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut l) = self.latency.lock() {
            *l = latency;
        }
    }

    pub fn current(&self) -> Option<Principal> {
        self.feed.current()
    }

    /// Provider-side expiry of the current session.
    pub fn expire_session(&self) -> u64 {
        self.feed.emit(IdentityEventKind::SessionExpired, None)
    }

    /// Provider-side token refresh; the session window is renewed.
    pub fn refresh_session(&self) -> Option<u64> {
        let mut principal = self.feed.current()?;
        principal.session = SessionWindow::starting_at(Utc::now(), self.session_secs);
        Some(self.feed.emit(IdentityEventKind::TokenRefreshed, Some(principal)))
    }

    async fn round_trip(&self) -> Result<(), AuthError> {
        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(AuthError::network("identity provider unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<SignedIn, AuthError> {
        self.round_trip().await?;
        let email = email.trim().to_lowercase();
        let account = self
            .accounts
            .lock()
            .map_err(|_| AuthError::unknown("account table poisoned"))?
            .get(&email)
            .cloned();
        let account = match account {
            Some(a) if a.secret == secret => a,
            _ => return Err(AuthError::InvalidCredentials),
        };
        let principal = Principal::new(
            account.id,
            email,
            SessionWindow::starting_at(Utc::now(), self.session_secs),
        );
        let revision = self.feed.emit(IdentityEventKind::SignedIn, Some(principal.clone()));
        Ok(SignedIn { principal, revision })
    }

    async fn sign_out(&self) -> Result<u64, AuthError> {
        self.round_trip().await?;
        Ok(self.feed.emit(IdentityEventKind::SignedOut, None))
    }

    async fn create_account(&self, email: &str, secret: &str) -> Result<PrincipalId, AuthError> {
        self.round_trip().await?;
        let key = email.trim().to_lowercase();
        let exists = self
            .accounts
            .lock()
            .map_err(|_| AuthError::unknown("account table poisoned"))?
            .contains_key(&key);
        if exists {
            return Err(AuthError::unknown("user already registered"));
        }
        Ok(self.add_account(&key, secret))
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<IdentityChange> {
        self.feed.subscribe(self.responsive)
    }
}
