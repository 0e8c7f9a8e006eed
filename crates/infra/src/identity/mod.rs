//! Identity provider adapters.
//!
//! The provider owns the authenticated session; the application mirrors it.
//! Every change is numbered with a monotonically increasing revision so a
//! consumer can tell a late notification from a fresh one.

pub mod in_memory;
pub mod rest;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use dentalcare_auth::{AuthError, Principal, PrincipalId};

pub use in_memory::InMemoryIdentityProvider;
pub use rest::RestIdentityProvider;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityEventKind {
    /// Snapshot delivered first to every new subscriber.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    SessionExpired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChange {
    pub revision: u64,
    pub kind: IdentityEventKind,
    /// The session after the change; `None` when signed out.
    pub principal: Option<Principal>,
}

/// Successful sign-in, tagged with the revision it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub principal: Principal,
    pub revision: u64,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<SignedIn, AuthError>;

    /// Returns the revision of the sign-out change.
    async fn sign_out(&self) -> Result<u64, AuthError>;

    /// Register a new identity without touching the current session.
    async fn create_account(&self, email: &str, secret: &str) -> Result<PrincipalId, AuthError>;

    /// Stream of identity changes, starting with an `InitialSession` snapshot.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<IdentityChange>;
}

#[async_trait]
impl<P> IdentityProvider for Arc<P>
where
    P: IdentityProvider + ?Sized,
{
    async fn sign_in(&self, email: &str, secret: &str) -> Result<SignedIn, AuthError> {
        (**self).sign_in(email, secret).await
    }

    async fn sign_out(&self) -> Result<u64, AuthError> {
        (**self).sign_out().await
    }

    async fn create_account(&self, email: &str, secret: &str) -> Result<PrincipalId, AuthError> {
        (**self).create_account(email, secret).await
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<IdentityChange> {
        (**self).subscribe()
    }
}

#[derive(Debug, Default)]
struct FeedState {
    revision: u64,
    current: Option<Principal>,
    subscribers: Vec<mpsc::UnboundedSender<IdentityChange>>,
}

/// Ordered fan-out of identity changes shared by the adapters.
#[derive(Debug, Default)]
pub(crate) struct ChangeFeed {
    state: Mutex<FeedState>,
}

impl ChangeFeed {
    pub(crate) fn current(&self) -> Option<Principal> {
        self.state.lock().ok().and_then(|s| s.current.clone())
    }

    /// Record a change and deliver it; returns its revision.
    pub(crate) fn emit(&self, kind: IdentityEventKind, principal: Option<Principal>) -> u64 {
        let Ok(mut state) = self.state.lock() else {
            return 0;
        };
        state.revision += 1;
        state.current = principal.clone();
        let change = IdentityChange {
            revision: state.revision,
            kind,
            principal,
        };
        tracing::debug!(revision = change.revision, kind = ?kind, "identity change");
        state.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        change.revision
    }

    pub(crate) fn subscribe(&self, with_snapshot: bool) -> mpsc::UnboundedReceiver<IdentityChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut state) = self.state.lock() {
            if with_snapshot {
                let _ = tx.send(IdentityChange {
                    revision: state.revision,
                    kind: IdentityEventKind::InitialSession,
                    principal: state.current.clone(),
                });
            }
            state.subscribers.push(tx);
        }
        rx
    }
}
