//! Process-wide session store.
//!
//! Mirrors the identity provider's session and the signed-in user's profile.
//! Writers never hold the state lock across an await: remote calls happen
//! first, then the result is committed in one step and published
//! synchronously to every listener before the writer returns.
//!
//! Identity changes carry the provider's revision number. A result computed
//! for an older revision (a profile fetch that finished after a sign-out, a
//! late notification) is dropped instead of committed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use dentalcare_auth::{AuthError, Principal, PrincipalId, Profile, ProfileFetchError, Role};
use dentalcare_events::{EventBus, InMemoryEventBus, Listener, ListenerId, Subscription};
use dentalcare_infra::{IdentityChange, IdentityEventKind, IdentityProvider, ProfileDirectory};

use super::state::{SessionError, SessionSnapshot, SessionState};

#[derive(Debug)]
struct Core {
    state: SessionState,
    last_error: Option<SessionError>,
    generation: u64,
    seq: u64,
    /// Highest provider revision seen through any path.
    latest_revision: u64,
    /// Revision of the identity change last committed.
    committed_revision: Option<u64>,
    initialized: bool,
}

impl Core {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            generation: self.generation,
            seq: self.seq,
        }
    }

    /// Record a revision; `false` if a newer one was already seen.
    fn observe(&mut self, revision: u64) -> bool {
        if revision < self.latest_revision {
            return false;
        }
        self.latest_revision = revision;
        true
    }

    /// Whether a result for `revision` may still be committed.
    fn accepts(&self, revision: u64) -> bool {
        revision >= self.latest_revision && self.committed_revision.is_none_or(|c| revision > c)
    }

    fn set_state(&mut self, state: SessionState) {
        if state.principal_id() != self.state.principal_id() {
            self.generation += 1;
        }
        self.state = state;
    }
}

struct Inner {
    identity: Arc<dyn IdentityProvider>,
    profiles: ProfileDirectory,
    init_timeout: Duration,
    core: RwLock<Core>,
    bus: InMemoryEventBus<SessionSnapshot>,
    /// Latest committed snapshot, for async waiters.
    latest: watch::Sender<SessionSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Identity changes not yet applied.
///
/// Every change is observed as soon as it is read, even when it has to wait
/// behind a profile fetch, so a result for an older revision can no longer
/// commit.
struct Inbox {
    changes: mpsc::UnboundedReceiver<IdentityChange>,
    backlog: VecDeque<IdentityChange>,
}

impl Inbox {
    async fn next(&mut self) -> Option<IdentityChange> {
        match self.backlog.pop_front() {
            Some(change) => Some(change),
            None => self.changes.recv().await,
        }
    }

    fn hold(&mut self, store: &SessionStore, change: IdentityChange) {
        store.observe(change.revision);
        self.backlog.push_back(change);
    }

    /// Observe everything already delivered.
    fn drain(&mut self, store: &SessionStore) {
        while let Ok(change) = self.changes.try_recv() {
            self.hold(store, change);
        }
    }
}

/// Handle to the session store. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl core::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionStore").field("snapshot", &self.snapshot()).finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityProvider>, profiles: ProfileDirectory, init_timeout: Duration) -> Self {
        let core = Core {
            state: SessionState::Uninitialized,
            last_error: None,
            generation: 0,
            seq: 0,
            latest_revision: 0,
            committed_revision: None,
            initialized: false,
        };
        let (latest, _) = watch::channel(core.snapshot());
        Self {
            inner: Arc::new(Inner {
                identity,
                profiles,
                init_timeout,
                core: RwLock::new(core),
                bus: InMemoryEventBus::new(),
                latest,
                task: Mutex::new(None),
            }),
        }
    }

    // ---- reads ---------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        match self.inner.core.read() {
            Ok(core) => core.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.snapshot().state
    }

    /// Pure in-memory read; never performs IO.
    pub fn current_role(&self) -> Option<Role> {
        self.inner.core.read().ok().and_then(|c| c.state.role())
    }

    pub fn principal(&self) -> Option<Principal> {
        self.inner.core.read().ok().and_then(|c| c.state.principal().cloned())
    }

    pub fn profile(&self) -> Option<Profile> {
        self.inner.core.read().ok().and_then(|c| c.state.profile().cloned())
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.inner.core.read().ok().and_then(|c| c.last_error.clone())
    }

    pub fn generation(&self) -> u64 {
        self.inner.core.read().map(|c| c.generation).unwrap_or(u64::MAX)
    }

    // ---- observers -----------------------------------------------------

    /// Register a listener called synchronously on every committed change.
    pub fn listen(&self, listener: Listener<SessionSnapshot>) -> ListenerId {
        self.inner.bus.listen(listener)
    }

    pub fn unlisten(&self, id: ListenerId) -> bool {
        self.inner.bus.unlisten(id)
    }

    pub fn subscribe(&self) -> Subscription<SessionSnapshot> {
        self.inner.bus.subscribe()
    }

    // ---- commits -------------------------------------------------------

    /// Apply `mutate` under the write lock and publish if it reports a change.
    fn commit(&self, mutate: impl FnOnce(&mut Core) -> bool) -> bool {
        let snapshot = {
            let Ok(mut core) = self.inner.core.write() else {
                tracing::error!("session state lock poisoned; change dropped");
                return false;
            };
            if !mutate(&mut core) {
                return false;
            }
            core.seq += 1;
            core.snapshot()
        };
        tracing::debug!(seq = snapshot.seq, generation = snapshot.generation, "session changed");
        self.inner.latest.send_replace(snapshot.clone());
        if let Err(e) = self.inner.bus.publish(snapshot) {
            tracing::error!(error = ?e, "failed to publish session change");
        }
        true
    }

    fn observe(&self, revision: u64) -> bool {
        self.inner.core.write().map(|mut c| c.observe(revision)).unwrap_or(false)
    }

    fn accepts(&self, revision: u64) -> bool {
        self.inner.core.read().map(|c| c.accepts(revision)).unwrap_or(false)
    }

    /// Commit an authenticated session for `revision` unless superseded.
    fn commit_authenticated(
        &self,
        revision: u64,
        principal: Principal,
        profile: Option<Profile>,
        error: Option<SessionError>,
    ) -> bool {
        self.commit(|core| {
            if !core.accepts(revision) {
                return false;
            }
            core.committed_revision = Some(revision);
            core.set_state(SessionState::Authenticated { principal, profile });
            core.last_error = error;
            true
        })
    }

    fn commit_anonymous(&self, revision: Option<u64>, error: Option<SessionError>) -> bool {
        self.commit(|core| {
            if let Some(rev) = revision {
                if !core.accepts(rev) {
                    return false;
                }
                core.committed_revision = Some(rev);
            }
            core.set_state(SessionState::Anonymous);
            core.last_error = error;
            true
        })
    }

    /// Fetch and classify the profile of `id`. Every failure yields no role.
    async fn resolve_profile(&self, id: PrincipalId) -> (Option<Profile>, Option<SessionError>) {
        match self.inner.profiles.fetch_profile(id).await {
            Ok(profile) if profile.id == id => (Some(profile), None),
            Ok(_) => {
                let err = ProfileFetchError::Malformed("profile belongs to another principal".into());
                (None, Some(err.into()))
            }
            Err(e) => {
                tracing::warn!(principal = %id, error = %e, "profile unavailable; session has no role");
                (None, Some(e.into()))
            }
        }
    }

    // ---- lifecycle -----------------------------------------------------

    /// Start mirroring the identity provider. Returns immediately; the state
    /// is `Loading` until the first identity notification arrives or the
    /// initialization timeout elapses (then `Anonymous`).
    ///
    /// Calling it again is a no-op. Must be called within a tokio runtime.
    pub fn initialize(&self) {
        let started = self.commit(|core| {
            if core.initialized {
                return false;
            }
            core.initialized = true;
            core.state = SessionState::Loading;
            true
        });
        if !started {
            return;
        }

        let changes = self.inner.identity.subscribe();
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(rt) => rt.spawn(self.clone().run(changes)),
            Err(e) => {
                tracing::error!(error = %e, "session store initialized outside a tokio runtime");
                self.commit_anonymous(None, Some(AuthError::unknown("no async runtime").into()));
                return;
            }
        };
        if let Ok(mut task) = self.inner.task.lock() {
            *task = Some(handle);
        }
        tracing::info!("session store initialized");
    }

    async fn run(self, changes: mpsc::UnboundedReceiver<IdentityChange>) {
        let mut inbox = Inbox {
            changes,
            backlog: VecDeque::new(),
        };
        match tokio::time::timeout(self.inner.init_timeout, inbox.next()).await {
            Ok(Some(change)) => self.apply_change(change, &mut inbox).await,
            Ok(None) => {
                tracing::warn!("identity provider closed its notification stream");
                self.settle_anonymous(AuthError::unknown("identity provider unavailable"));
                return;
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.inner.init_timeout.as_millis() as u64, "no initial session; continuing anonymous");
                self.settle_anonymous(AuthError::network("identity provider did not respond"));
            }
        }
        while let Some(change) = inbox.next().await {
            self.apply_change(change, &mut inbox).await;
        }
        tracing::debug!("identity notification stream ended");
    }

    /// Leave `Loading` for `Anonymous`; a session established meanwhile stays.
    fn settle_anonymous(&self, error: AuthError) {
        self.commit(|core| {
            if !core.state.is_pending() {
                return false;
            }
            core.set_state(SessionState::Anonymous);
            core.last_error = Some(error.into());
            true
        });
    }

    async fn apply_change(&self, change: IdentityChange, inbox: &mut Inbox) {
        let IdentityChange {
            revision,
            kind,
            principal,
        } = change;
        if !self.observe(revision) {
            tracing::debug!(revision, ?kind, "ignoring stale identity change");
            return;
        }
        match principal {
            None => {
                let error = (kind == IdentityEventKind::SessionExpired).then(|| AuthError::SessionExpired.into());
                if self.commit_anonymous(Some(revision), error) {
                    tracing::info!(?kind, "signed out");
                }
            }
            Some(principal) => {
                if !self.accepts(revision) {
                    return;
                }
                let current = self.snapshot().state;
                let same_user = current.principal_id() == Some(principal.id);
                if kind == IdentityEventKind::TokenRefreshed && same_user {
                    let profile = current.profile().cloned();
                    let error = self.last_error();
                    self.commit_authenticated(revision, principal, profile, error);
                    return;
                }
                let id = principal.id;
                let fetch = self.resolve_profile(id);
                tokio::pin!(fetch);
                let (profile, error) = loop {
                    tokio::select! {
                        biased;
                        Some(next) = inbox.changes.recv() => {
                            inbox.hold(self, next);
                            if !self.accepts(revision) {
                                tracing::debug!(principal = %id, revision, "profile fetch superseded");
                                return;
                            }
                        }
                        resolved = &mut fetch => break resolved,
                    }
                };
                inbox.drain(self);
                if self.commit_authenticated(revision, principal, profile, error) {
                    tracing::info!(principal = %id, ?kind, "session established");
                }
            }
        }
    }

    /// Wait until the initial session is known. Returns at once when
    /// `initialize` was never called.
    pub async fn settled(&self) -> SessionState {
        let mut latest = self.inner.latest.subscribe();
        let initialized = self.inner.core.read().map(|c| c.initialized).unwrap_or(false);
        if !initialized {
            return self.state();
        }
        match latest.wait_for(|snap| !snap.state.is_pending()).await {
            Ok(snap) => snap.state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Stop listening to the provider and drop every observer.
    pub fn dispose(&self) {
        if let Ok(mut task) = self.inner.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
        self.inner.bus.clear();
        tracing::info!("session store disposed");
    }

    // ---- operations ----------------------------------------------------

    /// Authenticate, then resolve the profile; the session becomes
    /// `Authenticated` with both in one step.
    ///
    /// On failure the state is left as it was and the error is returned
    /// (and recorded as `last_error`).
    pub async fn sign_in(&self, email: &str, secret: &str) -> Result<Principal, AuthError> {
        let signed = match self.inner.identity.sign_in(email, secret).await {
            Ok(s) => s,
            Err(e) => {
                tracing::info!(error = %e, "sign-in rejected");
                let recorded = SessionError::Auth(e.clone());
                self.commit(|core| {
                    core.last_error = Some(recorded);
                    true
                });
                return Err(e);
            }
        };
        let revision = signed.revision;
        let principal = signed.principal;
        if !self.observe(revision) {
            return Err(AuthError::unknown("sign-in superseded by a newer session change"));
        }

        let (profile, error) = self.resolve_profile(principal.id).await;
        if self.commit_authenticated(revision, principal.clone(), profile, error) {
            tracing::info!(principal = %principal.id, "signed in");
            return Ok(principal);
        }
        // Either the notification path committed this same sign-in first, or
        // a newer change (sign-out, expiry) won.
        if self.snapshot().state.principal_id() == Some(principal.id) {
            Ok(principal)
        } else {
            Err(AuthError::unknown("sign-in superseded by a newer session change"))
        }
    }

    /// End the session. On success principal and profile are cleared together
    /// and every listener has observed it before this returns. On failure the
    /// session stays and the error is recorded as `last_error`.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let revision = match self.inner.identity.sign_out().await {
            Ok(revision) => revision,
            Err(e) => {
                tracing::warn!(error = %e, "sign-out failed");
                let recorded = SessionError::Auth(e.clone());
                self.commit(|core| {
                    core.last_error = Some(recorded);
                    true
                });
                return Err(e);
            }
        };
        self.observe(revision);
        self.commit_anonymous(Some(revision), None);
        tracing::info!("signed out");
        Ok(())
    }

    /// End the session if its validity window has passed.
    pub fn check_expiry(&self, now: DateTime<Utc>) -> bool {
        let expired = self.commit(|core| {
            let is_expired = core.state.principal().is_some_and(|p| p.session.is_expired(now));
            if !is_expired {
                return false;
            }
            core.set_state(SessionState::Anonymous);
            core.last_error = Some(AuthError::SessionExpired.into());
            true
        });
        if expired {
            tracing::info!("session expired");
        }
        expired
    }

    /// Re-read the current user's profile so role changes take effect now.
    pub async fn refresh_profile(&self) -> Option<Role> {
        let (principal_id, generation) = {
            let snap = self.snapshot();
            (snap.state.principal_id()?, snap.generation)
        };
        let (profile, error) = self.resolve_profile(principal_id).await;
        self.commit(|core| {
            if core.generation != generation {
                return false;
            }
            let SessionState::Authenticated { principal, .. } = &core.state else {
                return false;
            };
            let principal = principal.clone();
            core.state = SessionState::Authenticated { principal, profile };
            core.last_error = error;
            true
        });
        self.current_role()
    }

    /// Install a profile the application just wrote for the current user.
    pub fn replace_profile(&self, profile: Profile) -> bool {
        self.commit(|core| {
            let SessionState::Authenticated { principal, .. } = &core.state else {
                return false;
            };
            if principal.id != profile.id {
                return false;
            }
            let principal = principal.clone();
            core.state = SessionState::Authenticated {
                principal,
                profile: Some(profile),
            };
            true
        })
    }
}
