mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;

use dentalcare_app::{Screen, SessionError, SessionSnapshot, SessionState, SessionStore, View};
use dentalcare_auth::profile::PROFILES_TABLE;
use dentalcare_auth::{AuthError, PrincipalId, ProfileFetchError, Role};
use dentalcare_infra::{
    DataService, IdentityChange, IdentityProvider, InMemoryIdentityProvider, ProfileDirectory, SignedIn,
};

use common::{ADMIN, ASSISTANT, Clinic, DENTIST, NO_PROFILE, ODD_ROLE, Options, wait_for};

#[tokio::test]
async fn initialize_loads_then_settles_anonymous() {
    let clinic = Clinic::new();
    assert_eq!(clinic.store().state(), SessionState::Uninitialized);

    clinic.store().initialize();
    assert_eq!(clinic.store().state(), SessionState::Loading);

    assert_eq!(clinic.store().settled().await, SessionState::Anonymous);
    assert_eq!(clinic.store().last_error(), None);
}

#[tokio::test]
async fn initialize_twice_is_a_no_op() {
    let clinic = Clinic::new();
    clinic.sign_in_as(ADMIN).await;
    let before = clinic.store().snapshot();
    clinic.store().initialize();
    assert_eq!(clinic.store().snapshot(), before);
}

#[tokio::test]
async fn silent_provider_times_out_to_anonymous_and_keeps_listening() {
    let clinic = Clinic::with(Options {
        identity: InMemoryIdentityProvider::unresponsive(),
        init_timeout: Duration::from_millis(50),
        ..Options::default()
    });
    assert_eq!(clinic.start().await, SessionState::Anonymous);
    assert!(matches!(
        clinic.store().last_error(),
        Some(SessionError::Auth(AuthError::NetworkFailure(_)))
    ));

    // A later external sign-in still reaches the store.
    clinic.idp.sign_in(DENTIST.0, DENTIST.1).await.unwrap();
    let snap = wait_for(clinic.store(), |s| s.role() == Some(Role::Dentist)).await;
    assert_eq!(snap.last_error, None);
}

#[tokio::test]
async fn existing_provider_session_is_restored_on_initialize() {
    let clinic = Clinic::new();
    clinic.idp.sign_in(ASSISTANT.0, ASSISTANT.1).await.unwrap();
    let state = clinic.start().await;
    assert_eq!(state.principal_id(), Some(clinic.assistant));
    assert_eq!(state.role(), Some(Role::Assistant));
}

#[tokio::test]
async fn admin_sign_in_resolves_principal_and_profile_together() {
    let clinic = Clinic::new();
    clinic.start().await;

    let seen: Arc<Mutex<Vec<SessionSnapshot>>> = Arc::default();
    let sink = Arc::clone(&seen);
    clinic
        .store()
        .listen(Arc::new(move |s: &SessionSnapshot| sink.lock().unwrap().push(s.clone())));

    let principal = clinic.store().sign_in(ADMIN.0, ADMIN.1).await.unwrap();
    assert_eq!(principal.id, clinic.admin);
    assert_eq!(clinic.store().current_role(), Some(Role::Admin));
    assert_eq!(clinic.store().profile().unwrap().full_name, "Dr. Martin Dubois");

    // No observer ever saw the principal without its profile.
    for snap in seen.lock().unwrap().iter() {
        if snap.state.is_authenticated() {
            assert_eq!(snap.role(), Some(Role::Admin));
        }
    }
}

#[tokio::test]
async fn unknown_email_is_invalid_credentials_and_stays_anonymous() {
    let clinic = Clinic::new();
    clinic.start().await;

    let err = clinic.store().sign_in("nobody@clinic.test", "x").await.unwrap_err();
    assert_eq!(err, AuthError::InvalidCredentials);
    assert_eq!(clinic.store().state(), SessionState::Anonymous);
    assert_eq!(
        clinic.store().last_error(),
        Some(SessionError::Auth(AuthError::InvalidCredentials))
    );
}

#[tokio::test]
async fn provider_outage_during_sign_in_leaves_state_unchanged() {
    let clinic = Clinic::new();
    clinic.sign_in_as(DENTIST).await;
    let before = clinic.store().state();

    clinic.idp.set_offline(true);
    let err = clinic.store().sign_in(ADMIN.0, ADMIN.1).await.unwrap_err();
    assert!(matches!(err, AuthError::NetworkFailure(_)));
    assert_eq!(clinic.store().state(), before);
}

#[tokio::test]
async fn missing_profile_yields_no_role() {
    let clinic = Clinic::new();
    clinic.sign_in_as(NO_PROFILE).await;

    let snap = clinic.store().snapshot();
    assert!(snap.state.is_authenticated());
    assert_eq!(snap.role(), None);
    assert_eq!(snap.last_error, Some(SessionError::Profile(ProfileFetchError::NotFound)));
    assert!(matches!(
        clinic.ctx.router.navigate(Screen::UserManagement.path()),
        View::AccessDenied { .. }
    ));
}

#[tokio::test]
async fn unrecognized_role_is_rejected_not_defaulted() {
    let clinic = Clinic::new();
    clinic.sign_in_as(ODD_ROLE).await;
    assert_eq!(clinic.store().current_role(), None);
    assert!(matches!(
        clinic.store().last_error(),
        Some(SessionError::Profile(ProfileFetchError::Malformed(_)))
    ));
}

#[tokio::test]
async fn unreachable_profiles_degrade_after_retries() {
    let clinic = Clinic::new();
    clinic.start().await;
    clinic.data.set_offline(true);

    clinic.store().sign_in(ADMIN.0, ADMIN.1).await.unwrap();
    assert_eq!(clinic.store().current_role(), None);
    assert!(matches!(
        clinic.store().last_error(),
        Some(SessionError::Profile(ProfileFetchError::NetworkFailure(_)))
    ));
    // At least the first attempt and one retry.
    assert!(clinic.data.request_count() >= 2);

    clinic.data.set_offline(false);
    assert_eq!(clinic.store().refresh_profile().await, Some(Role::Admin));
    assert_eq!(clinic.store().last_error(), None);
}

#[tokio::test]
async fn sign_out_is_observed_before_it_returns() {
    let clinic = Clinic::new();
    clinic.sign_in_as(ADMIN).await;
    clinic.open(Screen::Patients);

    let seen: Arc<Mutex<Vec<SessionSnapshot>>> = Arc::default();
    let sink = Arc::clone(&seen);
    clinic
        .store()
        .listen(Arc::new(move |s: &SessionSnapshot| sink.lock().unwrap().push(s.clone())));

    clinic.store().sign_out().await.unwrap();

    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.state, SessionState::Anonymous);
    assert_eq!(clinic.ctx.router.location(), Some(Screen::Login));
    for snap in seen.lock().unwrap().iter() {
        // Principal and profile are never cleared separately.
        assert!(snap.state == SessionState::Anonymous || snap.role() == Some(Role::Admin));
    }
}

#[tokio::test]
async fn signing_in_twice_is_idempotent() {
    let clinic = Clinic::new();
    clinic.sign_in_as(DENTIST).await;
    let first = clinic.store().snapshot();

    clinic.store().sign_in(DENTIST.0, DENTIST.1).await.unwrap();
    let second = clinic.store().snapshot();

    assert_eq!(second.state.principal_id(), first.state.principal_id());
    assert_eq!(second.state.profile(), first.state.profile());
    assert_eq!(second.generation, first.generation);
    assert_eq!(second.last_error, None);
}

#[tokio::test]
async fn switching_user_bumps_generation() {
    let clinic = Clinic::new();
    clinic.sign_in_as(DENTIST).await;
    let first = clinic.store().generation();
    clinic.store().sign_in(ASSISTANT.0, ASSISTANT.1).await.unwrap();
    assert!(clinic.store().generation() > first);
    assert_eq!(clinic.store().current_role(), Some(Role::Assistant));
}

#[tokio::test]
async fn role_downgrade_revokes_admin_screen_without_navigation() {
    let clinic = Clinic::new();
    clinic.sign_in_as(ADMIN).await;
    assert!(matches!(
        clinic.ctx.router.navigate(Screen::UserManagement.path()),
        View::Screen { .. }
    ));

    clinic
        .data
        .update(PROFILES_TABLE, &clinic.admin.to_string(), json!({"role": "dentist"}))
        .await
        .unwrap();
    assert_eq!(clinic.store().refresh_profile().await, Some(Role::Dentist));

    assert!(matches!(clinic.ctx.router.view(), View::AccessDenied { .. }));
}

#[tokio::test]
async fn provider_expiry_notification_signs_out() {
    let clinic = Clinic::new();
    clinic.sign_in_as(ASSISTANT).await;

    clinic.idp.expire_session();
    let snap = wait_for(clinic.store(), |s| s.state == SessionState::Anonymous).await;
    assert_eq!(snap.last_error, Some(SessionError::Auth(AuthError::SessionExpired)));
    assert_eq!(clinic.ctx.router.location(), Some(Screen::Login));
}

#[tokio::test]
async fn expired_window_is_detected_locally() {
    let clinic = Clinic::with(Options {
        identity: InMemoryIdentityProvider::new().with_session_secs(60),
        ..Options::default()
    });
    clinic.sign_in_as(DENTIST).await;

    assert!(!clinic.store().check_expiry(Utc::now()));
    assert!(clinic.store().check_expiry(Utc::now() + chrono::Duration::minutes(2)));
    assert_eq!(clinic.store().state(), SessionState::Anonymous);
    assert_eq!(
        clinic.store().last_error(),
        Some(SessionError::Auth(AuthError::SessionExpired))
    );
}

#[tokio::test]
async fn token_refresh_keeps_profile_and_generation() {
    let clinic = Clinic::with(Options {
        identity: InMemoryIdentityProvider::new().with_session_secs(60),
        ..Options::default()
    });
    clinic.sign_in_as(DENTIST).await;
    let before = clinic.store().snapshot();
    let old_expiry = clinic.store().principal().unwrap().session.expires_at;

    tokio::time::sleep(Duration::from_millis(5)).await;
    clinic.idp.refresh_session().unwrap();
    let after = wait_for(clinic.store(), |s| {
        s.state.principal().is_some_and(|p| p.session.expires_at > old_expiry)
    })
    .await;

    assert_eq!(after.generation, before.generation);
    assert_eq!(after.role(), Some(Role::Dentist));
}

#[tokio::test]
async fn profile_resolved_after_sign_out_is_discarded() {
    let clinic = Clinic::with(Options {
        profile_retries: 3,
        backoff: Duration::from_millis(30),
        ..Options::default()
    });
    clinic.start().await;
    clinic.data.set_offline(true);

    let store = clinic.store().clone();
    let pending = tokio::spawn(async move { store.sign_in(ADMIN.0, ADMIN.1).await });

    // Provider has accepted the sign-in; the profile fetch is still retrying.
    tokio::time::timeout(Duration::from_secs(1), async {
        while clinic.idp.current().is_none() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();
    clinic.store().sign_out().await.unwrap();
    clinic.data.set_offline(false);

    let outcome = pending.await.unwrap();
    assert!(matches!(outcome, Err(AuthError::Unknown(_))));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(clinic.store().state(), SessionState::Anonymous);
}

#[tokio::test]
async fn disposed_store_stops_following_the_provider() {
    let clinic = Clinic::new();
    clinic.start().await;
    clinic.ctx.dispose();

    clinic.idp.sign_in(ADMIN.0, ADMIN.1).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(clinic.store().state(), SessionState::Anonymous);
}

#[tokio::test]
async fn expiry_during_profile_fetch_never_publishes_the_old_session() {
    let clinic = Clinic::with(Options {
        profile_retries: 3,
        backoff: Duration::from_millis(30),
        ..Options::default()
    });
    clinic.start().await;
    clinic.data.set_offline(true);

    // Sign-in arrives as a provider notification, not through the store.
    clinic.idp.sign_in(ADMIN.0, ADMIN.1).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), async {
        while clinic.data.request_count() == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap();

    let seen: Arc<Mutex<Vec<SessionSnapshot>>> = Arc::default();
    let sink = Arc::clone(&seen);
    clinic
        .store()
        .listen(Arc::new(move |s: &SessionSnapshot| sink.lock().unwrap().push(s.clone())));

    clinic.idp.expire_session();
    clinic.data.set_offline(false);

    wait_for(clinic.store(), |s| {
        s.last_error == Some(SessionError::Auth(AuthError::SessionExpired))
    })
    .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(clinic.store().state(), SessionState::Anonymous);
    for snap in seen.lock().unwrap().iter() {
        assert!(snap.state.principal().is_none(), "expired session was published: {snap:?}");
    }
}

#[tokio::test]
async fn failed_sign_out_is_recorded_and_keeps_the_session() {
    let clinic = Clinic::new();
    clinic.sign_in_as(DENTIST).await;
    clinic.idp.set_offline(true);

    let outcome = clinic.store().sign_out().await;
    assert!(matches!(outcome, Err(AuthError::NetworkFailure(_))));
    assert_eq!(clinic.store().current_role(), Some(Role::Dentist));
    assert!(matches!(
        clinic.store().last_error(),
        Some(SessionError::Auth(AuthError::NetworkFailure(_)))
    ));
}

/// Provider whose notification stream stays silent until the test closes it.
struct ClosableIdentity {
    inner: Arc<InMemoryIdentityProvider>,
    sender: Mutex<Option<mpsc::UnboundedSender<IdentityChange>>>,
}

impl ClosableIdentity {
    fn close(&self) {
        self.sender.lock().unwrap().take();
    }
}

#[async_trait]
impl IdentityProvider for ClosableIdentity {
    async fn sign_in(&self, email: &str, secret: &str) -> Result<SignedIn, AuthError> {
        self.inner.sign_in(email, secret).await
    }

    async fn sign_out(&self) -> Result<u64, AuthError> {
        self.inner.sign_out().await
    }

    async fn create_account(&self, email: &str, secret: &str) -> Result<PrincipalId, AuthError> {
        self.inner.create_account(email, secret).await
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<IdentityChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap() = Some(tx);
        rx
    }
}

#[tokio::test]
async fn closed_stream_keeps_a_session_established_meanwhile() {
    let clinic = Clinic::new();
    let identity = Arc::new(ClosableIdentity {
        inner: Arc::clone(&clinic.idp),
        sender: Mutex::new(None),
    });
    let data: Arc<dyn DataService> = clinic.data.clone();
    let store = SessionStore::new(identity.clone(), ProfileDirectory::new(data, 0), Duration::from_secs(5));

    store.initialize();
    assert_eq!(store.state(), SessionState::Loading);
    store.sign_in(DENTIST.0, DENTIST.1).await.unwrap();
    assert_eq!(store.current_role(), Some(Role::Dentist));

    identity.close();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.current_role(), Some(Role::Dentist));
    assert_eq!(store.last_error(), None);
}

#[tokio::test]
async fn closed_stream_before_any_session_settles_anonymous() {
    let clinic = Clinic::new();
    let identity = Arc::new(ClosableIdentity {
        inner: Arc::clone(&clinic.idp),
        sender: Mutex::new(None),
    });
    let data: Arc<dyn DataService> = clinic.data.clone();
    let store = SessionStore::new(identity.clone(), ProfileDirectory::new(data, 0), Duration::from_secs(5));

    store.initialize();
    identity.close();

    let state = tokio::time::timeout(Duration::from_secs(1), store.settled()).await.unwrap();
    assert_eq!(state, SessionState::Anonymous);
    assert!(matches!(store.last_error(), Some(SessionError::Auth(AuthError::Unknown(_)))));
}

#[tokio::test]
async fn settled_wakes_on_the_timeout_commit() {
    let clinic = Clinic::with(Options {
        identity: InMemoryIdentityProvider::unresponsive(),
        init_timeout: Duration::from_millis(50),
        ..Options::default()
    });
    clinic.store().initialize();
    let state = tokio::time::timeout(Duration::from_secs(1), clinic.store().settled())
        .await
        .unwrap();
    assert_eq!(state, SessionState::Anonymous);
}

#[tokio::test]
async fn settled_without_initialize_returns_immediately() {
    let clinic = Clinic::new();
    let state = tokio::time::timeout(Duration::from_millis(100), clinic.store().settled())
        .await
        .unwrap();
    assert_eq!(state, SessionState::Uninitialized);
}
