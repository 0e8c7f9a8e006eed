#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;

use dentalcare_app::{AppContext, MountToken, Screen, SessionSnapshot, SessionState, SessionStore};
use dentalcare_auth::PrincipalId;
use dentalcare_auth::profile::PROFILES_TABLE;
use dentalcare_infra::{InMemoryDataService, InMemoryIdentityProvider, ProfileDirectory, RemoteServices};

pub const ADMIN: (&str, &str) = ("admin@clinic.test", "pw-admin");
pub const DENTIST: (&str, &str) = ("dentist@clinic.test", "pw-dentist");
pub const ASSISTANT: (&str, &str) = ("assistant@clinic.test", "pw-assistant");
/// Has an identity but no profile row.
pub const NO_PROFILE: (&str, &str) = ("ghost@clinic.test", "pw-ghost");
/// Profile row carries a role outside the known set.
pub const ODD_ROLE: (&str, &str) = ("odd@clinic.test", "pw-odd");

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

pub fn now() -> NaiveDateTime {
    today().and_hms_opt(10, 0, 0).unwrap()
}

pub struct Clinic {
    pub idp: Arc<InMemoryIdentityProvider>,
    pub data: Arc<InMemoryDataService>,
    pub ctx: AppContext,
    pub admin: PrincipalId,
    pub dentist: PrincipalId,
    pub assistant: PrincipalId,
}

pub struct Options {
    pub identity: InMemoryIdentityProvider,
    pub init_timeout: Duration,
    pub profile_retries: u32,
    pub backoff: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            identity: InMemoryIdentityProvider::new(),
            init_timeout: Duration::from_millis(500),
            profile_retries: 1,
            backoff: Duration::from_millis(1),
        }
    }
}

impl Clinic {
    pub fn new() -> Self {
        Self::with(Options::default())
    }

    pub fn with(options: Options) -> Self {
        let idp = Arc::new(options.identity);
        let data = Arc::new(InMemoryDataService::new());

        let admin = idp.add_account(ADMIN.0, ADMIN.1);
        let dentist = idp.add_account(DENTIST.0, DENTIST.1);
        let assistant = idp.add_account(ASSISTANT.0, ASSISTANT.1);
        idp.add_account(NO_PROFILE.0, NO_PROFILE.1);
        let odd = idp.add_account(ODD_ROLE.0, ODD_ROLE.1);

        data.seed(
            PROFILES_TABLE,
            [
                profile_row(admin, "Dr. Martin Dubois", ADMIN.0, "admin", "2024-01-02T09:00:00Z"),
                profile_row(dentist, "Dr. Amal Idrissi", DENTIST.0, "dentist", "2024-02-03T09:00:00Z"),
                profile_row(assistant, "Nora Benali", ASSISTANT.0, "assistant", "2024-03-04T09:00:00Z"),
                profile_row(odd, "Odd Role", ODD_ROLE.0, "superuser", "2024-04-05T09:00:00Z"),
            ],
        );

        let services = RemoteServices::in_memory(Arc::clone(&idp), Arc::clone(&data));
        let profiles = ProfileDirectory::new(Arc::clone(&services.data), options.profile_retries)
            .with_backoff(options.backoff);
        let ctx = AppContext::with_profiles(services, profiles, options.init_timeout).with_clock(now);

        Self {
            idp,
            data,
            ctx,
            admin,
            dentist,
            assistant,
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.ctx.store
    }

    /// Initialize the store and wait for the first session state.
    pub async fn start(&self) -> SessionState {
        self.ctx.store.initialize();
        self.ctx.store.settled().await
    }

    pub async fn sign_in_as(&self, account: (&str, &str)) {
        self.start().await;
        self.ctx.store.sign_in(account.0, account.1).await.unwrap();
    }

    pub fn open(&self, screen: Screen) -> MountToken {
        self.ctx
            .open(screen)
            .unwrap_or_else(|view| panic!("{screen:?} did not render: {view:?}"))
    }
}

pub fn profile_row(id: PrincipalId, name: &str, email: &str, role: &str, created_at: &str) -> serde_json::Value {
    json!({
        "id": id.to_string(),
        "full_name": name,
        "email": email,
        "role": role,
        "created_at": created_at,
    })
}

/// Poll the store until `pred` holds.
pub async fn wait_for(store: &SessionStore, pred: impl Fn(&SessionSnapshot) -> bool) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snap = store.snapshot();
            if pred(&snap) {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("store never reached the expected state")
}
