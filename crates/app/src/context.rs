//! Handles shared by every screen.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};

use dentalcare_auth::{Permission, Role, authorize};
use dentalcare_infra::{
    Collection, DataRequestError, IdentityProvider, ProfileDirectory, RemoteConfig, RemoteServices,
};
use dentalcare_inventory::InventoryItem;
use dentalcare_invoicing::Invoice;
use dentalcare_patients::Patient;
use dentalcare_scheduling::Appointment;

use crate::pages::settings::ClinicSettings;
use crate::router::{MountToken, Router, Screen, View};
use crate::session::SessionStore;

/// Wall-clock source; swapped out in tests.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Clone)]
pub struct AppContext {
    pub store: SessionStore,
    pub router: Router,
    pub identity: Arc<dyn IdentityProvider>,
    pub profiles: ProfileDirectory,
    pub patients: Collection<Patient>,
    pub appointments: Collection<Appointment>,
    pub invoices: Collection<Invoice>,
    pub inventory: Collection<InventoryItem>,
    pub clinic: Collection<ClinicSettings>,
    clock: Clock,
}

impl core::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppContext")
            .field("store", &self.store)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn new(services: RemoteServices, config: &RemoteConfig) -> Self {
        let profiles = ProfileDirectory::new(Arc::clone(&services.data), config.profile_retries);
        Self::with_profiles(services, profiles, config.init_timeout)
    }

    pub fn with_profiles(services: RemoteServices, profiles: ProfileDirectory, init_timeout: Duration) -> Self {
        let store = SessionStore::new(Arc::clone(&services.identity), profiles.clone(), init_timeout);
        let router = Router::new(store.clone());
        let data = services.data;
        Self {
            store,
            router,
            identity: services.identity,
            profiles,
            patients: Collection::new(Arc::clone(&data)),
            appointments: Collection::new(Arc::clone(&data)),
            invoices: Collection::new(Arc::clone(&data)),
            inventory: Collection::new(Arc::clone(&data)),
            clinic: Collection::new(data),
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> NaiveDateTime {
        (self.clock)()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }

    pub fn role(&self) -> Option<Role> {
        self.store.current_role()
    }

    /// Client-side permission check run before a request is issued.
    pub fn require(&self, permission: Permission) -> Result<(), DataRequestError> {
        authorize(self.role(), permission).map_err(|e| {
            tracing::debug!(%permission, error = %e, "request refused client-side");
            DataRequestError::Forbidden(e.to_string())
        })
    }

    /// Navigate to `screen`; the mount token if it is the one shown.
    pub fn open(&self, screen: Screen) -> Result<MountToken, View> {
        let view = self.router.navigate(screen.path());
        match view.mount() {
            Some(mount) if mount.screen == screen => Ok(mount),
            _ => Err(view),
        }
    }

    pub fn is_current(&self, mount: &MountToken) -> bool {
        self.router.is_current(mount)
    }

    pub fn dispose(&self) {
        self.router.dispose();
        self.store.dispose();
    }
}
