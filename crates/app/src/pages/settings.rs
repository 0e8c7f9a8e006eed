use serde::{Deserialize, Serialize};

use dentalcare_auth::{Permission, Profile, ProfileUpdate};
use dentalcare_core::{DomainError, Entity, Record, record_id};
use dentalcare_infra::{DataRequestError, Query};

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::{ensure_mounted, load_into};

record_id!(ClinicId, "ClinicId");

/// The single row of the `cabinet` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicSettings {
    pub id: ClinicId,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, rename = "postal")]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Entity for ClinicSettings {
    type Id = ClinicId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for ClinicSettings {
    const TABLE: &'static str = "cabinet";
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicDraft {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ClinicDraft {
    pub fn into_settings(self, id: ClinicId) -> Result<ClinicSettings, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("clinic name cannot be empty"));
        }
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let email = trim(self.email).map(|e| e.to_lowercase());
        if email.as_deref().is_some_and(|e| !e.contains('@')) {
            return Err(DomainError::validation("invalid email format"));
        }
        Ok(ClinicSettings {
            id,
            name,
            address: trim(self.address),
            city: trim(self.city),
            postal_code: trim(self.postal_code),
            phone: trim(self.phone),
            email,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsView {
    /// The signed-in user's own profile.
    pub profile: Option<Profile>,
    /// `None` until the clinic row is first saved.
    pub clinic: Option<ClinicSettings>,
}

#[derive(Debug)]
pub struct SettingsPage {
    ctx: AppContext,
    mount: MountToken,
    slot: ScreenSlot<SettingsView>,
}

impl SettingsPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<SettingsView> {
        self.slot.state()
    }

    pub async fn load(&self) -> ScreenState<SettingsView> {
        let fetch = async {
            let clinic = self.fetch_clinic().await?;
            Ok(SettingsView {
                profile: self.ctx.store.profile(),
                clinic,
            })
        };
        load_into(&self.ctx, &self.mount, &self.slot, fetch).await
    }

    pub async fn retry(&self) -> ScreenState<SettingsView> {
        self.load().await
    }

    async fn fetch_clinic(&self) -> Result<Option<ClinicSettings>, DataRequestError> {
        let rows = self.ctx.clinic.list(&Query::new().limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Rename the signed-in user; the session shows the new name at once.
    pub async fn rename_self(&self, full_name: &str) -> Result<Profile, DataRequestError> {
        let actor = self
            .ctx
            .store
            .profile()
            .ok_or_else(|| DataRequestError::Forbidden("no profile for the current session".into()))?;
        let update = ProfileUpdate {
            full_name: Some(full_name.trim().to_string()),
            role: None,
        };
        update.check(Some(&actor), actor.id)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.profiles.update(actor.id, &update).await?;
        let profile = match Profile::try_from(stored) {
            Ok(profile) => profile,
            Err(e) => return Err(DataRequestError::parse(e.to_string())),
        };
        self.ctx.store.replace_profile(profile.clone());
        self.load().await;
        Ok(profile)
    }

    /// Update the clinic row if one exists, otherwise create it.
    pub async fn save_clinic(&self, draft: ClinicDraft) -> Result<ClinicSettings, DataRequestError> {
        self.ctx.require(Permission::ManageSettings)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = match self.fetch_clinic().await? {
            Some(existing) => {
                let settings = draft.into_settings(existing.id)?;
                self.ctx.clinic.save(&settings).await?
            }
            None => {
                let settings = draft.into_settings(ClinicId::new())?;
                self.ctx.clinic.insert(&settings).await?
            }
        };
        tracing::info!(clinic = %stored.id, "clinic settings saved");
        self.load().await;
        Ok(stored)
    }
}
