//! Staff accounts (admin-only screen).

use serde::Serialize;
use thiserror::Error;

use dentalcare_auth::{AuthError, NewAccount, Permission, PrincipalId, Profile, ProfileRow, ProfileUpdate, Role};
use dentalcare_core::DomainError;
use dentalcare_infra::DataRequestError;

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::{ensure_mounted, load_into};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserAdminError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Data(#[from] DataRequestError),
}

impl From<DomainError> for UserAdminError {
    fn from(e: DomainError) -> Self {
        Self::Data(e.into())
    }
}

/// Accounts per role; rows with an unrecognized role count as unassigned.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub admin: usize,
    pub dentist: usize,
    pub assistant: usize,
    pub unassigned: usize,
}

impl RoleCounts {
    pub fn of<'a>(rows: impl IntoIterator<Item = &'a ProfileRow>) -> Self {
        rows.into_iter().fold(Self::default(), |mut acc, row| {
            match row.role() {
                Some(Role::Admin) => acc.admin += 1,
                Some(Role::Dentist) => acc.dentist += 1,
                Some(Role::Assistant) => acc.assistant += 1,
                None => acc.unassigned += 1,
            }
            acc
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserBoard {
    /// Newest first.
    pub users: Vec<ProfileRow>,
    pub counts: RoleCounts,
}

#[derive(Debug)]
pub struct UsersPage {
    ctx: AppContext,
    mount: MountToken,
    search: String,
    slot: ScreenSlot<UserBoard>,
}

impl UsersPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            search: String::new(),
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<UserBoard> {
        self.slot.state()
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub async fn load(&self) -> ScreenState<UserBoard> {
        let fetch = async {
            self.ctx.require(Permission::ManageUsers)?;
            let users = self.ctx.profiles.list(&self.search).await?;
            Ok(UserBoard {
                counts: RoleCounts::of(&users),
                users,
            })
        };
        load_into(&self.ctx, &self.mount, &self.slot, fetch).await
    }

    pub async fn retry(&self) -> ScreenState<UserBoard> {
        self.load().await
    }

    /// Register the identity, then write its profile row.
    pub async fn create(&self, account: NewAccount) -> Result<Profile, UserAdminError> {
        self.ctx.require(Permission::ManageUsers)?;
        let account = account.validated()?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let id = self.ctx.identity.create_account(&account.email, &account.password).await?;
        let profile = Profile {
            id,
            full_name: account.full_name,
            email: account.email,
            role: account.role,
        };
        if let Err(e) = self.ctx.profiles.insert(&profile).await {
            tracing::warn!(principal = %id, error = %e, "identity created but profile insert failed");
            return Err(e.into());
        }
        tracing::info!(principal = %id, role = %profile.role, "user provisioned");
        self.load().await;
        Ok(profile)
    }

    /// Edit name or role. Editing oneself takes effect on the session at once.
    pub async fn update(&self, id: PrincipalId, update: ProfileUpdate) -> Result<ProfileRow, UserAdminError> {
        if update.is_empty() {
            return Err(DomainError::validation("nothing to update").into());
        }
        let actor = self.ctx.store.profile();
        update.check(actor.as_ref(), id)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.profiles.update(id, &update).await?;
        tracing::info!(principal = %id, "profile updated");
        if actor.is_some_and(|a| a.id == id) {
            self.ctx.store.refresh_profile().await;
        }
        self.load().await;
        Ok(stored)
    }

    pub async fn delete(&self, id: PrincipalId) -> Result<(), UserAdminError> {
        self.ctx.require(Permission::ManageUsers)?;
        if self.ctx.store.state().principal_id() == Some(id) {
            return Err(DomainError::validation("you cannot delete your own account").into());
        }
        ensure_mounted(&self.ctx, &self.mount)?;
        self.ctx.profiles.delete(id).await?;
        tracing::info!(principal = %id, "profile deleted");
        self.load().await;
        Ok(())
    }
}
