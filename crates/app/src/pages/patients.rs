use dentalcare_auth::Permission;
use dentalcare_infra::{DataRequestError, Query};
use dentalcare_patients::{Patient, PatientDraft, PatientId};

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::{ensure_mounted, load_into};

const SEARCH_COLUMNS: [&str; 3] = ["full_name", "email", "phone"];

/// Patient list with search and the create/edit form actions.
#[derive(Debug)]
pub struct PatientsPage {
    ctx: AppContext,
    mount: MountToken,
    search: String,
    slot: ScreenSlot<Vec<Patient>>,
}

impl PatientsPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            search: String::new(),
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<Vec<Patient>> {
        self.slot.state()
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Newest first, filtered by the search term.
    pub async fn load(&self) -> ScreenState<Vec<Patient>> {
        let query = Query::new()
            .search(&SEARCH_COLUMNS, &self.search)
            .order_by("created_at", false);
        let fetch = async {
            self.ctx.require(Permission::ViewClinical)?;
            self.ctx.patients.list(&query).await
        };
        load_into(&self.ctx, &self.mount, &self.slot, fetch).await
    }

    pub async fn retry(&self) -> ScreenState<Vec<Patient>> {
        self.load().await
    }

    pub async fn create(&self, draft: PatientDraft) -> Result<Patient, DataRequestError> {
        self.ctx.require(Permission::ManagePatients)?;
        let creator = self
            .ctx
            .store
            .principal()
            .ok_or_else(|| DataRequestError::Forbidden("not signed in".into()))?;
        let patient = Patient::create(draft, creator.id, self.ctx.today())?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.patients.insert(&patient).await?;
        tracing::info!(patient = %stored.id, "patient registered");
        self.load().await;
        Ok(stored)
    }

    pub async fn update(&self, id: PatientId, draft: PatientDraft) -> Result<Patient, DataRequestError> {
        self.ctx.require(Permission::ManagePatients)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let current = self.ctx.patients.get(&id).await?;
        let revised = current.revise(draft, self.ctx.today())?;
        let stored = self.ctx.patients.save(&revised).await?;
        self.load().await;
        Ok(stored)
    }

    pub async fn delete(&self, id: PatientId) -> Result<(), DataRequestError> {
        self.ctx.require(Permission::DeleteRecords)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        self.ctx.patients.delete(&id).await?;
        tracing::info!(patient = %id, "patient deleted");
        self.load().await;
        Ok(())
    }
}
