use dentalcare_auth::Permission;
use dentalcare_infra::{DataRequestError, Query};
use dentalcare_reporting::DashboardSummary;

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::load_into;

#[derive(Debug)]
pub struct DashboardPage {
    ctx: AppContext,
    mount: MountToken,
    slot: ScreenSlot<DashboardSummary>,
}

impl DashboardPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<DashboardSummary> {
        self.slot.state()
    }

    pub async fn load(&self) -> ScreenState<DashboardSummary> {
        load_into(&self.ctx, &self.mount, &self.slot, self.fetch()).await
    }

    pub async fn retry(&self) -> ScreenState<DashboardSummary> {
        self.load().await
    }

    async fn fetch(&self) -> Result<DashboardSummary, DataRequestError> {
        self.ctx.require(Permission::ViewClinical)?;
        let all = Query::new();
        let (patients, appointments, invoices, inventory) = tokio::try_join!(
            self.ctx.patients.list(&all),
            self.ctx.appointments.list(&all),
            self.ctx.invoices.list(&all),
            self.ctx.inventory.list(&all),
        )?;
        Ok(DashboardSummary::compute(
            self.ctx.now(),
            &patients,
            &appointments,
            &invoices,
            &inventory,
        ))
    }
}
