use dentalcare_auth::Permission;
use dentalcare_infra::{DataRequestError, Query};
use dentalcare_reporting::ClinicReport;

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::load_into;

#[derive(Debug)]
pub struct ReportsPage {
    ctx: AppContext,
    mount: MountToken,
    slot: ScreenSlot<ClinicReport>,
}

impl ReportsPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<ClinicReport> {
        self.slot.state()
    }

    pub async fn load(&self) -> ScreenState<ClinicReport> {
        load_into(&self.ctx, &self.mount, &self.slot, self.fetch()).await
    }

    pub async fn retry(&self) -> ScreenState<ClinicReport> {
        self.load().await
    }

    async fn fetch(&self) -> Result<ClinicReport, DataRequestError> {
        self.ctx.require(Permission::ViewReports)?;
        let all = Query::new();
        let (patients, appointments, invoices) = tokio::try_join!(
            self.ctx.patients.list(&all),
            self.ctx.appointments.list(&all),
            self.ctx.invoices.list(&all),
        )?;
        Ok(ClinicReport::compute(self.ctx.today(), &patients, &appointments, &invoices))
    }
}
