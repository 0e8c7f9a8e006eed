use serde::Serialize;

use dentalcare_auth::{Permission, Profile};
use dentalcare_infra::{DataRequestError, Query};
use dentalcare_patients::Patient;
use dentalcare_scheduling::{Appointment, AppointmentDraft, AppointmentFilter, AppointmentId, AppointmentStatus};

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::{ensure_mounted, load_into};

/// Loaded appointment list plus the choices the booking form offers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppointmentBoard {
    /// Ordered by date then time.
    pub appointments: Vec<Appointment>,
    pub dentists: Vec<Profile>,
    pub patients: Vec<Patient>,
}

#[derive(Debug)]
pub struct AppointmentsPage {
    ctx: AppContext,
    mount: MountToken,
    filter: AppointmentFilter,
    slot: ScreenSlot<AppointmentBoard>,
}

impl AppointmentsPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            filter: AppointmentFilter::default(),
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<AppointmentBoard> {
        self.slot.state()
    }

    pub fn set_filter(&mut self, filter: AppointmentFilter) {
        self.filter = filter;
    }

    /// Loaded appointments matching the current filter.
    pub fn visible(&self) -> Vec<Appointment> {
        match self.slot.state() {
            ScreenState::Ready(board) => self.filter.apply(&board.appointments).into_iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub async fn load(&self) -> ScreenState<AppointmentBoard> {
        let fetch = async {
            self.ctx.require(Permission::ViewClinical)?;
            let by_slot = Query::new()
                .order_by("appointment_date", true)
                .order_by("appointment_time", true);
            let patients_by_name = Query::new().order_by("full_name", true);
            let (appointments, dentists, patients) = tokio::try_join!(
                self.ctx.appointments.list(&by_slot),
                self.ctx.profiles.practitioners(),
                self.ctx.patients.list(&patients_by_name),
            )?;
            Ok(AppointmentBoard {
                appointments,
                dentists,
                patients,
            })
        };
        load_into(&self.ctx, &self.mount, &self.slot, fetch).await
    }

    pub async fn retry(&self) -> ScreenState<AppointmentBoard> {
        self.load().await
    }

    pub async fn book(&self, draft: AppointmentDraft) -> Result<Appointment, DataRequestError> {
        self.ctx.require(Permission::ManageAppointments)?;
        let appointment = draft.into_appointment(AppointmentId::new())?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.appointments.insert(&appointment).await?;
        tracing::info!(appointment = %stored.id, date = %stored.appointment_date, "appointment booked");
        self.load().await;
        Ok(stored)
    }

    pub async fn update(&self, id: AppointmentId, draft: AppointmentDraft) -> Result<Appointment, DataRequestError> {
        self.ctx.require(Permission::ManageAppointments)?;
        let appointment = draft.into_appointment(id)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.appointments.save(&appointment).await?;
        self.load().await;
        Ok(stored)
    }

    pub async fn set_status(&self, id: AppointmentId, status: AppointmentStatus) -> Result<Appointment, DataRequestError> {
        self.ctx.require(Permission::ManageAppointments)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let current = self.ctx.appointments.get(&id).await?;
        let next = current.with_status(status)?;
        let stored = self
            .ctx
            .appointments
            .patch(&id, serde_json::json!({ "status": next.status }))
            .await?;
        self.load().await;
        Ok(stored)
    }

    pub async fn delete(&self, id: AppointmentId) -> Result<(), DataRequestError> {
        self.ctx.require(Permission::DeleteRecords)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        self.ctx.appointments.delete(&id).await?;
        tracing::info!(appointment = %id, "appointment deleted");
        self.load().await;
        Ok(())
    }
}
