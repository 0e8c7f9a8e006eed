use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use dentalcare_auth::PrincipalId;
use dentalcare_core::{DomainError, Entity, Record, record_id};
use dentalcare_patients::PatientId;

record_id!(AppointmentId, "AppointmentId");

/// Kind of visit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentKind {
    Consultation,
    Cleaning,
    Treatment,
    Emergency,
    #[serde(rename = "followup")]
    FollowUp,
}

impl AppointmentKind {
    pub const ALL: [AppointmentKind; 5] = [
        AppointmentKind::Consultation,
        AppointmentKind::Cleaning,
        AppointmentKind::Treatment,
        AppointmentKind::Emergency,
        AppointmentKind::FollowUp,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AppointmentKind::Consultation => "Consultation",
            AppointmentKind::Cleaning => "Cleaning",
            AppointmentKind::Treatment => "Treatment",
            AppointmentKind::Emergency => "Emergency",
            AppointmentKind::FollowUp => "Follow-up",
        }
    }
}

/// Appointment status lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Whether the slot still occupies the practitioner's calendar.
    pub const fn is_active(self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    /// Allowed status changes. Cancelled and completed visits are final.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Scheduled, Confirmed | Cancelled | Completed) => true,
            (Confirmed, Scheduled | Cancelled | Completed) => true,
            _ => false,
        }
    }
}

/// Row of the `appointments` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub dentist_id: PrincipalId,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    #[serde(rename = "type")]
    pub kind: AppointmentKind,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Entity for Appointment {
    type Id = AppointmentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Appointment {
    const TABLE: &'static str = "appointments";
}

impl Appointment {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.appointment_date.and_time(self.appointment_time)
    }

    /// Change the status, rejecting transitions out of a final state.
    pub fn with_status(&self, next: AppointmentStatus) -> Result<Self, DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::invariant(format!(
                "cannot move appointment from {:?} to {:?}",
                self.status, next
            )));
        }
        Ok(Self {
            status: next,
            ..self.clone()
        })
    }
}

/// Form input for booking or editing an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub patient_id: Option<PatientId>,
    pub dentist_id: Option<PrincipalId>,
    pub appointment_date: NaiveDate,
    pub appointment_time: Option<NaiveTime>,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl AppointmentDraft {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            patient_id: None,
            dentist_id: None,
            appointment_date: date,
            appointment_time: None,
            kind: AppointmentKind::Consultation,
            status: AppointmentStatus::Scheduled,
            notes: None,
        }
    }

    pub fn into_appointment(self, id: AppointmentId) -> Result<Appointment, DomainError> {
        let patient_id = self
            .patient_id
            .ok_or_else(|| DomainError::validation("a patient must be selected"))?;
        let dentist_id = self
            .dentist_id
            .ok_or_else(|| DomainError::validation("a dentist must be selected"))?;
        let appointment_time = self
            .appointment_time
            .ok_or_else(|| DomainError::validation("a time must be chosen"))?;
        Ok(Appointment {
            id,
            patient_id,
            dentist_id,
            appointment_date: self.appointment_date,
            appointment_time,
            kind: self.kind,
            status: self.status,
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        })
    }
}

/// Client-side filter over a loaded appointment list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub kind: Option<AppointmentKind>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, a: &Appointment) -> bool {
        self.date.is_none_or(|d| a.appointment_date == d)
            && self.kind.is_none_or(|k| a.kind == k)
            && self.status.is_none_or(|s| a.status == s)
    }

    /// Filter and order by date then time.
    pub fn apply<'a>(&self, appointments: &'a [Appointment]) -> Vec<&'a Appointment> {
        let mut out: Vec<&Appointment> = appointments.iter().filter(|a| self.matches(a)).collect();
        out.sort_by_key(|a| a.starts_at());
        out
    }
}
