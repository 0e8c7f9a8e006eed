//! Appointment scheduling records.

pub mod appointment;

pub use appointment::{
    Appointment, AppointmentDraft, AppointmentFilter, AppointmentId, AppointmentKind, AppointmentStatus,
};
