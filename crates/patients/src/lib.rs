//! Patient records.

pub mod patient;

pub use patient::{Patient, PatientDraft, PatientId};
