//! Read-only aggregation over loaded clinic records.
//!
//! Everything here is a pure function of the rows it is given and the
//! reference date; no IO and no clock reads.

pub mod dashboard;
pub mod period;
pub mod reports;

pub use dashboard::DashboardSummary;
pub use period::{DateRange, Period, percent_change};
pub use reports::{AppointmentMix, ClinicReport, PatientStats, RevenueComparison};
