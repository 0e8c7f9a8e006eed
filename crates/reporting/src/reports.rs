use std::collections::HashSet;

use chrono::{Months, NaiveDate};
use serde::Serialize;

use dentalcare_core::Money;
use dentalcare_invoicing::Invoice;
use dentalcare_patients::Patient;
use dentalcare_scheduling::{Appointment, AppointmentKind, AppointmentStatus};

use crate::dashboard::{paid_within, registered_within};
use crate::period::{DateRange, Period, percent_change};

/// Paid revenue for a period against the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevenueComparison {
    pub period: Period,
    pub range: DateRange,
    pub current: Money,
    pub previous: Money,
    pub change_percent: Option<f64>,
}

impl RevenueComparison {
    pub fn compute(period: Period, today: NaiveDate, invoices: &[Invoice]) -> Self {
        let range = period.containing(today);
        let current = paid_within(invoices, range);
        let previous = paid_within(invoices, range.previous(period));
        Self {
            period,
            range,
            current,
            previous,
            change_percent: percent_change(current, previous),
        }
    }
}

/// Appointment counts per visit kind, in a fixed kind order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentMix {
    pub range: DateRange,
    pub by_kind: Vec<(AppointmentKind, usize)>,
    pub total: usize,
}

impl AppointmentMix {
    /// Cancelled visits are left out.
    pub fn compute(range: DateRange, appointments: &[Appointment]) -> Self {
        let in_range: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled && range.contains(a.appointment_date))
            .collect();
        let by_kind = AppointmentKind::ALL
            .iter()
            .map(|kind| (*kind, in_range.iter().filter(|a| a.kind == *kind).count()))
            .collect();
        Self {
            range,
            by_kind,
            total: in_range.len(),
        }
    }

    pub fn count(&self, kind: AppointmentKind) -> usize {
        self.by_kind
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatientStats {
    pub total: usize,
    pub new_this_month: usize,
    /// Patients with a non-cancelled visit in the twelve months up to today.
    pub active: usize,
}

impl PatientStats {
    pub fn compute(today: NaiveDate, patients: &[Patient], appointments: &[Appointment]) -> Self {
        let window_start = today.checked_sub_months(Months::new(12)).unwrap_or(today);
        let window = DateRange {
            start: window_start,
            end: today,
        };
        let known: HashSet<_> = patients.iter().map(|p| p.id).collect();
        let active: HashSet<_> = appointments
            .iter()
            .filter(|a| a.status != AppointmentStatus::Cancelled && window.contains(a.appointment_date))
            .map(|a| a.patient_id)
            .filter(|id| known.contains(id))
            .collect();
        Self {
            total: patients.len(),
            new_this_month: registered_within(patients, Period::Month.containing(today)),
            active: active.len(),
        }
    }
}

/// Everything the reports screen shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClinicReport {
    pub revenue: Vec<RevenueComparison>,
    pub appointments_this_month: AppointmentMix,
    pub patients: PatientStats,
}

impl ClinicReport {
    pub fn compute(
        today: NaiveDate,
        patients: &[Patient],
        appointments: &[Appointment],
        invoices: &[Invoice],
    ) -> Self {
        let revenue = [Period::Month, Period::Quarter, Period::Year]
            .into_iter()
            .map(|p| RevenueComparison::compute(p, today, invoices))
            .collect();
        Self {
            revenue,
            appointments_this_month: AppointmentMix::compute(Period::Month.containing(today), appointments),
            patients: PatientStats::compute(today, patients, appointments),
        }
    }

    pub fn revenue_for(&self, period: Period) -> Option<&RevenueComparison> {
        self.revenue.iter().find(|r| r.period == period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use dentalcare_auth::PrincipalId;
    use dentalcare_invoicing::{InvoiceId, InvoiceStatus};
    use dentalcare_patients::PatientId;
    use dentalcare_scheduling::AppointmentId;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(date: NaiveDate, minor: i64, status: InvoiceStatus) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            patient_id: PatientId::new(),
            appointment_id: None,
            amount: Money::from_minor(minor),
            status,
            payment_method: None,
            description: None,
            invoice_date: date,
            due_date: None,
        }
    }

    fn patient() -> Patient {
        Patient {
            id: PatientId::new(),
            full_name: "P".into(),
            email: None,
            phone: None,
            date_of_birth: None,
            address: None,
            medical_history: None,
            allergies: None,
            created_by: None,
            created_at: None,
        }
    }

    fn visit(patient: PatientId, date: NaiveDate, kind: AppointmentKind, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            patient_id: patient,
            dentist_id: PrincipalId::new(),
            appointment_date: date,
            appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            kind,
            status,
            notes: None,
        }
    }

    #[test]
    fn quarter_revenue_compares_with_previous_quarter() {
        let today = day(2024, 5, 10);
        let invoices = [
            invoice(day(2024, 4, 2), 30_000, InvoiceStatus::Paid),
            invoice(day(2024, 5, 9), 10_000, InvoiceStatus::Pending),
            invoice(day(2024, 2, 1), 20_000, InvoiceStatus::Paid),
        ];
        let r = RevenueComparison::compute(Period::Quarter, today, &invoices);
        assert_eq!(r.current, Money::from_minor(30_000));
        assert_eq!(r.previous, Money::from_minor(20_000));
        assert_eq!(r.change_percent, Some(50.0));
    }

    #[test]
    fn mix_counts_every_kind_and_skips_cancelled() {
        let p = PatientId::new();
        let list = [
            visit(p, day(2024, 6, 3), AppointmentKind::Cleaning, AppointmentStatus::Completed),
            visit(p, day(2024, 6, 4), AppointmentKind::Cleaning, AppointmentStatus::Scheduled),
            visit(p, day(2024, 6, 5), AppointmentKind::Emergency, AppointmentStatus::Cancelled),
            visit(p, day(2024, 5, 5), AppointmentKind::Treatment, AppointmentStatus::Completed),
        ];
        let mix = AppointmentMix::compute(Period::Month.containing(day(2024, 6, 15)), &list);
        assert_eq!(mix.by_kind.len(), AppointmentKind::ALL.len());
        assert_eq!(mix.count(AppointmentKind::Cleaning), 2);
        assert_eq!(mix.count(AppointmentKind::Emergency), 0);
        assert_eq!(mix.total, 2);
    }

    #[test]
    fn active_patients_within_twelve_months() {
        let today = day(2024, 6, 15);
        let (a, b, c) = (patient(), patient(), patient());
        let visits = [
            visit(a.id, day(2024, 1, 10), AppointmentKind::Consultation, AppointmentStatus::Completed),
            visit(a.id, day(2024, 2, 10), AppointmentKind::Cleaning, AppointmentStatus::Completed),
            visit(b.id, day(2023, 6, 1), AppointmentKind::Consultation, AppointmentStatus::Completed),
            visit(c.id, day(2024, 3, 1), AppointmentKind::Consultation, AppointmentStatus::Cancelled),
        ];
        let stats = PatientStats::compute(today, &[a, b, c], &visits);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.active, 1);
    }

    #[test]
    fn report_has_all_three_periods() {
        let r = ClinicReport::compute(day(2024, 6, 15), &[], &[], &[]);
        assert!(r.revenue_for(Period::Month).is_some());
        assert!(r.revenue_for(Period::Quarter).is_some());
        assert!(r.revenue_for(Period::Year).is_some());
    }

    proptest! {
        #[test]
        fn month_revenue_never_exceeds_year_revenue(
            entries in proptest::collection::vec((1u32..=12, 1u32..=28, 0i64..100_000), 0..30)
        ) {
            let invoices: Vec<Invoice> = entries
                .iter()
                .map(|(m, d, a)| invoice(day(2024, *m, *d), *a, InvoiceStatus::Paid))
                .collect();
            let today = day(2024, 8, 15);
            let month = RevenueComparison::compute(Period::Month, today, &invoices);
            let quarter = RevenueComparison::compute(Period::Quarter, today, &invoices);
            let year = RevenueComparison::compute(Period::Year, today, &invoices);
            prop_assert!(month.current <= quarter.current);
            prop_assert!(quarter.current <= year.current);
        }
    }
}
