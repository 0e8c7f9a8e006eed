use chrono::NaiveDateTime;
use serde::Serialize;

use dentalcare_core::Money;
use dentalcare_inventory::InventoryItem;
use dentalcare_invoicing::{Invoice, InvoiceStatus};
use dentalcare_patients::Patient;
use dentalcare_scheduling::{Appointment, AppointmentStatus};

use crate::period::{DateRange, Period, percent_change};

/// How many upcoming appointments the dashboard lists.
pub const UPCOMING_LIMIT: usize = 5;

/// Landing-screen figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_patients: usize,
    pub new_patients_this_month: usize,
    pub appointments_today: usize,
    pub confirmed_today: usize,
    pub revenue_this_month: Money,
    pub revenue_previous_month: Money,
    pub revenue_change_percent: Option<f64>,
    pub upcoming: Vec<Appointment>,
    pub low_stock: Vec<InventoryItem>,
}

pub(crate) fn paid_within(invoices: &[Invoice], range: DateRange) -> Money {
    invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid && range.contains(i.invoice_date))
        .map(|i| i.amount)
        .sum()
}

pub(crate) fn registered_within(patients: &[Patient], range: DateRange) -> usize {
    patients
        .iter()
        .filter(|p| p.created_at.is_some_and(|at| range.contains(at.date_naive())))
        .count()
}

impl DashboardSummary {
    pub fn compute(
        now: NaiveDateTime,
        patients: &[Patient],
        appointments: &[Appointment],
        invoices: &[Invoice],
        inventory: &[InventoryItem],
    ) -> Self {
        let today = now.date();
        let month = Period::Month.containing(today);
        let previous_month = month.previous(Period::Month);

        let todays: Vec<&Appointment> = appointments
            .iter()
            .filter(|a| a.appointment_date == today && a.status != AppointmentStatus::Cancelled)
            .collect();
        let confirmed_today = todays
            .iter()
            .filter(|a| a.status == AppointmentStatus::Confirmed)
            .count();

        let mut upcoming: Vec<Appointment> = appointments
            .iter()
            .filter(|a| a.status.is_active() && a.starts_at() >= now)
            .cloned()
            .collect();
        upcoming.sort_by_key(Appointment::starts_at);
        upcoming.truncate(UPCOMING_LIMIT);

        let mut low_stock: Vec<InventoryItem> = inventory.iter().filter(|i| i.needs_reorder()).cloned().collect();
        low_stock.sort_by(|a, b| a.quantity.cmp(&b.quantity).then_with(|| a.name.cmp(&b.name)));

        let revenue_this_month = paid_within(invoices, month);
        let revenue_previous_month = paid_within(invoices, previous_month);

        Self {
            total_patients: patients.len(),
            new_patients_this_month: registered_within(patients, month),
            appointments_today: todays.len(),
            confirmed_today,
            revenue_this_month,
            revenue_previous_month,
            revenue_change_percent: percent_change(revenue_this_month, revenue_previous_month),
            upcoming,
            low_stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use dentalcare_auth::PrincipalId;
    use dentalcare_inventory::InventoryItemId;
    use dentalcare_invoicing::InvoiceId;
    use dentalcare_patients::PatientId;
    use dentalcare_scheduling::{AppointmentId, AppointmentKind};

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn patient(created: Option<NaiveDate>) -> Patient {
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
            created_at: created.map(|d| Utc.from_utc_datetime(&d.and_hms_opt(10, 0, 0).unwrap())),
        }
    }

    fn appt(date: NaiveDate, hour: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: AppointmentId::new(),
            patient_id: PatientId::new(),
            dentist_id: PrincipalId::new(),
            appointment_date: date,
            appointment_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            kind: AppointmentKind::Consultation,
            status,
            notes: None,
        }
    }

    fn paid(date: NaiveDate, minor: i64) -> Invoice {
        Invoice {
            id: InvoiceId::new(),
            patient_id: PatientId::new(),
            appointment_id: None,
            amount: Money::from_minor(minor),
            status: InvoiceStatus::Paid,
            payment_method: None,
            description: None,
            invoice_date: date,
            due_date: None,
        }
    }

    fn stock(name: &str, quantity: i64) -> InventoryItem {
        InventoryItem {
            id: InventoryItemId::new(),
            name: name.into(),
            category: None,
            quantity,
            unit: None,
            min_quantity: 10,
            price: None,
            supplier: None,
            last_updated: None,
        }
    }

    #[test]
    fn summarizes_the_current_day_and_month() {
        let now = day(6, 15).and_hms_opt(11, 0, 0).unwrap();
        let patients = [patient(Some(day(6, 2))), patient(Some(day(5, 30))), patient(None)];
        let mut appointments = vec![
            appt(day(6, 15), 9, AppointmentStatus::Completed),
            appt(day(6, 15), 14, AppointmentStatus::Confirmed),
            appt(day(6, 15), 16, AppointmentStatus::Cancelled),
        ];
        for d in 16..=22 {
            appointments.push(appt(day(6, d), 10, AppointmentStatus::Scheduled));
        }
        let invoices = [paid(day(6, 3), 20_000), paid(day(5, 20), 10_000), paid(day(4, 1), 99_000)];
        let inventory = [stock("Gloves", 50), stock("Masks", 3), stock("Resin", 0)];

        let s = DashboardSummary::compute(now, &patients, &appointments, &invoices, &inventory);

        assert_eq!(s.total_patients, 3);
        assert_eq!(s.new_patients_this_month, 1);
        assert_eq!(s.appointments_today, 2);
        assert_eq!(s.confirmed_today, 1);
        assert_eq!(s.revenue_this_month, Money::from_minor(20_000));
        assert_eq!(s.revenue_change_percent, Some(100.0));
        assert_eq!(s.upcoming.len(), UPCOMING_LIMIT);
        assert_eq!(s.upcoming[0].appointment_time, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
        let low: Vec<_> = s.low_stock.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(low, vec!["Resin", "Masks"]);
    }

    #[test]
    fn empty_clinic_has_no_change_figure() {
        let now = day(1, 1).and_hms_opt(8, 0, 0).unwrap();
        let s = DashboardSummary::compute(now, &[], &[], &[], &[]);
        assert_eq!(s.total_patients, 0);
        assert_eq!(s.revenue_change_percent, None);
        assert!(s.upcoming.is_empty());
    }
}
