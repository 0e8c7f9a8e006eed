use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use dentalcare_core::{DomainError, Entity, Money, Record, record_id};
use dentalcare_patients::PatientId;
use dentalcare_scheduling::AppointmentId;

record_id!(InvoiceId, "InvoiceId");

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Check,
    Transfer,
}

/// Row of the `invoices` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub patient_id: PatientId,
    #[serde(default)]
    pub appointment_id: Option<AppointmentId>,
    pub amount: Money,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub description: Option<String>,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

impl Entity for Invoice {
    type Id = InvoiceId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for Invoice {
    const TABLE: &'static str = "invoices";
}

impl Invoice {
    /// Record payment. Only pending invoices can be settled.
    pub fn mark_paid(&self, method: PaymentMethod) -> Result<Self, DomainError> {
        if self.status != InvoiceStatus::Pending {
            return Err(DomainError::invariant(format!(
                "invoice {} is {:?}, not pending",
                self.id, self.status
            )));
        }
        Ok(Self {
            status: InvoiceStatus::Paid,
            payment_method: Some(method),
            ..self.clone()
        })
    }

    pub fn cancel(&self) -> Result<Self, DomainError> {
        if self.status == InvoiceStatus::Paid {
            return Err(DomainError::invariant("a paid invoice cannot be cancelled"));
        }
        Ok(Self {
            status: InvoiceStatus::Cancelled,
            ..self.clone()
        })
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Pending && self.due_date.is_some_and(|due| due < today)
    }

    pub fn in_month(&self, year: i32, month: u32) -> bool {
        self.invoice_date.year() == year && self.invoice_date.month() == month
    }
}

/// Form input for issuing or editing an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    pub patient_id: Option<PatientId>,
    pub appointment_id: Option<AppointmentId>,
    pub amount: Money,
    pub status: InvoiceStatus,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
}

impl InvoiceDraft {
    pub fn new(invoice_date: NaiveDate) -> Self {
        Self {
            patient_id: None,
            appointment_id: None,
            amount: Money::ZERO,
            status: InvoiceStatus::Pending,
            payment_method: None,
            description: None,
            invoice_date,
            due_date: None,
        }
    }

    pub fn into_invoice(self, id: InvoiceId) -> Result<Invoice, DomainError> {
        let patient_id = self
            .patient_id
            .ok_or_else(|| DomainError::validation("a patient must be selected"))?;
        if self.amount.is_negative() {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        if self.due_date.is_some_and(|due| due < self.invoice_date) {
            return Err(DomainError::validation("due date cannot precede the invoice date"));
        }
        Ok(Invoice {
            id,
            patient_id,
            appointment_id: self.appointment_id,
            amount: self.amount,
            status: self.status,
            payment_method: self.payment_method,
            description: self.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            invoice_date: self.invoice_date,
            due_date: self.due_date,
        })
    }
}

/// Paid and outstanding sums shown above the billing table.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BillingTotals {
    pub paid: Money,
    pub pending: Money,
    pub count: usize,
}

impl BillingTotals {
    pub fn of<'a>(invoices: impl IntoIterator<Item = &'a Invoice>) -> Self {
        invoices.into_iter().fold(Self::default(), |mut acc, inv| {
            match inv.status {
                InvoiceStatus::Paid => acc.paid = acc.paid + inv.amount,
                InvoiceStatus::Pending => acc.pending = acc.pending + inv.amount,
                InvoiceStatus::Cancelled => {}
            }
            acc.count += 1;
            acc
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub patient_id: Option<PatientId>,
    /// Inclusive invoice-date range.
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl InvoiceFilter {
    pub fn matches(&self, inv: &Invoice) -> bool {
        self.status.is_none_or(|s| inv.status == s)
            && self.patient_id.is_none_or(|p| inv.patient_id == p)
            && self.from.is_none_or(|d| inv.invoice_date >= d)
            && self.to.is_none_or(|d| inv.invoice_date <= d)
    }

    /// Filter, newest invoice date first.
    pub fn apply<'a>(&self, invoices: &'a [Invoice]) -> Vec<&'a Invoice> {
        let mut out: Vec<&Invoice> = invoices.iter().filter(|i| self.matches(i)).collect();
        out.sort_by(|a, b| b.invoice_date.cmp(&a.invoice_date));
        out
    }
}
