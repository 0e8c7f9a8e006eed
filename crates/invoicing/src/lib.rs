//! Billing records for patient visits.
//!
//! Plain data plus the few rules the billing screen enforces before a row is
//! written (non-negative amounts, due date not before the invoice date).

pub mod invoice;

pub use invoice::{
    BillingTotals, Invoice, InvoiceDraft, InvoiceFilter, InvoiceId, InvoiceStatus, PaymentMethod,
};
