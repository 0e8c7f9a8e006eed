use serde::Serialize;
use serde_json::json;

use dentalcare_auth::Permission;
use dentalcare_infra::{DataRequestError, Query};
use dentalcare_invoicing::{BillingTotals, Invoice, InvoiceDraft, InvoiceFilter, InvoiceId, PaymentMethod};
use dentalcare_patients::Patient;

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::{ensure_mounted, load_into};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillingBoard {
    /// Newest invoice date first.
    pub invoices: Vec<Invoice>,
    pub totals: BillingTotals,
    pub patients: Vec<Patient>,
}

#[derive(Debug)]
pub struct BillingPage {
    ctx: AppContext,
    mount: MountToken,
    filter: InvoiceFilter,
    slot: ScreenSlot<BillingBoard>,
}

impl BillingPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            filter: InvoiceFilter::default(),
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<BillingBoard> {
        self.slot.state()
    }

    pub fn set_filter(&mut self, filter: InvoiceFilter) {
        self.filter = filter;
    }

    pub fn visible(&self) -> Vec<Invoice> {
        match self.slot.state() {
            ScreenState::Ready(board) => self.filter.apply(&board.invoices).into_iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Totals over the filtered invoices.
    pub fn visible_totals(&self) -> BillingTotals {
        BillingTotals::of(&self.visible())
    }

    pub async fn load(&self) -> ScreenState<BillingBoard> {
        let fetch = async {
            self.ctx.require(Permission::ViewClinical)?;
            let newest = Query::new().order_by("invoice_date", false);
            let by_name = Query::new().order_by("full_name", true);
            let (invoices, patients) =
                tokio::try_join!(self.ctx.invoices.list(&newest), self.ctx.patients.list(&by_name))?;
            Ok(BillingBoard {
                totals: BillingTotals::of(&invoices),
                invoices,
                patients,
            })
        };
        load_into(&self.ctx, &self.mount, &self.slot, fetch).await
    }

    pub async fn retry(&self) -> ScreenState<BillingBoard> {
        self.load().await
    }

    pub async fn issue(&self, draft: InvoiceDraft) -> Result<Invoice, DataRequestError> {
        self.ctx.require(Permission::ManageBilling)?;
        let invoice = draft.into_invoice(InvoiceId::new())?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.invoices.insert(&invoice).await?;
        tracing::info!(invoice = %stored.id, amount = %stored.amount, "invoice issued");
        self.load().await;
        Ok(stored)
    }

    pub async fn update(&self, id: InvoiceId, draft: InvoiceDraft) -> Result<Invoice, DataRequestError> {
        self.ctx.require(Permission::ManageBilling)?;
        let invoice = draft.into_invoice(id)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.invoices.save(&invoice).await?;
        self.load().await;
        Ok(stored)
    }

    pub async fn mark_paid(&self, id: InvoiceId, method: PaymentMethod) -> Result<Invoice, DataRequestError> {
        self.ctx.require(Permission::ManageBilling)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let paid = self.ctx.invoices.get(&id).await?.mark_paid(method)?;
        let stored = self
            .ctx
            .invoices
            .patch(&id, json!({ "status": paid.status, "payment_method": paid.payment_method }))
            .await?;
        tracing::info!(invoice = %id, "invoice paid");
        self.load().await;
        Ok(stored)
    }

    pub async fn cancel(&self, id: InvoiceId) -> Result<Invoice, DataRequestError> {
        self.ctx.require(Permission::ManageBilling)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let cancelled = self.ctx.invoices.get(&id).await?.cancel()?;
        let stored = self
            .ctx
            .invoices
            .patch(&id, json!({ "status": cancelled.status }))
            .await?;
        self.load().await;
        Ok(stored)
    }

    pub async fn delete(&self, id: InvoiceId) -> Result<(), DataRequestError> {
        self.ctx.require(Permission::DeleteRecords)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        self.ctx.invoices.delete(&id).await?;
        tracing::info!(invoice = %id, "invoice deleted");
        self.load().await;
        Ok(())
    }
}
