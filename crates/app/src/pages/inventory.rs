use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use dentalcare_auth::Permission;
use dentalcare_infra::{DataRequestError, Query};
use dentalcare_inventory::{InventoryDraft, InventoryItem, InventoryItemId, StockSummary};

use crate::context::AppContext;
use crate::router::MountToken;
use crate::screen_state::{ScreenSlot, ScreenState};

use super::{ensure_mounted, load_into};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockBoard {
    /// Alphabetical.
    pub items: Vec<InventoryItem>,
    pub summary: StockSummary,
}

#[derive(Debug)]
pub struct InventoryPage {
    ctx: AppContext,
    mount: MountToken,
    search: String,
    slot: ScreenSlot<StockBoard>,
}

impl InventoryPage {
    pub fn new(ctx: AppContext, mount: MountToken) -> Self {
        Self {
            ctx,
            mount,
            search: String::new(),
            slot: ScreenSlot::new(),
        }
    }

    pub fn state(&self) -> ScreenState<StockBoard> {
        self.slot.state()
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    /// Items matching the search term, over the loaded list.
    pub fn visible(&self) -> Vec<InventoryItem> {
        match self.slot.state() {
            ScreenState::Ready(board) => board.items.into_iter().filter(|i| i.matches(&self.search)).collect(),
            _ => Vec::new(),
        }
    }

    pub async fn load(&self) -> ScreenState<StockBoard> {
        let fetch = async {
            self.ctx.require(Permission::ViewClinical)?;
            let items = self
                .ctx
                .inventory
                .list(&Query::new().order_by("name", true))
                .await?;
            Ok(StockBoard {
                summary: StockSummary::of(&items),
                items,
            })
        };
        load_into(&self.ctx, &self.mount, &self.slot, fetch).await
    }

    pub async fn retry(&self) -> ScreenState<StockBoard> {
        self.load().await
    }

    pub async fn add(&self, draft: InventoryDraft) -> Result<InventoryItem, DataRequestError> {
        self.ctx.require(Permission::ManageInventory)?;
        let item = draft.into_item(InventoryItemId::new(), Utc::now())?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.inventory.insert(&item).await?;
        tracing::info!(item = %stored.id, name = %stored.name, "inventory item added");
        self.load().await;
        Ok(stored)
    }

    pub async fn update(&self, id: InventoryItemId, draft: InventoryDraft) -> Result<InventoryItem, DataRequestError> {
        self.ctx.require(Permission::ManageInventory)?;
        let item = draft.into_item(id, Utc::now())?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let stored = self.ctx.inventory.save(&item).await?;
        self.load().await;
        Ok(stored)
    }

    /// Record a stock movement (positive for deliveries, negative for use).
    pub async fn adjust(&self, id: InventoryItemId, delta: i64) -> Result<InventoryItem, DataRequestError> {
        self.ctx.require(Permission::ManageInventory)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        let adjusted = self.ctx.inventory.get(&id).await?.adjust(delta, Utc::now())?;
        let stored = self
            .ctx
            .inventory
            .patch(
                &id,
                json!({ "quantity": adjusted.quantity, "last_updated": adjusted.last_updated }),
            )
            .await?;
        tracing::info!(item = %id, delta, quantity = stored.quantity, "stock adjusted");
        self.load().await;
        Ok(stored)
    }

    pub async fn delete(&self, id: InventoryItemId) -> Result<(), DataRequestError> {
        self.ctx.require(Permission::DeleteRecords)?;
        ensure_mounted(&self.ctx, &self.mount)?;
        self.ctx.inventory.delete(&id).await?;
        tracing::info!(item = %id, "inventory item deleted");
        self.load().await;
        Ok(())
    }
}
