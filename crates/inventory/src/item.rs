use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use dentalcare_core::{DomainError, Entity, Money, Record, record_id};

record_id!(InventoryItemId, "InventoryItemId");

/// Reorder threshold applied when a form leaves it blank.
pub const DEFAULT_MIN_QUANTITY: i64 = 10;

fn default_min_quantity() -> i64 {
    DEFAULT_MIN_QUANTITY
}

/// Row of the `inventory` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryItemId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub quantity: i64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default = "default_min_quantity")]
    pub min_quantity: i64,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Entity for InventoryItem {
    type Id = InventoryItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Record for InventoryItem {
    const TABLE: &'static str = "inventory";
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    Low,
    OutOfStock,
}

impl InventoryItem {
    pub fn stock_status(&self) -> StockStatus {
        if self.quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.min_quantity {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }

    /// Low or out of stock.
    pub fn needs_reorder(&self) -> bool {
        self.stock_status() != StockStatus::InStock
    }

    /// Apply a stock movement. Quantity never goes below zero.
    pub fn adjust(&self, delta: i64, at: DateTime<Utc>) -> Result<Self, DomainError> {
        let quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        if quantity < 0 {
            return Err(DomainError::invariant(format!(
                "insufficient stock for {}: have {}, need {}",
                self.name,
                self.quantity,
                -delta
            )));
        }
        Ok(Self {
            quantity,
            last_updated: Some(at),
            ..self.clone()
        })
    }

    pub fn stock_value(&self) -> Money {
        self.price
            .map(|p| Money::from_minor(p.minor().saturating_mul(self.quantity)))
            .unwrap_or(Money::ZERO)
    }

    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.name.to_lowercase().contains(&term)
            || self.category.as_deref().is_some_and(|c| c.to_lowercase().contains(&term))
            || self.supplier.as_deref().is_some_and(|s| s.to_lowercase().contains(&term))
    }
}

/// Form input for creating or editing an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDraft {
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub unit: Option<String>,
    pub min_quantity: Option<i64>,
    pub price: Option<Money>,
    pub supplier: Option<String>,
}

impl InventoryDraft {
    pub fn into_item(self, id: InventoryItemId, at: DateTime<Utc>) -> Result<InventoryItem, DomainError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if self.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        let min_quantity = self.min_quantity.unwrap_or(DEFAULT_MIN_QUANTITY);
        if min_quantity < 0 {
            return Err(DomainError::validation("minimum quantity cannot be negative"));
        }
        if self.price.is_some_and(Money::is_negative) {
            return Err(DomainError::validation("price cannot be negative"));
        }
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Ok(InventoryItem {
            id,
            name,
            category: trim(self.category),
            quantity: self.quantity,
            unit: trim(self.unit),
            min_quantity,
            price: self.price,
            supplier: trim(self.supplier),
            last_updated: Some(at),
        })
    }
}

/// Counters shown above the inventory table.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StockSummary {
    pub total_items: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub total_value: Money,
}

impl StockSummary {
    pub fn of<'a>(items: impl IntoIterator<Item = &'a InventoryItem>) -> Self {
        items.into_iter().fold(Self::default(), |mut acc, item| {
            acc.total_items += 1;
            match item.stock_status() {
                StockStatus::Low => acc.low_stock += 1,
                StockStatus::OutOfStock => acc.out_of_stock += 1,
                StockStatus::InStock => {}
            }
            acc.total_value = acc.total_value + item.stock_value();
            acc
        })
    }
}
