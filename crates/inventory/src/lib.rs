//! Supply stock tracking.

pub mod item;

pub use item::{DEFAULT_MIN_QUANTITY, InventoryDraft, InventoryItem, InventoryItemId, StockStatus, StockSummary};
