//! Generic CRUD over remote collections.

pub mod collection;
pub mod in_memory;
pub mod query;
pub mod rest;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DataRequestError;

pub use collection::Collection;
pub use in_memory::InMemoryDataService;
pub use query::{Filter, Order, Query};
pub use rest::RestDataService;

/// Row-level access to named tables, each row a JSON object with an `id`.
///
/// Authorization is enforced by the remote service; implementations surface
/// refusals as [`DataRequestError::Api`].
#[async_trait]
pub trait DataService: Send + Sync {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DataRequestError>;

    /// Insert one row; returns the row as stored (with server defaults).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, DataRequestError>;

    /// Merge `patch` into the row with `id`; returns the updated row.
    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, DataRequestError>;

    async fn delete(&self, table: &str, id: &str) -> Result<(), DataRequestError>;
}

#[async_trait]
impl<S> DataService for Arc<S>
where
    S: DataService + ?Sized,
{
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DataRequestError> {
        (**self).select(table, query).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, DataRequestError> {
        (**self).insert(table, row).await
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, DataRequestError> {
        (**self).update(table, id, patch).await
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), DataRequestError> {
        (**self).delete(table, id).await
    }
}
