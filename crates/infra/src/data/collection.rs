use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use dentalcare_core::{Entity, Record};

use super::{DataService, Query};
use crate::error::DataRequestError;

/// Typed view of one remote table.
pub struct Collection<T> {
    data: Arc<dyn DataService>,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            _row: PhantomData,
        }
    }
}

fn decode<T: Record>(row: Value) -> Result<T, DataRequestError> {
    serde_json::from_value(row).map_err(|e| DataRequestError::parse(format!("{}: {e}", T::TABLE)))
}

impl<T: Record> Collection<T> {
    pub fn new(data: Arc<dyn DataService>) -> Self {
        Self {
            data,
            _row: PhantomData,
        }
    }

    pub async fn list(&self, query: &Query) -> Result<Vec<T>, DataRequestError> {
        let rows = self.data.select(T::TABLE, query).await?;
        rows.into_iter().map(decode).collect()
    }

    pub async fn get(&self, id: &T::Id) -> Result<T, DataRequestError> {
        let rows = self.data.select(T::TABLE, &Query::new().eq("id", id).limit(1)).await?;
        rows.into_iter().next().ok_or(DataRequestError::NotFound).and_then(decode)
    }

    pub async fn insert(&self, record: &T) -> Result<T, DataRequestError> {
        let row = without_nulls(serde_json::to_value(record)?);
        decode(self.data.insert(T::TABLE, row).await?)
    }

    /// Write every column of `record` over the stored row.
    pub async fn save(&self, record: &T) -> Result<T, DataRequestError> {
        let patch = serde_json::to_value(record)?;
        decode(self.data.update(T::TABLE, &record.id().to_string(), patch).await?)
    }

    pub async fn patch(&self, id: &T::Id, patch: Value) -> Result<T, DataRequestError> {
        decode(self.data.update(T::TABLE, &id.to_string(), patch).await?)
    }

    pub async fn delete(&self, id: &T::Id) -> Result<(), DataRequestError> {
        self.data.delete(T::TABLE, &id.to_string()).await
    }
}

/// Drop null columns so the remote column defaults apply on insert.
fn without_nulls(row: Value) -> Value {
    match row {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}
