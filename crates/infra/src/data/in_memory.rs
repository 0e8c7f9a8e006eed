use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use uuid::Uuid;

use super::{DataService, Query};
use crate::error::DataRequestError;

/// In-memory tables for tests and local runs.
///
/// Inserted rows get an `id` and `created_at` when missing, like the remote
/// service's column defaults.
#[derive(Debug, Default)]
pub struct InMemoryDataService {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    offline: AtomicBool,
    requests: AtomicUsize,
}

impl InMemoryDataService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a table's rows.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Value>) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(table.to_string(), rows.into_iter().collect());
        }
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .ok()
            .and_then(|t| t.get(table).cloned())
            .unwrap_or_default()
    }

    /// While offline every call fails with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of calls received, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<(), DataRequestError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(DataRequestError::network("service unreachable"));
        }
        Ok(())
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut HashMap<String, Vec<Value>>) -> R) -> Result<R, DataRequestError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| DataRequestError::network("in-memory store poisoned"))?;
        Ok(f(&mut tables))
    }
}

fn row_id(row: &Value) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DataService for InMemoryDataService {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DataRequestError> {
        self.begin()?;
        self.with_tables(|t| query.apply(t.get(table).map(Vec::as_slice).unwrap_or(&[])))
    }

    async fn insert(&self, table: &str, mut row: Value) -> Result<Value, DataRequestError> {
        self.begin()?;
        let obj = row
            .as_object_mut()
            .ok_or_else(|| DataRequestError::parse("row must be a JSON object"))?;
        if obj.get("id").is_none_or(Value::is_null) {
            obj.insert("id".into(), json!(Uuid::now_v7().to_string()));
        }
        obj.entry("created_at").or_insert_with(|| json!(Utc::now()));
        self.with_tables(|t| {
            let rows = t.entry(table.to_string()).or_default();
            let id = row_id(&row).map(str::to_string);
            if id.is_some() && rows.iter().any(|r| row_id(r).map(str::to_string) == id) {
                return Err(DataRequestError::Api {
                    status: 409,
                    message: "duplicate key value violates unique constraint".into(),
                });
            }
            rows.push(row.clone());
            Ok(row)
        })?
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, DataRequestError> {
        self.begin()?;
        let patch = patch
            .as_object()
            .cloned()
            .ok_or_else(|| DataRequestError::parse("patch must be a JSON object"))?;
        self.with_tables(|t| {
            let row = t
                .get_mut(table)
                .and_then(|rows| rows.iter_mut().find(|r| row_id(r) == Some(id)))
                .ok_or(DataRequestError::NotFound)?;
            if let Some(obj) = row.as_object_mut() {
                for (k, v) in patch {
                    if k != "id" {
                        obj.insert(k, v);
                    }
                }
            }
            Ok(row.clone())
        })?
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), DataRequestError> {
        self.begin()?;
        self.with_tables(|t| {
            let rows = t.get_mut(table).ok_or(DataRequestError::NotFound)?;
            let before = rows.len();
            rows.retain(|r| row_id(r) != Some(id));
            if rows.len() == before {
                return Err(DataRequestError::NotFound);
            }
            Ok(())
        })?
    }
}
