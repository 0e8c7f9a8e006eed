use async_trait::async_trait;
use serde_json::Value;

use super::{DataService, Query};
use crate::error::DataRequestError;
use crate::http::{Endpoint, check};

/// [`DataService`] over the hosted REST table API (`/rest/v1/<table>`).
#[derive(Debug, Clone)]
pub struct RestDataService {
    endpoint: Endpoint,
}

impl RestDataService {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn path(table: &str) -> String {
        format!("/rest/v1/{table}")
    }
}

/// Mutations ask for the affected rows back; exactly one is expected.
fn single(rows: Vec<Value>) -> Result<Value, DataRequestError> {
    rows.into_iter().next().ok_or(DataRequestError::NotFound)
}

#[async_trait]
impl DataService for RestDataService {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, DataRequestError> {
        tracing::debug!(table, filters = query.filters.len(), "select");
        let resp = self
            .endpoint
            .get(&Self::path(table))
            .query(&query.to_params())
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, DataRequestError> {
        tracing::debug!(table, "insert");
        let resp = self
            .endpoint
            .post(&Self::path(table))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        single(check(resp).await?.json().await?)
    }

    async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value, DataRequestError> {
        tracing::debug!(table, id, "update");
        let resp = self
            .endpoint
            .patch(&Self::path(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        single(check(resp).await?.json().await?)
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), DataRequestError> {
        tracing::debug!(table, id, "delete");
        let resp = self
            .endpoint
            .delete(&Self::path(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .send()
            .await?;
        let deleted: Vec<Value> = check(resp).await?.json().await?;
        if deleted.is_empty() {
            return Err(DataRequestError::NotFound);
        }
        Ok(())
    }
}
