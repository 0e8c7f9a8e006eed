//! Shared HTTP plumbing for the REST adapters.

use std::sync::{Arc, RwLock};

use reqwest::{Client, RequestBuilder, Response};

use crate::config::RemoteConfig;
use crate::error::DataRequestError;

/// Access token of the signed-in user, shared between the identity adapter
/// (which writes it) and the data adapter (which sends it).
#[derive(Clone, Default)]
pub struct SessionToken(Arc<RwLock<Option<String>>>);

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let present = self.get().is_some();
        f.debug_tuple("SessionToken").field(&if present { "<set>" } else { "<none>" }).finish()
    }
}

impl SessionToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<String> {
        self.0.read().ok().and_then(|t| t.clone())
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut t) = self.0.write() {
            *t = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut t) = self.0.write() {
            *t = None;
        }
    }
}

/// Base URL, key and client for one remote project.
#[derive(Debug, Clone)]
pub struct Endpoint {
    client: Client,
    base_url: String,
    api_key: String,
    token: SessionToken,
}

impl Endpoint {
    pub fn new(config: &RemoteConfig, token: SessionToken) -> Result<Self, DataRequestError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DataRequestError::network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            token,
        })
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the `apikey` header and the bearer (user token, else the key).
    pub fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let bearer = self.token.get().unwrap_or_else(|| self.api_key.clone());
        req.header("apikey", &self.api_key).bearer_auth(bearer)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.patch(self.url(path)))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.delete(self.url(path)))
    }
}

/// Pull a human-readable message out of an error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "msg", "error_description", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a non-success response to [`DataRequestError::Api`].
pub(crate) async fn check(resp: Response) -> Result<Response, DataRequestError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DataRequestError::Api {
        status: status.as_u16(),
        message: error_message(&body),
    })
}
