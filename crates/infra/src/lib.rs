//! Infrastructure layer: remote service adapters and configuration.
//!
//! Two remote APIs back the application: a REST table API for the clinic
//! collections and an auth API for identities. Each has a trait seam
//! ([`DataService`], [`IdentityProvider`]) with a REST adapter for production
//! and an in-memory adapter for tests and local runs.

pub mod config;
pub mod data;
pub mod error;
pub mod http;
pub mod identity;
pub mod profiles;

use std::sync::Arc;

pub use config::{ConfigError, RemoteConfig};
pub use data::{Collection, DataService, Filter, InMemoryDataService, Order, Query, RestDataService};
pub use error::DataRequestError;
pub use http::{Endpoint, SessionToken};
pub use identity::{
    IdentityChange, IdentityEventKind, IdentityProvider, InMemoryIdentityProvider, RestIdentityProvider, SignedIn,
};
pub use profiles::ProfileDirectory;

/// The pair of adapters an application session runs against.
#[derive(Clone)]
pub struct RemoteServices {
    pub identity: Arc<dyn IdentityProvider>,
    pub data: Arc<dyn DataService>,
}

impl RemoteServices {
    /// REST adapters sharing one session token.
    pub fn connect(config: &RemoteConfig) -> Result<Self, DataRequestError> {
        let endpoint = Endpoint::new(config, SessionToken::new())?;
        tracing::info!(api_url = %config.api_url, "remote services configured");
        Ok(Self {
            identity: Arc::new(RestIdentityProvider::new(endpoint.clone())),
            data: Arc::new(RestDataService::new(endpoint)),
        })
    }

    pub fn in_memory(identity: Arc<InMemoryIdentityProvider>, data: Arc<InMemoryDataService>) -> Self {
        Self { identity, data }
    }
}
