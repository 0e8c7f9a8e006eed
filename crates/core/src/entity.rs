//! Entity trait: identity + continuity across state changes.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug + core::fmt::Display;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity persisted as one row of a named remote collection.
///
/// The serde representation of the type *is* the row shape; field names must
/// match the remote column names.
pub trait Record: Entity + Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Remote collection (table) name.
    const TABLE: &'static str;
}
