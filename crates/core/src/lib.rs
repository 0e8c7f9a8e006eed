//! `dentalcare-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by every clinic module
//! (no IO, no remote service concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::{Entity, Record};
pub use error::{DomainError, DomainResult};
pub use id::RecordId;
pub use value_object::{Money, ValueObject};
