//! `dentalcare-events` — state-change publication (mechanics only).
//!
//! The session store publishes through this crate; the router and screens
//! subscribe. Nothing here knows about sessions or roles.

pub mod bus;
pub mod in_memory_bus;

pub use bus::{EventBus, Listener, ListenerId, Subscription};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
