//! The process-wide session: who is signed in and with which role.

pub mod state;
pub mod store;

pub use state::{SessionError, SessionSnapshot, SessionState};
pub use store::SessionStore;
