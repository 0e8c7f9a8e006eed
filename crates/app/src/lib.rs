//! `dentalcare-app` — the clinic admin client without its rendering layer.
//!
//! - [`session`]: the process-wide session store mirroring the identity provider
//! - [`guard`] and [`router`]: which screen may render for the current session
//! - [`pages`]: per-screen view models over the remote collections
//!
//! Everything hangs off an [`AppContext`], created once per process.

pub mod context;
pub mod guard;
pub mod pages;
pub mod router;
pub mod screen_state;
pub mod session;

pub use context::{AppContext, Clock};
pub use guard::{Decision, evaluate};
pub use router::{MountToken, NavItem, Router, Screen, View};
pub use screen_state::{LoadTicket, ScreenSlot, ScreenState};
pub use session::{SessionError, SessionSnapshot, SessionState, SessionStore};
