use std::fmt::Display;
use std::sync::Mutex;

use serde::Serialize;

/// Data state of one screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ScreenState<T> {
    Loading,
    Ready(T),
    /// Message shown with a retry control.
    Failed(String),
}

impl<T> ScreenState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            ScreenState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ScreenState::Loading)
    }
}

/// Issued by [`ScreenSlot::begin`]; only the latest ticket may settle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Debug)]
struct Slot<T> {
    state: ScreenState<T>,
    issued: u64,
}

/// Holds a screen's state and discards results of superseded loads.
#[derive(Debug)]
pub struct ScreenSlot<T> {
    inner: Mutex<Slot<T>>,
}

impl<T> Default for ScreenSlot<T> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Slot {
                state: ScreenState::Loading,
                issued: 0,
            }),
        }
    }
}

impl<T: Clone> ScreenSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScreenState<T> {
        match self.inner.lock() {
            Ok(slot) => slot.state.clone(),
            Err(poisoned) => poisoned.into_inner().state.clone(),
        }
    }

    /// Start a load; the state goes back to `Loading`.
    pub fn begin(&self) -> LoadTicket {
        let Ok(mut slot) = self.inner.lock() else {
            return LoadTicket(0);
        };
        slot.issued += 1;
        slot.state = ScreenState::Loading;
        LoadTicket(slot.issued)
    }

    /// Store the outcome of `ticket`'s load.
    ///
    /// Dropped (returns `false`) when a newer load was started or the screen
    /// is no longer mounted for the same identity.
    pub fn settle<E: Display>(&self, ticket: LoadTicket, still_mounted: bool, result: Result<T, E>) -> bool {
        let Ok(mut slot) = self.inner.lock() else {
            return false;
        };
        if !still_mounted || ticket.0 != slot.issued {
            tracing::debug!(ticket = ticket.0, latest = slot.issued, still_mounted, "discarding stale load");
            return false;
        }
        slot.state = match result {
            Ok(data) => ScreenState::Ready(data),
            Err(e) => ScreenState::Failed(e.to_string()),
        };
        true
    }
}
