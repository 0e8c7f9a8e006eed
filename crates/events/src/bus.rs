//! Publish/subscribe abstraction for state-change notifications.
//!
//! Two ways to consume a bus:
//!
//! - **Listeners** are invoked synchronously, in registration order, inside
//!   `publish()`. When `publish()` returns every listener has observed the
//!   message. Use these for anything that must never act on stale state
//!   (route re-evaluation).
//! - **Subscriptions** receive a copy of each message over a channel and drain
//!   it at their own pace (logging, diagnostics, tests).
//!
//! Listeners run outside the bus's internal locks, so a listener may publish or
//! (un)register listeners; a nested publish is delivered before the outer
//! publish resumes with the remaining listeners.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// Handle returned by [`EventBus::listen`]; pass it to [`EventBus::unlisten`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Synchronous message handler.
pub type Listener<M> = Arc<dyn Fn(&M) + Send + Sync>;

/// A channel subscription to a bus.
///
/// ```ignore
/// let subscription = bus.subscribe();
/// while let Ok(message) = subscription.try_recv() {
///     handle(message);
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Transport-agnostic pub/sub bus.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Deliver `message` to every listener (synchronously) and subscription.
    fn publish(&self, message: M) -> Result<(), Self::Error>;

    /// Open a channel subscription.
    fn subscribe(&self) -> Subscription<M>;

    /// Register a synchronous listener.
    fn listen(&self, listener: Listener<M>) -> ListenerId;

    /// Remove a listener. Returns `false` if it was already gone.
    fn unlisten(&self, id: ListenerId) -> bool;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn listen(&self, listener: Listener<M>) -> ListenerId {
        (**self).listen(listener)
    }

    fn unlisten(&self, id: ListenerId) -> bool {
        (**self).unlisten(id)
    }
}
