//! One-shot completion handles for async exchange requests.
//!
//! A `Completion` is the receiving half of a one-shot channel. The
//! simulated exchange returns completions that are already resolved, so
//! the session handles them synchronously; live adapters resolve them
//! from their own threads.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

/// Result of polling a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionStatus<T> {
    /// The value arrived.
    Ready(T),
    /// Still outstanding.
    Pending,
    /// The resolver was dropped without resolving; the awaited work
    /// failed and must be wrapped as an internal error.
    Dropped,
}

/// Receiving half of a one-shot async response.
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<T>,
}

impl<T> Completion<T> {
    /// A completion that is already resolved.
    pub fn ready(value: T) -> Self {
        let (tx, rx) = bounded(1);
        // A bounded(1) send into a fresh channel cannot fail.
        let _ = tx.send(value);
        Self { rx }
    }

    /// A pending completion plus the resolver that fulfils it.
    pub fn pending() -> (Resolver<T>, Self) {
        let (tx, rx) = bounded(1);
        (Resolver { tx }, Self { rx })
    }

    /// Non-blocking poll.
    pub fn poll(&self) -> CompletionStatus<T> {
        match self.rx.try_recv() {
            Ok(value) => CompletionStatus::Ready(value),
            Err(TryRecvError::Empty) => CompletionStatus::Pending,
            Err(TryRecvError::Disconnected) => CompletionStatus::Dropped,
        }
    }

    /// Block until resolved. `None` if the resolver was dropped.
    pub fn wait(&self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// Sending half of a one-shot async response.
#[derive(Debug)]
pub struct Resolver<T> {
    tx: Sender<T>,
}

impl<T> Resolver<T> {
    /// Resolve the completion. Dropped receivers are ignored.
    pub fn resolve(self, value: T) {
        let _ = self.tx.send(value);
    }
}
