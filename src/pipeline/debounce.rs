//! Trailing-edge debounce for amount edits.
//!
//! Every [`Debouncer::push`] aborts the previous timer and starts a new one.
//! When a timer runs out its value is sent on the settled channel, tagged
//! with the generation it was pushed under. A value that was sent just
//! before a newer push won the race is rejected by [`Debouncer::accept`],
//! so only the most recent edit can ever settle.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A value whose quiet period elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settled<T> {
    generation: u64,
    value: T,
}

/// Single-slot debouncer backed by a tokio timer task.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet_period: Duration,
    settled_tx: mpsc::UnboundedSender<Settled<T>>,
    pending: Option<JoinHandle<()>>,
    generation: u64,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer and the receiver its settled values arrive on.
    pub fn new(quiet_period: Duration) -> (Self, mpsc::UnboundedReceiver<Settled<T>>) {
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            quiet_period,
            settled_tx,
            pending: None,
            generation: 0,
        };
        (debouncer, settled_rx)
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Replace whatever is pending with `value` and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.cancel();

        let generation = self.generation;
        let quiet_period = self.quiet_period;
        let tx = self.settled_tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            // A closed receiver means the owner is gone.
            let _ = tx.send(Settled { generation, value });
        }));
    }

    /// Drop the pending value, if any.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a value is still waiting for its quiet period to end.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Unwrap a settled value if it belongs to the latest push.
    pub fn accept(&mut self, settled: Settled<T>) -> Option<T> {
        if settled.generation != self.generation {
            log::debug!(
                "discarding settled value from generation {} (current {})",
                settled.generation,
                self.generation
            );
            return None;
        }
        self.pending = None;
        Some(settled.value)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
