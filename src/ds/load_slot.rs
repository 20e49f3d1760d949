//! One-shot completion cell shared by every caller of one key generation.
//!
//! A `LoadSlot` is created alongside a freshly inserted cache entry. The
//! first caller to [`acquire`](LoadSlot::acquire) it becomes the leader and
//! receives a [`LoadGuard`]; everyone arriving while the leader runs blocks
//! on the slot's condition variable and is woken with the leader's outcome.
//!
//! ```text
//!            acquire()               complete(Ok)
//!   Pending ───────────► Loading ─────────────────► Completed(Arc<V>)
//!                           │
//!                           ├──── complete(Err) ──► Failed(E)
//!                           │
//!                           └──── guard dropped ──► Abandoned
//! ```
//!
//! A slot is never re-armed. Retrying after a failure means building a new
//! slot for a new generation of the key.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

enum SlotState<V, E> {
    Pending,
    Loading,
    Completed(Arc<V>),
    Failed(E),
    Abandoned,
}

impl<V, E> SlotState<V, E> {
    fn name(&self) -> &'static str {
        match self {
            SlotState::Pending => "pending",
            SlotState::Loading => "loading",
            SlotState::Completed(_) => "completed",
            SlotState::Failed(_) => "failed",
            SlotState::Abandoned => "abandoned",
        }
    }
}

/// What a caller gets back from [`LoadSlot::acquire`].
pub enum Acquire<'a, V, E> {
    /// This caller won the slot and must run the load.
    Leader(LoadGuard<'a, V, E>),
    /// The load already finished; this is its outcome.
    Ready(Result<Arc<V>, E>),
    /// The leader went away without completing the slot.
    Abandoned,
}

pub struct LoadSlot<V, E> {
    generation: u64,
    state: Mutex<SlotState<V, E>>,
    ready: Condvar,
}

impl<V, E> LoadSlot<V, E> {
    pub fn new(generation: u64) -> Self {
        Self {
            generation,
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }

    /// Generation of the cache entry this slot belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Claims the slot, or waits for whoever claimed it first.
    ///
    /// Blocks only while another caller holds the [`LoadGuard`].
    pub fn acquire(&self) -> Acquire<'_, V, E>
    where
        E: Clone,
    {
        let mut state = self.state.lock();
        loop {
            match &*state {
                SlotState::Pending => {
                    *state = SlotState::Loading;
                    return Acquire::Leader(LoadGuard {
                        slot: self,
                        done: false,
                    });
                },
                SlotState::Loading => self.ready.wait(&mut state),
                SlotState::Completed(value) => return Acquire::Ready(Ok(Arc::clone(value))),
                SlotState::Failed(err) => return Acquire::Ready(Err(err.clone())),
                SlotState::Abandoned => return Acquire::Abandoned,
            }
        }
    }

    /// Returns the value if the load completed successfully. Never blocks.
    pub fn peek(&self) -> Option<Arc<V>> {
        match &*self.state.lock() {
            SlotState::Completed(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    fn publish(&self, next: SlotState<V, E>) {
        *self.state.lock() = next;
        self.ready.notify_all();
    }
}

impl<V, E> fmt::Debug for LoadSlot<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSlot")
            .field("generation", &self.generation)
            .field("state", &self.state.lock().name())
            .finish()
    }
}

/// Proof of leadership over a [`LoadSlot`].
///
/// Dropping the guard without calling [`complete`](LoadGuard::complete)
/// (a panicking loader) marks the slot abandoned and wakes all waiters.
#[must_use = "waiters stay blocked until the guard is completed or dropped"]
pub struct LoadGuard<'a, V, E> {
    slot: &'a LoadSlot<V, E>,
    done: bool,
}

impl<V, E> LoadGuard<'_, V, E> {
    /// Stores the load outcome, wakes every waiter, and returns the outcome
    /// as the waiters will see it.
    pub fn complete(mut self, result: Result<V, E>) -> Result<Arc<V>, E>
    where
        E: Clone,
    {
        // `done` is set only once published: if building the shared state
        // unwinds (a panicking `E::clone`), `Drop` abandons the slot.
        let (published, outcome) = match result {
            Ok(value) => {
                let value = Arc::new(value);
                (SlotState::Completed(Arc::clone(&value)), Ok(value))
            },
            Err(err) => (SlotState::Failed(err.clone()), Err(err)),
        };
        self.slot.publish(published);
        self.done = true;
        outcome
    }
}

impl<V, E> Drop for LoadGuard<'_, V, E> {
    fn drop(&mut self) {
        if !self.done {
            self.slot.publish(SlotState::Abandoned);
        }
    }
}
