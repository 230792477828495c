//! Per-session serialization
//!
//! Two keypresses for the same session must not both read the same step.
//! Each session id maps to an async mutex for as long as someone holds or
//! waits on it; the entry is dropped with its last guard.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

type Slot = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub struct SessionLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Exclusive access to one session until dropped
pub struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    session_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other event for `session_id` is in flight
    pub async fn acquire(&self, session_id: &str) -> SessionGuard<'_> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(session_id.to_string()).or_default())
        };
        let guard = slot.lock_owned().await;
        SessionGuard {
            locks: self,
            session_id: session_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Sessions currently locked or awaited
    #[allow(dead_code)] // Used in tests
    pub fn active(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        // Release first so the strong count below only sees waiters
        self.guard.take();
        let mut slots = self
            .locks
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slots
            .get(&self.session_id)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.session_id);
        }
    }
}
