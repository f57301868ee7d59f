//! Per-player action locks.
//!
//! An action holds the ids of every player it will write. A set of ids is
//! taken all at once or not at all, so closing a group window that touches
//! many players can never deadlock against single-player actions.

use crate::core::error::{EngineError, Result};
use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub(crate) struct ActorLocks {
    held: Mutex<HashSet<String>>,
    released: Condvar,
    timeout: Duration,
}

/// Releases its ids on drop.
pub(crate) struct ActorGuard<'a> {
    locks: &'a ActorLocks,
    ids: Vec<String>,
}

impl ActorLocks {
    pub(crate) fn new(timeout_ms: u64) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Takes every id in `ids`, waiting up to the timeout for all of them to
    /// be free. `Ok(None)` means the wait timed out and nothing was taken.
    pub(crate) fn acquire<S: AsRef<str>>(&self, ids: &[S]) -> Result<Option<ActorGuard<'_>>> {
        let deadline = Instant::now() + self.timeout;
        let mut held = self.held.lock().map_err(|_| EngineError::LockPoisoned)?;
        loop {
            if ids.iter().all(|id| !held.contains(id.as_ref())) {
                let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
                held.extend(ids.iter().cloned());
                return Ok(Some(ActorGuard { locks: self, ids }));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| EngineError::LockPoisoned)?;
            held = guard;
        }
    }

    pub(crate) fn acquire_one(&self, id: &str) -> Result<Option<ActorGuard<'_>>> {
        self.acquire(&[id])
    }
}

impl Drop for ActorGuard<'_> {
    fn drop(&mut self) {
        let mut held = match self.locks.held.lock() {
            Ok(held) => held,
            Err(poisoned) => poisoned.into_inner(),
        };
        for id in &self.ids {
            held.remove(id);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}
