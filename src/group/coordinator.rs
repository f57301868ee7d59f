//! Per-channel locking for group windows.
//!
//! Each channel gets its own slot behind its own mutex, so windows in
//! different channels never wait on each other. The map of slots is only
//! locked long enough to find or create a slot.

use super::types::GroupEncounter;
use crate::core::error::{EngineError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

type Slot = Arc<Mutex<Option<GroupEncounter>>>;

const RETRY_INTERVAL: Duration = Duration::from_millis(2);

/// Waits up to `timeout` for `mutex`. `Ok(None)` means the wait timed out.
fn lock_within<T>(mutex: &Mutex<T>, timeout: Duration) -> Result<Option<MutexGuard<'_, T>>> {
    let deadline = Instant::now() + timeout;
    loop {
        match mutex.try_lock() {
            Ok(guard) => return Ok(Some(guard)),
            Err(TryLockError::Poisoned(_)) => return Err(EngineError::LockPoisoned),
            Err(TryLockError::WouldBlock) => {
                if Instant::now() >= deadline {
                    return Ok(None);
                }
                thread::sleep(RETRY_INTERVAL);
            }
        }
    }
}

pub struct GroupCoordinator {
    slots: Mutex<HashMap<String, Slot>>,
    lock_timeout: Duration,
}

impl GroupCoordinator {
    pub fn new(lock_timeout_ms: u64) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            lock_timeout: Duration::from_millis(lock_timeout_ms),
        }
    }

    fn slot(&self, channel: &str) -> Result<Slot> {
        let mut slots = self.slots.lock().map_err(|_| EngineError::LockPoisoned)?;
        Ok(slots.entry(channel.to_string()).or_default().clone())
    }

    /// Runs `f` with the channel's slot locked.
    ///
    /// Returns `Ok(None)` if the slot could not be locked within the
    /// configured timeout; `f` has not run in that case.
    pub fn with_slot<R>(
        &self,
        channel: &str,
        f: impl FnOnce(&mut Option<GroupEncounter>) -> R,
    ) -> Result<Option<R>> {
        let slot = self.slot(channel)?;
        let Some(mut guard) = lock_within(&slot, self.lock_timeout)? else {
            tracing::debug!(channel, "group slot busy");
            return Ok(None);
        };
        Ok(Some(f(&mut *guard)))
    }

    /// Puts a stored window back into its slot after a restart.
    /// An occupied slot is left alone.
    pub fn restore(&self, window: GroupEncounter) -> Result<bool> {
        let slot = self.slot(&window.channel)?;
        let mut guard = slot.lock().map_err(|_| EngineError::LockPoisoned)?;
        if guard.is_some() {
            return Ok(false);
        }
        *guard = Some(window);
        Ok(true)
    }

    /// Snapshot of a channel's window, if any.
    pub fn peek(&self, channel: &str) -> Result<Option<GroupEncounter>> {
        Ok(self.with_slot(channel, |slot| slot.clone())?.flatten())
    }
}

impl Default for GroupCoordinator {
    fn default() -> Self {
        Self::new(crate::core::balance::GROUP_LOCK_TIMEOUT_MS)
    }
}
