//! Tagged timer registry.
//!
//! Timers are keyed by a string tag. Registering a tag that already exists
//! replaces the earlier task, so a restart that re-registers every deadline
//! never ends up with duplicates.
//!
//! [`ManualScheduler`] runs tasks only when told to and is what tests and
//! the simulator use. With the `timers` feature, `TokioScheduler` drives the
//! same tasks from a tokio runtime.

use crate::core::error::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// A scheduled callback. Runs on whatever thread the scheduler uses.
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Tag for a channel's group-window deadline.
pub fn group_close_tag(channel: &str) -> String {
    format!("group-close:{channel}")
}

pub const BOSS_HUNT_HAUNTING_TAG: &str = "boss-hunt-haunting";
pub const ENERGY_REGEN_TAG: &str = "energy-regen";

pub trait Scheduler: Send + Sync {
    /// Runs `task` once at `at`. A time in the past runs on the next tick.
    fn schedule_at(&self, tag: &str, at: DateTime<Utc>, task: Task) -> Result<()>;

    /// Runs `task` every `period`, first one `period` from now.
    fn schedule_every(&self, tag: &str, period: Duration, task: Task) -> Result<()>;

    /// Drops the task under `tag`. Returns whether there was one.
    fn cancel(&self, tag: &str) -> Result<bool>;
}

fn check_period(tag: &str, period: Duration) -> Result<()> {
    if period <= Duration::zero() {
        return Err(EngineError::Scheduler(format!(
            "{tag}: period must be positive"
        )));
    }
    Ok(())
}

struct Entry {
    due: DateTime<Utc>,
    period: Option<Duration>,
    task: Task,
    /// Bumped on every registration, so a task re-registered while it was
    /// running is not clobbered when the old one is put back.
    generation: u64,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, Entry>,
    generation: u64,
}

/// Scheduler driven by explicit [`run_due`](ManualScheduler::run_due) calls.
pub struct ManualScheduler {
    registry: Mutex<Registry>,
    now: Mutex<DateTime<Utc>>,
}

impl ManualScheduler {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            now: Mutex::new(now),
        }
    }

    fn registry(&self) -> Result<std::sync::MutexGuard<'_, Registry>> {
        self.registry.lock().map_err(|_| EngineError::LockPoisoned)
    }

    fn current(&self) -> Result<DateTime<Utc>> {
        self.now
            .lock()
            .map(|now| *now)
            .map_err(|_| EngineError::LockPoisoned)
    }

    fn insert(&self, tag: &str, due: DateTime<Utc>, period: Option<Duration>, task: Task) -> Result<()> {
        let mut registry = self.registry()?;
        registry.generation += 1;
        let generation = registry.generation;
        let replaced = registry
            .entries
            .insert(
                tag.to_string(),
                Entry {
                    due,
                    period,
                    task,
                    generation,
                },
            )
            .is_some();
        tracing::debug!(tag, %due, replaced, "task scheduled");
        Ok(())
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Result<Vec<String>> {
        let mut tags: Vec<String> = self.registry()?.entries.keys().cloned().collect();
        tags.sort();
        Ok(tags)
    }

    pub fn next_due(&self, tag: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.registry()?.entries.get(tag).map(|e| e.due))
    }

    /// Runs every task due at or before `now`, earliest first. Periodic tasks
    /// run once per elapsed period. Tasks run without the registry locked, so
    /// they may schedule or cancel other tasks.
    ///
    /// Returns how many task runs happened.
    pub fn run_due(&self, now: DateTime<Utc>) -> Result<usize> {
        {
            let mut current = self.now.lock().map_err(|_| EngineError::LockPoisoned)?;
            *current = now;
        }
        let mut ran = 0;
        loop {
            let (tag, mut entry) = {
                let mut registry = self.registry()?;
                let next = registry
                    .entries
                    .iter()
                    .filter(|(_, e)| e.due <= now)
                    .min_by_key(|(_, e)| e.due)
                    .map(|(tag, _)| tag.clone());
                let Some(tag) = next else {
                    break;
                };
                let Some(entry) = registry.entries.remove(&tag) else {
                    break;
                };
                (tag, entry)
            };

            (entry.task)();
            ran += 1;

            if let Some(period) = entry.period {
                entry.due += period;
                let mut registry = self.registry()?;
                let superseded = registry
                    .entries
                    .get(&tag)
                    .is_some_and(|e| e.generation > entry.generation);
                if !superseded {
                    registry.entries.insert(tag, entry);
                }
            }
        }
        Ok(ran)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_at(&self, tag: &str, at: DateTime<Utc>, task: Task) -> Result<()> {
        self.insert(tag, at, None, task)
    }

    fn schedule_every(&self, tag: &str, period: Duration, task: Task) -> Result<()> {
        check_period(tag, period)?;
        let first = self.current()? + period;
        self.insert(tag, first, Some(period), task)
    }

    fn cancel(&self, tag: &str) -> Result<bool> {
        let removed = self.registry()?.entries.remove(tag).is_some();
        if removed {
            tracing::debug!(tag, "task cancelled");
        }
        Ok(removed)
    }
}

#[cfg(feature = "timers")]
pub use self::timers::TokioScheduler;

#[cfg(feature = "timers")]
mod timers {
    use super::{check_period, Scheduler, Task};
    use crate::core::error::{EngineError, Result};
    use chrono::{DateTime, Duration, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::runtime::Handle;
    use tokio::task::JoinHandle;

    /// Runs tasks on a tokio runtime. Each task body runs on the blocking
    /// pool, since engine actions take std mutexes.
    pub struct TokioScheduler {
        handle: Handle,
        tasks: Mutex<HashMap<String, JoinHandle<()>>>,
    }

    impl TokioScheduler {
        pub fn new(handle: Handle) -> Self {
            Self {
                handle,
                tasks: Mutex::new(HashMap::new()),
            }
        }

        /// Uses the runtime the caller is running on.
        pub fn current() -> Result<Self> {
            let handle = Handle::try_current()
                .map_err(|e| EngineError::Scheduler(format!("no tokio runtime: {e}")))?;
            Ok(Self::new(handle))
        }

        fn register(&self, tag: &str, join: JoinHandle<()>) -> Result<()> {
            let mut tasks = self.tasks.lock().map_err(|_| EngineError::LockPoisoned)?;
            tasks.retain(|_, handle| !handle.is_finished());
            if let Some(old) = tasks.insert(tag.to_string(), join) {
                old.abort();
            }
            Ok(())
        }
    }

    impl Scheduler for TokioScheduler {
        fn schedule_at(&self, tag: &str, at: DateTime<Utc>, mut task: Task) -> Result<()> {
            let delay = (at - Utc::now()).to_std().unwrap_or_default();
            let name = tag.to_string();
            let join = self.handle.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(err) = tokio::task::spawn_blocking(move || task()).await {
                    tracing::warn!(tag = %name, %err, "scheduled task failed");
                }
            });
            self.register(tag, join)
        }

        fn schedule_every(&self, tag: &str, period: Duration, task: Task) -> Result<()> {
            check_period(tag, period)?;
            let period = period
                .to_std()
                .map_err(|e| EngineError::Scheduler(format!("{tag}: {e}")))?;
            let name = tag.to_string();
            let join = self.handle.spawn(async move {
                let mut task = task;
                loop {
                    tokio::time::sleep(period).await;
                    task = match tokio::task::spawn_blocking(move || {
                        task();
                        task
                    })
                    .await
                    {
                        Ok(task) => task,
                        Err(err) => {
                            tracing::warn!(tag = %name, %err, "periodic task failed, stopping");
                            break;
                        }
                    };
                }
            });
            self.register(tag, join)
        }

        fn cancel(&self, tag: &str) -> Result<bool> {
            let mut tasks = self.tasks.lock().map_err(|_| EngineError::LockPoisoned)?;
            match tasks.remove(tag) {
                Some(handle) => {
                    handle.abort();
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }
}
