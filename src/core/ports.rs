//! Interfaces to the services the engine runs inside of.
//!
//! The chat transport, the durable store, narrative content and the wall
//! clock all belong to the host. The engine only sees these traits.

use crate::boss_hunt::types::BossHuntState;
use crate::character::record::PlayerRecord;
use crate::core::error::{EngineError, Result};
use crate::dungeon::types::DungeonRun;
use crate::group::types::GroupEncounter;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

// =============================================================================
// RECORD STORE
// =============================================================================

/// Everything the engine persists, one variant per key family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Record {
    Player(PlayerRecord),
    Group(GroupEncounter),
    BossHunt(BossHuntState),
    DungeonRun(DungeonRun),
}

/// Key builders for the store layout.
pub mod keys {
    pub const PLAYER_PREFIX: &str = "player:";
    pub const GROUP_PREFIX: &str = "group:";
    pub const DUNGEON_PREFIX: &str = "dungeon:";
    pub const BOSS_HUNT: &str = "boss_hunt";

    pub fn player(actor_id: &str) -> String {
        format!("{PLAYER_PREFIX}{actor_id}")
    }

    pub fn group(channel: &str) -> String {
        format!("{GROUP_PREFIX}{channel}")
    }

    pub fn dungeon(actor_id: &str) -> String {
        format!("{DUNGEON_PREFIX}{actor_id}")
    }
}

/// Keyed last-write-wins storage. Writes to different keys must be safe
/// from different threads. No multi-key transactions are assumed.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Record>>;
    fn put(&self, key: &str, record: Record) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// All keys starting with `prefix`, sorted.
    fn keys(&self, prefix: &str) -> Result<Vec<String>>;
    /// Persist pending writes, if any.
    fn flush_if_dirty(&self) -> Result<()>;
}

fn wrong_shape(key: &str) -> EngineError {
    EngineError::StoreUnavailable(format!("record at {key} has an unexpected type"))
}

/// Typed accessors over any [`RecordStore`].
pub trait RecordStoreExt: RecordStore {
    fn get_player(&self, actor_id: &str) -> Result<Option<PlayerRecord>> {
        let key = keys::player(actor_id);
        match self.get(&key)? {
            None => Ok(None),
            Some(Record::Player(record)) => Ok(Some(record)),
            Some(_) => Err(wrong_shape(&key)),
        }
    }

    fn put_player(&self, record: PlayerRecord) -> Result<()> {
        let key = keys::player(&record.actor_id);
        self.put(&key, Record::Player(record))
    }

    fn get_group(&self, channel: &str) -> Result<Option<GroupEncounter>> {
        let key = keys::group(channel);
        match self.get(&key)? {
            None => Ok(None),
            Some(Record::Group(window)) => Ok(Some(window)),
            Some(_) => Err(wrong_shape(&key)),
        }
    }

    fn get_dungeon_run(&self, actor_id: &str) -> Result<Option<DungeonRun>> {
        let key = keys::dungeon(actor_id);
        match self.get(&key)? {
            None => Ok(None),
            Some(Record::DungeonRun(run)) => Ok(Some(run)),
            Some(_) => Err(wrong_shape(&key)),
        }
    }

    fn get_boss_hunt(&self) -> Result<Option<BossHuntState>> {
        match self.get(keys::BOSS_HUNT)? {
            None => Ok(None),
            Some(Record::BossHunt(state)) => Ok(Some(state)),
            Some(_) => Err(wrong_shape(keys::BOSS_HUNT)),
        }
    }
}

impl<T: RecordStore + ?Sized> RecordStoreExt for T {}

// =============================================================================
// CONTENT
// =============================================================================

/// Read-only narrative and catalog content, addressed by dotted path.
pub trait ContentLookup: Send + Sync {
    fn lookup(&self, path: &str) -> Option<serde_json::Value>;
}

/// Looks up `path` and deserializes it, falling back to `default` with a
/// warning when the key is missing or has the wrong shape.
pub fn lookup_or<T: serde::de::DeserializeOwned>(
    content: &dyn ContentLookup,
    path: &str,
    default: T,
) -> T {
    match content.lookup(path) {
        None => {
            tracing::warn!(path, "content key missing, using default");
            default
        }
        Some(value) => match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(path, %err, "content key malformed, using default");
                default
            }
        },
    }
}

// =============================================================================
// CLOCK
// =============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, UTC-normalized.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and the simulator.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Where a notification goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Channel(String),
    Actor(String),
}

/// Fire-and-forget delivery. A failed delivery never rolls back an action.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, target: Target, message: String);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn emit(&self, target: Target, message: String) {
        tracing::info!(?target, "{message}");
    }
}

/// Collects notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<(Target, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything emitted so far.
    pub fn messages(&self) -> Vec<(Target, String)> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages sent to one channel.
    pub fn channel_messages(&self, channel: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|(target, message)| match target {
                Target::Channel(c) if c == channel => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl NotificationSink for MemorySink {
    fn emit(&self, target: Target, message: String) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((target, message));
        }
    }
}
