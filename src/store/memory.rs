//! In-process record store.

use crate::core::error::{EngineError, Result};
use crate::core::ports::{Record, RecordStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// A keyed map behind a `RwLock`, with a dirty flag set by every write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Record>>,
    dirty: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = (String, Record)>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
            dirty: AtomicBool::new(false),
        }
    }

    /// All records, ordered by key.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Record>> {
        let records = self.records.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(records
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clears the dirty flag, returning whether it was set.
    pub(crate) fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Record>> {
        let records = self.records.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(records.get(key).cloned())
    }

    fn put(&self, key: &str, record: Record) -> Result<()> {
        let mut records = self.records.write().map_err(|_| EngineError::LockPoisoned)?;
        records.insert(key.to_string(), record);
        self.mark_dirty();
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut records = self.records.write().map_err(|_| EngineError::LockPoisoned)?;
        if records.remove(key).is_some() {
            self.mark_dirty();
        }
        Ok(())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let records = self.records.read().map_err(|_| EngineError::LockPoisoned)?;
        let mut keys: Vec<String> = records
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn flush_if_dirty(&self) -> Result<()> {
        self.take_dirty();
        Ok(())
    }
}
