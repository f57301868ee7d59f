//! File-backed record store.
//!
//! Records live in a [`MemoryStore`]; `flush_if_dirty` writes the whole map
//! as one snapshot:
//!
//! - magic (8 bytes, little endian)
//! - payload length (4 bytes, little endian)
//! - bincode payload
//! - SHA-256 over the three fields above (32 bytes)
//!
//! The snapshot goes to a sibling temp file first and is renamed over the
//! old one, so a crash mid-write leaves the previous snapshot intact.

use super::memory::MemoryStore;
use crate::character::record::PlayerRecord;
use crate::core::error::{EngineError, Result};
use crate::core::ports::{keys, Record, RecordStore};
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// "QENGSNP1"
const SNAPSHOT_MAGIC: u64 = 0x3150_4E53_474E_4551;
const HEADER_LEN: usize = 12;
const CHECKSUM_LEN: usize = 32;

fn checksum(magic: &[u8], len: &[u8], data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(magic);
    hasher.update(len);
    hasher.update(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn encode_snapshot(records: &BTreeMap<String, Record>) -> Result<Vec<u8>> {
    let data = bincode::serialize(records)?;
    let len = u32::try_from(data.len())
        .map_err(|_| EngineError::Serialization("snapshot exceeds 4 GiB".to_string()))?;
    let magic = SNAPSHOT_MAGIC.to_le_bytes();
    let len = len.to_le_bytes();
    let sum = checksum(&magic, &len, &data);

    let mut out = Vec::with_capacity(HEADER_LEN + data.len() + CHECKSUM_LEN);
    out.extend_from_slice(&magic);
    out.extend_from_slice(&len);
    out.extend_from_slice(&data);
    out.extend_from_slice(&sum);
    Ok(out)
}

fn decode_snapshot(bytes: &[u8]) -> Result<BTreeMap<String, Record>> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(EngineError::Serialization(format!(
            "snapshot truncated: {} bytes",
            bytes.len()
        )));
    }
    let (magic, rest) = bytes.split_at(8);
    let (len, rest) = rest.split_at(4);

    let mut magic_bytes = [0u8; 8];
    magic_bytes.copy_from_slice(magic);
    let found = u64::from_le_bytes(magic_bytes);
    if found != SNAPSHOT_MAGIC {
        return Err(EngineError::Serialization(format!(
            "invalid snapshot magic: expected 0x{SNAPSHOT_MAGIC:016X}, got 0x{found:016X}"
        )));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(len);
    let data_len = u32::from_le_bytes(len_bytes) as usize;
    if rest.len() != data_len + CHECKSUM_LEN {
        return Err(EngineError::Serialization(format!(
            "snapshot length mismatch: header says {data_len}, file holds {}",
            rest.len().saturating_sub(CHECKSUM_LEN)
        )));
    }
    let (data, stored) = rest.split_at(data_len);

    if checksum(magic, len, data).as_slice() != stored {
        return Err(EngineError::ChecksumMismatch);
    }
    Ok(bincode::deserialize(data)?)
}

/// A [`MemoryStore`] persisted to a single snapshot file.
pub struct FileStore {
    memory: MemoryStore,
    path: PathBuf,
    /// Serializes snapshot writes.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Default snapshot location: `<data dir>/quest-engine/records.dat`.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "quest-engine").ok_or_else(|| {
            EngineError::StoreUnavailable("could not determine data directory".to_string())
        })?;
        Ok(dirs.data_dir().join("records.dat"))
    }

    /// Opens the store at `path`, loading the snapshot if one exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let memory = if path.exists() {
            let bytes = fs::read(&path)?;
            let records = decode_snapshot(&bytes)?;
            tracing::info!(path = %path.display(), records = records.len(), "loaded record snapshot");
            MemoryStore::from_records(records)
        } else {
            tracing::info!(path = %path.display(), "no record snapshot, starting empty");
            MemoryStore::new()
        };
        Ok(Self {
            memory,
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads a JSON dump of player records keyed by actor id, overwriting
    /// records with the same id. Returns how many were imported.
    ///
    /// The dump may use older field names; run
    /// [`normalize_all`](super::migration::normalize_all) afterwards.
    pub fn import_json(&self, path: &Path) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        let players: BTreeMap<String, PlayerRecord> = serde_json::from_str(&json)?;
        let count = players.len();
        for (id, mut record) in players {
            if record.actor_id.is_empty() {
                record.actor_id = id;
            }
            let key = keys::player(&record.actor_id);
            self.memory.put(&key, Record::Player(record))?;
        }
        tracing::info!(path = %path.display(), count, "imported legacy player dump");
        Ok(count)
    }

    /// Writes the snapshot unconditionally.
    pub fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| EngineError::LockPoisoned)?;
        self.write_snapshot()
    }

    fn write_snapshot(&self) -> Result<()> {
        let records = self.memory.snapshot()?;
        let bytes = encode_snapshot(&records)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("dat.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "wrote record snapshot");
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Record>> {
        self.memory.get(key)
    }

    fn put(&self, key: &str, record: Record) -> Result<()> {
        self.memory.put(key, record)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.memory.remove(key)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        self.memory.keys(prefix)
    }

    fn flush_if_dirty(&self) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(|_| EngineError::LockPoisoned)?;
        if !self.memory.take_dirty() {
            return Ok(());
        }
        if let Err(err) = self.write_snapshot() {
            // keep the pending writes for the next flush
            self.memory.mark_dirty();
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::core::ports::RecordStoreExt;
    use crate::dungeon::types::{DungeonMode, DungeonRun};
    use chrono::Utc;
    use tempfile::tempdir;

    fn player(id: &str, level: u32) -> PlayerRecord {
        let mut record = PlayerRecord::new(id, id, Utc::now(), &EngineConfig::default());
        record.level = level;
        record
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.dat");

        let store = FileStore::open(&path).unwrap();
        store.put_player(player("u1", 7)).unwrap();
        store
            .put(
                &keys::dungeon("u1"),
                Record::DungeonRun(DungeonRun::new("u1", "#quest", DungeonMode::Step, Utc::now())),
            )
            .unwrap();
        store.flush_if_dirty().unwrap();
        assert!(path.exists());

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get_player("u1").unwrap().unwrap().level, 7);
        assert!(reopened.get_dungeon_run("u1").unwrap().is_some());
    }

    #[test]
    fn test_clean_store_does_not_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.dat");
        let store = FileStore::open(&path).unwrap();
        store.flush_if_dirty().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupted_snapshot_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.dat");
        let store = FileStore::open(&path).unwrap();
        store.put_player(player("u1", 3)).unwrap();
        store.flush().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        let middle = HEADER_LEN + 4;
        bytes[middle] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            FileStore::open(&path),
            Err(EngineError::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_wrong_magic_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.dat");
        fs::write(&path, vec![0u8; 64]).unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(EngineError::Serialization(_))
        ));
    }

    #[test]
    fn test_import_json_fills_missing_ids() {
        let dir = tempdir().unwrap();
        let dump = dir.path().join("players.json");
        fs::write(
            &dump,
            r#"{
                "alice": { "display_name": "Alice", "level": 5, "xp": 20 },
                "bob": { "actor_id": "bob", "display_name": "Bob", "level": 2 }
            }"#,
        )
        .unwrap();

        let store = FileStore::open(dir.path().join("records.dat")).unwrap();
        assert_eq!(store.import_json(&dump).unwrap(), 2);
        let alice = store.get_player("alice").unwrap().unwrap();
        assert_eq!(alice.actor_id, "alice");
        assert_eq!(alice.level, 5);
        assert!(store.get_player("bob").unwrap().is_some());
    }
}
