//! One-time normalization of stored player records.
//!
//! Older records carry a single `active_injury` instead of the injury list
//! and may be missing derived fields. [`normalize_all`] brings every player
//! record up to [`RECORD_SCHEMA_VERSION`]. Running it twice is a no-op.

use crate::character::energy::max_energy;
use crate::character::record::{PlayerRecord, RECORD_SCHEMA_VERSION};
use crate::core::config::EngineConfig;
use crate::core::error::Result;
use crate::core::ports::{keys, Record, RecordStore};

/// Normalizes one record in place. Returns whether anything changed.
pub fn normalize_record(record: &mut PlayerRecord, config: &EngineConfig) -> bool {
    let before = record.clone();

    if let Some(injury) = record.legacy_injury.take() {
        if !record.injuries.contains(&injury) {
            record.injuries.push(injury);
        }
    }

    if record.display_name.trim().is_empty() {
        record.display_name = record.actor_id.clone();
    }

    let cap = record.level_cap(config);
    record.level = record.level.clamp(1, cap);
    if record.level == cap {
        record.xp = 0;
        record.xp_to_next = 0;
    } else {
        record.xp_to_next = config.progression.xp_curve.xp_for_level(record.level);
        if record.xp >= record.xp_to_next {
            record.xp = record.xp_to_next.saturating_sub(1);
        }
    }

    record.energy = record.energy.min(max_energy(record, &config.energy));
    record.schema_version = RECORD_SCHEMA_VERSION;

    *record != before
}

/// Normalizes every player record in `store`. Returns how many were rewritten.
pub fn normalize_all(store: &dyn RecordStore, config: &EngineConfig) -> Result<usize> {
    let mut rewritten = 0;
    for key in store.keys(keys::PLAYER_PREFIX)? {
        let Some(Record::Player(mut record)) = store.get(&key)? else {
            continue;
        };
        let from_version = record.schema_version;
        if normalize_record(&mut record, config) {
            tracing::debug!(actor = %record.actor_id, from_version, "normalized player record");
            store.put(&key, Record::Player(record))?;
            rewritten += 1;
        }
    }
    if rewritten > 0 {
        tracing::info!(rewritten, "normalized stored player records");
    }
    Ok(rewritten)
}
