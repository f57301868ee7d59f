//! The durable per-player record.

use crate::character::hardcore::HardcoreState;
use crate::core::config::EngineConfig;
use crate::effects::buffs::CombatBuff;
use crate::effects::injury::Injury;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current shape of [`PlayerRecord`]. Older records are normalized once at startup.
pub const RECORD_SCHEMA_VERSION: u32 = 2;

/// Item key to count.
pub type ItemCounts = BTreeMap<String, u32>;

/// Challenge path state for the current prestige.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeState {
    pub active_path: Option<String>,
    pub completed_paths: BTreeSet<String>,
    pub medkits_used_this_prestige: u32,
}

/// Dungeon sub-state that outlives a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonProgress {
    /// Counter items drawn for the next run.
    pub equipped: Vec<String>,
    /// Counter items earned from drops.
    pub stock: ItemCounts,
    pub momentum: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    /// Consecutive failed runs. Reset by a completion.
    pub failure_streak: u32,
    pub relic_charges: u32,
}

/// Unlocked abilities and when each was last used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityState {
    pub unlocked: BTreeSet<String>,
    pub last_used: BTreeMap<String, DateTime<Utc>>,
}

/// Lifetime counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    pub wins: u64,
    pub losses: u64,
    pub win_streak: u32,
    pub last_win_day: Option<NaiveDate>,
    pub hardcore_completions: u32,
    pub hardcore_deaths: u32,
    pub highest_hardcore_level: u32,
    pub dungeons_completed: u32,
    pub dungeons_failed: u32,
    pub boss_clues: u32,
    pub total_prestiges: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerRecord {
    pub schema_version: u32,
    pub actor_id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,

    pub level: u32,
    pub xp: u64,
    pub xp_to_next: u64,
    pub prestige: u32,
    pub transcendence: u32,

    pub energy: u32,
    /// Fractional regeneration not yet credited.
    pub energy_regen_carry: f64,
    /// `Some` exactly while the hardcore track is active.
    pub hardcore: Option<HardcoreState>,

    pub challenge: ChallengeState,
    pub class_name: Option<String>,

    pub inventory: ItemCounts,
    /// Items set aside while hardcore is active.
    pub locker: ItemCounts,
    /// Items exempt from the hardcore locker.
    pub permanent_items: BTreeSet<String>,
    /// Candidates for the one-time permanent pick after a hardcore completion.
    pub pending_permanent_choice: Option<BTreeSet<String>>,

    pub injuries: Vec<Injury>,
    pub buffs: Vec<CombatBuff>,

    pub dungeon: DungeonProgress,
    pub abilities: AbilityState,
    pub history: History,
    pub last_solo_at: Option<DateTime<Utc>>,

    /// Pre-list single injury. Moved into `injuries` by normalization.
    #[serde(alias = "active_injury")]
    pub legacy_injury: Option<Injury>,
}

impl Default for PlayerRecord {
    fn default() -> Self {
        Self {
            schema_version: 0,
            actor_id: String::new(),
            display_name: String::new(),
            created_at: DateTime::<Utc>::default(),
            level: 1,
            xp: 0,
            xp_to_next: 0,
            prestige: 0,
            transcendence: 0,
            energy: 0,
            energy_regen_carry: 0.0,
            hardcore: None,
            challenge: ChallengeState::default(),
            class_name: None,
            inventory: ItemCounts::new(),
            locker: ItemCounts::new(),
            permanent_items: BTreeSet::new(),
            pending_permanent_choice: None,
            injuries: Vec::new(),
            buffs: Vec::new(),
            dungeon: DungeonProgress::default(),
            abilities: AbilityState::default(),
            history: History::default(),
            last_solo_at: None,
            legacy_injury: None,
        }
    }
}

impl PlayerRecord {
    /// A fresh level-1 record with full energy.
    pub fn new(
        actor_id: impl Into<String>,
        display_name: impl Into<String>,
        now: DateTime<Utc>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            schema_version: RECORD_SCHEMA_VERSION,
            actor_id: actor_id.into(),
            display_name: display_name.into(),
            created_at: now,
            xp_to_next: config.progression.xp_curve.xp_for_level(1),
            energy: config.energy.base_max,
            ..Self::default()
        }
    }

    pub fn is_hardcore(&self) -> bool {
        self.hardcore.is_some()
    }

    /// Level cap for the record's current track.
    pub fn level_cap(&self, config: &EngineConfig) -> u32 {
        if self.is_hardcore() {
            config.progression.hardcore_level_cap
        } else {
            config.progression.level_cap
        }
    }

    pub fn item_count(&self, key: &str) -> u32 {
        self.inventory.get(key).copied().unwrap_or(0)
    }

    pub fn add_item(&mut self, key: &str, amount: u32) {
        if amount == 0 {
            return;
        }
        *self.inventory.entry(key.to_string()).or_insert(0) += amount;
    }

    /// Removes one of `key`. Returns false (and changes nothing) if none are held.
    pub fn take_item(&mut self, key: &str) -> bool {
        match self.inventory.get_mut(key) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.inventory.remove(key);
                }
                true
            }
            _ => false,
        }
    }

    /// Position of the chosen class in the class list, if any.
    pub fn class_slot(&self, classes: &[String]) -> Option<usize> {
        let chosen = self.class_name.as_ref()?;
        classes.iter().position(|c| c == chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PlayerRecord {
        PlayerRecord::new("u1", "Hero", Utc::now(), &EngineConfig::default())
    }

    #[test]
    fn test_new_record_defaults() {
        let r = record();
        assert_eq!(r.level, 1);
        assert_eq!(r.xp, 0);
        assert_eq!(r.xp_to_next, 100);
        assert_eq!(r.energy, 10);
        assert_eq!(r.schema_version, RECORD_SCHEMA_VERSION);
        assert!(!r.is_hardcore());
    }

    #[test]
    fn test_item_add_and_take() {
        let mut r = record();
        r.add_item("medkit", 2);
        assert_eq!(r.item_count("medkit"), 2);
        assert!(r.take_item("medkit"));
        assert!(r.take_item("medkit"));
        assert!(!r.take_item("medkit"));
        assert!(!r.inventory.contains_key("medkit"));
    }

    #[test]
    fn test_class_slot_lookup() {
        let mut r = record();
        let classes = vec!["warrior".to_string(), "rogue".to_string(), "cleric".to_string()];
        assert_eq!(r.class_slot(&classes), None);
        r.class_name = Some("cleric".into());
        assert_eq!(r.class_slot(&classes), Some(2));
    }

    #[test]
    fn test_legacy_injury_alias_reads_old_json() {
        let json = r#"{
            "actor_id": "u9",
            "display_name": "Old",
            "level": 4,
            "active_injury": {
                "name": "Bruised Ribs",
                "expires_at": "2030-01-01T00:00:00Z",
                "xp_multiplier": 0.9,
                "energy_regen_modifier": 0.0
            }
        }"#;
        let r: PlayerRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.level, 4);
        assert_eq!(r.schema_version, 0);
        assert_eq!(r.legacy_injury.as_ref().map(|i| i.name.as_str()), Some("Bruised Ribs"));
        assert!(r.injuries.is_empty());
    }
}
