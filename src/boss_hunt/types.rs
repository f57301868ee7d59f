use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A boss in the rotation pool, as defined in content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossDef {
    pub id: String,
    pub name: String,
    pub max_hp: u32,
    /// Haunting bosses leave a haunting window behind when defeated.
    #[serde(default)]
    pub haunts: bool,
}

/// The boss currently being hunted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossInstance {
    pub id: String,
    pub name: String,
    pub max_hp: u32,
    pub hp: u32,
    pub clues: u32,
    pub haunts: bool,
    pub spawned_at: DateTime<Utc>,
}

impl BossInstance {
    pub fn spawn(def: &BossDef, now: DateTime<Utc>) -> Self {
        Self {
            id: def.id.clone(),
            name: def.name.clone(),
            max_hp: def.max_hp.max(1),
            hp: def.max_hp.max(1),
            clues: 0,
            haunts: def.haunts,
            spawned_at: now,
        }
    }

    pub fn is_defeated(&self) -> bool {
        self.hp == 0
    }
}

/// Realm-wide reward after a boss falls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossBuff {
    pub expires_at: DateTime<Utc>,
    pub xp_multiplier: f64,
    /// Opponent levels shaved off while the buff lasts.
    pub level_reduction: u32,
}

impl BossBuff {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Flavor-only window left behind by a haunting boss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Haunting {
    pub boss_id: String,
    pub boss_name: String,
    pub until: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntStats {
    pub bosses_defeated: u32,
    pub clues_found: u64,
    pub last_defeated: Option<String>,
    pub last_defeated_at: Option<DateTime<Utc>>,
}

/// Persisted singleton under the `boss_hunt` key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossHuntState {
    pub boss: Option<BossInstance>,
    pub buff: Option<BossBuff>,
    pub haunting: Option<Haunting>,
    /// Total contributions ever applied. Doubles as a write counter.
    pub contribution_counter: u64,
    pub stats: HuntStats,
}

/// What one contribution did.
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    /// Damage landed; the boss still stands.
    Damaged {
        boss_name: String,
        damage: u32,
        hp: u32,
        max_hp: u32,
    },
    /// This contribution finished the boss.
    Defeated { boss_name: String, damage: u32 },
    /// Nothing to hit (haunting window or disabled).
    NoBoss,
}

/// Passed to defeat handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct DefeatEvent {
    pub boss_id: String,
    pub boss_name: String,
    pub final_contributor: String,
    pub buff: BossBuff,
    pub haunting: Option<Haunting>,
}
