use crate::character::hardcore::HardcoreOutcome;
use crate::effects::injury::InjuryRoll;
use crate::effects::items::ItemKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monster from the content table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterDef {
    pub name: String,
    pub min_level: u32,
    pub max_level: u32,
    #[serde(default = "default_xp_min")]
    pub xp_win_min: u64,
    #[serde(default = "default_xp_max")]
    pub xp_win_max: u64,
}

fn default_xp_min() -> u64 {
    10
}

fn default_xp_max() -> u64 {
    20
}

impl MonsterDef {
    pub fn contains(&self, level: u32) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }

    /// Levels between `level` and this monster's range.
    pub fn distance(&self, level: u32) -> u32 {
        if level < self.min_level {
            self.min_level - level
        } else {
            level.saturating_sub(self.max_level)
        }
    }
}

/// A transcended player that can appear as an opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub actor_id: String,
    pub display_name: String,
    pub transcendence: u32,
}

/// Who a bout is fought against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opponent {
    pub name: String,
    pub level: u32,
    /// Rare spawn: doubles the reward.
    pub notable: bool,
    pub boss: bool,
    /// Actor id of the transcended player this legend is built from.
    pub legend_of: Option<String>,
    pub xp_min: u64,
    pub xp_max: u64,
}

impl Opponent {
    pub fn is_legend(&self) -> bool {
        self.legend_of.is_some()
    }
}

impl fmt::Display for Opponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.boss {
            f.write_str("[BOSS] ")?;
        }
        if self.is_legend() {
            f.write_str("[LEGEND] ")?;
        } else if self.notable {
            f.write_str("[RARE] ")?;
        }
        write!(f, "Level {} {}", self.level, self.name)
    }
}

/// Everything a resolved solo bout did, for notifications and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct BoutReport {
    pub opponent: Opponent,
    pub won: bool,
    pub win_chance: f64,
    pub guaranteed: bool,
    pub crit: bool,
    pub xp_gained: u64,
    pub xp_lost: u64,
    pub levels_gained: u32,
    pub injury: Option<InjuryRoll>,
    pub drop: Option<ItemKind>,
    pub counter_item: Option<String>,
    /// The bout turned up a boss-hunt clue. The caller applies the damage.
    pub clue_found: bool,
    pub hardcore: Option<HardcoreOutcome>,
    pub lines: Vec<String>,
}

impl BoutReport {
    pub(crate) fn new(opponent: Opponent, won: bool, win_chance: f64, guaranteed: bool) -> Self {
        Self {
            opponent,
            won,
            win_chance,
            guaranteed,
            crit: false,
            xp_gained: 0,
            xp_lost: 0,
            levels_gained: 0,
            injury: None,
            drop: None,
            counter_item: None,
            clue_found: false,
            hardcore: None,
            lines: Vec::new(),
        }
    }
}
