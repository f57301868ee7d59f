//! Engine configuration.
//!
//! Every section is `#[serde(default)]`, so a config file only needs the
//! values it overrides. [`EngineConfig::validate`] runs on every load.

use crate::core::balance::*;
use crate::core::error::{EngineError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// XP needed to advance from a level. A closed set of curve shapes: nothing
/// configured here is ever evaluated as an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum XpCurve {
    /// `per_level * level`
    Linear { per_level: f64 },
    /// `a * level^2 + b * level + c`
    Quadratic { a: f64, b: f64, c: f64 },
}

impl Default for XpCurve {
    fn default() -> Self {
        XpCurve::Linear {
            per_level: XP_PER_LEVEL,
        }
    }
}

impl XpCurve {
    fn raw(&self, level: u32) -> f64 {
        let n = level as f64;
        match *self {
            XpCurve::Linear { per_level } => per_level * n,
            XpCurve::Quadratic { a, b, c } => a * n * n + b * n + c,
        }
    }

    /// XP required to go from `level` to `level + 1`.
    ///
    /// A curve that produces a non-finite or sub-1 value at runtime falls
    /// back to the default linear curve rather than failing the action.
    pub fn xp_for_level(&self, level: u32) -> u64 {
        let raw = self.raw(level);
        if raw.is_finite() && raw >= 1.0 {
            return raw.round() as u64;
        }
        tracing::warn!(level, curve = ?self, "xp curve produced {raw}, using default");
        XpCurve::default().raw(level).round().max(1.0) as u64
    }

    /// Checks the curve stays positive, finite and non-decreasing up to `max_level`.
    pub fn validate(&self, max_level: u32) -> Result<()> {
        let coefficients: Vec<f64> = match *self {
            XpCurve::Linear { per_level } => vec![per_level],
            XpCurve::Quadratic { a, b, c } => vec![a, b, c],
        };
        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(EngineError::InvalidConfig(
                "xp curve coefficients must be finite".to_string(),
            ));
        }
        let mut previous = 0.0;
        for level in 1..=max_level {
            let value = self.raw(level);
            if value < 1.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "xp curve yields {value} at level {level}"
                )));
            }
            if value < previous {
                return Err(EngineError::InvalidConfig(format!(
                    "xp curve decreases at level {level}"
                )));
            }
            previous = value;
        }
        Ok(())
    }
}

/// Opponent level and XP adjustments for a named difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub level_mod: i32,
    pub xp_mult: f64,
}

fn default_difficulties() -> BTreeMap<String, Difficulty> {
    let mut map = BTreeMap::new();
    map.insert(
        "easy".to_string(),
        Difficulty {
            level_mod: 0,
            xp_mult: 0.8,
        },
    );
    map.insert(
        "normal".to_string(),
        Difficulty {
            level_mod: 1,
            xp_mult: 1.0,
        },
    );
    map.insert(
        "hard".to_string(),
        Difficulty {
            level_mod: 3,
            xp_mult: 1.5,
        },
    );
    map
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub base_win_chance: f64,
    pub win_chance_per_level: f64,
    pub min_win_chance: f64,
    pub max_win_chance: f64,
    pub solo_cooldown_secs: i64,
    pub monster_spawn_chance: f64,
    pub quiet_lands_xp: u64,
    pub notable_chance: f64,
    pub notable_xp_multiplier: f64,
    pub xp_level_multiplier: u64,
    pub xp_loss_fraction: f64,
    pub crit_chance: f64,
    pub win_streak_bonus: f64,
    pub win_streak_cap: u32,
    pub first_win_bonus_xp: u64,
    pub legend_spawn_chance: f64,
    pub boss_encounter_chance: f64,
    pub boss_encounter_min_level: u32,
    pub boss_encounter_max_level: u32,
    pub difficulties: BTreeMap<String, Difficulty>,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_win_chance: BASE_WIN_CHANCE,
            win_chance_per_level: WIN_CHANCE_PER_LEVEL,
            min_win_chance: MIN_WIN_CHANCE,
            max_win_chance: MAX_WIN_CHANCE,
            solo_cooldown_secs: SOLO_COOLDOWN_SECS,
            monster_spawn_chance: MONSTER_SPAWN_CHANCE,
            quiet_lands_xp: QUIET_LANDS_XP,
            notable_chance: NOTABLE_CHANCE,
            notable_xp_multiplier: NOTABLE_XP_MULTIPLIER,
            xp_level_multiplier: XP_LEVEL_MULTIPLIER,
            xp_loss_fraction: XP_LOSS_FRACTION,
            crit_chance: CRIT_CHANCE,
            win_streak_bonus: WIN_STREAK_BONUS,
            win_streak_cap: WIN_STREAK_CAP,
            first_win_bonus_xp: FIRST_WIN_BONUS_XP,
            legend_spawn_chance: LEGEND_SPAWN_CHANCE,
            boss_encounter_chance: BOSS_ENCOUNTER_CHANCE,
            boss_encounter_min_level: BOSS_ENCOUNTER_MIN_LEVEL,
            boss_encounter_max_level: BOSS_ENCOUNTER_MAX_LEVEL,
            difficulties: default_difficulties(),
        }
    }
}

impl CombatConfig {
    /// Looks up a difficulty, falling back to `normal` for unknown names.
    pub fn difficulty(&self, name: &str) -> Difficulty {
        self.difficulties
            .get(name)
            .or_else(|| self.difficulties.get("normal"))
            .copied()
            .unwrap_or(Difficulty {
                level_mod: 1,
                xp_mult: 1.0,
            })
    }

    pub fn clamp_chance(&self, chance: f64) -> f64 {
        chance.clamp(self.min_win_chance, self.max_win_chance)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub level_cap: u32,
    pub hardcore_level_cap: u32,
    pub max_prestige: u32,
    pub xp_curve: XpCurve,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            level_cap: LEVEL_CAP,
            hardcore_level_cap: HARDCORE_LEVEL_CAP,
            max_prestige: MAX_PRESTIGE,
            xp_curve: XpCurve::default(),
        }
    }
}

/// Fatigue applied when energy is at or below `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyPenalty {
    pub threshold: u32,
    pub win_chance_modifier: f64,
    pub xp_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub base_max: u32,
    pub regen_interval_secs: i64,
    pub per_tick: f64,
    pub solo_cost: u32,
    pub group_cost: u32,
    pub potion_min: u32,
    pub potion_max: u32,
    pub penalties: Vec<EnergyPenalty>,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            base_max: BASE_MAX_ENERGY,
            regen_interval_secs: ENERGY_REGEN_INTERVAL_SECS,
            per_tick: ENERGY_PER_TICK,
            solo_cost: SOLO_ENERGY_COST,
            group_cost: GROUP_ENERGY_COST,
            potion_min: ENERGY_POTION_MIN,
            potion_max: ENERGY_POTION_MAX,
            penalties: vec![
                EnergyPenalty {
                    threshold: 2,
                    win_chance_modifier: -0.05,
                    xp_multiplier: 0.9,
                },
                EnergyPenalty {
                    threshold: 0,
                    win_chance_modifier: -0.10,
                    xp_multiplier: 0.75,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InjuryConfig {
    pub enabled: bool,
    pub chance_on_loss: f64,
    pub max_reduction: f64,
    pub class_reduction: f64,
}

impl Default for InjuryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chance_on_loss: INJURY_CHANCE_ON_LOSS,
            max_reduction: MAX_INJURY_REDUCTION,
            class_reduction: CLASS_INJURY_REDUCTION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    pub win_chance: f64,
    pub loss_chance: f64,
    pub counter_item_chance: f64,
    pub max_searches: u32,
    pub search_medkit: f64,
    pub search_energy_potion: f64,
    pub search_lucky_charm: f64,
    pub search_armor_shard: f64,
    pub search_xp_scroll: f64,
    pub search_mishap: f64,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            win_chance: DROP_CHANCE_WIN,
            loss_chance: DROP_CHANCE_LOSS,
            counter_item_chance: COUNTER_ITEM_DROP_CHANCE,
            max_searches: MAX_SEARCHES,
            search_medkit: SEARCH_MEDKIT_CHANCE,
            search_energy_potion: SEARCH_ENERGY_POTION_CHANCE,
            search_lucky_charm: SEARCH_LUCKY_CHARM_CHANCE,
            search_armor_shard: SEARCH_ARMOR_SHARD_CHANCE,
            search_xp_scroll: SEARCH_XP_SCROLL_CHANCE,
            search_mishap: SEARCH_MISHAP_CHANCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub join_window_secs: i64,
    pub boss_join_window_secs: i64,
    pub bonus_per_extra: f64,
    pub mob_level_offset: u32,
    pub boss_level_offset: u32,
    pub mob_xp_multiplier: f64,
    pub boss_xp_multiplier: f64,
    pub pool_bonus_per_extra: f64,
    pub lock_timeout_ms: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            join_window_secs: GROUP_JOIN_WINDOW_SECS,
            boss_join_window_secs: BOSS_JOIN_WINDOW_SECS,
            bonus_per_extra: GROUP_BONUS_PER_EXTRA,
            mob_level_offset: MOB_LEVEL_OFFSET,
            boss_level_offset: BOSS_LEVEL_OFFSET,
            mob_xp_multiplier: MOB_XP_MULTIPLIER,
            boss_xp_multiplier: BOSS_XP_MULTIPLIER,
            pool_bonus_per_extra: GROUP_POOL_BONUS_PER_EXTRA,
            lock_timeout_ms: GROUP_LOCK_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    pub loadout_size: usize,
    pub momentum_bonus: f64,
    pub veteran_bonus: f64,
    pub veteran_prestige: u32,
    pub cooldown_secs: i64,
    pub completion_charges: u32,
    pub charges_per_relic: u32,
    pub decay_per_failure: f64,
    pub decay_max: f64,
    pub penalty_early: f64,
    pub penalty_mid: f64,
    pub penalty_late: f64,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            loadout_size: DUNGEON_LOADOUT_SIZE,
            momentum_bonus: DUNGEON_MOMENTUM_BONUS,
            veteran_bonus: DUNGEON_VETERAN_BONUS,
            veteran_prestige: DUNGEON_VETERAN_PRESTIGE,
            cooldown_secs: DUNGEON_COOLDOWN_SECS,
            completion_charges: DUNGEON_COMPLETION_CHARGES,
            charges_per_relic: RELIC_CHARGES_PER_RELIC,
            decay_per_failure: RELIC_DECAY_PER_FAILURE,
            decay_max: RELIC_DECAY_MAX,
            penalty_early: DUNGEON_PENALTY_EARLY,
            penalty_mid: DUNGEON_PENALTY_MID,
            penalty_late: DUNGEON_PENALTY_LATE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BossHuntConfig {
    pub enabled: bool,
    pub clue_drop_chance: f64,
    pub damage_per_clue: u32,
    pub buff_days: i64,
    pub buff_xp_multiplier: f64,
    pub buff_level_reduction: u32,
    pub haunting_days: i64,
    pub haunting_flavor_chance: f64,
}

impl Default for BossHuntConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            clue_drop_chance: CLUE_DROP_CHANCE,
            damage_per_clue: DAMAGE_PER_CLUE,
            buff_days: BOSS_BUFF_DAYS,
            buff_xp_multiplier: BOSS_BUFF_XP_MULTIPLIER,
            buff_level_reduction: BOSS_BUFF_LEVEL_REDUCTION,
            haunting_days: HAUNTING_DAYS,
            haunting_flavor_chance: HAUNTING_FLAVOR_CHANCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HardcoreConfig {
    pub base_hp: u32,
    pub hp_per_level: u32,
    pub win_damage_base: u32,
    pub loss_damage_base: u32,
    pub boss_win_damage_mult: f64,
    pub boss_loss_damage_mult: f64,
}

impl Default for HardcoreConfig {
    fn default() -> Self {
        Self {
            base_hp: HARDCORE_BASE_HP,
            hp_per_level: HARDCORE_HP_PER_LEVEL,
            win_damage_base: HARDCORE_WIN_DAMAGE_BASE,
            loss_damage_base: HARDCORE_LOSS_DAMAGE_BASE,
            boss_win_damage_mult: HARDCORE_BOSS_WIN_DAMAGE_MULT,
            boss_loss_damage_mult: HARDCORE_BOSS_LOSS_DAMAGE_MULT,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub combat: CombatConfig,
    pub progression: ProgressionConfig,
    pub energy: EnergyConfig,
    pub injuries: InjuryConfig,
    pub drops: DropConfig,
    pub group: GroupConfig,
    pub dungeon: DungeonConfig,
    pub boss_hunt: BossHuntConfig,
    pub hardcore: HardcoreConfig,
    /// Fixed seed for the engine RNG. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

fn check_probability(name: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

fn check_multiplier(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidConfig(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

impl EngineConfig {
    /// Default config location: `<config dir>/quest-engine/engine.json`.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "quest-engine").ok_or_else(|| {
            EngineError::InvalidConfig("could not determine config directory".to_string())
        })?;
        Ok(dirs.config_dir().join("engine.json"))
    }

    /// Loads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)
            .map_err(|e| EngineError::InvalidConfig(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise returns the defaults.
    /// A file that exists but does not validate is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no engine config found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Writes the config as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.combat;
        check_probability("combat.min_win_chance", c.min_win_chance)?;
        check_probability("combat.max_win_chance", c.max_win_chance)?;
        if c.min_win_chance > c.max_win_chance {
            return Err(EngineError::InvalidConfig(
                "combat.min_win_chance exceeds combat.max_win_chance".to_string(),
            ));
        }
        check_probability("combat.monster_spawn_chance", c.monster_spawn_chance)?;
        check_probability("combat.notable_chance", c.notable_chance)?;
        check_probability("combat.xp_loss_fraction", c.xp_loss_fraction)?;
        check_probability("combat.crit_chance", c.crit_chance)?;
        check_probability("combat.legend_spawn_chance", c.legend_spawn_chance)?;
        check_probability("combat.boss_encounter_chance", c.boss_encounter_chance)?;
        check_multiplier("combat.notable_xp_multiplier", c.notable_xp_multiplier)?;
        if c.difficulties.is_empty() {
            return Err(EngineError::InvalidConfig(
                "combat.difficulties must not be empty".to_string(),
            ));
        }
        for (name, diff) in &c.difficulties {
            check_multiplier(&format!("combat.difficulties.{name}.xp_mult"), diff.xp_mult)?;
        }

        let p = &self.progression;
        if p.level_cap < 2 || p.hardcore_level_cap < p.level_cap {
            return Err(EngineError::InvalidConfig(format!(
                "level caps out of order: level_cap {}, hardcore_level_cap {}",
                p.level_cap, p.hardcore_level_cap
            )));
        }
        p.xp_curve.validate(p.hardcore_level_cap)?;

        let e = &self.energy;
        if e.base_max == 0 {
            return Err(EngineError::InvalidConfig(
                "energy.base_max must be positive".to_string(),
            ));
        }
        if e.potion_min > e.potion_max {
            return Err(EngineError::InvalidConfig(
                "energy.potion_min exceeds energy.potion_max".to_string(),
            ));
        }
        if e.regen_interval_secs <= 0 {
            return Err(EngineError::InvalidConfig(
                "energy.regen_interval_secs must be positive".to_string(),
            ));
        }
        for penalty in &e.penalties {
            check_multiplier("energy.penalties.xp_multiplier", penalty.xp_multiplier)?;
        }

        check_probability("injuries.chance_on_loss", self.injuries.chance_on_loss)?;
        check_probability("injuries.max_reduction", self.injuries.max_reduction)?;
        check_probability("injuries.class_reduction", self.injuries.class_reduction)?;

        let d = &self.drops;
        check_probability("drops.win_chance", d.win_chance)?;
        check_probability("drops.loss_chance", d.loss_chance)?;
        check_probability("drops.counter_item_chance", d.counter_item_chance)?;
        let search_total = d.search_medkit
            + d.search_energy_potion
            + d.search_lucky_charm
            + d.search_armor_shard
            + d.search_xp_scroll
            + d.search_mishap;
        if !(0.0..=1.0).contains(&search_total) {
            return Err(EngineError::InvalidConfig(format!(
                "search weights sum to {search_total}, must be within [0, 1]"
            )));
        }

        let g = &self.group;
        if g.join_window_secs <= 0 || g.boss_join_window_secs <= 0 {
            return Err(EngineError::InvalidConfig(
                "group join windows must be positive".to_string(),
            ));
        }
        check_multiplier("group.mob_xp_multiplier", g.mob_xp_multiplier)?;
        check_multiplier("group.boss_xp_multiplier", g.boss_xp_multiplier)?;

        let dg = &self.dungeon;
        if dg.charges_per_relic == 0 {
            return Err(EngineError::InvalidConfig(
                "dungeon.charges_per_relic must be positive".to_string(),
            ));
        }
        check_probability("dungeon.decay_per_failure", dg.decay_per_failure)?;
        check_probability("dungeon.decay_max", dg.decay_max)?;
        check_probability("dungeon.penalty_early", dg.penalty_early)?;
        check_probability("dungeon.penalty_mid", dg.penalty_mid)?;
        check_probability("dungeon.penalty_late", dg.penalty_late)?;

        let b = &self.boss_hunt;
        check_probability("boss_hunt.clue_drop_chance", b.clue_drop_chance)?;
        check_probability("boss_hunt.haunting_flavor_chance", b.haunting_flavor_chance)?;
        check_multiplier("boss_hunt.buff_xp_multiplier", b.buff_xp_multiplier)?;

        let h = &self.hardcore;
        check_multiplier("hardcore.boss_win_damage_mult", h.boss_win_damage_mult)?;
        check_multiplier("hardcore.boss_loss_damage_mult", h.boss_loss_damage_mult)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_linear_curve_matches_level_times_hundred() {
        let curve = XpCurve::default();
        assert_eq!(curve.xp_for_level(1), 100);
        assert_eq!(curve.xp_for_level(7), 700);
        assert_eq!(curve.xp_for_level(20), 2000);
    }

    #[test]
    fn test_quadratic_curve() {
        let curve = XpCurve::Quadratic {
            a: 5.0,
            b: 50.0,
            c: 45.0,
        };
        assert_eq!(curve.xp_for_level(1), 100);
        assert_eq!(curve.xp_for_level(2), 165);
        assert!(curve.validate(50).is_ok());
    }

    #[test]
    fn test_curve_rejects_non_positive_values() {
        let curve = XpCurve::Quadratic {
            a: 0.0,
            b: -10.0,
            c: 50.0,
        };
        assert!(curve.validate(20).is_err());
    }

    #[test]
    fn test_curve_rejects_non_finite() {
        let curve = XpCurve::Linear {
            per_level: f64::NAN,
        };
        assert!(curve.validate(20).is_err());
    }

    #[test]
    fn test_invalid_curve_falls_back_at_runtime() {
        let curve = XpCurve::Linear { per_level: -5.0 };
        assert_eq!(curve.xp_for_level(3), 300);
    }

    #[test]
    fn test_unknown_curve_kind_is_rejected_at_parse() {
        let json = r#"{ "progression": { "xp_curve": { "kind": "expression", "formula": "level * 100" } } }"#;
        assert!(serde_json::from_str::<EngineConfig>(json).is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "combat": { "crit_chance": 0.3 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.combat.crit_chance, 0.3);
        assert_eq!(config.combat.solo_cooldown_secs, SOLO_COOLDOWN_SECS);
        assert_eq!(config.progression.level_cap, LEVEL_CAP);
    }

    #[test]
    fn test_probability_out_of_range_rejected() {
        let mut config = EngineConfig::default();
        config.combat.crit_chance = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_win_clamp_rejected() {
        let mut config = EngineConfig::default();
        config.combat.min_win_chance = 0.9;
        config.combat.max_win_chance = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_difficulty_falls_back_to_normal() {
        let config = CombatConfig::default();
        assert_eq!(config.difficulty("nightmare"), config.difficulty("normal"));
    }

    #[test]
    fn test_load_or_default_and_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");

        let config = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(config.progression.max_prestige, MAX_PRESTIGE);

        let mut custom = EngineConfig::default();
        custom.rng_seed = Some(7);
        custom.group.join_window_secs = 30;
        custom.save(&path).unwrap();

        let loaded = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded.rng_seed, Some(7));
        assert_eq!(loaded.group.join_window_secs, 30);
    }
}
