//! Shared balance constants used by the engine and the simulator.
//!
//! Every tunable in [`crate::core::config::EngineConfig`] defaults to a value
//! from this file. Change once, test everywhere.

// =============================================================================
// WIN CHANCE
// =============================================================================

/// Win chance when player and opponent are the same level.
pub const BASE_WIN_CHANCE: f64 = 0.5;

/// Win chance delta per level of difference.
pub const WIN_CHANCE_PER_LEVEL: f64 = 0.10;

/// Lower clamp for any computed win chance.
pub const MIN_WIN_CHANCE: f64 = 0.05;

/// Upper clamp for any computed win chance.
pub const MAX_WIN_CHANCE: f64 = 0.95;

/// Group bonus per participant beyond the first.
pub const GROUP_BONUS_PER_EXTRA: f64 = 0.05;

/// Boss-hunt level reduction converts to win chance at this rate per level.
pub const BUFF_CHANCE_PER_LEVEL: f64 = WIN_CHANCE_PER_LEVEL;

/// Class slot 0/1 bonus in its strong band.
pub const CLASS_STRONG_BONUS: f64 = 0.25;

/// Class slot 0/1 penalty in its weak band.
pub const CLASS_WEAK_PENALTY: f64 = -0.10;

/// Last level of the early class band (1-10).
pub const CLASS_EARLY_BAND_MAX: u32 = 10;

/// Flat injury-chance reduction granted by class slot 2.
pub const CLASS_INJURY_REDUCTION: f64 = 0.50;

// =============================================================================
// LEVELING & PRESTIGE
// =============================================================================

/// Normal level cap.
pub const LEVEL_CAP: u32 = 20;

/// Level cap while the hardcore track is active.
pub const HARDCORE_LEVEL_CAP: u32 = 50;

/// Highest prestige rank before transcendence.
pub const MAX_PRESTIGE: u32 = 10;

/// XP per level for the default linear curve.
pub const XP_PER_LEVEL: f64 = 100.0;

/// Transcended legends sit this many levels above the cap (or the player).
pub const LEGEND_LEVEL_BASE_OFFSET: u32 = 5;

/// Extra legend levels per transcendence beyond the first.
pub const LEGEND_LEVEL_PER_TRANSCENDENCE: u32 = 3;

/// Base XP for defeating a legend.
pub const LEGEND_BASE_XP: u64 = 250;

/// Extra legend XP per transcendence beyond the first.
pub const LEGEND_XP_PER_TRANSCENDENCE: u64 = 100;

// =============================================================================
// ENERGY
// =============================================================================

/// Max energy before prestige bonuses.
pub const BASE_MAX_ENERGY: u32 = 10;

/// Seconds between regeneration ticks.
pub const ENERGY_REGEN_INTERVAL_SECS: i64 = 600;

/// Energy units restored per tick before injury modifiers.
pub const ENERGY_PER_TICK: f64 = 1.0;

/// Energy cost of a solo bout.
pub const SOLO_ENERGY_COST: u32 = 1;

/// Energy cost of opening or joining a group window.
pub const GROUP_ENERGY_COST: u32 = 1;

/// Energy potion restores a random amount in this range.
pub const ENERGY_POTION_MIN: u32 = 2;
pub const ENERGY_POTION_MAX: u32 = 4;

// =============================================================================
// SOLO COMBAT
// =============================================================================

/// Seconds between solo bouts.
pub const SOLO_COOLDOWN_SECS: i64 = 300;

/// Chance that a solo action finds a monster at all.
pub const MONSTER_SPAWN_CHANCE: f64 = 0.8;

/// XP granted when the lands are quiet.
pub const QUIET_LANDS_XP: u64 = 10;

/// Chance of a notable (rare) encounter.
pub const NOTABLE_CHANCE: f64 = 0.10;

/// Reward multiplier for a notable encounter.
pub const NOTABLE_XP_MULTIPLIER: f64 = 2.0;

/// Per-player-level XP added to every win.
pub const XP_LEVEL_MULTIPLIER: u64 = 2;

/// Fraction of the would-be win XP lost on defeat.
pub const XP_LOSS_FRACTION: f64 = 0.25;

/// Critical hit chance on a win.
pub const CRIT_CHANCE: f64 = 0.15;

/// XP bonus per consecutive win.
pub const WIN_STREAK_BONUS: f64 = 0.10;

/// Streak stops adding bonus after this many wins.
pub const WIN_STREAK_CAP: u32 = 5;

/// Flat XP for the first win of a UTC day.
pub const FIRST_WIN_BONUS_XP: u64 = 50;

/// Chance a legend opponent replaces the monster roll.
pub const LEGEND_SPAWN_CHANCE: f64 = 0.15;

// =============================================================================
// BOSS ESCALATION & GROUPS
// =============================================================================

/// Chance a solo action escalates into a boss window.
pub const BOSS_ENCOUNTER_CHANCE: f64 = 0.10;

/// Level band where boss escalation can fire.
pub const BOSS_ENCOUNTER_MIN_LEVEL: u32 = 17;
pub const BOSS_ENCOUNTER_MAX_LEVEL: u32 = 20;

/// Opponent level offset for group windows.
pub const MOB_LEVEL_OFFSET: u32 = 3;

/// Additional offset for boss windows.
pub const BOSS_LEVEL_OFFSET: u32 = 3;

/// Join window for a normal group encounter.
pub const GROUP_JOIN_WINDOW_SECS: i64 = 60;

/// Join window for a boss encounter.
pub const BOSS_JOIN_WINDOW_SECS: i64 = 300;

/// XP multiplier for a group win against a mob.
pub const MOB_XP_MULTIPLIER: f64 = 1.5;

/// XP multiplier for a group win against a boss.
pub const BOSS_XP_MULTIPLIER: f64 = 2.5;

/// XP pool growth per extra participant.
pub const GROUP_POOL_BONUS_PER_EXTRA: f64 = 0.25;

/// Longest wait for a channel lock before rejecting as busy.
pub const GROUP_LOCK_TIMEOUT_MS: u64 = 250;

// =============================================================================
// INJURIES & ITEMS
// =============================================================================

/// Base chance of an injury after a loss.
pub const INJURY_CHANCE_ON_LOSS: f64 = 0.75;

/// Combined injury reduction never exceeds this.
pub const MAX_INJURY_REDUCTION: f64 = 0.90;

/// Concurrent copies of one injury allowed.
pub const MAX_SAME_INJURY: usize = 2;

/// Lucky charm win chance bonus.
pub const LUCKY_CHARM_BONUS: f64 = 0.15;

/// Armor shard injury reduction.
pub const ARMOR_SHARD_REDUCTION: f64 = 0.30;

/// Fights an armor shard lasts.
pub const ARMOR_SHARD_FIGHTS: u32 = 3;

/// XP scroll multiplier on the next win.
pub const XP_SCROLL_MULTIPLIER: f64 = 1.5;

/// Guaranteed solo wins granted by one relic.
pub const RELIC_GUARANTEED_WINS: u32 = 5;

/// Item drop chance after a win.
pub const DROP_CHANCE_WIN: f64 = 0.10;

/// Consolation drop chance after a loss.
pub const DROP_CHANCE_LOSS: f64 = 0.03;

/// Counter-item drop chance after a win.
pub const COUNTER_ITEM_DROP_CHANCE: f64 = 0.05;

/// Most searches allowed in one action.
pub const MAX_SEARCHES: u32 = 20;

/// Search outcome weights.
pub const SEARCH_MEDKIT_CHANCE: f64 = 0.25;
pub const SEARCH_ENERGY_POTION_CHANCE: f64 = 0.15;
pub const SEARCH_LUCKY_CHARM_CHANCE: f64 = 0.15;
pub const SEARCH_ARMOR_SHARD_CHANCE: f64 = 0.10;
pub const SEARCH_XP_SCROLL_CHANCE: f64 = 0.10;
pub const SEARCH_MISHAP_CHANCE: f64 = 0.05;

/// XP lost by a search mishap.
pub const SEARCH_MISHAP_XP_MIN: u64 = 5;
pub const SEARCH_MISHAP_XP_MAX: u64 = 15;

/// Default ability cooldown.
pub const ABILITY_COOLDOWN_HOURS: i64 = 24;

// =============================================================================
// HARDCORE
// =============================================================================

/// Max HP before the per-level term.
pub const HARDCORE_BASE_HP: u32 = 100;

/// Max HP gained per level.
pub const HARDCORE_HP_PER_LEVEL: u32 = 20;

/// Flat HP lost on a hardcore win.
pub const HARDCORE_WIN_DAMAGE_BASE: u32 = 10;

/// Flat HP lost on a hardcore loss.
pub const HARDCORE_LOSS_DAMAGE_BASE: u32 = 40;

/// Boss opponents multiply win damage by this.
pub const HARDCORE_BOSS_WIN_DAMAGE_MULT: f64 = 2.0;

/// Boss opponents multiply loss damage by this.
pub const HARDCORE_BOSS_LOSS_DAMAGE_MULT: f64 = 1.5;

// =============================================================================
// DUNGEON
// =============================================================================

/// Counter items carried into a run.
pub const DUNGEON_LOADOUT_SIZE: usize = 4;

/// Rooms after which step mode pauses.
pub const DUNGEON_SAFE_HAVENS: [usize; 3] = [3, 6, 9];

/// Win chance per consecutive room win.
pub const DUNGEON_MOMENTUM_BONUS: f64 = 0.02;

/// Veteran bonus and the prestige that unlocks it.
pub const DUNGEON_VETERAN_BONUS: f64 = 0.05;
pub const DUNGEON_VETERAN_PRESTIGE: u32 = 3;

/// Seconds between dungeon runs.
pub const DUNGEON_COOLDOWN_SECS: i64 = 900;

/// Relic charges granted by a completed run.
pub const DUNGEON_COMPLETION_CHARGES: u32 = 1;

/// Charges that fuse into one relic.
pub const RELIC_CHARGES_PER_RELIC: u32 = 4;

/// Relic-loss odds per failed run in the current streak.
pub const RELIC_DECAY_PER_FAILURE: f64 = 0.10;

/// Ceiling on relic-loss odds.
pub const RELIC_DECAY_MAX: f64 = 0.50;

/// Failure penalty as a fraction of XP-to-next, by room band.
pub const DUNGEON_PENALTY_EARLY: f64 = 0.75;
pub const DUNGEON_PENALTY_MID: f64 = 0.50;
pub const DUNGEON_PENALTY_LATE: f64 = 0.25;

/// Partial XP for quitting at a safe haven: (min_room, max_room, xp).
pub const DUNGEON_QUIT_REWARDS: [(usize, usize, u64); 4] =
    [(1, 2, 100), (3, 5, 250), (6, 8, 500), (9, 9, 800)];

// =============================================================================
// BOSS HUNT
// =============================================================================

/// Chance a winning solo bout finds a clue.
pub const CLUE_DROP_CHANCE: f64 = 0.15;

/// Boss damage per clue.
pub const DAMAGE_PER_CLUE: u32 = 10;

/// Buff window after a defeat.
pub const BOSS_BUFF_DAYS: i64 = 7;

/// Buff XP multiplier.
pub const BOSS_BUFF_XP_MULTIPLIER: f64 = 1.5;

/// Buff opponent level reduction.
pub const BOSS_BUFF_LEVEL_REDUCTION: u32 = 2;

/// Haunting window for haunting bosses.
pub const HAUNTING_DAYS: i64 = 3;

/// Chance of a haunting flavor line on a solo bout.
pub const HAUNTING_FLAVOR_CHANCE: f64 = 0.10;

/// Cells in the rendered HP bar.
pub const HP_BAR_CELLS: usize = 20;
