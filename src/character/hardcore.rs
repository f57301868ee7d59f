//! Hardcore track: HP, the item locker and the four end states.
//!
//! ```text
//! Inactive --enter--> Active --hp 0------> Died       (level 1, no prestige)
//!                       |----level 50---> Completed  (prestige + permanent pick)
//!                       `----quit-------> Abandoned  (cap back to 20)
//! ```

use crate::character::prestige;
use crate::character::progression;
use crate::character::record::{ItemCounts, PlayerRecord};
use crate::core::config::{EngineConfig, HardcoreConfig};
use crate::core::error::Rejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Present on the record exactly while the hardcore track is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardcoreState {
    pub hp: u32,
    pub max_hp: u32,
    pub entered_at: DateTime<Utc>,
}

/// How the track stands after a bout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardcoreOutcome {
    Alive,
    Died,
    Completed,
}

pub fn max_hp_for(level: u32, config: &HardcoreConfig) -> u32 {
    config.base_hp + level * config.hp_per_level
}

/// Full heal after a level-up. No-op off the hardcore track.
pub fn heal_on_level_up(record: &mut PlayerRecord, config: &HardcoreConfig) {
    let level = record.level;
    if let Some(state) = record.hardcore.as_mut() {
        state.max_hp = max_hp_for(level, config);
        state.hp = state.max_hp;
    }
    if record.is_hardcore() {
        record.history.highest_hardcore_level = record.history.highest_hardcore_level.max(level);
    }
}

/// Recomputes max HP after a level drop and keeps HP within it.
pub fn clamp_hp_to_level(record: &mut PlayerRecord, config: &HardcoreConfig) {
    let level = record.level;
    if let Some(state) = record.hardcore.as_mut() {
        state.max_hp = max_hp_for(level, config);
        state.hp = state.hp.min(state.max_hp);
    }
}

pub fn check_can_enter(record: &PlayerRecord, config: &EngineConfig) -> Result<(), Rejection> {
    if record.is_hardcore() {
        return Err(Rejection::AlreadyActive("the hardcore track".to_string()));
    }
    if record.challenge.active_path.is_some() {
        return Err(Rejection::ModeConflict("on a challenge path"));
    }
    if record.level != config.progression.level_cap {
        return Err(Rejection::NotEligible(format!(
            "hardcore requires level {}",
            config.progression.level_cap
        )));
    }
    if record.prestige >= config.progression.max_prestige {
        return Err(Rejection::NotEligible(
            "you are at max prestige; transcend instead".to_string(),
        ));
    }
    Ok(())
}

/// Moves every non-permanent item into the locker and starts the track.
pub fn enter(
    record: &mut PlayerRecord,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<Vec<String>, Rejection> {
    check_can_enter(record, config)?;

    let inventory = std::mem::take(&mut record.inventory);
    for (key, count) in inventory {
        if record.permanent_items.contains(&key) {
            record.inventory.insert(key, count);
        } else {
            *record.locker.entry(key).or_insert(0) += count;
        }
    }

    let max_hp = max_hp_for(record.level, &config.hardcore);
    record.hardcore = Some(HardcoreState {
        hp: max_hp,
        max_hp,
        entered_at: now,
    });
    record.challenge.active_path = None;
    // Cap rises to the hardcore cap, so progress toward the next level resumes.
    progression::reset_to_level(record, record.level, config);
    record.history.highest_hardcore_level = record.history.highest_hardcore_level.max(record.level);

    tracing::info!(actor = %record.actor_id, max_hp, "entered hardcore");
    Ok(vec![
        "You step onto the hardcore track. Death will cost you everything.".to_string(),
        format!(
            "HP: {max_hp}/{max_hp}. {} item type(s) locked away.",
            record.locker.len()
        ),
    ])
}

/// HP lost to one bout before it is applied.
pub fn bout_damage(
    won: bool,
    boss: bool,
    opponent_level: u32,
    reward_multiplier: f64,
    config: &HardcoreConfig,
) -> u32 {
    let (base, mult) = if won {
        (
            config.win_damage_base as f64 + (opponent_level / 2) as f64,
            if boss { config.boss_win_damage_mult } else { 1.0 },
        )
    } else {
        (
            config.loss_damage_base as f64 + (opponent_level * 2) as f64,
            if boss { config.boss_loss_damage_mult } else { 1.0 },
        )
    };
    (base * mult * reward_multiplier.max(0.0)).round().max(1.0) as u32
}

/// Applies bout damage and resolves death or completion. Returns the damage
/// dealt, the outcome and any lines to report.
pub fn apply_bout(
    record: &mut PlayerRecord,
    damage: u32,
    config: &EngineConfig,
) -> (HardcoreOutcome, Vec<String>) {
    let Some(state) = record.hardcore.as_mut() else {
        return (HardcoreOutcome::Alive, Vec::new());
    };
    state.hp = state.hp.saturating_sub(damage);
    let (hp, max_hp) = (state.hp, state.max_hp);
    let mut lines = vec![format!("You take {damage} damage. HP: {hp}/{max_hp}")];

    if hp == 0 {
        lines.extend(die(record, config));
        return (HardcoreOutcome::Died, lines);
    }
    if record.level >= config.progression.hardcore_level_cap {
        lines.extend(complete(record, config));
        return (HardcoreOutcome::Completed, lines);
    }
    (HardcoreOutcome::Alive, lines)
}

fn restore_locker(record: &mut PlayerRecord) -> ItemCounts {
    let locker = std::mem::take(&mut record.locker);
    for (key, count) in &locker {
        *record.inventory.entry(key.clone()).or_insert(0) += count;
    }
    locker
}

/// HP reached zero.
pub fn die(record: &mut PlayerRecord, config: &EngineConfig) -> Vec<String> {
    restore_locker(record);
    record.hardcore = None;
    record.history.hardcore_deaths += 1;
    record.history.win_streak = 0;
    progression::reset_to_level(record, 1, config);
    tracing::info!(actor = %record.actor_id, "hardcore death");
    vec![
        "You have fallen. The hardcore run is over.".to_string(),
        "Your locked items are returned and you begin again at Level 1.".to_string(),
    ]
}

/// Level cap reached on the hardcore track.
pub fn complete(record: &mut PlayerRecord, config: &EngineConfig) -> Vec<String> {
    let locker = restore_locker(record);
    record.hardcore = None;
    record.history.hardcore_completions += 1;
    record.history.highest_hardcore_level = record
        .history
        .highest_hardcore_level
        .max(config.progression.hardcore_level_cap);

    let candidates: BTreeSet<String> = locker
        .keys()
        .chain(record.inventory.keys())
        .filter(|key| !record.permanent_items.contains(*key))
        .cloned()
        .collect();

    let mut lines = vec!["*** HARDCORE COMPLETE! ***".to_string()];
    lines.extend(prestige::apply_prestige(record, None, config));
    if candidates.is_empty() {
        record.pending_permanent_choice = None;
    } else {
        lines.push(format!(
            "Choose one item to keep forever: {}",
            candidates.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
        record.pending_permanent_choice = Some(candidates);
    }
    tracing::info!(actor = %record.actor_id, "hardcore completed");
    lines
}

/// Leaves the track without penalty or reward.
pub fn quit(record: &mut PlayerRecord, config: &EngineConfig) -> Result<Vec<String>, Rejection> {
    if !record.is_hardcore() {
        return Err(Rejection::NotEligible("you are not on the hardcore track".to_string()));
    }
    restore_locker(record);
    record.hardcore = None;
    let cap = config.progression.level_cap;
    if record.level > cap {
        progression::reset_to_level(record, cap, config);
    } else {
        progression::reset_to_level(record, record.level, config);
    }
    tracing::info!(actor = %record.actor_id, level = record.level, "hardcore abandoned");
    Ok(vec![format!(
        "You leave the hardcore track at Level {}. Your items are returned.",
        record.level
    )])
}

/// Marks one pending candidate as permanent. Allowed once per completion.
pub fn choose_permanent_item(record: &mut PlayerRecord, item: &str) -> Result<String, Rejection> {
    let Some(candidates) = record.pending_permanent_choice.as_ref() else {
        return Err(Rejection::NotEligible("you have no permanent item to choose".to_string()));
    };
    if !candidates.contains(item) {
        return Err(Rejection::InvalidChoice(format!(
            "{item} is not one of: {}",
            candidates.iter().cloned().collect::<Vec<_>>().join(", ")
        )));
    }
    record.permanent_items.insert(item.to_string());
    record.pending_permanent_choice = None;
    Ok(format!("{item} is now permanent and will never be locked away."))
}
