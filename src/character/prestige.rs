//! Prestige and transcendence.

use crate::character::challenge::{self, ChallengePath};
use crate::character::energy;
use crate::character::progression;
use crate::character::record::{DungeonProgress, PlayerRecord};
use crate::core::balance::{
    LEGEND_BASE_XP, LEGEND_LEVEL_BASE_OFFSET, LEGEND_LEVEL_PER_TRANSCENDENCE,
    LEGEND_XP_PER_TRANSCENDENCE,
};
use crate::core::config::EngineConfig;
use crate::core::error::Rejection;

/// Additive win chance for a prestige rank.
///
/// # Returns
/// 0.05 for ranks 1-3, 0.10 for 4-6, 0.15 for 7-9 and 0.20 from 10 on.
pub fn prestige_win_bonus(prestige: u32) -> f64 {
    match prestige {
        0 => 0.0,
        1..=3 => 0.05,
        4..=6 => 0.10,
        7..=9 => 0.15,
        _ => 0.20,
    }
}

/// XP multiplier for a prestige rank.
pub fn prestige_xp_multiplier(prestige: u32) -> f64 {
    match prestige {
        0..=1 => 1.0,
        2..=4 => 1.25,
        5..=7 => 1.5,
        8..=9 => 1.75,
        _ => 2.0,
    }
}

/// Checks whether the record may prestige right now.
///
/// # Arguments
/// * `record` - The player record
/// * `config` - Engine config providing the caps
pub fn check_can_prestige(record: &PlayerRecord, config: &EngineConfig) -> Result<(), Rejection> {
    if record.is_hardcore() {
        return Err(Rejection::ModeConflict("on the hardcore track"));
    }
    let cap = config.progression.level_cap;
    if record.level < cap {
        return Err(Rejection::NotEligible(format!(
            "you must reach level {cap} before you can prestige (current level: {})",
            record.level
        )));
    }
    if record.prestige >= config.progression.max_prestige {
        return Err(Rejection::NotEligible(format!(
            "you are already at maximum prestige ({}); transcend instead",
            config.progression.max_prestige
        )));
    }
    Ok(())
}

/// Applies a prestige without eligibility checks.
///
/// Shared by the prestige action and hardcore completion. Inventory is kept.
pub fn apply_prestige(
    record: &mut PlayerRecord,
    path: Option<&ChallengePath>,
    config: &EngineConfig,
) -> Vec<String> {
    record.prestige += 1;
    record.history.total_prestiges += 1;
    progression::reset_to_level(record, 1, config);
    record.history.win_streak = 0;
    record.injuries.clear();
    record.challenge.medkits_used_this_prestige = 0;
    record.challenge.active_path = path.map(|p| p.id.clone());
    energy::refill(record, &config.energy);

    let new_rank = record.prestige;
    let mut bonus_parts = Vec::new();
    let win = prestige_win_bonus(new_rank);
    if win > 0.0 {
        bonus_parts.push(format!("+{}% win chance", (win * 100.0).round()));
    }
    let xp = prestige_xp_multiplier(new_rank);
    if xp > 1.0 {
        bonus_parts.push(format!("{}% bonus XP", ((xp - 1.0) * 100.0).round()));
    }
    let energy_bonus = energy::prestige_energy_bonus(new_rank);
    if energy_bonus > 0 {
        bonus_parts.push(format!("+{energy_bonus} max energy"));
    }
    let bonus_text = if bonus_parts.is_empty() {
        "preparing for future bonuses".to_string()
    } else {
        bonus_parts.join(", ")
    };

    let mut lines = vec![
        format!("*** {} HAS ASCENDED TO PRESTIGE {new_rank}! ***", record.display_name),
        format!("Reborn at Level 1 with permanent bonuses: {bonus_text}"),
    ];
    if let Some(path) = path {
        lines.push(format!("You have entered the challenge path: {}!", path.name));
    }
    tracing::info!(
        actor = %record.actor_id,
        prestige = new_rank,
        path = ?record.challenge.active_path,
        "prestige"
    );
    lines
}

/// The prestige action. A `path` enters that challenge path at the same time.
pub fn prestige(
    record: &mut PlayerRecord,
    path: Option<&ChallengePath>,
    config: &EngineConfig,
) -> Result<Vec<String>, Rejection> {
    check_can_prestige(record, config)?;
    if let Some(path) = path {
        challenge::check_path_entry(path, record.prestige)?;
    }
    Ok(apply_prestige(record, path, config))
}

pub fn check_can_transcend(record: &PlayerRecord, config: &EngineConfig) -> Result<(), Rejection> {
    if record.is_hardcore() {
        return Err(Rejection::ModeConflict("on the hardcore track"));
    }
    let p = &config.progression;
    if record.level < p.level_cap {
        return Err(Rejection::NotEligible(format!(
            "you must reach level {} before you can transcend",
            p.level_cap
        )));
    }
    if record.prestige < p.max_prestige {
        return Err(Rejection::NotEligible(format!(
            "you must achieve Prestige {} before you can transcend (current: {})",
            p.max_prestige, record.prestige
        )));
    }
    Ok(())
}

/// Resets everything but lifetime history and permanent items, and makes
/// the player a legend opponent for others.
pub fn transcend(record: &mut PlayerRecord, config: &EngineConfig) -> Result<Vec<String>, Rejection> {
    check_can_transcend(record, config)?;

    record.transcendence += 1;
    record.prestige = 0;
    progression::reset_to_level(record, 1, config);
    record.history.win_streak = 0;
    record.history.last_win_day = None;
    record.last_solo_at = None;
    record.inventory.clear();
    record.buffs.clear();
    record.injuries.clear();
    record.class_name = None;
    record.challenge.active_path = None;
    record.challenge.medkits_used_this_prestige = 0;
    record.abilities.unlocked.clear();
    record.abilities.last_used.clear();
    record.dungeon = DungeonProgress {
        relic_charges: record.dungeon.relic_charges,
        ..DungeonProgress::default()
    };
    energy::refill(record, &config.energy);

    let suffix = legend_suffix(record.transcendence);
    tracing::info!(
        actor = %record.actor_id,
        transcendence = record.transcendence,
        "transcended"
    );
    Ok(vec![
        format!(
            "*** {} transcends the mortal cycle and becomes {suffix}! ***",
            record.display_name
        ),
        "You have been reborn at Level 1. Your legend now stalks the lands.".to_string(),
    ])
}

/// "(Legend)" for the first transcendence, "(Legend II)" and so on after.
pub fn legend_suffix(transcendence: u32) -> String {
    if transcendence <= 1 {
        "(Legend)".to_string()
    } else {
        format!("(Legend {})", to_roman(transcendence))
    }
}

fn to_roman(mut n: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// Level of a legend opponent facing a player at `player_level`.
pub fn legend_level(transcendence: u32, player_level: u32, level_cap: u32) -> u32 {
    let base = (level_cap + LEGEND_LEVEL_BASE_OFFSET).max(player_level + LEGEND_LEVEL_BASE_OFFSET);
    base + transcendence.saturating_sub(1) * LEGEND_LEVEL_PER_TRANSCENDENCE
}

/// Base win XP for defeating a legend.
pub fn legend_xp(transcendence: u32) -> u64 {
    LEGEND_BASE_XP + transcendence.saturating_sub(1) as u64 * LEGEND_XP_PER_TRANSCENDENCE
}
