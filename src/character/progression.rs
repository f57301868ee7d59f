//! XP and level ledger.
//!
//! All level movement goes through [`grant_xp`] and [`deduct_xp`], which keep
//! the level inside `[1, cap]` for the record's current track.

use crate::character::energy;
use crate::character::hardcore;
use crate::character::record::PlayerRecord;
use crate::core::config::{EngineConfig, XpCurve};

/// What a single XP grant did to the record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XpGrant {
    pub amount: u64,
    pub levels_gained: u32,
    /// The grant brought the record to its cap.
    pub reached_cap: bool,
    pub lines: Vec<String>,
}

/// XP required to advance from `level`.
pub fn xp_for_level(curve: &XpCurve, level: u32) -> u64 {
    curve.xp_for_level(level)
}

/// XP accumulated across all completed levels plus progress in the current one.
pub fn total_xp(record: &PlayerRecord, curve: &XpCurve) -> u64 {
    (1..record.level)
        .map(|level| xp_for_level(curve, level))
        .sum::<u64>()
        + record.xp
}

fn on_levels_gained(record: &mut PlayerRecord, config: &EngineConfig) {
    energy::refill(record, &config.energy);
    hardcore::heal_on_level_up(record, &config.hardcore);
}

/// Adds XP and processes every level threshold it crosses.
///
/// Each level-up refills energy and, on the hardcore track, heals fully.
/// At the cap XP and XP-to-next are pinned to zero.
pub fn grant_xp(record: &mut PlayerRecord, amount: u64, config: &EngineConfig) -> XpGrant {
    let cap = record.level_cap(config);
    let curve = &config.progression.xp_curve;
    let mut grant = XpGrant {
        amount,
        ..XpGrant::default()
    };

    if record.level >= cap {
        record.level = cap;
        record.xp = 0;
        record.xp_to_next = 0;
        return grant;
    }

    record.xp += amount;
    record.xp_to_next = xp_for_level(curve, record.level);

    while record.level < cap && record.xp >= record.xp_to_next {
        record.xp -= record.xp_to_next;
        record.level += 1;
        record.xp_to_next = xp_for_level(curve, record.level);
        grant.levels_gained += 1;
    }

    if record.level >= cap {
        record.xp = 0;
        record.xp_to_next = 0;
        grant.reached_cap = grant.levels_gained > 0;
    }

    if grant.levels_gained > 0 {
        on_levels_gained(record, config);
        if grant.reached_cap {
            grant
                .lines
                .push(format!("*** LEVEL {} ACHIEVED - MAXIMUM POWER! ***", record.level));
        } else {
            grant
                .lines
                .push(format!("Congratulations, you have reached Level {}!", record.level));
        }
        tracing::debug!(
            actor = %record.actor_id,
            level = record.level,
            gained = grant.levels_gained,
            "level up"
        );
    }

    grant
}

/// Removes XP, dropping levels as needed but never below level 1.
/// Resets the win streak. Returns the XP actually removed.
pub fn deduct_xp(record: &mut PlayerRecord, amount: u64, config: &EngineConfig) -> u64 {
    record.history.win_streak = 0;
    if amount == 0 {
        return 0;
    }
    let cap = record.level_cap(config);
    let curve = &config.progression.xp_curve;

    let before = total_xp(record, curve);
    let mut remaining = before.saturating_sub(amount);
    let removed = before - remaining;

    let mut level = 1;
    while level < cap {
        let cost = xp_for_level(curve, level);
        if remaining < cost {
            break;
        }
        remaining -= cost;
        level += 1;
    }

    record.level = level;
    if level >= cap {
        record.xp = 0;
        record.xp_to_next = 0;
    } else {
        record.xp = remaining;
        record.xp_to_next = xp_for_level(curve, level);
    }
    hardcore::clamp_hp_to_level(record, &config.hardcore);
    removed
}

/// Forces the record to `level` with zero progress.
pub fn reset_to_level(record: &mut PlayerRecord, level: u32, config: &EngineConfig) {
    let cap = record.level_cap(config);
    record.level = level.clamp(1, cap);
    record.xp = 0;
    record.xp_to_next = if record.level >= cap {
        0
    } else {
        xp_for_level(&config.progression.xp_curve, record.level)
    };
}
