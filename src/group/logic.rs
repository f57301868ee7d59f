//! Window transitions and the shared group bout.
//!
//! Everything here runs with the channel slot already locked by
//! [`GroupCoordinator`](super::coordinator::GroupCoordinator).

use super::types::{GroupEncounter, GroupResolution, Participant, WindowState};
use crate::character::record::PlayerRecord;
use crate::combat::logic::{settle_group_share, BoutContext};
use crate::combat::modifiers::group_win_chance;
use crate::combat::types::Opponent;
use crate::core::config::EngineConfig;
use crate::core::error::Rejection;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

fn spend_join_energy(record: &mut PlayerRecord, config: &EngineConfig) -> Result<(), Rejection> {
    let cost = config.energy.group_cost;
    if record.energy < cost {
        return Err(Rejection::InsufficientEnergy {
            needed: cost,
            have: record.energy,
        });
    }
    record.energy -= cost;
    Ok(())
}

/// Opens a window in an empty slot with `initiator` enrolled.
///
/// The initiator pays the join cost like everyone else.
pub fn open_window(
    slot: &mut Option<GroupEncounter>,
    initiator: &mut PlayerRecord,
    channel: &str,
    opponent: Opponent,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<(GroupEncounter, Vec<String>), Rejection> {
    if slot.is_some() {
        return Err(Rejection::WindowAlreadyOpen);
    }
    spend_join_energy(initiator, config)?;

    let secs = if opponent.boss {
        config.group.boss_join_window_secs
    } else {
        config.group.join_window_secs
    };
    let leader = Participant {
        actor_id: initiator.actor_id.clone(),
        display_name: initiator.display_name.clone(),
    };
    let window = GroupEncounter::new(channel, leader, opponent, now, now + Duration::seconds(secs));

    let line = if window.opponent.boss {
        format!(
            "{} stumbles upon a {}! Everyone has {} minutes to join the fight!",
            initiator.display_name,
            window.opponent,
            secs / 60
        )
    } else {
        format!(
            "{} is gathering a party against a {}! Join within {secs} seconds.",
            initiator.display_name, window.opponent
        )
    };
    tracing::info!(
        channel,
        window = %window.id,
        boss = window.opponent.boss,
        level = window.opponent.level,
        "group window opened"
    );
    *slot = Some(window.clone());
    Ok((window, vec![line]))
}

/// Enrolls `record` in the slot's window and spends its energy.
pub fn join_window(
    slot: &mut Option<GroupEncounter>,
    record: &mut PlayerRecord,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<Vec<String>, Rejection> {
    let window = slot.as_mut().ok_or(Rejection::NoOpenWindow)?;
    if window.has_joined(&record.actor_id) {
        return Err(Rejection::AlreadyJoined);
    }
    if !window.is_open() || window.deadline_passed(now) {
        return Err(Rejection::WindowExpired);
    }
    spend_join_energy(record, config)?;
    window.participants.push(Participant {
        actor_id: record.actor_id.clone(),
        display_name: record.display_name.clone(),
    });
    tracing::debug!(
        channel = %window.channel,
        actor = %record.actor_id,
        party = window.participants.len(),
        "joined group window"
    );
    Ok(vec![format!(
        "{} joins the fight! ({} in the party)",
        record.display_name,
        window.participants.len()
    )])
}

/// Takes an open window out of the slot for resolution.
///
/// Returns `None` when there is nothing left to close, which makes repeat
/// closes no-ops.
pub fn take_for_close(slot: &mut Option<GroupEncounter>) -> Option<GroupEncounter> {
    if !matches!(slot, Some(window) if window.is_open()) {
        return None;
    }
    let mut window = slot.take()?;
    window.state = WindowState::Resolving;
    Some(window)
}

/// Total XP for a party of `n` at `average_level` beating `opponent`.
pub fn xp_pool(
    opponent: &Opponent,
    average_level: f64,
    n: usize,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> f64 {
    let g = &config.group;
    let base = rng.gen_range(opponent.xp_min..=opponent.xp_max.max(opponent.xp_min)) as f64
        + average_level * config.combat.xp_level_multiplier as f64;
    let mult = if opponent.boss {
        g.boss_xp_multiplier
    } else {
        g.mob_xp_multiplier
    };
    base * mult * (1.0 + g.pool_bonus_per_extra * n.saturating_sub(1) as f64)
}

/// Resolves one shared bout and applies each participant's share.
///
/// `records` are the participants in window order, already loaded. They are
/// only mutated in memory; the caller writes them back.
pub fn resolve_window(
    window: &GroupEncounter,
    records: &mut [PlayerRecord],
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
) -> GroupResolution {
    let config = ctx.config;
    let n = records.len().max(1);
    let average_level = records.iter().map(|r| r.level as f64).sum::<f64>() / n as f64;
    let opponent = window.opponent.clone();

    let win_chance = group_win_chance(average_level, opponent.level, n, ctx.boss_buff, config);
    let won = rng.gen::<f64>() < win_chance;
    let pool = xp_pool(&opponent, average_level, n, config, rng);
    let share = pool / n as f64;

    let mut lines = vec![format!(
        "A party of {n} (average level {average_level:.1}) faces the {opponent}! (Win chance: {:.0}%)",
        win_chance * 100.0
    )];
    if won {
        lines.push(format!("Victory! The {} falls.", opponent.name));
    } else {
        lines.push(format!("The {} overwhelms the party.", opponent.name));
    }
    for record in records.iter_mut() {
        lines.extend(settle_group_share(record, &opponent, won, share, n, ctx, rng));
    }

    tracing::info!(
        channel = %window.channel,
        window = %window.id,
        party = n,
        won,
        chance = win_chance,
        pool,
        "group window resolved"
    );
    GroupResolution {
        window_id: window.id,
        opponent,
        won,
        win_chance,
        average_level,
        pool,
        share,
        lines,
    }
}
