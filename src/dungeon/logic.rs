//! Dungeon traversal: loadout, entry, room-by-room resolution and payouts.
//!
//! The engine owns persistence. These functions mutate the player record and
//! the run in place and report what happened; a run that comes back
//! [`RunStatus::SafeHaven`] is stored, anything else is removed.

use super::types::{
    counter_item_name, Advance, DungeonMode, DungeonRun, RoomDef, RoomOutcome, RunStatus,
    COUNTER_ITEMS, ROOMS, ROOM_COUNT,
};
use crate::character::progression;
use crate::character::record::PlayerRecord;
use crate::combat::logic::{after_grant, roll_counter_item, BoutContext};
use crate::combat::modifiers::resolve;
use crate::combat::types::Opponent;
use crate::core::balance::{DUNGEON_QUIT_REWARDS, DUNGEON_SAFE_HAVENS};
use crate::core::config::{DungeonConfig, EngineConfig};
use crate::core::error::Rejection;
use crate::effects::buffs::{self, BoutKind};
use crate::effects::items::ItemKind;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

// =============================================================================
// LOADOUT AND ENTRY
// =============================================================================

/// Draws a fresh random loadout of distinct counter items.
pub fn equip(
    record: &mut PlayerRecord,
    run_active: bool,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Result<Vec<String>, Rejection> {
    if run_active {
        return Err(Rejection::RunAlreadyActive);
    }
    let size = config.dungeon.loadout_size.min(COUNTER_ITEMS.len());
    let loadout: Vec<String> = COUNTER_ITEMS
        .choose_multiple(rng, size)
        .map(|(key, _)| key.to_string())
        .collect();

    let names: Vec<&str> = loadout.iter().map(|k| counter_item_name(k)).collect();
    let mut lines = vec![format!(
        "{} draws {}.",
        record.display_name,
        names.join(", ")
    )];
    for key in &loadout {
        let rooms: Vec<&str> = ROOMS
            .iter()
            .filter(|room| room.counters.contains(&key.as_str()))
            .map(|room| room.name)
            .collect();
        lines.push(format!("- {}: counters {}", counter_item_name(key), rooms.join(", ")));
    }
    record.dungeon.equipped = loadout;
    Ok(lines)
}

/// Starts a run. Rejected while a run is live, on the hardcore track, or
/// before the dungeon cooldown has passed since the last run.
pub fn enter(
    record: &mut PlayerRecord,
    active: Option<&DungeonRun>,
    channel: &str,
    mode: DungeonMode,
    config: &DungeonConfig,
    now: DateTime<Utc>,
) -> Result<(DungeonRun, Vec<String>), Rejection> {
    if active.is_some() {
        return Err(Rejection::RunAlreadyActive);
    }
    if record.is_hardcore() {
        return Err(Rejection::ModeConflict("on the hardcore track"));
    }
    if let Some(last) = record.dungeon.last_run_at {
        let elapsed = (now - last).num_seconds();
        if elapsed < config.cooldown_secs {
            return Err(Rejection::Cooldown {
                remaining_secs: config.cooldown_secs - elapsed,
            });
        }
    }

    record.dungeon.last_run_at = Some(now);
    record.dungeon.momentum = 0;
    let run = DungeonRun::new(&record.actor_id, channel, mode, now);
    tracing::info!(actor = %record.actor_id, channel, %mode, "dungeon run started");

    let mut lines = vec![format!(
        "{} descends into the Tenfold Depths ({ROOM_COUNT} rooms, {mode} mode).",
        record.display_name
    )];
    if record.dungeon.equipped.is_empty() {
        lines.push("You carry no loadout. Only your stock of counter items can help you.".to_string());
    }
    Ok((run, lines))
}

// =============================================================================
// ROOMS
// =============================================================================

/// Penalty ratio of one level's XP for losing in room `number` (1-based).
pub fn penalty_ratio(number: usize, config: &DungeonConfig) -> f64 {
    match number {
        0..=3 => config.penalty_early,
        4..=6 => config.penalty_mid,
        _ => config.penalty_late,
    }
}

/// Partial XP for quitting at a safe haven. Nothing when every room so far
/// was bypassed.
pub fn quit_reward(run: &DungeonRun) -> u64 {
    if run.rooms_fought == 0 {
        return 0;
    }
    DUNGEON_QUIT_REWARDS
        .iter()
        .find(|(lo, hi, _)| (*lo..=*hi).contains(&run.rooms_cleared))
        .map(|(_, _, xp)| *xp)
        .unwrap_or(0)
}

/// Spends a counter item for `room`, loadout first, then stock.
fn take_counter(record: &mut PlayerRecord, room: &RoomDef) -> Option<String> {
    for key in room.counters {
        if let Some(pos) = record.dungeon.equipped.iter().position(|k| k == key) {
            return Some(record.dungeon.equipped.remove(pos));
        }
    }
    for key in room.counters {
        if let Some(count) = record.dungeon.stock.get_mut(*key) {
            if *count > 0 {
                *count -= 1;
                if *count == 0 {
                    record.dungeon.stock.remove(*key);
                }
                return Some(key.to_string());
            }
        }
    }
    None
}

fn fight_room(
    record: &mut PlayerRecord,
    run: &mut DungeonRun,
    room: &RoomDef,
    number: usize,
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
    lines: &mut Vec<String>,
) -> RoomOutcome {
    let config = ctx.config;
    let dc = &config.dungeon;
    let opponent = Opponent {
        name: room.guardian.to_string(),
        level: room.guardian_level(record.level),
        notable: false,
        boss: false,
        legend_of: None,
        xp_min: room.xp,
        xp_max: room.xp,
    };

    let momentum = record.dungeon.momentum;
    let momentum_bonus = momentum as f64 * dc.momentum_bonus;
    let veteran = if record.prestige >= dc.veteran_prestige {
        dc.veteran_bonus
    } else {
        0.0
    };
    let mut modifiers = ctx.modifiers(record, &opponent, BoutKind::Dungeon, 1);
    modifiers.extra_adjust = room.win_adjust + momentum_bonus + veteran;
    let resolution = resolve(record, &modifiers, config);

    if momentum > 0 {
        lines.push(format!(
            "Momentum bonus: +{:.0}% win chance ({momentum} consecutive clears)",
            momentum_bonus * 100.0
        ));
    }
    if veteran > 0.0 {
        lines.push(format!(
            "Veteran warrior bonus: +{:.0}% win chance (Prestige {})",
            veteran * 100.0,
            record.prestige
        ));
    }
    lines.extend(resolution.notes.iter().cloned());

    run.rooms_fought += 1;
    let won = resolution.guaranteed_win || rng.gen::<f64>() < resolution.win_chance;
    let chance_pct = (resolution.win_chance * 100.0).round();
    tracing::debug!(
        actor = %record.actor_id,
        room = room.id,
        chance = resolution.win_chance,
        won,
        "dungeon room resolved"
    );

    if won {
        let xp = (room.xp as f64 * resolution.reward_for(true)).round().max(0.0) as u64;
        lines.push(format!(
            "You defeat the {opponent}! (Win chance: {chance_pct}%) +{xp} XP"
        ));
        let grant = progression::grant_xp(record, xp, config);
        lines.extend(after_grant(record, grant, ctx));
        run.xp_accumulated += xp;
        record.dungeon.momentum += 1;
        if let Some(key) = roll_counter_item(record, config, rng) {
            lines.push(format!(
                "Something glints in the rubble: {}.",
                counter_item_name(&key)
            ));
        }
        buffs::consume_after_bout(&mut record.buffs, true, BoutKind::Dungeon);
        RoomOutcome::Won { room: number, xp }
    } else {
        lines.push(format!(
            "The {opponent} overwhelms you! (Win chance: {chance_pct}%)"
        ));
        let base = progression::xp_for_level(&config.progression.xp_curve, record.level);
        let penalty = ((base as f64 * penalty_ratio(number, dc)).round() as u64).max(1);
        let level_before = record.level;
        let xp_lost = progression::deduct_xp(record, penalty, config);
        if record.level < level_before {
            lines.push(format!(
                "You lose {xp_lost} XP, dropping to level {}.",
                record.level
            ));
        } else {
            lines.push(format!("You lose {xp_lost} XP."));
        }
        record.dungeon.momentum = 0;
        buffs::consume_after_bout(&mut record.buffs, false, BoutKind::Dungeon);
        RoomOutcome::Lost {
            room: number,
            xp_lost,
        }
    }
}

fn safe_haven_lines(record: &PlayerRecord, run: &DungeonRun, config: &DungeonConfig) -> Vec<String> {
    let momentum = record.dungeon.momentum;
    vec![
        format!(
            "=== SAFE HAVEN (after room {}/{ROOM_COUNT}) ===",
            run.rooms_cleared
        ),
        "Torches burn with soothing light. You may use items here.".to_string(),
        format!(
            "Current momentum: {momentum} consecutive clears (+{:.0}% win chance)",
            momentum as f64 * config.momentum_bonus * 100.0
        ),
        format!(
            "Continue to press onward, or quit to retreat with {} XP.",
            quit_reward(run)
        ),
    ]
}

fn end_run(record: &mut PlayerRecord) {
    record.dungeon.equipped.clear();
    record.dungeon.momentum = 0;
}

fn fail_run(
    record: &mut PlayerRecord,
    room: usize,
    config: &DungeonConfig,
    rng: &mut impl Rng,
    lines: &mut Vec<String>,
) {
    end_run(record);
    let progress = &mut record.dungeon;
    progress.failure_streak += 1;
    record.history.dungeons_failed += 1;

    let odds = (config.decay_per_failure * progress.failure_streak as f64).min(config.decay_max);
    if progress.relic_charges > 0 && rng.gen::<f64>() < odds {
        progress.relic_charges -= 1;
        lines.push(format!(
            "The depths claw back a relic charge ({} left).",
            progress.relic_charges
        ));
    }
    lines.push(format!(
        "{} was defeated in room {room} ({}).",
        record.display_name,
        ROOMS[room - 1].name
    ));
    tracing::info!(
        actor = %record.actor_id,
        room,
        failure_streak = record.dungeon.failure_streak,
        "dungeon run failed"
    );
}

fn complete_run(record: &mut PlayerRecord, run: &DungeonRun, config: &DungeonConfig, lines: &mut Vec<String>) {
    end_run(record);
    record.history.dungeons_completed += 1;
    let progress = &mut record.dungeon;
    progress.failure_streak = 0;
    progress.relic_charges += config.completion_charges;

    lines.push(format!(
        "You conquer the Heart of the Abyss! A relic charge hums in your pack ({} of {}).",
        progress.relic_charges, config.charges_per_relic
    ));
    let mut relics = 0;
    while progress.relic_charges >= config.charges_per_relic {
        progress.relic_charges -= config.charges_per_relic;
        relics += 1;
    }
    if relics > 0 {
        record.add_item(ItemKind::DungeonRelic.key(), relics);
        lines.push(format!(
            "Your charges fuse into {relics} {}! Use it to guarantee your next solo victories.",
            ItemKind::DungeonRelic.display_name()
        ));
    }
    lines.push(format!(
        "{} cleared all {ROOM_COUNT} rooms ({} XP earned).",
        record.display_name, run.xp_accumulated
    ));
    tracing::info!(
        actor = %record.actor_id,
        fought = run.rooms_fought,
        xp = run.xp_accumulated,
        "dungeon run completed"
    );
}

/// Resolves rooms from `run.next_room` until the run pauses, fails or
/// completes.
pub fn advance(
    record: &mut PlayerRecord,
    run: &mut DungeonRun,
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
) -> Advance {
    run.at_safe_haven = false;
    let mut rooms = Vec::new();
    let mut lines = Vec::new();

    while run.next_room < ROOM_COUNT {
        let number = run.next_room + 1;
        let room = &ROOMS[run.next_room];
        lines.push(format!("Room {number}/{ROOM_COUNT}: {}", room.name));
        lines.push(room.intro.to_string());

        let outcome = match take_counter(record, room) {
            Some(item) => {
                lines.push(room.bypass_text.to_string());
                record.dungeon.momentum = 0;
                RoomOutcome::Bypassed { room: number, item }
            }
            None => fight_room(record, run, room, number, ctx, rng, &mut lines),
        };
        let lost = matches!(outcome, RoomOutcome::Lost { .. });
        rooms.push(outcome);

        if lost {
            fail_run(record, number, &ctx.config.dungeon, rng, &mut lines);
            return Advance {
                status: RunStatus::Failed { room: number },
                rooms,
                lines,
            };
        }

        run.rooms_cleared = number;
        run.next_room = number;
        if run.mode == DungeonMode::Step && DUNGEON_SAFE_HAVENS.contains(&number) {
            run.at_safe_haven = true;
            lines.extend(safe_haven_lines(record, run, &ctx.config.dungeon));
            return Advance {
                status: RunStatus::SafeHaven { after_room: number },
                rooms,
                lines,
            };
        }
    }

    complete_run(record, run, &ctx.config.dungeon, &mut lines);
    Advance {
        status: RunStatus::Completed,
        rooms,
        lines,
    }
}

/// Leaves a safe haven and keeps going.
pub fn continue_run(
    record: &mut PlayerRecord,
    run: &mut DungeonRun,
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
) -> Result<Advance, Rejection> {
    if !run.at_safe_haven {
        return Err(Rejection::NotAtSafeHaven);
    }
    let line = format!("You steel yourself and venture into room {}...", run.next_room + 1);
    let mut result = advance(record, run, ctx, rng);
    result.lines.insert(0, line);
    Ok(result)
}

/// Retreats from a safe haven with the partial XP reward. No relic charge.
pub fn quit(
    record: &mut PlayerRecord,
    run: &DungeonRun,
    ctx: &BoutContext<'_>,
) -> Result<Vec<String>, Rejection> {
    if !run.at_safe_haven {
        return Err(Rejection::NotAtSafeHaven);
    }
    let reward = quit_reward(run);
    end_run(record);
    let mut lines = vec![format!(
        "{} retreats from the dungeon after clearing {} rooms.",
        record.display_name, run.rooms_cleared
    )];
    if reward > 0 {
        let grant = progression::grant_xp(record, reward, ctx.config);
        lines.push(format!("You carry out {reward} XP worth of spoils."));
        lines.extend(after_grant(record, grant, ctx));
    } else {
        lines.push("You slipped past every guardian and have nothing to show for it.".to_string());
    }
    tracing::info!(actor = %record.actor_id, rooms = run.rooms_cleared, reward, "dungeon run abandoned");
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::challenge::{self, Ability, ChallengePath};
    use crate::character::hardcore;
    use crate::core::content::ContentTable;
    use crate::effects::injury::{self, InjuryDef};
    use chrono::Duration;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        config: EngineConfig,
        classes: Vec<String>,
        paths: Vec<ChallengePath>,
        abilities: Vec<Ability>,
        injuries: Vec<InjuryDef>,
        now: DateTime<Utc>,
    }

    impl Fixture {
        /// `odds` pins every room's win chance.
        fn new(odds: f64) -> Self {
            let content = ContentTable::builtin();
            let mut config = EngineConfig::default();
            config.combat.min_win_chance = odds;
            config.combat.max_win_chance = odds;
            config.drops.counter_item_chance = 0.0;
            Self {
                config,
                classes: vec!["warrior".into(), "rogue".into(), "cleric".into()],
                paths: challenge::load_paths(&content),
                abilities: challenge::load_abilities(&content),
                injuries: injury::injury_catalog(&content),
                now: Utc::now(),
            }
        }

        fn ctx(&self) -> BoutContext<'_> {
            BoutContext {
                config: &self.config,
                classes: &self.classes,
                paths: &self.paths,
                abilities: &self.abilities,
                injuries: &self.injuries,
                boss_buff: None,
                now: self.now,
            }
        }

        fn record(&self, level: u32) -> PlayerRecord {
            let mut r = PlayerRecord::new("u1", "Hero", self.now, &self.config);
            progression::reset_to_level(&mut r, level, &self.config);
            r
        }

        fn start(&self, r: &mut PlayerRecord, mode: DungeonMode) -> DungeonRun {
            enter(r, None, "#quest", mode, &self.config.dungeon, self.now)
                .unwrap()
                .0
        }
    }

    fn full_stock(r: &mut PlayerRecord) {
        for room in &ROOMS {
            *r.dungeon.stock.entry(room.counters[0].to_string()).or_insert(0) += 1;
        }
    }

    #[test]
    fn test_equip_draws_distinct_loadout() {
        let f = Fixture::new(0.5);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut r = f.record(5);
        let lines = equip(&mut r, false, &f.config, &mut rng).unwrap();
        assert_eq!(r.dungeon.equipped.len(), 4);
        let mut unique = r.dungeon.equipped.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
        assert_eq!(lines.len(), 5);

        assert_eq!(
            equip(&mut r, true, &f.config, &mut rng),
            Err(Rejection::RunAlreadyActive)
        );
    }

    #[test]
    fn test_enter_rejections() {
        let f = Fixture::new(0.5);
        let mut r = f.record(20);
        let (run, _) = enter(&mut r, None, "#quest", DungeonMode::Step, &f.config.dungeon, f.now).unwrap();
        assert_eq!(r.dungeon.last_run_at, Some(f.now));

        assert_eq!(
            enter(&mut r, Some(&run), "#quest", DungeonMode::Step, &f.config.dungeon, f.now).unwrap_err(),
            Rejection::RunAlreadyActive
        );
        let later = f.now + Duration::seconds(600);
        assert_eq!(
            enter(&mut r, None, "#quest", DungeonMode::Step, &f.config.dungeon, later).unwrap_err(),
            Rejection::Cooldown { remaining_secs: 300 }
        );

        let mut hc = f.record(20);
        hardcore::enter(&mut hc, &f.config, f.now).unwrap();
        assert!(matches!(
            enter(&mut hc, None, "#quest", DungeonMode::Step, &f.config.dungeon, f.now),
            Err(Rejection::ModeConflict(_))
        ));
    }

    #[test]
    fn test_nonstop_with_full_stock_bypasses_everything() {
        let f = Fixture::new(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut r = f.record(8);
        full_stock(&mut r);
        let mut run = f.start(&mut r, DungeonMode::Nonstop);

        let result = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.rooms.len(), 10);
        assert!(result
            .rooms
            .iter()
            .all(|o| matches!(o, RoomOutcome::Bypassed { .. })));
        assert_eq!(run.rooms_fought, 0);
        assert!(r.dungeon.stock.is_empty());
        assert_eq!(r.dungeon.relic_charges, 1);
        assert_eq!(r.dungeon.momentum, 0);
        assert_eq!(r.history.dungeons_completed, 1);
        assert_eq!(r.level, 8);
    }

    #[test]
    fn test_loadout_spent_before_stock() {
        let f = Fixture::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut r = f.record(5);
        r.dungeon.equipped = vec!["mirror_loom".into()];
        r.dungeon.stock.insert("mirror_loom".into(), 2);
        let mut run = f.start(&mut r, DungeonMode::Step);

        let result = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert_eq!(
            result.rooms[0],
            RoomOutcome::Bypassed {
                room: 1,
                item: "mirror_loom".into()
            }
        );
        assert_eq!(r.dungeon.stock.get("mirror_loom"), Some(&2));
    }

    #[test]
    fn test_step_mode_pauses_then_quits_with_partial_reward() {
        let f = Fixture::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut r = f.record(5);
        r.dungeon.equipped = vec!["gearstone".into()];
        let mut run = f.start(&mut r, DungeonMode::Step);

        let first = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert_eq!(first.status, RunStatus::SafeHaven { after_room: 3 });
        assert!(run.at_safe_haven);
        assert_eq!(run.rooms_fought, 3);
        assert_eq!(run.xp_accumulated, 110 + 115 + 130);
        assert_eq!(r.dungeon.momentum, 3);

        let second = continue_run(&mut r, &mut run, &f.ctx(), &mut rng).unwrap();
        assert_eq!(second.status, RunStatus::SafeHaven { after_room: 6 });
        assert!(second.lines[0].contains("room 4"));

        let xp_before = progression::total_xp(&r, &f.config.progression.xp_curve);
        let lines = quit(&mut r, &run, &f.ctx()).unwrap();
        assert!(lines.iter().any(|l| l.contains("500 XP")));
        assert_eq!(
            progression::total_xp(&r, &f.config.progression.xp_curve),
            xp_before + 500
        );
        assert!(r.dungeon.equipped.is_empty());
        assert_eq!(r.dungeon.relic_charges, 0);
    }

    #[test]
    fn test_bypass_resets_momentum() {
        let f = Fixture::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut r = f.record(5);
        r.dungeon.stock.insert("gravity_boots".into(), 1);
        let mut run = f.start(&mut r, DungeonMode::Step);

        let result = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert!(matches!(result.rooms[1], RoomOutcome::Bypassed { .. }));
        assert_eq!(r.dungeon.momentum, 1);
        assert_eq!(run.rooms_fought, 2);
    }

    #[test]
    fn test_nonstop_never_pauses() {
        let f = Fixture::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut r = f.record(5);
        let mut run = f.start(&mut r, DungeonMode::Nonstop);
        let result = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(run.rooms_fought, 10);
        assert_eq!(r.dungeon.momentum, 0);
        assert!(run.is_finished());
    }

    #[test]
    fn test_loss_applies_penalty_and_relic_decay() {
        let mut f = Fixture::new(0.0);
        f.config.dungeon.decay_per_failure = 1.0;
        f.config.dungeon.decay_max = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut r = f.record(5);
        r.dungeon.relic_charges = 3;
        r.dungeon.equipped = vec!["gearstone".into()];
        let mut run = f.start(&mut r, DungeonMode::Step);

        let result = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert_eq!(result.status, RunStatus::Failed { room: 1 });
        // 0.75 of the 500 XP level-5 step, taken from 1000 total XP
        assert_eq!(result.rooms[0], RoomOutcome::Lost { room: 1, xp_lost: 375 });
        assert_eq!(r.level, 4);
        assert_eq!(r.xp, 25);
        assert_eq!(r.dungeon.failure_streak, 1);
        assert_eq!(r.dungeon.relic_charges, 2);
        assert_eq!(r.history.dungeons_failed, 1);
        assert!(r.dungeon.equipped.is_empty());
    }

    #[test]
    fn test_completion_fuses_charges_into_relic() {
        let f = Fixture::new(0.0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut r = f.record(5);
        r.dungeon.relic_charges = 3;
        r.dungeon.failure_streak = 2;
        full_stock(&mut r);
        let mut run = f.start(&mut r, DungeonMode::Nonstop);

        let result = advance(&mut r, &mut run, &f.ctx(), &mut rng);
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(r.dungeon.relic_charges, 0);
        assert_eq!(r.dungeon.failure_streak, 0);
        assert_eq!(r.item_count("dungeon_relic"), 1);
    }

    #[test]
    fn test_continue_and_quit_need_safe_haven() {
        let f = Fixture::new(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut r = f.record(5);
        let mut run = f.start(&mut r, DungeonMode::Step);
        assert_eq!(
            continue_run(&mut r, &mut run, &f.ctx(), &mut rng).unwrap_err(),
            Rejection::NotAtSafeHaven
        );
        assert_eq!(quit(&mut r, &run, &f.ctx()).unwrap_err(), Rejection::NotAtSafeHaven);
    }

    #[test]
    fn test_quit_reward_table() {
        let mut run = DungeonRun::new("u1", "#quest", DungeonMode::Step, Utc::now());
        run.rooms_cleared = 3;
        assert_eq!(quit_reward(&run), 0);
        run.rooms_fought = 1;
        assert_eq!(quit_reward(&run), 250);
        run.rooms_cleared = 6;
        assert_eq!(quit_reward(&run), 500);
        run.rooms_cleared = 9;
        assert_eq!(quit_reward(&run), 800);
        run.rooms_cleared = 2;
        assert_eq!(quit_reward(&run), 100);
    }

    #[test]
    fn test_penalty_ratio_bands() {
        let c = DungeonConfig::default();
        assert_eq!(penalty_ratio(3, &c), 0.75);
        assert_eq!(penalty_ratio(4, &c), 0.50);
        assert_eq!(penalty_ratio(6, &c), 0.50);
        assert_eq!(penalty_ratio(10, &c), 0.25);
    }
}
