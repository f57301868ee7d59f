//! Solo bout resolution and per-participant settlement.
//!
//! The engine drives the order: [`check_ready`], injury purge, the quiet
//! lands roll, boss escalation, then [`fight_solo`]. Settlement is split out
//! ([`settle_solo`], [`settle_group_share`]) so a bout's consequences can be
//! applied with a known outcome.

use super::modifiers::{resolve, ModifierContext, Resolution};
use super::types::{BoutReport, Opponent};
use crate::boss_hunt::types::BossBuff;
use crate::character::challenge::{self, Ability, ChallengePath};
use crate::character::hardcore::{self, HardcoreOutcome};
use crate::character::progression::{self, XpGrant};
use crate::character::record::PlayerRecord;
use crate::core::config::{Difficulty, EngineConfig};
use crate::core::error::Rejection;
use crate::dungeon::types::{counter_item_name, COUNTER_ITEMS};
use crate::effects::buffs::{self, BoutKind};
use crate::effects::injury::{self, InjuryDef};
use crate::effects::items;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

/// Read-only inputs shared by every bout in one action.
#[derive(Debug, Clone, Copy)]
pub struct BoutContext<'a> {
    pub config: &'a EngineConfig,
    pub classes: &'a [String],
    pub paths: &'a [ChallengePath],
    pub abilities: &'a [Ability],
    pub injuries: &'a [InjuryDef],
    pub boss_buff: Option<&'a BossBuff>,
    pub now: DateTime<Utc>,
}

impl<'a> BoutContext<'a> {
    /// Modifier context for `record` against `opponent`.
    pub fn modifiers(
        &self,
        record: &PlayerRecord,
        opponent: &Opponent,
        bout: BoutKind,
        participants: usize,
    ) -> ModifierContext<'a> {
        ModifierContext {
            opponent_level: opponent.level,
            participants,
            classes: self.classes,
            challenge: challenge::active_path(record, self.paths),
            boss_buff: self.boss_buff,
            notable: opponent.notable,
            bout,
            extra_adjust: 0.0,
            include_energy_penalty: true,
            include_consumables: bout != BoutKind::Group,
        }
    }
}

/// Rejects a solo action on cooldown or without energy. Changes nothing.
pub fn check_ready(
    record: &PlayerRecord,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<(), Rejection> {
    if let Some(last) = record.last_solo_at {
        let elapsed = (now - last).num_seconds();
        let cooldown = config.combat.solo_cooldown_secs;
        if elapsed < cooldown {
            return Err(Rejection::Cooldown {
                remaining_secs: cooldown - elapsed,
            });
        }
    }
    let cost = config.energy.solo_cost;
    if record.energy < cost {
        return Err(Rejection::InsufficientEnergy {
            needed: cost,
            have: record.energy,
        });
    }
    Ok(())
}

/// Whether a monster shows up at all this time.
pub fn roll_monster_appears(config: &EngineConfig, rng: &mut impl Rng) -> bool {
    rng.gen::<f64>() < config.combat.monster_spawn_chance
}

/// No monster: a little XP for the walk, no energy spent.
pub fn quiet_lands(record: &mut PlayerRecord, ctx: &BoutContext<'_>) -> Vec<String> {
    record.last_solo_at = Some(ctx.now);
    let amount = ctx.config.combat.quiet_lands_xp;
    let grant = progression::grant_xp(record, amount, ctx.config);
    let mut lines = vec![format!(
        "You explore the lands but find no monsters. (+{amount} XP)"
    )];
    lines.extend(after_grant(record, grant, ctx));
    lines
}

/// Boss escalation can only happen in its level band, off the hardcore track.
pub fn boss_escalation_eligible(record: &PlayerRecord, config: &EngineConfig) -> bool {
    let c = &config.combat;
    !record.is_hardcore()
        && (c.boss_encounter_min_level..=c.boss_encounter_max_level).contains(&record.level)
}

/// Level-up lines plus whatever hitting the cap finishes: the hardcore
/// track on it, the challenge path otherwise.
pub(crate) fn after_grant(record: &mut PlayerRecord, grant: XpGrant, ctx: &BoutContext<'_>) -> Vec<String> {
    let mut lines = grant.lines;
    if grant.reached_cap {
        if record.is_hardcore() {
            lines.extend(hardcore::complete(record, ctx.config));
        } else {
            lines.extend(challenge::check_completion(record, ctx.paths, ctx.abilities));
        }
    }
    lines
}

fn injury_reduction(record: &PlayerRecord, ctx: &BoutContext<'_>) -> f64 {
    let class = (record.class_slot(ctx.classes) == Some(2)).then_some(ctx.config.injuries.class_reduction);
    injury::combined_reduction(
        buffs::injury_reductions(&record.buffs).chain(class),
        ctx.config.injuries.max_reduction,
    )
}

/// Rolls a counter-item drop into the dungeon stock, preferring items the
/// player has none of.
pub fn roll_counter_item(
    record: &mut PlayerRecord,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Option<String> {
    if rng.gen::<f64>() >= config.drops.counter_item_chance {
        return None;
    }
    let missing: Vec<&str> = COUNTER_ITEMS
        .iter()
        .map(|(key, _)| *key)
        .filter(|key| !record.dungeon.stock.contains_key(*key))
        .collect();
    let key = if missing.is_empty() {
        COUNTER_ITEMS.choose(rng).map(|(key, _)| *key)?
    } else {
        missing.choose(rng).copied()?
    };
    *record.dungeon.stock.entry(key.to_string()).or_insert(0) += 1;
    Some(key.to_string())
}

fn apply_hardcore(
    record: &mut PlayerRecord,
    won: bool,
    opponent: &Opponent,
    reward_multiplier: f64,
    config: &EngineConfig,
) -> Option<(HardcoreOutcome, Vec<String>)> {
    if !record.is_hardcore() {
        return None;
    }
    let damage = hardcore::bout_damage(
        won,
        opponent.boss,
        opponent.level,
        reward_multiplier,
        &config.hardcore,
    );
    Some(hardcore::apply_bout(record, damage, config))
}

fn streak_multiplier(streak: u32, config: &EngineConfig) -> f64 {
    1.0 + config.combat.win_streak_bonus * streak.min(config.combat.win_streak_cap) as f64
}

/// Spends energy, resolves modifiers, rolls and settles one solo bout.
pub fn fight_solo(
    record: &mut PlayerRecord,
    opponent: Opponent,
    difficulty: Difficulty,
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
) -> BoutReport {
    record.energy = record.energy.saturating_sub(ctx.config.energy.solo_cost);
    record.last_solo_at = Some(ctx.now);

    let modifiers = ctx.modifiers(record, &opponent, BoutKind::Solo, 1);
    let resolution = resolve(record, &modifiers, ctx.config);
    let won = resolution.guaranteed_win || rng.gen::<f64>() < resolution.win_chance;
    settle_solo(record, opponent, &resolution, won, difficulty.xp_mult, ctx, rng)
}

/// Applies the consequences of a solo bout whose outcome is known.
pub fn settle_solo(
    record: &mut PlayerRecord,
    opponent: Opponent,
    resolution: &Resolution,
    won: bool,
    difficulty_xp_mult: f64,
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
) -> BoutReport {
    let config = ctx.config;
    let mut report = BoutReport::new(
        opponent,
        won,
        resolution.win_chance,
        resolution.guaranteed_win,
    );
    let opponent = report.opponent.clone();
    let was_hardcore = record.is_hardcore();

    if opponent.notable {
        report.lines.push("A rare spawn appears!".to_string());
    }
    report.lines.extend(resolution.notes.iter().cloned());

    let base = rng.gen_range(opponent.xp_min..=opponent.xp_max.max(opponent.xp_min))
        + record.level as u64 * config.combat.xp_level_multiplier;
    let would_be = base as f64 * difficulty_xp_mult * resolution.reward_multiplier;
    let chance_pct = (resolution.win_chance * 100.0).round();

    if won {
        let mut xp = would_be * resolution.win_bonus_multiplier;
        report.crit = rng.gen::<f64>() < config.combat.crit_chance;
        if report.crit {
            xp *= 2.0;
        }
        let streak = record.history.win_streak;
        xp *= streak_multiplier(streak, config);
        record.history.win_streak = streak + 1;

        let today = ctx.now.date_naive();
        let first_win = record.history.last_win_day != Some(today);
        if first_win {
            xp += config.combat.first_win_bonus_xp as f64;
            record.history.last_win_day = Some(today);
        }
        xp *= injury::xp_multiplier(&record.injuries);
        let amount = xp.round().max(0.0) as u64;

        record.history.wins += 1;
        report.lines.push(format!(
            "Victory! (Win chance: {chance_pct}%) You defeated the {opponent} and gained {amount} XP."
        ));
        if report.crit {
            report.lines.push("CRITICAL HIT! XP doubled!".to_string());
        }
        if streak > 0 {
            report.lines.push(format!(
                "Win streak x{}! (+{}% XP)",
                streak + 1,
                ((streak_multiplier(streak, config) - 1.0) * 100.0).round()
            ));
        }
        if first_win {
            report.lines.push(format!(
                "First win of the day! (+{} XP)",
                config.combat.first_win_bonus_xp
            ));
        }

        let grant = progression::grant_xp(record, amount, config);
        report.xp_gained = amount;
        report.levels_gained = grant.levels_gained;
        let grant_lines = after_grant(record, grant, ctx);
        report.lines.extend(grant_lines);

        report.drop = items::roll_bout_drop(record, true, &config.drops, rng);
        if let Some(kind) = report.drop {
            report.lines.push(items::drop_line(kind, true));
        }
        report.counter_item = roll_counter_item(record, config, rng);
        if let Some(key) = &report.counter_item {
            report.lines.push(format!(
                "You pocket a strange trinket: {}.",
                counter_item_name(key)
            ));
        }
        report.clue_found = config.boss_hunt.enabled
            && !was_hardcore
            && rng.gen::<f64>() < config.boss_hunt.clue_drop_chance;
    } else {
        let loss = (would_be * config.combat.xp_loss_fraction).round() as u64;
        let removed = progression::deduct_xp(record, loss, config);
        record.history.losses += 1;
        report.xp_lost = removed;
        report.lines.push(format!(
            "Defeat! (Win chance: {chance_pct}%) The {opponent} was too strong. You lost {removed} XP."
        ));

        let reduction = injury_reduction(record, ctx);
        let roll = injury::roll_injury(record, ctx.injuries, &config.injuries, reduction, ctx.now, rng);
        if let Some(line) = roll.line() {
            report.lines.push(line);
        }
        report.injury = Some(roll);

        report.drop = items::roll_bout_drop(record, false, &config.drops, rng);
        if let Some(kind) = report.drop {
            report.lines.push(items::drop_line(kind, false));
        }
    }

    if let Some((outcome, lines)) =
        apply_hardcore(record, won, &opponent, resolution.reward_multiplier, config)
    {
        report.hardcore = Some(outcome);
        report.lines.extend(lines);
    } else if was_hardcore {
        // The win's XP finished the track before any damage was dealt.
        report.hardcore = Some(HardcoreOutcome::Completed);
    }

    buffs::consume_after_bout(&mut record.buffs, won, BoutKind::Solo);
    tracing::debug!(
        actor = %record.actor_id,
        opponent = %opponent,
        won,
        chance = resolution.win_chance,
        xp = report.xp_gained,
        "solo bout resolved"
    );
    report
}

/// Applies one participant's share of a resolved group bout.
///
/// `share` is that participant's slice of the XP pool before personal
/// multipliers.
pub fn settle_group_share(
    record: &mut PlayerRecord,
    opponent: &Opponent,
    won: bool,
    share: f64,
    participants: usize,
    ctx: &BoutContext<'_>,
    rng: &mut impl Rng,
) -> Vec<String> {
    let config = ctx.config;
    let modifiers = ctx.modifiers(record, opponent, BoutKind::Group, participants);
    let resolution = resolve(record, &modifiers, config);
    let name = record.display_name.clone();
    let mut lines = Vec::new();

    if won {
        let amount = (share * resolution.reward_for(true) * injury::xp_multiplier(&record.injuries))
            .round()
            .max(0.0) as u64;
        record.history.wins += 1;
        let grant = progression::grant_xp(record, amount, config);
        lines.push(format!("{name} gains {amount} XP."));
        lines.extend(
            after_grant(record, grant, ctx)
                .into_iter()
                .map(|l| format!("{name}: {l}")),
        );
    } else {
        let loss = (share * config.combat.xp_loss_fraction).round() as u64;
        let removed = progression::deduct_xp(record, loss, config);
        record.history.losses += 1;
        lines.push(format!("{name} loses {removed} XP."));
        let reduction = injury_reduction(record, ctx);
        let roll = injury::roll_injury(record, ctx.injuries, &config.injuries, reduction, ctx.now, rng);
        if let Some(line) = roll.line() {
            lines.push(format!("{name}: {line}"));
        }
    }

    if let Some((_, hc_lines)) =
        apply_hardcore(record, won, opponent, resolution.reward_multiplier, config)
    {
        lines.extend(hc_lines.into_iter().map(|l| format!("{name}: {l}")));
    }
    buffs::consume_after_bout(&mut record.buffs, won, BoutKind::Group);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{DropConfig, InjuryConfig};
    use crate::core::content::ContentTable;
    use crate::effects::buffs::CombatBuff;
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
        fn new() -> Self {
            let content = ContentTable::builtin();
            let mut config = EngineConfig::default();
            config.combat.crit_chance = 0.0;
            config.drops = DropConfig {
                win_chance: 0.0,
                loss_chance: 0.0,
                counter_item_chance: 0.0,
                ..DropConfig::default()
            };
            config.boss_hunt.clue_drop_chance = 0.0;
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
    }

    fn opponent(level: u32) -> Opponent {
        Opponent {
            name: "Goblin".into(),
            level,
            notable: false,
            boss: false,
            legend_of: None,
            xp_min: 10,
            xp_max: 10,
        }
    }

    fn settle(f: &Fixture, r: &mut PlayerRecord, won: bool, rng: &mut ChaCha8Rng) -> BoutReport {
        let ctx = f.ctx();
        let o = opponent(r.level);
        let res = resolve(r, &ctx.modifiers(r, &o, BoutKind::Solo, 1), &f.config);
        settle_solo(r, o, &res, won, 1.0, &ctx, rng)
    }

    #[test]
    fn test_check_ready_cooldown_and_energy() {
        let f = Fixture::new();
        let mut r = f.record(5);
        assert!(check_ready(&r, &f.config, f.now).is_ok());

        r.last_solo_at = Some(f.now - Duration::seconds(100));
        assert_eq!(
            check_ready(&r, &f.config, f.now),
            Err(Rejection::Cooldown { remaining_secs: 200 })
        );

        r.last_solo_at = Some(f.now - Duration::seconds(300));
        r.energy = 0;
        assert_eq!(
            check_ready(&r, &f.config, f.now),
            Err(Rejection::InsufficientEnergy { needed: 1, have: 0 })
        );
    }

    #[test]
    fn test_quiet_lands_grants_xp_without_energy() {
        let f = Fixture::new();
        let mut r = f.record(1);
        let lines = quiet_lands(&mut r, &f.ctx());
        assert_eq!(r.xp, 10);
        assert_eq!(r.energy, 10);
        assert_eq!(r.last_solo_at, Some(f.now));
        assert!(lines[0].contains("+10 XP"));
    }

    #[test]
    fn test_win_applies_first_win_bonus_and_streak() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut r = f.record(5);

        // (10 + 5*2) * 1.0 + 50 first win
        let report = settle(&f, &mut r, true, &mut rng);
        assert!(report.won);
        assert_eq!(report.xp_gained, 70);
        assert_eq!(r.history.win_streak, 1);
        assert_eq!(r.history.wins, 1);

        // second win: streak 1 gives +10%, no first-win bonus
        let report = settle(&f, &mut r, true, &mut rng);
        assert_eq!(report.xp_gained, 22);
        assert_eq!(r.history.win_streak, 2);
    }

    #[test]
    fn test_loss_deducts_quarter_and_resets_streak() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut r = f.record(5);
        r.xp = 100;
        r.history.win_streak = 3;
        let report = settle(&f, &mut r, false, &mut rng);
        assert!(!report.won);
        assert_eq!(report.xp_lost, 5);
        assert_eq!(r.xp, 95);
        assert_eq!(r.history.win_streak, 0);
        assert_eq!(r.history.losses, 1);
        assert!(report.injury.is_some());
    }

    #[test]
    fn test_injury_never_rolled_on_win() {
        let mut f = Fixture::new();
        f.config.injuries = InjuryConfig {
            chance_on_loss: 1.0,
            ..InjuryConfig::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut r = f.record(5);
        settle(&f, &mut r, true, &mut rng);
        assert!(r.injuries.is_empty());
        settle(&f, &mut r, false, &mut rng);
        assert_eq!(r.injuries.len(), 1);
    }

    #[test]
    fn test_xp_scroll_consumed_only_on_win() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut r = f.record(5);
        r.xp = 100;
        r.history.last_win_day = Some(f.now.date_naive());
        r.buffs.push(CombatBuff::xp_scroll());
        r.buffs.push(CombatBuff::lucky_charm());

        settle(&f, &mut r, false, &mut rng);
        assert!(buffs::has_active(&r.buffs, "xp_scroll"));
        assert!(!buffs::has_active(&r.buffs, "lucky_charm"));

        let report = settle(&f, &mut r, true, &mut rng);
        // (10 + 5*2) * 1.5
        assert_eq!(report.xp_gained, 30);
        assert!(r.buffs.is_empty());
    }

    #[test]
    fn test_fight_solo_with_relic_always_wins() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut r = f.record(1);
        r.buffs.push(CombatBuff::relic(2));
        let diff = f.config.combat.difficulty("hard");

        let report = fight_solo(&mut r, opponent(40), diff, &f.ctx(), &mut rng);
        assert!(report.won);
        assert!(report.guaranteed);
        assert_eq!(r.energy, 9);
        assert_eq!(buffs::guaranteed_wins_left(&r.buffs), 1);

        fight_solo(&mut r, opponent(40), diff, &f.ctx(), &mut rng);
        assert!(r.buffs.is_empty());
    }

    #[test]
    fn test_reaching_cap_on_path_completes_challenge() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        let mut r = f.record(19);
        r.prestige = 1;
        r.challenge.active_path = Some("iron_will".into());
        r.xp = r.xp_to_next - 1;
        let report = settle(&f, &mut r, true, &mut rng);
        assert_eq!(r.level, 20);
        assert!(report.lines.iter().any(|l| l.contains("CHALLENGE COMPLETED")));
        assert!(r.abilities.unlocked.contains("second_wind"));
    }

    #[test]
    fn test_hardcore_loss_costs_hp() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut r = f.record(20);
        hardcore::enter(&mut r, &f.config, f.now).unwrap();

        let report = settle(&f, &mut r, false, &mut rng);
        assert_eq!(report.hardcore, Some(HardcoreOutcome::Alive));
        // The XP loss drops a level first, then loss damage is 40 + 20 * 2.
        let hc = r.hardcore.as_ref().unwrap();
        assert_eq!(r.level, 19);
        assert_eq!(hc.hp, hc.max_hp - 80);
        assert!(!report.clue_found);
    }

    #[test]
    fn test_notable_win_can_also_find_a_clue() {
        // The rarity roll and the clue roll are independent: one win may carry both.
        let mut f = Fixture::new();
        f.config.boss_hunt.clue_drop_chance = 1.0;
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let mut r = f.record(5);
        let mut o = opponent(5);
        o.notable = true;
        let ctx = f.ctx();
        let res = resolve(&r, &ctx.modifiers(&r, &o, BoutKind::Solo, 1), &f.config);
        let report = settle_solo(&mut r, o, &res, true, 1.0, &ctx, &mut rng);
        assert!(report.lines.iter().any(|l| l == "A rare spawn appears!"));
        assert!(report.clue_found);
    }

    #[test]
    fn test_quiet_lands_to_hardcore_cap_completes_track() {
        let f = Fixture::new();
        let mut r = f.record(20);
        r.add_item("medkit", 1);
        hardcore::enter(&mut r, &f.config, f.now).unwrap();
        progression::reset_to_level(&mut r, 49, &f.config);
        r.xp = r.xp_to_next - 1;

        let lines = quiet_lands(&mut r, &f.ctx());
        assert!(!r.is_hardcore());
        assert_eq!(r.history.hardcore_completions, 1);
        assert_eq!((r.level, r.prestige), (1, 1));
        assert_eq!(r.item_count("medkit"), 1);
        assert!(r.locker.is_empty());
        assert!(r.pending_permanent_choice.as_ref().unwrap().contains("medkit"));
        assert!(lines.iter().any(|l| l == "*** HARDCORE COMPLETE! ***"));
    }

    #[test]
    fn test_win_to_hardcore_cap_completes_without_damage() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut r = f.record(20);
        hardcore::enter(&mut r, &f.config, f.now).unwrap();
        progression::reset_to_level(&mut r, 49, &f.config);
        r.xp = r.xp_to_next - 1;

        let report = settle(&f, &mut r, true, &mut rng);
        assert_eq!(report.hardcore, Some(HardcoreOutcome::Completed));
        assert!(!report.lines.iter().any(|l| l.starts_with("You take")));
        assert!(!r.is_hardcore());
        assert_eq!(r.prestige, 1);
    }

    #[test]
    fn test_counter_item_prefers_missing() {
        let mut config = EngineConfig::default();
        config.drops.counter_item_chance = 1.0;
        let mut r = PlayerRecord::new("u1", "Hero", Utc::now(), &config);
        for (key, _) in COUNTER_ITEMS.iter().skip(1) {
            r.dungeon.stock.insert(key.to_string(), 1);
        }
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let got = roll_counter_item(&mut r, &config, &mut rng).unwrap();
        assert_eq!(got, COUNTER_ITEMS[0].0);
    }

    #[test]
    fn test_boss_escalation_band() {
        let f = Fixture::new();
        let mut r = f.record(16);
        assert!(!boss_escalation_eligible(&r, &f.config));
        r.level = 17;
        assert!(boss_escalation_eligible(&r, &f.config));
        r.level = 20;
        hardcore::enter(&mut r, &f.config, f.now).unwrap();
        assert!(!boss_escalation_eligible(&r, &f.config));
    }

    #[test]
    fn test_group_share_applies_personal_multiplier() {
        let f = Fixture::new();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut r = f.record(5);
        r.prestige = 2;
        r.buffs.push(CombatBuff::lucky_charm());
        let lines = settle_group_share(&mut r, &opponent(8), true, 100.0, 2, &f.ctx(), &mut rng);
        assert_eq!(r.xp, 125);
        assert_eq!(lines[0], "Hero gains 125 XP.");
        // group bouts leave chance buffs alone
        assert!(buffs::has_active(&r.buffs, "lucky_charm"));
    }
}
