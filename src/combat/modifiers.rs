//! Win chance and reward multiplier for one participant.
//!
//! Pure: everything random (the notable roll, the bout roll) happens in the
//! caller and arrives here as plain data.

use crate::boss_hunt::types::BossBuff;
use crate::character::challenge::ChallengePath;
use crate::character::energy;
use crate::character::prestige::{prestige_win_bonus, prestige_xp_multiplier};
use crate::character::record::PlayerRecord;
use crate::core::balance::{
    BUFF_CHANCE_PER_LEVEL, CLASS_EARLY_BAND_MAX, CLASS_STRONG_BONUS, CLASS_WEAK_PENALTY,
};
use crate::core::config::EngineConfig;
use crate::effects::buffs::{self, BoutKind};

/// Everything besides the record that feeds the modifier stack.
#[derive(Debug, Clone)]
pub struct ModifierContext<'a> {
    pub opponent_level: u32,
    /// Party size, 1 for solo and dungeon bouts.
    pub participants: usize,
    /// Ordered class list; a record's class slot is its position here.
    pub classes: &'a [String],
    pub challenge: Option<&'a ChallengePath>,
    pub boss_buff: Option<&'a BossBuff>,
    pub notable: bool,
    pub bout: BoutKind,
    /// Flow-specific adjustment (dungeon room, momentum, veteran bonus).
    pub extra_adjust: f64,
    pub include_energy_penalty: bool,
    pub include_consumables: bool,
}

impl<'a> ModifierContext<'a> {
    /// A solo bout against `opponent_level` with every modifier enabled.
    pub fn solo(opponent_level: u32, classes: &'a [String]) -> Self {
        Self {
            opponent_level,
            participants: 1,
            classes,
            challenge: None,
            boss_buff: None,
            notable: false,
            bout: BoutKind::Solo,
            extra_adjust: 0.0,
            include_energy_penalty: true,
            include_consumables: true,
        }
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Clamped to the configured range.
    pub win_chance: f64,
    /// Applies to any XP from the bout.
    pub reward_multiplier: f64,
    /// Extra multiplier that only applies when the bout is won (XP scroll).
    pub win_bonus_multiplier: f64,
    /// The bout is won without rolling.
    pub guaranteed_win: bool,
    pub notes: Vec<String>,
}

impl Resolution {
    pub fn reward_for(&self, won: bool) -> f64 {
        if won {
            self.reward_multiplier * self.win_bonus_multiplier
        } else {
            self.reward_multiplier
        }
    }
}

/// `base + per_level * (player - opponent)`, unclamped.
pub fn base_chance(player_level: f64, opponent_level: u32, config: &EngineConfig) -> f64 {
    let c = &config.combat;
    c.base_win_chance + c.win_chance_per_level * (player_level - opponent_level as f64)
}

pub fn group_size_bonus(participants: usize, config: &EngineConfig) -> f64 {
    participants.saturating_sub(1) as f64 * config.group.bonus_per_extra
}

/// Class slot 0 is strong early and weak late, slot 1 the reverse. Slot 2
/// trades win chance for injury resistance. Levels past the normal cap use
/// the late row.
pub fn class_win_bonus(slot: Option<usize>, level: u32) -> f64 {
    let early = level <= CLASS_EARLY_BAND_MAX;
    match (slot, early) {
        (Some(0), true) | (Some(1), false) => CLASS_STRONG_BONUS,
        (Some(0), false) | (Some(1), true) => CLASS_WEAK_PENALTY,
        _ => 0.0,
    }
}

pub fn boss_buff_chance(buff: Option<&BossBuff>) -> f64 {
    buff.map(|b| b.level_reduction as f64 * BUFF_CHANCE_PER_LEVEL)
        .unwrap_or(0.0)
}

/// Group odds: party average against the opponent, plus the party bonus and
/// the realm buff. Personal modifiers do not apply.
pub fn group_win_chance(
    average_level: f64,
    opponent_level: u32,
    participants: usize,
    boss_buff: Option<&BossBuff>,
    config: &EngineConfig,
) -> f64 {
    let raw = base_chance(average_level, opponent_level, config)
        + group_size_bonus(participants, config)
        + boss_buff_chance(boss_buff);
    config.combat.clamp_chance(raw)
}

fn pct(value: f64) -> String {
    format!("{:+.0}%", value * 100.0)
}

/// Computes the full modifier stack for one participant.
pub fn resolve(record: &PlayerRecord, ctx: &ModifierContext<'_>, config: &EngineConfig) -> Resolution {
    let mut notes = Vec::new();
    let mut chance = base_chance(record.level as f64, ctx.opponent_level, config);
    let mut reward = 1.0;

    if ctx.include_energy_penalty {
        if let Some(penalty) = energy::active_penalty(record.energy, &config.energy) {
            chance += penalty.win_chance_modifier;
            reward *= penalty.xp_multiplier;
            notes.push(format!("Exhausted ({})", pct(penalty.win_chance_modifier)));
        }
    }

    chance += group_size_bonus(ctx.participants, config);

    let prestige_bonus = prestige_win_bonus(record.prestige);
    if prestige_bonus > 0.0 {
        chance += prestige_bonus;
        notes.push(format!("Prestige {} ({})", record.prestige, pct(prestige_bonus)));
    }
    reward *= prestige_xp_multiplier(record.prestige);

    let class_bonus = class_win_bonus(record.class_slot(ctx.classes), record.level);
    if class_bonus != 0.0 {
        chance += class_bonus;
        if let Some(name) = &record.class_name {
            notes.push(format!("{name} ({})", pct(class_bonus)));
        }
    }

    if let Some(path) = ctx.challenge {
        chance += path.win_chance_modifier;
        reward *= path.xp_multiplier;
        if path.win_chance_modifier != 0.0 {
            notes.push(format!("{} ({})", path.name, pct(path.win_chance_modifier)));
        }
    }

    if let Some(buff) = ctx.boss_buff {
        chance += boss_buff_chance(Some(buff));
        reward *= buff.xp_multiplier;
        notes.push(format!(
            "The heat's off (enemies -{} levels, XP x{})",
            buff.level_reduction, buff.xp_multiplier
        ));
    }

    let mut win_bonus = 1.0;
    let mut guaranteed = false;
    if ctx.include_consumables {
        let charm = buffs::chance_bonus(&record.buffs);
        if charm > 0.0 && ctx.bout != BoutKind::Group {
            chance += charm;
            notes.push(format!("Your lucky charm glows! ({})", pct(charm)));
        }
        win_bonus = buffs::win_xp_multiplier(&record.buffs);
        guaranteed = buffs::has_guaranteed_win(&record.buffs, ctx.bout);
        if guaranteed {
            notes.push("The Dungeon Relic blazes with power, guaranteeing victory!".to_string());
        }
    }

    if ctx.notable {
        reward *= config.combat.notable_xp_multiplier;
    }

    chance += ctx.extra_adjust;

    Resolution {
        win_chance: config.combat.clamp_chance(chance),
        reward_multiplier: reward,
        win_bonus_multiplier: win_bonus,
        guaranteed_win: guaranteed,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::buffs::CombatBuff;
    use chrono::{Duration, Utc};

    fn setup() -> (PlayerRecord, EngineConfig, Vec<String>) {
        let config = EngineConfig::default();
        let mut record = PlayerRecord::new("u1", "Hero", Utc::now(), &config);
        record.level = 10;
        let classes = vec!["warrior".to_string(), "rogue".to_string(), "cleric".to_string()];
        (record, config, classes)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_even_fight_is_coin_flip() {
        let (record, config, classes) = setup();
        let res = resolve(&record, &ModifierContext::solo(10, &classes), &config);
        assert!(close(res.win_chance, 0.5));
        assert!(close(res.reward_multiplier, 1.0));
        assert!(!res.guaranteed_win);
    }

    #[test]
    fn test_chance_is_clamped() {
        let (mut record, config, classes) = setup();
        record.level = 1;
        let res = resolve(&record, &ModifierContext::solo(20, &classes), &config);
        assert!(close(res.win_chance, 0.05));
        record.level = 20;
        let res = resolve(&record, &ModifierContext::solo(1, &classes), &config);
        assert!(close(res.win_chance, 0.95));
    }

    #[test]
    fn test_class_rows() {
        assert_eq!(class_win_bonus(Some(0), 5), 0.25);
        assert_eq!(class_win_bonus(Some(0), 15), -0.10);
        assert_eq!(class_win_bonus(Some(1), 5), -0.10);
        assert_eq!(class_win_bonus(Some(1), 15), 0.25);
        assert_eq!(class_win_bonus(Some(1), 35), 0.25);
        assert_eq!(class_win_bonus(Some(2), 5), 0.0);
        assert_eq!(class_win_bonus(None, 5), 0.0);
    }

    #[test]
    fn test_energy_penalty_reduces_chance_and_reward() {
        let (mut record, config, classes) = setup();
        record.energy = 2;
        let res = resolve(&record, &ModifierContext::solo(10, &classes), &config);
        assert!(close(res.win_chance, 0.45));
        assert!(close(res.reward_multiplier, 0.9));

        record.energy = 0;
        let res = resolve(&record, &ModifierContext::solo(10, &classes), &config);
        assert!(close(res.win_chance, 0.40));
        assert!(close(res.reward_multiplier, 0.75));
    }

    #[test]
    fn test_stack_is_additive_then_multiplicative() {
        let (mut record, config, classes) = setup();
        record.prestige = 4;
        record.class_name = Some("warrior".into());
        record.buffs.push(CombatBuff::lucky_charm());
        record.buffs.push(CombatBuff::xp_scroll());
        let buff = BossBuff {
            expires_at: Utc::now() + Duration::days(1),
            xp_multiplier: 1.5,
            level_reduction: 2,
        };
        let ctx = ModifierContext {
            boss_buff: Some(&buff),
            notable: true,
            ..ModifierContext::solo(14, &classes)
        };
        let res = resolve(&record, &ctx, &config);
        // 0.5 - 0.4 + 0.10 prestige + 0.25 class + 0.20 buff + 0.15 charm
        assert!(close(res.win_chance, 0.80));
        // 1.25 prestige * 1.5 buff * 2.0 notable
        assert!(close(res.reward_multiplier, 3.75));
        assert!(close(res.reward_for(true), 5.625));
        assert!(close(res.reward_for(false), 3.75));
    }

    #[test]
    fn test_relic_guarantees_solo_only() {
        let (mut record, config, classes) = setup();
        record.buffs.push(CombatBuff::relic(5));
        let res = resolve(&record, &ModifierContext::solo(30, &classes), &config);
        assert!(res.guaranteed_win);
        assert!(close(res.win_chance, 0.05));

        let ctx = ModifierContext {
            bout: BoutKind::Dungeon,
            ..ModifierContext::solo(30, &classes)
        };
        assert!(!resolve(&record, &ctx, &config).guaranteed_win);
    }

    #[test]
    fn test_consumables_can_be_excluded() {
        let (mut record, config, classes) = setup();
        record.buffs.push(CombatBuff::lucky_charm());
        let ctx = ModifierContext {
            include_consumables: false,
            ..ModifierContext::solo(10, &classes)
        };
        assert!(close(resolve(&record, &ctx, &config).win_chance, 0.5));
    }

    #[test]
    fn test_group_chance_uses_average() {
        let config = EngineConfig::default();
        // levels 10 and 12 against 13: 0.5 - 0.2 + 0.05
        assert!(close(group_win_chance(11.0, 13, 2, None, &config), 0.35));
        assert!(close(group_win_chance(1.0, 20, 1, None, &config), 0.05));
    }
}
