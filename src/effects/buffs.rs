//! One-shot and short-lived combat buffs.

use crate::core::balance::{
    ARMOR_SHARD_FIGHTS, ARMOR_SHARD_REDUCTION, LUCKY_CHARM_BONUS, XP_SCROLL_MULTIPLIER,
};
use serde::{Deserialize, Serialize};

/// What a buff changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuffKind {
    /// Additive win chance.
    WinChance,
    /// Multiplies XP on a win.
    XpMultiplier,
    /// Reduces injury chance after a loss.
    InjuryReduction,
    /// The bout is won without a roll. Solo bouts only.
    GuaranteedWin,
}

/// When a buff is used up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trigger {
    /// Consumed by the next resolved bout, win or lose.
    NextFight,
    /// Consumed only by the next won bout.
    NextWin,
    /// Lasts this many more qualifying bouts.
    Fights(u32),
}

/// Which flow resolved a bout. Buffs only tick in flows they apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoutKind {
    Solo,
    Group,
    Dungeon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatBuff {
    pub kind: BuffKind,
    pub magnitude: f64,
    pub trigger: Trigger,
    /// Item or ability that granted it.
    pub source: String,
}

impl CombatBuff {
    pub fn lucky_charm() -> Self {
        Self {
            kind: BuffKind::WinChance,
            magnitude: LUCKY_CHARM_BONUS,
            trigger: Trigger::NextFight,
            source: "lucky_charm".to_string(),
        }
    }

    pub fn xp_scroll() -> Self {
        Self {
            kind: BuffKind::XpMultiplier,
            magnitude: XP_SCROLL_MULTIPLIER,
            trigger: Trigger::NextWin,
            source: "xp_scroll".to_string(),
        }
    }

    pub fn armor_shard() -> Self {
        Self {
            kind: BuffKind::InjuryReduction,
            magnitude: ARMOR_SHARD_REDUCTION,
            trigger: Trigger::Fights(ARMOR_SHARD_FIGHTS),
            source: "armor_shard".to_string(),
        }
    }

    pub fn relic(wins: u32) -> Self {
        Self {
            kind: BuffKind::GuaranteedWin,
            magnitude: 1.0,
            trigger: Trigger::Fights(wins),
            source: "dungeon_relic".to_string(),
        }
    }

    /// Whether this bout kind uses the buff up. An XP scroll burns on a
    /// group win too, even though group rewards never read it.
    fn applies_to(&self, bout: BoutKind) -> bool {
        match self.kind {
            BuffKind::GuaranteedWin => bout == BoutKind::Solo,
            // Group odds come from the party average, not personal consumables.
            BuffKind::WinChance => bout != BoutKind::Group,
            _ => true,
        }
    }
}

/// Summed win-chance bonus from active buffs.
pub fn chance_bonus(buffs: &[CombatBuff]) -> f64 {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::WinChance)
        .map(|b| b.magnitude)
        .sum()
}

/// XP multiplier that applies if the bout is won.
pub fn win_xp_multiplier(buffs: &[CombatBuff]) -> f64 {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::XpMultiplier)
        .map(|b| b.magnitude)
        .product()
}

/// Injury reductions from armor-type buffs.
pub fn injury_reductions(buffs: &[CombatBuff]) -> impl Iterator<Item = f64> + '_ {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::InjuryReduction)
        .map(|b| b.magnitude)
}

pub fn has_guaranteed_win(buffs: &[CombatBuff], bout: BoutKind) -> bool {
    buffs
        .iter()
        .any(|b| b.kind == BuffKind::GuaranteedWin && b.applies_to(bout))
}

/// Remaining guaranteed solo wins.
pub fn guaranteed_wins_left(buffs: &[CombatBuff]) -> u32 {
    buffs
        .iter()
        .filter(|b| b.kind == BuffKind::GuaranteedWin)
        .map(|b| match b.trigger {
            Trigger::Fights(n) => n,
            _ => 1,
        })
        .sum()
}

pub fn has_active(buffs: &[CombatBuff], source: &str) -> bool {
    buffs.iter().any(|b| b.source == source)
}

/// Ticks buffs after a resolved bout and drops the spent ones.
pub fn consume_after_bout(buffs: &mut Vec<CombatBuff>, won: bool, bout: BoutKind) {
    buffs.retain_mut(|buff| {
        if !buff.applies_to(bout) {
            return true;
        }
        match buff.trigger {
            Trigger::NextFight => false,
            Trigger::NextWin => !won,
            Trigger::Fights(n) => {
                let left = n.saturating_sub(1);
                buff.trigger = Trigger::Fights(left);
                left > 0
            }
        }
    });
}
