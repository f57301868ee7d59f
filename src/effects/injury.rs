//! Time-boxed injuries.
//!
//! Expiry is evaluated lazily: callers purge at the start of an action,
//! before anything reads the list, and never while writing a new injury.

use crate::core::balance::MAX_SAME_INJURY;
use crate::core::config::InjuryConfig;
use crate::core::ports::{lookup_or, ContentLookup};
use crate::character::record::PlayerRecord;
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

fn one() -> f64 {
    1.0
}

/// An injury attached to a player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Injury {
    pub name: String,
    pub expires_at: DateTime<Utc>,
    /// Applied to XP gains while active.
    #[serde(default = "one")]
    pub xp_multiplier: f64,
    /// Added to the energy regeneration rate while active.
    #[serde(default)]
    pub energy_regen_modifier: f64,
}

/// Catalog entry for an injury.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjuryDef {
    pub name: String,
    pub duration_hours: f64,
    #[serde(default = "one")]
    pub xp_multiplier: f64,
    #[serde(default)]
    pub energy_regen_modifier: f64,
}

impl InjuryDef {
    pub fn instantiate(&self, now: DateTime<Utc>) -> Injury {
        let minutes = (self.duration_hours.max(0.0) * 60.0).round() as i64;
        Injury {
            name: self.name.clone(),
            expires_at: now + Duration::minutes(minutes),
            xp_multiplier: self.xp_multiplier,
            energy_regen_modifier: self.energy_regen_modifier,
        }
    }
}

fn fallback_catalog() -> Vec<InjuryDef> {
    vec![InjuryDef {
        name: "Bruised Ribs".to_string(),
        duration_hours: 2.0,
        xp_multiplier: 0.9,
        energy_regen_modifier: 0.0,
    }]
}

/// Injury catalog from content, or a one-entry fallback.
pub fn injury_catalog(content: &dyn ContentLookup) -> Vec<InjuryDef> {
    let catalog: Vec<InjuryDef> = lookup_or(content, "injuries", fallback_catalog());
    if catalog.is_empty() {
        fallback_catalog()
    } else {
        catalog
    }
}

/// Removes expired injuries and returns their names.
pub fn purge_expired(record: &mut PlayerRecord, now: DateTime<Utc>) -> Vec<String> {
    let mut recovered = Vec::new();
    record.injuries.retain(|injury| {
        if injury.expires_at <= now {
            recovered.push(injury.name.clone());
            false
        } else {
            true
        }
    });
    recovered
}

/// Recovery line for the purged names.
pub fn recovery_line(recovered: &[String]) -> Option<String> {
    match recovered {
        [] => None,
        [one] => Some(format!("You have recovered from your {one}.")),
        many => Some(format!("You have recovered from: {}.", many.join(", "))),
    }
}

/// Product of every active injury's XP multiplier.
pub fn xp_multiplier(injuries: &[Injury]) -> f64 {
    injuries.iter().map(|i| i.xp_multiplier.max(0.0)).product()
}

/// Sum of every active injury's regeneration modifier.
pub fn regen_modifier(injuries: &[Injury]) -> f64 {
    injuries.iter().map(|i| i.energy_regen_modifier).sum()
}

/// Combines independent injury reductions.
///
/// Each source removes its share of what the previous ones left, and the
/// total is capped so some chance of injury always remains.
pub fn combined_reduction(sources: impl IntoIterator<Item = f64>, cap: f64) -> f64 {
    let remaining: f64 = sources
        .into_iter()
        .map(|r| 1.0 - r.clamp(0.0, 1.0))
        .product();
    (1.0 - remaining).min(cap)
}

/// Chance of an injury after a loss, given the combined reduction.
pub fn injury_chance(config: &InjuryConfig, reduction: f64) -> f64 {
    (config.chance_on_loss * (1.0 - reduction)).max(0.0)
}

/// Result of an injury roll.
#[derive(Debug, Clone, PartialEq)]
pub enum InjuryRoll {
    /// Nothing happened.
    Spared,
    /// A new injury was attached.
    Sustained { name: String, repeat: bool },
    /// The rolled injury was already at its concurrent limit.
    NarrowlyAvoided(String),
}

impl InjuryRoll {
    pub fn line(&self) -> Option<String> {
        match self {
            InjuryRoll::Spared => None,
            InjuryRoll::Sustained { name, repeat: false } => {
                Some(format!("You have sustained an injury: {name}!"))
            }
            InjuryRoll::Sustained { name, repeat: true } => {
                Some(format!("You have sustained another {name}!"))
            }
            InjuryRoll::NarrowlyAvoided(name) => {
                Some(format!("You narrowly avoid another {name}!"))
            }
        }
    }
}

/// Rolls for an injury after a lost bout and attaches it.
pub fn roll_injury(
    record: &mut PlayerRecord,
    catalog: &[InjuryDef],
    config: &InjuryConfig,
    reduction: f64,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> InjuryRoll {
    if !config.enabled {
        return InjuryRoll::Spared;
    }
    let chance = injury_chance(config, reduction);
    if rng.gen::<f64>() >= chance {
        return InjuryRoll::Spared;
    }
    let Some(def) = catalog.choose(rng) else {
        return InjuryRoll::Spared;
    };
    let existing = record
        .injuries
        .iter()
        .filter(|i| i.name == def.name)
        .count();
    if existing >= MAX_SAME_INJURY {
        return InjuryRoll::NarrowlyAvoided(def.name.clone());
    }
    record.injuries.push(def.instantiate(now));
    tracing::debug!(actor = %record.actor_id, injury = %def.name, "injury applied");
    InjuryRoll::Sustained {
        name: def.name.clone(),
        repeat: existing > 0,
    }
}

/// Clears every injury. Returns how many were healed.
pub fn heal_all(record: &mut PlayerRecord) -> usize {
    let healed = record.injuries.len();
    record.injuries.clear();
    healed
}
