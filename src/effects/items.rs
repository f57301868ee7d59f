//! Consumables: using them, bout drops and the search action.

use crate::character::energy;
use crate::character::progression;
use crate::character::record::PlayerRecord;
use crate::core::balance::{RELIC_GUARANTEED_WINS, SEARCH_MISHAP_XP_MAX, SEARCH_MISHAP_XP_MIN};
use crate::core::config::{DropConfig, EngineConfig};
use crate::core::error::Rejection;
use crate::effects::buffs::{self, CombatBuff, Trigger};
use crate::effects::injury;
use rand::Rng;
use std::fmt;

/// Every consumable the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Medkit,
    EnergyPotion,
    LuckyCharm,
    ArmorShard,
    XpScroll,
    DungeonRelic,
}

impl ItemKind {
    pub const ALL: [ItemKind; 6] = [
        ItemKind::Medkit,
        ItemKind::EnergyPotion,
        ItemKind::LuckyCharm,
        ItemKind::ArmorShard,
        ItemKind::XpScroll,
        ItemKind::DungeonRelic,
    ];

    /// Inventory key.
    pub fn key(self) -> &'static str {
        match self {
            ItemKind::Medkit => "medkit",
            ItemKind::EnergyPotion => "energy_potion",
            ItemKind::LuckyCharm => "lucky_charm",
            ItemKind::ArmorShard => "armor_shard",
            ItemKind::XpScroll => "xp_scroll",
            ItemKind::DungeonRelic => "dungeon_relic",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ItemKind::Medkit => "Medkit",
            ItemKind::EnergyPotion => "Energy Potion",
            ItemKind::LuckyCharm => "Lucky Charm",
            ItemKind::ArmorShard => "Armor Shard",
            ItemKind::XpScroll => "XP Scroll",
            ItemKind::DungeonRelic => "Dungeon Relic",
        }
    }

    /// Parses a player-typed item name. Accepts keys, plurals and spaces.
    pub fn from_key(name: &str) -> Option<Self> {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");
        let singular = normalized.strip_suffix('s').unwrap_or(normalized.as_str());
        ItemKind::ALL
            .into_iter()
            .find(|kind| kind.key() == normalized || kind.key() == singular)
            .or(match singular {
                "relic" => Some(ItemKind::DungeonRelic),
                "potion" => Some(ItemKind::EnergyPotion),
                "charm" => Some(ItemKind::LuckyCharm),
                "scroll" => Some(ItemKind::XpScroll),
                _ => None,
            })
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

fn article(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::EnergyPotion | ItemKind::ArmorShard | ItemKind::XpScroll => "an",
        _ => "a",
    }
}

/// Uses one item from the record's inventory.
///
/// Validation runs before the item is taken, so a rejection changes nothing.
pub fn use_item(
    record: &mut PlayerRecord,
    kind: ItemKind,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Result<Vec<String>, Rejection> {
    if record.item_count(kind.key()) == 0 {
        return Err(Rejection::NoItem(kind.display_name().to_string()));
    }

    let line = match kind {
        ItemKind::LuckyCharm | ItemKind::XpScroll => {
            if buffs::has_active(&record.buffs, kind.key()) {
                return Err(Rejection::AlreadyActive(kind.display_name().to_string()));
            }
            let buff = if kind == ItemKind::LuckyCharm {
                CombatBuff::lucky_charm()
            } else {
                CombatBuff::xp_scroll()
            };
            record.buffs.push(buff);
            if kind == ItemKind::LuckyCharm {
                "The Lucky Charm glows. Your next fight is in your favor.".to_string()
            } else {
                "The XP Scroll hums with power. Your next win is worth more.".to_string()
            }
        }
        ItemKind::ArmorShard => {
            record.buffs.push(CombatBuff::armor_shard());
            "You fit the Armor Shard. Injuries are less likely for your next fights.".to_string()
        }
        ItemKind::EnergyPotion => {
            let max = energy::max_energy(record, &config.energy);
            if record.energy >= max {
                return Err(Rejection::EnergyFull);
            }
            let gain = rng.gen_range(config.energy.potion_min..=config.energy.potion_max);
            let before = record.energy;
            record.energy = (record.energy + gain).min(max);
            format!(
                "You drink the Energy Potion and recover {} energy ({}/{max}).",
                record.energy - before,
                record.energy
            )
        }
        ItemKind::Medkit => {
            if record.injuries.is_empty() {
                return Err(Rejection::NothingToHeal);
            }
            let healed = injury::heal_all(record);
            record.challenge.medkits_used_this_prestige += 1;
            format!(
                "You patch yourself up and heal {healed} injur{}.",
                if healed == 1 { "y" } else { "ies" }
            )
        }
        ItemKind::DungeonRelic => {
            let existing = record
                .buffs
                .iter_mut()
                .find(|b| b.source == ItemKind::DungeonRelic.key());
            match existing {
                Some(buff) => {
                    let left = match buff.trigger {
                        Trigger::Fights(n) => n,
                        _ => 0,
                    };
                    buff.trigger = Trigger::Fights(left + RELIC_GUARANTEED_WINS);
                }
                None => record.buffs.push(CombatBuff::relic(RELIC_GUARANTEED_WINS)),
            }
            format!(
                "The relic flares. Guaranteed victories remaining: {}.",
                buffs::guaranteed_wins_left(&record.buffs)
            )
        }
    };

    record.take_item(kind.key());
    tracing::debug!(actor = %record.actor_id, item = kind.key(), "item used");
    Ok(vec![line])
}

/// One weighted pick across the found-item table. `None` is an empty roll.
fn pick_found_item(roll: f64, config: &DropConfig) -> Option<ItemKind> {
    let table = [
        (ItemKind::Medkit, config.search_medkit),
        (ItemKind::EnergyPotion, config.search_energy_potion),
        (ItemKind::LuckyCharm, config.search_lucky_charm),
        (ItemKind::ArmorShard, config.search_armor_shard),
        (ItemKind::XpScroll, config.search_xp_scroll),
    ];
    let mut cumulative = 0.0;
    for (kind, weight) in table {
        cumulative += weight;
        if roll < cumulative {
            return Some(kind);
        }
    }
    None
}

fn found_item_total(config: &DropConfig) -> f64 {
    config.search_medkit
        + config.search_energy_potion
        + config.search_lucky_charm
        + config.search_armor_shard
        + config.search_xp_scroll
}

/// Chance-based drop after a bout. Adds the item to the inventory.
pub fn roll_bout_drop(
    record: &mut PlayerRecord,
    won: bool,
    config: &DropConfig,
    rng: &mut impl Rng,
) -> Option<ItemKind> {
    let chance = if won { config.win_chance } else { config.loss_chance };
    if rng.gen::<f64>() >= chance {
        return None;
    }
    let total = found_item_total(config);
    if total <= 0.0 {
        return None;
    }
    let kind = pick_found_item(rng.gen::<f64>() * total, config)?;
    record.add_item(kind.key(), 1);
    Some(kind)
}

/// Line for a bout drop.
pub fn drop_line(kind: ItemKind, won: bool) -> String {
    if won {
        format!("You found {} {}!", article(kind), kind)
    } else {
        format!("As you retreat, you spot {} {} on the ground.", article(kind), kind)
    }
}

/// Result of a batch of searches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchReport {
    pub searches: u32,
    pub found: Vec<ItemKind>,
    pub empty: u32,
    pub mishaps: u32,
    pub xp_lost: u64,
}

impl SearchReport {
    pub fn summary(&self) -> String {
        if self.searches == 1 {
            return match (self.found.first(), self.mishaps) {
                (Some(kind), _) => format!("You search the area and find {} {}!", article(*kind), kind),
                (None, 1) => format!(
                    "You search the area and get hurt! Lost 1 energy and {} XP.",
                    self.xp_lost
                ),
                _ => "You search the area and find nothing.".to_string(),
            };
        }

        let mut parts = Vec::new();
        for kind in ItemKind::ALL {
            let count = self.found.iter().filter(|k| **k == kind).count();
            if count > 0 {
                parts.push(format!("{count} {}", kind.key().replace('_', " ")));
            }
        }
        let mut msg = format!("After {} searches, you found: ", self.searches);
        if parts.is_empty() {
            msg.push_str("nothing of value");
        } else {
            msg.push_str(&parts.join(", "));
        }
        if self.empty > 0 {
            msg.push_str(&format!(" ({} empty)", self.empty));
        }
        if self.mishaps > 0 {
            msg.push_str(&format!(
                " (hurt {} time(s), lost {} XP)",
                self.mishaps, self.xp_lost
            ));
        }
        msg
    }
}

/// Spends one energy per search and rolls the search table `count` times.
///
/// The caller purges expired injuries first; any remaining injury blocks
/// searching.
pub fn search(
    record: &mut PlayerRecord,
    count: u32,
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Result<SearchReport, Rejection> {
    let max = config.drops.max_searches;
    if count == 0 || count > max {
        return Err(Rejection::InvalidChoice(format!(
            "you can search between 1 and {max} times"
        )));
    }
    if record.energy < count {
        return Err(Rejection::InsufficientEnergy {
            needed: count,
            have: record.energy,
        });
    }
    if !record.injuries.is_empty() {
        let names: Vec<&str> = record.injuries.iter().map(|i| i.name.as_str()).collect();
        return Err(Rejection::NotEligible(format!(
            "you are still recovering from {}",
            names.join(", ")
        )));
    }

    record.energy -= count;
    let mut report = SearchReport {
        searches: count,
        ..SearchReport::default()
    };
    let drops = &config.drops;
    for _ in 0..count {
        let roll = rng.gen::<f64>();
        if let Some(kind) = pick_found_item(roll, drops) {
            record.add_item(kind.key(), 1);
            report.found.push(kind);
        } else if roll < found_item_total(drops) + drops.search_mishap {
            record.energy = record.energy.saturating_sub(1);
            report.mishaps += 1;
            report.xp_lost += rng.gen_range(SEARCH_MISHAP_XP_MIN..=SEARCH_MISHAP_XP_MAX);
        } else {
            report.empty += 1;
        }
    }
    if report.xp_lost > 0 {
        progression::deduct_xp(record, report.xp_lost, config);
    }
    tracing::debug!(
        actor = %record.actor_id,
        searches = count,
        found = report.found.len(),
        "search"
    );
    Ok(report)
}
