//! Challenge paths and the abilities they unlock.

use crate::character::energy;
use crate::character::record::PlayerRecord;
use crate::core::config::EngineConfig;
use crate::core::error::Rejection;
use crate::core::ports::{lookup_or, ContentLookup};
use crate::effects::buffs::CombatBuff;
use crate::effects::injury;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An optional ruleset entered at a prestige boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengePath {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub min_prestige: u32,
    #[serde(default = "default_path_max_prestige")]
    pub max_prestige: u32,
    #[serde(default)]
    pub win_chance_modifier: f64,
    #[serde(default = "default_xp_multiplier")]
    pub xp_multiplier: f64,
    /// Completion fails if any medkit was used during the prestige.
    #[serde(default)]
    pub no_medkits: bool,
    #[serde(default)]
    pub ability_unlock: Option<String>,
}

fn default_path_max_prestige() -> u32 {
    crate::core::balance::MAX_PRESTIGE
}

fn default_xp_multiplier() -> f64 {
    1.0
}

fn default_cooldown_hours() -> i64 {
    crate::core::balance::ABILITY_COOLDOWN_HOURS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityEffect {
    HealAllInjuries,
    RestoreEnergy,
    /// Lucky-charm buff for everyone in the channel's open window.
    BuffParty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    pub effect: AbilityEffect,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,
}

pub fn load_paths(content: &dyn ContentLookup) -> Vec<ChallengePath> {
    lookup_or(content, "challenges.paths", Vec::new())
}

pub fn load_abilities(content: &dyn ContentLookup) -> Vec<Ability> {
    lookup_or(content, "challenges.abilities", Vec::new())
}

pub fn find_path<'a>(paths: &'a [ChallengePath], id: &str) -> Option<&'a ChallengePath> {
    paths.iter().find(|p| p.id == id)
}

/// The record's active path, if it is still defined in content.
pub fn active_path<'a>(
    record: &PlayerRecord,
    paths: &'a [ChallengePath],
) -> Option<&'a ChallengePath> {
    record
        .challenge
        .active_path
        .as_deref()
        .and_then(|id| find_path(paths, id))
}

/// Checks whether `prestige` may enter `path` at the next prestige.
pub fn check_path_entry(path: &ChallengePath, prestige: u32) -> Result<(), Rejection> {
    if prestige < path.min_prestige {
        return Err(Rejection::NotEligible(format!(
            "{} requires at least Prestige {}",
            path.name, path.min_prestige
        )));
    }
    if prestige >= path.max_prestige {
        return Err(Rejection::NotEligible(format!(
            "{} is closed to Prestige {} and above",
            path.name, path.max_prestige
        )));
    }
    Ok(())
}

/// Evaluated when the record reaches the level cap on a path.
/// A successful completion records the path and unlocks its ability.
pub fn check_completion(
    record: &mut PlayerRecord,
    paths: &[ChallengePath],
    abilities: &[Ability],
) -> Vec<String> {
    let Some(path) = active_path(record, paths) else {
        return Vec::new();
    };
    if record.challenge.completed_paths.contains(&path.id) {
        return Vec::new();
    }

    let used = record.challenge.medkits_used_this_prestige;
    if path.no_medkits && used > 0 {
        return vec![
            format!(
                "You reached the level cap, but {} was not completed.",
                path.name
            ),
            format!("You used {used} medkit(s) during this prestige."),
        ];
    }

    record.challenge.completed_paths.insert(path.id.clone());
    let mut lines = vec![format!("*** CHALLENGE COMPLETED: {}! ***", path.name)];
    if let Some(ability_id) = &path.ability_unlock {
        if record.abilities.unlocked.insert(ability_id.clone()) {
            let name = abilities
                .iter()
                .find(|a| &a.id == ability_id)
                .map(|a| a.name.as_str())
                .unwrap_or(ability_id);
            lines.push(format!("NEW ABILITY UNLOCKED: {name}!"));
        }
    }
    tracing::info!(actor = %record.actor_id, path = %path.id, "challenge path completed");
    lines
}

/// What an ability did, for the caller to finish applying.
#[derive(Debug, Clone, PartialEq)]
pub enum AbilityUse {
    Applied(Vec<String>),
    /// The caller grants this buff to every party member.
    PartyBuff(CombatBuff),
}

/// Validates the cooldown and applies the ability's self effect.
pub fn use_ability(
    record: &mut PlayerRecord,
    abilities: &[Ability],
    ability_id: &str,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Result<AbilityUse, Rejection> {
    let ability = abilities
        .iter()
        .find(|a| a.id == ability_id)
        .ok_or_else(|| Rejection::UnknownAbility(ability_id.to_string()))?;
    if !record.abilities.unlocked.contains(ability_id) {
        return Err(Rejection::AbilityLocked(ability.name.clone()));
    }
    if let Some(last) = record.abilities.last_used.get(ability_id) {
        let ready_at = *last + Duration::hours(ability.cooldown_hours);
        if now < ready_at {
            return Err(Rejection::AbilityCooldown {
                ability: ability.name.clone(),
                remaining_secs: (ready_at - now).num_seconds(),
            });
        }
    }

    let result = match ability.effect {
        AbilityEffect::HealAllInjuries => {
            let healed = injury::heal_all(record);
            if healed == 0 {
                return Err(Rejection::NothingToHeal);
            }
            AbilityUse::Applied(vec![format!(
                "{} heals {healed} injur{}.",
                ability.name,
                if healed == 1 { "y" } else { "ies" }
            )])
        }
        AbilityEffect::RestoreEnergy => {
            if record.energy >= energy::max_energy(record, &config.energy) {
                return Err(Rejection::EnergyFull);
            }
            energy::refill(record, &config.energy);
            AbilityUse::Applied(vec![format!(
                "{} restores your energy to {}.",
                ability.name, record.energy
            )])
        }
        AbilityEffect::BuffParty => AbilityUse::PartyBuff(CombatBuff::lucky_charm()),
    };

    record
        .abilities
        .last_used
        .insert(ability_id.to_string(), now);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::ContentTable;

    fn setup() -> (PlayerRecord, Vec<ChallengePath>, Vec<Ability>, EngineConfig) {
        let content = ContentTable::builtin();
        let config = EngineConfig::default();
        let record = PlayerRecord::new("u1", "Hero", Utc::now(), &config);
        (record, load_paths(&content), load_abilities(&content), config)
    }

    #[test]
    fn test_builtin_content_defines_paths_and_abilities() {
        let (_, paths, abilities, _) = setup();
        assert!(find_path(&paths, "iron_will").is_some());
        assert!(abilities.iter().any(|a| a.effect == AbilityEffect::BuffParty));
    }

    #[test]
    fn test_path_entry_bounds() {
        let (_, paths, _, _) = setup();
        let warband = find_path(&paths, "warband").unwrap();
        assert!(check_path_entry(warband, 2).is_err());
        assert!(check_path_entry(warband, 3).is_ok());
        assert!(check_path_entry(warband, 10).is_err());
    }

    #[test]
    fn test_completion_unlocks_ability() {
        let (mut r, paths, abilities, _) = setup();
        r.challenge.active_path = Some("iron_will".into());
        let lines = check_completion(&mut r, &paths, &abilities);
        assert!(lines[0].contains("CHALLENGE COMPLETED"));
        assert!(r.challenge.completed_paths.contains("iron_will"));
        assert!(r.abilities.unlocked.contains("second_wind"));

        // Only once per path
        assert!(check_completion(&mut r, &paths, &abilities).is_empty());
    }

    #[test]
    fn test_medkit_use_fails_no_medkit_path() {
        let (mut r, paths, abilities, _) = setup();
        r.challenge.active_path = Some("iron_will".into());
        r.challenge.medkits_used_this_prestige = 1;
        check_completion(&mut r, &paths, &abilities);
        assert!(r.challenge.completed_paths.is_empty());
        assert!(r.abilities.unlocked.is_empty());
    }

    #[test]
    fn test_ability_cooldown_and_lock() {
        let (mut r, _, abilities, config) = setup();
        let now = Utc::now();
        assert!(matches!(
            use_ability(&mut r, &abilities, "deep_rest", &config, now),
            Err(Rejection::AbilityLocked(_))
        ));
        assert!(matches!(
            use_ability(&mut r, &abilities, "fly", &config, now),
            Err(Rejection::UnknownAbility(_))
        ));

        r.abilities.unlocked.insert("deep_rest".into());
        r.energy = 2;
        assert!(matches!(
            use_ability(&mut r, &abilities, "deep_rest", &config, now),
            Ok(AbilityUse::Applied(_))
        ));
        assert_eq!(r.energy, 10);

        r.energy = 2;
        assert!(matches!(
            use_ability(&mut r, &abilities, "deep_rest", &config, now + Duration::hours(1)),
            Err(Rejection::AbilityCooldown { .. })
        ));
        assert!(use_ability(&mut r, &abilities, "deep_rest", &config, now + Duration::hours(25)).is_ok());
    }

    #[test]
    fn test_party_ability_returns_buff() {
        let (mut r, _, abilities, config) = setup();
        r.abilities.unlocked.insert("rallying_cry".into());
        let used = use_ability(&mut r, &abilities, "rallying_cry", &config, Utc::now()).unwrap();
        assert_eq!(used, AbilityUse::PartyBuff(CombatBuff::lucky_charm()));
    }
}
