//! Opponent selection for solo bouts and group windows.

use super::types::{LegendEntry, MonsterDef, Opponent};
use crate::character::prestige::{legend_level, legend_suffix, legend_xp};
use crate::character::record::PlayerRecord;
use crate::core::config::EngineConfig;
use crate::core::ports::{lookup_or, ContentLookup};
use rand::seq::SliceRandom;
use rand::Rng;

fn fallback_monsters() -> Vec<MonsterDef> {
    vec![MonsterDef {
        name: "Wandering Brute".to_string(),
        min_level: 1,
        max_level: u32::MAX,
        xp_win_min: 10,
        xp_win_max: 20,
    }]
}

/// Monster table from content. Entries with inverted ranges are dropped.
pub fn load_monsters(content: &dyn ContentLookup) -> Vec<MonsterDef> {
    let monsters: Vec<MonsterDef> = lookup_or(content, "monsters", fallback_monsters());
    let valid: Vec<MonsterDef> = monsters
        .into_iter()
        .filter(|m| m.min_level <= m.max_level && m.xp_win_min <= m.xp_win_max)
        .collect();
    if valid.is_empty() {
        tracing::warn!("monster table has no usable entries, using fallback");
        return fallback_monsters();
    }
    valid
}

/// Names for group windows: `(mobs, bosses)`.
pub fn load_group_names(content: &dyn ContentLookup) -> (Vec<String>, Vec<String>) {
    let mobs = lookup_or(content, "group_monsters", vec!["Orc Warband".to_string()]);
    let bosses = lookup_or(content, "boss_monsters", vec!["Ancient Red Dragon".to_string()]);
    (mobs, bosses)
}

/// Level roll for a solo opponent: uniform in
/// `[min(pl - 1, pl + mod), max(pl - 1, pl + mod)]`, at least 1.
pub fn roll_monster_level(player_level: u32, level_mod: i32, rng: &mut impl Rng) -> u32 {
    let pl = player_level as i64;
    let a = pl - 1;
    let b = pl + level_mod as i64;
    let level = rng.gen_range(a.min(b)..=a.max(b));
    level.max(1) as u32
}

/// Picks a monster whose range covers `level`, or the closest one.
pub fn pick_monster<'a>(
    monsters: &'a [MonsterDef],
    level: u32,
    rng: &mut impl Rng,
) -> Option<&'a MonsterDef> {
    let fitting: Vec<&MonsterDef> = monsters.iter().filter(|m| m.contains(level)).collect();
    if let Some(monster) = fitting.choose(rng) {
        return Some(*monster);
    }
    monsters.iter().min_by_key(|m| m.distance(level))
}

/// The legend registry entry for a record, if it has transcended.
pub fn legend_entry(record: &PlayerRecord) -> Option<LegendEntry> {
    (record.transcendence > 0).then(|| LegendEntry {
        actor_id: record.actor_id.clone(),
        display_name: record.display_name.clone(),
        transcendence: record.transcendence,
    })
}

pub fn legend_opponent(legend: &LegendEntry, player_level: u32, config: &EngineConfig) -> Opponent {
    let xp = legend_xp(legend.transcendence);
    Opponent {
        name: format!(
            "{} {}",
            legend.display_name,
            legend_suffix(legend.transcendence)
        ),
        level: legend_level(
            legend.transcendence,
            player_level,
            config.progression.level_cap,
        ),
        notable: false,
        boss: false,
        legend_of: Some(legend.actor_id.clone()),
        xp_min: xp,
        xp_max: xp,
    }
}

/// Chooses the opponent for a solo bout.
///
/// A legend built from another transcended player shows up with the
/// configured chance; otherwise a monster at a rolled level, possibly notable.
pub fn select_solo_opponent(
    record: &PlayerRecord,
    level_mod: i32,
    monsters: &[MonsterDef],
    legends: &[LegendEntry],
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Opponent {
    let others: Vec<&LegendEntry> = legends
        .iter()
        .filter(|l| l.actor_id != record.actor_id)
        .collect();
    if !others.is_empty() && rng.gen::<f64>() < config.combat.legend_spawn_chance {
        if let Some(legend) = others.choose(rng) {
            return legend_opponent(legend, record.level, config);
        }
    }

    let level = roll_monster_level(record.level, level_mod, rng);
    let notable = rng.gen::<f64>() < config.combat.notable_chance;
    match pick_monster(monsters, level, rng) {
        Some(monster) => Opponent {
            name: monster.name.clone(),
            level,
            notable,
            boss: false,
            legend_of: None,
            xp_min: monster.xp_win_min,
            xp_max: monster.xp_win_max,
        },
        None => Opponent {
            name: "Wandering Brute".to_string(),
            level,
            notable,
            boss: false,
            legend_of: None,
            xp_min: 10,
            xp_max: 20,
        },
    }
}

/// Opponent for a group window opened by someone at `initiator_level`.
pub fn group_opponent(
    initiator_level: u32,
    boss: bool,
    names: &(Vec<String>, Vec<String>),
    monsters: &[MonsterDef],
    config: &EngineConfig,
    rng: &mut impl Rng,
) -> Opponent {
    let g = &config.group;
    let level = if boss {
        initiator_level + g.boss_level_offset
    } else {
        initiator_level + g.mob_level_offset
    };
    let pool = if boss { &names.1 } else { &names.0 };
    let name = pool
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| "Roaming Horde".to_string());
    let (xp_min, xp_max) = pick_monster(monsters, level, rng)
        .map(|m| (m.xp_win_min, m.xp_win_max))
        .unwrap_or((10, 20));
    Opponent {
        name,
        level,
        notable: false,
        boss,
        legend_of: None,
        xp_min,
        xp_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::content::ContentTable;
    use chrono::Utc;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_level_roll_stays_in_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            let level = roll_monster_level(10, 3, &mut rng);
            assert!((9..=13).contains(&level));
            let easy = roll_monster_level(10, 0, &mut rng);
            assert!((9..=10).contains(&easy));
            let floor = roll_monster_level(1, 0, &mut rng);
            assert_eq!(floor, 1);
        }
    }

    #[test]
    fn test_pick_falls_back_to_closest() {
        let monsters = load_monsters(&ContentTable::builtin());
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let m = pick_monster(&monsters, 3, &mut rng).unwrap();
        assert!(m.contains(3));

        let only = vec![MonsterDef {
            name: "Rat".into(),
            min_level: 1,
            max_level: 3,
            xp_win_min: 1,
            xp_win_max: 2,
        }];
        assert_eq!(pick_monster(&only, 40, &mut rng).unwrap().name, "Rat");
    }

    #[test]
    fn test_legend_never_faces_itself() {
        let config = EngineConfig {
            combat: crate::core::config::CombatConfig {
                legend_spawn_chance: 1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut record = PlayerRecord::new("u1", "Hero", Utc::now(), &config);
        record.level = 10;
        let monsters = load_monsters(&ContentTable::builtin());
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let own = vec![LegendEntry {
            actor_id: "u1".into(),
            display_name: "Hero".into(),
            transcendence: 1,
        }];
        let o = select_solo_opponent(&record, 1, &monsters, &own, &config, &mut rng);
        assert!(!o.is_legend());

        let other = vec![LegendEntry {
            actor_id: "u2".into(),
            display_name: "Ancient".into(),
            transcendence: 2,
        }];
        let o = select_solo_opponent(&record, 1, &monsters, &other, &config, &mut rng);
        assert!(o.is_legend());
        assert_eq!(o.level, 28);
        assert_eq!(o.xp_min, 350);
        assert_eq!(o.name, "Ancient (Legend II)");
    }

    #[test]
    fn test_group_opponent_levels() {
        let config = EngineConfig::default();
        let content = ContentTable::builtin();
        let names = load_group_names(&content);
        let monsters = load_monsters(&content);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mob = group_opponent(10, false, &names, &monsters, &config, &mut rng);
        assert_eq!(mob.level, 13);
        assert!(!mob.boss);
        let boss = group_opponent(18, true, &names, &monsters, &config, &mut rng);
        assert_eq!(boss.level, 21);
        assert!(boss.boss);
        assert!(names.1.contains(&boss.name));
    }

    #[test]
    fn test_legend_entry_only_after_transcending() {
        let config = EngineConfig::default();
        let mut record = PlayerRecord::new("u1", "Hero", Utc::now(), &config);
        assert!(legend_entry(&record).is_none());
        record.transcendence = 1;
        assert_eq!(legend_entry(&record).unwrap().transcendence, 1);
    }
}
