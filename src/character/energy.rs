//! Energy pool, fatigue penalties and regeneration.

use crate::character::record::PlayerRecord;
use crate::core::config::{EnergyConfig, EnergyPenalty};
use crate::effects::injury;

/// Extra max energy from prestige rank.
pub fn prestige_energy_bonus(prestige: u32) -> u32 {
    match prestige {
        0..=2 => 0,
        3..=5 => 1,
        6..=8 => 2,
        _ => 3,
    }
}

pub fn max_energy(record: &PlayerRecord, config: &EnergyConfig) -> u32 {
    config.base_max + prestige_energy_bonus(record.prestige)
}

pub fn refill(record: &mut PlayerRecord, config: &EnergyConfig) {
    record.energy = max_energy(record, config);
}

/// The most severe penalty whose threshold the current energy is at or under.
pub fn active_penalty(energy: u32, config: &EnergyConfig) -> Option<EnergyPenalty> {
    config
        .penalties
        .iter()
        .filter(|p| energy <= p.threshold)
        .min_by_key(|p| p.threshold)
        .copied()
}

/// Credits `ticks` regeneration intervals. Injuries slow the rate; the
/// fractional remainder carries over to the next call.
///
/// Returns the whole units added.
pub fn regenerate(record: &mut PlayerRecord, config: &EnergyConfig, ticks: u32) -> u32 {
    let max = max_energy(record, config);
    if record.energy >= max {
        record.energy = max;
        record.energy_regen_carry = 0.0;
        return 0;
    }
    let rate = (1.0 + injury::regen_modifier(&record.injuries)).max(0.0);
    let total = record.energy_regen_carry + config.per_tick * rate * ticks as f64;
    let whole = total.floor();
    record.energy_regen_carry = total - whole;

    let before = record.energy;
    record.energy = (record.energy + whole as u32).min(max);
    if record.energy == max {
        record.energy_regen_carry = 0.0;
    }
    record.energy - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EngineConfig;
    use crate::effects::injury::Injury;
    use chrono::{Duration, Utc};

    fn record() -> PlayerRecord {
        PlayerRecord::new("u1", "Hero", Utc::now(), &EngineConfig::default())
    }

    #[test]
    fn test_prestige_energy_bonus_steps() {
        assert_eq!(prestige_energy_bonus(0), 0);
        assert_eq!(prestige_energy_bonus(2), 0);
        assert_eq!(prestige_energy_bonus(3), 1);
        assert_eq!(prestige_energy_bonus(6), 2);
        assert_eq!(prestige_energy_bonus(9), 3);
        assert_eq!(prestige_energy_bonus(10), 3);
    }

    #[test]
    fn test_most_severe_penalty_wins() {
        let config = EnergyConfig::default();
        assert_eq!(active_penalty(5, &config), None);
        assert_eq!(active_penalty(2, &config).map(|p| p.threshold), Some(2));
        assert_eq!(active_penalty(0, &config).map(|p| p.threshold), Some(0));
    }

    #[test]
    fn test_regen_respects_max() {
        let config = EnergyConfig::default();
        let mut r = record();
        r.energy = 8;
        assert_eq!(regenerate(&mut r, &config, 5), 2);
        assert_eq!(r.energy, 10);
    }

    #[test]
    fn test_injured_regen_carries_fraction() {
        let config = EnergyConfig::default();
        let mut r = record();
        r.energy = 0;
        r.injuries.push(Injury {
            name: "Broken Arm".into(),
            expires_at: Utc::now() + Duration::hours(6),
            xp_multiplier: 1.0,
            energy_regen_modifier: -0.5,
        });
        assert_eq!(regenerate(&mut r, &config, 1), 0);
        assert!((r.energy_regen_carry - 0.5).abs() < 1e-9);
        assert_eq!(regenerate(&mut r, &config, 1), 1);
        assert_eq!(r.energy, 1);
    }

    #[test]
    fn test_max_energy_grows_with_prestige() {
        let config = EnergyConfig::default();
        let mut r = record();
        r.prestige = 9;
        assert_eq!(max_energy(&r, &config), 13);
    }
}
