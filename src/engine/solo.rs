use super::QuestEngine;
use crate::boss_hunt::hp_bar;
use crate::boss_hunt::types::Contribution;
use crate::character::record::PlayerRecord;
use crate::combat::logic::{
    boss_escalation_eligible, check_ready, fight_solo, quiet_lands, roll_monster_appears,
};
use crate::combat::opponent::select_solo_opponent;
use crate::core::error::{Rejection, Result};
use crate::core::report::ActionResult;
use crate::effects::injury;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

impl QuestEngine {
    /// One solo bout at the named difficulty (`easy`, `normal`, `hard`).
    pub fn resolve_solo(
        &self,
        actor_id: &str,
        display_name: &str,
        channel: &str,
        difficulty: &str,
    ) -> Result<ActionResult> {
        let inner = &self.inner;
        let Some(_guard) = inner.actors.acquire_one(actor_id)? else {
            return Ok(ActionResult::rejected(Rejection::Busy));
        };
        let now = inner.now();
        let mut record = inner.load_player(actor_id, Some(display_name))?;
        if let Err(rejection) = check_ready(&record, &inner.config, now) {
            return Ok(ActionResult::rejected(rejection));
        }
        let mut rng = inner.action_rng()?;

        let mut lines = Vec::new();
        let recovered = injury::purge_expired(&mut record, now);
        lines.extend(injury::recovery_line(&recovered));

        let buff = inner.boss_hunt.active_buff(now)?;
        let ctx = inner.bout_context(buff.as_ref(), now);

        if !roll_monster_appears(&inner.config, &mut rng) {
            lines.extend(quiet_lands(&mut record, &ctx));
            return self.finish(record, lines);
        }

        if boss_escalation_eligible(&record, &inner.config)
            && rng.gen::<f64>() < inner.config.combat.boss_encounter_chance
        {
            // Falls through to a normal bout if the channel already has a
            // window or its slot is busy.
            if let Some(Ok(open_lines)) =
                self.open_window_for(&mut record, channel, true, &mut rng, now)?
            {
                record.last_solo_at = Some(now);
                lines.extend(open_lines);
                return self.finish(record, lines);
            }
        }

        let difficulty = inner.config.combat.difficulty(difficulty);
        let legends = inner.legends()?;
        let opponent = select_solo_opponent(
            &record,
            difficulty.level_mod,
            &inner.tables.monsters,
            &legends,
            &inner.config,
            &mut rng,
        );
        let report = fight_solo(&mut record, opponent, difficulty, &ctx, &mut rng);
        lines.extend(report.lines);

        if report.clue_found {
            lines.extend(self.contribute_clue(&mut record, channel, now, &mut rng)?);
        }
        lines.extend(self.haunting_flavor(now, &mut rng)?);
        self.finish(record, lines)
    }

    /// Applies one clue's damage to the shared boss and persists the pool.
    fn contribute_clue(
        &self,
        record: &mut PlayerRecord,
        channel: &str,
        now: DateTime<Utc>,
        rng: &mut StdRng,
    ) -> Result<Vec<String>> {
        let inner = &self.inner;
        let amount = inner.config.boss_hunt.damage_per_clue;
        let outcome = inner.boss_hunt.contribute(amount, &record.actor_id, now)?;
        let clue = inner
            .tables
            .clue_lines
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "finds a clue".to_string());

        let lines = match outcome {
            Contribution::NoBoss => return Ok(Vec::new()),
            Contribution::Damaged {
                boss_name,
                damage,
                hp,
                max_hp,
            } => vec![format!(
                "{} {clue}! ({damage} damage to {boss_name} {})",
                record.display_name,
                hp_bar(hp, max_hp)
            )],
            Contribution::Defeated { boss_name, damage } => {
                let lines = vec![
                    format!("{} {clue}! ({damage} damage)", record.display_name),
                    format!("*** {boss_name} HAS BEEN TAKEN DOWN! Everyone fights easier for a while. ***"),
                ];
                inner.notify(channel, &lines);
                lines
            }
        };
        record.history.boss_clues += 1;
        inner.boss_hunt.persist(&*inner.store)?;
        Ok(lines)
    }

    /// Occasional flavor while a defeated boss haunts the realm.
    fn haunting_flavor(&self, now: DateTime<Utc>, rng: &mut StdRng) -> Result<Option<String>> {
        let inner = &self.inner;
        if inner.boss_hunt.haunting(now)?.is_none() {
            return Ok(None);
        }
        if rng.gen::<f64>() >= inner.config.boss_hunt.haunting_flavor_chance {
            return Ok(None);
        }
        Ok(inner.tables.haunting_lines.choose(rng).cloned())
    }
}
