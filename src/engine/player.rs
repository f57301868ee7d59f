use super::{Outcome, QuestEngine};
use crate::character::challenge::{self, AbilityUse};
use crate::character::{energy, hardcore, prestige};
use crate::core::error::{Rejection, Result};
use crate::core::ports::{keys, RecordStoreExt};
use crate::core::report::ActionResult;
use crate::effects::buffs::{self, CombatBuff};
use crate::effects::injury;
use crate::effects::items::{self, ItemKind};
use crate::scheduler::ENERGY_REGEN_TAG;
use chrono::Duration;
use std::sync::Arc;

// =============================================================================
// PROGRESSION
// =============================================================================

impl QuestEngine {
    pub fn enter_hardcore(&self, actor_id: &str, display_name: &str) -> Result<ActionResult> {
        let inner = &self.inner;
        self.mutate(actor_id, Some(display_name), |record, _rng, now| {
            if inner.store.get_dungeon_run(actor_id)?.is_some() {
                return Ok(Err(Rejection::ModeConflict("in the dungeon")));
            }
            Ok(hardcore::enter(record, &inner.config, now))
        })
    }

    pub fn hardcore_quit(&self, actor_id: &str, display_name: &str) -> Result<ActionResult> {
        self.mutate(actor_id, Some(display_name), |record, _rng, _now| {
            Ok(hardcore::quit(record, &self.inner.config))
        })
    }

    /// Picks the item kept out of the locker after a hardcore completion.
    pub fn choose_permanent_item(
        &self,
        actor_id: &str,
        display_name: &str,
        item: &str,
    ) -> Result<ActionResult> {
        let item = ItemKind::from_key(item)
            .map(|kind| kind.key().to_string())
            .unwrap_or_else(|| item.to_string());
        self.mutate(actor_id, Some(display_name), |record, _rng, _now| {
            Ok(hardcore::choose_permanent_item(record, &item).map(|line| vec![line]))
        })
    }

    /// Prestiges, optionally entering a challenge path at the same time.
    pub fn prestige(
        &self,
        actor_id: &str,
        display_name: &str,
        path: Option<&str>,
    ) -> Result<ActionResult> {
        let inner = &self.inner;
        let path = match path {
            Some(id) => match challenge::find_path(&inner.tables.paths, id) {
                Some(path) => Some(path),
                None => {
                    return Ok(ActionResult::rejected(Rejection::InvalidChoice(format!(
                        "unknown challenge path '{id}'"
                    ))))
                }
            },
            None => None,
        };
        self.mutate(actor_id, Some(display_name), |record, _rng, _now| {
            Ok(prestige::prestige(record, path, &inner.config))
        })
    }

    /// Transcends and registers the player as a legend opponent.
    pub fn transcend(&self, actor_id: &str, display_name: &str) -> Result<ActionResult> {
        let inner = &self.inner;
        self.mutate(actor_id, Some(display_name), |record, _rng, _now| {
            let outcome = prestige::transcend(record, &inner.config);
            if outcome.is_ok() {
                inner.register_legend(record)?;
            }
            Ok(outcome)
        })
    }

    pub fn select_class(
        &self,
        actor_id: &str,
        display_name: &str,
        class_name: &str,
    ) -> Result<ActionResult> {
        let classes = &self.inner.tables.classes;
        let Some(class) = classes.iter().find(|c| c.eq_ignore_ascii_case(class_name.trim())) else {
            return Ok(ActionResult::rejected(Rejection::UnknownClass(
                class_name.to_string(),
            )));
        };
        self.mutate(actor_id, Some(display_name), |record, _rng, _now| {
            if record.class_name.as_deref() == Some(class.as_str()) {
                return Ok(Err(Rejection::AlreadyActive(class.clone())));
            }
            record.class_name = Some(class.clone());
            Ok(Ok(vec![format!("{} is now a {class}.", record.display_name)]))
        })
    }

    /// Public stats for any player who has acted before.
    pub fn player_stats(&self, actor_id: &str) -> Result<ActionResult> {
        let Some(record) = self.inner.store.get_player(actor_id)? else {
            return Ok(ActionResult::rejected(Rejection::NotEligible(format!(
                "{actor_id} has no record"
            ))));
        };
        let stats = self.inner.stats(&record);
        let mut lines = vec![format!(
            "{}: Level {} ({}/{} XP), Prestige {}, Energy {}/{}",
            stats.display_name,
            stats.level,
            stats.xp,
            stats.xp_to_next,
            stats.prestige,
            stats.energy,
            stats.max_energy
        )];
        if stats.transcendence > 0 {
            lines.push(format!("Transcendence {}", stats.transcendence));
        }
        if let Some((hp, max_hp)) = stats.hardcore_hp {
            lines.push(format!("Hardcore HP {hp}/{max_hp}"));
        }
        if !stats.injuries.is_empty() {
            lines.push(format!("Injuries: {}", stats.injuries.join(", ")));
        }
        lines.push(format!("Record: {}W / {}L", stats.wins, stats.losses));
        Ok(ActionResult::ok(lines).with_stats(stats))
    }
}

// =============================================================================
// ITEMS AND ABILITIES
// =============================================================================

impl QuestEngine {
    pub fn use_item(&self, actor_id: &str, display_name: &str, item: &str) -> Result<ActionResult> {
        let Some(kind) = ItemKind::from_key(item) else {
            return Ok(ActionResult::rejected(Rejection::UnknownItem(item.to_string())));
        };
        self.mutate(actor_id, Some(display_name), |record, rng, now| {
            injury::purge_expired(record, now);
            Ok(items::use_item(record, kind, &self.inner.config, rng))
        })
    }

    /// Searches `count` times, one energy each.
    pub fn search(&self, actor_id: &str, display_name: &str, count: u32) -> Result<ActionResult> {
        self.mutate(actor_id, Some(display_name), |record, rng, now| {
            let mut lines = Vec::new();
            let recovered = injury::purge_expired(record, now);
            lines.extend(injury::recovery_line(&recovered));
            match items::search(record, count, &self.inner.config, rng) {
                Ok(report) => {
                    lines.push(report.summary());
                    Ok(Ok(lines))
                }
                Err(rejection) => Ok(Err(rejection)),
            }
        })
    }

    /// Uses an unlocked ability. A party buff reaches everyone in the
    /// channel's open window when the user is part of it.
    pub fn use_ability(
        &self,
        actor_id: &str,
        display_name: &str,
        channel: &str,
        ability_id: &str,
    ) -> Result<ActionResult> {
        let inner = &self.inner;
        let party: Vec<String> = inner
            .groups
            .peek(channel)?
            .filter(|w| w.is_open() && w.has_joined(actor_id))
            .map(|w| w.participant_ids().map(str::to_string).collect())
            .unwrap_or_default();
        let mut ids = vec![actor_id.to_string()];
        ids.extend(party.into_iter().filter(|id| id != actor_id));

        let Some(_guards) = inner.actors.acquire(&ids)? else {
            return Ok(ActionResult::rejected(Rejection::Busy));
        };
        let now = inner.now();
        let mut record = inner.load_player(actor_id, Some(display_name))?;
        let used = challenge::use_ability(
            &mut record,
            &inner.tables.abilities,
            ability_id,
            &inner.config,
            now,
        );
        let lines = match used {
            Err(rejection) => return Ok(ActionResult::rejected(rejection)),
            Ok(AbilityUse::Applied(lines)) => lines,
            Ok(AbilityUse::PartyBuff(buff)) => {
                let mut members = Vec::new();
                for id in &ids[1..] {
                    let Some(mut member) = inner.store.get_player(id)? else {
                        continue;
                    };
                    if !buffs::has_active(&member.buffs, &buff.source) {
                        member.buffs.push(buff.clone());
                        members.push(member.display_name.clone());
                        inner.save_player(member)?;
                    }
                }
                record.buffs.push(buff);
                party_buff_lines(&record.display_name, &members)
            }
        };
        self.finish(record, lines)
    }

    /// Admin: unlocks an ability without completing its path.
    pub fn admin_grant_ability(&self, actor_id: &str, ability_id: &str) -> Result<ActionResult> {
        let Some(ability) = self
            .inner
            .tables
            .abilities
            .iter()
            .find(|a| a.id == ability_id)
        else {
            return Ok(ActionResult::rejected(Rejection::UnknownAbility(
                ability_id.to_string(),
            )));
        };
        self.mutate(actor_id, None, |record, _rng, _now| -> Result<Outcome> {
            if !record.abilities.unlocked.insert(ability.id.clone()) {
                return Ok(Err(Rejection::AlreadyActive(ability.name.clone())));
            }
            tracing::info!(actor = %record.actor_id, ability = %ability.id, "ability granted");
            Ok(Ok(vec![format!(
                "{} has been granted {}.",
                record.display_name, ability.name
            )]))
        })
    }
}

fn party_buff_lines(user: &str, members: &[String]) -> Vec<String> {
    let charm = CombatBuff::lucky_charm();
    let bonus = (charm.magnitude * 100.0).round();
    if members.is_empty() {
        return vec![format!("{user} feels lucky: +{bonus}% win chance on the next fight.")];
    }
    vec![format!(
        "{user} rallies the party! {user}, {} gain +{bonus}% win chance on the next fight.",
        members.join(", ")
    )]
}

// =============================================================================
// ENERGY
// =============================================================================

impl QuestEngine {
    /// One regeneration tick for every stored player. Players busy with
    /// another action are skipped until the next tick.
    ///
    /// Returns how many records changed.
    pub fn regen_energy(&self) -> Result<usize> {
        let inner = &self.inner;
        let now = inner.now();
        let mut changed = 0;
        for key in inner.store.keys(keys::PLAYER_PREFIX)? {
            let id = key.trim_start_matches(keys::PLAYER_PREFIX);
            let Some(_guard) = inner.actors.acquire_one(id)? else {
                tracing::debug!(actor = id, "skipping busy player during regen");
                continue;
            };
            let Some(mut record) = inner.store.get_player(id)? else {
                continue;
            };
            let before = (record.energy, record.energy_regen_carry, record.injuries.len());
            injury::purge_expired(&mut record, now);
            energy::regenerate(&mut record, &inner.config.energy, 1);
            if before != (record.energy, record.energy_regen_carry, record.injuries.len()) {
                inner.save_player(record)?;
                changed += 1;
            }
        }
        tracing::debug!(changed, "energy regenerated");
        Ok(changed)
    }

    pub(super) fn schedule_energy_regen(&self) -> Result<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = Duration::seconds(self.inner.config.energy.regen_interval_secs);
        self.inner.scheduler.schedule_every(
            ENERGY_REGEN_TAG,
            period,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Err(err) = (QuestEngine { inner }).regen_energy() {
                    tracing::warn!(%err, "energy regeneration failed");
                }
            }),
        )
    }
}
