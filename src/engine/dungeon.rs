use super::{Inner, Outcome, QuestEngine};
use crate::core::error::{Rejection, Result};
use crate::core::ports::{keys, Record, RecordStoreExt};
use crate::core::report::ActionResult;
use crate::dungeon::logic;
use crate::dungeon::types::{Advance, DungeonMode, DungeonRun, RunStatus};

impl Inner {
    /// Keeps a paused run and drops a finished one.
    fn store_run(&self, run: DungeonRun, status: RunStatus) -> Result<()> {
        let key = keys::dungeon(&run.actor_id);
        match status {
            RunStatus::SafeHaven { .. } => self.store.put(&key, Record::DungeonRun(run)),
            RunStatus::Completed | RunStatus::Failed { .. } => self.store.remove(&key),
        }
    }

    fn report_advance(&self, run: &DungeonRun, advance: &Advance) {
        match advance.status {
            RunStatus::Completed => {
                if let Some(last) = advance.lines.last() {
                    self.notify(&run.channel, std::slice::from_ref(last));
                }
            }
            RunStatus::Failed { room } => {
                tracing::debug!(actor = %run.actor_id, room, "dungeon run failed");
            }
            RunStatus::SafeHaven { after_room } => {
                tracing::debug!(actor = %run.actor_id, room = after_room, "dungeon run paused");
            }
        }
    }
}

impl QuestEngine {
    /// Draws a new loadout of counter items.
    pub fn equip_dungeon(&self, actor_id: &str, display_name: &str) -> Result<ActionResult> {
        let inner = &self.inner;
        self.mutate(actor_id, Some(display_name), |record, rng, _now| {
            let active = inner.store.get_dungeon_run(actor_id)?.is_some();
            Ok(logic::equip(record, active, &inner.config, rng))
        })
    }

    /// Starts a run in `mode` (`step` or `nonstop`) and advances it until it
    /// pauses or ends.
    pub fn enter_dungeon(
        &self,
        actor_id: &str,
        display_name: &str,
        channel: &str,
        mode: &str,
    ) -> Result<ActionResult> {
        let Some(mode) = DungeonMode::from_name(mode) else {
            return Ok(ActionResult::rejected(Rejection::InvalidChoice(format!(
                "unknown dungeon mode '{mode}'"
            ))));
        };
        let inner = &self.inner;
        self.mutate(actor_id, Some(display_name), |record, rng, now| {
            let active = inner.store.get_dungeon_run(actor_id)?;
            let (mut run, mut lines) = match logic::enter(
                record,
                active.as_ref(),
                channel,
                mode,
                &inner.config.dungeon,
                now,
            ) {
                Ok(entered) => entered,
                Err(rejection) => return Ok(Err(rejection)),
            };
            let buff = inner.boss_hunt.active_buff(now)?;
            let ctx = inner.bout_context(buff.as_ref(), now);
            let advance = logic::advance(record, &mut run, &ctx, rng);
            inner.report_advance(&run, &advance);
            lines.extend(advance.lines);
            inner.store_run(run, advance.status)?;
            Ok(Ok(lines))
        })
    }

    /// Leaves a safe haven for the next rooms.
    pub fn continue_dungeon(&self, actor_id: &str, display_name: &str) -> Result<ActionResult> {
        let inner = &self.inner;
        self.mutate(actor_id, Some(display_name), |record, rng, now| {
            let Some(mut run) = inner.store.get_dungeon_run(actor_id)? else {
                return Ok(Err(Rejection::NoActiveRun));
            };
            let buff = inner.boss_hunt.active_buff(now)?;
            let ctx = inner.bout_context(buff.as_ref(), now);
            let advance = match logic::continue_run(record, &mut run, &ctx, rng) {
                Ok(advance) => advance,
                Err(rejection) => return Ok(Err(rejection)),
            };
            inner.report_advance(&run, &advance);
            inner.store_run(run, advance.status)?;
            Ok(Ok(advance.lines))
        })
    }

    /// Retreats from a safe haven with the partial reward.
    pub fn quit_dungeon(&self, actor_id: &str, display_name: &str) -> Result<ActionResult> {
        let inner = &self.inner;
        self.mutate(actor_id, Some(display_name), |record, _rng, now| -> Result<Outcome> {
            let Some(run) = inner.store.get_dungeon_run(actor_id)? else {
                return Ok(Err(Rejection::NoActiveRun));
            };
            let buff = inner.boss_hunt.active_buff(now)?;
            let ctx = inner.bout_context(buff.as_ref(), now);
            match logic::quit(record, &run, &ctx) {
                Ok(lines) => {
                    inner.store.remove(&keys::dungeon(actor_id))?;
                    Ok(Ok(lines))
                }
                Err(rejection) => Ok(Err(rejection)),
            }
        })
    }
}
