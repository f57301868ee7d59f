use super::QuestEngine;
use crate::boss_hunt::hp_bar;
use crate::core::error::{Rejection, Result};
use crate::core::report::ActionResult;
use crate::scheduler::BOSS_HUNT_HAUNTING_TAG;
use chrono::{DateTime, Utc};
use std::sync::Arc;

impl QuestEngine {
    /// Current boss, HP bar, clues and buff time left.
    pub fn boss_status(&self) -> Result<ActionResult> {
        let lines = self.inner.boss_hunt.status_lines(self.inner.now())?;
        Ok(ActionResult::ok(lines))
    }

    /// Admin: replaces the current boss. `None` picks one at random.
    pub fn admin_boss_spawn(&self, boss_id: Option<&str>) -> Result<ActionResult> {
        let inner = &self.inner;
        let Some(boss) = inner.boss_hunt.force_spawn(boss_id, inner.now())? else {
            return Ok(ActionResult::rejected(Rejection::InvalidChoice(format!(
                "no boss with id '{}'",
                boss_id.unwrap_or_default()
            ))));
        };
        inner.boss_hunt.persist(&*inner.store)?;
        // A forced spawn ends any haunting early.
        inner.scheduler.cancel(BOSS_HUNT_HAUNTING_TAG)?;
        Ok(ActionResult::ok(vec![format!(
            "{} appears! {} {}/{} HP",
            boss.name,
            hp_bar(boss.hp, boss.max_hp),
            boss.hp,
            boss.max_hp
        )]))
    }

    /// Admin: turns the realm buff on for a full window, or off.
    pub fn admin_boss_buff(&self, active: bool) -> Result<ActionResult> {
        let inner = &self.inner;
        let buff = inner.boss_hunt.set_buff(active, inner.now())?;
        inner.boss_hunt.persist(&*inner.store)?;
        let line = match buff {
            Some(buff) => format!(
                "Boss buff active until {}.",
                buff.expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => "Boss buff cleared.".to_string(),
        };
        Ok(ActionResult::ok(vec![line]))
    }

    pub(super) fn register_defeat_handler(&self) -> Result<()> {
        let weak = Arc::downgrade(&self.inner);
        self.inner.boss_hunt.on_defeat(Box::new(move |event| {
            let Some(haunting) = &event.haunting else {
                return;
            };
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let engine = QuestEngine { inner };
            if let Err(err) = engine.schedule_haunting_end(haunting.until) {
                tracing::warn!(boss = %event.boss_id, %err, "could not schedule haunting end");
            }
        }))
    }

    /// Respawns once the haunting window closes. `current_state` also
    /// respawns lazily, so a missed timer only delays the persisted state.
    pub(super) fn schedule_haunting_end(&self, until: DateTime<Utc>) -> Result<()> {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule_at(
            BOSS_HUNT_HAUNTING_TAG,
            until,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Err(err) = (QuestEngine { inner }).end_haunting() {
                    tracing::warn!(%err, "haunting end failed");
                }
            }),
        )
    }

    fn end_haunting(&self) -> Result<()> {
        let inner = &self.inner;
        let state = inner.boss_hunt.current_state(inner.now())?;
        inner.boss_hunt.persist(&*inner.store)?;
        if let Some(boss) = state.boss {
            tracing::info!(boss = %boss.id, "boss returned after haunting");
        }
        Ok(())
    }
}
