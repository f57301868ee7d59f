use super::{Outcome, QuestEngine};
use crate::character::record::PlayerRecord;
use crate::combat::opponent::group_opponent;
use crate::core::error::{Rejection, Result};
use crate::core::ports::{keys, Record};
use crate::core::report::ActionResult;
use crate::effects::injury;
use crate::group::{join_window, open_window, resolve_window, take_for_close};
use crate::group::{GroupEncounter, GroupResolution};
use crate::scheduler::group_close_tag;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use std::sync::Arc;

/// Times a close re-reads the party after a join raced it.
const CLOSE_ATTEMPTS: usize = 3;

/// Delay before a close that found its slot busy tries again.
const CLOSE_RETRY_SECS: i64 = 1;

enum Take {
    Taken(GroupEncounter),
    /// The party changed after it was read.
    Changed,
    Gone,
}

impl QuestEngine {
    /// Opens a group window in `channel` with the actor as its first member.
    pub fn open_group(
        &self,
        actor_id: &str,
        display_name: &str,
        channel: &str,
    ) -> Result<ActionResult> {
        let inner = &self.inner;
        let Some(_guard) = inner.actors.acquire_one(actor_id)? else {
            return Ok(ActionResult::rejected(Rejection::Busy));
        };
        let now = inner.now();
        let mut record = inner.load_player(actor_id, Some(display_name))?;
        let mut rng = inner.action_rng()?;
        match self.open_window_for(&mut record, channel, false, &mut rng, now)? {
            None => Ok(ActionResult::rejected(Rejection::Busy)),
            Some(Err(rejection)) => Ok(ActionResult::rejected(rejection)),
            Some(Ok(lines)) => self.finish(record, lines),
        }
    }

    /// Opens a window and registers its deadline. `None` means the slot
    /// stayed busy past the lock timeout. The initiator's record is saved
    /// with the window; callers still save it again when they finish.
    pub(super) fn open_window_for(
        &self,
        record: &mut PlayerRecord,
        channel: &str,
        boss: bool,
        rng: &mut StdRng,
        now: DateTime<Utc>,
    ) -> Result<Option<Outcome>> {
        let inner = &self.inner;
        let opponent = group_opponent(
            record.level,
            boss,
            &inner.tables.group_names,
            &inner.tables.monsters,
            &inner.config,
            rng,
        );
        let opened = inner.groups.with_slot(channel, |slot| -> Result<_> {
            match open_window(slot, record, channel, opponent, &inner.config, now) {
                Ok((window, lines)) => {
                    // The initiator's spent energy lands before the window
                    // is stored; a failed write leaves no window behind.
                    let stored = inner.save_player(record.clone()).and_then(|_| {
                        inner
                            .store
                            .put(&keys::group(channel), Record::Group(window.clone()))
                    });
                    if let Err(err) = stored {
                        *slot = None;
                        return Err(err);
                    }
                    Ok(Ok((window, lines)))
                }
                Err(rejection) => Ok(Err(rejection)),
            }
        })?;
        let Some(opened) = opened else {
            return Ok(None);
        };
        match opened? {
            Ok((window, lines)) => {
                self.schedule_close_at(channel, window.open_until)?;
                inner.notify(channel, &lines);
                Ok(Some(Ok(lines)))
            }
            Err(rejection) => Ok(Some(Err(rejection))),
        }
    }

    /// Joins the channel's open window.
    pub fn join_group(
        &self,
        actor_id: &str,
        display_name: &str,
        channel: &str,
    ) -> Result<ActionResult> {
        let inner = &self.inner;
        let Some(_guard) = inner.actors.acquire_one(actor_id)? else {
            return Ok(ActionResult::rejected(Rejection::Busy));
        };
        let now = inner.now();
        let mut record = inner.load_player(actor_id, Some(display_name))?;
        let joined = inner.groups.with_slot(channel, |slot| -> Result<Outcome> {
            match join_window(slot, &mut record, &inner.config, now) {
                Ok(lines) => {
                    if let Some(window) = slot.as_ref() {
                        inner
                            .store
                            .put(&keys::group(channel), Record::Group(window.clone()))?;
                    }
                    Ok(Ok(lines))
                }
                Err(rejection) => Ok(Err(rejection)),
            }
        })?;
        match joined {
            None => Ok(ActionResult::rejected(Rejection::Busy)),
            Some(outcome) => match outcome? {
                Ok(lines) => self.finish(record, lines),
                Err(rejection) => Ok(ActionResult::rejected(rejection)),
            },
        }
    }

    /// Resolves the channel's window. Only the first close does anything;
    /// later ones, and closes with no open window, return `None`.
    ///
    /// Every participant is locked before the window leaves its slot, and
    /// all records are settled in memory before any is written.
    pub fn close_group(&self, channel: &str) -> Result<Option<GroupResolution>> {
        let inner = &self.inner;
        for _ in 0..CLOSE_ATTEMPTS {
            let party = inner.groups.with_slot(channel, |slot| {
                slot.as_ref()
                    .filter(|w| w.is_open())
                    .map(|w| w.participant_ids().map(str::to_string).collect::<Vec<_>>())
            })?;
            let ids = match party {
                None => return self.retry_close(channel),
                Some(None) => return Ok(None),
                Some(Some(ids)) => ids,
            };

            let Some(_guards) = inner.actors.acquire(&ids)? else {
                return self.retry_close(channel);
            };
            let taken = inner.groups.with_slot(channel, |slot| {
                let same_party = slot
                    .as_ref()
                    .is_some_and(|w| w.participant_ids().eq(ids.iter().map(String::as_str)));
                if !same_party {
                    return if slot.is_some() { Take::Changed } else { Take::Gone };
                }
                match take_for_close(slot) {
                    Some(window) => Take::Taken(window),
                    None => Take::Gone,
                }
            })?;
            match taken {
                None => return self.retry_close(channel),
                Some(Take::Gone) => return Ok(None),
                Some(Take::Changed) => continue,
                Some(Take::Taken(window)) => return self.settle_window(window).map(Some),
            }
        }
        self.retry_close(channel)
    }

    fn settle_window(&self, window: GroupEncounter) -> Result<GroupResolution> {
        let inner = &self.inner;
        let now = inner.now();
        let mut rng = inner.action_rng()?;

        let mut records = Vec::with_capacity(window.participants.len());
        for p in &window.participants {
            let mut record = inner.load_player(&p.actor_id, Some(&p.display_name))?;
            injury::purge_expired(&mut record, now);
            records.push(record);
        }

        let buff = inner.boss_hunt.active_buff(now)?;
        let ctx = inner.bout_context(buff.as_ref(), now);
        let resolution = resolve_window(&window, &mut records, &ctx, &mut rng);

        for record in records {
            inner.save_player(record)?;
        }
        inner.store.remove(&keys::group(&window.channel))?;
        inner.scheduler.cancel(&group_close_tag(&window.channel))?;
        inner.notify(&window.channel, &resolution.lines);
        Ok(resolution)
    }

    fn retry_close(&self, channel: &str) -> Result<Option<GroupResolution>> {
        tracing::debug!(channel, "group close deferred, slot or party busy");
        let at = self.inner.now() + Duration::seconds(CLOSE_RETRY_SECS);
        self.schedule_close_at(channel, at)?;
        Ok(None)
    }

    pub(super) fn schedule_close_at(&self, channel: &str, at: DateTime<Utc>) -> Result<()> {
        let weak = Arc::downgrade(&self.inner);
        let target = channel.to_string();
        self.inner.scheduler.schedule_at(
            &group_close_tag(channel),
            at,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let engine = QuestEngine { inner };
                if let Err(err) = engine.close_group(&target) {
                    tracing::warn!(channel = %target, %err, "scheduled group close failed");
                }
            }),
        )
    }

    /// Puts persisted windows back into their slots and re-registers their
    /// deadlines. A deadline already past fires on the next scheduler tick.
    pub fn restore_open_windows(&self) -> Result<usize> {
        let inner = &self.inner;
        let mut restored = 0;
        for key in inner.store.keys(keys::GROUP_PREFIX)? {
            let Some(Record::Group(window)) = inner.store.get(&key)? else {
                continue;
            };
            if !window.is_open() {
                inner.store.remove(&key)?;
                continue;
            }
            let channel = window.channel.clone();
            let until = window.open_until;
            if inner.groups.restore(window)? {
                self.schedule_close_at(&channel, until)?;
                restored += 1;
            }
        }
        if restored > 0 {
            tracing::info!(restored, "restored open group windows");
        }
        Ok(restored)
    }
}
