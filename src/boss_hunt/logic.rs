//! The shared boss HP pool.
//!
//! Every mutation happens under one mutex, so concurrent contributions never
//! lose updates and a boss is defeated exactly once. Defeat handlers run after
//! the lock is released.

use super::types::{
    BossBuff, BossDef, BossHuntState, BossInstance, Contribution, DefeatEvent, Haunting,
};
use crate::core::balance::HP_BAR_CELLS;
use crate::core::config::BossHuntConfig;
use crate::core::error::{EngineError, Result};
use crate::core::ports::{keys, lookup_or, ContentLookup, Record, RecordStore};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Mutex, MutexGuard};

pub type DefeatHandler = Box<dyn Fn(&DefeatEvent) + Send + Sync>;

/// Pool used when content has no usable `boss_hunt.bosses` table.
pub fn default_pool() -> Vec<BossDef> {
    vec![
        BossDef {
            id: "don_corleone".to_string(),
            name: "Don Corleone".to_string(),
            max_hp: 500,
            haunts: false,
        },
        BossDef {
            id: "big_tony".to_string(),
            name: "Big Tony".to_string(),
            max_hp: 600,
            haunts: false,
        },
        BossDef {
            id: "lucky_luciano".to_string(),
            name: "Lucky Luciano".to_string(),
            max_hp: 550,
            haunts: true,
        },
    ]
}

pub fn load_pool(content: &dyn ContentLookup) -> Vec<BossDef> {
    let pool: Vec<BossDef> = lookup_or(content, "boss_hunt.bosses", default_pool());
    if pool.is_empty() {
        tracing::warn!("boss pool is empty, using the default pool");
        return default_pool();
    }
    pool
}

struct Inner {
    state: BossHuntState,
    rng: StdRng,
}

/// Owned boss-hunt resource.
pub struct BossHunt {
    inner: Mutex<Inner>,
    handlers: Mutex<Vec<DefeatHandler>>,
    pool: Vec<BossDef>,
    config: BossHuntConfig,
}

impl BossHunt {
    pub fn new(pool: Vec<BossDef>, config: BossHuntConfig, seed: Option<u64>) -> Self {
        Self::from_state(BossHuntState::default(), pool, config, seed)
    }

    /// Resumes from a persisted state.
    pub fn from_state(
        state: BossHuntState,
        pool: Vec<BossDef>,
        config: BossHuntConfig,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = if pool.is_empty() { default_pool() } else { pool };
        Self {
            inner: Mutex::new(Inner { state, rng }),
            handlers: Mutex::new(Vec::new()),
            pool,
            config,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| EngineError::LockPoisoned)
    }

    /// Registers a callback run once per defeat.
    pub fn on_defeat(&self, handler: DefeatHandler) -> Result<()> {
        let mut handlers = self.handlers.lock().map_err(|_| EngineError::LockPoisoned)?;
        handlers.push(handler);
        Ok(())
    }

    fn pick_boss(&self, rng: &mut StdRng, exclude: Option<&str>) -> Option<&BossDef> {
        let candidates: Vec<&BossDef> = self
            .pool
            .iter()
            .filter(|b| Some(b.id.as_str()) != exclude)
            .collect();
        if candidates.is_empty() {
            return self.pool.choose(rng);
        }
        candidates.choose(rng).copied()
    }

    /// Expires the buff and ends a finished haunting, spawning the next boss.
    fn refresh(&self, inner: &mut Inner, now: DateTime<Utc>) {
        if inner.state.buff.as_ref().is_some_and(|b| !b.is_active(now)) {
            tracing::debug!("boss hunt buff expired");
            inner.state.buff = None;
        }
        let mut exclude = None;
        if let Some(haunting) = &inner.state.haunting {
            if now < haunting.until {
                return;
            }
            tracing::info!(boss = %haunting.boss_id, "haunting window ended");
            exclude = Some(haunting.boss_id.clone());
            inner.state.haunting = None;
        }
        if inner.state.boss.is_none() {
            if let Some(def) = self.pick_boss(&mut inner.rng, exclude.as_deref()) {
                let boss = BossInstance::spawn(def, now);
                tracing::info!(boss = %boss.id, hp = boss.max_hp, "boss spawned");
                inner.state.boss = Some(boss);
            }
        }
    }

    fn new_buff(&self, now: DateTime<Utc>) -> BossBuff {
        BossBuff {
            expires_at: now + Duration::days(self.config.buff_days),
            xp_multiplier: self.config.buff_xp_multiplier,
            level_reduction: self.config.buff_level_reduction,
        }
    }

    /// Applies `amount` damage from one contributor.
    pub fn contribute(
        &self,
        amount: u32,
        contributor: &str,
        now: DateTime<Utc>,
    ) -> Result<Contribution> {
        let event;
        let outcome;
        {
            let mut guard = self.lock()?;
            let inner = &mut *guard;
            self.refresh(inner, now);
            if !self.config.enabled {
                return Ok(Contribution::NoBoss);
            }
            let Some(boss) = inner.state.boss.as_mut() else {
                return Ok(Contribution::NoBoss);
            };
            boss.hp = boss.hp.saturating_sub(amount);
            boss.clues += 1;
            inner.state.contribution_counter += 1;
            inner.state.stats.clues_found += 1;

            if !boss.is_defeated() {
                return Ok(Contribution::Damaged {
                    boss_name: boss.name.clone(),
                    damage: amount,
                    hp: boss.hp,
                    max_hp: boss.max_hp,
                });
            }

            let defeated = boss.clone();
            let buff = self.new_buff(now);
            let stats = &mut inner.state.stats;
            stats.bosses_defeated += 1;
            stats.last_defeated = Some(defeated.name.clone());
            stats.last_defeated_at = Some(now);
            inner.state.buff = Some(buff.clone());
            inner.state.boss = None;

            let haunting = defeated.haunts.then(|| Haunting {
                boss_id: defeated.id.clone(),
                boss_name: defeated.name.clone(),
                until: now + Duration::days(self.config.haunting_days),
            });
            inner.state.haunting = haunting.clone();
            if haunting.is_none() {
                self.refresh(inner, now);
            }

            tracing::info!(
                boss = %defeated.id,
                contributor,
                clues = defeated.clues,
                "boss defeated"
            );
            outcome = Contribution::Defeated {
                boss_name: defeated.name.clone(),
                damage: amount,
            };
            event = DefeatEvent {
                boss_id: defeated.id,
                boss_name: defeated.name,
                final_contributor: contributor.to_string(),
                buff,
                haunting,
            };
        }

        let handlers = self.handlers.lock().map_err(|_| EngineError::LockPoisoned)?;
        for handler in handlers.iter() {
            handler(&event);
        }
        Ok(outcome)
    }

    /// Snapshot after lazily applying expirations.
    pub fn current_state(&self, now: DateTime<Utc>) -> Result<BossHuntState> {
        let mut guard = self.lock()?;
        self.refresh(&mut guard, now);
        Ok(guard.state.clone())
    }

    pub fn active_buff(&self, now: DateTime<Utc>) -> Result<Option<BossBuff>> {
        Ok(self.current_state(now)?.buff)
    }

    pub fn haunting(&self, now: DateTime<Utc>) -> Result<Option<Haunting>> {
        Ok(self.current_state(now)?.haunting)
    }

    /// Admin: replaces the current boss. `None` picks at random.
    /// Returns `None` when `boss_id` is not in the pool.
    pub fn force_spawn(
        &self,
        boss_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<BossInstance>> {
        let mut guard = self.lock()?;
        let inner = &mut *guard;
        let def = match boss_id {
            Some(id) => self.pool.iter().find(|b| b.id == id),
            None => self.pick_boss(&mut inner.rng, None),
        };
        let Some(def) = def else {
            return Ok(None);
        };
        let boss = BossInstance::spawn(def, now);
        inner.state.haunting = None;
        inner.state.boss = Some(boss.clone());
        tracing::info!(boss = %boss.id, "boss force-spawned");
        Ok(Some(boss))
    }

    /// Admin: turns the realm buff on for a full window, or off.
    pub fn set_buff(&self, active: bool, now: DateTime<Utc>) -> Result<Option<BossBuff>> {
        let mut guard = self.lock()?;
        guard.state.buff = active.then(|| self.new_buff(now));
        tracing::info!(active, "boss hunt buff set");
        Ok(guard.state.buff.clone())
    }

    /// Writes the current state under the singleton key. Holds the pool
    /// lock while writing, so a persisted snapshot is never older than one
    /// already written.
    pub fn persist(&self, store: &dyn RecordStore) -> Result<()> {
        let guard = self.lock()?;
        store.put(keys::BOSS_HUNT, Record::BossHunt(guard.state.clone()))
    }

    /// Human-readable status.
    pub fn status_lines(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        if !self.config.enabled {
            return Ok(vec!["Boss hunt is not currently enabled.".to_string()]);
        }
        let state = self.current_state(now)?;
        let mut lines = Vec::new();
        match (&state.boss, &state.haunting) {
            (Some(boss), _) => {
                let pct = (boss.hp as u64 * 100 / boss.max_hp.max(1) as u64) as u32;
                lines.push(format!("Current Target: {}", boss.name));
                lines.push(format!(
                    "Progress: {}/{} HP ({pct}%) {}",
                    boss.hp,
                    boss.max_hp,
                    hp_bar(boss.hp, boss.max_hp)
                ));
                lines.push(format!("Clues collected: {}", boss.clues));
            }
            (None, Some(haunting)) => lines.push(format!(
                "{} has fallen, but still haunts the streets for {}.",
                haunting.boss_name,
                format_remaining(haunting.until - now)
            )),
            (None, None) => lines.push("No active boss hunt.".to_string()),
        }
        if let Some(buff) = &state.buff {
            lines.push(format!(
                "BUFF ACTIVE: Easier fights & bonus XP for {}!",
                format_remaining(buff.expires_at - now)
            ));
        }
        Ok(lines)
    }
}

/// Fixed-width HP bar, e.g. `[██████████░░░░░░░░░░]`.
pub fn hp_bar(hp: u32, max_hp: u32) -> String {
    let filled = if max_hp == 0 {
        0
    } else {
        (HP_BAR_CELLS as u64 * hp.min(max_hp) as u64 / max_hp as u64) as usize
    };
    format!(
        "[{}{}]",
        "█".repeat(filled),
        "░".repeat(HP_BAR_CELLS - filled)
    )
}

fn format_remaining(left: Duration) -> String {
    let secs = left.num_seconds().max(0);
    format!("{}d {}h", secs / 86_400, (secs % 86_400) / 3_600)
}
