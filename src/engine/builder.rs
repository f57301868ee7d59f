use super::locks::ActorLocks;
use super::{Inner, QuestEngine, Tables};
use crate::boss_hunt::{load_pool, BossHunt};
use crate::combat::opponent::legend_entry;
use crate::core::config::EngineConfig;
use crate::core::content::ContentTable;
use crate::core::error::Result;
use crate::core::ports::{
    keys, Clock, ContentLookup, NotificationSink, RecordStore, RecordStoreExt, SystemClock,
    TracingSink,
};
use crate::group::GroupCoordinator;
use crate::scheduler::{ManualScheduler, Scheduler};
use crate::store::{migration, MemoryStore};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, RwLock};

/// Offsets the boss-hunt RNG from the engine RNG when a seed is fixed.
const BOSS_HUNT_SEED_OFFSET: u64 = 0x0B05_5EED;

/// Wires the ports together and starts an engine.
///
/// Anything not supplied gets an in-process default: [`MemoryStore`], the
/// built-in [`ContentTable`], [`SystemClock`], [`TracingSink`] and a
/// [`ManualScheduler`] nothing drives.
pub struct QuestEngineBuilder {
    config: EngineConfig,
    store: Option<Arc<dyn RecordStore>>,
    content: Option<Arc<dyn ContentLookup>>,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn NotificationSink>>,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl QuestEngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: None,
            content: None,
            clock: None,
            sink: None,
            scheduler: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn content(mut self, content: Arc<dyn ContentLookup>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Validates the config, normalizes stored records, restores open group
    /// windows and registers the background timers.
    pub fn build(self) -> Result<QuestEngine> {
        let config = self.config;
        config.validate()?;

        let store = self.store.unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let content = self
            .content
            .unwrap_or_else(|| Arc::new(ContentTable::builtin()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(ManualScheduler::new(clock.now())));

        migration::normalize_all(&*store, &config)?;

        let mut legends = Vec::new();
        for key in store.keys(keys::PLAYER_PREFIX)? {
            let id = key.trim_start_matches(keys::PLAYER_PREFIX);
            if let Some(record) = store.get_player(id)? {
                legends.extend(legend_entry(&record));
            }
        }

        let pool = load_pool(&*content);
        let boss_seed = config
            .rng_seed
            .map(|seed| seed.wrapping_add(BOSS_HUNT_SEED_OFFSET));
        let boss_hunt = match store.get_boss_hunt()? {
            Some(state) => BossHunt::from_state(state, pool, config.boss_hunt.clone(), boss_seed),
            None => BossHunt::new(pool, config.boss_hunt.clone(), boss_seed),
        };
        let now = clock.now();
        let hunt_state = boss_hunt.current_state(now)?;
        boss_hunt.persist(&*store)?;

        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let tables = Tables::load(&*content);
        let legend_count = legends.len();

        let inner = Inner {
            groups: GroupCoordinator::new(config.group.lock_timeout_ms),
            actors: ActorLocks::new(config.group.lock_timeout_ms),
            config,
            store,
            clock,
            sink,
            scheduler,
            tables,
            boss_hunt,
            legends: RwLock::new(legends),
            rng: Mutex::new(rng),
        };
        let engine = QuestEngine {
            inner: Arc::new(inner),
        };

        engine.register_defeat_handler()?;
        let restored = engine.restore_open_windows()?;
        if let Some(haunting) = hunt_state.haunting {
            engine.schedule_haunting_end(haunting.until)?;
        }
        engine.schedule_energy_regen()?;

        tracing::info!(
            legends = legend_count,
            restored_windows = restored,
            boss = ?hunt_state.boss.as_ref().map(|b| b.id.as_str()),
            "quest engine started"
        );
        Ok(engine)
    }
}
