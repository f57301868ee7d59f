//! The action facade.
//!
//! [`QuestEngine`] owns the record store, content tables and the shared
//! resources (group slots, the boss hunt, the engine RNG) and exposes one
//! method per player action. Every action has the same shape:
//!
//! 1. take the per-player locks for everyone it will write
//! 2. load the records
//! 3. run the rules on the loaded copies
//! 4. write them back only if every step succeeded
//!
//! Expected refusals come back as an [`ActionResult`] carrying a
//! [`Rejection`]; `Err` is reserved for store and lock failures.

mod boss;
mod builder;
mod dungeon;
mod group;
mod locks;
mod player;
mod solo;

pub use builder::QuestEngineBuilder;

use crate::boss_hunt::types::{BossBuff, BossHuntState};
use crate::boss_hunt::BossHunt;
use crate::character::challenge::{self, Ability, ChallengePath};
use crate::character::energy;
use crate::character::record::PlayerRecord;
use crate::combat::logic::BoutContext;
use crate::combat::opponent::{legend_entry, load_group_names, load_monsters};
use crate::combat::types::{LegendEntry, MonsterDef};
use crate::core::config::EngineConfig;
use crate::core::error::{EngineError, Rejection, Result};
use crate::core::ports::{
    lookup_or, Clock, ContentLookup, NotificationSink, RecordStore, RecordStoreExt, Target,
};
use crate::core::report::{ActionResult, PublicStats};
use crate::dungeon::types::DungeonRun;
use crate::effects::injury::{self, InjuryDef};
use crate::group::{GroupCoordinator, GroupEncounter};
use crate::scheduler::Scheduler;
use chrono::{DateTime, Utc};
use locks::ActorLocks;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, RwLock};

/// Result of the rules for one action: lines on success, or the refusal.
type Outcome = std::result::Result<Vec<String>, Rejection>;

fn default_classes() -> Vec<String> {
    vec!["warrior".to_string(), "rogue".to_string(), "cleric".to_string()]
}

fn default_clue_lines() -> Vec<String> {
    vec!["finds a clue".to_string()]
}

/// Content tables, loaded once at build time.
pub(crate) struct Tables {
    monsters: Vec<MonsterDef>,
    group_names: (Vec<String>, Vec<String>),
    classes: Vec<String>,
    paths: Vec<ChallengePath>,
    abilities: Vec<Ability>,
    injuries: Vec<InjuryDef>,
    clue_lines: Vec<String>,
    haunting_lines: Vec<String>,
}

impl Tables {
    pub(crate) fn load(content: &dyn ContentLookup) -> Self {
        let mut classes: Vec<String> = lookup_or(content, "classes", default_classes());
        if classes.is_empty() {
            tracing::warn!("class list is empty, using defaults");
            classes = default_classes();
        }
        Self {
            monsters: load_monsters(content),
            group_names: load_group_names(content),
            classes,
            paths: challenge::load_paths(content),
            abilities: challenge::load_abilities(content),
            injuries: injury::injury_catalog(content),
            clue_lines: lookup_or(content, "boss_hunt.clue_lines", default_clue_lines()),
            haunting_lines: lookup_or(content, "boss_hunt.haunting_lines", Vec::new()),
        }
    }
}

pub(crate) struct Inner {
    config: EngineConfig,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    scheduler: Arc<dyn Scheduler>,
    tables: Tables,
    groups: GroupCoordinator,
    boss_hunt: BossHunt,
    actors: ActorLocks,
    /// Transcended players, available as legend opponents.
    legends: RwLock<Vec<LegendEntry>>,
    rng: Mutex<StdRng>,
}

impl Inner {
    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// A per-action RNG split off the engine RNG, so the engine lock is not
    /// held while an action runs. Seeded engines stay reproducible as long
    /// as actions run in the same order.
    fn action_rng(&self) -> Result<StdRng> {
        let mut rng = self.rng.lock().map_err(|_| EngineError::LockPoisoned)?;
        Ok(StdRng::seed_from_u64(rng.gen()))
    }

    /// Loads a player, creating a fresh record on first contact. A non-empty
    /// `display_name` that differs from the stored one replaces it.
    fn load_player(&self, actor_id: &str, display_name: Option<&str>) -> Result<PlayerRecord> {
        let name = display_name.filter(|n| !n.trim().is_empty());
        match self.store.get_player(actor_id)? {
            Some(mut record) => {
                if let Some(name) = name {
                    if record.display_name != name {
                        record.display_name = name.to_string();
                    }
                }
                Ok(record)
            }
            None => {
                tracing::info!(actor = actor_id, "new player record");
                Ok(PlayerRecord::new(
                    actor_id,
                    name.unwrap_or(actor_id),
                    self.now(),
                    &self.config,
                ))
            }
        }
    }

    fn save_player(&self, record: PlayerRecord) -> Result<()> {
        self.store.put_player(record)
    }

    fn stats(&self, record: &PlayerRecord) -> PublicStats {
        PublicStats::from_record(record, energy::max_energy(record, &self.config.energy))
    }

    fn bout_context<'a>(
        &'a self,
        boss_buff: Option<&'a BossBuff>,
        now: DateTime<Utc>,
    ) -> BoutContext<'a> {
        BoutContext {
            config: &self.config,
            classes: &self.tables.classes,
            paths: &self.tables.paths,
            abilities: &self.tables.abilities,
            injuries: &self.tables.injuries,
            boss_buff,
            now,
        }
    }

    fn notify(&self, channel: &str, lines: &[String]) {
        for line in lines {
            self.sink.emit(Target::Channel(channel.to_string()), line.clone());
        }
    }

    fn legends(&self) -> Result<Vec<LegendEntry>> {
        let legends = self.legends.read().map_err(|_| EngineError::LockPoisoned)?;
        Ok(legends.clone())
    }

    fn register_legend(&self, record: &PlayerRecord) -> Result<()> {
        let mut legends = self.legends.write().map_err(|_| EngineError::LockPoisoned)?;
        legends.retain(|l| l.actor_id != record.actor_id);
        legends.extend(legend_entry(record));
        Ok(())
    }
}

/// The engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct QuestEngine {
    inner: Arc<Inner>,
}

impl QuestEngine {
    pub fn builder(config: EngineConfig) -> QuestEngineBuilder {
        QuestEngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Stored record for `actor_id`, if the player has ever acted.
    pub fn player(&self, actor_id: &str) -> Result<Option<PlayerRecord>> {
        self.inner.store.get_player(actor_id)
    }

    /// The channel's open group window, if any.
    pub fn group_window(&self, channel: &str) -> Result<Option<GroupEncounter>> {
        self.inner.groups.peek(channel)
    }

    pub fn dungeon_run(&self, actor_id: &str) -> Result<Option<DungeonRun>> {
        self.inner.store.get_dungeon_run(actor_id)
    }

    pub fn boss_state(&self) -> Result<BossHuntState> {
        self.inner.boss_hunt.current_state(self.inner.now())
    }

    /// Actor ids of every transcended player.
    pub fn legend_ids(&self) -> Result<Vec<String>> {
        Ok(self
            .inner
            .legends()?
            .into_iter()
            .map(|l| l.actor_id)
            .collect())
    }

    /// Persists pending store writes.
    pub fn flush(&self) -> Result<()> {
        self.inner.store.flush_if_dirty()
    }

    /// Runs `rules` against one player's record under that player's lock and
    /// writes the record back only when the rules succeed.
    fn mutate<F>(&self, actor_id: &str, display_name: Option<&str>, rules: F) -> Result<ActionResult>
    where
        F: FnOnce(&mut PlayerRecord, &mut StdRng, DateTime<Utc>) -> Result<Outcome>,
    {
        let inner = &self.inner;
        let Some(_guard) = inner.actors.acquire_one(actor_id)? else {
            return Ok(ActionResult::rejected(Rejection::Busy));
        };
        let mut record = inner.load_player(actor_id, display_name)?;
        let mut rng = inner.action_rng()?;
        match rules(&mut record, &mut rng, inner.now())? {
            Ok(lines) => self.finish(record, lines),
            Err(rejection) => Ok(ActionResult::rejected(rejection)),
        }
    }

    /// Writes a finished record and wraps the lines up with its stats.
    fn finish(&self, record: PlayerRecord, lines: Vec<String>) -> Result<ActionResult> {
        let stats = self.inner.stats(&record);
        self.inner.save_player(record)?;
        Ok(ActionResult::ok(lines).with_stats(stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ports::{keys, ManualClock, MemorySink, Record};
    use crate::scheduler::{group_close_tag, ManualScheduler};
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Harness {
        engine: QuestEngine,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
        scheduler: Arc<ManualScheduler>,
        sink: Arc<MemorySink>,
    }

    fn harness(tweak: impl FnOnce(&mut EngineConfig)) -> Harness {
        let mut config = EngineConfig::default();
        config.rng_seed = Some(7);
        config.group.lock_timeout_ms = 10;
        config.combat.boss_encounter_chance = 0.0;
        tweak(&mut config);
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start));
        let scheduler = Arc::new(ManualScheduler::new(start));
        let sink = Arc::new(MemorySink::new());
        let engine = QuestEngine::builder(config)
            .store(store.clone())
            .clock(clock.clone())
            .scheduler(scheduler.clone())
            .notifications(sink.clone())
            .build()
            .unwrap();
        Harness {
            engine,
            store,
            clock,
            scheduler,
            sink,
        }
    }

    /// Memory store whose player writes fail while `failing` is set.
    struct FlakyPlayerStore {
        records: MemoryStore,
        failing: AtomicBool,
    }

    impl RecordStore for FlakyPlayerStore {
        fn get(&self, key: &str) -> Result<Option<Record>> {
            self.records.get(key)
        }

        fn put(&self, key: &str, record: Record) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) && key.starts_with(keys::PLAYER_PREFIX) {
                return Err(EngineError::StoreUnavailable("disk full".to_string()));
            }
            self.records.put(key, record)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.records.remove(key)
        }

        fn keys(&self, prefix: &str) -> Result<Vec<String>> {
            self.records.keys(prefix)
        }

        fn flush_if_dirty(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_initiator_save_leaves_no_window() {
        let mut config = EngineConfig::default();
        config.rng_seed = Some(7);
        config.group.lock_timeout_ms = 10;
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let store = Arc::new(FlakyPlayerStore {
            records: MemoryStore::new(),
            failing: AtomicBool::new(false),
        });
        let scheduler = Arc::new(ManualScheduler::new(start));
        let engine = QuestEngine::builder(config)
            .store(store.clone())
            .clock(Arc::new(ManualClock::new(start)))
            .scheduler(scheduler.clone())
            .build()
            .unwrap();

        store.failing.store(true, Ordering::SeqCst);
        assert!(engine.open_group("u1", "Ann", "#q").is_err());
        assert!(engine.group_window("#q").unwrap().is_none());
        assert!(store.get(&keys::group("#q")).unwrap().is_none());
        assert!(!scheduler.tags().unwrap().contains(&group_close_tag("#q")));

        store.failing.store(false, Ordering::SeqCst);
        assert!(engine.open_group("u1", "Ann", "#q").unwrap().success);
        let record = store.records.get_player("u1").unwrap().unwrap();
        let config = engine.config();
        assert_eq!(record.energy, config.energy.base_max - config.energy.group_cost);
    }

    #[test]
    fn test_rejected_action_writes_nothing() {
        let h = harness(|_| {});
        let result = h.engine.use_item("u1", "Ann", "medkit").unwrap();
        assert!(!result.success);
        assert_eq!(result.rejection, Some(Rejection::NoItem("Medkit".into())));
        assert!(h.engine.player("u1").unwrap().is_none());
    }

    #[test]
    fn test_unknown_inputs_are_rejected_before_loading() {
        let h = harness(|_| {});
        let item = h.engine.use_item("u1", "Ann", "banana").unwrap();
        assert_eq!(item.rejection, Some(Rejection::UnknownItem("banana".into())));
        let class = h.engine.select_class("u1", "Ann", "bard").unwrap();
        assert_eq!(class.rejection, Some(Rejection::UnknownClass("bard".into())));
        let mode = h.engine.enter_dungeon("u1", "Ann", "#q", "sideways").unwrap();
        assert!(matches!(mode.rejection, Some(Rejection::InvalidChoice(_))));
        assert!(h.store.keys(keys::PLAYER_PREFIX).unwrap().is_empty());
    }

    #[test]
    fn test_select_class_is_case_insensitive() {
        let h = harness(|_| {});
        let result = h.engine.select_class("u1", "Ann", "Rogue").unwrap();
        assert!(result.success);
        let record = h.engine.player("u1").unwrap().unwrap();
        assert_eq!(record.class_name.as_deref(), Some("rogue"));
        assert_eq!(record.display_name, "Ann");
        assert!(result.stats.is_some());
    }

    #[test]
    fn test_busy_actor_is_rejected() {
        let h = harness(|_| {});
        let _held = h.engine.inner.actors.acquire_one("u1").unwrap().unwrap();
        let result = h.engine.search("u1", "Ann", 1).unwrap();
        assert_eq!(result.rejection, Some(Rejection::Busy));
    }

    #[test]
    fn test_group_window_closes_once() {
        let h = harness(|_| {});
        assert!(h.engine.open_group("u1", "Ann", "#q").unwrap().success);
        assert!(h.engine.join_group("u2", "Bob", "#q").unwrap().success);
        assert!(h.store.get(&keys::group("#q")).unwrap().is_some());

        let resolution = h.engine.close_group("#q").unwrap().unwrap();
        assert!(!resolution.lines.is_empty());
        assert!(h.engine.close_group("#q").unwrap().is_none());
        assert!(h.engine.group_window("#q").unwrap().is_none());
        assert!(h.store.get(&keys::group("#q")).unwrap().is_none());
        assert!(!h.scheduler.tags().unwrap().contains(&group_close_tag("#q")));

        for id in ["u1", "u2"] {
            let record = h.engine.player(id).unwrap().unwrap();
            assert_eq!(record.history.wins + record.history.losses, 1, "{id}");
        }
        let announced = h.sink.channel_messages("#q");
        assert!(announced.ends_with(&resolution.lines));
    }

    #[test]
    fn test_group_window_closes_on_its_deadline() {
        let h = harness(|_| {});
        h.engine.open_group("u1", "Ann", "#q").unwrap();
        let until = h.engine.group_window("#q").unwrap().unwrap().open_until;

        h.scheduler.run_due(until - Duration::seconds(1)).unwrap();
        assert!(h.engine.group_window("#q").unwrap().is_some());
        h.clock.set(until);
        h.scheduler.run_due(until).unwrap();
        assert!(h.engine.group_window("#q").unwrap().is_none());
        let record = h.engine.player("u1").unwrap().unwrap();
        assert_eq!(record.history.wins + record.history.losses, 1);
    }

    #[test]
    fn test_solo_in_boss_band_can_open_boss_window() {
        let h = harness(|c| {
            c.combat.monster_spawn_chance = 1.0;
            c.combat.boss_encounter_chance = 1.0;
        });
        let mut record = PlayerRecord::new("u1", "Ann", h.clock.now(), h.engine.config());
        record.level = 18;
        h.store.put_player(record).unwrap();

        let result = h.engine.resolve_solo("u1", "Ann", "#q", "normal").unwrap();
        assert!(result.success);
        let window = h.engine.group_window("#q").unwrap().unwrap();
        assert!(window.opponent.boss);
        assert_eq!(window.participant_ids().collect::<Vec<_>>(), vec!["u1"]);
        let record = h.engine.player("u1").unwrap().unwrap();
        assert!(record.last_solo_at.is_some());
        assert_eq!(record.history.wins + record.history.losses, 0);
    }

    #[test]
    fn test_party_buff_reaches_window_members() {
        let h = harness(|_| {});
        assert!(h.engine.admin_grant_ability("u1", "rallying_cry").unwrap().success);
        h.engine.open_group("u1", "Ann", "#q").unwrap();
        h.engine.join_group("u2", "Bob", "#q").unwrap();

        let result = h.engine.use_ability("u1", "Ann", "#q", "rallying_cry").unwrap();
        assert!(result.success, "{:?}", result.lines);
        for id in ["u1", "u2"] {
            let record = h.engine.player(id).unwrap().unwrap();
            assert!(crate::effects::buffs::has_active(&record.buffs, "lucky_charm"), "{id}");
        }

        let again = h.engine.use_ability("u1", "Ann", "#q", "rallying_cry").unwrap();
        assert!(matches!(again.rejection, Some(Rejection::AbilityCooldown { .. })));
    }

    #[test]
    fn test_regen_only_writes_changed_records() {
        let h = harness(|_| {});
        h.engine.select_class("u1", "Ann", "warrior").unwrap();
        assert_eq!(h.engine.regen_energy().unwrap(), 0);

        let mut record = h.engine.player("u1").unwrap().unwrap();
        record.energy = 5;
        h.store.put_player(record).unwrap();
        assert_eq!(h.engine.regen_energy().unwrap(), 1);
        assert_eq!(h.engine.player("u1").unwrap().unwrap().energy, 6);
    }

    #[test]
    fn test_regen_runs_on_the_scheduler() {
        let h = harness(|_| {});
        h.engine.select_class("u1", "Ann", "warrior").unwrap();
        let mut record = h.engine.player("u1").unwrap().unwrap();
        record.energy = 2;
        h.store.put_player(record).unwrap();

        let later = h.clock.now() + Duration::minutes(35);
        h.scheduler.run_due(later).unwrap();
        assert_eq!(h.engine.player("u1").unwrap().unwrap().energy, 5);
    }

    #[test]
    fn test_permanent_pick_and_stats() {
        let h = harness(|_| {});
        let none = h.engine.player_stats("u1").unwrap();
        assert!(matches!(none.rejection, Some(Rejection::NotEligible(_))));

        let mut record = PlayerRecord::new("u1", "Ann", h.clock.now(), h.engine.config());
        record.pending_permanent_choice = Some(["medkit".to_string()].into_iter().collect());
        h.store.put_player(record).unwrap();

        let wrong = h.engine.choose_permanent_item("u1", "Ann", "lucky_charm").unwrap();
        assert!(matches!(wrong.rejection, Some(Rejection::InvalidChoice(_))));
        let picked = h.engine.choose_permanent_item("u1", "Ann", "medkit").unwrap();
        assert!(picked.success, "{:?}", picked.lines);
        let record = h.engine.player("u1").unwrap().unwrap();
        assert!(record.permanent_items.contains("medkit"));
        assert!(record.pending_permanent_choice.is_none());

        let stats = h.engine.player_stats("u1").unwrap();
        assert!(stats.lines[0].starts_with("Ann: Level 1"));
        assert_eq!(stats.lines.last().unwrap(), "Record: 0W / 0L");
    }

    #[test]
    fn test_transcend_registers_legend() {
        let h = harness(|_| {});
        let config = h.engine.config().clone();
        let mut record = PlayerRecord::new("u1", "Ann", h.clock.now(), &config);
        record.level = config.progression.level_cap;
        record.prestige = config.progression.max_prestige;
        record.xp = 0;
        record.xp_to_next = 0;
        h.store.put_player(record).unwrap();

        let result = h.engine.transcend("u1", "Ann").unwrap();
        assert!(result.success, "{:?}", result.lines);
        assert_eq!(h.engine.legend_ids().unwrap(), vec!["u1".to_string()]);
    }
}
