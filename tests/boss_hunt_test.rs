//! Integration test: Boss hunt through the engine
//!
//! A solo win that finds a clue lands the killing blow on a haunting boss.
//! Verifies the realm buff, the haunting window and its timer, the channel
//! announcement, and the respawn once the haunting window has passed.

use chrono::{Duration, TimeZone, Utc};
use quest_engine::core::ports::{ManualClock, MemorySink, RecordStoreExt};
use quest_engine::scheduler::{ManualScheduler, BOSS_HUNT_HAUNTING_TAG};
use quest_engine::store::MemoryStore;
use quest_engine::{EngineConfig, QuestEngine, Rejection};
use std::sync::Arc;

struct World {
    engine: QuestEngine,
    store: Arc<MemoryStore>,
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    sink: Arc<MemorySink>,
}

fn world() -> World {
    let mut config = EngineConfig::default();
    config.rng_seed = Some(21);
    config.combat.min_win_chance = 1.0;
    config.combat.max_win_chance = 1.0;
    config.combat.monster_spawn_chance = 1.0;
    config.combat.boss_encounter_chance = 0.0;
    config.boss_hunt.clue_drop_chance = 1.0;
    config.boss_hunt.damage_per_clue = 10_000;
    let start = Utc.with_ymd_and_hms(2024, 9, 1, 20, 0, 0).unwrap();
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
    World {
        engine,
        store,
        clock,
        scheduler,
        sink,
    }
}

#[test]
fn test_killing_blow_starts_haunting_then_respawns() {
    let w = world();
    let spawned = w.engine.admin_boss_spawn(Some("lucky_luciano")).unwrap();
    assert!(spawned.success);
    assert!(spawned.lines[0].starts_with("Lucky Luciano appears!"));

    let result = w.engine.resolve_solo("p", "Pia", "#streets", "normal").unwrap();
    assert!(result.success, "{:?}", result.lines);
    assert!(result.lines.iter().any(|l| l.contains("HAS BEEN TAKEN DOWN")));
    assert_eq!(w.engine.player("p").unwrap().unwrap().history.boss_clues, 1);

    let state = w.engine.boss_state().unwrap();
    assert!(state.boss.is_none());
    assert!(state.buff.is_some());
    let haunting = state.haunting.expect("haunting boss leaves a haunting window");
    assert_eq!(haunting.boss_id, "lucky_luciano");
    assert_eq!(
        w.scheduler.next_due(BOSS_HUNT_HAUNTING_TAG).unwrap(),
        Some(haunting.until)
    );
    assert!(w
        .sink
        .channel_messages("#streets")
        .iter()
        .any(|l| l.contains("HAS BEEN TAKEN DOWN")));
    let stored = w.store.get_boss_hunt().unwrap().unwrap();
    assert_eq!(stored.stats.bosses_defeated, 1);

    let status = w.engine.boss_status().unwrap();
    assert!(status.lines[0].contains("still haunts"));

    let later = haunting.until + Duration::minutes(1);
    w.clock.set(later);
    w.scheduler.run_due(later).unwrap();
    let stored = w.store.get_boss_hunt().unwrap().unwrap();
    let boss = stored.boss.expect("a new boss after the haunting");
    assert_ne!(boss.id, "lucky_luciano");
    assert!(stored.haunting.is_none());
    assert!(stored.buff.is_some());
}

#[test]
fn test_forced_spawn_ends_haunting_timer() {
    let w = world();
    w.engine.admin_boss_spawn(Some("lucky_luciano")).unwrap();
    w.engine.resolve_solo("p", "Pia", "#streets", "normal").unwrap();
    assert!(w.scheduler.tags().unwrap().contains(&BOSS_HUNT_HAUNTING_TAG.to_string()));

    let respawn = w.engine.admin_boss_spawn(Some("big_tony")).unwrap();
    assert!(respawn.success);
    assert!(!w.scheduler.tags().unwrap().contains(&BOSS_HUNT_HAUNTING_TAG.to_string()));
    let state = w.engine.boss_state().unwrap();
    assert!(state.haunting.is_none());
    assert_eq!(state.boss.unwrap().id, "big_tony");

    let unknown = w.engine.admin_boss_spawn(Some("nobody")).unwrap();
    assert!(matches!(unknown.rejection, Some(Rejection::InvalidChoice(_))));
}

#[test]
fn test_admin_buff_toggles() {
    let w = world();
    let on = w.engine.admin_boss_buff(true).unwrap();
    assert!(on.lines[0].starts_with("Boss buff active until"));
    assert!(w.store.get_boss_hunt().unwrap().unwrap().buff.is_some());
    assert!(w
        .engine
        .boss_status()
        .unwrap()
        .lines
        .iter()
        .any(|l| l.starts_with("BUFF ACTIVE")));

    let off = w.engine.admin_boss_buff(false).unwrap();
    assert_eq!(off.lines, vec!["Boss buff cleared.".to_string()]);
    assert!(w.engine.boss_state().unwrap().buff.is_none());
}
