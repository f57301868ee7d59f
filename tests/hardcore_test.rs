//! Integration test: Hardcore track through the engine
//!
//! A capped player enters hardcore with items in the bag, wins three bouts,
//! then keeps losing until HP runs out. Death must reset the record and
//! hand back exactly the items that were locked away. The win and loss
//! phases run on two engines sharing one store, the way a restart would.

use chrono::{Duration, TimeZone, Utc};
use quest_engine::character::progression;
use quest_engine::core::ports::{Clock, ManualClock, RecordStoreExt};
use quest_engine::scheduler::ManualScheduler;
use quest_engine::store::MemoryStore;
use quest_engine::{EngineConfig, PlayerRecord, QuestEngine, Rejection};
use std::sync::Arc;

/// Config whose solo bouts always end the same way.
fn pinned(odds: f64) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.rng_seed = Some(11);
    config.combat.min_win_chance = odds;
    config.combat.max_win_chance = odds;
    config.combat.monster_spawn_chance = 1.0;
    config.combat.boss_encounter_chance = 0.0;
    config.drops.win_chance = 0.0;
    config.drops.loss_chance = 0.0;
    config
}

fn engine(config: EngineConfig, store: &Arc<MemoryStore>, clock: &Arc<ManualClock>) -> QuestEngine {
    QuestEngine::builder(config)
        .store(store.clone())
        .clock(clock.clone())
        .scheduler(Arc::new(ManualScheduler::new(clock.now())))
        .build()
        .unwrap()
}

/// Tops energy back up so the scenario is not cut short by fatigue.
fn refill(store: &MemoryStore) {
    let mut record = store.get_player("hc").unwrap().unwrap();
    record.energy = 10;
    store.put_player(record).unwrap();
}

#[test]
fn test_hardcore_wins_then_death_restores_everything() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    ));

    let config = pinned(1.0);
    let mut record = PlayerRecord::new("hc", "Vera", clock.now(), &config);
    progression::reset_to_level(&mut record, config.progression.level_cap, &config);
    record.add_item("medkit", 2);
    record.add_item("lucky_charm", 1);
    let bag = record.inventory.clone();
    store.put_player(record).unwrap();

    // Phase 1: three wins.
    let winner = engine(config, &store, &clock);
    let entered = winner.enter_hardcore("hc", "Vera").unwrap();
    assert!(entered.success, "{:?}", entered.lines);
    let record = winner.player("hc").unwrap().unwrap();
    assert!(record.inventory.is_empty());
    assert_eq!(record.locker, bag);
    assert_eq!(record.hardcore.as_ref().unwrap().hp, 500);

    for _ in 0..3 {
        clock.advance(Duration::minutes(6));
        let result = winner.resolve_solo("hc", "Vera", "#arena", "normal").unwrap();
        assert!(result.success, "{:?}", result.lines);
        let record = winner.player("hc").unwrap().unwrap();
        let hc = record.hardcore.as_ref().expect("still on the track");
        assert!(hc.hp > 0 && hc.hp <= hc.max_hp);
    }
    assert_eq!(winner.player("hc").unwrap().unwrap().history.wins, 3);
    drop(winner);

    // Phase 2: losses until death.
    let loser = engine(pinned(0.0), &store, &clock);
    let mut bouts = 0;
    while loser.player("hc").unwrap().unwrap().is_hardcore() {
        assert!(bouts < 40, "hardcore run never ended");
        refill(&store);
        clock.advance(Duration::minutes(6));
        let result = loser.resolve_solo("hc", "Vera", "#arena", "normal").unwrap();
        assert!(result.success, "{:?}", result.lines);
        if let Some(hc) = loser.player("hc").unwrap().unwrap().hardcore {
            assert!(hc.hp <= hc.max_hp);
        }
        bouts += 1;
    }

    let record = loser.player("hc").unwrap().unwrap();
    assert_eq!(record.level, 1);
    assert_eq!(record.prestige, 0);
    assert_eq!(record.inventory, bag);
    assert!(record.locker.is_empty());
    assert_eq!(record.history.hardcore_deaths, 1);
    assert_eq!(record.history.wins, 3);
}

#[test]
fn test_win_at_level_49_completes_the_track() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap(),
    ));
    let config = pinned(1.0);
    let mut record = PlayerRecord::new("hc", "Vera", clock.now(), &config);
    progression::reset_to_level(&mut record, config.progression.level_cap, &config);
    record.add_item("medkit", 2);
    let bag = record.inventory.clone();
    store.put_player(record).unwrap();

    let engine = engine(config.clone(), &store, &clock);
    assert!(engine.enter_hardcore("hc", "Vera").unwrap().success);
    let mut record = store.get_player("hc").unwrap().unwrap();
    progression::reset_to_level(&mut record, config.progression.hardcore_level_cap - 1, &config);
    record.xp = record.xp_to_next - 1;
    store.put_player(record).unwrap();

    clock.advance(Duration::minutes(6));
    let result = engine.resolve_solo("hc", "Vera", "#arena", "normal").unwrap();
    assert!(result.success, "{:?}", result.lines);
    assert!(result.lines.iter().any(|l| l.contains("HARDCORE COMPLETE")));

    let record = engine.player("hc").unwrap().unwrap();
    assert!(!record.is_hardcore());
    assert_eq!(record.history.hardcore_completions, 1);
    assert_eq!(record.prestige, 1);
    assert_eq!(record.level, 1);
    assert_eq!(record.inventory, bag);
    assert!(record.locker.is_empty());
    let pick = record.pending_permanent_choice.expect("permanent pick offered");
    assert!(pick.contains("medkit"));
}

#[test]
fn test_hardcore_entry_rules() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = engine(pinned(0.5), &store, &clock);

    let low = engine.enter_hardcore("rookie", "Rookie").unwrap();
    assert!(matches!(low.rejection, Some(Rejection::NotEligible(_))));
    assert!(!engine.player("rookie").unwrap().is_some_and(|r| r.is_hardcore()));

    let config = engine.config().clone();
    let mut record = PlayerRecord::new("vet", "Vet", clock.now(), &config);
    progression::reset_to_level(&mut record, config.progression.level_cap, &config);
    store.put_player(record).unwrap();

    assert!(engine.enter_hardcore("vet", "Vet").unwrap().success);
    let again = engine.enter_hardcore("vet", "Vet").unwrap();
    assert!(matches!(again.rejection, Some(Rejection::AlreadyActive(_))));

    let dungeon = engine.enter_dungeon("vet", "Vet", "#arena", "step").unwrap();
    assert!(matches!(dungeon.rejection, Some(Rejection::ModeConflict(_))));

    let quit = engine.hardcore_quit("vet", "Vet").unwrap();
    assert!(quit.success);
    let record = engine.player("vet").unwrap().unwrap();
    assert!(!record.is_hardcore());
    assert_eq!(record.level, config.progression.level_cap);
}
