//! Quest Engine Headless Balance Simulator
//!
//! Drives a population of simulated players through the real engine entry
//! points against an in-memory store, a manual clock and a manual scheduler,
//! then prints a balance summary.
//!
//! Usage:
//!   cargo run --bin simulator -- [OPTIONS]
//!
//! Options:
//!   --players N     Simulated players (default: 8)
//!   --hours N       Hours of game time (default: 72)
//!   --seed N        RNG seed (default: 42)
//!   --verbose       Print every action's output
//!   --quiet         Only the final summary line

use chrono::{DateTime, Duration, TimeZone, Utc};
use quest_engine::core::ports::{Clock, ManualClock, NotificationSink, Target};
use quest_engine::scheduler::ManualScheduler;
use quest_engine::store::MemoryStore;
use quest_engine::{ActionResult, EngineConfig, QuestEngine, Rejection};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const CHANNEL: &str = "#sim";
const STEP_MINUTES: i64 = 5;

// ── CLI Configuration ────────────────────────────────────────────────

struct SimConfig {
    players: usize,
    hours: u64,
    seed: u64,
    verbose: bool,
    quiet: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            players: 8,
            hours: 72,
            seed: 42,
            verbose: false,
            quiet: false,
        }
    }
}

fn parse_args() -> SimConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = SimConfig::default();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--players" => {
                i += 1;
                config.players = args[i].parse().expect("--players requires a number");
            }
            "--hours" => {
                i += 1;
                config.hours = args[i].parse().expect("--hours requires a number");
            }
            "--seed" => {
                i += 1;
                config.seed = args[i].parse().expect("--seed requires a number");
            }
            "--verbose" => config.verbose = true,
            "--quiet" => config.quiet = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }
    config
}

fn print_usage() {
    eprintln!(
        "Quest Engine Balance Simulator\n\
         \n\
         Usage: simulator [OPTIONS]\n\
         \n\
         Options:\n\
         \x20 --players N     Simulated players (default: 8)\n\
         \x20 --hours N       Hours of game time (default: 72)\n\
         \x20 --seed N        RNG seed (default: 42)\n\
         \x20 --verbose       Print every action's output\n\
         \x20 --quiet         Only the final summary line\n\
         \x20 --help, -h      Show this help"
    );
}

// ── Notifications ────────────────────────────────────────────────────

/// Counts channel announcements instead of delivering them.
#[derive(Default)]
struct CountingSink {
    announcements: AtomicU64,
}

impl NotificationSink for CountingSink {
    fn emit(&self, target: Target, message: String) {
        self.announcements.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(?target, "{message}");
    }
}

// ── Simulation Statistics ────────────────────────────────────────────

#[derive(Debug, Default)]
struct SimStats {
    actions: u64,
    solos: u64,
    groups_opened: u64,
    group_joins: u64,
    dungeon_entries: u64,
    prestiges: u64,
    transcends: u64,
    items_used: u64,
    searches: u64,
    rejections: BTreeMap<String, u64>,
}

impl SimStats {
    fn record(&mut self, result: &ActionResult) {
        self.actions += 1;
        if let Some(rejection) = &result.rejection {
            *self.rejections.entry(rejection_kind(rejection)).or_insert(0) += 1;
        }
    }
}

/// Variant name without its payload.
fn rejection_kind(rejection: &Rejection) -> String {
    let debug = format!("{rejection:?}");
    debug
        .split(|c: char| c == '(' || c == ' ' || c == '{')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ── Core Simulation Loop ─────────────────────────────────────────────

struct Sim {
    engine: QuestEngine,
    clock: Arc<ManualClock>,
    scheduler: Arc<ManualScheduler>,
    sink: Arc<CountingSink>,
    rng: StdRng,
    ids: Vec<String>,
    verbose: bool,
    stats: SimStats,
}

impl Sim {
    fn new(config: &SimConfig) -> quest_engine::Result<Self> {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default();
        let clock = Arc::new(ManualClock::new(start));
        let scheduler = Arc::new(ManualScheduler::new(start));
        let sink = Arc::new(CountingSink::default());

        let mut engine_config = EngineConfig::default();
        engine_config.rng_seed = Some(config.seed);
        let engine = QuestEngine::builder(engine_config)
            .store(Arc::new(MemoryStore::new()))
            .clock(clock.clone())
            .scheduler(scheduler.clone())
            .notifications(sink.clone())
            .build()?;

        Ok(Self {
            engine,
            clock,
            scheduler,
            sink,
            rng: StdRng::seed_from_u64(config.seed),
            ids: (0..config.players).map(|i| format!("sim{i:02}")).collect(),
            verbose: config.verbose,
            stats: SimStats::default(),
        })
    }

    fn log(&mut self, actor: &str, action: &str, result: ActionResult) {
        if self.verbose {
            for line in &result.lines {
                println!("[{}] {actor} {action}: {line}", self.clock_label());
            }
        }
        self.stats.record(&result);
    }

    fn clock_label(&self) -> String {
        self.clock.now().format("%d %H:%M").to_string()
    }

    fn step(&mut self) -> quest_engine::Result<()> {
        self.clock.advance(Duration::minutes(STEP_MINUTES));
        self.scheduler.run_due(self.now())?;

        if !self.ids.is_empty()
            && self.engine.group_window(CHANNEL)?.is_none()
            && self.rng.gen_bool(0.03)
        {
            let idx = self.rng.gen_range(0..self.ids.len());
            let id = self.ids[idx].clone();
            let result = self.engine.open_group(&id, &id, CHANNEL)?;
            if result.success {
                self.stats.groups_opened += 1;
            }
            self.log(&id, "opens a group", result);
        }

        for idx in 0..self.ids.len() {
            let id = self.ids[idx].clone();
            self.act(&id)?;
        }
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// One decision for one player.
    fn act(&mut self, id: &str) -> quest_engine::Result<()> {
        let Some(record) = self.engine.player(id)? else {
            let result = self.engine.resolve_solo(id, id, CHANNEL, "normal")?;
            self.stats.solos += 1;
            self.log(id, "fights", result);
            return Ok(());
        };
        let cap = record.level_cap(self.engine.config());
        let max_prestige = self.engine.config().progression.max_prestige;

        if !record.is_hardcore() && record.level >= cap {
            let result = if record.prestige < max_prestige {
                self.stats.prestiges += 1;
                self.engine.prestige(id, id, None)?
            } else {
                self.stats.transcends += 1;
                self.engine.transcend(id, id)?
            };
            self.log(id, "ascends", result);
            return Ok(());
        }

        if !record.injuries.is_empty() && record.item_count("medkit") > 0 {
            self.stats.items_used += 1;
            let result = self.engine.use_item(id, id, "medkit")?;
            self.log(id, "uses a medkit", result);
            return Ok(());
        }

        if let Some(window) = self.engine.group_window(CHANNEL)? {
            if !window.has_joined(id) && self.rng.gen_bool(0.5) {
                let result = self.engine.join_group(id, id, CHANNEL)?;
                if result.success {
                    self.stats.group_joins += 1;
                }
                self.log(id, "joins", result);
                return Ok(());
            }
        }

        if self.engine.dungeon_run(id)?.is_none() && self.rng.gen_bool(0.02) {
            let equip = self.engine.equip_dungeon(id, id)?;
            self.log(id, "equips", equip);
            let result = self.engine.enter_dungeon(id, id, CHANNEL, "nonstop")?;
            if result.success {
                self.stats.dungeon_entries += 1;
            }
            self.log(id, "enters the dungeon", result);
            return Ok(());
        }

        if record.energy <= 1 {
            return Ok(());
        }
        if record.injuries.is_empty() && record.energy >= 6 && self.rng.gen_bool(0.05) {
            self.stats.searches += 1;
            let result = self.engine.search(id, id, 1)?;
            self.log(id, "searches", result);
            return Ok(());
        }

        let difficulty = match self.rng.gen_range(0..10) {
            0..=1 => "easy",
            2..=7 => "normal",
            _ => "hard",
        };
        let result = self.engine.resolve_solo(id, id, CHANNEL, difficulty)?;
        if result.success {
            self.stats.solos += 1;
        }
        self.log(id, "fights", result);
        Ok(())
    }
}

// ── Reporting ────────────────────────────────────────────────────────

fn print_summary(sim: &Sim, config: &SimConfig) -> quest_engine::Result<()> {
    let mut levels = Vec::new();
    let mut wins = 0;
    let mut losses = 0;
    let mut dungeons = (0, 0);
    let mut prestige_total = 0;
    for id in &sim.ids {
        if let Some(record) = sim.engine.player(id)? {
            levels.push((id.clone(), record.level, record.prestige, record.transcendence));
            wins += record.history.wins;
            losses += record.history.losses;
            dungeons.0 += record.history.dungeons_completed;
            dungeons.1 += record.history.dungeons_failed;
            prestige_total += record.prestige;
        }
    }
    let boss = sim.engine.boss_state()?;
    let fights = (wins + losses).max(1);

    if config.quiet {
        println!(
            "players={} hours={} seed={} win_rate={:.3} avg_prestige={:.2} bosses={} dungeons={}/{}",
            config.players,
            config.hours,
            config.seed,
            wins as f64 / fights as f64,
            prestige_total as f64 / levels.len().max(1) as f64,
            boss.stats.bosses_defeated,
            dungeons.0,
            dungeons.0 + dungeons.1,
        );
        return Ok(());
    }

    let s = &sim.stats;
    println!("=== Simulation Summary ===");
    println!(
        "Players: {}  Hours: {}  Seed: {}",
        config.players, config.hours, config.seed
    );
    println!("Actions: {}  Announcements: {}", s.actions, sim.sink.announcements.load(Ordering::Relaxed));
    println!(
        "Solo bouts: {}  Win rate: {:.1}% ({wins}W / {losses}L)",
        s.solos,
        wins as f64 * 100.0 / fights as f64
    );
    println!("Groups opened: {}  Joins: {}", s.groups_opened, s.group_joins);
    println!(
        "Dungeon runs: {}  Completed: {}  Failed: {}",
        s.dungeon_entries, dungeons.0, dungeons.1
    );
    println!(
        "Prestiges: {}  Transcends: {}  Items used: {}  Searches: {}",
        s.prestiges, s.transcends, s.items_used, s.searches
    );
    println!(
        "Boss hunt: {} defeated, {} clues",
        boss.stats.bosses_defeated, boss.stats.clues_found
    );
    if !s.rejections.is_empty() {
        println!("Rejections:");
        for (kind, count) in &s.rejections {
            println!("  {kind:<20} {count}");
        }
    }
    println!("Final standings:");
    for (id, level, prestige, transcendence) in &levels {
        println!("  {id}  L{level:<3} P{prestige:<3} T{transcendence}");
    }
    Ok(())
}

fn run(config: &SimConfig) -> quest_engine::Result<()> {
    let mut sim = Sim::new(config)?;
    let steps = config.hours * 60 / STEP_MINUTES as u64;
    for _ in 0..steps {
        sim.step()?;
    }
    sim.engine.flush()?;
    print_summary(&sim, config)
}

fn main() {
    let config = parse_args();
    let default_level = if config.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(&config) {
        eprintln!("simulation failed: {err}");
        std::process::exit(1);
    }
}
