//! Quest Engine - RPG progression and encounter resolution for chat services
//!
//! The library owns the rules: modifier stacks, the progression ledger,
//! injuries and buffs, solo/group/dungeon bouts and the shared boss hunt.
//! Transport, storage backends and narrative text plug in through the
//! ports in [`core::ports`].

pub mod boss_hunt;
pub mod character;
pub mod combat;
pub mod core;
pub mod dungeon;
pub mod effects;
pub mod engine;
pub mod group;
pub mod scheduler;
pub mod store;

pub use crate::core::config::EngineConfig;
pub use crate::core::error::{EngineError, Rejection, Result};
pub use crate::core::report::{ActionResult, PublicStats};
pub use character::record::PlayerRecord;
pub use engine::{QuestEngine, QuestEngineBuilder};
