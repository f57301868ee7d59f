//! Realm-wide boss hunt: winning solo bouts chip away at a shared boss.
//!
//! A defeat opens a buff window for everyone. Some bosses leave a haunting
//! window behind before the next one spawns.

pub mod logic;
pub mod types;

pub use logic::{hp_bar, load_pool, BossHunt, DefeatHandler};
pub use types::{BossBuff, BossDef, BossHuntState, BossInstance, Contribution, DefeatEvent, Haunting};
