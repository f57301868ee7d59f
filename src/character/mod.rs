//! Player record and the progression ledger: XP, prestige, transcendence,
//! the hardcore track, challenge paths and energy.

pub mod challenge;
pub mod energy;
pub mod hardcore;
pub mod prestige;
pub mod progression;
pub mod record;

pub use hardcore::{HardcoreOutcome, HardcoreState};
pub use progression::{deduct_xp, grant_xp, XpGrant};
pub use record::PlayerRecord;
