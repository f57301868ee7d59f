//! Injuries, combat buffs and consumables attached to a player record.

pub mod buffs;
pub mod injury;
pub mod items;

pub use buffs::{BoutKind, BuffKind, CombatBuff, Trigger};
pub use injury::{Injury, InjuryDef, InjuryRoll};
pub use items::ItemKind;
