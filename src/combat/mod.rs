//! Combat: the modifier stack, opponent selection and bout settlement.

pub mod logic;
pub mod modifiers;
pub mod opponent;
pub mod types;

pub use logic::{fight_solo, settle_group_share, settle_solo, BoutContext};
pub use modifiers::{resolve, ModifierContext, Resolution};
pub use types::{BoutReport, LegendEntry, MonsterDef, Opponent};
