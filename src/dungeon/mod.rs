//! The Tenfold Depths: ten fixed rooms, counter items and safe havens.

pub mod logic;
pub mod types;

pub use logic::{advance, continue_run, enter, equip, quit, quit_reward};
pub use types::{
    Advance, DungeonMode, DungeonRun, RoomDef, RoomOutcome, RunStatus, COUNTER_ITEMS, ROOMS,
    ROOM_COUNT,
};
