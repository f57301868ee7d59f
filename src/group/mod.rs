//! Group encounters: one join window per channel, resolved exactly once.

pub mod coordinator;
pub mod logic;
pub mod types;

pub use coordinator::GroupCoordinator;
pub use logic::{join_window, open_window, resolve_window, take_for_close};
pub use types::{GroupEncounter, GroupResolution, Participant, WindowState};
