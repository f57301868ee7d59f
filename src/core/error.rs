//! Error types for the engine.
//!
//! [`EngineError`] is for failures the caller cannot fix by retrying the
//! same action (store down, poisoned lock, bad config). Expected refusals
//! such as cooldowns travel as a [`Rejection`] inside an
//! [`ActionResult`](crate::core::report::ActionResult).

use thiserror::Error;

/// Fatal errors for a single action.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine lock was poisoned")]
    LockPoisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("snapshot checksum verification failed")]
    ChecksumMismatch,

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for EngineError {
    fn from(err: bincode::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// An action the rules refuse. Surfaced to the player, never logged as an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("you are still recovering ({remaining_secs}s left)")]
    Cooldown { remaining_secs: i64 },

    #[error("you need {needed} energy but have {have}")]
    InsufficientEnergy { needed: u32, have: u32 },

    #[error("not while {0}")]
    ModeConflict(&'static str),

    #[error("an encounter is already gathering in this channel")]
    WindowAlreadyOpen,

    #[error("there is no encounter to join in this channel")]
    NoOpenWindow,

    #[error("you have already joined this encounter")]
    AlreadyJoined,

    #[error("the encounter is no longer accepting fighters")]
    WindowExpired,

    #[error("you are already inside the dungeon")]
    RunAlreadyActive,

    #[error("you have no active dungeon run")]
    NoActiveRun,

    #[error("you can only do that at a safe haven")]
    NotAtSafeHaven,

    #[error("not eligible: {0}")]
    NotEligible(String),

    #[error("unknown item: {0}")]
    UnknownItem(String),

    #[error("you have no {0}")]
    NoItem(String),

    #[error("your energy is already full")]
    EnergyFull,

    #[error("you have no injuries to heal")]
    NothingToHeal,

    #[error("{0} is already active")]
    AlreadyActive(String),

    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("unknown ability: {0}")]
    UnknownAbility(String),

    #[error("you have not unlocked {0}")]
    AbilityLocked(String),

    #[error("{ability} is recharging ({remaining_secs}s left)")]
    AbilityCooldown { ability: String, remaining_secs: i64 },

    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    #[error("the engine is busy, try again")]
    Busy,
}
