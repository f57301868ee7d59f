//! Structured results returned by every engine entry point.

use crate::character::record::PlayerRecord;
use crate::core::error::Rejection;
use serde::Serialize;

/// Public-facing snapshot of a player after an action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicStats {
    pub actor_id: String,
    pub display_name: String,
    pub level: u32,
    pub xp: u64,
    pub xp_to_next: u64,
    pub prestige: u32,
    pub transcendence: u32,
    pub energy: u32,
    pub max_energy: u32,
    /// `(hp, max_hp)` while hardcore is active.
    pub hardcore_hp: Option<(u32, u32)>,
    pub wins: u64,
    pub losses: u64,
    pub injuries: Vec<String>,
}

impl PublicStats {
    pub fn from_record(record: &PlayerRecord, max_energy: u32) -> Self {
        Self {
            actor_id: record.actor_id.clone(),
            display_name: record.display_name.clone(),
            level: record.level,
            xp: record.xp,
            xp_to_next: record.xp_to_next,
            prestige: record.prestige,
            transcendence: record.transcendence,
            energy: record.energy,
            max_energy,
            hardcore_hp: record.hardcore.as_ref().map(|hc| (hc.hp, hc.max_hp)),
            wins: record.history.wins,
            losses: record.history.losses,
            injuries: record.injuries.iter().map(|i| i.name.clone()).collect(),
        }
    }
}

/// Outcome of one player action.
///
/// Expected refusals come back with `success == false` and a
/// [`Rejection`]; they are never errors.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub lines: Vec<String>,
    pub stats: Option<PublicStats>,
    #[serde(skip)]
    pub rejection: Option<Rejection>,
}

impl ActionResult {
    pub fn ok(lines: Vec<String>) -> Self {
        Self {
            success: true,
            lines,
            stats: None,
            rejection: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        tracing::debug!(%rejection, "action rejected");
        Self {
            success: false,
            lines: vec![rejection.to_string()],
            stats: None,
            rejection: Some(rejection),
        }
    }

    pub fn with_stats(mut self, stats: PublicStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn line(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }
}
