//! Group window data.

use crate::combat::types::Opponent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowState {
    /// Accepting joins until the deadline.
    Open,
    /// Being closed. Joins and further closes are refused.
    Resolving,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub actor_id: String,
    pub display_name: String,
}

/// One group window. At most one per channel, stored under `group:<channel>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEncounter {
    pub id: Uuid,
    pub channel: String,
    pub initiator: String,
    pub opponent: Opponent,
    pub opened_at: DateTime<Utc>,
    pub open_until: DateTime<Utc>,
    /// In join order. The initiator is always first.
    pub participants: Vec<Participant>,
    pub state: WindowState,
}

impl GroupEncounter {
    pub fn new(
        channel: &str,
        initiator: Participant,
        opponent: Opponent,
        now: DateTime<Utc>,
        open_until: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            initiator: initiator.actor_id.clone(),
            opponent,
            opened_at: now,
            open_until,
            participants: vec![initiator],
            state: WindowState::Open,
        }
    }

    pub fn has_joined(&self, actor_id: &str) -> bool {
        self.participants.iter().any(|p| p.actor_id == actor_id)
    }

    pub fn is_open(&self) -> bool {
        self.state == WindowState::Open
    }

    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now > self.open_until
    }

    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.actor_id.as_str())
    }
}

/// The single shared result of a closed window.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupResolution {
    pub window_id: Uuid,
    pub opponent: Opponent,
    pub won: bool,
    pub win_chance: f64,
    pub average_level: f64,
    /// Total XP before the split.
    pub pool: f64,
    /// Each participant's slice, before personal multipliers.
    pub share: f64,
    pub lines: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window() -> GroupEncounter {
        let now = Utc::now();
        let opponent = Opponent {
            name: "Orc Warband".into(),
            level: 13,
            notable: false,
            boss: false,
            legend_of: None,
            xp_min: 30,
            xp_max: 45,
        };
        GroupEncounter::new(
            "#quest",
            Participant {
                actor_id: "u1".into(),
                display_name: "Hero".into(),
            },
            opponent,
            now,
            now + Duration::seconds(60),
        )
    }

    #[test]
    fn test_new_window_enrolls_initiator() {
        let w = window();
        assert!(w.is_open());
        assert!(w.has_joined("u1"));
        assert!(!w.has_joined("u2"));
        assert_eq!(w.participant_ids().collect::<Vec<_>>(), vec!["u1"]);
    }

    #[test]
    fn test_deadline() {
        let w = window();
        assert!(!w.deadline_passed(w.open_until));
        assert!(w.deadline_passed(w.open_until + Duration::seconds(1)));
    }
}
