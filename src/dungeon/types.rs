//! Dungeon data: the fixed room sequence, counter items and run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counter item keys and display names.
pub const COUNTER_ITEMS: [(&str, &str); 8] = [
    ("ember_lantern", "Ember Lantern"),
    ("tempest_charm", "Tempest Charm"),
    ("spiral_shell", "Spiral Siren-Shell"),
    ("venom_salve", "Venomveil Salve"),
    ("gravity_boots", "Gravity Boots"),
    ("mirror_loom", "Mirrorloom Veil"),
    ("gearstone", "Gearstone Glyph"),
    ("abyssal_sigil", "Abyssal Sigil"),
];

/// Display name for a counter item key. Unknown keys are returned as-is.
pub fn counter_item_name(key: &str) -> &str {
    COUNTER_ITEMS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, name)| *name)
        .unwrap_or(key)
}

pub fn is_counter_item(key: &str) -> bool {
    COUNTER_ITEMS.iter().any(|(k, _)| *k == key)
}

/// One room of the dungeon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomDef {
    pub id: &'static str,
    pub name: &'static str,
    /// Guardian monster.
    pub guardian: &'static str,
    /// Added to the player's level for the guardian's level.
    pub level_offset: i32,
    pub win_adjust: f64,
    pub xp: u64,
    /// Items that let the player skip the room, in preference order.
    pub counters: &'static [&'static str],
    pub intro: &'static str,
    pub bypass_text: &'static str,
}

impl RoomDef {
    /// Guardian level for a player at `player_level`, at least 1.
    pub fn guardian_level(&self, player_level: u32) -> u32 {
        (player_level as i64 + self.level_offset as i64).max(1) as u32
    }
}

/// Rooms in order, easiest first.
pub const ROOMS: [RoomDef; 10] = [
    RoomDef {
        id: "mirror_gallery",
        name: "Mirror Gallery",
        guardian: "Glass Doppel",
        level_offset: 1,
        win_adjust: 0.0,
        xp: 110,
        counters: &["mirror_loom"],
        intro: "Mirrors bloom from the walls, each reflection stepping forward with a hungry grin.",
        bypass_text: "The Mirrorloom Veil ripples and the impostors collapse back into glass.",
    },
    RoomDef {
        id: "tilting_causeway",
        name: "Tilting Causeway",
        guardian: "Abyssal Skitterer",
        level_offset: 1,
        win_adjust: -0.02,
        xp: 115,
        counters: &["gravity_boots"],
        intro: "Floor plates pivot and yaw over an endless drop.",
        bypass_text: "Your Gravity Boots lock onto the stone until the shifting slows.",
    },
    RoomDef {
        id: "storm_bridge",
        name: "Storm Bridge",
        guardian: "Thunderbound Sentinel",
        level_offset: 2,
        win_adjust: -0.03,
        xp: 130,
        counters: &["tempest_charm"],
        intro: "A suspended bridge crackles with wild lightning.",
        bypass_text: "The Tempest Charm drinks the storm and the winds bow aside.",
    },
    RoomDef {
        id: "shadow_antechamber",
        name: "Shadow Antechamber",
        guardian: "Gloom Siphon",
        level_offset: 1,
        win_adjust: -0.05,
        xp: 120,
        counters: &["ember_lantern"],
        intro: "A tenebrous hallway swallows torchlight as whispers coil around you.",
        bypass_text: "Your Ember Lantern flares and hidden glyphs reveal a safe path.",
    },
    RoomDef {
        id: "crystal_singularity",
        name: "Crystal Singularity",
        guardian: "Shardstorm Elemental",
        level_offset: 2,
        win_adjust: -0.05,
        xp: 150,
        counters: &["tempest_charm"],
        intro: "Floating shards spin, screaming with psionic static.",
        bypass_text: "The Tempest Charm hums until the shards drift aside.",
    },
    RoomDef {
        id: "scarlet_greenhouse",
        name: "Scarlet Greenhouse",
        guardian: "Spore Matriarch",
        level_offset: 2,
        win_adjust: -0.06,
        xp: 150,
        counters: &["venom_salve"],
        intro: "Thick mist rolls over fungal beds pulsing with hunger.",
        bypass_text: "A layer of Venomveil Salve seals your lungs and the spores fade.",
    },
    RoomDef {
        id: "clockwork_vault",
        name: "Clockwork Vault",
        guardian: "Colossal Gear-Guard",
        level_offset: 3,
        win_adjust: -0.07,
        xp: 170,
        counters: &["gearstone"],
        intro: "Interlocking gears rotate the walls into deadly configurations.",
        bypass_text: "The Gearstone Glyph slots into a socket and the mechanisms freeze.",
    },
    RoomDef {
        id: "venom_garden",
        name: "Venom Garden",
        guardian: "Bloom Tyrant",
        level_offset: 2,
        win_adjust: -0.08,
        xp: 140,
        counters: &["venom_salve"],
        intro: "Carnivorous blooms hiss, spraying arcs of glittering toxin.",
        bypass_text: "The toxins bead harmlessly on your salved armor and you slip past.",
    },
    RoomDef {
        id: "echo_archive",
        name: "Echo Archive",
        guardian: "Mnemonic Lich",
        level_offset: 3,
        win_adjust: -0.10,
        xp: 160,
        counters: &["spiral_shell"],
        intro: "A vaulted archive hums with looping echoes.",
        bypass_text: "The Spiral Siren-Shell thrums counterpoint and the echoes untangle.",
    },
    RoomDef {
        id: "heart_of_the_abyss",
        name: "Heart of the Abyss",
        guardian: "Voidbound Sovereign",
        level_offset: 4,
        win_adjust: -0.12,
        xp: 250,
        counters: &["abyssal_sigil", "ember_lantern"],
        intro: "An ancient throne pulses with voidlight. The dungeon's architect unfurls its wings.",
        bypass_text: "The throne's light gutters out and the Sovereign kneels.",
    },
];

pub const ROOM_COUNT: usize = ROOMS.len();

/// How a run treats safe havens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DungeonMode {
    /// Pause at every safe haven.
    Step,
    /// Run every room without stopping.
    Nonstop,
}

impl DungeonMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "step" | "" => Some(DungeonMode::Step),
            "nonstop" | "non-stop" => Some(DungeonMode::Nonstop),
            _ => None,
        }
    }
}

impl fmt::Display for DungeonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DungeonMode::Step => f.write_str("step"),
            DungeonMode::Nonstop => f.write_str("nonstop"),
        }
    }
}

/// A live run. At most one per player, stored under `dungeon:<actor>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DungeonRun {
    pub actor_id: String,
    pub channel: String,
    pub mode: DungeonMode,
    /// Index into [`ROOMS`] of the next room to enter.
    pub next_room: usize,
    pub rooms_cleared: usize,
    /// Rooms resolved by combat rather than a counter item.
    pub rooms_fought: usize,
    pub xp_accumulated: u64,
    pub at_safe_haven: bool,
    pub started_at: DateTime<Utc>,
}

impl DungeonRun {
    pub fn new(actor_id: &str, channel: &str, mode: DungeonMode, now: DateTime<Utc>) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            channel: channel.to_string(),
            mode,
            next_room: 0,
            rooms_cleared: 0,
            rooms_fought: 0,
            xp_accumulated: 0,
            at_safe_haven: false,
            started_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.next_room >= ROOM_COUNT
    }
}

/// What happened in one room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutcome {
    Bypassed { room: usize, item: String },
    Won { room: usize, xp: u64 },
    Lost { room: usize, xp_lost: u64 },
}

/// Where a run stands after the engine stops advancing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Resting after `after_room` (1-based), waiting for continue or quit.
    SafeHaven { after_room: usize },
    Completed,
    /// Lost in `room` (1-based).
    Failed { room: usize },
}

/// Result of advancing a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Advance {
    pub status: RunStatus,
    pub rooms: Vec<RoomOutcome>,
    pub lines: Vec<String>,
}
