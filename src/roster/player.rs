//! Scored roster players: identity, position, health, game context, and the
//! bounded score projection the optimizer consumes. Instances are immutable
//! for a given week; refreshed projections produce new instances.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::dist::TruncatedNormal;

pub const PRIMARY_SLOTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Qb,
    Rb,
    Wr,
    Te,
    K,
    Dst,
}

impl Position {
    pub const ALL: [Position; PRIMARY_SLOTS] = [
        Position::Qb,
        Position::Rb,
        Position::Wr,
        Position::Te,
        Position::K,
        Position::Dst,
    ];

    /// Dense index into per-position arrays (slot counters, affinity tables).
    pub const fn index(self) -> usize {
        match self {
            Self::Qb => 0,
            Self::Rb => 1,
            Self::Wr => 2,
            Self::Te => 3,
            Self::K => 4,
            Self::Dst => 5,
        }
    }

    /// RB/WR/TE may fill the FLEX slot.
    pub const fn flex_eligible(self) -> bool {
        matches!(self, Self::Rb | Self::Wr | Self::Te)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Qb => "QB",
            Self::Rb => "RB",
            Self::Wr => "WR",
            Self::Te => "TE",
            Self::K => "K",
            Self::Dst => "DST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Questionable,
    Doubtful,
    Out,
}

impl HealthStatus {
    /// Out players never enter a lineup; everyone else is startable (their
    /// projections already carry the risk in wider spreads).
    pub const fn startable(self) -> bool {
        !matches!(self, Self::Out)
    }
}

/// The game a player's score comes from. Shared game ids drive the per-game
/// pace factor in the correlation model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub game_id: u32,
    pub home: String,
    pub away: String,
    /// RFC 3339 kickoff timestamp, when known.
    #[serde(default)]
    pub kickoff: Option<String>,
}

impl GameInfo {
    pub fn kickoff_time(&self) -> Option<DateTime<FixedOffset>> {
        self.kickoff
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub position: Position,
    #[serde(default)]
    pub status: HealthStatus,
    pub projection: TruncatedNormal,
    pub game: GameInfo,
}

impl PlayerScore {
    /// Post-truncation expected score.
    pub fn mean(&self) -> f64 {
        self.projection.mean()
    }

    /// Post-truncation score spread.
    pub fn std_dev(&self) -> f64 {
        self.projection.std_dev()
    }

    /// True when this player's team is at home in their game.
    pub fn is_home(&self) -> bool {
        self.game.home == self.team
    }

    /// The opposing team in this player's game.
    pub fn opposing_team(&self) -> &str {
        if self.is_home() {
            &self.game.away
        } else {
            &self.game.home
        }
    }
}
