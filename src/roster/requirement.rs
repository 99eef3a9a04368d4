//! League lineup format: fixed counts per primary position plus a FLEX slot,
//! and the DP slot-occupancy state built on top of it. States are encoded as
//! a flattened mixed-radix integer so candidate lists index directly into a
//! dense array instead of hashing composite keys.

use serde::{Deserialize, Serialize};

use crate::roster::player::{Position, PRIMARY_SLOTS};

/// Static per-league lineup format. Not mutated at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRequirement {
    pub qb: u8,
    pub rb: u8,
    pub wr: u8,
    pub te: u8,
    pub k: u8,
    pub dst: u8,
    pub flex: u8,
    #[serde(default)]
    pub bench: u8,
}

impl Default for RosterRequirement {
    /// Common single-QB format: QB, 2 RB, 2 WR, TE, FLEX, K, DST.
    fn default() -> Self {
        Self {
            qb: 1,
            rb: 2,
            wr: 2,
            te: 1,
            k: 1,
            dst: 1,
            flex: 1,
            bench: 6,
        }
    }
}

impl RosterRequirement {
    /// Primary-slot counts indexed by [Position::index].
    pub fn primary_counts(&self) -> [u8; PRIMARY_SLOTS] {
        [self.qb, self.rb, self.wr, self.te, self.k, self.dst]
    }

    pub fn primary_count(&self, position: Position) -> u8 {
        self.primary_counts()[position.index()]
    }

    /// Total starters: sum of primary counts plus FLEX.
    pub fn starters(&self) -> usize {
        self.primary_counts().iter().map(|&c| c as usize).sum::<usize>() + self.flex as usize
    }

    /// Number of distinct DP states: product of (count + 1) over every slot
    /// including FLEX.
    pub fn state_count(&self) -> usize {
        self.primary_counts()
            .iter()
            .map(|&c| c as usize + 1)
            .product::<usize>()
            * (self.flex as usize + 1)
    }

    /// Index of the fully-filled terminal state.
    pub fn terminal_state(&self) -> LineupState {
        LineupState {
            filled: self.primary_counts(),
            flex: self.flex,
        }
    }
}

/// Counts-so-far per primary slot plus the FLEX fill count. No component may
/// exceed its requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineupState {
    pub filled: [u8; PRIMARY_SLOTS],
    pub flex: u8,
}

impl LineupState {
    /// Mixed-radix encoding: each digit ranges over 0..=requirement for its
    /// slot, FLEX is the most significant digit.
    pub fn encode(&self, requirement: &RosterRequirement) -> usize {
        let radices = requirement.primary_counts();
        let mut index = 0usize;
        let mut scale = 1usize;
        for slot in 0..PRIMARY_SLOTS {
            index += self.filled[slot] as usize * scale;
            scale *= radices[slot] as usize + 1;
        }
        index + self.flex as usize * scale
    }

    pub fn decode(mut index: usize, requirement: &RosterRequirement) -> Self {
        let radices = requirement.primary_counts();
        let mut filled = [0u8; PRIMARY_SLOTS];
        for slot in 0..PRIMARY_SLOTS {
            let radix = radices[slot] as usize + 1;
            filled[slot] = (index % radix) as u8;
            index /= radix;
        }
        Self {
            filled,
            flex: index as u8,
        }
    }

    /// Terminal iff every component equals its requirement exactly.
    pub fn is_terminal(&self, requirement: &RosterRequirement) -> bool {
        self.filled == requirement.primary_counts() && self.flex == requirement.flex
    }

    /// State after assigning a player to their primary slot, if it has room.
    pub fn assign_primary(
        &self,
        position: Position,
        requirement: &RosterRequirement,
    ) -> Option<Self> {
        let slot = position.index();
        if self.filled[slot] >= requirement.primary_count(position) {
            return None;
        }
        let mut next = *self;
        next.filled[slot] += 1;
        Some(next)
    }

    /// State after assigning a FLEX-eligible player to FLEX, if it has room.
    pub fn assign_flex(&self, position: Position, requirement: &RosterRequirement) -> Option<Self> {
        if !position.flex_eligible() || self.flex >= requirement.flex {
            return None;
        }
        let mut next = *self;
        next.flex += 1;
        Some(next)
    }
}
