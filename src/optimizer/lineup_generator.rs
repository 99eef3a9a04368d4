//! K-best dynamic program over roster-slot-occupancy states.
//!
//! Players are processed one at a time; each (state, candidate) pair can
//! skip the player, assign them to their primary slot, or assign them to
//! FLEX when eligible. After every player the per-state lists are
//! deduplicated by membership bitmask (higher value wins) and trimmed to the
//! top K, and a global cap prunes the lowest-value states when the beam
//! grows too wide. Terminal states collected at the end are full lineups.
//!
//! One sweep runs per risk-preference lambda (objective = mean + lambda *
//! spread plus a deterministic per-player jitter that breaks ties); the
//! sweep results are unioned by bitmask to yield a pool spanning
//! conservative-to-aggressive postures.

use crate::config::OptimizerConfig;
use crate::rng::hash_player_id;
use crate::roster::player::PlayerScore;
use crate::roster::requirement::{LineupState, RosterRequirement};

/// Bitmask width; rosters beyond this cannot be represented.
pub const MAX_ROSTER: usize = 32;

/// Jitter magnitude: far below any real point difference, large enough to
/// separate exact ties deterministically.
const TIE_BREAK_SCALE: f64 = 1e-6;

/// A (partial or complete) lineup: bit i set means roster index i is in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineupCandidate {
    pub mask: u32,
    pub value: f64,
}

impl LineupCandidate {
    pub fn player_indices(&self) -> Vec<usize> {
        let mut indices = Vec::with_capacity(self.mask.count_ones() as usize);
        let mut bits = self.mask;
        while bits != 0 {
            let index = bits.trailing_zeros() as usize;
            indices.push(index);
            bits &= bits - 1;
        }
        indices
    }

    pub fn contains(&self, roster_index: usize) -> bool {
        self.mask & (1u32 << roster_index) != 0
    }

    pub fn player_count(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Sorted ids of the lineup members; the permutation-invariant identity
    /// used for seeding downstream evaluation.
    pub fn sorted_player_ids(&self, roster: &[PlayerScore]) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .player_indices()
            .into_iter()
            .map(|index| roster[index].id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Generate the diverse candidate pool. Returns an empty pool when the
/// roster cannot satisfy the requirement; callers treat that as a hard
/// input error, not something to retry.
pub fn generate_candidates(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
    config: &OptimizerConfig,
    seed: u64,
) -> Vec<LineupCandidate> {
    if roster.is_empty() || roster.len() > MAX_ROSTER {
        return Vec::new();
    }

    let lambdas: &[f64] = if config.risk_lambdas.is_empty() {
        &[0.0]
    } else {
        &config.risk_lambdas
    };

    // Union of sweeps: best value per unique membership bitmask.
    let mut pool: Vec<LineupCandidate> = Vec::new();
    for &lambda in lambdas {
        for candidate in sweep(roster, requirement, config, lambda, seed) {
            match pool.iter_mut().find(|c| c.mask == candidate.mask) {
                Some(existing) => existing.value = existing.value.max(candidate.value),
                None => pool.push(candidate),
            }
        }
    }

    pool.sort_by(|left, right| right.value.total_cmp(&left.value));
    pool
}

fn sweep(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
    config: &OptimizerConfig,
    lambda: f64,
    seed: u64,
) -> Vec<LineupCandidate> {
    let k = config.k_best_width.max(1);
    let cap = config.candidate_cap.max(k);
    let state_count = requirement.state_count();
    let mut states: Vec<Vec<LineupCandidate>> = vec![Vec::new(); state_count];
    states[0].push(LineupCandidate { mask: 0, value: 0.0 });

    for (roster_index, player) in roster.iter().enumerate() {
        if !player.status.startable() {
            continue;
        }
        let score = player.mean()
            + lambda * player.std_dev()
            + jitter(seed, player.id);
        let bit = 1u32 << roster_index;

        // Collect transitions against a snapshot, then merge: a player must
        // not be assigned twice within their own processing step.
        let mut additions: Vec<(usize, LineupCandidate)> = Vec::new();
        for state_index in 0..state_count {
            if states[state_index].is_empty() {
                continue;
            }
            let state = LineupState::decode(state_index, requirement);
            let primary = state.assign_primary(player.position, requirement);
            let flex = state.assign_flex(player.position, requirement);
            for candidate in &states[state_index] {
                let advanced = LineupCandidate {
                    mask: candidate.mask | bit,
                    value: candidate.value + score,
                };
                if let Some(next) = primary {
                    additions.push((next.encode(requirement), advanced));
                }
                if let Some(next) = flex {
                    additions.push((next.encode(requirement), advanced));
                }
            }
        }
        for (state_index, candidate) in additions {
            states[state_index].push(candidate);
        }

        for list in &mut states {
            dedupe_and_trim(list, k);
        }
        enforce_global_cap(&mut states, cap);
    }

    let terminal_index = requirement.terminal_state().encode(requirement);
    let mut terminals = std::mem::take(&mut states[terminal_index]);
    dedupe_and_trim(&mut terminals, usize::MAX);
    terminals
}

/// Deduplicate by bitmask keeping the higher value, then keep the top `k`.
fn dedupe_and_trim(list: &mut Vec<LineupCandidate>, k: usize) {
    if list.len() > 1 {
        list.sort_by(|left, right| {
            left.mask
                .cmp(&right.mask)
                .then_with(|| right.value.total_cmp(&left.value))
        });
        list.dedup_by_key(|candidate| candidate.mask);
        list.sort_by(|left, right| right.value.total_cmp(&left.value));
    }
    if list.len() > k {
        list.truncate(k);
    }
}

/// Bound total retained candidates across all states by clearing the
/// lowest-value states first. The empty start state survives so later
/// players can still begin fresh lineups.
fn enforce_global_cap(states: &mut [Vec<LineupCandidate>], cap: usize) {
    let mut total: usize = states.iter().map(Vec::len).sum();
    while total > cap {
        let mut worst_state: Option<usize> = None;
        let mut worst_value = f64::INFINITY;
        for (state_index, list) in states.iter().enumerate().skip(1) {
            if list.is_empty() {
                continue;
            }
            let best = list[0].value;
            if best < worst_value {
                worst_value = best;
                worst_state = Some(state_index);
            }
        }
        let Some(state_index) = worst_state else {
            break;
        };
        total -= states[state_index].len();
        states[state_index].clear();
    }
}

fn jitter(seed: u64, player_id: u32) -> f64 {
    (hash_player_id(seed, player_id) as f64 / u64::MAX as f64) * TIE_BREAK_SCALE
}
