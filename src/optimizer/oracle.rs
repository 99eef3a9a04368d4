//! Exhaustive lineup oracle for small rosters.
//!
//! Enumerates every feasible starting lineup directly, evaluates each with
//! its own independent Monte Carlo run, and returns the true best. This is a
//! development and test tool for validating the DP + screening pipeline —
//! it is exponential in roster size and is not a production code path.

use crate::config::OptimizerConfig;
use crate::opponent::OpponentModel;
use crate::optimizer::lineup_generator::{LineupCandidate, MAX_ROSTER};
use crate::optimizer::monte_carlo::{run_monte_carlo_parallel, SimulationOutcome};
use crate::roster::player::{PlayerScore, Position, PRIMARY_SLOTS};
use crate::roster::requirement::RosterRequirement;

/// Enumeration refuses rosters beyond this size; the state explosion past it
/// is the DP's job to handle.
pub const MAX_ORACLE_ROSTER: usize = 18;

#[derive(Debug, Clone)]
pub struct OracleResult {
    pub candidate: LineupCandidate,
    pub outcome: SimulationOutcome,
    pub lineups_enumerated: usize,
}

/// Every feasible starter subset as a bitmask candidate.
pub fn enumerate_feasible_lineups(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
) -> Vec<LineupCandidate> {
    if roster.is_empty() || roster.len() > MAX_ROSTER.min(MAX_ORACLE_ROSTER) {
        return Vec::new();
    }
    let starters = requirement.starters();
    let mut lineups = Vec::new();
    let mut chosen: Vec<usize> = Vec::with_capacity(starters);
    choose_recursive(roster, requirement, starters, 0, &mut chosen, &mut lineups);
    lineups
}

fn choose_recursive(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
    starters: usize,
    next_index: usize,
    chosen: &mut Vec<usize>,
    lineups: &mut Vec<LineupCandidate>,
) {
    if chosen.len() == starters {
        if is_feasible_subset(roster, chosen, requirement) {
            let mask = chosen.iter().fold(0u32, |mask, &index| mask | (1 << index));
            lineups.push(LineupCandidate { mask, value: 0.0 });
        }
        return;
    }
    let remaining_needed = starters - chosen.len();
    if roster.len() - next_index < remaining_needed {
        return;
    }
    for index in next_index..roster.len() {
        if !roster[index].status.startable() {
            continue;
        }
        chosen.push(index);
        choose_recursive(roster, requirement, starters, index + 1, chosen, lineups);
        chosen.pop();
    }
}

/// Exact feasibility: fixed slots match exactly; flex-eligible surplus over
/// the primary requirements equals the FLEX count.
fn is_feasible_subset(
    roster: &[PlayerScore],
    chosen: &[usize],
    requirement: &RosterRequirement,
) -> bool {
    let mut counts = [0usize; PRIMARY_SLOTS];
    for &index in chosen {
        counts[roster[index].position.index()] += 1;
    }
    let required = requirement.primary_counts();

    for position in Position::ALL {
        let slot = position.index();
        if position.flex_eligible() {
            if counts[slot] < required[slot] as usize {
                return false;
            }
        } else if counts[slot] != required[slot] as usize {
            return false;
        }
    }

    let surplus: usize = Position::ALL
        .iter()
        .filter(|position| position.flex_eligible())
        .map(|position| counts[position.index()] - required[position.index()] as usize)
        .sum();
    surplus == requirement.flex as usize
}

/// Evaluate every feasible lineup and return the one with the highest
/// Monte Carlo win probability. None when nothing is feasible.
pub fn exhaustive_best(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    base_seed: u64,
) -> Option<OracleResult> {
    let lineups = enumerate_feasible_lineups(roster, requirement);
    if lineups.is_empty() {
        return None;
    }

    let outcomes = run_monte_carlo_parallel(roster, &lineups, opponent, config, base_seed);
    let lineups_enumerated = lineups.len();

    lineups
        .into_iter()
        .zip(outcomes)
        .max_by(|(_, left), (_, right)| {
            left.win_probability
                .total_cmp(&right.win_probability)
                .then_with(|| left.expected_margin.total_cmp(&right.expected_margin))
        })
        .map(|(candidate, outcome)| OracleResult {
            candidate,
            outcome,
            lineups_enumerated,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::TruncatedNormal;
    use crate::roster::player::{GameInfo, HealthStatus};

    fn player(id: u32, position: Position, mean: f64) -> PlayerScore {
        PlayerScore {
            id,
            name: format!("P{id}"),
            team: format!("T{}", id % 3),
            position,
            status: HealthStatus::Healthy,
            projection: TruncatedNormal::new(mean, 4.0, 0.0, 60.0).unwrap(),
            game: GameInfo {
                game_id: id % 3,
                home: format!("T{}", id % 3),
                away: "OPP".to_string(),
                kickoff: None,
            },
        }
    }

    fn roster() -> Vec<PlayerScore> {
        vec![
            player(1, Position::Qb, 18.0),
            player(2, Position::Qb, 16.0),
            player(3, Position::Rb, 14.0),
            player(4, Position::Rb, 12.0),
            player(5, Position::Rb, 10.0),
            player(6, Position::Wr, 13.0),
            player(7, Position::Wr, 11.0),
            player(8, Position::Te, 8.0),
            player(9, Position::K, 7.0),
            player(10, Position::Dst, 6.0),
        ]
    }

    #[test]
    fn enumeration_counts_match_combinatorics() {
        // Requirement QB1 RB2 WR1 TE1 FLEX1 K1 DST1 over the roster above:
        // QB: C(2,1)=2; K, DST, TE forced; RB/WR fill 3 + flex:
        // (rb, wr) in {(2,2), (3,1)} -> C(3,2)*C(2,2) + C(3,3)*C(2,1) = 3 + 2 = 5.
        let requirement = RosterRequirement {
            qb: 1,
            rb: 2,
            wr: 1,
            te: 1,
            k: 1,
            dst: 1,
            flex: 1,
            bench: 0,
        };
        let lineups = enumerate_feasible_lineups(&roster(), &requirement);
        assert_eq!(lineups.len(), 2 * 5);
        for lineup in &lineups {
            assert_eq!(lineup.player_count(), requirement.starters());
        }
    }

    #[test]
    fn infeasible_requirement_enumerates_nothing() {
        let requirement = RosterRequirement {
            qb: 3, // only 2 QBs on the roster
            ..RosterRequirement::default()
        };
        assert!(enumerate_feasible_lineups(&roster(), &requirement).is_empty());
    }

    #[test]
    fn oracle_finds_a_best_lineup() {
        let requirement = RosterRequirement {
            qb: 1,
            rb: 2,
            wr: 1,
            te: 1,
            k: 1,
            dst: 1,
            flex: 1,
            bench: 0,
        };
        let config = OptimizerConfig {
            min_simulations: 300,
            max_simulations: 1_500,
            simulation_batch: 300,
            target_std_error: 0.0,
            ..OptimizerConfig::default()
        };
        let opponent = OpponentModel::league_average(80.0, 18.0);
        let result = exhaustive_best(&roster(), &requirement, &opponent, &config, 42).unwrap();
        assert_eq!(result.lineups_enumerated, 10);
        assert!(result.outcome.win_probability > 0.0 && result.outcome.win_probability < 1.0);
        // The best lineup should carry the stronger QB.
        assert!(result.candidate.contains(0));
    }

    #[test]
    fn oversized_roster_is_refused() {
        let mut many = Vec::new();
        for id in 0..20u32 {
            many.push(player(id + 1, Position::Wr, 10.0));
        }
        assert!(enumerate_feasible_lineups(&many, &RosterRequirement::default()).is_empty());
    }
}
