//! Rank Monte-Carlo-evaluated lineups and shape them for output. The final
//! order follows the simulated win probability — never the analytic screen —
//! with expected margin and margin spread as tie-breaks.

use serde::Serialize;

use crate::optimizer::lineup_generator::LineupCandidate;
use crate::optimizer::monte_carlo::SimulationOutcome;
use crate::roster::player::{PlayerScore, Position};
use crate::roster::requirement::RosterRequirement;

#[derive(Debug, Clone, Serialize)]
pub struct LineupSlotEntry {
    pub slot: String,
    pub player_id: u32,
    pub name: String,
    pub team: String,
    pub position: &'static str,
    pub projected_mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedLineupResult {
    pub players: Vec<LineupSlotEntry>,
    pub win_probability: f64,
    /// Independent-normal screen probability, kept for sanity comparison.
    pub analytic_win_probability: f64,
    pub expected_margin: f64,
    pub margin_std_dev: f64,
    pub percentiles: crate::optimizer::monte_carlo::MarginPercentiles,
    pub std_error: f64,
    pub simulations: usize,
}

/// Input to ranking: one evaluated candidate.
#[derive(Debug, Clone)]
pub struct EvaluatedCandidate {
    pub candidate: LineupCandidate,
    pub outcome: SimulationOutcome,
    pub analytic_win_probability: f64,
}

pub fn rank_results(
    evaluated: Vec<EvaluatedCandidate>,
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
) -> Vec<RankedLineupResult> {
    let mut ranked: Vec<RankedLineupResult> = evaluated
        .into_iter()
        .map(|entry| RankedLineupResult {
            players: assign_display_slots(&entry.candidate, roster, requirement),
            win_probability: entry.outcome.win_probability,
            analytic_win_probability: entry.analytic_win_probability,
            expected_margin: entry.outcome.expected_margin,
            margin_std_dev: entry.outcome.margin_std_dev,
            percentiles: entry.outcome.percentiles,
            std_error: entry.outcome.std_error,
            simulations: entry.outcome.simulations,
        })
        .collect();

    ranked.sort_by(|left, right| {
        right
            .win_probability
            .total_cmp(&left.win_probability)
            .then_with(|| right.expected_margin.total_cmp(&left.expected_margin))
            .then_with(|| left.margin_std_dev.total_cmp(&right.margin_std_dev))
    });

    ranked
}

/// Label each selected player with a display slot: primary slots go to the
/// highest-mean players of each position, the flex-eligible leftovers get
/// FLEX. Labels are presentation only; feasibility was enforced by the DP.
fn assign_display_slots(
    candidate: &LineupCandidate,
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
) -> Vec<LineupSlotEntry> {
    let mut by_position: Vec<Vec<usize>> = vec![Vec::new(); Position::ALL.len()];
    for index in candidate.player_indices() {
        by_position[roster[index].position.index()].push(index);
    }
    for group in &mut by_position {
        group.sort_by(|&a, &b| roster[b].mean().total_cmp(&roster[a].mean()));
    }

    let mut entries = Vec::with_capacity(candidate.player_count());
    for position in Position::ALL {
        let primary = requirement.primary_count(position) as usize;
        for (rank, &index) in by_position[position.index()].iter().enumerate() {
            let player = &roster[index];
            let slot = if rank < primary {
                position.as_str().to_string()
            } else {
                "FLEX".to_string()
            };
            entries.push(LineupSlotEntry {
                slot,
                player_id: player.id,
                name: player.name.clone(),
                team: player.team.clone(),
                position: player.position.as_str(),
                projected_mean: player.mean(),
            });
        }
    }
    entries
}
