pub mod analytical;
pub mod lineup_generator;
pub mod monte_carlo;
pub mod oracle;
pub mod ranking;

use std::fmt;

use serde::Serialize;

use crate::config::OptimizerConfig;
use crate::opponent::OpponentModel;
use crate::optimizer::analytical::screen_candidates;
use crate::optimizer::lineup_generator::{generate_candidates, LineupCandidate, MAX_ROSTER};
use crate::optimizer::monte_carlo::run_monte_carlo_parallel;
use crate::optimizer::ranking::{rank_results, EvaluatedCandidate, RankedLineupResult};
use crate::parallel::batch_ranges;
use crate::roster::player::{PlayerScore, Position, PRIMARY_SLOTS};
use crate::roster::requirement::RosterRequirement;

/// Number of progress-reporting batches for optimize-with-progress (CLI jobs).
const OPTIMIZE_PROGRESS_BATCH_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum OptimizeError {
    RosterTooLarge { size: usize, max: usize },
    /// The roster cannot fill a required slot. Fails fast; no partial lineup.
    InfeasibleRoster {
        position: &'static str,
        required: usize,
        available: usize,
    },
    /// Not enough flex-eligible players beyond the primary requirements.
    InsufficientFlex { required: usize, available: usize },
    /// The DP produced zero terminal states.
    EmptyCandidatePool,
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RosterTooLarge { size, max } => {
                write!(f, "roster of {size} players exceeds the supported maximum of {max}")
            }
            Self::InfeasibleRoster {
                position,
                required,
                available,
            } => write!(
                f,
                "roster cannot fill {position}: requires {required}, only {available} startable"
            ),
            Self::InsufficientFlex {
                required,
                available,
            } => write!(
                f,
                "roster cannot fill FLEX: requires {required} eligible beyond primary slots, only {available}"
            ),
            Self::EmptyCandidatePool => {
                write!(f, "candidate generation produced no complete lineups")
            }
        }
    }
}

/// One optimization call: a scored roster, the league format, the opponent,
/// and the tuning bundle.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationRequest<'a> {
    pub roster: &'a [PlayerScore],
    pub requirement: &'a RosterRequirement,
    pub opponent: &'a OpponentModel,
    pub config: &'a OptimizerConfig,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OptimizationDiagnostics {
    pub candidates_generated: usize,
    pub candidates_evaluated: usize,
    pub simulations_total: usize,
    /// Standard error realized by the selected lineup's evaluation.
    pub realized_std_error: f64,
    /// Screen probability of the selected lineup, for sanity comparison
    /// against the Monte Carlo answer.
    pub analytic_win_probability: f64,
    pub monte_carlo_win_probability: f64,
    pub base_seed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub best: RankedLineupResult,
    pub ranked: Vec<RankedLineupResult>,
    pub diagnostics: OptimizationDiagnostics,
}

pub fn optimize(request: &OptimizationRequest<'_>) -> Result<OptimizationReport, OptimizeError> {
    optimize_with_progress(request, |_, _| {})
}

/// Like [optimize] but reports Monte Carlo progress as
/// `on_progress(candidates_done, candidates_total)` at batch boundaries.
pub fn optimize_with_progress<F>(
    request: &OptimizationRequest<'_>,
    mut on_progress: F,
) -> Result<OptimizationReport, OptimizeError>
where
    F: FnMut(u32, u32),
{
    check_feasibility(request.roster, request.requirement)?;

    let base_seed = request.config.resolved_seed();
    let pool = generate_candidates(
        request.roster,
        request.requirement,
        request.config,
        base_seed,
    );
    if pool.is_empty() {
        return Err(OptimizeError::EmptyCandidatePool);
    }

    // Analytic screen decides which candidates earn a full evaluation.
    let screened = screen_candidates(&pool, request.roster, request.opponent);
    let evaluation_cap = request.config.evaluation_cap.max(1).min(screened.len());
    let top: Vec<(usize, f64)> = screened[..evaluation_cap]
        .iter()
        .map(|entry| (entry.candidate_index, entry.win_probability))
        .collect();
    let selected: Vec<LineupCandidate> = top.iter().map(|&(index, _)| pool[index]).collect();

    // Monte Carlo refinement in progress batches.
    let total = selected.len();
    on_progress(0, total as u32);
    let num_batches = OPTIMIZE_PROGRESS_BATCH_COUNT.min(total);
    let mut evaluated: Vec<EvaluatedCandidate> = Vec::with_capacity(total);
    for (start, end) in batch_ranges(total, num_batches) {
        let outcomes = run_monte_carlo_parallel(
            request.roster,
            &selected[start..end],
            request.opponent,
            request.config,
            base_seed,
        );
        for (offset, outcome) in outcomes.into_iter().enumerate() {
            let slot = start + offset;
            evaluated.push(EvaluatedCandidate {
                candidate: selected[slot],
                outcome,
                analytic_win_probability: top[slot].1,
            });
        }
        on_progress(end as u32, total as u32);
    }

    let simulations_total: usize = evaluated.iter().map(|e| e.outcome.simulations).sum();
    let ranked = rank_results(evaluated, request.roster, request.requirement);
    let best = ranked[0].clone();

    Ok(OptimizationReport {
        diagnostics: OptimizationDiagnostics {
            candidates_generated: pool.len(),
            candidates_evaluated: total,
            simulations_total,
            realized_std_error: best.std_error,
            analytic_win_probability: best.analytic_win_probability,
            monte_carlo_win_probability: best.win_probability,
            base_seed,
        },
        best,
        ranked,
    })
}

/// Structural feasibility: every fixed slot can be filled from startable
/// players, and enough flex-eligible players remain beyond the primary
/// requirements. Runs before the DP so infeasible inputs fail loudly with a
/// named position instead of an empty pool.
fn check_feasibility(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
) -> Result<(), OptimizeError> {
    if roster.len() > MAX_ROSTER {
        return Err(OptimizeError::RosterTooLarge {
            size: roster.len(),
            max: MAX_ROSTER,
        });
    }

    let mut available = [0usize; PRIMARY_SLOTS];
    for player in roster {
        if player.status.startable() {
            available[player.position.index()] += 1;
        }
    }

    let required = requirement.primary_counts();
    for position in Position::ALL {
        let slot = position.index();
        if available[slot] < required[slot] as usize {
            return Err(OptimizeError::InfeasibleRoster {
                position: position.as_str(),
                required: required[slot] as usize,
                available: available[slot],
            });
        }
    }

    let flex_surplus: usize = Position::ALL
        .iter()
        .filter(|position| position.flex_eligible())
        .map(|position| available[position.index()] - required[position.index()] as usize)
        .sum();
    if flex_surplus < requirement.flex as usize {
        return Err(OptimizeError::InsufficientFlex {
            required: requirement.flex as usize,
            available: flex_surplus,
        });
    }

    Ok(())
}
