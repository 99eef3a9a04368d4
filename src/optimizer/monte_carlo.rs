//! Monte Carlo win-probability refinement.
//!
//! For each candidate lineup, draws batches of correlated lineup totals
//! against the opponent model and accumulates win count, margin sum, and
//! margin sum-of-squares. After every batch the win-probability standard
//! error sqrt(p(1-p)/n) is rechecked; the loop stops early once it drops
//! below the configured target or the simulation budget runs out. Budget
//! exhaustion is not an error — the realized standard error travels with the
//! result so callers can judge confidence.
//!
//! When the opponent's starting roster is known, both lineups are simulated
//! jointly through one factor model that shares game factors and a dedicated
//! cross-lineup environment factor, so correlated game scripts (a shootout
//! lifting both sides) land in the margin distribution instead of being
//! assumed away.
//!
//! Candidates are evaluated in parallel over rayon; every candidate owns a
//! generator seeded from the base seed and its sorted member ids, plus its
//! own accumulator, so no state is shared across workers.

use rayon::prelude::*;
use serde::Serialize;

use crate::config::OptimizerConfig;
use crate::corr::{CopulaSampler, FactorModel, NormalSource};
use crate::dist::TruncatedNormal;
use crate::opponent::OpponentModel;
use crate::optimizer::lineup_generator::LineupCandidate;
use crate::rng::{lineup_seed, split_seed, Rng};
use crate::roster::player::PlayerScore;

/// Margin percentile ladder reported as calibration-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarginPercentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

/// Result of one candidate's Monte Carlo evaluation. Constructed once,
/// never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimulationOutcome {
    pub win_probability: f64,
    pub expected_margin: f64,
    pub margin_std_dev: f64,
    pub percentiles: MarginPercentiles,
    /// Realized win-probability standard error at stop time. May exceed the
    /// target when the budget ran out first.
    pub std_error: f64,
    /// Simulations actually run.
    pub simulations: usize,
}

pub fn run_monte_carlo(
    roster: &[PlayerScore],
    candidates: &[LineupCandidate],
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    base_seed: u64,
) -> Vec<SimulationOutcome> {
    run_monte_carlo_with_parallelism(roster, candidates, opponent, config, base_seed, false)
}

/// Like [run_monte_carlo] but distributes candidates across all CPU cores
/// via Rayon. Results order matches input order.
pub fn run_monte_carlo_parallel(
    roster: &[PlayerScore],
    candidates: &[LineupCandidate],
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    base_seed: u64,
) -> Vec<SimulationOutcome> {
    run_monte_carlo_with_parallelism(roster, candidates, opponent, config, base_seed, true)
}

fn run_monte_carlo_with_parallelism(
    roster: &[PlayerScore],
    candidates: &[LineupCandidate],
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    base_seed: u64,
    parallel: bool,
) -> Vec<SimulationOutcome> {
    let run_one = |candidate: &LineupCandidate| {
        let seed = lineup_seed(base_seed, &candidate.sorted_player_ids(roster));
        evaluate_candidate(roster, candidate, opponent, config, seed)
    };

    if parallel {
        candidates.par_iter().map(run_one).collect()
    } else {
        candidates.iter().map(run_one).collect()
    }
}

/// Evaluate one candidate with its own seeded streams.
pub fn evaluate_candidate(
    roster: &[PlayerScore],
    candidate: &LineupCandidate,
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    seed: u64,
) -> SimulationOutcome {
    let mut lineup: Vec<&PlayerScore> = candidate
        .player_indices()
        .into_iter()
        .map(|index| &roster[index])
        .collect();
    // Canonical member order: the same player set simulates identically no
    // matter how the roster was permuted.
    lineup.sort_by_key(|p| p.id);

    match opponent.roster() {
        Some(opposing) if !opposing.is_empty() => joint_evaluation(&lineup, opposing, config, seed),
        _ => independent_evaluation(&lineup, opponent, config, seed),
    }
}

/// Candidate lineup simulated through the copula, opponent total drawn from
/// its closed-form model on an independent stream.
fn independent_evaluation(
    lineup: &[&PlayerScore],
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    seed: u64,
) -> SimulationOutcome {
    let model = FactorModel::for_players(lineup, &config.correlation);
    let dists: Vec<&TruncatedNormal> = lineup.iter().map(|p| &p.projection).collect();
    let sampler = CopulaSampler::new(&model, dists);

    let mut source = NormalSource::new(
        config.variance_reduction,
        sampler.draw_dimension(),
        split_seed(seed, 1),
    );
    let mut opponent_rng = Rng::new(split_seed(seed, 2));

    run_batches(config, |margins| {
        let batch = source.next_batch(config.simulation_batch.max(1));
        let mut scores = Vec::with_capacity(sampler.player_count());
        for normals in &batch {
            sampler.scores_from_normals(normals, &mut scores);
            let lineup_total: f64 = scores.iter().sum();
            margins.push(lineup_total - opponent.sample(&mut opponent_rng));
        }
    })
}

/// Both lineups drawn from one factor model sharing game factors and the
/// cross-lineup environment factor.
fn joint_evaluation(
    lineup: &[&PlayerScore],
    opposing: &[PlayerScore],
    config: &OptimizerConfig,
    seed: u64,
) -> SimulationOutcome {
    let mut scope: Vec<&PlayerScore> = Vec::with_capacity(lineup.len() + opposing.len());
    scope.extend_from_slice(lineup);
    scope.extend(opposing.iter());
    let split = lineup.len();

    let model = FactorModel::joint(&scope, &config.correlation);
    let dists: Vec<&TruncatedNormal> = scope.iter().map(|p| &p.projection).collect();
    let sampler = CopulaSampler::new(&model, dists);

    let mut source = NormalSource::new(
        config.variance_reduction,
        sampler.draw_dimension(),
        split_seed(seed, 1),
    );

    run_batches(config, |margins| {
        let batch = source.next_batch(config.simulation_batch.max(1));
        let mut scores = Vec::with_capacity(sampler.player_count());
        for normals in &batch {
            sampler.scores_from_normals(normals, &mut scores);
            let lineup_total: f64 = scores[..split].iter().sum();
            let opponent_total: f64 = scores[split..].iter().sum();
            margins.push(lineup_total - opponent_total);
        }
    })
}

/// The cooperative early-stopping loop: run batches until the target
/// standard error is reached or the budget is exhausted, then summarize.
fn run_batches<F>(config: &OptimizerConfig, mut next_batch: F) -> SimulationOutcome
where
    F: FnMut(&mut Vec<f64>),
{
    let max_simulations = config.max_simulations.max(1);
    let min_simulations = config.min_simulations.min(max_simulations);
    let mut margins: Vec<f64> = Vec::with_capacity(max_simulations.min(1 << 16));

    loop {
        next_batch(&mut margins);
        if margins.len() > max_simulations {
            margins.truncate(max_simulations);
        }
        let n = margins.len();
        if n >= max_simulations {
            break;
        }
        if n >= min_simulations {
            let p = win_fraction(&margins);
            if standard_error(p, n) <= config.target_std_error {
                break;
            }
        }
    }

    summarize(&margins)
}

fn win_fraction(margins: &[f64]) -> f64 {
    if margins.is_empty() {
        return 0.0;
    }
    // A dead-even margin counts as half a win, matching the continuous limit.
    let wins: f64 = margins
        .iter()
        .map(|&m| {
            if m > 0.0 {
                1.0
            } else if m == 0.0 {
                0.5
            } else {
                0.0
            }
        })
        .sum();
    wins / margins.len() as f64
}

fn standard_error(p: f64, n: usize) -> f64 {
    if n == 0 {
        return f64::INFINITY;
    }
    (p * (1.0 - p) / n as f64).sqrt()
}

fn summarize(margins: &[f64]) -> SimulationOutcome {
    let n = margins.len();
    let p = win_fraction(margins);
    let mean = margins.iter().sum::<f64>() / n.max(1) as f64;
    let sum_sq: f64 = margins.iter().map(|m| (m - mean) * (m - mean)).sum();
    let variance = if n > 1 { sum_sq / (n - 1) as f64 } else { 0.0 };

    let mut sorted = margins.to_vec();
    sorted.sort_by(f64::total_cmp);

    SimulationOutcome {
        win_probability: p,
        expected_margin: mean,
        margin_std_dev: variance.sqrt(),
        percentiles: MarginPercentiles {
            p5: percentile(&sorted, 0.05),
            p25: percentile(&sorted, 0.25),
            p50: percentile(&sorted, 0.50),
            p75: percentile(&sorted, 0.75),
            p95: percentile(&sorted, 0.95),
        },
        std_error: standard_error(p, n),
        simulations: n,
    }
}

/// Linear-interpolated percentile of a sorted sample.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        return sorted[low];
    }
    let fraction = position - low as f64;
    sorted[low] + fraction * (sorted[high] - sorted[low])
}
