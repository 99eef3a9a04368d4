//! Batch distribution for candidate evaluation.
//!
//! The Monte Carlo runner uses one candidate per parallel task; these
//! helpers carve the candidate list into ranges so the orchestrator can
//! report progress between chunks, and wrap a full evaluation run in a
//! [WorkerPool](crate::parallel::pool::WorkerPool) when a fixed thread count
//! is wanted.

use crate::config::OptimizerConfig;
use crate::opponent::OpponentModel;
use crate::optimizer::lineup_generator::LineupCandidate;
use crate::optimizer::monte_carlo::{run_monte_carlo_parallel, SimulationOutcome};
use crate::roster::player::PlayerScore;

/// Split `total` items into up to `num_batches` ranges `[start, end)`.
/// Batches are as equal in size as possible; later batches may be smaller.
pub fn batch_ranges(total: usize, num_batches: usize) -> Vec<(usize, usize)> {
    if total == 0 || num_batches == 0 {
        return Vec::new();
    }
    let num_batches = num_batches.min(total);
    let base = total / num_batches;
    let remainder = total % num_batches;
    let mut ranges = Vec::with_capacity(num_batches);
    let mut start = 0;
    for i in 0..num_batches {
        let size = base + if i < remainder { 1 } else { 0 };
        let end = start + size;
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Run the parallel evaluator on a pinned worker count. Convenience wrapper
/// around [run_monte_carlo_parallel] inside
/// [crate::parallel::pool::WorkerPool::install]; used by benchmarks that
/// compare thread counts.
pub fn run_simulation_batches(
    roster: &[PlayerScore],
    candidates: &[LineupCandidate],
    opponent: &OpponentModel,
    config: &OptimizerConfig,
    base_seed: u64,
    pool: &crate::parallel::pool::WorkerPool,
) -> Vec<SimulationOutcome> {
    pool.install(|| run_monte_carlo_parallel(roster, candidates, opponent, config, base_seed))
}
