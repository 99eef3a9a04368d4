//! Closed-form win-probability screen for pre-filtering candidates.
//!
//! Treats the lineup total as an independent normal (sum of post-truncation
//! player means and variances) against the opponent's mean and variance, and
//! ranks candidates by P(margin > 0) under that approximation. The screen
//! ignores correlation entirely, so it is only ever a ranking device for
//! deciding which candidates earn a full Monte Carlo run — never the final
//! answer.

use crate::dist::normal;
use crate::opponent::OpponentModel;
use crate::optimizer::lineup_generator::LineupCandidate;
use crate::roster::player::PlayerScore;

#[derive(Debug, Clone, Copy)]
pub struct ScreenEntry {
    /// Index into the candidate pool that was screened.
    pub candidate_index: usize,
    pub lineup_mean: f64,
    pub lineup_variance: f64,
    pub win_probability: f64,
}

/// P(lineup total beats opponent total) with both totals independent normal.
pub fn analytic_win_probability(
    lineup_mean: f64,
    lineup_variance: f64,
    opponent_mean: f64,
    opponent_variance: f64,
) -> f64 {
    let margin_variance = lineup_variance + opponent_variance;
    if margin_variance <= 0.0 {
        // Degenerate totals: the margin is deterministic.
        return if lineup_mean > opponent_mean {
            1.0
        } else if lineup_mean < opponent_mean {
            0.0
        } else {
            0.5
        };
    }
    normal::cdf((lineup_mean - opponent_mean) / margin_variance.sqrt())
}

/// Independent-normal moments of a candidate lineup.
pub fn lineup_moments(candidate: &LineupCandidate, roster: &[PlayerScore]) -> (f64, f64) {
    let mut mean = 0.0;
    let mut variance = 0.0;
    for index in candidate.player_indices() {
        mean += roster[index].mean();
        variance += roster[index].projection.variance();
    }
    (mean, variance)
}

/// Screen every candidate and return entries sorted best-first.
pub fn screen_candidates(
    candidates: &[LineupCandidate],
    roster: &[PlayerScore],
    opponent: &OpponentModel,
) -> Vec<ScreenEntry> {
    let opponent_mean = opponent.mean();
    let opponent_variance = opponent.variance();

    let mut entries: Vec<ScreenEntry> = candidates
        .iter()
        .enumerate()
        .map(|(candidate_index, candidate)| {
            let (lineup_mean, lineup_variance) = lineup_moments(candidate, roster);
            ScreenEntry {
                candidate_index,
                lineup_mean,
                lineup_variance,
                win_probability: analytic_win_probability(
                    lineup_mean,
                    lineup_variance,
                    opponent_mean,
                    opponent_variance,
                ),
            }
        })
        .collect();

    entries.sort_by(|left, right| {
        right
            .win_probability
            .total_cmp(&left.win_probability)
            .then_with(|| right.lineup_mean.total_cmp(&left.lineup_mean))
    });
    entries
}
