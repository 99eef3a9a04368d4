//! Post-hoc scoring of simulated distributions against realized outcomes.
//!
//! Pure evaluators with no effect on optimization: they exist to answer
//! whether the modeled distributions are systematically over- or
//! under-confident. CRPS scores a full sample-based forecast against one
//! observed value; reliability binning, expected calibration error, and the
//! Brier score grade win-probability forecasts against binary outcomes;
//! interval coverage compares nominal and realized prediction intervals.

pub mod records;

use serde::Serialize;

/// Continuous Ranked Probability Score of a sample-based forecast against an
/// observed value, via the identity CRPS = E|X - y| - 0.5 E|X - X'|.
/// O(n log n): the pairwise term collapses to a weighted sum over the sorted
/// sample. Lower is better; 0 means a point mass on the observation.
pub fn crps_from_samples(samples: &[f64], observed: f64) -> f64 {
    let n = samples.len();
    if n == 0 {
        return f64::NAN;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mean_abs_error =
        sorted.iter().map(|x| (x - observed).abs()).sum::<f64>() / n as f64;

    // sum over ordered pairs |x_i - x_j| = 2 * sum_i (2i + 1 - n) * x_(i).
    let pairwise: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| (2.0 * i as f64 + 1.0 - n as f64) * x)
        .sum();
    let mean_pairwise = 2.0 * pairwise / (n as f64 * n as f64);

    mean_abs_error - 0.5 * mean_pairwise
}

/// Mean squared error of win-probability forecasts against binary outcomes.
pub fn brier_score(predictions: &[f64], outcomes: &[bool]) -> f64 {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return f64::NAN;
    }
    predictions
        .iter()
        .zip(outcomes)
        .map(|(p, &won)| {
            let y = if won { 1.0 } else { 0.0 };
            (p - y) * (p - y)
        })
        .sum::<f64>()
        / predictions.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReliabilityBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_rate: f64,
}

/// Bin predicted probabilities and compare each bin's mean forecast with the
/// observed win rate.
pub fn reliability_bins(
    predictions: &[f64],
    outcomes: &[bool],
    bins: usize,
) -> Vec<ReliabilityBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut predicted_sum = vec![0.0f64; bins];
    let mut won_sum = vec![0.0f64; bins];

    for (p, &won) in predictions.iter().zip(outcomes) {
        let p = p.clamp(0.0, 1.0);
        let index = ((p * bins as f64).floor() as usize).min(bins - 1);
        counts[index] += 1;
        predicted_sum[index] += p;
        if won {
            won_sum[index] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (mean_predicted, observed_rate) = if count > 0 {
                (
                    predicted_sum[i] / count as f64,
                    won_sum[i] / count as f64,
                )
            } else {
                (0.0, 0.0)
            };
            ReliabilityBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                mean_predicted,
                observed_rate,
            }
        })
        .collect()
}

/// Expected Calibration Error: count-weighted mean absolute gap between the
/// predicted and observed frequency per bin.
pub fn expected_calibration_error(bins: &[ReliabilityBin]) -> f64 {
    let total: usize = bins.iter().map(|b| b.count).sum();
    if total == 0 {
        return f64::NAN;
    }
    bins.iter()
        .map(|b| (b.count as f64 / total as f64) * (b.mean_predicted - b.observed_rate).abs())
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageReport {
    /// The coverage the intervals claim, e.g. 0.90 for a p5-p95 ladder.
    pub nominal: f64,
    /// Fraction of observations that actually landed inside.
    pub realized: f64,
    pub samples: usize,
}

/// Check how often observed values fall inside their prediction intervals.
pub fn interval_coverage(
    intervals: &[(f64, f64)],
    observed: &[f64],
    nominal: f64,
) -> CoverageReport {
    let samples = intervals.len().min(observed.len());
    if samples == 0 {
        return CoverageReport {
            nominal,
            realized: f64::NAN,
            samples: 0,
        };
    }
    let inside = intervals
        .iter()
        .zip(observed)
        .take(samples)
        .filter(|((low, high), value)| **value >= *low && **value <= *high)
        .count();
    CoverageReport {
        nominal,
        realized: inside as f64 / samples as f64,
        samples,
    }
}
