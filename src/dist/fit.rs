//! Fit truncated-normal parameters to quantile anchors.
//!
//! Given fixed bounds and two or more (probability, value) anchors — e.g.
//! floor/median/ceiling projections — solve for the pre-truncation (mu, sigma)
//! whose truncated quantiles pass through the anchors. Damped Newton on the
//! quantile residuals: finite-difference Jacobian, Levenberg regularization
//! escalated on rejected steps, Armijo backtracking so the squared error
//! never increases. Non-convergence is reported, not raised: callers get the
//! best parameters found with `converged = false`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dist::normal;
use crate::dist::truncnorm::TruncatedNormal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileAnchor {
    /// Cumulative probability in (0, 1).
    pub prob: f64,
    /// Score value the distribution should reach at that probability.
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitError {
    TooFewAnchors { got: usize },
    AnchorOutOfRange { index: usize, prob: f64 },
    AnchorOutsideBounds { index: usize, value: f64 },
    InvalidBounds { lower: f64, upper: f64 },
}

impl fmt::Display for FitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewAnchors { got } => {
                write!(f, "need at least 2 quantile anchors, got {got}")
            }
            Self::AnchorOutOfRange { index, prob } => {
                write!(f, "anchor {index} probability {prob} must lie in (0, 1)")
            }
            Self::AnchorOutsideBounds { index, value } => {
                write!(f, "anchor {index} value {value} falls outside the support bounds")
            }
            Self::InvalidBounds { lower, upper } => {
                write!(f, "bounds [{lower}, {upper}] are not an interval")
            }
        }
    }
}

/// Result of a fit. `dist` is always usable; check `converged` before
/// treating the parameters as exact.
#[derive(Debug, Clone, Copy)]
pub struct FitOutcome {
    pub dist: TruncatedNormal,
    pub converged: bool,
    pub iterations: usize,
    /// Largest absolute quantile residual at the returned parameters.
    pub max_residual: f64,
}

const MAX_ITERATIONS: usize = 60;
const MAX_BACKTRACKS: usize = 8;
const ARMIJO_C1: f64 = 1e-4;
const BASE_DAMPING: f64 = 1e-9;
const DAMPING_GROWTH: f64 = 10.0;
const SIGMA_FLOOR_FRACTION: f64 = 1e-4;

pub fn fit_from_anchors(
    anchors: &[QuantileAnchor],
    lower: f64,
    upper: f64,
) -> Result<FitOutcome, FitError> {
    if anchors.len() < 2 {
        return Err(FitError::TooFewAnchors { got: anchors.len() });
    }
    if !(lower < upper) {
        return Err(FitError::InvalidBounds { lower, upper });
    }
    for (index, anchor) in anchors.iter().enumerate() {
        if !(anchor.prob > 0.0 && anchor.prob < 1.0) {
            return Err(FitError::AnchorOutOfRange {
                index,
                prob: anchor.prob,
            });
        }
        if anchor.value < lower || anchor.value > upper {
            return Err(FitError::AnchorOutsideBounds {
                index,
                value: anchor.value,
            });
        }
    }

    let span = upper - lower;
    let sigma_floor = span * SIGMA_FLOOR_FRACTION;
    let tolerance = span * 1e-8;

    let (mut mu, mut sigma) = initial_guess(anchors, lower, upper);
    let mut sse = match residuals(mu, sigma, anchors, lower, upper) {
        Some(r) => sum_sq(&r),
        None => {
            // Initial guess produced a degenerate truncation; restart from
            // the interval midpoint.
            mu = lower + span / 2.0;
            sigma = span / 4.0;
            let r = residuals(mu, sigma, anchors, lower, upper)
                .expect("midpoint parameters always have mass over the support");
            sum_sq(&r)
        }
    };

    let mut damping = BASE_DAMPING;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        iterations += 1;
        let r = match residuals(mu, sigma, anchors, lower, upper) {
            Some(r) => r,
            None => break,
        };
        let max_residual = r.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if max_residual < tolerance {
            break;
        }

        let Some((jac_mu, jac_sigma)) =
            finite_difference_jacobian(mu, sigma, &r, anchors, lower, upper, span)
        else {
            break;
        };

        // Normal equations for the 2-parameter least squares step, with a
        // Levenberg term on the diagonal.
        let jtj_mm: f64 = jac_mu.iter().map(|j| j * j).sum::<f64>() + damping;
        let jtj_ss: f64 = jac_sigma.iter().map(|j| j * j).sum::<f64>() + damping;
        let jtj_ms: f64 = jac_mu.iter().zip(&jac_sigma).map(|(a, b)| a * b).sum();
        let g_mu: f64 = jac_mu.iter().zip(&r).map(|(j, e)| j * e).sum();
        let g_sigma: f64 = jac_sigma.iter().zip(&r).map(|(j, e)| j * e).sum();

        let det = jtj_mm * jtj_ss - jtj_ms * jtj_ms;
        if det.abs() < 1e-300 {
            damping *= DAMPING_GROWTH;
            continue;
        }
        let delta_mu = -(jtj_ss * g_mu - jtj_ms * g_sigma) / det;
        let delta_sigma = -(jtj_mm * g_sigma - jtj_ms * g_mu) / det;

        // Armijo backtracking: shrink the step until the squared error drops
        // by at least c1 * t * (gradient . direction).
        let directional = g_mu * delta_mu + g_sigma * delta_sigma;
        let mut step = 1.0;
        let mut accepted = false;
        for _ in 0..MAX_BACKTRACKS {
            let trial_mu = mu + step * delta_mu;
            let trial_sigma = (sigma + step * delta_sigma).max(sigma_floor);
            if let Some(trial_r) = residuals(trial_mu, trial_sigma, anchors, lower, upper) {
                let trial_sse = sum_sq(&trial_r);
                if trial_sse <= sse + ARMIJO_C1 * step * directional {
                    mu = trial_mu;
                    sigma = trial_sigma;
                    sse = trial_sse;
                    accepted = true;
                    break;
                }
            }
            step *= 0.5;
        }

        if accepted {
            damping = BASE_DAMPING;
        } else {
            damping *= DAMPING_GROWTH;
            if damping > 1e6 {
                break;
            }
        }
    }

    let sigma = sigma.max(sigma_floor);
    let dist = TruncatedNormal::new(mu, sigma, lower, upper)
        .or_else(|_| TruncatedNormal::new(lower + span / 2.0, span / 4.0, lower, upper))
        .expect("fallback parameters always have mass over the support");
    let max_residual = residuals_for(&dist, anchors)
        .iter()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    Ok(FitOutcome {
        dist,
        converged: max_residual < tolerance * 10.0,
        iterations,
        max_residual,
    })
}

/// Moment-matched starting point: mu from linear interpolation of the anchors
/// at p = 0.5, sigma from the spread between the outermost anchors on the
/// untruncated normal quantile scale.
fn initial_guess(anchors: &[QuantileAnchor], lower: f64, upper: f64) -> (f64, f64) {
    let mut sorted: Vec<QuantileAnchor> = anchors.to_vec();
    sorted.sort_by(|a, b| a.prob.total_cmp(&b.prob));

    let first = sorted[0];
    let last = sorted[sorted.len() - 1];
    let z_first = normal::quantile(first.prob);
    let z_last = normal::quantile(last.prob);

    let sigma = if (z_last - z_first).abs() > 1e-9 {
        ((last.value - first.value) / (z_last - z_first)).abs()
    } else {
        0.0
    };
    let sigma = if sigma > 0.0 { sigma } else { (upper - lower) / 6.0 };

    // Interpolate the median from the bracketing anchors, else extrapolate
    // from the nearest one along the normal quantile scale.
    let mu = median_estimate(&sorted, sigma);
    (mu.clamp(lower - (upper - lower), upper + (upper - lower)), sigma)
}

fn median_estimate(sorted: &[QuantileAnchor], sigma: f64) -> f64 {
    for pair in sorted.windows(2) {
        if pair[0].prob <= 0.5 && pair[1].prob >= 0.5 {
            let width = pair[1].prob - pair[0].prob;
            if width < 1e-12 {
                return pair[0].value;
            }
            let t = (0.5 - pair[0].prob) / width;
            return pair[0].value + t * (pair[1].value - pair[0].value);
        }
    }
    let nearest = sorted
        .iter()
        .min_by(|a, b| (a.prob - 0.5).abs().total_cmp(&(b.prob - 0.5).abs()))
        .expect("anchors are non-empty");
    nearest.value - sigma * normal::quantile(nearest.prob)
}

fn residuals(
    mu: f64,
    sigma: f64,
    anchors: &[QuantileAnchor],
    lower: f64,
    upper: f64,
) -> Option<Vec<f64>> {
    let dist = TruncatedNormal::new(mu, sigma, lower, upper).ok()?;
    Some(residuals_for(&dist, anchors))
}

fn residuals_for(dist: &TruncatedNormal, anchors: &[QuantileAnchor]) -> Vec<f64> {
    anchors
        .iter()
        .map(|anchor| dist.quantile(anchor.prob) - anchor.value)
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn finite_difference_jacobian(
    mu: f64,
    sigma: f64,
    r: &[f64],
    anchors: &[QuantileAnchor],
    lower: f64,
    upper: f64,
    span: f64,
) -> Option<(Vec<f64>, Vec<f64>)> {
    let eps_mu = span * 1e-6;
    let eps_sigma = (sigma * 1e-6).max(span * 1e-9);

    let r_mu = residuals(mu + eps_mu, sigma, anchors, lower, upper)?;
    let r_sigma = residuals(mu, sigma + eps_sigma, anchors, lower, upper)?;

    let jac_mu = r_mu
        .iter()
        .zip(r)
        .map(|(ahead, base)| (ahead - base) / eps_mu)
        .collect();
    let jac_sigma = r_sigma
        .iter()
        .zip(r)
        .map(|(ahead, base)| (ahead - base) / eps_sigma)
        .collect();
    Some((jac_mu, jac_sigma))
}

fn sum_sq(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum()
}
