//! Normal distribution truncated to a closed interval, renormalized so the
//! mass over the interval integrates to 1. Post-truncation mean and variance
//! use the closed forms in terms of the standard normal density and CDF at
//! the standardized bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dist::normal;
use crate::rng::Rng;

/// Truncated mass below this is treated as degenerate: the bounds sit so far
/// into one tail that CDF differences cancel to noise.
const MIN_TRUNCATED_MASS: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistError {
    NonPositiveSigma { sigma: f64 },
    EmptySupport { lower: f64, upper: f64 },
    DegenerateMass { lower: f64, upper: f64 },
}

impl fmt::Display for DistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveSigma { sigma } => {
                write!(f, "spread must be positive, got {sigma}")
            }
            Self::EmptySupport { lower, upper } => {
                write!(f, "support [{lower}, {upper}] is empty")
            }
            Self::DegenerateMass { lower, upper } => {
                write!(
                    f,
                    "support [{lower}, {upper}] captures no probability mass for these parameters"
                )
            }
        }
    }
}

/// Normal(mu, sigma) restricted to [lower, upper].
///
/// `mu` and `sigma` are the pre-truncation parameters; [TruncatedNormal::mean]
/// and [TruncatedNormal::variance] report the exact post-truncation moments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TruncatedNormalParams", into = "TruncatedNormalParams")]
pub struct TruncatedNormal {
    mu: f64,
    sigma: f64,
    lower: f64,
    upper: f64,
    // Cached standardized bounds and truncated mass.
    alpha: f64,
    beta: f64,
    cdf_alpha: f64,
    mass: f64,
}

/// Serde-facing parameter record for [TruncatedNormal].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TruncatedNormalParams {
    pub mu: f64,
    pub sigma: f64,
    pub lower: f64,
    pub upper: f64,
}

impl TryFrom<TruncatedNormalParams> for TruncatedNormal {
    type Error = DistError;

    fn try_from(params: TruncatedNormalParams) -> Result<Self, DistError> {
        Self::new(params.mu, params.sigma, params.lower, params.upper)
    }
}

impl From<TruncatedNormal> for TruncatedNormalParams {
    fn from(dist: TruncatedNormal) -> Self {
        Self {
            mu: dist.mu,
            sigma: dist.sigma,
            lower: dist.lower,
            upper: dist.upper,
        }
    }
}

impl TruncatedNormal {
    pub fn new(mu: f64, sigma: f64, lower: f64, upper: f64) -> Result<Self, DistError> {
        if !(sigma > 0.0) {
            return Err(DistError::NonPositiveSigma { sigma });
        }
        if !(lower < upper) {
            return Err(DistError::EmptySupport { lower, upper });
        }
        let alpha = (lower - mu) / sigma;
        let beta = (upper - mu) / sigma;
        let cdf_alpha = normal::cdf(alpha);
        let mass = normal::cdf(beta) - cdf_alpha;
        if mass < MIN_TRUNCATED_MASS {
            return Err(DistError::DegenerateMass { lower, upper });
        }
        Ok(Self {
            mu,
            sigma,
            lower,
            upper,
            alpha,
            beta,
            cdf_alpha,
            mass,
        })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Exact post-truncation mean:
    /// mu + sigma * (phi(alpha) - phi(beta)) / Z.
    pub fn mean(&self) -> f64 {
        let phi_alpha = normal::pdf(self.alpha);
        let phi_beta = normal::pdf(self.beta);
        self.mu + self.sigma * (phi_alpha - phi_beta) / self.mass
    }

    /// Exact post-truncation variance:
    /// sigma^2 * (1 + (alpha phi(alpha) - beta phi(beta)) / Z
    ///              - ((phi(alpha) - phi(beta)) / Z)^2).
    pub fn variance(&self) -> f64 {
        let phi_alpha = normal::pdf(self.alpha);
        let phi_beta = normal::pdf(self.beta);
        let ratio = (phi_alpha - phi_beta) / self.mass;
        let bracket = 1.0 + (self.alpha * phi_alpha - self.beta * phi_beta) / self.mass
            - ratio * ratio;
        (self.sigma * self.sigma * bracket).max(0.0)
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// P(X <= x). 0 below the support, 1 above it.
    pub fn cdf(&self, x: f64) -> f64 {
        if x <= self.lower {
            return 0.0;
        }
        if x >= self.upper {
            return 1.0;
        }
        let z = (x - self.mu) / self.sigma;
        ((normal::cdf(z) - self.cdf_alpha) / self.mass).clamp(0.0, 1.0)
    }

    /// Inverse CDF. The result always lies inside [lower, upper]; the final
    /// clamp only absorbs floating-point residue at extreme probabilities.
    pub fn quantile(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        let z = normal::quantile(self.cdf_alpha + p * self.mass);
        (self.mu + self.sigma * z).clamp(self.lower, self.upper)
    }

    /// One sample: quantile of a uniform draw.
    pub fn sample(&self, rng: &mut Rng) -> f64 {
        self.quantile(rng.next_open_f64())
    }
}
