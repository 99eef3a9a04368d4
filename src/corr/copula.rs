//! Gaussian copula sampling through the factor model.
//!
//! One draw: sample a standard normal per shared factor, then per player
//! combine the loading-weighted factors with an independent residual normal,
//! map the latent value through the standard normal CDF to a uniform, and
//! map that uniform through the player's truncated-normal quantile. The
//! marginal of every player is exact regardless of the induced correlation;
//! nothing is clamped after the fact.
//!
//! Input normals come from a [NormalSource]: independent draws (plain Monte
//! Carlo), Latin-Hypercube stratification across the full factor+residual
//! dimensionality of a batch, or a scrambled-Halton quasi-random stream.
//! The per-draw transform is identical in all three modes.

use crate::config::VarianceReduction;
use crate::corr::factors::FactorModel;
use crate::dist::normal;
use crate::dist::TruncatedNormal;
use crate::rng::{deterministic_shuffle, Rng};

#[derive(Debug, Clone)]
pub struct CopulaSampler<'a> {
    model: &'a FactorModel,
    dists: Vec<&'a TruncatedNormal>,
}

impl<'a> CopulaSampler<'a> {
    /// `dists` must align with the player rows of `model`.
    pub fn new(model: &'a FactorModel, dists: Vec<&'a TruncatedNormal>) -> Self {
        debug_assert_eq!(model.player_count(), dists.len());
        Self { model, dists }
    }

    pub fn player_count(&self) -> usize {
        self.dists.len()
    }

    /// Input dimensionality: shared factors first, then one residual slot
    /// per player.
    pub fn draw_dimension(&self) -> usize {
        self.model.draw_dimension()
    }

    /// Transform one vector of input standard normals into per-player
    /// scores. `normals` is laid out factors-first.
    pub fn scores_from_normals(&self, normals: &[f64], out: &mut Vec<f64>) {
        debug_assert_eq!(normals.len(), self.draw_dimension());
        let factor_count = self.model.factor_count();
        let (factors, residuals) = normals.split_at(factor_count);

        out.clear();
        for (player, dist) in self.dists.iter().enumerate() {
            let loadings = self.model.loadings(player);
            let mut latent = 0.0;
            for (weight, z) in loadings.iter().zip(factors) {
                latent += weight * z;
            }
            latent += self.model.residual_variance(player).sqrt() * residuals[player];
            let uniform = normal::cdf(latent);
            out.push(dist.quantile(uniform));
        }
    }

    /// One independent draw straight from a generator.
    pub fn draw(&self, rng: &mut Rng) -> Vec<f64> {
        let normals: Vec<f64> = (0..self.draw_dimension())
            .map(|_| normal::quantile(rng.next_open_f64()))
            .collect();
        let mut out = Vec::with_capacity(self.player_count());
        self.scores_from_normals(&normals, &mut out);
        out
    }
}

/// Source of input standard-normal vectors for simulation batches.
#[derive(Debug, Clone)]
pub struct NormalSource {
    mode: VarianceReduction,
    dimension: usize,
    rng: Rng,
    // Scrambled-Halton state (QMC mode only).
    halton_index: u64,
    halton_bases: Vec<u64>,
    halton_shifts: Vec<f64>,
}

impl NormalSource {
    pub fn new(mode: VarianceReduction, dimension: usize, seed: u64) -> Self {
        let mut rng = Rng::new(seed);
        let (halton_bases, halton_shifts) = if mode == VarianceReduction::QuasiMonteCarlo {
            let bases = first_primes(dimension);
            let shifts = (0..dimension).map(|_| rng.next_f64()).collect();
            (bases, shifts)
        } else {
            (Vec::new(), Vec::new())
        };
        Self {
            mode,
            dimension,
            rng,
            halton_index: 0,
            halton_bases,
            halton_shifts,
        }
    }

    /// Produce `count` input vectors of standard normals. LHS stratifies
    /// within the batch; QMC continues its sequence across batches.
    pub fn next_batch(&mut self, count: usize) -> Vec<Vec<f64>> {
        match self.mode {
            VarianceReduction::None => (0..count)
                .map(|_| {
                    (0..self.dimension)
                        .map(|_| normal::quantile(self.rng.next_open_f64()))
                        .collect()
                })
                .collect(),
            VarianceReduction::LatinHypercube => self.latin_hypercube_batch(count),
            VarianceReduction::QuasiMonteCarlo => (0..count)
                .map(|_| {
                    self.halton_index += 1;
                    let index = self.halton_index;
                    (0..self.dimension)
                        .map(|d| {
                            let u = radical_inverse(index, self.halton_bases[d])
                                + self.halton_shifts[d];
                            normal::quantile(u.fract())
                        })
                        .collect()
                })
                .collect(),
        }
    }

    fn latin_hypercube_batch(&mut self, count: usize) -> Vec<Vec<f64>> {
        let mut batch = vec![vec![0.0; self.dimension]; count];
        let mut strata: Vec<usize> = (0..count).collect();
        for dimension in 0..self.dimension {
            for (slot, value) in strata.iter_mut().enumerate() {
                *value = slot;
            }
            deterministic_shuffle(&mut strata, self.rng.next_u64());
            for (draw, row) in batch.iter_mut().enumerate() {
                let uniform = (strata[draw] as f64 + self.rng.next_open_f64()) / count as f64;
                row[dimension] = normal::quantile(uniform);
            }
        }
        batch
    }
}

fn first_primes(count: usize) -> Vec<u64> {
    let mut primes = Vec::with_capacity(count);
    let mut candidate = 2u64;
    while primes.len() < count {
        if primes.iter().all(|&p| candidate % p != 0) {
            primes.push(candidate);
        }
        candidate += 1;
    }
    primes
}

/// Van der Corput radical inverse of `index` in the given base.
fn radical_inverse(mut index: u64, base: u64) -> f64 {
    let mut result = 0.0;
    let mut fraction = 1.0 / base as f64;
    while index > 0 {
        result += (index % base) as f64 * fraction;
        index /= base;
        fraction /= base as f64;
    }
    result
}
