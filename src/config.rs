//! Optimizer configuration bundle. Every knob has a default so a scenario
//! file can override only what it cares about; [load_config] follows the
//! graceful-fallback idiom (missing or unreadable file yields defaults).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "data/optimizer.yaml";

/// How simulation input uniforms are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VarianceReduction {
    /// Independent draws per simulation.
    #[default]
    None,
    /// Latin-Hypercube stratification across the factor+residual dimensions
    /// of each batch.
    LatinHypercube,
    /// Scrambled-Halton low-discrepancy stream.
    QuasiMonteCarlo,
}

/// Correlation coefficients that are domain heuristics, not derived facts.
/// They are inputs with documented defaults rather than constants buried in
/// the sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Strength of a DST's negative loading on the opposing team's pass
    /// factor (captures QB-vs-opposing-DST anticorrelation). Default 0.35.
    pub qb_vs_dst: f64,
    /// Magnitude of the alternating target-share loading for same-team WRs
    /// (cannibalization). Default 0.25.
    pub wr_cannibalization: f64,
    /// Loading of every player on the shared cross-lineup environment factor
    /// in joint simulations (shootout effect). Default 0.25.
    pub cross_lineup: f64,
    /// Per-team multiplier on the explained-variance target. Teams absent
    /// from the map use 1.0.
    pub team_strength: BTreeMap<String, f64>,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            qb_vs_dst: 0.35,
            wr_cannibalization: 0.25,
            cross_lineup: 0.25,
            team_strength: BTreeMap::new(),
        }
    }
}

impl CorrelationConfig {
    pub fn team_strength(&self, team: &str) -> f64 {
        self.team_strength.get(team).copied().unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Candidates retained per DP state.
    pub k_best_width: usize,
    /// Global cap on candidates retained across all DP states.
    pub candidate_cap: usize,
    /// How many screened candidates get a full Monte Carlo evaluation.
    pub evaluation_cap: usize,
    /// Win-probability standard error at which simulation stops early.
    pub target_std_error: f64,
    /// Simulations always run before the convergence check applies.
    pub min_simulations: usize,
    /// Hard simulation budget per candidate.
    pub max_simulations: usize,
    /// Draws per convergence-check batch.
    pub simulation_batch: usize,
    pub variance_reduction: VarianceReduction,
    /// Risk-preference sweep: objective = mean + lambda * spread per lambda.
    pub risk_lambdas: Vec<f64>,
    /// Base seed for all derived streams. None means the caller decides
    /// (the CLI draws one from OS entropy and reports it).
    pub base_seed: Option<u64>,
    pub correlation: CorrelationConfig,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            k_best_width: 8,
            candidate_cap: 512,
            evaluation_cap: 24,
            target_std_error: 0.005,
            min_simulations: 1_000,
            max_simulations: 50_000,
            simulation_batch: 512,
            variance_reduction: VarianceReduction::None,
            risk_lambdas: vec![-0.5, -0.25, 0.0, 0.25, 0.5],
            base_seed: None,
            correlation: CorrelationConfig::default(),
        }
    }
}

impl OptimizerConfig {
    /// Concrete seed for this run. Defaults to 0 when none was supplied so
    /// library callers stay deterministic without extra plumbing.
    pub fn resolved_seed(&self) -> u64 {
        self.base_seed.unwrap_or(0)
    }
}

/// Load configuration from YAML. Returns defaults if the file is missing or
/// does not parse.
pub fn load_config(path: &str) -> OptimizerConfig {
    let path = Path::new(path);
    if !path.exists() {
        return OptimizerConfig::default();
    }
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        _ => return OptimizerConfig::default(),
    };
    serde_yaml::from_str(&raw).unwrap_or_default()
}
