//! Opponent scoring models. A matchup either knows the opposing starting
//! roster (enabling joint, correlated simulation) or falls back to a
//! closed-form total-score model. Every variant exposes mean, variance, and a
//! seeded sample so the estimator never special-cases on optional fields.

use serde::{Deserialize, Serialize};

use crate::dist::normal;
use crate::rng::Rng;
use crate::roster::player::PlayerScore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OpponentModel {
    /// League-average fallback: a single normal total.
    LeagueAverage { mean: f64, std_dev: f64 },
    /// Concrete opposing starters. The estimator simulates these jointly with
    /// the candidate lineup; [OpponentModel::sample] draws them independently
    /// for the fallback path.
    Roster { players: Vec<PlayerScore> },
    /// Weighted normal components, e.g. separate models for an opponent with
    /// and without their questionable starter.
    Mixture { components: Vec<MixtureComponent> },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    pub weight: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl OpponentModel {
    pub fn league_average(mean: f64, std_dev: f64) -> Self {
        Self::LeagueAverage { mean, std_dev }
    }

    /// Expected opponent total.
    pub fn mean(&self) -> f64 {
        match self {
            Self::LeagueAverage { mean, .. } => *mean,
            Self::Roster { players } => players.iter().map(PlayerScore::mean).sum(),
            Self::Mixture { components } => {
                let total_weight = mixture_weight(components);
                if total_weight == 0.0 {
                    return 0.0;
                }
                components
                    .iter()
                    .map(|c| c.weight * c.mean)
                    .sum::<f64>()
                    / total_weight
            }
        }
    }

    /// Variance of the opponent total. Roster variance sums player variances
    /// (the correlated case is handled by joint simulation, not here).
    pub fn variance(&self) -> f64 {
        match self {
            Self::LeagueAverage { std_dev, .. } => std_dev * std_dev,
            Self::Roster { players } => {
                players.iter().map(|p| p.projection.variance()).sum()
            }
            Self::Mixture { components } => {
                let total_weight = mixture_weight(components);
                if total_weight == 0.0 {
                    return 0.0;
                }
                let mean = self.mean();
                let second_moment = components
                    .iter()
                    .map(|c| c.weight * (c.std_dev * c.std_dev + c.mean * c.mean))
                    .sum::<f64>()
                    / total_weight;
                (second_moment - mean * mean).max(0.0)
            }
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// One sampled opponent total. Stateless apart from the caller's
    /// generator; independent of any lineup draw.
    pub fn sample(&self, rng: &mut Rng) -> f64 {
        match self {
            Self::LeagueAverage { mean, std_dev } => {
                mean + std_dev * normal::quantile(rng.next_open_f64())
            }
            Self::Roster { players } => {
                players.iter().map(|p| p.projection.sample(rng)).sum()
            }
            Self::Mixture { components } => {
                let total_weight = mixture_weight(components);
                if total_weight == 0.0 {
                    return 0.0;
                }
                let mut pick = rng.next_f64() * total_weight;
                let mut chosen = components[components.len() - 1];
                for component in components {
                    if pick < component.weight {
                        chosen = *component;
                        break;
                    }
                    pick -= component.weight;
                }
                chosen.mean + chosen.std_dev * normal::quantile(rng.next_open_f64())
            }
        }
    }

    /// The opposing starters when known.
    pub fn roster(&self) -> Option<&[PlayerScore]> {
        match self {
            Self::Roster { players } => Some(players),
            _ => None,
        }
    }
}

fn mixture_weight(components: &[MixtureComponent]) -> f64 {
    components.iter().map(|c| c.weight.max(0.0)).sum()
}
