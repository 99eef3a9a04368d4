//! Matchup scenario files.
//!
//! A scenario YAML carries everything one optimization call needs: the
//! scored roster, the league requirement, the opponent model, and optional
//! config overrides. Upstream collaborators produce these files from raw
//! projection feeds; this module only converts them into domain types.
//! Projections come either as explicit (mean, spread, floor, ceiling)
//! parameters or as quantile anchors that are fitted on load.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::config::OptimizerConfig;
use crate::dist::{fit_from_anchors, DistError, FitError, QuantileAnchor, TruncatedNormal};
use crate::opponent::{MixtureComponent, OpponentModel};
use crate::roster::player::{GameInfo, HealthStatus, PlayerScore, Position};
use crate::roster::requirement::RosterRequirement;

#[derive(Debug)]
pub enum ScenarioError {
    Read(std::io::Error),
    Parse(serde_yaml::Error),
    Distribution { player: String, error: DistError },
    Fit { player: String, error: FitError },
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read scenario file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse scenario YAML: {err}"),
            Self::Distribution { player, error } => {
                write!(f, "invalid projection for '{player}': {error}")
            }
            Self::Fit { player, error } => {
                write!(f, "cannot fit projection anchors for '{player}': {error}")
            }
        }
    }
}

/// A fully converted scenario, ready for the optimizer.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: Option<String>,
    pub roster: Vec<PlayerScore>,
    pub requirement: RosterRequirement,
    pub opponent: OpponentModel,
    pub config: OptimizerConfig,
    /// Ids of players whose anchor fits did not converge. Their best-effort
    /// parameters are in use; flagged so validation can surface it.
    pub non_converged_fits: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    #[serde(default)]
    name: Option<String>,
    players: Vec<PlayerEntry>,
    #[serde(default)]
    requirement: RosterRequirement,
    opponent: OpponentSpec,
    #[serde(default)]
    config: OptimizerConfig,
}

#[derive(Debug, Deserialize)]
struct PlayerEntry {
    id: u32,
    name: String,
    team: String,
    position: Position,
    #[serde(default)]
    status: HealthStatus,
    game: GameInfo,
    projection: ProjectionSpec,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProjectionSpec {
    Anchored {
        floor: f64,
        ceiling: f64,
        anchors: Vec<QuantileAnchor>,
    },
    Parametric {
        mean: f64,
        spread: f64,
        floor: f64,
        ceiling: f64,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpponentSpec {
    LeagueAverage { mean: f64, std_dev: f64 },
    Roster { players: Vec<PlayerEntry> },
    Mixture { components: Vec<MixtureComponent> },
}

pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
    let raw = fs::read_to_string(path).map_err(ScenarioError::Read)?;
    scenario_from_str(&raw)
}

pub fn scenario_from_str(raw: &str) -> Result<Scenario, ScenarioError> {
    let file: ScenarioFile = serde_yaml::from_str(raw).map_err(ScenarioError::Parse)?;

    let mut non_converged_fits = Vec::new();
    let roster = file
        .players
        .into_iter()
        .map(|entry| convert_player(entry, &mut non_converged_fits))
        .collect::<Result<Vec<_>, _>>()?;

    let opponent = match file.opponent {
        OpponentSpec::LeagueAverage { mean, std_dev } => {
            OpponentModel::LeagueAverage { mean, std_dev }
        }
        OpponentSpec::Roster { players } => {
            let converted = players
                .into_iter()
                .map(|entry| convert_player(entry, &mut non_converged_fits))
                .collect::<Result<Vec<_>, _>>()?;
            OpponentModel::Roster { players: converted }
        }
        OpponentSpec::Mixture { components } => OpponentModel::Mixture { components },
    };

    Ok(Scenario {
        name: file.name,
        roster,
        requirement: file.requirement,
        opponent,
        config: file.config,
        non_converged_fits,
    })
}

fn convert_player(
    entry: PlayerEntry,
    non_converged_fits: &mut Vec<u32>,
) -> Result<PlayerScore, ScenarioError> {
    let projection = match entry.projection {
        ProjectionSpec::Parametric {
            mean,
            spread,
            floor,
            ceiling,
        } => TruncatedNormal::new(mean, spread, floor, ceiling).map_err(|error| {
            ScenarioError::Distribution {
                player: entry.name.clone(),
                error,
            }
        })?,
        ProjectionSpec::Anchored {
            floor,
            ceiling,
            anchors,
        } => {
            let outcome =
                fit_from_anchors(&anchors, floor, ceiling).map_err(|error| ScenarioError::Fit {
                    player: entry.name.clone(),
                    error,
                })?;
            if !outcome.converged {
                non_converged_fits.push(entry.id);
            }
            outcome.dist
        }
    };

    Ok(PlayerScore {
        id: entry.id,
        name: entry.name,
        team: entry.team,
        position: entry.position,
        status: entry.status,
        projection,
        game: entry.game,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: week 10 vs league average
players:
  - id: 1
    name: QB One
    team: KC
    position: QB
    game: { game_id: 1, home: KC, away: BUF }
    projection: { mean: 21.0, spread: 7.0, floor: 0.0, ceiling: 55.0 }
  - id: 2
    name: WR One
    team: KC
    position: WR
    status: questionable
    game: { game_id: 1, home: KC, away: BUF }
    projection:
      floor: 0.0
      ceiling: 40.0
      anchors:
        - { prob: 0.1, value: 4.0 }
        - { prob: 0.5, value: 11.0 }
        - { prob: 0.9, value: 21.0 }
opponent: { type: league_average, mean: 115.0, std_dev: 25.0 }
config: { max_simulations: 4000 }
"#;

    #[test]
    fn parses_parametric_and_anchored_projections() {
        let scenario = scenario_from_str(MINIMAL).unwrap();
        assert_eq!(scenario.roster.len(), 2);
        assert_eq!(scenario.roster[0].projection.mu(), 21.0);
        assert_eq!(scenario.roster[1].status, HealthStatus::Questionable);
        // The anchored fit should land near the median anchor.
        let median = scenario.roster[1].projection.quantile(0.5);
        assert!((median - 11.0).abs() < 0.5, "median {median}");
        assert_eq!(scenario.config.max_simulations, 4_000);
        assert_eq!(scenario.requirement, RosterRequirement::default());
    }

    #[test]
    fn rejects_invalid_parametric_projection() {
        let raw = MINIMAL.replace("spread: 7.0", "spread: -1.0");
        let error = scenario_from_str(&raw).unwrap_err();
        assert!(matches!(error, ScenarioError::Distribution { .. }));
    }

    #[test]
    fn rejects_single_anchor_fit() {
        let raw = r#"
players:
  - id: 1
    name: WR One
    team: KC
    position: WR
    game: { game_id: 1, home: KC, away: BUF }
    projection:
      floor: 0.0
      ceiling: 40.0
      anchors:
        - { prob: 0.5, value: 11.0 }
opponent: { type: league_average, mean: 115.0, std_dev: 25.0 }
"#;
        let error = scenario_from_str(raw).unwrap_err();
        assert!(matches!(
            error,
            ScenarioError::Fit {
                error: FitError::TooFewAnchors { got: 1 },
                ..
            }
        ));
    }

    #[test]
    fn roster_opponent_is_converted_recursively() {
        let raw = r#"
players:
  - id: 1
    name: QB One
    team: KC
    position: QB
    game: { game_id: 1, home: KC, away: BUF }
    projection: { mean: 21.0, spread: 7.0, floor: 0.0, ceiling: 55.0 }
opponent:
  type: roster
  players:
    - id: 100
      name: Opposing QB
      team: BUF
      position: QB
      game: { game_id: 1, home: KC, away: BUF }
      projection: { mean: 19.0, spread: 6.0, floor: 0.0, ceiling: 50.0 }
"#;
        let scenario = scenario_from_str(raw).unwrap();
        let opposing = scenario.opponent.roster().unwrap();
        assert_eq!(opposing.len(), 1);
        assert_eq!(opposing[0].id, 100);
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let error = scenario_from_str("players: [not a map").unwrap_err();
        assert!(matches!(error, ScenarioError::Parse(_)));
    }
}
