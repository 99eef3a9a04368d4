//! Scenario validation: severity-tagged diagnostics for roster and matchup
//! inputs before an optimization run. Errors here mean the optimizer would
//! reject or mangle the input; warnings flag degraded quality (non-converged
//! fits, injured players); info is advisory.

use std::collections::HashSet;
use std::fmt;

use crate::roster::player::{PlayerScore, Position, PRIMARY_SLOTS};
use crate::roster::requirement::RosterRequirement;
use crate::roster::scenario::Scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }
}

pub fn validate_scenario(scenario: &Scenario) -> ValidationReport {
    let mut report = ValidationReport::default();

    validate_roster(&scenario.roster, &scenario.requirement, &mut report);

    for id in &scenario.non_converged_fits {
        report.push(
            ValidationSeverity::Warning,
            format!("player {id}"),
            "projection anchor fit did not converge; best-effort parameters in use",
        );
    }

    if let Some(opposing) = scenario.opponent.roster() {
        if opposing.is_empty() {
            report.push(
                ValidationSeverity::Error,
                "opponent",
                "roster opponent has no players",
            );
        }
        let ours: HashSet<u32> = scenario.roster.iter().map(|p| p.id).collect();
        for player in opposing {
            if ours.contains(&player.id) {
                report.push(
                    ValidationSeverity::Warning,
                    "opponent",
                    format!("player id {} appears on both rosters", player.id),
                );
            }
        }
    }

    if scenario.config.min_simulations > scenario.config.max_simulations {
        report.push(
            ValidationSeverity::Error,
            "config",
            format!(
                "min_simulations {} exceeds max_simulations {}",
                scenario.config.min_simulations, scenario.config.max_simulations
            ),
        );
    }

    report
}

fn validate_roster(
    roster: &[PlayerScore],
    requirement: &RosterRequirement,
    report: &mut ValidationReport,
) {
    if roster.is_empty() {
        report.push(ValidationSeverity::Error, "roster", "no players supplied");
        return;
    }

    let mut seen = HashSet::new();
    for player in roster {
        if !seen.insert(player.id) {
            report.push(
                ValidationSeverity::Error,
                "roster",
                format!("duplicate player id {}", player.id),
            );
        }
        if player.team != player.game.home && player.team != player.game.away {
            report.push(
                ValidationSeverity::Error,
                format!("player {}", player.id),
                format!(
                    "team '{}' is neither side of game {} ({} vs {})",
                    player.team, player.game.game_id, player.game.home, player.game.away
                ),
            );
        }
        if player.game.kickoff.is_some() && player.game.kickoff_time().is_none() {
            report.push(
                ValidationSeverity::Warning,
                format!("player {}", player.id),
                "kickoff timestamp is not valid RFC 3339",
            );
        }
        if !player.status.startable() {
            report.push(
                ValidationSeverity::Info,
                format!("player {}", player.id),
                "listed as out; excluded from lineups",
            );
        }
    }

    if requirement.starters() == 0 {
        report.push(
            ValidationSeverity::Error,
            "requirement",
            "requirement has zero starters",
        );
    }

    let mut available = [0usize; PRIMARY_SLOTS];
    for player in roster {
        if player.status.startable() {
            available[player.position.index()] += 1;
        }
    }
    let required = requirement.primary_counts();
    for position in Position::ALL {
        let slot = position.index();
        if available[slot] < required[slot] as usize {
            report.push(
                ValidationSeverity::Error,
                "roster",
                format!(
                    "{} requires {} startable, found {}",
                    position.as_str(),
                    required[slot],
                    available[slot]
                ),
            );
        }
    }
}
