pub mod player;
pub mod requirement;
pub mod scenario;
pub mod validate;

pub use player::{GameInfo, HealthStatus, PlayerScore, Position, PRIMARY_SLOTS};
pub use requirement::{LineupState, RosterRequirement};
pub use scenario::{load_scenario, scenario_from_str, Scenario, ScenarioError};
pub use validate::{validate_scenario, ValidationReport, ValidationSeverity};
