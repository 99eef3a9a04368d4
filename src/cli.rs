//! Command-line dispatch. Thin adapter over the library: loads a scenario,
//! runs the requested stage, and prints pretty JSON on stdout. Exit codes:
//! 0 success, 1 runtime failure, 2 usage error.

use serde::Serialize;

use crate::calibration::records::{load_matchup_records, summarize_records};
use crate::config::VarianceReduction;
use crate::corr::{CopulaSampler, FactorModel, NormalSource};
use crate::dist::TruncatedNormal;
use crate::optimizer::oracle::exhaustive_best;
use crate::optimizer::{optimize, OptimizationReport, OptimizationRequest};
use crate::roster::scenario::{load_scenario, Scenario};
use crate::roster::validate::validate_scenario;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Optimize,
    Simulate,
    Oracle,
    Validate,
    Calibrate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("optimize") => Some(Command::Optimize),
        Some("simulate") => Some(Command::Simulate),
        Some("oracle") => Some(Command::Oracle),
        Some("validate") => Some(Command::Validate),
        Some("calibrate") => Some(Command::Calibrate),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    match parse_command(args) {
        Some(Command::Optimize) => handle_optimize(args),
        Some(Command::Simulate) => handle_simulate(args),
        Some(Command::Oracle) => handle_oracle(args),
        Some(Command::Validate) => handle_validate(args),
        Some(Command::Calibrate) => handle_calibrate(args),
        None => {
            eprintln!("usage: gridiron <optimize|simulate|oracle|validate|calibrate>");
            2
        }
    }
}

#[derive(Debug, Serialize)]
struct OptimizeOutput {
    scenario: Option<String>,
    generated_at: String,
    #[serde(flatten)]
    report: OptimizationReport,
}

fn handle_optimize(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: gridiron optimize <scenario.yaml> [max_simulations]");
        return 2;
    };

    let mut scenario = match load_checked_scenario(path) {
        Ok(scenario) => scenario,
        Err(code) => return code,
    };
    if let Some(max) = args.get(3) {
        scenario.config.max_simulations = parse_usize_arg(
            Some(max),
            "max_simulations",
            scenario.config.max_simulations,
        );
    }
    resolve_seed(&mut scenario);

    let request = OptimizationRequest {
        roster: &scenario.roster,
        requirement: &scenario.requirement,
        opponent: &scenario.opponent,
        config: &scenario.config,
    };
    let report = match optimize(&request) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("optimization failed: {err}");
            return 1;
        }
    };

    let output = OptimizeOutput {
        scenario: scenario.name.clone(),
        generated_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        report,
    };
    print_json(&output)
}

#[derive(Debug, Serialize)]
struct SimulatePlayerSummary {
    player_id: u32,
    name: String,
    sample_mean: f64,
    sample_std_dev: f64,
    p5: f64,
    p95: f64,
}

#[derive(Debug, Serialize)]
struct SimulateOutput {
    scenario: Option<String>,
    draws: usize,
    seed: u64,
    total_mean: f64,
    total_std_dev: f64,
    players: Vec<SimulatePlayerSummary>,
}

/// Draw correlated roster samples and summarize them; a quick way to eyeball
/// whether projections and correlations look sane before optimizing.
fn handle_simulate(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: gridiron simulate <scenario.yaml> [draws] [seed]");
        return 2;
    };
    let draws = parse_usize_arg(args.get(3), "draws", 1_000).max(1);

    let mut scenario = match load_checked_scenario(path) {
        Ok(scenario) => scenario,
        Err(code) => return code,
    };
    if let Some(seed) = args.get(4) {
        scenario.config.base_seed = Some(parse_u64_arg(Some(seed), "seed", 0));
    }
    resolve_seed(&mut scenario);
    let seed = scenario.config.resolved_seed();

    let startable: Vec<&crate::roster::player::PlayerScore> = scenario
        .roster
        .iter()
        .filter(|p| p.status.startable())
        .collect();
    let model = FactorModel::for_players(&startable, &scenario.config.correlation);
    let dists: Vec<&TruncatedNormal> = startable.iter().map(|p| &p.projection).collect();
    let sampler = CopulaSampler::new(&model, dists);
    let mut source = NormalSource::new(VarianceReduction::None, sampler.draw_dimension(), seed);

    let mut per_player: Vec<Vec<f64>> = vec![Vec::with_capacity(draws); startable.len()];
    let mut totals: Vec<f64> = Vec::with_capacity(draws);
    let mut scores = Vec::with_capacity(startable.len());
    for normals in source.next_batch(draws) {
        sampler.scores_from_normals(&normals, &mut scores);
        totals.push(scores.iter().sum());
        for (column, score) in per_player.iter_mut().zip(&scores) {
            column.push(*score);
        }
    }

    let players = startable
        .iter()
        .zip(per_player.iter_mut())
        .map(|(player, samples)| {
            samples.sort_by(f64::total_cmp);
            let (mean, std_dev) = mean_and_std(samples);
            SimulatePlayerSummary {
                player_id: player.id,
                name: player.name.clone(),
                sample_mean: mean,
                sample_std_dev: std_dev,
                p5: sorted_quantile(samples, 0.05),
                p95: sorted_quantile(samples, 0.95),
            }
        })
        .collect();
    let (total_mean, total_std_dev) = mean_and_std(&totals);

    print_json(&SimulateOutput {
        scenario: scenario.name.clone(),
        draws,
        seed,
        total_mean,
        total_std_dev,
        players,
    })
}

#[derive(Debug, Serialize)]
struct OracleOutput {
    scenario: Option<String>,
    lineups_enumerated: usize,
    player_ids: Vec<u32>,
    win_probability: f64,
    expected_margin: f64,
    simulations: usize,
}

fn handle_oracle(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: gridiron oracle <scenario.yaml>");
        return 2;
    };

    let mut scenario = match load_checked_scenario(path) {
        Ok(scenario) => scenario,
        Err(code) => return code,
    };
    resolve_seed(&mut scenario);

    let result = exhaustive_best(
        &scenario.roster,
        &scenario.requirement,
        &scenario.opponent,
        &scenario.config,
        scenario.config.resolved_seed(),
    );
    let Some(result) = result else {
        eprintln!("oracle found no feasible lineup (roster too large or infeasible)");
        return 1;
    };

    print_json(&OracleOutput {
        scenario: scenario.name.clone(),
        lineups_enumerated: result.lineups_enumerated,
        player_ids: result.candidate.sorted_player_ids(&scenario.roster),
        win_probability: result.outcome.win_probability,
        expected_margin: result.outcome.expected_margin,
        simulations: result.outcome.simulations,
    })
}

fn handle_validate(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: gridiron validate <scenario.yaml>");
        return 2;
    };

    let scenario = match load_scenario(path) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("cannot load scenario: {err}");
            return 1;
        }
    };

    let report = validate_scenario(&scenario);
    if report.diagnostics.is_empty() {
        println!("validation passed: {path}");
        return 0;
    }
    for diagnostic in &report.diagnostics {
        println!("- {diagnostic}");
    }
    if report.has_errors() {
        eprintln!(
            "validation failed: {} diagnostic(s)",
            report.diagnostics.len()
        );
        1
    } else {
        println!("validation passed with warnings: {path}");
        0
    }
}

fn handle_calibrate(args: &[String]) -> i32 {
    let Some(path) = args.get(2) else {
        eprintln!("usage: gridiron calibrate <records.csv>");
        return 2;
    };

    let records = match load_matchup_records(path) {
        Ok(records) => records,
        Err(err) => {
            eprintln!("cannot load records: {err}");
            return 1;
        }
    };
    print_json(&summarize_records(&records))
}

fn load_checked_scenario(path: &str) -> Result<Scenario, i32> {
    let scenario = match load_scenario(path) {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("cannot load scenario: {err}");
            return Err(1);
        }
    };
    let report = validate_scenario(&scenario);
    if report.has_errors() {
        for diagnostic in &report.diagnostics {
            eprintln!("- {diagnostic}");
        }
        return Err(1);
    }
    Ok(scenario)
}

/// Fill in a missing base seed from OS entropy and tell the user, so the run
/// stays reproducible after the fact.
fn resolve_seed(scenario: &mut Scenario) {
    if scenario.config.base_seed.is_none() {
        let seed = entropy_seed();
        eprintln!("no base seed in scenario; using entropy seed {seed}");
        scenario.config.base_seed = Some(seed);
    }
}

fn entropy_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(_) => 0,
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize output: {err}");
            1
        }
    }
}

fn mean_and_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    if samples.len() < 2 {
        return (mean, 0.0);
    }
    let variance = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>()
        / (samples.len() - 1) as f64;
    (mean, variance.sqrt())
}

fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let position = q * (sorted.len() - 1) as f64;
    let low = position.floor() as usize;
    let high = position.ceil() as usize;
    if low == high {
        return sorted[low];
    }
    let fraction = position - low as f64;
    sorted[low] + fraction * (sorted[high] - sorted[low])
}

fn parse_usize_arg(raw: Option<&String>, name: &str, default: usize) -> usize {
    raw.and_then(|value| value.parse::<usize>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}

fn parse_u64_arg(raw: Option<&String>, name: &str, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .unwrap_or_else(|| {
            if let Some(value) = raw {
                eprintln!("invalid {name} '{value}', defaulting to {default}");
            }
            default
        })
}
