//! End-to-end pipeline tests: candidate generation, screening, and Monte
//! Carlo refinement against a league-average opponent.

use gridiron::config::OptimizerConfig;
use gridiron::dist::TruncatedNormal;
use gridiron::opponent::OpponentModel;
use gridiron::optimizer::{optimize, OptimizationRequest, OptimizeError};
use gridiron::roster::player::{GameInfo, HealthStatus, PlayerScore, Position};
use gridiron::roster::requirement::RosterRequirement;

fn player(id: u32, team: &str, position: Position, mean: f64, spread: f64) -> PlayerScore {
    PlayerScore {
        id,
        name: format!("Player {id}"),
        team: team.to_string(),
        position,
        status: HealthStatus::Healthy,
        projection: TruncatedNormal::new(mean, spread, 0.0, mean * 3.0 + 30.0).unwrap(),
        game: GameInfo {
            game_id: u32::from(team.as_bytes()[0]),
            home: team.to_string(),
            away: format!("OPP{}", team.as_bytes()[0] % 3),
            kickoff: None,
        },
    }
}

/// The 15-player roster from the concrete acceptance scenario:
/// 2 QB, 4 RB, 5 WR, 2 TE, 1 K, 1 DST.
fn fifteen_player_roster() -> Vec<PlayerScore> {
    vec![
        player(1, "KC", Position::Qb, 22.0, 6.0),
        player(2, "DAL", Position::Qb, 18.0, 7.0),
        player(3, "KC", Position::Rb, 16.0, 5.0),
        player(4, "SF", Position::Rb, 14.0, 4.5),
        player(5, "DAL", Position::Rb, 11.0, 5.5),
        player(6, "MIA", Position::Rb, 8.0, 4.0),
        player(7, "SF", Position::Wr, 15.0, 6.0),
        player(8, "KC", Position::Wr, 13.0, 5.0),
        player(9, "MIA", Position::Wr, 12.0, 6.5),
        player(10, "DAL", Position::Wr, 10.0, 4.0),
        player(11, "SF", Position::Wr, 7.0, 5.0),
        player(12, "KC", Position::Te, 11.0, 4.0),
        player(13, "MIA", Position::Te, 7.0, 3.5),
        player(14, "DAL", Position::K, 8.0, 2.5),
        player(15, "SF", Position::Dst, 7.0, 4.5),
    ]
}

fn requirement() -> RosterRequirement {
    RosterRequirement {
        qb: 1,
        rb: 2,
        wr: 2,
        te: 1,
        k: 1,
        dst: 1,
        flex: 1,
        bench: 7,
    }
}

fn test_config(max_simulations: usize) -> OptimizerConfig {
    OptimizerConfig {
        min_simulations: 500,
        max_simulations,
        simulation_batch: 500,
        target_std_error: 0.0, // run to the cap for exact reproducibility
        evaluation_cap: 12,
        // Wide enough that the global beam cap never prunes on this roster,
        // so the DP is exact and order effects cannot creep in.
        candidate_cap: 4_096,
        base_seed: Some(1234),
        ..OptimizerConfig::default()
    }
}

#[test]
fn concrete_scenario_returns_valid_lineup_and_ladder() {
    let roster = fifteen_player_roster();
    let requirement = requirement();
    let opponent = OpponentModel::league_average(115.0, 25.0);
    let config = test_config(5_000);
    let request = OptimizationRequest {
        roster: &roster,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    };

    let report = optimize(&request).unwrap();

    assert_eq!(
        report.best.players.len(),
        requirement.starters(),
        "lineup size = sum of primary counts + FLEX"
    );
    assert!(
        report.best.win_probability > 0.0 && report.best.win_probability < 1.0,
        "win probability {} must be strictly inside (0, 1)",
        report.best.win_probability
    );
    let p = report.best.percentiles;
    assert!(
        p.p5 < p.p25 && p.p25 < p.p50 && p.p50 < p.p75 && p.p75 < p.p95,
        "percentile ladder must strictly increase: {p:?}"
    );
    assert!(report.diagnostics.simulations_total > 0);
    assert!(report.diagnostics.candidates_generated >= report.diagnostics.candidates_evaluated);
}

#[test]
fn rerunning_with_same_seed_is_bit_identical() {
    let roster = fifteen_player_roster();
    let requirement = requirement();
    let opponent = OpponentModel::league_average(115.0, 25.0);
    let config = test_config(3_000);
    let request = OptimizationRequest {
        roster: &roster,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    };

    let first = optimize(&request).unwrap();
    let second = optimize(&request).unwrap();

    // Bit-identical results, checked through the serialized form.
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn roster_order_does_not_change_the_selected_lineup() {
    let forward = fifteen_player_roster();
    let mut reversed = forward.clone();
    reversed.reverse();
    let requirement = requirement();
    let opponent = OpponentModel::league_average(115.0, 25.0);
    let config = test_config(5_000);

    let report_forward = optimize(&OptimizationRequest {
        roster: &forward,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    })
    .unwrap();
    let report_reversed = optimize(&OptimizationRequest {
        roster: &reversed,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    })
    .unwrap();

    let ids = |report: &gridiron::optimizer::OptimizationReport| {
        let mut ids: Vec<u32> = report.best.players.iter().map(|p| p.player_id).collect();
        ids.sort_unstable();
        ids
    };
    assert_eq!(ids(&report_forward), ids(&report_reversed));
    assert!(
        (report_forward.best.win_probability - report_reversed.best.win_probability).abs() < 0.03,
        "win probabilities {} vs {} should agree within Monte Carlo noise",
        report_forward.best.win_probability,
        report_reversed.best.win_probability
    );
}

#[test]
fn every_ranked_lineup_satisfies_the_requirement() {
    let roster = fifteen_player_roster();
    let requirement = requirement();
    let opponent = OpponentModel::league_average(115.0, 25.0);
    let config = test_config(1_000);
    let report = optimize(&OptimizationRequest {
        roster: &roster,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    })
    .unwrap();

    for ranked in &report.ranked {
        assert_eq!(ranked.players.len(), requirement.starters());
        let mut primary = [0usize; 6];
        let mut flex = 0usize;
        for entry in &ranked.players {
            if entry.slot == "FLEX" {
                flex += 1;
                assert!(matches!(entry.position, "RB" | "WR" | "TE"));
            } else {
                assert_eq!(entry.slot, entry.position);
                let index = match entry.position {
                    "QB" => 0,
                    "RB" => 1,
                    "WR" => 2,
                    "TE" => 3,
                    "K" => 4,
                    _ => 5,
                };
                primary[index] += 1;
            }
        }
        assert_eq!(primary, [1, 2, 2, 1, 1, 1]);
        assert_eq!(flex, 1);
    }
}

#[test]
fn realized_std_error_is_non_increasing_in_the_simulation_cap() {
    let roster = fifteen_player_roster();
    let requirement = requirement();
    let opponent = OpponentModel::league_average(115.0, 25.0);

    let mut previous = f64::INFINITY;
    for cap in [1_000, 5_000, 10_000] {
        let config = test_config(cap);
        let report = optimize(&OptimizationRequest {
            roster: &roster,
            requirement: &requirement,
            opponent: &opponent,
            config: &config,
        })
        .unwrap();
        let se = report.diagnostics.realized_std_error;
        assert!(
            se <= previous,
            "realized std error rose from {previous} to {se} at cap {cap}"
        );
        previous = se;
    }
}

#[test]
fn analytic_and_monte_carlo_probabilities_roughly_agree() {
    // Against a league-average opponent the correlation adjustment is modest,
    // so the sanity comparison in the diagnostics should be close.
    let roster = fifteen_player_roster();
    let requirement = requirement();
    let opponent = OpponentModel::league_average(95.0, 22.0);
    let config = test_config(10_000);
    let report = optimize(&OptimizationRequest {
        roster: &roster,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    })
    .unwrap();

    let gap = (report.diagnostics.analytic_win_probability
        - report.diagnostics.monte_carlo_win_probability)
        .abs();
    assert!(gap < 0.10, "screen and simulation diverged by {gap}");
}

#[test]
fn missing_position_fails_loudly_not_with_a_partial_lineup() {
    let mut roster = fifteen_player_roster();
    roster.retain(|p| p.position != Position::K);
    let requirement = requirement();
    let opponent = OpponentModel::league_average(115.0, 25.0);
    let config = test_config(1_000);
    let error = optimize(&OptimizationRequest {
        roster: &roster,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    })
    .unwrap_err();
    assert!(matches!(
        error,
        OptimizeError::InfeasibleRoster {
            position: "K",
            required: 1,
            available: 0,
        }
    ));
}

#[test]
fn joint_simulation_against_known_roster_produces_a_report() {
    let roster = fifteen_player_roster();
    let requirement = requirement();
    let opposing: Vec<PlayerScore> = vec![
        player(101, "PHI", Position::Qb, 20.0, 6.0),
        player(102, "PHI", Position::Rb, 13.0, 5.0),
        player(103, "NYJ", Position::Rb, 12.0, 4.0),
        player(104, "PHI", Position::Wr, 14.0, 6.0),
        player(105, "NYJ", Position::Wr, 11.0, 5.0),
        player(106, "NYJ", Position::Te, 9.0, 4.0),
        player(107, "PHI", Position::K, 8.0, 2.5),
        player(108, "NYJ", Position::Dst, 6.0, 4.0),
    ];
    let opponent = OpponentModel::Roster { players: opposing };
    let config = test_config(3_000);
    let report = optimize(&OptimizationRequest {
        roster: &roster,
        requirement: &requirement,
        opponent: &opponent,
        config: &config,
    })
    .unwrap();

    assert!(report.best.win_probability > 0.0 && report.best.win_probability < 1.0);
    let p = report.best.percentiles;
    assert!(p.p5 < p.p50 && p.p50 < p.p95);
}
