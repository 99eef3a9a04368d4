//! Distributional properties of the correlation model and copula sampler:
//! marginals survive the correlation structure, and the implied correlation
//! matrix is positive semi-definite without repair.

use gridiron::config::CorrelationConfig;
use gridiron::corr::{min_eigenvalue, CopulaSampler, FactorModel, MAX_EXPLAINED_VARIANCE};
use gridiron::dist::TruncatedNormal;
use gridiron::rng::Rng;
use gridiron::roster::player::{GameInfo, HealthStatus, PlayerScore, Position};

fn player(id: u32, team: &str, position: Position, mean: f64, spread: f64) -> PlayerScore {
    PlayerScore {
        id,
        name: format!("Player {id}"),
        team: team.to_string(),
        position,
        status: HealthStatus::Healthy,
        projection: TruncatedNormal::new(mean, spread, 0.0, mean * 2.5 + 25.0).unwrap(),
        game: GameInfo {
            game_id: u32::from(team.as_bytes()[0]),
            home: team.to_string(),
            away: "OPP".to_string(),
            kickoff: None,
        },
    }
}

fn lineup_scope() -> Vec<PlayerScore> {
    vec![
        player(1, "KC", Position::Qb, 21.0, 6.0),
        player(2, "KC", Position::Wr, 13.0, 5.0),
        player(3, "KC", Position::Wr, 10.0, 4.5),
        player(4, "KC", Position::Te, 9.0, 4.0),
        player(5, "SF", Position::Rb, 14.0, 5.0),
        player(6, "SF", Position::Wr, 12.0, 5.5),
        player(7, "DAL", Position::Rb, 11.0, 4.0),
        player(8, "DAL", Position::K, 8.0, 2.5),
        player(9, "BUF", Position::Dst, 7.0, 4.0),
    ]
}

#[test]
fn copula_preserves_each_marginal_within_ks_tolerance() {
    let players = lineup_scope();
    let refs: Vec<&PlayerScore> = players.iter().collect();
    let model = FactorModel::for_players(&refs, &CorrelationConfig::default());
    let dists: Vec<&TruncatedNormal> = players.iter().map(|p| &p.projection).collect();
    let sampler = CopulaSampler::new(&model, dists);

    let draws = 12_000;
    let mut rng = Rng::new(314159);
    let mut samples: Vec<Vec<f64>> = vec![Vec::with_capacity(draws); players.len()];
    for _ in 0..draws {
        let scores = sampler.draw(&mut rng);
        for (column, score) in samples.iter_mut().zip(&scores) {
            column.push(*score);
        }
    }

    for (column, p) in samples.iter_mut().zip(&players) {
        column.sort_by(f64::total_cmp);
        // Kolmogorov-Smirnov statistic of the empirical CDF against the
        // player's truncated-normal CDF.
        let mut ks: f64 = 0.0;
        for (i, &value) in column.iter().enumerate() {
            let theoretical = p.projection.cdf(value);
            let below = i as f64 / draws as f64;
            let above = (i + 1) as f64 / draws as f64;
            ks = ks
                .max((theoretical - below).abs())
                .max((theoretical - above).abs());
        }
        assert!(
            ks < 0.03,
            "player {} KS statistic {ks} exceeds tolerance",
            p.id
        );
    }
}

#[test]
fn loading_norms_stay_under_one_without_repair() {
    let players = lineup_scope();
    let refs: Vec<&PlayerScore> = players.iter().collect();

    // Even with aggressive team-strength multipliers the cap holds.
    let mut config = CorrelationConfig::default();
    config.team_strength.insert("KC".to_string(), 2.0);
    config.team_strength.insert("SF".to_string(), 3.5);
    let model = FactorModel::for_players(&refs, &config);

    assert!(model.max_loading_norm_sq() <= MAX_EXPLAINED_VARIANCE + 1e-12);
    for i in 0..model.player_count() {
        assert!(model.residual_variance(i) >= 0.0);
    }
}

#[test]
fn implied_correlation_matrix_is_psd_by_construction() {
    let players = lineup_scope();
    let refs: Vec<&PlayerScore> = players.iter().collect();

    for (label, config) in [
        ("default", CorrelationConfig::default()),
        (
            "boosted",
            CorrelationConfig {
                qb_vs_dst: 0.9,
                wr_cannibalization: 0.8,
                cross_lineup: 0.7,
                ..CorrelationConfig::default()
            },
        ),
    ] {
        let single = FactorModel::for_players(&refs, &config);
        let joint = FactorModel::joint(&refs, &config);
        for (mode, model) in [("single", &single), ("joint", &joint)] {
            let matrix = model.correlation_matrix();
            let smallest = min_eigenvalue(&matrix).unwrap();
            assert!(
                smallest >= -1e-9,
                "{label}/{mode}: min eigenvalue {smallest} below PSD tolerance"
            );
        }
    }
}

#[test]
fn joint_sampling_shares_the_game_environment() {
    // Two opposing QBs in the same game should co-move through the pace and
    // cross-lineup factors in joint mode.
    let mut home_qb = player(1, "KC", Position::Qb, 21.0, 6.0);
    let mut away_qb = player(2, "BUF", Position::Qb, 19.0, 6.0);
    home_qb.game = GameInfo {
        game_id: 42,
        home: "KC".to_string(),
        away: "BUF".to_string(),
        kickoff: None,
    };
    away_qb.game = home_qb.game.clone();
    let players = vec![home_qb, away_qb];
    let refs: Vec<&PlayerScore> = players.iter().collect();

    let model = FactorModel::joint(&refs, &CorrelationConfig::default());
    let dists: Vec<&TruncatedNormal> = players.iter().map(|p| &p.projection).collect();
    let sampler = CopulaSampler::new(&model, dists);

    let mut rng = Rng::new(2718);
    let n = 10_000;
    let (mut sum_a, mut sum_b, mut sq_a, mut sq_b, mut cross) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for _ in 0..n {
        let scores = sampler.draw(&mut rng);
        sum_a += scores[0];
        sum_b += scores[1];
        sq_a += scores[0] * scores[0];
        sq_b += scores[1] * scores[1];
        cross += scores[0] * scores[1];
    }
    let mean_a = sum_a / n as f64;
    let mean_b = sum_b / n as f64;
    let var_a = sq_a / n as f64 - mean_a * mean_a;
    let var_b = sq_b / n as f64 - mean_b * mean_b;
    let correlation = (cross / n as f64 - mean_a * mean_b) / (var_a * var_b).sqrt();
    assert!(
        correlation > 0.05,
        "opposing QBs in one game should be positively correlated, got {correlation}"
    );
}
