//! Latent-factor correlation model.
//!
//! Each simulation scope (one lineup, or two lineups for joint simulation)
//! gets a small factor space: a pass and a rush factor per team present, a
//! pace factor per distinct game, a target-share factor per team fielding
//! multiple WRs, and — in joint mode — one cross-lineup environment factor.
//! Players receive loading vectors scaled so the squared norm equals their
//! position's explained-variance target (adjusted by team strength, capped
//! below 1), which makes Sigma = Lambda Lambda^T + D positive semi-definite
//! by construction. No repair pass runs on this path; [crate::corr::psd]
//! exists only for externally supplied matrices.

use std::collections::HashMap;

use crate::config::CorrelationConfig;
use crate::roster::player::{PlayerScore, Position, PRIMARY_SLOTS};

/// Ceiling on any player's squared loading norm. Keeps every residual
/// variance strictly positive even for boosted team-strength multipliers.
pub const MAX_EXPLAINED_VARIANCE: f64 = 0.98;

/// Raw (pass, rush, pace) affinities per position, indexed by
/// [Position::index]. Direction only; magnitude comes from the
/// explained-variance rescale.
const POSITION_AFFINITY: [(f64, f64, f64); PRIMARY_SLOTS] = [
    (0.85, 0.25, 0.45),  // QB
    (0.20, 0.80, 0.35),  // RB
    (0.75, 0.10, 0.40),  // WR
    (0.55, 0.15, 0.35),  // TE
    (0.35, 0.30, 0.50),  // K
    (0.10, 0.20, -0.50), // DST: scores fade in fast, high-scoring games
];

/// Fraction of each position's score variance explained by shared factors.
const POSITION_EXPLAINED_VARIANCE: [f64; PRIMARY_SLOTS] = [0.45, 0.35, 0.40, 0.30, 0.15, 0.25];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum FactorKey {
    TeamPass(String),
    TeamRush(String),
    GamePace(u32),
    TargetShare(String),
    CrossLineup,
}

/// Loadings and residual variances for one simulation scope. Row order
/// matches the player order handed to the constructor.
#[derive(Debug, Clone)]
pub struct FactorModel {
    factor_count: usize,
    loadings: Vec<Vec<f64>>,
    residual: Vec<f64>,
}

impl FactorModel {
    /// Factor model for a single lineup scope.
    pub fn for_players(players: &[&PlayerScore], config: &CorrelationConfig) -> Self {
        Self::build(players, config, false)
    }

    /// Factor model spanning both lineups of a matchup. The first
    /// `lineup_len` rows belong to the candidate lineup, the rest to the
    /// opponent; all players share game factors plus the cross-lineup
    /// environment factor.
    pub fn joint(players: &[&PlayerScore], config: &CorrelationConfig) -> Self {
        Self::build(players, config, true)
    }

    fn build(players: &[&PlayerScore], config: &CorrelationConfig, cross_lineup: bool) -> Self {
        let mut index: HashMap<FactorKey, usize> = HashMap::new();
        let mut factor_count = 0usize;
        let intern = |key: FactorKey, count: &mut usize, index: &mut HashMap<FactorKey, usize>| {
            *index.entry(key).or_insert_with(|| {
                let id = *count;
                *count += 1;
                id
            })
        };

        // Interning pass: one pass+rush factor per team present, one pace
        // factor per distinct game, a target-share factor per team with two
        // or more WRs.
        let mut wr_counts: HashMap<&str, usize> = HashMap::new();
        for player in players {
            if player.position == Position::Wr {
                *wr_counts.entry(player.team.as_str()).or_insert(0) += 1;
            }
        }
        for player in players {
            intern(
                FactorKey::TeamPass(player.team.clone()),
                &mut factor_count,
                &mut index,
            );
            intern(
                FactorKey::TeamRush(player.team.clone()),
                &mut factor_count,
                &mut index,
            );
            intern(
                FactorKey::GamePace(player.game.game_id),
                &mut factor_count,
                &mut index,
            );
            if player.position == Position::Wr
                && wr_counts.get(player.team.as_str()).copied().unwrap_or(0) >= 2
            {
                intern(
                    FactorKey::TargetShare(player.team.clone()),
                    &mut factor_count,
                    &mut index,
                );
            }
        }
        if cross_lineup {
            intern(FactorKey::CrossLineup, &mut factor_count, &mut index);
        }

        let mut loadings = Vec::with_capacity(players.len());
        let mut residual = Vec::with_capacity(players.len());
        let mut wr_rank: HashMap<&str, usize> = HashMap::new();

        for player in players {
            let mut row = vec![0.0; factor_count];
            let (pass, rush, pace) = POSITION_AFFINITY[player.position.index()];

            row[index[&FactorKey::TeamPass(player.team.clone())]] += pass;
            row[index[&FactorKey::TeamRush(player.team.clone())]] += rush;
            row[index[&FactorKey::GamePace(player.game.game_id)]] += pace;

            // DST anticorrelation with the opposing passing game, when the
            // opposing offense is actually in scope.
            if player.position == Position::Dst {
                if let Some(&slot) =
                    index.get(&FactorKey::TeamPass(player.opposing_team().to_string()))
                {
                    row[slot] -= config.qb_vs_dst;
                }
            }

            // Same-team WR cannibalization: alternating-sign target-share
            // loadings give WR pairs a negative shared-factor contribution.
            if player.position == Position::Wr {
                if let Some(&slot) = index.get(&FactorKey::TargetShare(player.team.clone())) {
                    let rank = wr_rank.entry(player.team.as_str()).or_insert(0);
                    let sign = if *rank % 2 == 0 { 1.0 } else { -1.0 };
                    *rank += 1;
                    row[slot] += sign * config.wr_cannibalization;
                }
            }

            if cross_lineup {
                row[index[&FactorKey::CrossLineup]] += config.cross_lineup;
            }

            // Rescale so the squared norm hits the explained-variance target.
            let target = (POSITION_EXPLAINED_VARIANCE[player.position.index()]
                * config.team_strength(&player.team))
            .clamp(0.0, MAX_EXPLAINED_VARIANCE);
            let raw_norm_sq: f64 = row.iter().map(|w| w * w).sum();
            if raw_norm_sq > 0.0 {
                let scale = (target / raw_norm_sq).sqrt();
                for weight in &mut row {
                    *weight *= scale;
                }
            }

            let norm_sq: f64 = row.iter().map(|w| w * w).sum();
            residual.push((1.0 - norm_sq).max(0.0));
            loadings.push(row);
        }

        Self {
            factor_count,
            loadings,
            residual,
        }
    }

    pub fn factor_count(&self) -> usize {
        self.factor_count
    }

    pub fn player_count(&self) -> usize {
        self.loadings.len()
    }

    /// Total input dimensionality of one draw: shared factors plus one
    /// residual per player.
    pub fn draw_dimension(&self) -> usize {
        self.factor_count + self.loadings.len()
    }

    pub fn loadings(&self, player: usize) -> &[f64] {
        &self.loadings[player]
    }

    pub fn residual_variance(&self, player: usize) -> f64 {
        self.residual[player]
    }

    /// Implied latent correlation between two players: dot product of their
    /// loading rows (diagonal is 1 by the residual construction).
    pub fn correlation(&self, a: usize, b: usize) -> f64 {
        if a == b {
            return 1.0;
        }
        self.loadings[a]
            .iter()
            .zip(&self.loadings[b])
            .map(|(x, y)| x * y)
            .sum()
    }

    /// Full implied correlation matrix Lambda Lambda^T + D.
    pub fn correlation_matrix(&self) -> Vec<Vec<f64>> {
        let n = self.loadings.len();
        (0..n)
            .map(|i| (0..n).map(|j| self.correlation(i, j)).collect())
            .collect()
    }

    /// Largest squared loading norm across players; always <= the
    /// [MAX_EXPLAINED_VARIANCE] ceiling.
    pub fn max_loading_norm_sq(&self) -> f64 {
        self.loadings
            .iter()
            .map(|row| row.iter().map(|w| w * w).sum::<f64>())
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::TruncatedNormal;
    use crate::roster::player::{GameInfo, HealthStatus};

    fn player(id: u32, team: &str, position: Position, game_id: u32, home: &str, away: &str) -> PlayerScore {
        PlayerScore {
            id,
            name: format!("P{id}"),
            team: team.to_string(),
            position,
            status: HealthStatus::Healthy,
            projection: TruncatedNormal::new(12.0, 5.0, 0.0, 40.0).unwrap(),
            game: GameInfo {
                game_id,
                home: home.to_string(),
                away: away.to_string(),
                kickoff: None,
            },
        }
    }

    fn sample_scope() -> Vec<PlayerScore> {
        vec![
            player(1, "KC", Position::Qb, 1, "KC", "BUF"),
            player(2, "KC", Position::Wr, 1, "KC", "BUF"),
            player(3, "KC", Position::Wr, 1, "KC", "BUF"),
            player(4, "BUF", Position::Rb, 1, "KC", "BUF"),
            player(5, "BUF", Position::Dst, 1, "KC", "BUF"),
            player(6, "DAL", Position::Te, 2, "DAL", "PHI"),
        ]
    }

    #[test]
    fn loading_norms_never_exceed_the_cap() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let mut config = CorrelationConfig::default();
        config.team_strength.insert("KC".to_string(), 5.0); // absurd boost
        let model = FactorModel::for_players(&refs, &config);
        assert!(model.max_loading_norm_sq() <= MAX_EXPLAINED_VARIANCE + 1e-12);
        for i in 0..model.player_count() {
            assert!(model.residual_variance(i) >= 0.0);
        }
    }

    #[test]
    fn same_team_qb_and_wr_correlate_positively() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let model = FactorModel::for_players(&refs, &CorrelationConfig::default());
        // QB (0) and WR (1) share team pass, rush, and pace factors.
        assert!(model.correlation(0, 1) > 0.1);
    }

    #[test]
    fn dst_anticorrelates_with_opposing_qb() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let model = FactorModel::for_players(&refs, &CorrelationConfig::default());
        // BUF DST (4) vs KC QB (0).
        assert!(model.correlation(0, 4) < 0.0);
    }

    #[test]
    fn same_team_wrs_correlate_less_than_qb_wr_stack() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let model = FactorModel::for_players(&refs, &CorrelationConfig::default());
        let wr_wr = model.correlation(1, 2);
        let qb_wr = model.correlation(0, 1);
        assert!(
            wr_wr < qb_wr,
            "cannibalization should hold WR-WR ({wr_wr}) below QB-WR ({qb_wr})"
        );
    }

    #[test]
    fn players_in_unrelated_games_are_uncorrelated() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let model = FactorModel::for_players(&refs, &CorrelationConfig::default());
        // KC QB (0) vs DAL TE (5): no shared team, game, or cross factor.
        assert!(model.correlation(0, 5).abs() < 1e-12);
    }

    #[test]
    fn joint_mode_links_lineups_through_cross_factor() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let independent = FactorModel::for_players(&refs, &CorrelationConfig::default());
        let joint = FactorModel::joint(&refs, &CorrelationConfig::default());
        assert_eq!(joint.factor_count(), independent.factor_count() + 1);
        // The cross factor makes otherwise unrelated players co-move.
        assert!(joint.correlation(0, 5) > 0.0);
    }

    #[test]
    fn diagonal_is_exactly_one() {
        let players = sample_scope();
        let refs: Vec<&PlayerScore> = players.iter().collect();
        let model = FactorModel::for_players(&refs, &CorrelationConfig::default());
        let matrix = model.correlation_matrix();
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row[i], 1.0);
        }
    }
}
