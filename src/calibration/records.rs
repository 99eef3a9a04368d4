//! Historical matchup records for calibration runs.
//!
//! One CSV row per completed matchup: the win probability the optimizer
//! reported before kickoff, whether the matchup was actually won, and
//! optionally the predicted margin interval plus the realized margin for
//! coverage checks.

use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibration::{
    brier_score, expected_calibration_error, interval_coverage, reliability_bins,
    CoverageReport, ReliabilityBin,
};

pub const DEFAULT_RELIABILITY_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MatchupRecord {
    pub predicted_win_probability: f64,
    /// 1 for a win, 0 for a loss.
    pub won: u8,
    #[serde(default)]
    pub margin_p5: Option<f64>,
    #[serde(default)]
    pub margin_p95: Option<f64>,
    #[serde(default)]
    pub actual_margin: Option<f64>,
}

#[derive(Debug)]
pub enum RecordsError {
    Read(std::io::Error),
    Parse(csv::Error),
    InvalidRow { row: usize, message: String },
    Empty,
}

impl fmt::Display for RecordsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(err) => write!(f, "failed to read records file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse records CSV: {err}"),
            Self::InvalidRow { row, message } => {
                write!(f, "invalid record at row {row}: {message}")
            }
            Self::Empty => write!(f, "records file contains no rows"),
        }
    }
}

pub fn load_matchup_records(path: impl AsRef<Path>) -> Result<Vec<MatchupRecord>, RecordsError> {
    let file = File::open(path).map_err(RecordsError::Read)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<MatchupRecord>().enumerate() {
        let record = row.map_err(RecordsError::Parse)?;
        if !(0.0..=1.0).contains(&record.predicted_win_probability) {
            return Err(RecordsError::InvalidRow {
                row: index + 1,
                message: format!(
                    "predicted_win_probability {} outside [0, 1]",
                    record.predicted_win_probability
                ),
            });
        }
        if record.won > 1 {
            return Err(RecordsError::InvalidRow {
                row: index + 1,
                message: format!("won must be 0 or 1, got {}", record.won),
            });
        }
        records.push(record);
    }
    if records.is_empty() {
        return Err(RecordsError::Empty);
    }
    Ok(records)
}

/// Everything the `calibrate` command reports for a record set.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationSummary {
    pub samples: usize,
    pub brier: f64,
    pub expected_calibration_error: f64,
    pub bins: Vec<ReliabilityBin>,
    /// Present when the records carry margin intervals and realized margins.
    pub margin_coverage_90: Option<CoverageReport>,
}

pub fn summarize_records(records: &[MatchupRecord]) -> CalibrationSummary {
    let predictions: Vec<f64> = records
        .iter()
        .map(|r| r.predicted_win_probability)
        .collect();
    let outcomes: Vec<bool> = records.iter().map(|r| r.won == 1).collect();

    let bins = reliability_bins(&predictions, &outcomes, DEFAULT_RELIABILITY_BINS);
    let ece = expected_calibration_error(&bins);

    let with_intervals: Vec<((f64, f64), f64)> = records
        .iter()
        .filter_map(|r| match (r.margin_p5, r.margin_p95, r.actual_margin) {
            (Some(low), Some(high), Some(actual)) => Some(((low, high), actual)),
            _ => None,
        })
        .collect();
    let margin_coverage_90 = if with_intervals.is_empty() {
        None
    } else {
        let intervals: Vec<(f64, f64)> = with_intervals.iter().map(|(i, _)| *i).collect();
        let observed: Vec<f64> = with_intervals.iter().map(|(_, o)| *o).collect();
        Some(interval_coverage(&intervals, &observed, 0.90))
    };

    CalibrationSummary {
        samples: records.len(),
        brier: brier_score(&predictions, &outcomes),
        expected_calibration_error: ece,
        bins,
        margin_coverage_90,
    }
}
