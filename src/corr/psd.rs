//! Defensive utilities for externally supplied correlation matrices.
//!
//! Matrices built by [crate::corr::factors::FactorModel] are positive
//! semi-definite by construction and never pass through here. These routines
//! exist for correlation inputs produced elsewhere (hand-tuned tables,
//! historical estimates) and for the eigenvalue assertions in tests.
//! Sizes stay small (players in scope, <= ~40), so a cyclic Jacobi sweep is
//! plenty.

use std::fmt;

pub type Matrix = Vec<Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsdError {
    Empty,
    NotSquare,
    NotSymmetric,
}

impl fmt::Display for PsdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "matrix is empty"),
            Self::NotSquare => write!(f, "matrix is not square"),
            Self::NotSymmetric => write!(f, "matrix is not symmetric"),
        }
    }
}

const JACOBI_SWEEPS: usize = 64;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-12;
const SYMMETRY_TOLERANCE: f64 = 1e-9;

fn check_square_symmetric(matrix: &Matrix) -> Result<usize, PsdError> {
    let n = matrix.len();
    if n == 0 {
        return Err(PsdError::Empty);
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(PsdError::NotSquare);
    }
    for i in 0..n {
        for j in (i + 1)..n {
            if (matrix[i][j] - matrix[j][i]).abs() > SYMMETRY_TOLERANCE {
                return Err(PsdError::NotSymmetric);
            }
        }
    }
    Ok(n)
}

/// Eigenvalues of a symmetric matrix via cyclic Jacobi rotations.
pub fn symmetric_eigenvalues(matrix: &Matrix) -> Result<Vec<f64>, PsdError> {
    let (values, _) = jacobi_decompose(matrix)?;
    Ok(values)
}

/// Full Jacobi eigen-decomposition: (eigenvalues, eigenvector columns).
fn jacobi_decompose(matrix: &Matrix) -> Result<(Vec<f64>, Matrix), PsdError> {
    let n = check_square_symmetric(matrix)?;
    let mut a = matrix.clone();
    let mut v: Matrix = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for _ in 0..JACOBI_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| a[i][j] * a[i][j])
            .sum();
        if off_diagonal < OFF_DIAGONAL_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[p][q].abs() < OFF_DIAGONAL_TOLERANCE {
                    continue;
                }
                // Rotation angle that zeros a[p][q].
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[k][p];
                    let akq = a[k][q];
                    a[k][p] = c * akp - s * akq;
                    a[k][q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[p][k];
                    let aqk = a[q][k];
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[k][p];
                    let vkq = v[k][q];
                    v[k][p] = c * vkp - s * vkq;
                    v[k][q] = s * vkp + c * vkq;
                }
            }
        }
    }

    let values = (0..n).map(|i| a[i][i]).collect();
    Ok((values, v))
}

/// Smallest eigenvalue; the PSD check used by tests.
pub fn min_eigenvalue(matrix: &Matrix) -> Result<f64, PsdError> {
    Ok(symmetric_eigenvalues(matrix)?
        .into_iter()
        .fold(f64::INFINITY, f64::min))
}

/// Project a symmetric matrix onto the nearest correlation matrix: clip
/// negative eigenvalues to zero, reconstruct, and rescale to a unit
/// diagonal. Single projection pass; good enough for mildly indefinite
/// inputs, which is all this defensive path is for.
pub fn nearest_psd(matrix: &Matrix) -> Result<Matrix, PsdError> {
    let (values, vectors) = jacobi_decompose(matrix)?;
    let n = values.len();

    let clipped: Vec<f64> = values.iter().map(|&v| v.max(0.0)).collect();
    let mut rebuilt = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..n {
                sum += vectors[i][k] * clipped[k] * vectors[j][k];
            }
            rebuilt[i][j] = sum;
        }
    }

    // Rescale to restore the unit diagonal lost by clipping.
    let scales: Vec<f64> = (0..n)
        .map(|i| {
            let d = rebuilt[i][i];
            if d > 0.0 {
                1.0 / d.sqrt()
            } else {
                0.0
            }
        })
        .collect();
    for i in 0..n {
        for j in 0..n {
            rebuilt[i][j] *= scales[i] * scales[j];
        }
        if scales[i] > 0.0 {
            rebuilt[i][i] = 1.0;
        }
    }
    Ok(rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "expected {b}, got {a}");
    }

    #[test]
    fn eigenvalues_of_diagonal_matrix_are_its_entries() {
        let matrix = vec![
            vec![3.0, 0.0, 0.0],
            vec![0.0, -1.0, 0.0],
            vec![0.0, 0.0, 0.5],
        ];
        let mut values = symmetric_eigenvalues(&matrix).unwrap();
        values.sort_by(f64::total_cmp);
        approx_eq(values[0], -1.0, 1e-10);
        approx_eq(values[1], 0.5, 1e-10);
        approx_eq(values[2], 3.0, 1e-10);
    }

    #[test]
    fn eigenvalues_of_known_two_by_two() {
        // [[2, 1], [1, 2]] has eigenvalues 1 and 3.
        let matrix = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        let mut values = symmetric_eigenvalues(&matrix).unwrap();
        values.sort_by(f64::total_cmp);
        approx_eq(values[0], 1.0, 1e-10);
        approx_eq(values[1], 3.0, 1e-10);
    }

    #[test]
    fn rejects_asymmetric_input() {
        let matrix = vec![vec![1.0, 0.5], vec![0.2, 1.0]];
        assert_eq!(symmetric_eigenvalues(&matrix), Err(PsdError::NotSymmetric));
    }

    #[test]
    fn nearest_psd_fixes_an_indefinite_correlation_matrix() {
        // Pairwise correlations of 0.9, 0.9, -0.9 cannot coexist.
        let matrix = vec![
            vec![1.0, 0.9, 0.9],
            vec![0.9, 1.0, -0.9],
            vec![0.9, -0.9, 1.0],
        ];
        assert!(min_eigenvalue(&matrix).unwrap() < -1e-6);

        let repaired = nearest_psd(&matrix).unwrap();
        assert!(min_eigenvalue(&repaired).unwrap() >= -1e-9);
        for i in 0..3 {
            approx_eq(repaired[i][i], 1.0, 1e-12);
            for j in 0..3 {
                approx_eq(repaired[i][j], repaired[j][i], 1e-9);
            }
        }
    }

    #[test]
    fn nearest_psd_leaves_valid_matrices_nearly_unchanged() {
        let matrix = vec![
            vec![1.0, 0.3, 0.1],
            vec![0.3, 1.0, 0.2],
            vec![0.1, 0.2, 1.0],
        ];
        let repaired = nearest_psd(&matrix).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                approx_eq(repaired[i][j], matrix[i][j], 1e-8);
            }
        }
    }
}
