//! Positive-semi-definite repair of correlation matrices.
//!
//! Manually assigned correlations do not always compose into a valid
//! correlation structure. The repair clips the offending eigenvalues, rebuilds
//! the matrix and rescales it back to a unit diagonal.

use crate::domain::errors::NumericalError;
use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Thresholds of the eigenvalue repair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PsdRepairConfig {
    /// Repair runs only when the smallest eigenvalue is below `-tolerance`
    pub tolerance: f64,
    /// Eigenvalues below this value are raised to it during repair
    pub floor: f64,
}

impl Default for PsdRepairConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            floor: 1e-8,
        }
    }
}

/// What the repair did to the matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub repaired: bool,
    /// Smallest eigenvalue of the matrix before repair
    pub min_eigenvalue: f64,
    pub clipped_eigenvalues: usize,
    /// Largest absolute change of any entry
    pub max_adjustment: f64,
}

/// Averages a matrix with its transpose
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    (matrix + matrix.transpose()) * 0.5
}

/// Eigenvalues of a symmetric matrix, in no particular order
pub fn eigenvalues(matrix: &DMatrix<f64>) -> Result<Vec<f64>, NumericalError> {
    let eigen = SymmetricEigen::new(matrix.clone());
    let values: Vec<f64> = eigen.eigenvalues.iter().copied().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(NumericalError::NonFiniteSpectrum);
    }
    Ok(values)
}

pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> Result<f64, NumericalError> {
    Ok(eigenvalues(matrix)?
        .into_iter()
        .fold(f64::INFINITY, f64::min))
}

/// Repairs a symmetric unit-diagonal matrix so that it is positive
/// semi-definite.
///
/// A matrix whose smallest eigenvalue is within tolerance is returned
/// unchanged. Otherwise eigenvalues below the floor are clipped to it, the
/// matrix is recomposed and each entry is rescaled by
/// `1 / sqrt(m_ii * m_jj)` so the diagonal is exactly 1 again.
pub fn repair(
    matrix: &DMatrix<f64>,
    config: &PsdRepairConfig,
) -> Result<(DMatrix<f64>, RepairReport), NumericalError> {
    let mut eigen = SymmetricEigen::new(matrix.clone());
    if eigen.eigenvalues.iter().any(|v| !v.is_finite())
        || eigen.eigenvectors.iter().any(|v| !v.is_finite())
    {
        return Err(NumericalError::NonFiniteSpectrum);
    }

    let min_eigenvalue = eigen.eigenvalues.iter().copied().fold(f64::INFINITY, f64::min);
    if min_eigenvalue >= -config.tolerance {
        debug!(
            "Matrix is positive semi-definite (min eigenvalue {:.3e}), no repair needed",
            min_eigenvalue
        );
        return Ok((
            matrix.clone(),
            RepairReport {
                repaired: false,
                min_eigenvalue,
                clipped_eigenvalues: 0,
                max_adjustment: 0.0,
            },
        ));
    }

    let mut clipped_eigenvalues = 0;
    for value in eigen.eigenvalues.iter_mut() {
        if *value < config.floor {
            *value = config.floor;
            clipped_eigenvalues += 1;
        }
    }

    let recomposed = symmetrize(&eigen.recompose());
    let n = recomposed.nrows();

    let mut scale = Vec::with_capacity(n);
    for i in 0..n {
        let diagonal = recomposed[(i, i)];
        if diagonal <= 0.0 || !diagonal.is_finite() {
            return Err(NumericalError::DegenerateDiagonal {
                row: i,
                value: diagonal,
            });
        }
        scale.push(diagonal.sqrt());
    }

    let repaired = DMatrix::from_fn(n, n, |i, j| {
        if i == j {
            1.0
        } else {
            (recomposed[(i, j)] / (scale[i] * scale[j])).clamp(-1.0, 1.0)
        }
    });

    let max_adjustment = (&repaired - matrix).amax();

    warn!(
        "Correlation matrix was not positive semi-definite (min eigenvalue {:.4e}); clipped {} eigenvalue(s), max entry change {:.4}",
        min_eigenvalue, clipped_eigenvalues, max_adjustment
    );

    Ok((
        repaired,
        RepairReport {
            repaired: true,
            min_eigenvalue,
            clipped_eigenvalues,
            max_adjustment,
        },
    ))
}
