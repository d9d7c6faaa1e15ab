use nalgebra::DMatrix;

/// Pivot at which the factorization broke down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CholeskyFailure {
    pub row: usize,
    pub pivot: f64,
}

/// Lower-triangular factor `L` with `L * L^T = matrix`.
///
/// Semi-definite variant: a pivot within `tolerance` of zero produces a zero
/// column instead of failing, so perfectly correlated projects are supported.
/// A pivot below `-tolerance`, or a zero pivot whose column still carries
/// weight, means the matrix is not positive semi-definite.
pub fn lower_factor(matrix: &DMatrix<f64>, tolerance: f64) -> Result<DMatrix<f64>, CholeskyFailure> {
    let n = matrix.nrows();
    if n == 1 {
        return Ok(DMatrix::from_element(1, 1, 1.0));
    }

    let residual_limit = tolerance.sqrt();
    let mut l = DMatrix::<f64>::zeros(n, n);

    for j in 0..n {
        let mut diag = matrix[(j, j)];
        for k in 0..j {
            diag -= l[(j, k)] * l[(j, k)];
        }

        if diag < -tolerance || diag.is_nan() {
            return Err(CholeskyFailure { row: j, pivot: diag });
        }

        if diag <= tolerance {
            // Column is linearly dependent on the previous ones
            for i in (j + 1)..n {
                let mut residual = matrix[(i, j)];
                for k in 0..j {
                    residual -= l[(i, k)] * l[(j, k)];
                }
                if residual.abs() > residual_limit {
                    return Err(CholeskyFailure { row: j, pivot: diag });
                }
            }
            continue;
        }

        let pivot = diag.sqrt();
        l[(j, j)] = pivot;
        for i in (j + 1)..n {
            let mut sum = matrix[(i, j)];
            for k in 0..j {
                sum -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = sum / pivot;
        }
    }

    Ok(l)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-8;

    fn reconstructs(matrix: &DMatrix<f64>) {
        let l = lower_factor(matrix, TOLERANCE).unwrap();
        let product = &l * l.transpose();
        assert!((&product - matrix).amax() < 1e-10);
        for i in 0..l.nrows() {
            for j in (i + 1)..l.ncols() {
                assert_eq!(l[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn test_identity() {
        let identity = DMatrix::<f64>::identity(3, 3);
        let l = lower_factor(&identity, TOLERANCE).unwrap();
        assert_eq!(l, identity);
    }

    #[test]
    fn test_positive_definite() {
        reconstructs(&DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 0.2, 0.3, 0.2, 1.0, 0.06, 0.3, 0.06, 1.0],
        ));
    }

    #[test]
    fn test_perfect_correlation_is_semi_definite() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let l = lower_factor(&matrix, TOLERANCE).unwrap();

        assert_eq!(l[(0, 0)], 1.0);
        assert_eq!(l[(1, 0)], 1.0);
        assert_eq!(l[(1, 1)], 0.0);
        reconstructs(&matrix);
    }

    #[test]
    fn test_single_entry_short_circuits() {
        let matrix = DMatrix::from_element(1, 1, 1.0);
        assert_eq!(lower_factor(&matrix, TOLERANCE).unwrap()[(0, 0)], 1.0);
    }

    #[test]
    fn test_indefinite_matrix_fails() {
        let matrix = DMatrix::from_row_slice(3, 3, &[1.0, 0.9, -0.9, 0.9, 1.0, 0.9, -0.9, 0.9, 1.0]);
        let failure = lower_factor(&matrix, TOLERANCE).unwrap_err();
        assert_eq!(failure.row, 2);
        assert!(failure.pivot < 0.0);
    }
}
