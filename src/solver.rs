//! Dense symmetric positive-definite solves.
//!
//! Stiffness, mass and effective-stiffness matrices of a properly supported truss are
//! all symmetric positive definite, so every solve in the crate goes through a
//! Cholesky factorisation. Matrices whose Cholesky pivots spread wider than machine
//! precision are treated as singular: a mechanism usually shows up as a tiny but
//! positive pivot after round-off rather than as an exact zero.

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Cholesky factor of a dense SPD matrix that passed the conditioning check.
pub(crate) struct SpdFactor {
    /// The factorisation itself.
    cholesky: Cholesky<f64, Dyn>,
}

impl SpdFactor {
    /// Factorise `matrix`, `None` when it is indefinite or numerically singular.
    pub(crate) fn new(matrix: DMatrix<f64>) -> Option<Self> {
        let cholesky = matrix.cholesky()?;
        let diagonal = cholesky.l_dirty().diagonal();
        if diagonal.is_empty() {
            return Some(Self { cholesky });
        }
        let smallest = diagonal.min();
        let largest = diagonal.max();
        // Pivots are square roots of the matrix scale, so compare their squares.
        if smallest <= 0.0 || (smallest / largest).powi(2) < f64::EPSILON {
            return None;
        }
        Some(Self { cholesky })
    }

    pub(crate) fn solve(&self, rhs: &DVector<f64>) -> DVector<f64> {
        self.cholesky.solve(rhs)
    }
}

/// Solve `matrix · x = rhs` for an SPD matrix.
pub(crate) fn solve_spd(matrix: &DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    SpdFactor::new(matrix.clone()).map(|factor| factor.solve(rhs))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn solves_small_spd_system() {
        let matrix = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let rhs = DVector::from_vec(vec![1.0, 2.0]);
        let x = solve_spd(&matrix, &rhs).expect("matrix is SPD");
        assert_relative_eq!(&matrix * &x, rhs, epsilon = 1.0e-12);
    }

    #[test]
    fn rejects_singular_matrix() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
        let rhs = DVector::from_vec(vec![1.0, 0.0]);
        assert!(solve_spd(&matrix, &rhs).is_none());
    }

    #[test]
    fn rejects_nearly_singular_matrix() {
        let matrix = DMatrix::from_row_slice(2, 2, &[1.0e10, 0.0, 0.0, 1.0e-9]);
        let rhs = DVector::from_vec(vec![1.0, 1.0]);
        assert!(solve_spd(&matrix, &rhs).is_none());
    }

    #[test]
    fn empty_system_has_empty_solution() {
        let x = solve_spd(&DMatrix::zeros(0, 0), &DVector::zeros(0)).expect("trivial");
        assert_eq!(x.len(), 0);
    }
}
