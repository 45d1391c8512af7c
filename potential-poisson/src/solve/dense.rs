use super::{check_dimensions, Diagnostics, LinearSolver, Solution};
use crate::error::SolveError;
use nalgebra::{DVector, RealField};
use nalgebra_sparse::{convert::serial::convert_csc_dense, CscMatrix};

/// Densify the matrix and solve by LU decomposition with partial pivoting. The cost is cubic in
/// the number of unknowns so this is only sensible for small grids, but it makes no assumption
/// on the symmetry of the matrix.
#[derive(Debug, Copy, Clone, Default)]
pub struct DenseLu;

impl<T: Copy + RealField> LinearSolver<T> for DenseLu {
    #[tracing::instrument(name = "Dense LU", level = "info", skip_all)]
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        _initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError> {
        check_dimensions(matrix, rhs)?;
        let potential = convert_csc_dense(matrix)
            .lu()
            .solve(rhs)
            .ok_or(SolveError::Singular)?;
        Ok(Solution {
            potential,
            diagnostics: Diagnostics::Direct,
        })
    }
}
