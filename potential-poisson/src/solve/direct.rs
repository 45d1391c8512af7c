use super::{check_dimensions, Diagnostics, LinearSolver, Solution};
use crate::error::SolveError;
use nalgebra::{DVector, RealField};
use nalgebra_sparse::{factorization::CscCholesky, CooMatrix, CscMatrix};
use serde::Deserialize;

/// The symmetric permutation applied before factorising
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ordering {
    Natural,
    /// Reverse Cuthill-McKee, which gathers the five bands close to the diagonal and limits the
    /// fill of the factor
    ReverseCuthillMckee,
}

impl Default for Ordering {
    fn default() -> Self {
        Ordering::ReverseCuthillMckee
    }
}

/// Sparse Cholesky factorisation `A = L Lᵀ` followed by two triangular solves
#[derive(Debug, Copy, Clone, Default)]
pub struct DirectCholesky {
    ordering: Ordering,
}

impl DirectCholesky {
    pub fn new(ordering: Ordering) -> Self {
        Self { ordering }
    }
}

impl<T: Copy + RealField> LinearSolver<T> for DirectCholesky {
    #[tracing::instrument(name = "Cholesky", level = "info", skip_all)]
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        _initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError> {
        check_dimensions(matrix, rhs)?;

        let potential = match self.ordering {
            Ordering::Natural => factorise(matrix)?.solve(rhs).column(0).into_owned(),
            Ordering::ReverseCuthillMckee => {
                let permutation = reverse_cuthill_mckee(matrix);
                let inverse = invert(&permutation);
                let permuted = permute_symmetric(matrix, &inverse);
                let permuted_rhs =
                    DVector::from_iterator(rhs.len(), permutation.iter().map(|&old| rhs[old]));
                let permuted_solution = factorise(&permuted)?.solve(&permuted_rhs);

                let mut potential = DVector::zeros(rhs.len());
                for (new, &old) in permutation.iter().enumerate() {
                    potential[old] = permuted_solution[(new, 0)];
                }
                potential
            }
        };

        Ok(Solution {
            potential,
            diagnostics: Diagnostics::Direct,
        })
    }
}

fn factorise<T: Copy + RealField>(matrix: &CscMatrix<T>) -> Result<CscCholesky<T>, SolveError> {
    let factor = CscCholesky::factor(matrix)
        .map_err(|e| SolveError::Factorization(format!("{e:?}")))?;
    tracing::trace!("Factor has {} non-zeros", factor.l().nnz());
    Ok(factor)
}

/// The reverse Cuthill-McKee ordering of the sparsity graph of `matrix`, as `permutation[new] =
/// old`
fn reverse_cuthill_mckee<T: RealField>(matrix: &CscMatrix<T>) -> Vec<usize> {
    let n = matrix.nrows();
    let pattern = sprs::CsMat::new_csc(
        (n, n),
        matrix.col_offsets().to_vec(),
        matrix.row_indices().to_vec(),
        vec![1f64; matrix.nnz()],
    );
    let ordering = sprs::linalg::reverse_cuthill_mckee(pattern.view());
    let permutation = ordering.perm.vec();
    tracing::trace!(
        "Reordered {} unknowns into {} connected components",
        n,
        ordering.connected_parts.len().saturating_sub(1)
    );
    permutation
}

fn invert(permutation: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; permutation.len()];
    for (new, &old) in permutation.iter().enumerate() {
        inverse[old] = new;
    }
    inverse
}

/// `P A Pᵀ`, the entry `(r, c)` of `matrix` moves to `(inverse[r], inverse[c])`
fn permute_symmetric<T: Copy + RealField>(
    matrix: &CscMatrix<T>,
    inverse: &[usize],
) -> CscMatrix<T> {
    let mut coo = CooMatrix::new(matrix.nrows(), matrix.ncols());
    for (row, column, &value) in matrix.triplet_iter() {
        coo.push(inverse[row], inverse[column], value);
    }
    CscMatrix::from(&coo)
}

#[cfg(test)]
mod test {
    use super::{invert, permute_symmetric, reverse_cuthill_mckee, DirectCholesky, Ordering};
    use crate::error::SolveError;
    use crate::solve::{test::random_spd_matrix, Diagnostics, LinearSolver};
    use matrixcompare::assert_matrix_eq;
    use nalgebra::DVector;
    use nalgebra_sparse::{convert::serial::convert_csc_dense, CooMatrix, CscMatrix};
    use rand::{thread_rng, Rng};

    #[test]
    fn both_orderings_solve_the_system() {
        let mut rng = thread_rng();
        let matrix = random_spd_matrix(25);
        let rhs = DVector::from_fn(25, |_, _| rng.gen_range(-1.0..1.));
        let dense = convert_csc_dense(&matrix);
        let expected = dense.clone().lu().solve(&rhs).unwrap();

        for ordering in [Ordering::Natural, Ordering::ReverseCuthillMckee] {
            let solution = DirectCholesky::new(ordering).solve(&matrix, &rhs).unwrap();
            assert_eq!(solution.diagnostics, Diagnostics::Direct);
            approx::assert_relative_eq!(solution.potential, expected, epsilon = 1e-10);
        }
    }

    #[test]
    fn reordering_is_a_permutation() {
        let matrix = random_spd_matrix(16);
        let mut permutation = reverse_cuthill_mckee(&matrix);
        let inverse = invert(&permutation);
        for (new, &old) in permutation.iter().enumerate() {
            assert_eq!(inverse[old], new);
        }
        permutation.sort_unstable();
        assert_eq!(permutation, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn symmetric_permutation_preserves_symmetry_and_trace() {
        let matrix = random_spd_matrix(10);
        let inverse = invert(&reverse_cuthill_mckee(&matrix));
        let permuted = convert_csc_dense(&permute_symmetric(&matrix, &inverse));
        assert_matrix_eq!(permuted, permuted.transpose(), comp = exact);
        approx::assert_relative_eq!(permuted.trace(), convert_csc_dense(&matrix).trace());
    }

    #[test]
    fn indefinite_matrices_fail_to_factorise() {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 1.);
        coo.push(0, 1, 2.);
        coo.push(1, 0, 2.);
        coo.push(1, 1, 1.);
        let matrix = CscMatrix::from(&coo);
        let rhs = DVector::from_element(2, 1.);
        let result = DirectCholesky::new(Ordering::Natural).solve(&matrix, &rhs);
        assert!(matches!(result, Err(SolveError::Factorization(_))));
    }
}
