//! Preconditioned Krylov solvers backed by `kryst`.
//!
//! The solvers here own the parts of an iterative solve that are specific to the potential: the
//! starting iterate, the relative residual `‖b - Ax‖ / ‖b‖` used to judge convergence, and the
//! conversion to and from the scalar type of the problem. The iteration itself and the
//! preconditioners are delegated to `kryst`, which works on `f64` row-compressed matrices.
//!
//! `kryst` measures convergence against its own right hand side. To keep the tolerance relative
//! to `‖b‖` whatever the starting point, the correction `A d = b - A x₀` is solved from zero and
//! its tolerance is rescaled by `‖b‖ / ‖b - A x₀‖`.

use super::{check_dimensions, to_f64, Diagnostics, LinearSolver, Solution};
use crate::error::SolveError;
use kryst::{
    context::ksp_context::Workspace,
    matrix::{op::CsrOp, sparse::CsrMatrix as KrylovMatrix},
    parallel::{NoComm, UniverseComm},
    preconditioner::{ilu_csr::IluCsr, Jacobi, PcSide, Preconditioner as _},
    solver::{bicgstab::BiCgStabSolver, cg::CgSolver, LinearSolver as _},
};
use nalgebra::{DVector, RealField};
use nalgebra_sparse::{CscMatrix, CsrMatrix};
use serde::Deserialize;
use std::sync::Arc;

/// The preconditioner applied on the left of the Krylov iteration
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionerKind {
    /// Incomplete LU factorisation on the sparsity of the matrix
    IncompleteLu,
    Jacobi,
    Identity,
}

impl Default for PreconditionerKind {
    fn default() -> Self {
        PreconditionerKind::IncompleteLu
    }
}

/// Stopping criteria and preconditioning shared by the Krylov solvers
#[derive(Debug, Copy, Clone)]
pub struct IterativeSettings<T> {
    /// Target for the relative residual `‖b - Ax‖ / ‖b‖`
    pub tolerance: T,
    /// Iteration cap, twice the number of unknowns when unset
    pub maximum_iterations: Option<usize>,
    pub preconditioner: PreconditionerKind,
}

impl<T: Copy + RealField> Default for IterativeSettings<T> {
    fn default() -> Self {
        Self {
            tolerance: T::from_f64(1e-10).expect("Must be able to fit f64 in T"),
            maximum_iterations: None,
            preconditioner: PreconditionerKind::default(),
        }
    }
}

impl<T> IterativeSettings<T> {
    fn cap(&self, unknowns: usize) -> usize {
        self.maximum_iterations.unwrap_or(2 * unknowns)
    }
}

#[derive(Debug, Copy, Clone)]
enum Method {
    BiCgStab,
    ConjugateGradient,
}

/// Preconditioned biconjugate gradient stabilised method, which does not need the matrix to
/// be symmetric
#[derive(Debug, Copy, Clone)]
pub struct BiCgStab<T> {
    settings: IterativeSettings<T>,
}

impl<T: Copy + RealField> BiCgStab<T> {
    pub fn new(settings: IterativeSettings<T>) -> Self {
        Self { settings }
    }
}

impl<T: Copy + RealField> LinearSolver<T> for BiCgStab<T> {
    #[tracing::instrument(name = "BiCGSTAB", level = "info", skip_all)]
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError> {
        krylov_solve(Method::BiCgStab, &self.settings, matrix, rhs, initial)
    }
}

/// Preconditioned conjugate gradients, for symmetric positive definite matrices
#[derive(Debug, Copy, Clone)]
pub struct ConjugateGradient<T> {
    settings: IterativeSettings<T>,
}

impl<T: Copy + RealField> ConjugateGradient<T> {
    pub fn new(settings: IterativeSettings<T>) -> Self {
        Self { settings }
    }
}

impl<T: Copy + RealField> LinearSolver<T> for ConjugateGradient<T> {
    #[tracing::instrument(name = "Conjugate gradient", level = "info", skip_all)]
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError> {
        krylov_solve(
            Method::ConjugateGradient,
            &self.settings,
            matrix,
            rhs,
            initial,
        )
    }
}

/// Run a `kryst` solver with the left preconditioner named by `$kind`
macro_rules! run_krylov {
    ($solver:expr, $operator:expr, $kind:expr, $b:expr, $x:expr) => {{
        let mut solver = $solver;
        let mut workspace = Workspace::new($b.len());
        solver.setup_workspace(&mut workspace);
        let comm = UniverseComm::NoComm(NoComm {});
        match $kind {
            PreconditionerKind::IncompleteLu => {
                let mut pc = IluCsr::new_with_config(Default::default());
                pc.setup($operator)
                    .map_err(|e| SolveError::Preconditioner(format!("{e:?}")))?;
                solver.solve(
                    $operator,
                    Some(&mut pc),
                    $b,
                    $x,
                    PcSide::Left,
                    &comm,
                    None,
                    Some(&mut workspace),
                )
            }
            PreconditionerKind::Jacobi => {
                let mut pc = Jacobi::new();
                pc.setup($operator)
                    .map_err(|e| SolveError::Preconditioner(format!("{e:?}")))?;
                solver.solve(
                    $operator,
                    Some(&mut pc),
                    $b,
                    $x,
                    PcSide::Left,
                    &comm,
                    None,
                    Some(&mut workspace),
                )
            }
            PreconditionerKind::Identity => solver.solve(
                $operator,
                None,
                $b,
                $x,
                PcSide::Left,
                &comm,
                None,
                Some(&mut workspace),
            ),
        }
    }};
}

fn krylov_solve<T: Copy + RealField>(
    method: Method,
    settings: &IterativeSettings<T>,
    matrix: &CscMatrix<T>,
    rhs: &DVector<T>,
    initial: Option<&DVector<T>>,
) -> Result<Solution<T>, SolveError> {
    check_dimensions(matrix, rhs)?;
    if let Some(initial) = initial {
        if initial.len() != rhs.len() {
            return Err(SolveError::DimensionMismatch {
                rows: matrix.nrows(),
                cols: matrix.ncols(),
                rhs: initial.len(),
            });
        }
    }

    let rhs_norm = rhs.norm();
    if rhs_norm == T::zero() {
        return Ok(finish(DVector::zeros(rhs.len()), 0, T::zero(), true));
    }
    let start = initial.cloned().unwrap_or_else(|| DVector::zeros(rhs.len()));
    let initial_residual = rhs - matrix * &start;
    let initial_residual_norm = initial_residual.norm();
    let tolerance = settings.tolerance;
    if initial_residual_norm / rhs_norm <= tolerance {
        return Ok(finish(start, 0, initial_residual_norm / rhs_norm, true));
    }

    let cap = settings.cap(rhs.len());
    let scaled_tolerance = to_f64(tolerance * rhs_norm / initial_residual_norm)?;
    let operator = CsrOp::new(Arc::new(to_krylov_matrix(matrix)?));
    let b = initial_residual
        .iter()
        .map(|&value| to_f64(value))
        .collect::<Result<Vec<_>, _>>()?;
    let mut correction = vec![0f64; b.len()];

    let outcome = match method {
        Method::BiCgStab => run_krylov!(
            BiCgStabSolver::new(scaled_tolerance, cap),
            &operator,
            settings.preconditioner,
            b.as_slice(),
            correction.as_mut_slice()
        ),
        Method::ConjugateGradient => run_krylov!(
            CgSolver::new(scaled_tolerance, cap),
            &operator,
            settings.preconditioner,
            b.as_slice(),
            correction.as_mut_slice()
        ),
    };
    let (iterations, reported_converged) = match outcome {
        Ok(stats) => (stats.iterations, stats.reason.is_converged()),
        Err(e) => {
            // Breakdown and exhaustion both leave the last iterate in `correction`
            tracing::debug!("Krylov iteration stopped early: {e:?}");
            (cap, false)
        }
    };

    let potential = start
        + DVector::from_iterator(
            correction.len(),
            correction.iter().map(|&value| nalgebra::convert::<f64, T>(value)),
        );
    let residual = (rhs - matrix * &potential).norm() / rhs_norm;
    let converged = reported_converged || residual <= tolerance;
    Ok(finish(potential, iterations, residual, converged))
}

/// Copy the matrix into the row-compressed layout `kryst` iterates on
fn to_krylov_matrix<T: Copy + RealField>(
    matrix: &CscMatrix<T>,
) -> Result<KrylovMatrix<f64>, SolveError> {
    let rows = CsrMatrix::from(matrix);
    let values = rows
        .values()
        .iter()
        .map(|&value| to_f64(value))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(KrylovMatrix::from_csr(
        rows.nrows(),
        rows.ncols(),
        rows.row_offsets().to_vec(),
        rows.col_indices().to_vec(),
        values,
    ))
}

fn finish<T: Copy + RealField>(
    x: DVector<T>,
    iterations: usize,
    residual: T,
    converged: bool,
) -> Solution<T> {
    if converged {
        tracing::info!("Converged in {iterations} iterations, relative residual {residual}");
    } else {
        tracing::warn!(
            "Stopped after {iterations} iterations without converging, relative residual {residual}"
        );
    }
    Solution {
        potential: x,
        diagnostics: Diagnostics::Iterative {
            iterations,
            residual,
            converged,
        },
    }
}
