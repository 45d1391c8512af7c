// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Solve
//!
//! Linear solvers for the assembled system. All of them sit behind [`LinearSolver`] so the
//! caller can choose a method at runtime through [`SolverStrategy`]:
//! - [`DirectCholesky`] factorises the symmetric positive definite matrix once and back
//!   substitutes, optionally after a bandwidth reducing reordering,
//! - [`BiCgStab`] and [`ConjugateGradient`] hand the system to `kryst` with a
//!   [`PreconditionerKind`] and iterate until a relative residual tolerance or an iteration cap
//!   is reached,
//! - [`FastPoisson`] diagonalises the uniform permittivity operator with sine transforms,
//! - [`DenseLu`] is a reference path for small systems.

mod dense;
mod direct;
mod fast;
mod iterative;

pub use dense::*;
pub use direct::*;
pub use fast::*;
pub use iterative::*;

use crate::error::SolveError;
use nalgebra::{DVector, RealField};
use nalgebra_sparse::CscMatrix;
use serde::Deserialize;

/// What the solver has to say about how the solution was found
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Diagnostics<T> {
    Direct,
    Iterative {
        iterations: usize,
        /// The relative residual estimate `‖b - Ax‖ / ‖b‖` on exit
        residual: T,
        converged: bool,
    },
}

impl<T> Diagnostics<T> {
    /// Direct solves always converge
    pub fn converged(&self) -> bool {
        match self {
            Diagnostics::Direct => true,
            Diagnostics::Iterative { converged, .. } => *converged,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution<T: RealField> {
    /// The solution vector in solver order
    pub potential: DVector<T>,
    pub diagnostics: Diagnostics<T>,
}

pub trait LinearSolver<T: RealField> {
    /// Solve `Ax = b`. Iterative solvers start from `initial` when one is given and from zero
    /// otherwise; direct solvers ignore it.
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError>;

    fn solve(&self, matrix: &CscMatrix<T>, rhs: &DVector<T>) -> Result<Solution<T>, SolveError> {
        self.solve_from(matrix, rhs, None)
    }
}

pub(crate) fn check_dimensions<T: RealField>(
    matrix: &CscMatrix<T>,
    rhs: &DVector<T>,
) -> Result<(), SolveError> {
    if matrix.nrows() != matrix.ncols() || matrix.nrows() != rhs.len() {
        return Err(SolveError::DimensionMismatch {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            rhs: rhs.len(),
        });
    }
    Ok(())
}

/// The external numerical kernels work in double precision
pub(crate) fn to_f64<T: Copy + RealField>(value: T) -> Result<f64, SolveError> {
    nalgebra::try_convert::<T, f64>(value).ok_or_else(|| SolveError::Precision(value.to_string()))
}

/// The methods selectable from the configuration file
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Direct,
    BiCgStab,
    ConjugateGradient,
    DenseLu,
    FastPoisson,
}

/// A linear solver chosen at runtime
#[derive(Debug, Clone)]
pub enum SolverStrategy<T> {
    Direct(DirectCholesky),
    BiCgStab(BiCgStab<T>),
    ConjugateGradient(ConjugateGradient<T>),
    DenseLu(DenseLu),
    FastPoisson(FastPoisson),
}

impl<T: Copy + RealField> SolverStrategy<T> {
    pub fn new(kind: StrategyKind, ordering: Ordering, settings: IterativeSettings<T>) -> Self {
        match kind {
            StrategyKind::Direct => SolverStrategy::Direct(DirectCholesky::new(ordering)),
            StrategyKind::BiCgStab => SolverStrategy::BiCgStab(BiCgStab::new(settings)),
            StrategyKind::ConjugateGradient => {
                SolverStrategy::ConjugateGradient(ConjugateGradient::new(settings))
            }
            StrategyKind::DenseLu => SolverStrategy::DenseLu(DenseLu),
            StrategyKind::FastPoisson => SolverStrategy::FastPoisson(FastPoisson),
        }
    }
}

impl<T: Copy + RealField> LinearSolver<T> for SolverStrategy<T> {
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError> {
        match self {
            SolverStrategy::Direct(solver) => solver.solve_from(matrix, rhs, initial),
            SolverStrategy::BiCgStab(solver) => solver.solve_from(matrix, rhs, initial),
            SolverStrategy::ConjugateGradient(solver) => solver.solve_from(matrix, rhs, initial),
            SolverStrategy::DenseLu(solver) => solver.solve_from(matrix, rhs, initial),
            SolverStrategy::FastPoisson(solver) => solver.solve_from(matrix, rhs, initial),
        }
    }
}

pub(crate) fn max_abs_difference<T: Copy + RealField>(a: &DVector<T>, b: &DVector<T>) -> T {
    a.iter()
        .zip(b.iter())
        .fold(T::zero(), |acc, (&x, &y)| acc.max((x - y).abs()))
}

/// The outcome of solving the same system along two paths
#[derive(Debug, Clone)]
pub struct Comparison<T: RealField> {
    pub reference: Solution<T>,
    pub candidate: Solution<T>,
    /// `max_k |x_reference[k] - x_candidate[k]|`
    pub max_abs_difference: T,
}

/// Solve with both `reference` and `candidate` and measure how far apart the answers are
#[tracing::instrument(name = "Comparison", level = "info", skip_all)]
pub fn compare<T, R, C>(
    reference: &R,
    candidate: &C,
    matrix: &CscMatrix<T>,
    rhs: &DVector<T>,
) -> Result<Comparison<T>, SolveError>
where
    T: Copy + RealField,
    R: LinearSolver<T>,
    C: LinearSolver<T>,
{
    let reference = reference.solve(matrix, rhs)?;
    let candidate = candidate.solve(matrix, rhs)?;
    let max_abs_difference = max_abs_difference(&reference.potential, &candidate.potential);
    tracing::info!("Maximum difference between solutions: {max_abs_difference}");
    Ok(Comparison {
        reference,
        candidate,
        max_abs_difference,
    })
}
