// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Error
//! Errors raised while validating the inputs and solving the linear system

use miette::Diagnostic;
use potential_mesher::GridError;

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Configuration errors, detected before any assembly takes place
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(code(potential::grid))]
    Grid(#[from] GridError),
    #[error("the {name} field is {found:?} but the grid needs {expected:?}")]
    #[diagnostic(code(potential::field_shape))]
    MissizedField {
        name: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("the permittivity must be positive everywhere, found {value} at ({i}, {j})")]
    #[diagnostic(code(potential::permittivity))]
    NonPositivePermittivity { i: usize, j: usize, value: String },
    #[error("the {name} field is not finite at ({i}, {j})")]
    #[diagnostic(code(potential::field_value))]
    NonFiniteField { name: &'static str, i: usize, j: usize },
    #[error("the thermal voltage must be positive, found {0}")]
    #[diagnostic(code(potential::thermal_voltage))]
    NonPositiveThermalVoltage(String),
    #[error("{0}")]
    #[diagnostic(code(potential::structure))]
    Structure(String),
}

#[derive(thiserror::Error, Debug, Diagnostic)]
/// Failures of a linear solve. Iterative non-convergence is not one of these, it is reported
/// through the solver diagnostics alongside the best iterate
pub enum SolveError {
    #[error("the matrix is {rows}x{cols} but the right hand side has length {rhs}")]
    #[diagnostic(code(potential::dimension))]
    DimensionMismatch { rows: usize, cols: usize, rhs: usize },
    #[error("the Cholesky factorisation failed: {0}")]
    #[diagnostic(
        code(potential::factorization),
        help("the operator is expected to be positive definite when the permittivity is positive")
    )]
    Factorization(String),
    #[error("the dense LU factorisation is singular")]
    #[diagnostic(code(potential::singular))]
    Singular,
    #[error("the preconditioner could not be built: {0}")]
    #[diagnostic(code(potential::preconditioner))]
    Preconditioner(String),
    #[error("{0} cannot be represented in double precision")]
    #[diagnostic(code(potential::precision))]
    Precision(String),
    #[error("the sine transform solver needs a uniform permittivity: {0}")]
    #[diagnostic(
        code(potential::non_uniform),
        help("use the direct or an iterative solver for structured devices")
    )]
    NonUniformOperator(String),
}

#[cfg(test)]
mod test {
    use super::{BuildError, SolveError};

    fn assert_send_sync<E: Send + Sync + 'static>() {}

    #[test]
    fn errors_convert_into_reports() {
        assert_send_sync::<BuildError>();
        assert_send_sync::<SolveError>();
        let report: color_eyre::Report = SolveError::Singular.into();
        assert_eq!(report.to_string(), "the dense LU factorisation is singular");
    }
}
