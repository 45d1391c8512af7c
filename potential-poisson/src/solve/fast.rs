// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Sine transform solver for uniform permittivity
//!
//! When every face carries the same coefficient `c` the operator is `c (T ⊗ I + I ⊗ T)` with
//! `T = tridiag(-1, 2, -1)`. The type I discrete sine transform `S` diagonalises `T` with
//! eigenvalues `λ_k = 2 - 2 cos(kπ / (N + 1))` and satisfies `S² = (N + 1) / 2 · I`, so
//!
//! `x = (2 / (N + 1))² · S [ (S B S)_{pq} / (c (λ_p + λ_q)) ] S`
//!
//! where `B` is the right hand side laid out on the grid. Each transform is carried out with a
//! complex FFT of length `2 (N + 1)` on the odd extension of the data.

use super::{check_dimensions, to_f64, Diagnostics, LinearSolver, Solution};
use crate::error::SolveError;
use nalgebra::{DMatrix, DVector, RealField};
use nalgebra_sparse::CscMatrix;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Relative tolerance used when checking the matrix entries are uniform
const UNIFORMITY_TOLERANCE: f64 = 1e-12;

/// Direct solver for the uniform permittivity operator. Refuses any other matrix with
/// [`SolveError::NonUniformOperator`].
#[derive(Debug, Copy, Clone, Default)]
pub struct FastPoisson;

impl<T: Copy + RealField> LinearSolver<T> for FastPoisson {
    #[tracing::instrument(name = "Sine transform", level = "info", skip_all)]
    fn solve_from(
        &self,
        matrix: &CscMatrix<T>,
        rhs: &DVector<T>,
        _initial: Option<&DVector<T>>,
    ) -> Result<Solution<T>, SolveError> {
        check_dimensions(matrix, rhs)?;
        let nodes_per_side = side_length(matrix.nrows())?;
        let coefficient = uniform_coefficient(matrix, nodes_per_side)?;
        tracing::info!("Uniform face coefficient {coefficient}");

        let values = rhs
            .iter()
            .map(|&value| to_f64(value))
            .collect::<Result<Vec<_>, _>>()?;
        // Column major, so column `k / N` holds row `k / N` of the grid and neighbours at
        // `k ± 1` stay inside one column
        let mut grid = DMatrix::from_vec(nodes_per_side, nodes_per_side, values);

        let mut transform = SineTransform::new(nodes_per_side);
        transform.apply_2d(&mut grid);
        let eigenvalues = transform.eigenvalues();
        for q in 0..nodes_per_side {
            for p in 0..nodes_per_side {
                grid[(p, q)] /= coefficient * (eigenvalues[p] + eigenvalues[q]);
            }
        }
        transform.apply_2d(&mut grid);
        let scale = 2. / (nodes_per_side + 1) as f64;
        grid *= scale * scale;

        let potential = DVector::from_iterator(
            grid.len(),
            grid.iter().map(|&value| nalgebra::convert::<f64, T>(value)),
        );
        Ok(Solution {
            potential,
            diagnostics: Diagnostics::Direct,
        })
    }
}

fn side_length(unknowns: usize) -> Result<usize, SolveError> {
    let side = (unknowns as f64).sqrt().round() as usize;
    if unknowns == 0 || side * side != unknowns {
        return Err(SolveError::NonUniformOperator(format!(
            "{unknowns} unknowns do not form a square grid"
        )));
    }
    Ok(side)
}

/// Check the matrix is the five point operator with a single face coefficient and return it
fn uniform_coefficient<T: Copy + RealField>(
    matrix: &CscMatrix<T>,
    nodes_per_side: usize,
) -> Result<f64, SolveError> {
    let n = nodes_per_side;
    let expected_entries = 5 * n * n - 4 * n;
    if matrix.nnz() != expected_entries {
        return Err(SolveError::NonUniformOperator(format!(
            "found {} stored entries where the five point operator has {expected_entries}",
            matrix.nnz()
        )));
    }

    let diagonal = match matrix.triplet_iter().find(|(row, col, _)| row == col) {
        Some((_, _, &value)) => to_f64(value)?,
        None => {
            return Err(SolveError::NonUniformOperator(
                "the diagonal is empty".to_string(),
            ))
        }
    };
    let coefficient = diagonal / 4.;
    if coefficient <= 0. {
        return Err(SolveError::NonUniformOperator(format!(
            "the diagonal {diagonal} is not positive"
        )));
    }

    let tolerance = UNIFORMITY_TOLERANCE * diagonal;
    for (row, col, &value) in matrix.triplet_iter() {
        let value = to_f64(value)?;
        let expected = if row == col {
            diagonal
        } else {
            let offset = row.abs_diff(col);
            let same_grid_row = row / n == col / n;
            if !(offset == n || (offset == 1 && same_grid_row)) {
                return Err(SolveError::NonUniformOperator(format!(
                    "({row}, {col}) is not a five point neighbour"
                )));
            }
            -coefficient
        };
        if (value - expected).abs() > tolerance {
            return Err(SolveError::NonUniformOperator(format!(
                "entry ({row}, {col}) is {value} where {expected} was expected"
            )));
        }
    }
    Ok(coefficient)
}

/// The type I discrete sine transform `X_k = Σ_j v_j sin(jkπ / (N + 1))` for `j, k = 1..N`
struct SineTransform {
    size: usize,
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
}

impl SineTransform {
    fn new(size: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(2 * (size + 1));
        Self {
            size,
            fft,
            buffer: vec![Complex::new(0.0, 0.0); 2 * (size + 1)],
        }
    }

    fn eigenvalues(&self) -> Vec<f64> {
        let theta = std::f64::consts::PI / (self.size + 1) as f64;
        (1..=self.size)
            .map(|k| 2. - 2. * (k as f64 * theta).cos())
            .collect()
    }

    /// Transform `values` in place
    fn apply(&mut self, values: &mut [f64]) {
        let length = self.buffer.len();
        self.buffer.fill(Complex::new(0.0, 0.0));
        for (j, &value) in values.iter().enumerate() {
            self.buffer[j + 1] = Complex::new(value, 0.0);
            self.buffer[length - j - 1] = Complex::new(-value, 0.0);
        }
        self.fft.process(&mut self.buffer);
        for (k, value) in values.iter_mut().enumerate() {
            *value = -self.buffer[k + 1].im / 2.;
        }
    }

    /// Transform along both axes of a square grid
    fn apply_2d(&mut self, grid: &mut DMatrix<f64>) {
        for _ in 0..2 {
            for column in grid.as_mut_slice().chunks_mut(self.size) {
                self.apply(column);
            }
            grid.transpose_mut();
        }
    }
}
