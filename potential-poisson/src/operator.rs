// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Operator
//!
//! Turns the five diagonals into a sparse matrix. Every entry is pushed as a `(row, column,
//! value)` triplet into a growing coordinate list, which is then compressed with duplicates
//! summed. The stencil and source assemblers count unknowns from one; the solvers count from
//! zero. [`to_solver_index`] is the only place where one becomes the other.

use crate::stencil::FiveBandDiagonals;
use nalgebra::RealField;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Map a 1-based unknown index onto the 0-based row of the linear system
#[inline]
pub fn to_solver_index(index: usize) -> usize {
    debug_assert!(index >= 1, "unknowns are numbered from one");
    index - 1
}

/// Assemble the `N² x N²` system matrix from its diagonals
///
/// # Panics
/// If the diagonals are not sized for `N² x N²`, which is a bug in the assembler that
/// produced them
#[tracing::instrument(name = "Operator", level = "info", skip_all)]
pub fn assemble_matrix<T: Copy + RealField>(diagonals: &FiveBandDiagonals<T>) -> CscMatrix<T> {
    let n = diagonals.nodes_per_side();
    let num_elements = n * n;
    let mut coo = CooMatrix::new(num_elements, num_elements);

    let mut push = |row: usize, column: usize, value: T| {
        // Row-boundary couplings are structurally zero
        if value != T::zero() {
            coo.push(to_solver_index(row), to_solver_index(column), value);
        }
    };

    for k in 1..=num_elements {
        push(k, k, diagonals.main[k]);
    }
    for k in 1..num_elements {
        push(k, k + 1, diagonals.upper[k]);
        push(k + 1, k, diagonals.lower[k]);
    }
    for k in 1..=num_elements - n {
        push(k, k + n, diagonals.far_upper[k]);
        push(k + n, k, diagonals.far_lower[k]);
    }

    tracing::trace!("Pushed {} triplets", coo.nnz());
    CscMatrix::from(&coo)
}
