// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Fields
//!
//! The permittivity and net charge maps supplied by the caller. Both are dense grids with one
//! value per physical grid point, `(N + 1) x (N + 1)` of them, addressed with the same 1-based
//! `(i, j)` as the unknowns. The assemblers read the `1..=N` block; the outer layer is carried
//! so that callers can pass the maps of the enclosing device unchanged.

use crate::error::BuildError;
use nalgebra::{DMatrix, RealField};
use potential_mesher::{GridNode, SquareGrid};

/// A scalar field sampled on the physical grid points
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid<T: RealField> {
    values: DMatrix<T>,
}

impl<T: Copy + RealField> FieldGrid<T> {
    /// A field taking `value` at every point of the grid
    pub fn from_element(grid: &SquareGrid, value: T) -> Self {
        let side = grid.field_side();
        Self {
            values: DMatrix::from_element(side, side, value),
        }
    }

    /// A field evaluated point by point, `f` is called with the 1-based node of each point
    pub fn from_fn<F>(grid: &SquareGrid, mut f: F) -> Self
    where
        F: FnMut(GridNode) -> T,
    {
        let side = grid.field_side();
        Self {
            values: DMatrix::from_fn(side, side, |i, j| f(GridNode::new(i + 1, j + 1))),
        }
    }

    /// Wrap a dense matrix whose entry `(i - 1, j - 1)` holds the value at node `(i, j)`
    pub fn from_matrix(values: DMatrix<T>) -> Self {
        Self { values }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// The value at the 1-based `node`
    #[inline]
    pub fn at(&self, node: GridNode) -> T {
        self.values[(node.i - 1, node.j - 1)]
    }

    pub fn set(&mut self, node: GridNode, value: T) {
        self.values[(node.i - 1, node.j - 1)] = value;
    }

    fn check_shape(&self, name: &'static str, grid: &SquareGrid) -> Result<(), BuildError> {
        let expected = (grid.field_side(), grid.field_side());
        if self.shape() != expected {
            return Err(BuildError::MissizedField {
                name,
                expected,
                found: self.shape(),
            });
        }
        Ok(())
    }

    fn check_finite(&self, name: &'static str) -> Result<(), BuildError> {
        match self
            .values
            .iter()
            .position(|value| !value.is_finite())
            .map(|position| self.node_of_storage_index(position))
        {
            Some(node) => Err(BuildError::NonFiniteField {
                name,
                i: node.i,
                j: node.j,
            }),
            None => Ok(()),
        }
    }

    // Column-major storage: position = (j - 1) * rows + (i - 1)
    fn node_of_storage_index(&self, position: usize) -> GridNode {
        let rows = self.values.nrows();
        GridNode::new(position % rows + 1, position / rows + 1)
    }
}

/// The inputs to the Poisson problem defined on the physical grid
#[derive(Debug, Clone)]
pub struct Fields<T: RealField> {
    pub permittivity: FieldGrid<T>,
    pub charge: FieldGrid<T>,
}

impl<T: Copy + RealField> Fields<T> {
    /// Uniform permittivity and no charge, the default device of the solver
    pub fn uniform(grid: &SquareGrid, permittivity: T) -> Self {
        Self {
            permittivity: FieldGrid::from_element(grid, permittivity),
            charge: FieldGrid::from_element(grid, T::zero()),
        }
    }

    /// Validate the fields against `grid`: both must be `(N + 1) x (N + 1)` and finite, and the
    /// permittivity must be strictly positive at every point.
    pub fn validate(&self, grid: &SquareGrid) -> Result<(), BuildError> {
        self.permittivity.check_shape("permittivity", grid)?;
        self.charge.check_shape("charge", grid)?;
        self.permittivity.check_finite("permittivity")?;
        self.charge.check_finite("charge")?;

        if let Some(position) = self
            .permittivity
            .values
            .iter()
            .position(|&value| value <= T::zero())
        {
            let node = self.permittivity.node_of_storage_index(position);
            return Err(BuildError::NonPositivePermittivity {
                i: node.i,
                j: node.j,
                value: format!("{:?}", self.permittivity.at(node)),
            });
        }
        Ok(())
    }
}
