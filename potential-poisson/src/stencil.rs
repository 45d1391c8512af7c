// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Stencil
//!
//! The five point stencil of `-∇·(ε∇V)` on the square grid, stored as the five diagonals of the
//! row-major system matrix. Each face between two unknowns carries a coupling `c`, the mean of
//! the permittivity either side of it. The off-diagonal entries of the two nodes sharing the face
//! are `-c` and the face adds `c` to both main diagonal entries. A face on a Dirichlet wall takes
//! the permittivity of the node itself; it adds to the main diagonal but its coupling moves into
//! the right hand side.
//!
//! The diagonals are 1-based: position `k` of each holds the entry in row `k` of the matrix, and
//! position zero is unused. Their lengths are
//! - main: `N² + 1`,
//! - upper and lower: `N²`,
//! - far upper and far lower: `N² - N + 1`.

use crate::fields::FieldGrid;
use nalgebra::RealField;
use potential_mesher::{Direction, GridNode, SquareGrid};
use serde::Deserialize;

/// How the permittivity at a face is computed from the two nodes either side
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Averaging {
    Arithmetic,
    /// Preferred when the permittivity jumps between regions, as the flux through the face is
    /// then continuous
    Harmonic,
}

impl Default for Averaging {
    fn default() -> Self {
        Averaging::Arithmetic
    }
}

impl Averaging {
    #[inline]
    pub fn face<T: Copy + RealField>(&self, a: T, b: T) -> T {
        let two = T::one() + T::one();
        match self {
            Averaging::Arithmetic => (a + b) / two,
            Averaging::Harmonic => two * a * b / (a + b),
        }
    }
}

/// The five non-zero diagonals of the system matrix
#[derive(Debug, Clone, PartialEq)]
pub struct FiveBandDiagonals<T> {
    pub(crate) nodes_per_side: usize,
    pub(crate) main: Vec<T>,
    pub(crate) upper: Vec<T>,
    pub(crate) lower: Vec<T>,
    pub(crate) far_upper: Vec<T>,
    pub(crate) far_lower: Vec<T>,
}

impl<T: Copy + RealField> FiveBandDiagonals<T> {
    fn zeros(grid: &SquareGrid) -> Self {
        let n = grid.nodes_per_side();
        let num_elements = grid.num_elements();
        Self {
            nodes_per_side: n,
            main: vec![T::zero(); num_elements + 1],
            upper: vec![T::zero(); num_elements],
            lower: vec![T::zero(); num_elements],
            far_upper: vec![T::zero(); num_elements - n + 1],
            far_lower: vec![T::zero(); num_elements - n + 1],
        }
    }

    pub fn nodes_per_side(&self) -> usize {
        self.nodes_per_side
    }

    /// The main diagonal, `main[k]` is the entry `(k, k)`
    pub fn main(&self) -> &[T] {
        &self.main
    }

    /// `upper[k]` is the entry `(k, k + 1)`
    pub fn upper(&self) -> &[T] {
        &self.upper
    }

    /// `lower[k]` is the entry `(k + 1, k)`
    pub fn lower(&self) -> &[T] {
        &self.lower
    }

    /// `far_upper[k]` is the entry `(k, k + N)`
    pub fn far_upper(&self) -> &[T] {
        &self.far_upper
    }

    /// `far_lower[k]` is the entry `(k + N, k)`
    pub fn far_lower(&self) -> &[T] {
        &self.far_lower
    }
}

pub struct StencilBuilder<T, RefGrid, RefPermittivity> {
    grid: RefGrid,
    permittivity: RefPermittivity,
    averaging: Averaging,
    marker: std::marker::PhantomData<T>,
}

impl StencilBuilder<(), (), ()> {
    pub fn new() -> Self {
        Self {
            grid: (),
            permittivity: (),
            averaging: Averaging::default(),
            marker: std::marker::PhantomData,
        }
    }
}

impl Default for StencilBuilder<(), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RefGrid, RefPermittivity> StencilBuilder<(), RefGrid, RefPermittivity> {
    pub fn with_grid(self, grid: &SquareGrid) -> StencilBuilder<(), &SquareGrid, RefPermittivity> {
        StencilBuilder {
            grid,
            permittivity: self.permittivity,
            averaging: self.averaging,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_permittivity<Permittivity>(
        self,
        permittivity: &Permittivity,
    ) -> StencilBuilder<(), RefGrid, &Permittivity> {
        StencilBuilder {
            grid: self.grid,
            permittivity,
            averaging: self.averaging,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_averaging(self, averaging: Averaging) -> Self {
        Self { averaging, ..self }
    }
}

impl<'a, T: Copy + RealField> StencilBuilder<(), &'a SquareGrid, &'a FieldGrid<T>> {
    /// Compute the diagonals. The permittivity is assumed validated against the grid.
    #[tracing::instrument(name = "Stencil", level = "info", skip_all)]
    pub fn build(self) -> FiveBandDiagonals<T> {
        let grid = self.grid;
        let permittivity = self.permittivity;
        let averaging = self.averaging;
        let mut diagonals = FiveBandDiagonals::zeros(grid);

        // The face between `node` and its neighbour in `direction`, or the node's own
        // permittivity if that neighbour is on the wall
        let face = |node: GridNode, direction: Direction| {
            let own = permittivity.at(node);
            grid.neighbour(node, direction)
                .map_or(own, |other| averaging.face(own, permittivity.at(other)))
        };

        for node in grid.nodes() {
            let k = grid.linear_index(node);
            let east = face(node, Direction::East);
            let north = face(node, Direction::North);

            diagonals.main[k] = Direction::ALL
                .iter()
                .fold(T::zero(), |acc, &direction| acc + face(node, direction));

            // Row neighbours only couple within the row: the last node of a row has no
            // neighbour at k + 1
            if node.i < grid.nodes_per_side() {
                diagonals.upper[k] = -east;
                diagonals.lower[k] = -east;
            }
            if node.j < grid.nodes_per_side() {
                diagonals.far_upper[k] = -north;
                diagonals.far_lower[k] = -north;
            }
        }
        tracing::trace!(
            "Assembled {} diagonal entries with {:?} face averaging",
            grid.num_elements(),
            averaging
        );
        diagonals
    }
}

#[cfg(test)]
mod test {
    use super::{Averaging, StencilBuilder};
    use crate::fields::FieldGrid;
    use approx::assert_relative_eq;
    use potential_mesher::{GridNode, SquareGrid};
    use rand::{thread_rng, Rng};

    #[test]
    fn diagonal_lengths_follow_the_grid() {
        let grid = SquareGrid::new(4).unwrap();
        let permittivity = FieldGrid::from_element(&grid, 1f64);
        let diagonals = StencilBuilder::new()
            .with_grid(&grid)
            .with_permittivity(&permittivity)
            .build();
        assert_eq!(diagonals.main().len(), 17);
        assert_eq!(diagonals.upper().len(), 16);
        assert_eq!(diagonals.lower().len(), 16);
        assert_eq!(diagonals.far_upper().len(), 13);
        assert_eq!(diagonals.far_lower().len(), 13);
    }

    #[test]
    fn uniform_permittivity_gives_the_five_point_laplacian() {
        let grid = SquareGrid::new(3).unwrap();
        let permittivity = FieldGrid::from_element(&grid, 1f64);
        let diagonals = StencilBuilder::new()
            .with_grid(&grid)
            .with_permittivity(&permittivity)
            .build();
        assert!(diagonals.main()[1..].iter().all(|&x| x == 4.));
        // Positions 3 and 6 close a row, position 9 is the last unknown
        assert_eq!(
            &diagonals.upper()[1..],
            &[-1., -1., 0., -1., -1., 0., -1., -1.]
        );
        assert_eq!(diagonals.upper(), diagonals.lower());
        assert_eq!(&diagonals.far_upper()[1..], &[-1.; 6]);
    }

    #[test]
    fn row_boundary_couplings_are_zero() {
        let mut rng = thread_rng();
        let n = 6;
        let grid = SquareGrid::new(n).unwrap();
        let permittivity = FieldGrid::from_fn(&grid, |_| rng.gen_range(0.5..10.));
        let diagonals = StencilBuilder::new()
            .with_grid(&grid)
            .with_permittivity(&permittivity)
            .build();
        for j in 1..n {
            assert_eq!(diagonals.upper()[j * n], 0.);
            assert_eq!(diagonals.lower()[j * n], 0.);
        }
        assert!(diagonals.upper()[1..]
            .iter()
            .enumerate()
            .filter(|(k, _)| (k + 1) % n != 0)
            .all(|(_, &x)| x < 0.));
    }

    #[test]
    fn rows_sum_to_the_wall_weight() {
        let mut rng = thread_rng();
        let n = 5;
        let grid = SquareGrid::new(n).unwrap();
        let permittivity = FieldGrid::from_fn(&grid, |_| rng.gen_range(1.0..12.));

        for averaging in [Averaging::Arithmetic, Averaging::Harmonic] {
            let diagonals = StencilBuilder::new()
                .with_grid(&grid)
                .with_permittivity(&permittivity)
                .with_averaging(averaging)
                .build();
            for node in grid.nodes() {
                let k = grid.linear_index(node);
                let mut sum = diagonals.main()[k];
                if k < grid.num_elements() {
                    sum += diagonals.upper()[k];
                }
                if k > 1 {
                    sum += diagonals.lower()[k - 1];
                }
                if k + n <= grid.num_elements() {
                    sum += diagonals.far_upper()[k];
                }
                if k > n {
                    sum += diagonals.far_lower()[k - n];
                }
                let walls = grid.location(node).wall_count() as f64;
                assert_relative_eq!(
                    sum,
                    walls * permittivity.at(node),
                    epsilon = 1e-12,
                    max_relative = 1e-12
                );
            }
        }
    }

    #[test]
    fn harmonic_faces_weight_the_smaller_permittivity() {
        let averaging = Averaging::Harmonic;
        assert_relative_eq!(averaging.face(1f64, 1f64), 1.);
        assert_relative_eq!(averaging.face(1f64, 3f64), 1.5);
        assert_relative_eq!(Averaging::Arithmetic.face(1f64, 3f64), 2.);
        let grid = SquareGrid::new(2).unwrap();
        let mut permittivity = FieldGrid::from_element(&grid, 1f64);
        permittivity.set(GridNode::new(2, 1), 3.);
        let diagonals = StencilBuilder::new()
            .with_grid(&grid)
            .with_permittivity(&permittivity)
            .with_averaging(averaging)
            .build();
        assert_relative_eq!(diagonals.upper()[1], -1.5);
    }
}
