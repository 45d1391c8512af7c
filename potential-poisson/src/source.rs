// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Source
//!
//! Assembles the right hand side of the linear system: the net charge at every unknown plus the
//! wall couplings the stencil leaves out of the matrix. A node next to a wall gains `ε(i, j) V`
//! for each wall it touches, `V` being the Dirichlet value on that wall. Corner nodes touch one
//! horizontal and one vertical wall and gain both.

use crate::{boundary::BoundaryConditions, fields::Fields, operator::to_solver_index};
use nalgebra::{DVector, RealField};
use potential_mesher::{ColumnPosition, RowPosition, SquareGrid};

pub struct SourceAssemblerBuilder<T, RefGrid, RefFields, RefBoundaries> {
    grid: RefGrid,
    fields: RefFields,
    boundaries: RefBoundaries,
    marker: std::marker::PhantomData<T>,
}

impl SourceAssemblerBuilder<(), (), (), ()> {
    pub fn new() -> Self {
        Self {
            grid: (),
            fields: (),
            boundaries: (),
            marker: std::marker::PhantomData,
        }
    }
}

impl Default for SourceAssemblerBuilder<(), (), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RefGrid, RefFields, RefBoundaries> SourceAssemblerBuilder<(), RefGrid, RefFields, RefBoundaries> {
    pub fn with_grid(
        self,
        grid: &SquareGrid,
    ) -> SourceAssemblerBuilder<(), &SquareGrid, RefFields, RefBoundaries> {
        SourceAssemblerBuilder {
            grid,
            fields: self.fields,
            boundaries: self.boundaries,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_fields<Inputs>(
        self,
        fields: &Inputs,
    ) -> SourceAssemblerBuilder<(), RefGrid, &Inputs, RefBoundaries> {
        SourceAssemblerBuilder {
            grid: self.grid,
            fields,
            boundaries: self.boundaries,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_boundaries<Boundaries>(
        self,
        boundaries: &Boundaries,
    ) -> SourceAssemblerBuilder<(), RefGrid, RefFields, &Boundaries> {
        SourceAssemblerBuilder {
            grid: self.grid,
            fields: self.fields,
            boundaries,
            marker: std::marker::PhantomData,
        }
    }
}

impl<'a, T: Copy + RealField>
    SourceAssemblerBuilder<(), &'a SquareGrid, &'a Fields<T>, &'a BoundaryConditions<T>>
{
    /// Assemble the right hand side in solver order
    #[tracing::instrument(name = "Source", level = "info", skip_all)]
    pub fn build(self) -> DVector<T> {
        let grid = self.grid;
        let boundaries = self.boundaries;
        let mut rhs = DVector::zeros(grid.num_elements());

        for node in grid.nodes() {
            let permittivity = self.fields.permittivity.at(node);
            let location = grid.location(node);

            let mut value = self.fields.charge.at(node);
            value += match location.row {
                RowPosition::Bottom => permittivity * boundaries.bottom(),
                RowPosition::Top => permittivity * boundaries.top(),
                RowPosition::Interior => T::zero(),
            };
            value += match location.column {
                ColumnPosition::Left => permittivity * boundaries.left(node.j),
                ColumnPosition::Right => permittivity * boundaries.right(node.j),
                ColumnPosition::Interior => T::zero(),
            };

            rhs[to_solver_index(grid.linear_index(node))] = value;
        }
        rhs
    }
}

#[cfg(test)]
mod test {
    use super::SourceAssemblerBuilder;
    use crate::boundary::{derive_boundaries, BoundaryConditions, PhysicalParameters, Potential};
    use crate::fields::{FieldGrid, Fields};
    use approx::assert_relative_eq;
    use potential_mesher::{GridNode, SquareGrid};
    use rand::{thread_rng, Rng};

    #[test]
    fn corner_gains_both_walls() {
        let mut rng = thread_rng();
        let grid = SquareGrid::new(4).unwrap();
        let fields = Fields {
            permittivity: FieldGrid::from_fn(&grid, |_| rng.gen_range(1.0..5.)),
            charge: FieldGrid::from_fn(&grid, |_| rng.gen_range(-1.0..1.)),
        };
        let parameters = PhysicalParameters::new(3f64, 1.).unwrap();
        let (boundaries, _) = derive_boundaries(&grid, &parameters);
        let rhs = SourceAssemblerBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_boundaries(&boundaries)
            .build();

        let corner = GridNode::new(1, 1);
        let expected = fields.charge.at(corner)
            + fields.permittivity.at(corner) * (boundaries.left(1) + boundaries.bottom());
        assert_relative_eq!(rhs[0], expected);

        let corner = GridNode::new(4, 4);
        let expected = fields.charge.at(corner)
            + fields.permittivity.at(corner) * (boundaries.right(4) + boundaries.top());
        assert_relative_eq!(rhs[15], expected);
    }

    #[test]
    fn interior_nodes_carry_only_the_charge() {
        let mut rng = thread_rng();
        let grid = SquareGrid::new(5).unwrap();
        let fields = Fields {
            permittivity: FieldGrid::from_fn(&grid, |_| rng.gen_range(1.0..5.)),
            charge: FieldGrid::from_fn(&grid, |_| rng.gen_range(-1.0..1.)),
        };
        let parameters = PhysicalParameters::new(1f64, 0.5).unwrap();
        let (boundaries, _) = derive_boundaries(&grid, &parameters);
        let rhs = SourceAssemblerBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_boundaries(&boundaries)
            .build();

        for node in grid.nodes().filter(|&node| grid.location(node).is_interior()) {
            assert_eq!(rhs[grid.linear_index(node) - 1], fields.charge.at(node));
        }
    }

    #[test]
    fn edges_gain_their_own_wall() {
        let grid = SquareGrid::new(3).unwrap();
        let fields = Fields::uniform(&grid, 2f64);
        let guess = Potential::linear_ramp(&grid, 0., 4.);
        let boundaries = BoundaryConditions::from_guess(&grid, &guess, 0., 4.);
        let rhs = SourceAssemblerBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_boundaries(&boundaries)
            .build();

        // Bottom edge centre: the bottom wall is at zero
        assert_eq!(rhs[1], 0.);
        // Top edge centre
        assert_relative_eq!(rhs[7], 2. * 4.);
        // Left and right of the middle row sit at the row two value of the ramp
        assert_relative_eq!(rhs[3], 2. * 2.);
        assert_relative_eq!(rhs[5], 2. * 2.);
        // Top right corner
        assert_relative_eq!(rhs[8], 2. * (4. + 3.));
    }
}
