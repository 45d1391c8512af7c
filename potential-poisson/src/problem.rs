// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Problem
//!
//! A fully assembled Poisson problem. The builder validates the inputs, derives the boundary
//! values, and assembles the matrix and the right hand side exactly once. The resulting
//! [`PoissonProblem`] can then be solved with any [`LinearSolver`].

use crate::{
    boundary::{derive_boundaries, BoundaryConditions, PhysicalParameters, Potential},
    error::{BuildError, SolveError},
    fields::Fields,
    operator::{assemble_matrix, to_solver_index},
    solve::{LinearSolver, Solution},
    source::SourceAssemblerBuilder,
    stencil::{Averaging, StencilBuilder},
};
use nalgebra::{DVector, RealField};
use nalgebra_sparse::CscMatrix;
use potential_mesher::{GridNode, SquareGrid};

pub struct PoissonProblemBuilder<T, RefGrid, RefFields, RefParameters> {
    grid: RefGrid,
    fields: RefFields,
    parameters: RefParameters,
    averaging: Averaging,
    marker: std::marker::PhantomData<T>,
}

impl PoissonProblemBuilder<(), (), (), ()> {
    pub fn new() -> Self {
        Self {
            grid: (),
            fields: (),
            parameters: (),
            averaging: Averaging::default(),
            marker: std::marker::PhantomData,
        }
    }
}

impl Default for PoissonProblemBuilder<(), (), (), ()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<RefGrid, RefFields, RefParameters> PoissonProblemBuilder<(), RefGrid, RefFields, RefParameters> {
    pub fn with_grid(
        self,
        grid: &SquareGrid,
    ) -> PoissonProblemBuilder<(), &SquareGrid, RefFields, RefParameters> {
        PoissonProblemBuilder {
            grid,
            fields: self.fields,
            parameters: self.parameters,
            averaging: self.averaging,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_fields<Inputs>(
        self,
        fields: &Inputs,
    ) -> PoissonProblemBuilder<(), RefGrid, &Inputs, RefParameters> {
        PoissonProblemBuilder {
            grid: self.grid,
            fields,
            parameters: self.parameters,
            averaging: self.averaging,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_parameters<Parameters>(
        self,
        parameters: &Parameters,
    ) -> PoissonProblemBuilder<(), RefGrid, RefFields, &Parameters> {
        PoissonProblemBuilder {
            grid: self.grid,
            fields: self.fields,
            parameters,
            averaging: self.averaging,
            marker: std::marker::PhantomData,
        }
    }

    pub fn with_averaging(self, averaging: Averaging) -> Self {
        Self { averaging, ..self }
    }
}

impl<'a, T: Copy + RealField>
    PoissonProblemBuilder<(), &'a SquareGrid, &'a Fields<T>, &'a PhysicalParameters<T>>
{
    #[tracing::instrument(name = "Poisson problem", level = "info", skip_all)]
    pub fn build(self) -> Result<PoissonProblem<T>, BuildError> {
        let grid = *self.grid;
        self.fields.validate(&grid)?;
        tracing::info!(
            "Assembling {} unknowns on a {}x{} grid",
            grid.num_elements(),
            grid.nodes_per_side(),
            grid.nodes_per_side()
        );

        let (boundaries, initial_guess) = derive_boundaries(&grid, self.parameters);
        let diagonals = StencilBuilder::new()
            .with_grid(&grid)
            .with_permittivity(&self.fields.permittivity)
            .with_averaging(self.averaging)
            .build();
        let rhs = SourceAssemblerBuilder::new()
            .with_grid(&grid)
            .with_fields(self.fields)
            .with_boundaries(&boundaries)
            .build();
        let matrix = assemble_matrix(&diagonals);
        tracing::trace!("System matrix has {} non-zeros", matrix.nnz());

        Ok(PoissonProblem {
            grid,
            boundaries,
            initial_guess,
            matrix,
            rhs,
        })
    }
}

/// The linear system `A V = b` for the potential, with the data it was assembled from
#[derive(Debug, Clone)]
pub struct PoissonProblem<T: RealField> {
    grid: SquareGrid,
    boundaries: BoundaryConditions<T>,
    initial_guess: Potential<T>,
    matrix: CscMatrix<T>,
    rhs: DVector<T>,
}

impl<T: Copy + RealField> PoissonProblem<T> {
    pub fn grid(&self) -> &SquareGrid {
        &self.grid
    }

    pub fn boundaries(&self) -> &BoundaryConditions<T> {
        &self.boundaries
    }

    pub fn matrix(&self) -> &CscMatrix<T> {
        &self.matrix
    }

    pub fn rhs(&self) -> &DVector<T> {
        &self.rhs
    }

    /// Solve for the potential. Iterative solvers start from the linear ramp between the walls.
    pub fn solve<S: LinearSolver<T>>(&self, solver: &S) -> Result<Solution<T>, SolveError> {
        solver.solve_from(
            &self.matrix,
            &self.rhs,
            Some(self.initial_guess.as_vector()),
        )
    }

    /// The solved potential at `node`, read from `solution`
    pub fn potential_at(&self, solution: &Solution<T>, node: GridNode) -> T {
        solution.potential[to_solver_index(self.grid.linear_index(node))]
    }
}

#[cfg(test)]
mod test {
    use super::PoissonProblemBuilder;
    use crate::boundary::PhysicalParameters;
    use crate::error::BuildError;
    use crate::fields::{FieldGrid, Fields};
    use crate::solve::{
        BiCgStab, DirectCholesky, IterativeSettings, LinearSolver, Ordering, PreconditionerKind,
    };
    use crate::stencil::Averaging;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use potential_mesher::SquareGrid;
    use rand::{thread_rng, Rng};

    #[test]
    fn uniform_problem_reproduces_the_linear_ramp() {
        let grid = SquareGrid::new(4).unwrap();
        let fields = Fields::uniform(&grid, 1f64);
        let parameters = PhysicalParameters::new(1f64, 1.).unwrap();
        let problem = PoissonProblemBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_parameters(&parameters)
            .build()
            .unwrap();

        let settings = IterativeSettings {
            tolerance: 1e-12,
            maximum_iterations: None,
            preconditioner: PreconditionerKind::IncompleteLu,
        };
        let direct = problem.solve(&DirectCholesky::default()).unwrap();
        // Start from zero so the iterative path has something to do
        let iterative = BiCgStab::new(settings)
            .solve(problem.matrix(), problem.rhs())
            .unwrap();
        assert!(iterative.diagnostics.converged());

        for node in grid.nodes() {
            let expected = node.j as f64 / 5.;
            assert_relative_eq!(problem.potential_at(&direct, node), expected, epsilon = 1e-12);
            assert_relative_eq!(
                problem.potential_at(&iterative, node),
                expected,
                epsilon = 1e-10
            );
        }
    }

    #[test]
    fn zero_voltage_and_charge_give_zero_potential() {
        let mut rng = thread_rng();
        let grid = SquareGrid::new(6).unwrap();
        let fields = Fields {
            permittivity: FieldGrid::from_fn(&grid, |_| rng.gen_range(1.0..10.)),
            charge: FieldGrid::from_element(&grid, 0.),
        };
        let parameters = PhysicalParameters::new(0f64, 0.025).unwrap();
        let problem = PoissonProblemBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_parameters(&parameters)
            .with_averaging(Averaging::Harmonic)
            .build()
            .unwrap();
        let solution = problem.solve(&DirectCholesky::default()).unwrap();
        assert!(solution.potential.iter().all(|&v| v == 0.));
    }

    #[test]
    fn direct_and_iterative_paths_agree() {
        let mut rng = thread_rng();
        let grid = SquareGrid::new(12).unwrap();
        let fields = Fields {
            permittivity: FieldGrid::from_fn(&grid, |_| rng.gen_range(1.0..12.)),
            charge: FieldGrid::from_fn(&grid, |_| rng.gen_range(-0.5..0.5)),
        };
        let parameters = PhysicalParameters::new(0.3f64, 0.025852).unwrap();
        let problem = PoissonProblemBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_parameters(&parameters)
            .build()
            .unwrap();

        let tolerance = 1e-11;
        let direct = problem
            .solve(&DirectCholesky::new(Ordering::ReverseCuthillMckee))
            .unwrap();
        let iterative = problem
            .solve(&BiCgStab::new(IterativeSettings {
                tolerance,
                maximum_iterations: Some(1000),
                preconditioner: PreconditionerKind::IncompleteLu,
            }))
            .unwrap();
        assert!(iterative.diagnostics.converged());
        let scale = direct.potential.amax();
        assert_relative_eq!(
            direct.potential,
            iterative.potential,
            epsilon = 1e-7 * scale
        );
    }

    #[test]
    fn invalid_fields_are_refused_before_assembly() {
        let grid = SquareGrid::new(3).unwrap();
        let mut fields = Fields::uniform(&grid, 1f64);
        fields.permittivity = FieldGrid::from_matrix(DMatrix::from_element(4, 4, -1.));
        let parameters = PhysicalParameters::new(1f64, 1.).unwrap();
        let result = PoissonProblemBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_parameters(&parameters)
            .build();
        assert!(matches!(
            result,
            Err(BuildError::NonPositivePermittivity { i: 1, j: 1, .. })
        ));
    }
}
