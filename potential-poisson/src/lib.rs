// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Potential solves the two dimensional Poisson equation for the electrostatic potential in a
//! region of spatially varying permittivity
//!
//! # Overview
//! The equation `-∇·(ε∇V) = ρ` is discretised with finite differences on a uniform square grid
//! of `N × N` unknowns. The bottom wall of the square is held at zero, the top wall at the
//! applied voltage and the insulating side walls follow the one dimensional solution between
//! them. All voltages are measured in units of the thermal voltage `k_B T / q`.
//!
//! The pipeline runs in a fixed order:
//! 1. the [`fields`] are validated against the grid,
//! 2. the [`boundary`] values and an initial potential are derived,
//! 3. the five point [`stencil`] is computed from the permittivity,
//! 4. the right hand side is assembled by [`source`],
//! 5. the [`operator`] compresses the stencil into a sparse matrix,
//! 6. the system is handed to a [`solve::LinearSolver`].
//!
//! Steps one to five are driven by [`problem::PoissonProblemBuilder`].
//!
//! # Usage
//! The binary reads its settings from `.config/default.toml` and optionally a structure file
//! describing rectangular regions of permittivity and charge:
//!
//! ```toml
//! background_permittivity = 11.7
//!
//! [[regions]]
//! columns = [1, 8]
//! rows = [10, 12]
//! permittivity = 3.9
//! charge = 0.0
//! ```

pub mod app;
pub mod boundary;
mod constants;
pub mod error;
pub mod fields;
pub mod operator;
pub mod problem;
pub mod solve;
pub mod source;
pub mod stencil;

pub use boundary::{BoundaryConditions, PhysicalParameters, Potential};
pub use error::{BuildError, SolveError};
pub use fields::{FieldGrid, Fields};
pub use problem::{PoissonProblem, PoissonProblemBuilder};
pub use solve::{LinearSolver, Solution, SolverStrategy};
pub use stencil::Averaging;
