//! Grid primitives for the two-dimensional Poisson solver
//!
//! The solver works on a uniform square grid of `N × N` unknowns enclosed by
//! Dirichlet walls. This crate owns the numbering of those unknowns, the
//! classification of nodes against the walls, and the generation of node
//! coordinates for post-processing.

mod generate;
mod grid;
mod location;
mod mesh;

pub use generate::*;
pub use grid::*;
pub use location::*;
pub use mesh::*;
