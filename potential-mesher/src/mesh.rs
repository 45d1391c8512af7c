use crate::{GridNode, SquareGrid};
use nalgebra::{Point2, RealField};

/// A uniform square mesh: the grid of unknowns with the coordinate of every node
pub struct Mesh2d<T: RealField> {
    grid: SquareGrid,
    spacing: T,
    vertices: Vec<Point2<T>>,
}

impl<T: Copy + RealField> Mesh2d<T> {
    pub(crate) fn from_parts(grid: SquareGrid, spacing: T, vertices: Vec<Point2<T>>) -> Self {
        debug_assert_eq!(vertices.len(), grid.num_elements());
        Self {
            grid,
            spacing,
            vertices,
        }
    }

    pub fn grid(&self) -> &SquareGrid {
        &self.grid
    }

    pub fn num_nodes(&self) -> usize {
        self.vertices.len()
    }

    /// The distance between neighbouring nodes
    pub fn spacing(&self) -> T {
        self.spacing
    }

    /// Node coordinates, in the order of the 0-based unknown index
    pub fn vertices(&self) -> &[Point2<T>] {
        &self.vertices
    }

    /// The coordinate of `node`
    pub fn vertex(&self, node: GridNode) -> &Point2<T> {
        &self.vertices[self.grid.linear_index(node) - 1]
    }
}
