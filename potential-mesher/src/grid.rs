//! The uniform square grid of unknowns and the map between grid coordinates and
//! the linear unknown index.
//!
//! Nodes are labelled by a column `i` and a row `j`, both running over `1..=N`.
//! Unknowns are numbered `1..=N²` in row-major order, so that the node `(i, j)`
//! carries the unknown `(j - 1) * N + i`. Every assembler in the workspace walks
//! the grid through [`SquareGrid::nodes`] and converts with
//! [`SquareGrid::linear_index`], so there is a single definition of the ordering.

use crate::location::{ColumnPosition, NodeLocation, RowPosition};

/// Errors raised when a grid cannot be constructed
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridError {
    #[error("a square grid needs at least two nodes per side, found {0}")]
    TooFewNodes(usize),
}

/// The four axis-aligned neighbours of a node
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Towards increasing `i`
    East,
    /// Towards decreasing `i`
    West,
    /// Towards increasing `j`
    North,
    /// Towards decreasing `j`
    South,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::South,
        Direction::West,
        Direction::East,
        Direction::North,
    ];
}

/// A node of the grid, addressed by its 1-based column `i` and row `j`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridNode {
    pub i: usize,
    pub j: usize,
}

impl GridNode {
    pub fn new(i: usize, j: usize) -> Self {
        Self { i, j }
    }
}

/// A square grid with `N` unknowns along each side
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SquareGrid {
    nodes_per_side: usize,
}

impl SquareGrid {
    /// Construct a grid with `nodes_per_side` unknowns along each side. At least two are needed
    /// so that the bottom and top rows (and the left and right columns) are distinct.
    pub fn new(nodes_per_side: usize) -> Result<Self, GridError> {
        if nodes_per_side < 2 {
            return Err(GridError::TooFewNodes(nodes_per_side));
        }
        Ok(Self { nodes_per_side })
    }

    /// The number of unknowns along each side, `N`
    pub fn nodes_per_side(&self) -> usize {
        self.nodes_per_side
    }

    /// The total number of unknowns, `N²`
    pub fn num_elements(&self) -> usize {
        self.nodes_per_side * self.nodes_per_side
    }

    /// The side length of the field grids supplied alongside the grid, `N + 1`
    pub fn field_side(&self) -> usize {
        self.nodes_per_side + 1
    }

    /// Whether `node` lies on the grid of unknowns
    pub fn contains(&self, node: GridNode) -> bool {
        (1..=self.nodes_per_side).contains(&node.i) && (1..=self.nodes_per_side).contains(&node.j)
    }

    /// The 1-based linear index of `node`, `(j - 1) * N + i`
    #[inline]
    pub fn linear_index(&self, node: GridNode) -> usize {
        debug_assert!(self.contains(node), "{node:?} is outside the grid");
        (node.j - 1) * self.nodes_per_side + node.i
    }

    /// The node carrying the 1-based linear index `index`. Inverse of [`Self::linear_index`]
    #[inline]
    pub fn grid_node(&self, index: usize) -> GridNode {
        debug_assert!(
            (1..=self.num_elements()).contains(&index),
            "index {index} is outside the grid"
        );
        let zero_based = index - 1;
        GridNode {
            i: zero_based % self.nodes_per_side + 1,
            j: zero_based / self.nodes_per_side + 1,
        }
    }

    /// Walks the grid in row-major order: rows `j = 1..=N`, and within each row the columns
    /// `i = 1..=N`. The `k`-th item carries the linear index `k + 1`.
    pub fn nodes(&self) -> impl Iterator<Item = GridNode> {
        let n = self.nodes_per_side;
        (1..=n).flat_map(move |j| (1..=n).map(move |i| GridNode { i, j }))
    }

    /// Classify `node` by the walls of the domain it touches
    pub fn location(&self, node: GridNode) -> NodeLocation {
        let n = self.nodes_per_side;
        let row = match node.j {
            1 => RowPosition::Bottom,
            j if j == n => RowPosition::Top,
            _ => RowPosition::Interior,
        };
        let column = match node.i {
            1 => ColumnPosition::Left,
            i if i == n => ColumnPosition::Right,
            _ => ColumnPosition::Interior,
        };
        NodeLocation { row, column }
    }

    /// The neighbour of `node` in `direction`, or `None` when that neighbour lies on the
    /// Dirichlet wall outside the grid of unknowns
    pub fn neighbour(&self, node: GridNode, direction: Direction) -> Option<GridNode> {
        let n = self.nodes_per_side;
        match direction {
            Direction::East if node.i < n => Some(GridNode::new(node.i + 1, node.j)),
            Direction::West if node.i > 1 => Some(GridNode::new(node.i - 1, node.j)),
            Direction::North if node.j < n => Some(GridNode::new(node.i, node.j + 1)),
            Direction::South if node.j > 1 => Some(GridNode::new(node.i, node.j - 1)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Direction, GridError, GridNode, SquareGrid};
    use crate::location::{ColumnPosition, RowPosition};
    use proptest::prelude::*;

    #[test]
    fn grids_with_fewer_than_two_nodes_are_rejected() {
        assert_eq!(SquareGrid::new(0), Err(GridError::TooFewNodes(0)));
        assert_eq!(SquareGrid::new(1), Err(GridError::TooFewNodes(1)));
        assert!(SquareGrid::new(2).is_ok());
    }

    #[test]
    fn grid_sizes_follow_nodes_per_side() {
        let grid = SquareGrid::new(4).unwrap();
        assert_eq!(grid.num_elements(), 16);
        assert_eq!(grid.field_side(), 5);
    }

    #[test]
    fn linear_index_is_row_major_and_one_based() {
        let grid = SquareGrid::new(4).unwrap();
        assert_eq!(grid.linear_index(GridNode::new(1, 1)), 1);
        assert_eq!(grid.linear_index(GridNode::new(4, 1)), 4);
        assert_eq!(grid.linear_index(GridNode::new(1, 2)), 5);
        assert_eq!(grid.linear_index(GridNode::new(4, 4)), 16);
    }

    #[test]
    fn node_iteration_visits_indices_in_order() {
        let grid = SquareGrid::new(5).unwrap();
        for (k, node) in grid.nodes().enumerate() {
            assert_eq!(grid.linear_index(node), k + 1);
        }
        assert_eq!(grid.nodes().count(), grid.num_elements());
    }

    #[test]
    fn corners_touch_two_walls() {
        let grid = SquareGrid::new(3).unwrap();
        let location = grid.location(GridNode::new(1, 1));
        assert_eq!(location.row, RowPosition::Bottom);
        assert_eq!(location.column, ColumnPosition::Left);
        let location = grid.location(GridNode::new(3, 3));
        assert_eq!(location.row, RowPosition::Top);
        assert_eq!(location.column, ColumnPosition::Right);
        let location = grid.location(GridNode::new(2, 2));
        assert!(location.is_interior());
    }

    #[test]
    fn row_neighbours_do_not_wrap_onto_the_next_row() {
        let grid = SquareGrid::new(3).unwrap();
        assert_eq!(grid.neighbour(GridNode::new(3, 1), Direction::East), None);
        assert_eq!(grid.neighbour(GridNode::new(1, 2), Direction::West), None);
        assert_eq!(
            grid.neighbour(GridNode::new(2, 2), Direction::North),
            Some(GridNode::new(2, 3))
        );
        assert_eq!(grid.neighbour(GridNode::new(2, 1), Direction::South), None);
    }

    proptest! {
        #[test]
        fn index_round_trip_recovers_the_node(n in 2usize..64, i in 1usize..64, j in 1usize..64) {
            prop_assume!(i <= n && j <= n);
            let grid = SquareGrid::new(n).unwrap();
            let node = GridNode::new(i, j);
            let index = grid.linear_index(node);
            prop_assert!(index >= 1 && index <= grid.num_elements());
            prop_assert_eq!(grid.grid_node(index), node);
            prop_assert_eq!(grid.linear_index(grid.grid_node(index)), index);
        }
    }
}
