/// Which horizontal wall of the domain, if any, a node is adjacent to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RowPosition {
    Bottom,
    Interior,
    Top,
}

/// Which vertical wall of the domain, if any, a node is adjacent to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ColumnPosition {
    Left,
    Interior,
    Right,
}

/// The position of a node relative to the Dirichlet walls
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeLocation {
    pub row: RowPosition,
    pub column: ColumnPosition,
}

impl NodeLocation {
    pub fn is_interior(&self) -> bool {
        self.row == RowPosition::Interior && self.column == ColumnPosition::Interior
    }

    /// The number of wall faces of the node
    pub fn wall_count(&self) -> usize {
        usize::from(self.row != RowPosition::Interior)
            + usize::from(self.column != ColumnPosition::Interior)
    }
}
