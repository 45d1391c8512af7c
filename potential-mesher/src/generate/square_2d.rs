use crate::grid::{GridError, SquareGrid};
use crate::mesh::Mesh2d;
use nalgebra::{Point2, RealField, Vector2};

/// A mesh of the unit square with `nodes_per_side` unknowns along each side
pub fn create_unit_square_mesh_2d<T>(nodes_per_side: usize) -> Result<Mesh2d<T>, GridError>
where
    T: Copy + RealField,
{
    create_square_mesh_2d(T::one(), nodes_per_side, &Vector2::new(T::zero(), T::zero()))
}

/// A mesh of the square of side `side_length` whose lower-left corner sits at `origin`.
///
/// The walls of the square carry the Dirichlet data, so the `N` unknowns along each side are
/// placed strictly inside it at a spacing of `side_length / (N + 1)`.
pub fn create_square_mesh_2d<T>(
    side_length: T,
    nodes_per_side: usize,
    origin: &Vector2<T>,
) -> Result<Mesh2d<T>, GridError>
where
    T: Copy + RealField,
{
    let grid = SquareGrid::new(nodes_per_side)?;
    let intervals = T::from_usize(grid.nodes_per_side() + 1).expect("Must be able to fit usize in T");
    let spacing = side_length / intervals;

    let mut vertices = Vec::with_capacity(grid.num_elements());
    for node in grid.nodes() {
        let i_as_t = T::from_usize(node.i).expect("Must be able to fit usize in T");
        let j_as_t = T::from_usize(node.j).expect("Must be able to fit usize in T");
        let v = origin + Vector2::new(i_as_t, j_as_t) * spacing;
        vertices.push(Point2::from(v));
    }

    Ok(Mesh2d::from_parts(grid, spacing, vertices))
}

#[cfg(test)]
mod test {
    use super::{create_square_mesh_2d, create_unit_square_mesh_2d};
    use crate::{GridError, GridNode, Mesh2d};
    use nalgebra::Vector2;

    #[test]
    fn unit_square_nodes_sit_inside_the_walls() {
        let mesh: Mesh2d<f64> = create_unit_square_mesh_2d(4).unwrap();
        assert_eq!(mesh.num_nodes(), 16);
        assert!((mesh.spacing() - 0.2).abs() < 1e-15);
        let first = mesh.vertex(GridNode::new(1, 1));
        assert!((first.x - 0.2).abs() < 1e-15 && (first.y - 0.2).abs() < 1e-15);
        let last = mesh.vertex(GridNode::new(4, 4));
        assert!((last.x - 0.8).abs() < 1e-15 && (last.y - 0.8).abs() < 1e-15);
    }

    #[test]
    fn vertices_follow_the_row_major_ordering() {
        let origin = Vector2::new(-1f64, 2f64);
        let mesh = create_square_mesh_2d(3f64, 2, &origin).unwrap();
        let vertices = mesh.vertices();
        // Row j = 1 first, then j = 2
        assert!(vertices[0].y < vertices[2].y);
        assert!(vertices[0].x < vertices[1].x);
        assert!((vertices[0].x - 0.0).abs() < 1e-15);
        assert!((vertices[3].y - 4.0).abs() < 1e-15);
    }

    #[test]
    fn vertex_lookup_matches_the_linear_index() {
        let mesh: Mesh2d<f64> = create_unit_square_mesh_2d(3).unwrap();
        for node in mesh.grid().nodes() {
            let index = mesh.grid().linear_index(node) - 1;
            assert_eq!(mesh.vertex(node), &mesh.vertices()[index]);
        }
    }

    #[test]
    fn degenerate_grids_are_refused() {
        let result = create_unit_square_mesh_2d::<f64>(1);
        assert!(matches!(result, Err(GridError::TooFewNodes(1))));
    }
}
