use crate::{problem::PoissonProblem, solve::Solution};
use itertools::izip;
use nalgebra::{RealField, Vector2};
use num_traits::ToPrimitive;
use potential_mesher::{create_square_mesh_2d, GridNode};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Log the potential one grid row per line, top row first so the output reads like the device
pub(crate) fn print_potential<T: Copy + RealField + ToPrimitive>(
    problem: &PoissonProblem<T>,
    solution: &Solution<T>,
) {
    let n = problem.grid().nodes_per_side();
    for j in (1..=n).rev() {
        let row = (1..=n)
            .map(|i| problem.potential_at(solution, GridNode::new(i, j)))
            .map(|value| format!("{:>12.6}", value.to_f64().unwrap_or(f64::NAN)))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!("row {j:>4}: {row}");
    }
}

/// Write `i,j,x,y,potential` for every unknown, with the node coordinates of a square of side
/// `side_length` whose lower left corner sits at the origin
pub(crate) fn write_csv<T: Copy + RealField + ToPrimitive>(
    path: &Path,
    side_length: T,
    problem: &PoissonProblem<T>,
    solution: &Solution<T>,
) -> color_eyre::Result<()> {
    let grid = problem.grid();
    let mesh = create_square_mesh_2d(
        side_length,
        grid.nodes_per_side(),
        &Vector2::new(T::zero(), T::zero()),
    )?;

    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "i,j,x,y,potential")?;
    for (node, vertex, value) in izip!(grid.nodes(), mesh.vertices(), solution.potential.iter()) {
        writeln!(
            writer,
            "{},{},{:.10e},{:.10e},{:.10e}",
            node.i,
            node.j,
            vertex.x.to_f64().unwrap_or(f64::NAN),
            vertex.y.to_f64().unwrap_or(f64::NAN),
            value.to_f64().unwrap_or(f64::NAN)
        )?;
    }
    writer.flush()?;
    tracing::info!("Wrote the potential to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod test {
    use super::write_csv;
    use crate::boundary::PhysicalParameters;
    use crate::fields::Fields;
    use crate::problem::PoissonProblemBuilder;
    use crate::solve::{DirectCholesky, LinearSolver};
    use potential_mesher::SquareGrid;

    #[test]
    fn csv_has_one_line_per_unknown() {
        let grid = SquareGrid::new(3).unwrap();
        let fields = Fields::uniform(&grid, 1f64);
        let parameters = PhysicalParameters::new(1f64, 1.).unwrap();
        let problem = PoissonProblemBuilder::new()
            .with_grid(&grid)
            .with_fields(&fields)
            .with_parameters(&parameters)
            .build()
            .unwrap();
        let solution = DirectCholesky::default()
            .solve(problem.matrix(), problem.rhs())
            .unwrap();

        let path = std::env::temp_dir().join(format!("potential-{}.csv", std::process::id()));
        write_csv(&path, 4f64, &problem, &solution).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let lines = contents.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[0], "i,j,x,y,potential");
        let first = lines[1].split(',').collect::<Vec<_>>();
        assert_eq!(first[..2], ["1", "1"]);
        assert_eq!(first[2].parse::<f64>().unwrap(), 1.);
        approx::assert_relative_eq!(first[4].parse::<f64>().unwrap(), 0.25, epsilon = 1e-9);
    }
}
