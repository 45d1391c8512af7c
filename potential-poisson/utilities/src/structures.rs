use potential_mesher::SquareGrid;
use potential_poisson::{
    Averaging, FieldGrid, Fields, PhysicalParameters, PoissonProblem, PoissonProblemBuilder,
};
use rand::{thread_rng, Rng};

/// Permittivity drawn uniformly from `[1, 12)` and a charge from `[-1, 1)` at every point
pub fn construct_random_fields(grid: &SquareGrid) -> Fields<f64> {
    let mut rng = thread_rng();
    Fields {
        permittivity: FieldGrid::from_fn(grid, |_| rng.gen_range(1.0..12.0)),
        charge: FieldGrid::from_fn(grid, |_| rng.gen_range(-1.0..1.0)),
    }
}

/// Two materials: a low permittivity slab across the middle third of the rows
pub fn construct_layered_fields(grid: &SquareGrid, slab: f64, background: f64) -> Fields<f64> {
    let n = grid.nodes_per_side();
    let (lower, upper) = (n / 3 + 1, 2 * n / 3);
    Fields {
        permittivity: FieldGrid::from_fn(grid, |node| {
            if (lower..=upper).contains(&node.j) {
                slab
            } else {
                background
            }
        }),
        charge: FieldGrid::from_element(grid, 0.),
    }
}

/// Assemble a problem at room temperature thermal voltage with the given fields
pub fn construct_problem(
    grid: &SquareGrid,
    fields: &Fields<f64>,
    applied_voltage: f64,
    averaging: Averaging,
) -> PoissonProblem<f64> {
    let parameters = PhysicalParameters::at_temperature(applied_voltage, 300.)
        .expect("Room temperature gives a positive thermal voltage");
    PoissonProblemBuilder::new()
        .with_grid(grid)
        .with_fields(fields)
        .with_parameters(&parameters)
        .with_averaging(averaging)
        .build()
        .expect("Generated fields are valid")
}

/// A problem with random permittivity and charge on an `n x n` grid
pub fn construct_random_problem(nodes_per_side: usize) -> PoissonProblem<f64> {
    let grid = SquareGrid::new(nodes_per_side).expect("Benchmarks use at least two nodes");
    let fields = construct_random_fields(&grid);
    construct_problem(&grid, &fields, 0.5, Averaging::Arithmetic)
}
