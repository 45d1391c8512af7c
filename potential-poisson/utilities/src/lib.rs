//! Construction helpers shared by the benches and integration tests

pub mod structures;

use nalgebra_sparse::{CooMatrix, CscMatrix};
use rand::{thread_rng, Rng};

/// A symmetric positive definite five point matrix on an `n x n` grid with random couplings,
/// diagonally dominant so every solver in the crate accepts it
pub fn construct_test_operator(nodes_per_side: usize) -> CscMatrix<f64> {
    let mut rng = thread_rng();
    let num_rows = nodes_per_side * nodes_per_side;
    let mut coo = CooMatrix::new(num_rows, num_rows);
    let mut diagonal = vec![0f64; num_rows];

    let mut couple = |a: usize, b: usize, coo: &mut CooMatrix<f64>| {
        let value: f64 = rng.gen_range(0.5..2.0);
        coo.push(a, b, -value);
        coo.push(b, a, -value);
        diagonal[a] += value;
        diagonal[b] += value;
    };

    for row in 0..num_rows {
        if (row + 1) % nodes_per_side != 0 {
            couple(row, row + 1, &mut coo);
        }
        if row + nodes_per_side < num_rows {
            couple(row, row + nodes_per_side, &mut coo);
        }
    }
    for (row, value) in diagonal.into_iter().enumerate() {
        coo.push(row, row, value + 1.);
    }
    CscMatrix::from(&coo)
}
