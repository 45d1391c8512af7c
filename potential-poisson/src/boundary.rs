// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Boundary
//!
//! The Dirichlet data of the square. The bottom wall is held at zero and the top wall at the
//! applied voltage in units of the thermal voltage. The side walls are insulating, so the
//! potential along them is the one dimensional solution between bottom and top. That solution is
//! also the initial guess for the potential, and the left and right boundary values are read off
//! the first and last column of the guess.

use crate::{constants, error::BuildError};
use nalgebra::{DVector, RealField};
use potential_mesher::{GridNode, SquareGrid};

/// The applied and thermal voltages of the problem
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PhysicalParameters<T> {
    applied_voltage: T,
    thermal_voltage: T,
}

impl<T: Copy + RealField> PhysicalParameters<T> {
    pub fn new(applied_voltage: T, thermal_voltage: T) -> Result<Self, BuildError> {
        if !thermal_voltage.is_finite() || thermal_voltage <= T::zero() {
            return Err(BuildError::NonPositiveThermalVoltage(format!(
                "{thermal_voltage:?}"
            )));
        }
        if !applied_voltage.is_finite() {
            return Err(BuildError::Structure(format!(
                "the applied voltage must be finite, found {applied_voltage:?}"
            )));
        }
        Ok(Self {
            applied_voltage,
            thermal_voltage,
        })
    }

    /// Parameters whose thermal voltage is `k_B T / q` at `temperature` in Kelvin
    pub fn at_temperature(applied_voltage: T, temperature: f64) -> Result<Self, BuildError> {
        let thermal_voltage = T::from_f64(constants::thermal_voltage(temperature))
            .expect("Must be able to fit f64 in T");
        Self::new(applied_voltage, thermal_voltage)
    }

    pub fn applied_voltage(&self) -> T {
        self.applied_voltage
    }

    pub fn thermal_voltage(&self) -> T {
        self.thermal_voltage
    }

    /// The applied voltage in units of the thermal voltage
    pub fn normalised_voltage(&self) -> T {
        self.applied_voltage / self.thermal_voltage
    }
}

/// One value per unknown, stored in solver order and read with the 1-based linear index
#[derive(Debug, Clone, PartialEq)]
pub struct Potential<T: RealField> {
    values: DVector<T>,
}

impl<T: Copy + RealField> Potential<T> {
    /// The linear ramp between the bottom and the top wall. Every node in row `j` takes
    /// `bottom + j * (top - bottom) / (N + 1)`, the exact solution of the uniform problem.
    pub fn linear_ramp(grid: &SquareGrid, bottom: T, top: T) -> Self {
        let intervals =
            T::from_usize(grid.nodes_per_side() + 1).expect("Must be able to fit usize in T");
        let step = (top - bottom) / intervals;
        let values = DVector::from_iterator(
            grid.num_elements(),
            grid.nodes().map(|node| {
                bottom + T::from_usize(node.j).expect("Must be able to fit usize in T") * step
            }),
        );
        Self { values }
    }

    /// The value carried by the unknown with 1-based linear index `index`
    pub fn at(&self, index: usize) -> T {
        self.values[index - 1]
    }

    pub fn as_vector(&self) -> &DVector<T> {
        &self.values
    }
}

/// Dirichlet values on the four walls
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditions<T: RealField> {
    bottom: T,
    top: T,
    left: DVector<T>,
    right: DVector<T>,
}

impl<T: Copy + RealField> BoundaryConditions<T> {
    /// Read the side wall values off the first and last column of `guess`: for each row `j`,
    /// `left[j] = V[(j - 1) N + 1]` and `right[j] = V[j N]`
    pub fn from_guess(grid: &SquareGrid, guess: &Potential<T>, bottom: T, top: T) -> Self {
        let n = grid.nodes_per_side();
        let left = DVector::from_iterator(
            n,
            (1..=n).map(|j| guess.at(grid.linear_index(GridNode::new(1, j)))),
        );
        let right = DVector::from_iterator(
            n,
            (1..=n).map(|j| guess.at(grid.linear_index(GridNode::new(n, j)))),
        );
        Self {
            bottom,
            top,
            left,
            right,
        }
    }

    pub fn bottom(&self) -> T {
        self.bottom
    }

    pub fn top(&self) -> T {
        self.top
    }

    /// The left wall value beside row `j`, 1-based
    pub fn left(&self, j: usize) -> T {
        self.left[j - 1]
    }

    /// The right wall value beside row `j`, 1-based
    pub fn right(&self, j: usize) -> T {
        self.right[j - 1]
    }
}

/// Derive the wall values and the initial potential from the physical parameters
#[tracing::instrument(name = "Boundary conditions", level = "info", skip_all)]
pub fn derive_boundaries<T: Copy + RealField>(
    grid: &SquareGrid,
    parameters: &PhysicalParameters<T>,
) -> (BoundaryConditions<T>, Potential<T>) {
    let bottom = T::zero();
    let top = parameters.normalised_voltage();
    tracing::trace!("Bottom wall at {bottom}, top wall at {top}");
    let guess = Potential::linear_ramp(grid, bottom, top);
    let boundaries = BoundaryConditions::from_guess(grid, &guess, bottom, top);
    (boundaries, guess)
}
