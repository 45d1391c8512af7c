// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Constants
//!
//! Defines physical constants used to normalise the applied voltage

pub const BOLTZMANN: f64 = 1.38064852e-23; // The Boltzmann constant in m^2 kg / s^2 K
pub const ELECTRON_CHARGE: f64 = 1.60217662e-19; // Single electron charge in C

/// The thermal voltage `k_B T / q` in volts at `temperature` kelvin
pub fn thermal_voltage(temperature: f64) -> f64 {
    BOLTZMANN * temperature / ELECTRON_CHARGE
}
