use crate::{
    boundary::PhysicalParameters,
    solve::{IterativeSettings, Ordering, PreconditionerKind, SolverStrategy, StrategyKind},
    stencil::Averaging,
};
use color_eyre::eyre::eyre;
use config::{Config, Environment, File};
use nalgebra::RealField;
use serde::{de::DeserializeOwned, Deserialize};
use std::{env, path::PathBuf};

#[derive(Debug, Deserialize)]
pub(crate) struct Configuration<T> {
    pub(crate) grid: GridConfiguration<T>,
    pub(crate) physical: PhysicalConfiguration<T>,
    #[serde(default)]
    pub(crate) stencil: StencilConfiguration,
    pub(crate) solver: SolverConfiguration<T>,
    pub(crate) output: OutputConfiguration,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GridConfiguration<T> {
    pub(crate) nodes_per_side: usize,
    /// Physical side length of the square, used only to place the nodes in the output
    pub(crate) side_length: T,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhysicalConfiguration<T> {
    pub(crate) applied_voltage: T,
    /// Takes precedence over the temperature when both are given
    pub(crate) thermal_voltage: Option<T>,
    pub(crate) temperature: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct StencilConfiguration {
    #[serde(default)]
    pub(crate) averaging: Averaging,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SolverConfiguration<T> {
    pub(crate) strategy: StrategyKind,
    #[serde(default)]
    pub(crate) ordering: Ordering,
    #[serde(default)]
    pub(crate) preconditioner: PreconditionerKind,
    pub(crate) tolerance: T,
    pub(crate) maximum_iterations: Option<usize>,
    /// Retry with the iterative solver when the Cholesky factorisation fails
    #[serde(default)]
    pub(crate) fallback: bool,
    /// Also solve iteratively and report the difference to the direct solution
    #[serde(default)]
    pub(crate) compare: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OutputConfiguration {
    pub(crate) directory: PathBuf,
    pub(crate) csv: Option<PathBuf>,
    #[serde(default)]
    pub(crate) print_potential: bool,
}

impl<T: DeserializeOwned> Configuration<T> {
    pub(crate) fn build() -> color_eyre::Result<Self> {
        let config_directory = env::var("CONFIG_DIR").unwrap_or_else(|_| ".config".into());
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // The default settings which we use in the general case
            .add_source(File::with_name(&format!("{}/default", config_directory)))
            // The override settings which may be set by the user, optional
            .add_source(
                File::with_name(&format!("{}/{}", config_directory, run_mode)).required(false),
            )
            // For example `POTENTIAL__GRID__NODES_PER_SIDE=64`
            .add_source(Environment::with_prefix("POTENTIAL").separator("__"))
            .build()?;

        s.try_deserialize()
            .map_err(|e| eyre!(format!("Failed to deserialize the config file: {:?}", e)))
    }
}

impl<T: Copy + RealField> PhysicalConfiguration<T> {
    pub(crate) fn parameters(&self) -> color_eyre::Result<PhysicalParameters<T>> {
        let parameters = match (self.thermal_voltage, self.temperature) {
            (Some(thermal_voltage), _) => {
                PhysicalParameters::new(self.applied_voltage, thermal_voltage)?
            }
            (None, Some(temperature)) => {
                PhysicalParameters::at_temperature(self.applied_voltage, temperature)?
            }
            (None, None) => {
                return Err(eyre!(
                    "The configuration needs either a thermal voltage or a temperature"
                ))
            }
        };
        Ok(parameters)
    }
}

impl<T: Copy + RealField> SolverConfiguration<T> {
    pub(crate) fn iterative_settings(&self) -> IterativeSettings<T> {
        IterativeSettings {
            tolerance: self.tolerance,
            maximum_iterations: self.maximum_iterations,
            preconditioner: self.preconditioner,
        }
    }

    pub(crate) fn solver(&self, kind: StrategyKind) -> SolverStrategy<T> {
        SolverStrategy::new(kind, self.ordering, self.iterative_settings())
    }
}
