/// This module governs the command line application: it reads the configuration and the device
/// structure, assembles the problem, solves it and writes out the potential
mod configuration;
mod output;
mod structure;
mod telemetry;

pub(crate) use configuration::Configuration;

use crate::{
    error::SolveError,
    fields::Fields,
    problem::{PoissonProblem, PoissonProblemBuilder},
    solve::{compare, Solution, StrategyKind},
};
use clap::{ArgEnum, Parser};
use nalgebra::RealField;
use num_traits::ToPrimitive;
use potential_mesher::SquareGrid;
use serde::de::DeserializeOwned;
use std::{fmt, path::PathBuf, time::Instant};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct App {
    /// A toml file describing regions of permittivity and charge. A uniform permittivity of one
    /// and no charge are used when absent.
    file_path: Option<PathBuf>,
    #[clap(arg_enum, short, long, default_value = "info")]
    log_level: LogLevel,
    /// Override the solver chosen in the configuration
    #[clap(arg_enum, short, long)]
    strategy: Option<Strategy>,
    /// Write the potential to this csv file
    #[clap(short, long)]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum LogLevel {
    Trace,
    Info,
    Debug,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self {
            LogLevel::Trace => "trace",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Error => "error",
        };
        write!(f, "{level}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ArgEnum)]
enum Strategy {
    Direct,
    BiCgStab,
    ConjugateGradient,
    DenseLu,
    FastPoisson,
}

impl From<Strategy> for StrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Direct => StrategyKind::Direct,
            Strategy::BiCgStab => StrategyKind::BiCgStab,
            Strategy::ConjugateGradient => StrategyKind::ConjugateGradient,
            Strategy::DenseLu => StrategyKind::DenseLu,
            Strategy::FastPoisson => StrategyKind::FastPoisson,
        }
    }
}

pub fn run<T>() -> color_eyre::Result<()>
where
    T: Copy + DeserializeOwned + RealField + ToPrimitive,
{
    let cli = App::parse();
    let config: Configuration<T> = Configuration::build()?;

    std::fs::create_dir_all(&config.output.directory)?;
    let (subscriber, _guard) = telemetry::get_subscriber(cli.log_level, &config.output.directory);
    telemetry::init_subscriber(subscriber)?;

    let grid = SquareGrid::new(config.grid.nodes_per_side)?;
    let parameters = config.physical.parameters()?;
    tracing::info!(
        "Applied voltage {} over a thermal voltage of {}",
        parameters.applied_voltage(),
        parameters.thermal_voltage()
    );
    let fields = match &cli.file_path {
        Some(path) => {
            tracing::info!("Reading structure from {}", path.display());
            structure::Structure::<T>::build(path.clone())?.fields(&grid)?
        }
        None => Fields::uniform(&grid, T::one()),
    };

    let problem = PoissonProblemBuilder::new()
        .with_grid(&grid)
        .with_fields(&fields)
        .with_parameters(&parameters)
        .with_averaging(config.stencil.averaging)
        .build()?;

    let kind = cli
        .strategy
        .map(StrategyKind::from)
        .unwrap_or(config.solver.strategy);

    let start = Instant::now();
    let solution = solve_with_fallback(&config, &problem, kind)?;
    tracing::info!("Solved in {:?}", start.elapsed());

    if config.solver.compare {
        let comparison = compare(
            &config.solver.solver(StrategyKind::Direct),
            &config.solver.solver(StrategyKind::BiCgStab),
            problem.matrix(),
            problem.rhs(),
        )?;
        tracing::info!(
            "Direct and iterative solutions differ by at most {}",
            comparison.max_abs_difference
        );
    }

    if config.output.print_potential {
        output::print_potential(&problem, &solution);
    }
    if let Some(path) = cli.output.as_ref().or(config.output.csv.as_ref()) {
        output::write_csv(path, config.grid.side_length, &problem, &solution)?;
    }

    Ok(())
}

/// Solve with the requested method. When the configuration allows it a failed Cholesky
/// factorisation is retried with the preconditioned iterative solver, and a structure the sine
/// transform cannot handle is retried with the Cholesky factorisation.
fn solve_with_fallback<T: Copy + RealField>(
    config: &Configuration<T>,
    problem: &PoissonProblem<T>,
    kind: StrategyKind,
) -> color_eyre::Result<Solution<T>> {
    match problem.solve(&config.solver.solver(kind)) {
        Err(SolveError::Factorization(reason)) if config.solver.fallback => {
            tracing::warn!("Cholesky factorisation failed ({reason}), retrying with BiCGSTAB");
            Ok(problem.solve(&config.solver.solver(StrategyKind::BiCgStab))?)
        }
        Err(SolveError::NonUniformOperator(reason)) if config.solver.fallback => {
            tracing::warn!("{reason}, retrying with the Cholesky factorisation");
            solve_with_fallback(config, problem, StrategyKind::Direct)
        }
        result => Ok(result?),
    }
}
