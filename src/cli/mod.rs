//! Command-line parsing for the gravity inversion tool.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the inversion code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::DriftDegree;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "ginv", version, about = "Relative gravity survey inversion (weighted least squares)")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Invert a normalized observation file and print benchmark offsets and drift.
    Solve(SolveArgs),
    /// Generate a synthetic survey, invert it, and compare against the truth.
    Demo(DemoArgs),
}

/// Options shared by every command that runs an inversion.
#[derive(Debug, Args, Clone)]
pub struct InversionArgs {
    /// Degree of the drift polynomial.
    #[arg(short = 'd', long, value_enum, default_value = "1")]
    pub degree: DriftDegree,

    /// Anchor benchmark (defaults to the benchmark of the earliest reading).
    #[arg(short = 'a', long)]
    pub anchor: Option<String>,

    /// Feed readings to the solver without earth-tide correction.
    #[arg(long)]
    pub no_tide_correction: bool,

    /// Ordinary least squares (unit weights) instead of 1/σ² weights.
    #[arg(long)]
    pub ols: bool,

    /// Fit a tare step starting at this index of the used readings.
    #[arg(long, value_name = "INDEX")]
    pub tare: Option<usize>,

    /// Subtract the fitted drift from reduced readings.
    #[arg(long)]
    pub remove_drift: bool,

    /// Exclude the reading at this index (0-based, in file order after time sort). Repeatable.
    #[arg(long = "exclude", value_name = "INDEX")]
    pub exclude: Vec<usize>,

    /// Print per-reading reduced values and residuals.
    #[arg(long)]
    pub residuals: bool,

    /// Export the solution to JSON.
    #[arg(long = "export-solution", value_name = "JSON")]
    pub export_solution: Option<PathBuf>,

    /// Export the sampled drift curve to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Sampling interval of the exported drift curve (seconds).
    #[arg(long, default_value_t = 60.0)]
    pub curve_interval: f64,
}

/// Options for `solve`.
#[derive(Debug, Args, Clone)]
pub struct SolveArgs {
    /// Observation file: `time,benchmark,value,error[,tide,applied]` per line.
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub inversion: InversionArgs,
}

/// Options for `demo`.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Number of benchmarks in the loop.
    #[arg(long, default_value_t = 4)]
    pub benchmarks: usize,

    /// Number of times the loop is repeated.
    #[arg(long, default_value_t = 3)]
    pub loops: usize,

    /// Seconds between consecutive readings.
    #[arg(long, default_value_t = 600)]
    pub step: i64,

    /// Instrument drift (µGal/hour).
    #[arg(long, default_value_t = 10.0)]
    pub drift: f64,

    /// Reading noise standard deviation (µGal).
    #[arg(long, default_value_t = 3.0)]
    pub noise: f64,

    /// Tide correction amplitude (mGal) applied by the simulated instrument.
    #[arg(long, default_value_t = 0.0)]
    pub tide_amplitude: f64,

    /// Simulate a tare of this many µGal starting at the `--tare` used reading
    /// (excluded readings are skipped when placing the step).
    #[arg(long, value_name = "UGAL", requires = "tare")]
    pub tare_step: Option<f64>,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub inversion: InversionArgs,
}
