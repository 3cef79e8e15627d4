//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - loads or generates readings
//! - runs the inversion
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{Command, DemoArgs, InversionArgs, SolveArgs};
use crate::data::SurveyPlan;
use crate::domain::{Solution, SolveConfig, Weighting};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `ginv` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is the normal case.
    dotenvy::dotenv().ok();

    let cli = crate::cli::Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Command::Solve(args) => handle_solve(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_solve(args: SolveArgs) -> Result<(), AppError> {
    let config = solve_config_from_args(&args.inversion);
    let run = pipeline::run_solve(&args.input, &args.inversion.exclude, &config)?;

    println!(
        "{}",
        crate::report::format_run_summary(Some(&run.ingest), &run.solution, &config)
    );
    print_tables(&run.solution, &args.inversion);
    write_exports(&run.solution, &config, &args.inversion)
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = solve_config_from_args(&args.inversion);
    let plan = survey_plan_from_args(&args);
    let run = pipeline::run_demo(&plan, &args.inversion.exclude, &config)?;

    println!("{}", crate::report::format_run_summary(None, &run.solution, &config));
    print_tables(&run.solution, &args.inversion);

    println!("Synthetic truth (drift {:.1} μGal/day):", run.survey.drift_per_second * 86_400.0);
    println!(
        "{}",
        crate::report::format_truth_comparison(&run.solution, &run.survey.true_offsets)
    );

    write_exports(&run.solution, &config, &args.inversion)
}

fn print_tables(solution: &Solution, args: &InversionArgs) {
    println!("{}", crate::report::format_benchmark_table(solution));
    if args.residuals {
        println!("{}", crate::report::format_residual_table(solution));
    }
}

fn write_exports(solution: &Solution, config: &SolveConfig, args: &InversionArgs) -> Result<(), AppError> {
    if let Some(path) = &args.export_solution {
        crate::io::export::write_solution_json(path, solution, config)?;
    }
    if let Some(path) = &args.export_curve {
        check_curve_interval(solution.span_seconds, args.curve_interval)?;
        crate::io::curve::write_curve_json(path, solution, args.curve_interval)?;
    }
    Ok(())
}

/// Reject sampling intervals that are non-positive or would produce an oversized grid.
pub fn check_curve_interval(span_seconds: f64, interval: f64) -> Result<(), AppError> {
    if !(interval.is_finite() && interval > 0.0) {
        return Err(AppError::new(2, "`--curve-interval` must be a positive number of seconds."));
    }
    let points = crate::math::curve_point_count(span_seconds, interval);
    if points > crate::math::MAX_CURVE_POINTS {
        return Err(AppError::new(
            2,
            format!(
                "`--curve-interval` {interval} s would sample {points} points; at most {} are allowed.",
                crate::math::MAX_CURVE_POINTS
            ),
        ));
    }
    Ok(())
}

pub fn solve_config_from_args(args: &InversionArgs) -> SolveConfig {
    SolveConfig {
        degree: args.degree,
        anchor: args.anchor.clone(),
        correct_tide: !args.no_tide_correction,
        weighting: if args.ols {
            Weighting::Uniform
        } else {
            Weighting::InverseVariance
        },
        tare_enabled: args.tare.is_some(),
        tare_index: args.tare.unwrap_or(0),
        remove_drift: args.remove_drift,
    }
}

pub fn survey_plan_from_args(args: &DemoArgs) -> SurveyPlan {
    SurveyPlan {
        benchmarks: args.benchmarks,
        loops: args.loops,
        step_seconds: args.step,
        drift_per_hour: args.drift,
        noise_ugal: args.noise,
        tide_amplitude: args.tide_amplitude,
        tare: args
            .tare_step
            .zip(args.inversion.tare)
            .map(|(step, index)| (generated_index(index, &args.inversion.exclude), step)),
        seed: args.seed,
        ..SurveyPlan::default()
    }
}

/// Position among all generated readings of the `used_index`-th reading left
/// after `exclude` is applied.
///
/// `--tare` counts used readings while the generator counts every reading.
pub fn generated_index(used_index: usize, exclude: &[usize]) -> usize {
    let mut sorted = exclude.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut index = used_index;
    for excluded in sorted {
        if excluded <= index {
            index += 1;
        }
    }
    index
}
