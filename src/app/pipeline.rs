//! Shared inversion pipeline used by the `solve` and `demo` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load (or generate) readings -> apply exclusions -> solve
//!
//! The command handlers can then focus on presentation and exports.

use tracing::info;

use crate::data::{SurveyPlan, SyntheticSurvey, generate_survey};
use crate::domain::{Observation, Solution, SolveConfig};
use crate::error::AppError;
use crate::inversion::solve;
use crate::io::ingest::{IngestedData, load_observations};

/// All computed outputs of a `ginv solve` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub ingest: IngestedData,
    pub solution: Solution,
}

/// Outputs of a `ginv demo` run.
#[derive(Debug, Clone)]
pub struct DemoOutput {
    pub survey: SyntheticSurvey,
    pub solution: Solution,
}

/// Load a file, drop excluded readings, and invert.
pub fn run_solve(
    input: &std::path::Path,
    exclude: &[usize],
    config: &SolveConfig,
) -> Result<RunOutput, AppError> {
    let mut ingest = load_observations(input)?;
    apply_exclusions(&mut ingest.observations, exclude)?;

    let solution = solve(&ingest.observations, config)?;
    Ok(RunOutput { ingest, solution })
}

/// Generate a synthetic survey, drop excluded readings, and invert.
pub fn run_demo(plan: &SurveyPlan, exclude: &[usize], config: &SolveConfig) -> Result<DemoOutput, AppError> {
    let mut survey = generate_survey(plan)?;
    info!(
        readings = survey.observations.len(),
        benchmarks = plan.benchmarks,
        seed = plan.seed,
        "synthetic survey generated"
    );
    apply_exclusions(&mut survey.observations, exclude)?;

    let solution = solve(&survey.observations, config)?;
    Ok(DemoOutput { survey, solution })
}

/// Clear `include` on the given reading indices.
pub fn apply_exclusions(observations: &mut [Observation], exclude: &[usize]) -> Result<(), AppError> {
    let n = observations.len();
    for &idx in exclude {
        let Some(obs) = observations.get_mut(idx) else {
            return Err(AppError::new(
                2,
                format!("Cannot exclude reading {idx}: only {n} readings were loaded."),
            ));
        };
        obs.include = false;
    }
    if !exclude.is_empty() {
        info!(excluded = exclude.len(), "readings excluded from the solution");
    }
    Ok(())
}
