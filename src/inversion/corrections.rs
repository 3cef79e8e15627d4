//! Corrections applied around the inversion.
//!
//! Before solving:
//! - select the used readings and order them by time
//! - validate what the solver will consume
//! - bring every reading to the requested tide-correction state and convert to µGal
//!
//! After solving:
//! - broadcast the tare step and (optionally) the drift back onto each reading
//!   to produce reduced values for display

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{BenchmarkOffset, MGAL_TO_UGAL, Observation, ReducedObservation};
use crate::inversion::InversionError;
use crate::math::evaluate_polynomial;

/// A used reading together with its position in the caller's list.
#[derive(Debug, Clone, Copy)]
pub struct ActiveObservation<'a> {
    pub index: usize,
    pub observation: &'a Observation,
}

/// Readings with `include` set, stably ordered by time.
pub fn active_subset(observations: &[Observation]) -> Vec<ActiveObservation<'_>> {
    let mut active: Vec<ActiveObservation<'_>> = observations
        .iter()
        .enumerate()
        .filter(|(_, o)| o.include)
        .map(|(index, observation)| ActiveObservation { index, observation })
        .collect();
    active.sort_by_key(|a| a.observation.time);
    active
}

/// Reject readings the solver cannot use.
pub fn validate(active: &[ActiveObservation<'_>]) -> Result<(), InversionError> {
    for a in active {
        let o = a.observation;
        let reason = if !o.value.is_finite() {
            Some(format!("non-finite value {}", o.value))
        } else if !o.error.is_finite() || o.error <= 0.0 {
            Some(format!("error must be finite and > 0, got {}", o.error))
        } else if !o.tide.is_finite() {
            Some(format!("non-finite tide correction {}", o.tide))
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(InversionError::InvalidObservation { index: a.index, reason });
        }
    }
    Ok(())
}

/// Reading (mGal) in the requested tide-correction state.
///
/// Adds the tide when correction is requested but was not applied by the
/// instrument; removes it when correction is not requested but was applied.
pub fn tide_corrected_value(observation: &Observation, correct_tide: bool) -> f64 {
    match (correct_tide, observation.tide_applied) {
        (true, false) => observation.value + observation.tide,
        (false, true) => observation.value - observation.tide,
        _ => observation.value,
    }
}

/// Tide-toggled readings scaled to µGal, in active order.
pub fn solver_values(active: &[ActiveObservation<'_>], correct_tide: bool) -> Vec<f64> {
    active
        .iter()
        .map(|a| MGAL_TO_UGAL * tide_corrected_value(a.observation, correct_tide))
        .collect()
}

/// Seconds since `reference` for each used reading.
pub fn elapsed_seconds(active: &[ActiveObservation<'_>], reference: DateTime<Utc>) -> Vec<f64> {
    active
        .iter()
        .map(|a| (a.observation.time - reference).num_milliseconds() as f64 / 1000.0)
        .collect()
}

/// Tare contribution per reading: `0` before the tare index, `magnitude` after.
pub fn tare_offsets(n: usize, tare: Option<(usize, f64)>) -> Vec<f64> {
    match tare {
        Some((index, magnitude)) => (0..n).map(|i| if i < index { 0.0 } else { magnitude }).collect(),
        None => vec![0.0; n],
    }
}

/// Inputs needed to reduce readings after a solve.
#[derive(Debug, Clone, Copy)]
pub struct Reduction<'a> {
    pub drift_coefficients: &'a [f64],
    pub offsets: &'a BTreeMap<String, BenchmarkOffset>,
    pub tare: Option<(usize, f64)>,
    pub remove_drift: bool,
}

/// Subtract fitted offsets, tare and (optionally) drift from each reading.
pub fn reduce(
    active: &[ActiveObservation<'_>],
    times: &[f64],
    values: &[f64],
    reduction: Reduction<'_>,
) -> Vec<ReducedObservation> {
    let tares = tare_offsets(active.len(), reduction.tare);

    active
        .iter()
        .zip(times.iter().zip(values.iter()))
        .zip(tares)
        .map(|((a, (&t, &value)), tare)| {
            let offset = reduction
                .offsets
                .get(&a.observation.benchmark)
                .map(|o| o.offset)
                .unwrap_or(0.0);
            let drift = evaluate_polynomial(reduction.drift_coefficients, t);

            let mut reduced = value - offset - tare;
            if reduction.remove_drift {
                reduced -= drift;
            }

            ReducedObservation {
                index: a.index,
                time: a.observation.time,
                benchmark: a.observation.benchmark.clone(),
                elapsed_seconds: t,
                value,
                offset,
                drift,
                tare,
                reduced,
                residual: value - (drift + offset + tare),
            }
        })
        .collect()
}
