//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - normalized gravimeter readings (`Observation`)
//! - solve configuration (`SolveConfig`, `DriftDegree`, `Weighting`)
//! - inversion outputs (`Solution`, `BenchmarkOffset`, `ReducedObservation`, etc.)

pub mod types;

pub use types::*;
