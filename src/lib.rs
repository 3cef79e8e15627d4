//! `grav-inversion` library crate.
//!
//! Recovers benchmark gravity differences, their uncertainties and instrument
//! drift from relative-gravimeter surveys by weighted least squares.
//!
//! The binary (`ginv`) is a thin wrapper around this library so that:
//!
//! - the inversion is testable without spawning processes
//! - `inversion::solve` can be driven by other front-ends with their own loaders

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod inversion;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;
