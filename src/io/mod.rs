//! Input/output helpers.
//!
//! - normalized observation ingest + validation (`ingest`)
//! - solution JSON export (`export`)
//! - drift curve JSON (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;
