//! Mathematical utilities: weighted least squares and drift polynomials.

pub mod polynomial;
pub mod wls;

pub use polynomial::*;
pub use wls::*;
