// Utility functions
pub mod error;
pub mod geo;

pub use error::*;
