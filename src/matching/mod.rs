//! Single-source matching: value normalization, exact search, and the
//! fuzzy match engine

pub mod fuzzy;
pub mod value;
pub mod weights;

pub use fuzzy::*;
pub use value::*;
