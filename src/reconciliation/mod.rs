//! Reconciliation module for cross-source matching of bank statements,
//! cash-register entries, and other independently produced record sets

pub mod engine;
pub mod report;
pub mod rules;

pub use engine::*;
pub use report::*;
pub use rules::*;
