//! Conferral module: the dedup ledger and the session that pairs
//! reservations with conferred-item persistence

pub mod ledger;
pub mod session;

pub use ledger::*;
pub use session::*;
