//! # Reconciliation Core
//!
//! A reconciliation library for back-office conferral of bank statements
//! against cash-register and POS entries.
//!
//! ## Features
//!
//! - **Value search**: exact-magnitude lookup of operator-typed amounts,
//!   with `.` and `,` decimal separators handled transparently
//! - **Fuzzy matching**: tiered exact/close/fuzzy search with edit-distance
//!   text similarity and reproducible confidence scoring
//! - **Conferral tracking**: a dedup ledger guarantees each record backs at
//!   most one confirmed match, with undo support
//! - **Cross-source reconciliation**: bucketed grouping, weighted pair
//!   scoring, discrepancy detection, and custom data-driven rules
//! - **Storage abstraction**: database-agnostic design with trait-based
//!   persistence of conferred items and audit events
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{ConferralSession, MemoryStore, Record};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), reconciliation_core::MatchError> {
//! let records = vec![Record::new(
//!     "bank".to_string(),
//!     "row-1".to_string(),
//!     NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
//!     "pix".to_string(),
//!     None,
//!     BigDecimal::from(150),
//!     "TED RECEBIDA".to_string(),
//! )];
//!
//! let mut session = ConferralSession::new(MemoryStore::new());
//! let outcome = session.confer_value("150,00", &records).await?;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

pub mod conferral;
pub mod matching;
pub mod reconciliation;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use conferral::*;
pub use matching::*;
pub use reconciliation::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::MemoryStore;
