//! Core types and data structures for the reconciliation system

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Normalize an amount to two decimal places, rounding half away from zero.
///
/// Every amount in the system passes through this function exactly once, at
/// the record boundary. Downstream comparisons can then rely on a uniform
/// scale and never re-round.
pub fn normalize_amount(amount: BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

/// Canonicalize an identifier to its digits-only form.
///
/// Accepts formatted national tax identifiers (e.g. `123.456.789-01`) and
/// strips everything that is not a digit. Returns `None` when no digits
/// remain, so a punctuation-only identifier never produces a spurious match.
pub fn canonical_identifier(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Globally unique identity of a record.
///
/// `record_id` is only unique within its source, so the ledger and the
/// reconciliation engine always key on the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    /// Source or batch that produced the record
    pub source_id: String,
    /// Identifier unique within the source
    pub record_id: String,
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.source_id, self.record_id)
    }
}

/// One normalized transaction record from a single source.
///
/// Records are produced by an external parser and are immutable once
/// constructed. The constructor is the single normalization point: the
/// amount is scaled to two decimals and the identifier reduced to its
/// digits-only canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Source or batch that produced this record
    pub source_id: String,
    /// Identifier unique within the source
    pub record_id: String,
    /// Calendar date of the transaction (no time component)
    pub date: NaiveDate,
    /// Categorical payment tag (open set: "pix", "card", "cash", ...)
    pub payment_type: String,
    /// Optional national tax identifier, digits-only canonical form
    pub identifier: Option<String>,
    /// Signed amount, two-decimal scale: credits positive, debits negative
    pub amount: BigDecimal,
    /// Free-form source description
    pub original_text: String,
}

impl Record {
    /// Create a new record, normalizing the amount and identifier
    pub fn new(
        source_id: String,
        record_id: String,
        date: NaiveDate,
        payment_type: String,
        identifier: Option<String>,
        amount: BigDecimal,
        original_text: String,
    ) -> Self {
        Self {
            source_id,
            record_id,
            date,
            payment_type,
            identifier: identifier.as_deref().and_then(canonical_identifier),
            amount: normalize_amount(amount),
            original_text,
        }
    }

    /// Global identity of this record
    pub fn key(&self) -> RecordKey {
        RecordKey {
            source_id: self.source_id.clone(),
            record_id: self.record_id.clone(),
        }
    }

    /// Absolute value of the amount. Value search matches magnitudes, since
    /// an operator confers the statement figure regardless of direction.
    pub fn magnitude(&self) -> BigDecimal {
        self.amount.abs()
    }
}

/// A record that has been confirmed against an operator-supplied value.
///
/// Created only through a successful confirmation in a conferral session;
/// never mutated; destroyed only by an explicit undo, which releases the
/// underlying record back to the unmatched pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferredItem {
    /// The confirmed record
    pub record: Record,
    /// When the confirmation happened
    pub conferred_at: NaiveDateTime,
    /// Globally unique handle for the confirmation event
    pub conferred_id: Uuid,
}

impl ConferredItem {
    /// Confirm a record now
    pub fn new(record: Record) -> Self {
        Self {
            record,
            conferred_at: chrono::Utc::now().naive_utc(),
            conferred_id: Uuid::new_v4(),
        }
    }
}

/// What a confer attempt was about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventSubject {
    /// A specific record was targeted
    RecordRef {
        source_id: String,
        record_id: String,
    },
    /// Only a queried value is known (nothing matched it)
    QueryValue(BigDecimal),
}

/// How a confer attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventOutcome {
    Matched,
    NotFound,
    AlreadyConferred,
}

/// Audit event handed to the storage collaborator after every confirmation
/// or failed lookup. The core emits these; it performs no I/O itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConferEvent {
    pub subject: EventSubject,
    pub outcome: EventOutcome,
    pub timestamp: NaiveDateTime,
}

impl ConferEvent {
    fn now(subject: EventSubject, outcome: EventOutcome) -> Self {
        Self {
            subject,
            outcome,
            timestamp: chrono::Utc::now().naive_utc(),
        }
    }

    /// A record was matched and conferred
    pub fn matched(record: &Record) -> Self {
        Self::now(
            EventSubject::RecordRef {
                source_id: record.source_id.clone(),
                record_id: record.record_id.clone(),
            },
            EventOutcome::Matched,
        )
    }

    /// A queried value matched nothing
    pub fn not_found(query: BigDecimal) -> Self {
        Self::now(EventSubject::QueryValue(query), EventOutcome::NotFound)
    }

    /// A record was targeted but had already been conferred
    pub fn already_conferred(record: &Record) -> Self {
        Self::now(
            EventSubject::RecordRef {
                source_id: record.source_id.clone(),
                record_id: record.record_id.clone(),
            },
            EventOutcome::AlreadyConferred,
        )
    }
}

/// Errors that can occur in the reconciliation core.
///
/// Expected business conditions (no match, ambiguous match) are result
/// variants on the respective operations, not errors; only user-correctable
/// input and configuration problems live here.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Invalid amount query: {0}")]
    InvalidQuery(String),
    #[error("Record already conferred: {0}")]
    AlreadyConferred(RecordKey),
    #[error("Conferred item not found: {0}")]
    ConferralNotFound(Uuid),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Invalid reconciliation rule: {0}")]
    InvalidRule(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for reconciliation operations
pub type MatchResult<T> = Result<T, MatchError>;
