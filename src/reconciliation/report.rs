//! Match and report types produced by a reconciliation run
//!
//! Everything here is plain serializable data with no behavior beyond
//! convenience accessors, so any CSV/JSON/XLSX writer can consume a report
//! directly.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::reconciliation::rules::RecordField;
use crate::types::Record;

/// How strongly a cross-source match holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// Value and date agree exactly
    Exact,
    /// Value and date agree within tolerance
    Approximate,
    /// Qualified through weaker signals (text, identifiers, custom rules)
    Pattern,
    /// Paired by an operator, not the engine
    Manual,
}

/// Weight of a field-level disagreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Operator decision attached to a match after the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResolution {
    Accept,
    Reject,
    Merge,
    Investigate,
}

/// A field-level disagreement between records that otherwise match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    /// The disagreeing field
    pub field: RecordField,
    /// Rendered field value per participating source
    pub values_by_source: Vec<(String, String)>,
    pub severity: Severity,
    /// Human-readable explanation
    pub reason: String,
}

/// One record's role in a match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchParticipant {
    pub source_id: String,
    pub record: Record,
    /// Fields on which this match agreed
    pub matching_fields: Vec<RecordField>,
}

/// A proposed correspondence between records from different sources.
///
/// Immutable once produced by the engine, except for the operator-attached
/// [`resolution`](Self::resolution).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationMatch {
    /// Combined confidence in `[0, 1]`
    pub confidence: BigDecimal,
    pub match_type: MatchType,
    /// Two or more records, all from different sources
    pub participants: Vec<MatchParticipant>,
    pub discrepancies: Vec<Discrepancy>,
    /// Operator decision, attached after the run
    pub resolution: Option<MatchResolution>,
}

impl ReconciliationMatch {
    /// Pair records by operator decision rather than engine scoring
    pub fn manual(participants: Vec<MatchParticipant>) -> Self {
        Self {
            confidence: BigDecimal::from(1),
            match_type: MatchType::Manual,
            participants,
            discrepancies: Vec::new(),
            resolution: None,
        }
    }

    /// Attach an operator decision
    pub fn resolve(&mut self, resolution: MatchResolution) {
        self.resolution = Some(resolution);
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    pub fn has_discrepancies(&self) -> bool {
        !self.discrepancies.is_empty()
    }
}

/// Match counts per confidence band
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceHistogram {
    /// Confidence ≥ 0.9
    pub high: usize,
    /// Confidence ≥ 0.7
    pub medium: usize,
    /// Confidence ≥ 0.3
    pub low: usize,
}

/// Aggregate statistics over one reconciliation run.
///
/// A record counts as matched if it appears in at least one match,
/// regardless of how many matches it appears in, so
/// `matched_records + unmatched_records == total_records` and the value
/// totals add up the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_records: usize,
    pub matched_records: usize,
    pub unmatched_records: usize,
    /// Sum of record magnitudes across all sources
    pub total_value: BigDecimal,
    pub matched_value: BigDecimal,
    pub unmatched_value: BigDecimal,
    pub histogram: ConfidenceHistogram,
}

/// Per-source record and match counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTotals {
    pub source_id: String,
    pub records: usize,
    pub matched: usize,
}

/// Aggregate of all matches from one reconciliation run. Read-only after
/// the run, apart from operator resolutions on individual matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub generated_at: NaiveDateTime,
    /// Matches in descending confidence order
    pub matches: Vec<ReconciliationMatch>,
    pub summary: ReconciliationSummary,
    pub sources: Vec<SourceTotals>,
}

impl ReconciliationReport {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Whether every record across all sources found at least one match
    pub fn is_fully_matched(&self) -> bool {
        self.summary.unmatched_records == 0
    }
}
