//! Validation utilities
//!
//! The parser collaborator is expected to hand over normalized records, but
//! the invariants are cheap to restate, so batch entry points re-check them.

use std::collections::HashSet;

use crate::types::*;

/// Validate that a record upholds the record-model invariants
pub fn validate_record(record: &Record) -> MatchResult<()> {
    if record.source_id.trim().is_empty() {
        return Err(MatchError::InvalidRecord(
            "Source ID cannot be empty".to_string(),
        ));
    }

    if record.record_id.trim().is_empty() {
        return Err(MatchError::InvalidRecord(
            "Record ID cannot be empty".to_string(),
        ));
    }

    if record.original_text.len() > 500 {
        return Err(MatchError::InvalidRecord(format!(
            "Original text of record '{}' exceeds 500 characters",
            record.key()
        )));
    }

    if let Some(identifier) = &record.identifier {
        if !identifier.chars().all(|c| c.is_ascii_digit()) {
            return Err(MatchError::InvalidRecord(format!(
                "Identifier of record '{}' is not in digits-only form",
                record.key()
            )));
        }
    }

    if record.amount != normalize_amount(record.amount.clone()) {
        return Err(MatchError::InvalidRecord(format!(
            "Amount of record '{}' is not normalized to two decimal places",
            record.key()
        )));
    }

    Ok(())
}

/// Validate a batch of records belonging to one source: every record must
/// carry the source's ID and record IDs must be unique within the batch.
pub fn validate_source_records(source_id: &str, records: &[Record]) -> MatchResult<()> {
    let mut seen = HashSet::new();

    for record in records {
        validate_record(record)?;

        if record.source_id != source_id {
            return Err(MatchError::InvalidRecord(format!(
                "Record '{}' does not belong to source '{}'",
                record.key(),
                source_id
            )));
        }

        if !seen.insert(record.record_id.as_str()) {
            return Err(MatchError::InvalidRecord(format!(
                "Duplicate record ID '{}' in source '{}'",
                record.record_id, source_id
            )));
        }
    }

    Ok(())
}
