//! Value normalization and exact-amount search
//!
//! This is the search behind the "confer a value" flow: the operator types a
//! monetary amount and the matcher finds the statement rows whose magnitude
//! equals it exactly. The matcher only queries; reserving a match is the
//! caller's job, which keeps the search idempotent and safe to retry.

use bigdecimal::BigDecimal;
use std::str::FromStr;
use tracing::debug;

use crate::conferral::DedupLedger;
use crate::types::*;

/// Parse an operator-typed amount into a normalized decimal.
///
/// Accepts either `.` or `,` as the decimal separator. When both appear, the
/// rightmost one is taken as the decimal separator and the other is treated
/// as a grouping separator, so `1.234,56` and `1,234.56` both parse to
/// `1234.56`. A repeated separator is treated as grouping (`1.234.567`).
///
/// Empty, non-numeric, or negative input is an [`MatchError::InvalidQuery`],
/// which callers surface immediately; it is never conflated with "no match
/// found".
pub fn parse_amount_query(text: &str) -> MatchResult<BigDecimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MatchError::InvalidQuery(
            "Query value cannot be empty".to_string(),
        ));
    }

    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();

    let dots = compact.matches('.').count();
    let commas = compact.matches(',').count();

    let normalized = if dots > 0 && commas > 0 {
        // Rightmost separator wins as the decimal point.
        let last_dot = compact.rfind('.').unwrap_or(0);
        let last_comma = compact.rfind(',').unwrap_or(0);
        let (decimal, grouping) = if last_dot > last_comma {
            ('.', ',')
        } else {
            (',', '.')
        };
        compact
            .chars()
            .filter(|&c| c != grouping)
            .map(|c| if c == decimal { '.' } else { c })
            .collect::<String>()
    } else if commas == 1 {
        compact.replace(',', ".")
    } else if commas > 1 {
        compact.replace(',', "")
    } else if dots > 1 {
        compact.replace('.', "")
    } else {
        compact
    };

    let amount = BigDecimal::from_str(&normalized)
        .map_err(|_| MatchError::InvalidQuery(format!("Not a numeric value: '{trimmed}'")))?;

    if amount < BigDecimal::from(0) {
        return Err(MatchError::InvalidQuery(format!(
            "Query value must be non-negative: '{trimmed}'"
        )));
    }

    Ok(normalize_amount(amount))
}

/// Result of one value search
#[derive(Debug, Clone, PartialEq)]
pub struct ValueSearch {
    /// The parsed, normalized query amount
    pub query: BigDecimal,
    /// Candidate records in their original order
    pub matches: Vec<Record>,
}

/// Cardinality classification of a [`ValueSearch`]
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSearchOutcome<'a> {
    /// No unreserved record has this magnitude; recorded for audit, not an
    /// error
    NotFound,
    /// Exactly one candidate, eligible for automatic confirmation
    Unique(&'a Record),
    /// Multiple candidates; the caller must disambiguate, the matcher never
    /// guesses
    Ambiguous(&'a [Record]),
}

impl ValueSearch {
    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn outcome(&self) -> ValueSearchOutcome<'_> {
        match self.matches.as_slice() {
            [] => ValueSearchOutcome::NotFound,
            [single] => ValueSearchOutcome::Unique(single),
            many => ValueSearchOutcome::Ambiguous(many),
        }
    }
}

/// Exact-magnitude matcher over a single record set
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueMatcher;

impl ValueMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Find all unreserved records whose `|amount|` equals the queried
    /// amount. The sign is ignored: the operator confers magnitudes.
    ///
    /// This method never mutates the ledger; confirmation is performed by
    /// the conferral session.
    pub fn search(
        &self,
        query_text: &str,
        records: &[Record],
        ledger: &DedupLedger,
    ) -> MatchResult<ValueSearch> {
        let query = parse_amount_query(query_text)?;

        let matches: Vec<Record> = records
            .iter()
            .filter(|record| record.magnitude() == query && !ledger.is_reserved(&record.key()))
            .cloned()
            .collect();

        debug!(
            query = %query,
            candidates = matches.len(),
            "value search completed"
        );

        Ok(ValueSearch { query, matches })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(id: &str, amount: &str) -> Record {
        Record::new(
            "bank".to_string(),
            id.to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "pix".to_string(),
            None,
            BigDecimal::from_str(amount).unwrap(),
            "TED".to_string(),
        )
    }

    #[test]
    fn parses_dot_and_comma_decimals() {
        assert_eq!(
            parse_amount_query("150.00").unwrap(),
            BigDecimal::from_str("150.00").unwrap()
        );
        assert_eq!(
            parse_amount_query("150,00").unwrap(),
            BigDecimal::from_str("150.00").unwrap()
        );
        assert_eq!(
            parse_amount_query(" 0,5 ").unwrap(),
            BigDecimal::from_str("0.50").unwrap()
        );
    }

    #[test]
    fn parses_grouped_amounts_in_both_conventions() {
        assert_eq!(
            parse_amount_query("1.234,56").unwrap(),
            BigDecimal::from_str("1234.56").unwrap()
        );
        assert_eq!(
            parse_amount_query("1,234.56").unwrap(),
            BigDecimal::from_str("1234.56").unwrap()
        );
        assert_eq!(
            parse_amount_query("1.234.567").unwrap(),
            BigDecimal::from_str("1234567.00").unwrap()
        );
    }

    #[test]
    fn rejects_empty_and_non_numeric_input() {
        assert!(matches!(
            parse_amount_query("   "),
            Err(MatchError::InvalidQuery(_))
        ));
        assert!(matches!(
            parse_amount_query("abc"),
            Err(MatchError::InvalidQuery(_))
        ));
        assert!(matches!(
            parse_amount_query("12,34,56.7.8"),
            Err(MatchError::InvalidQuery(_))
        ));
    }

    #[test]
    fn rejects_negative_queries() {
        assert!(matches!(
            parse_amount_query("-10"),
            Err(MatchError::InvalidQuery(_))
        ));
    }

    #[test]
    fn matches_magnitude_regardless_of_sign() {
        let records = vec![record("credit", "150.00"), record("debit", "-150.00")];
        let ledger = DedupLedger::new();

        let search = ValueMatcher::new()
            .search("150,00", &records, &ledger)
            .unwrap();
        assert_eq!(search.matches.len(), 2);
        assert!(matches!(
            search.outcome(),
            ValueSearchOutcome::Ambiguous(_)
        ));
    }

    #[test]
    fn excludes_reserved_records() {
        let records = vec![record("a", "99.90"), record("b", "99.90")];
        let ledger = DedupLedger::new();
        assert!(ledger.reserve(&records[0].key()));

        let search = ValueMatcher::new()
            .search("99.90", &records, &ledger)
            .unwrap();
        assert_eq!(search.matches.len(), 1);
        assert_eq!(search.matches[0].record_id, "b");
        assert!(matches!(search.outcome(), ValueSearchOutcome::Unique(_)));
    }

    #[test]
    fn no_match_is_an_outcome_not_an_error() {
        let records = vec![record("a", "10.00")];
        let ledger = DedupLedger::new();

        let search = ValueMatcher::new()
            .search("20.00", &records, &ledger)
            .unwrap();
        assert!(!search.has_matches());
        assert_eq!(search.outcome(), ValueSearchOutcome::NotFound);
    }
}
