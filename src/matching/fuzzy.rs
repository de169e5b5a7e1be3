//! Fuzzy match engine
//!
//! Tiered approximate search over a single record set. A query always
//! carries an amount and may carry free text, an identifier, and a date;
//! each present component contributes to a weighted confidence score with
//! the weights pinned in [`crate::matching::weights`].

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::conferral::DedupLedger;
use crate::matching::weights;
use crate::types::*;
use crate::utils::similarity::{relative_difference, shared_digit_run, string_similarity};

/// Strictness band of a fuzzy result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchTier {
    /// Value tolerance zero
    Exact,
    /// Value within the close tolerance
    Close,
    /// Value within the fuzzy tolerance, or a text/identifier hit with no
    /// value proximity
    Fuzzy,
}

impl MatchTier {
    fn bonus(self) -> BigDecimal {
        match self {
            MatchTier::Exact => weights::exact_tier_bonus(),
            MatchTier::Close => weights::close_tier_bonus(),
            MatchTier::Fuzzy => weights::fuzzy_tier_bonus(),
        }
    }
}

/// A fuzzy search query. Only the amount is mandatory.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyQuery {
    /// Queried amount, compared against record magnitudes
    pub amount: BigDecimal,
    /// Free text compared against the record's original text
    pub text: Option<String>,
    /// Identifier, canonicalized to digits on construction
    pub identifier: Option<String>,
    /// Reference date; records on this date earn the date bonus
    pub date: Option<NaiveDate>,
}

impl FuzzyQuery {
    /// Query by amount only
    pub fn for_amount(amount: BigDecimal) -> Self {
        Self {
            amount: normalize_amount(amount),
            text: None,
            identifier: None,
            date: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_identifier(mut self, identifier: &str) -> Self {
        self.identifier = canonical_identifier(identifier);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// Tuning knobs for the fuzzy matcher
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyOptions {
    /// Relative tolerance for the close tier (fraction, default 0.05)
    pub close_tolerance: BigDecimal,
    /// Relative tolerance for the fuzzy tier (fraction, default 0.10)
    pub fuzzy_tolerance: BigDecimal,
    /// Results below this confidence are discarded
    pub min_confidence: BigDecimal,
    /// Cap on generated suggestions
    pub max_suggestions: usize,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            close_tolerance: BigDecimal::from(5) / BigDecimal::from(100),
            fuzzy_tolerance: BigDecimal::from(10) / BigDecimal::from(100),
            min_confidence: weights::min_confidence(),
            max_suggestions: 5,
        }
    }
}

/// One ranked fuzzy result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub record: Record,
    pub tier: MatchTier,
    /// Weighted confidence in `[0, 1]`
    pub confidence: BigDecimal,
    /// Raw similarity score, the secondary sort key
    pub similarity: BigDecimal,
}

/// Tiered result of a smart search. The tiers are disjoint by record key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartSearch {
    pub exact: Vec<FuzzyMatch>,
    pub close: Vec<FuzzyMatch>,
    pub fuzzy: Vec<FuzzyMatch>,
    /// Advisory alternative values; never auto-applied
    pub suggestions: Vec<BigDecimal>,
}

/// Fuzzy matcher over a single record set
#[derive(Debug, Clone, Default)]
pub struct FuzzyMatcher {
    options: FuzzyOptions,
}

impl FuzzyMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: FuzzyOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FuzzyOptions {
        &self.options
    }

    /// Rank all unreserved records against the query.
    ///
    /// Ordering is deterministic: descending confidence, then descending
    /// raw similarity, ties in original record order (the sort is stable).
    /// Results below `min_confidence` are dropped, not ranked low.
    pub fn fuzzy_search(
        &self,
        query: &FuzzyQuery,
        records: &[Record],
        excluded: &DedupLedger,
    ) -> Vec<FuzzyMatch> {
        let mut matches: Vec<FuzzyMatch> = records
            .iter()
            .filter(|record| !excluded.is_reserved(&record.key()))
            .filter_map(|record| self.score(query, record))
            .filter(|m| m.confidence >= self.options.min_confidence)
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| b.similarity.cmp(&a.similarity))
        });

        debug!(
            query = %query.amount,
            results = matches.len(),
            "fuzzy search completed"
        );

        matches
    }

    /// Tiered search: exact, close, and fuzzy result sets plus suggestions.
    ///
    /// The fuzzy tier explicitly excludes every record already present in
    /// the exact or close tiers (set difference, not re-ranking), so a
    /// record appears in at most one tier.
    pub fn smart_search(
        &self,
        query: &FuzzyQuery,
        records: &[Record],
        excluded: &DedupLedger,
    ) -> SmartSearch {
        let ranked = self.fuzzy_search(query, records, excluded);

        let mut exact = Vec::new();
        let mut close = Vec::new();
        let mut fuzzy = Vec::new();
        for m in ranked {
            match m.tier {
                MatchTier::Exact => exact.push(m),
                MatchTier::Close => close.push(m),
                MatchTier::Fuzzy => fuzzy.push(m),
            }
        }

        let upper: HashSet<RecordKey> = exact
            .iter()
            .chain(close.iter())
            .map(|m| m.record.key())
            .collect();
        fuzzy.retain(|m| !upper.contains(&m.record.key()));

        let suggestions = self.suggest_values(&query.amount, records);

        SmartSearch {
            exact,
            close,
            fuzzy,
            suggestions,
        }
    }

    /// Generate advisory alternative values for a query: nearby round
    /// numbers first, then dataset values inside widening tolerance bands
    /// (1%, 5%, 10%, 20%). Deduplicated, capped, never auto-applied.
    pub fn suggest_values(&self, query: &BigDecimal, records: &[Record]) -> Vec<BigDecimal> {
        use bigdecimal::RoundingMode;

        let mut suggestions: Vec<BigDecimal> = Vec::new();
        let push = |candidate: BigDecimal, suggestions: &mut Vec<BigDecimal>| {
            if candidate != *query
                && candidate >= BigDecimal::from(0)
                && !suggestions.contains(&candidate)
            {
                suggestions.push(candidate);
            }
        };

        let nearest_unit = normalize_amount(query.with_scale_round(0, RoundingMode::HalfUp));
        push(nearest_unit, &mut suggestions);

        let nearest_ten = normalize_amount(
            (query / BigDecimal::from(10)).with_scale_round(0, RoundingMode::HalfUp)
                * BigDecimal::from(10),
        );
        push(nearest_ten, &mut suggestions);

        let bands = [1, 5, 10, 20];
        for band in bands {
            let tolerance = BigDecimal::from(band) / BigDecimal::from(100);
            for record in records {
                if suggestions.len() >= self.options.max_suggestions {
                    break;
                }
                let magnitude = record.magnitude();
                if relative_difference(query, &magnitude) <= tolerance {
                    push(magnitude, &mut suggestions);
                }
            }
        }

        suggestions.truncate(self.options.max_suggestions);
        suggestions
    }

    fn score(&self, query: &FuzzyQuery, record: &Record) -> Option<FuzzyMatch> {
        let zero = BigDecimal::from(0);

        let rel = relative_difference(&query.amount, &record.magnitude());
        let value_proximate = rel <= self.options.fuzzy_tolerance;
        let value_similarity = if value_proximate {
            BigDecimal::from(1) - &rel
        } else {
            zero.clone()
        };

        let text_similarity = query
            .text
            .as_deref()
            .map(|text| string_similarity(text, &record.original_text));

        let identifier_bonus = match (&query.identifier, &record.identifier) {
            (Some(q), Some(r)) if q == r => weights::identifier_weight(),
            (Some(q), Some(r)) if shared_digit_run(q, r) >= weights::IDENTIFIER_PARTIAL_RUN => {
                weights::identifier_partial_weight()
            }
            _ => zero.clone(),
        };

        let text_hit = text_similarity
            .as_ref()
            .is_some_and(|sim| *sim > weights::text_similarity_floor());
        let identifier_hit = identifier_bonus > zero;

        let tier = if rel == zero {
            MatchTier::Exact
        } else if rel <= self.options.close_tolerance {
            MatchTier::Close
        } else if value_proximate || text_hit || identifier_hit {
            MatchTier::Fuzzy
        } else {
            return None;
        };

        let mut confidence = weights::value_weight() * &value_similarity + tier.bonus();
        if let Some(sim) = &text_similarity {
            confidence += weights::text_weight() * sim;
        }
        if query.date == Some(record.date) {
            confidence += weights::date_weight();
        }
        confidence += identifier_bonus;
        if confidence > weights::confidence_cap() {
            confidence = weights::confidence_cap();
        }

        let similarity = match &text_similarity {
            Some(sim) if *sim > value_similarity => sim.clone(),
            _ => value_similarity,
        };

        Some(FuzzyMatch {
            record: record.clone(),
            tier,
            confidence,
            similarity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn record(id: &str, amount: &str, text: &str) -> Record {
        Record::new(
            "bank".to_string(),
            id.to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "pix".to_string(),
            None,
            BigDecimal::from_str(amount).unwrap(),
            text.to_string(),
        )
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn exact_value_lands_in_the_exact_tier() {
        let records = vec![record("a", "150.00", "TED")];
        let matcher = FuzzyMatcher::new();
        let result = matcher.smart_search(
            &FuzzyQuery::for_amount(dec("150.00")),
            &records,
            &DedupLedger::new(),
        );

        assert_eq!(result.exact.len(), 1);
        assert!(result.close.is_empty());
        assert!(result.fuzzy.is_empty());
        // 0.4 value + 0.3 exact bonus
        assert_eq!(result.exact[0].confidence, dec("0.7"));
    }

    #[test]
    fn tiers_are_disjoint_by_record() {
        let records = vec![
            record("exact", "100.00", ""),
            record("close", "97.00", ""),
            record("fuzzy", "91.00", ""),
        ];
        let matcher = FuzzyMatcher::new();
        let result = matcher.smart_search(
            &FuzzyQuery::for_amount(dec("100.00")),
            &records,
            &DedupLedger::new(),
        );

        let mut seen = HashSet::new();
        for m in result
            .exact
            .iter()
            .chain(result.close.iter())
            .chain(result.fuzzy.iter())
        {
            assert!(seen.insert(m.record.key()), "record in more than one tier");
        }
        assert_eq!(result.exact.len(), 1);
        assert_eq!(result.close.len(), 1);
        assert_eq!(result.fuzzy.len(), 1);
    }

    #[test]
    fn low_confidence_results_are_discarded() {
        // Text-only similarity: 0.2 * sim + 0.05 tier bonus stays below the
        // 0.3 cutoff even for identical text.
        let records = vec![record("a", "500.00", "farmacia centro")];
        let matcher = FuzzyMatcher::new();
        let query = FuzzyQuery::for_amount(dec("10.00")).with_text("farmacia centro");

        let found = matcher.fuzzy_search(&query, &records, &DedupLedger::new());
        assert!(found.is_empty());
    }

    #[test]
    fn widening_tolerance_never_lowers_confidence() {
        // 92 vs 100: relative difference 0.08, fuzzy tier under defaults.
        let records = vec![record("a", "92.00", "")];
        let query = FuzzyQuery::for_amount(dec("100.00"));

        let strict = FuzzyMatcher::new();
        let strict_conf = strict
            .fuzzy_search(&query, &records, &DedupLedger::new())
            .remove(0)
            .confidence;

        let wide = FuzzyMatcher::with_options(FuzzyOptions {
            close_tolerance: dec("0.10"),
            ..FuzzyOptions::default()
        });
        let wide_conf = wide
            .fuzzy_search(&query, &records, &DedupLedger::new())
            .remove(0)
            .confidence;

        // Fuzzy bonus 0.05 upgrades to close bonus 0.15.
        assert!(wide_conf > strict_conf);
    }

    #[test]
    fn ordering_is_deterministic_and_stable() {
        let records = vec![
            record("first", "100.00", ""),
            record("second", "100.00", ""),
            record("close", "98.00", ""),
        ];
        let matcher = FuzzyMatcher::new();
        let found = matcher.fuzzy_search(
            &FuzzyQuery::for_amount(dec("100.00")),
            &records,
            &DedupLedger::new(),
        );

        let ids: Vec<&str> = found.iter().map(|m| m.record.record_id.as_str()).collect();
        // Equal-confidence exact hits keep input order; the close hit ranks
        // below both.
        assert_eq!(ids, vec!["first", "second", "close"]);
    }

    #[test]
    fn reserved_records_never_surface() {
        let records = vec![record("a", "55.00", "")];
        let ledger = DedupLedger::new();
        ledger.reserve(&records[0].key());

        let matcher = FuzzyMatcher::new();
        let found = matcher.fuzzy_search(
            &FuzzyQuery::for_amount(dec("55.00")),
            &records,
            &ledger,
        );
        assert!(found.is_empty());
    }

    #[test]
    fn identifier_overlap_contributes_to_confidence() {
        let mut with_id = record("a", "150.00", "");
        with_id.identifier = Some("12345678901".to_string());
        let records = vec![with_id];

        let matcher = FuzzyMatcher::new();
        let query = FuzzyQuery::for_amount(dec("150.00")).with_identifier("123.456.789-01");
        let found = matcher.fuzzy_search(&query, &records, &DedupLedger::new());

        // 0.4 value + 0.3 exact bonus + 0.1 identifier
        assert_eq!(found[0].confidence, dec("0.8"));
    }

    #[test]
    fn suggestions_are_deduplicated_and_capped() {
        let records = vec![
            record("a", "100.50", ""),
            record("b", "100.50", ""),
            record("c", "99.00", ""),
            record("d", "103.00", ""),
            record("e", "108.00", ""),
            record("f", "112.00", ""),
            record("g", "119.00", ""),
        ];
        let matcher = FuzzyMatcher::new();
        let suggestions = matcher.suggest_values(&dec("100.70"), &records);

        assert!(suggestions.len() <= 5);
        let unique: HashSet<&BigDecimal> = suggestions.iter().collect();
        assert_eq!(unique.len(), suggestions.len());
        assert!(!suggestions.contains(&dec("100.70")));
        // Round-number proposal comes first.
        assert_eq!(suggestions[0], dec("101.00"));
    }

    #[test]
    fn suggestions_are_advisory_and_separate_from_matches() {
        let records = vec![record("a", "100.00", "")];
        let matcher = FuzzyMatcher::new();
        let result = matcher.smart_search(
            &FuzzyQuery::for_amount(dec("250.00")),
            &records,
            &DedupLedger::new(),
        );

        assert!(result.exact.is_empty() && result.close.is_empty() && result.fuzzy.is_empty());
        assert!(!result.suggestions.contains(&dec("250.00")));
    }
}
