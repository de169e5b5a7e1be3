//! Cross-source reconciliation engine
//!
//! A run moves through grouping, evaluating, and reporting; it either
//! completes with a full report or fails atomically (no partial report is
//! ever returned). All scoring reuses the similarity primitives and pinned
//! weights from the matching module.

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::matching::weights;
use crate::reconciliation::report::*;
use crate::reconciliation::rules::{CompiledRule, ReconciliationRule, RecordField};
use crate::types::*;
use crate::utils::similarity::{relative_difference, shared_digit_run, string_similarity};
use crate::utils::validation::validate_source_records;

/// One independently produced record set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSource {
    pub source_id: String,
    pub records: Vec<Record>,
}

impl ReconciliationSource {
    pub fn new(source_id: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            source_id: source_id.into(),
            records,
        }
    }

    /// Check the record-model invariants for this source
    pub fn validate(&self) -> MatchResult<()> {
        validate_source_records(&self.source_id, &self.records)
    }
}

/// Engine tuning parameters.
///
/// The grouping constants are heuristics carried over from production use,
/// not tuned optima; they are configurable so callers can trade recall
/// against run time.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Width of one value bucket, in currency units
    pub value_bucket_width: BigDecimal,
    /// How many calendar days apart two records may be and still be
    /// compared (and earn the near-date score)
    pub date_window_days: i64,
    /// Maximum relative value difference that still contributes to the
    /// score (fraction)
    pub value_tolerance: BigDecimal,
    /// Relative value difference classified as approximate (fraction)
    pub approximate_tolerance: BigDecimal,
    /// Pairs below this confidence never become matches
    pub min_confidence: BigDecimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            value_bucket_width: BigDecimal::from(10),
            date_window_days: 1,
            value_tolerance: BigDecimal::from(10) / BigDecimal::from(100),
            approximate_tolerance: BigDecimal::from(2) / BigDecimal::from(100),
            min_confidence: weights::min_confidence(),
        }
    }
}

/// Multi-source reconciliation engine
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: EngineConfig,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run a full reconciliation over the given sources and rules.
    ///
    /// Grouping buckets records by (value bucket, calendar date) and only
    /// compares pairs whose buckets are at most one value bucket and
    /// `date_window_days` apart. This is a deliberate precision/recall
    /// trade-off: records further apart than that are never compared, even
    /// if a custom rule would have paired them.
    pub fn reconcile(
        &self,
        sources: &[ReconciliationSource],
        rules: &[ReconciliationRule],
    ) -> MatchResult<ReconciliationReport> {
        // Malformed rules abort the run before any comparison happens.
        let mut compiled: Vec<CompiledRule> = rules
            .iter()
            .filter(|rule| rule.enabled)
            .map(|rule| rule.compile())
            .collect::<MatchResult<_>>()?;
        compiled.sort_by(|a, b| b.priority.cmp(&a.priority));

        for source in sources {
            source.validate()?;
        }

        debug!(
            sources = sources.len(),
            rules = compiled.len(),
            "reconciliation grouping"
        );

        struct Slot<'a> {
            source_idx: usize,
            record: &'a Record,
            bucket: (i64, NaiveDate),
        }

        let mut slots: Vec<Slot> = Vec::new();
        for (source_idx, source) in sources.iter().enumerate() {
            for record in &source.records {
                slots.push(Slot {
                    source_idx,
                    record,
                    bucket: (self.value_bucket(&record.amount), record.date),
                });
            }
        }

        let mut buckets: HashMap<(i64, NaiveDate), Vec<usize>> = HashMap::new();
        for (idx, slot) in slots.iter().enumerate() {
            buckets.entry(slot.bucket).or_default().push(idx);
        }

        debug!(records = slots.len(), buckets = buckets.len(), "reconciliation evaluating");

        let mut matches: Vec<ReconciliationMatch> = Vec::new();
        for (idx, slot) in slots.iter().enumerate() {
            let (value_bucket, date) = slot.bucket;
            for value_delta in -1..=1i64 {
                for day_delta in -self.config.date_window_days..=self.config.date_window_days {
                    let probe = (
                        value_bucket.saturating_add(value_delta),
                        date + Duration::days(day_delta),
                    );
                    let Some(candidates) = buckets.get(&probe) else {
                        continue;
                    };
                    for &other_idx in candidates {
                        // Each unordered pair is evaluated exactly once.
                        if other_idx <= idx {
                            continue;
                        }
                        let other = &slots[other_idx];
                        if other.source_idx == slot.source_idx {
                            continue;
                        }
                        if let Some(found) =
                            self.evaluate_pair(slot.record, other.record, &compiled)
                        {
                            matches.push(found);
                        }
                    }
                }
            }
        }

        matches.sort_by(|a, b| {
            b.confidence.cmp(&a.confidence).then_with(|| {
                let key = |m: &ReconciliationMatch| {
                    m.participants
                        .iter()
                        .map(|p| (p.record.source_id.clone(), p.record.record_id.clone()))
                        .collect::<Vec<_>>()
                };
                key(a).cmp(&key(b))
            })
        });

        debug!(matches = matches.len(), "reconciliation reporting");
        Ok(self.build_report(sources, matches))
    }

    fn value_bucket(&self, amount: &BigDecimal) -> i64 {
        (amount / &self.config.value_bucket_width)
            .with_scale_round(0, RoundingMode::Floor)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    fn evaluate_pair(
        &self,
        a: &Record,
        b: &Record,
        rules: &[CompiledRule],
    ) -> Option<ReconciliationMatch> {
        let zero = BigDecimal::from(0);
        let one = BigDecimal::from(1);

        let mut confidence = zero.clone();
        let mut matching_fields: Vec<RecordField> = Vec::new();
        let mut discrepancies: Vec<Discrepancy> = Vec::new();

        let record_discrepancy =
            |field: RecordField, severity: Severity, reason: String, out: &mut Vec<Discrepancy>| {
                out.push(Discrepancy {
                    field,
                    values_by_source: vec![
                        (a.source_id.clone(), field.render(a)),
                        (b.source_id.clone(), field.render(b)),
                    ],
                    severity,
                    reason,
                });
            };

        // Value proximity, up to 0.4.
        let rel = relative_difference(&a.amount, &b.amount);
        if rel == zero {
            confidence += weights::recon_value_weight();
            matching_fields.push(RecordField::Amount);
        } else if rel <= self.config.value_tolerance {
            confidence += weights::recon_value_weight() * (&one - &rel);
            let difference = (&a.amount - &b.amount).abs();
            let severity = if difference > one {
                Severity::Medium
            } else {
                Severity::Low
            };
            record_discrepancy(
                RecordField::Amount,
                severity,
                format!("Amounts differ by {difference}"),
                &mut discrepancies,
            );
        }

        // Date exactness: 0.3 exact, 0.15 for a near miss inside the window.
        let day_gap = (a.date - b.date).num_days().abs();
        if day_gap == 0 {
            confidence += weights::recon_date_exact();
            matching_fields.push(RecordField::Date);
        } else if day_gap <= self.config.date_window_days {
            confidence += weights::recon_date_near();
            record_discrepancy(
                RecordField::Date,
                Severity::Low,
                format!("Dates are {day_gap} day(s) apart"),
                &mut discrepancies,
            );
        }

        // Identifiers: exact 0.2, partial digit overlap 0.1 to tolerate
        // masked identifiers.
        if let (Some(id_a), Some(id_b)) = (&a.identifier, &b.identifier) {
            if id_a == id_b {
                confidence += weights::recon_identifier_exact();
                matching_fields.push(RecordField::Identifier);
            } else if shared_digit_run(id_a, id_b) >= weights::IDENTIFIER_PARTIAL_RUN {
                confidence += weights::recon_identifier_partial();
                record_discrepancy(
                    RecordField::Identifier,
                    Severity::Low,
                    "Identifiers overlap only partially".to_string(),
                    &mut discrepancies,
                );
            }
        }

        // Free text, 0.1 above the similarity floor.
        let text_similarity = string_similarity(&a.original_text, &b.original_text);
        if text_similarity > weights::text_similarity_floor() {
            confidence += weights::recon_text_weight();
            matching_fields.push(RecordField::OriginalText);
        }

        // Custom rules, in descending priority; each satisfied condition
        // adds its fixed bonus and failed conditions register their own
        // discrepancies.
        for rule in rules {
            let evaluation = rule.evaluate(a, b);
            if !evaluation.satisfied.is_empty() {
                confidence += weights::rule_condition_bonus()
                    * BigDecimal::from(evaluation.satisfied.len() as u64);
            }
            for field in evaluation.mismatched {
                record_discrepancy(
                    field,
                    Severity::Low,
                    format!("Rule '{}': {} differs", rule.name, field),
                    &mut discrepancies,
                );
            }
        }

        if confidence > weights::confidence_cap() {
            confidence = weights::confidence_cap();
        }
        if confidence < self.config.min_confidence {
            return None;
        }

        // A pair that matched on other signals despite a value gap beyond
        // tolerance carries the strongest warning.
        if rel > self.config.value_tolerance {
            record_discrepancy(
                RecordField::Amount,
                Severity::High,
                "Amounts differ beyond the value tolerance".to_string(),
                &mut discrepancies,
            );
        }

        // Collapse duplicate discrepancies per field, keeping the first.
        let mut seen = HashSet::new();
        discrepancies.retain(|d| seen.insert(d.field));

        let match_type = if rel == zero && day_gap == 0 {
            MatchType::Exact
        } else if rel <= self.config.approximate_tolerance
            && day_gap <= self.config.date_window_days
        {
            MatchType::Approximate
        } else if confidence > weights::exact_threshold() {
            MatchType::Exact
        } else if confidence > weights::approximate_threshold() {
            MatchType::Approximate
        } else {
            MatchType::Pattern
        };

        let participants = vec![
            MatchParticipant {
                source_id: a.source_id.clone(),
                record: a.clone(),
                matching_fields: matching_fields.clone(),
            },
            MatchParticipant {
                source_id: b.source_id.clone(),
                record: b.clone(),
                matching_fields,
            },
        ];

        Some(ReconciliationMatch {
            confidence,
            match_type,
            participants,
            discrepancies,
            resolution: None,
        })
    }

    fn build_report(
        &self,
        sources: &[ReconciliationSource],
        matches: Vec<ReconciliationMatch>,
    ) -> ReconciliationReport {
        let matched_keys: HashSet<RecordKey> = matches
            .iter()
            .flat_map(|m| m.participants.iter())
            .map(|p| p.record.key())
            .collect();

        let mut summary = ReconciliationSummary {
            total_records: 0,
            matched_records: 0,
            unmatched_records: 0,
            total_value: BigDecimal::from(0),
            matched_value: BigDecimal::from(0),
            unmatched_value: BigDecimal::from(0),
            histogram: ConfidenceHistogram::default(),
        };
        let mut source_totals: Vec<SourceTotals> = Vec::new();

        for source in sources {
            let mut totals = SourceTotals {
                source_id: source.source_id.clone(),
                records: source.records.len(),
                matched: 0,
            };
            for record in &source.records {
                let magnitude = record.magnitude();
                summary.total_records += 1;
                summary.total_value += &magnitude;
                if matched_keys.contains(&record.key()) {
                    totals.matched += 1;
                    summary.matched_records += 1;
                    summary.matched_value += magnitude;
                } else {
                    summary.unmatched_records += 1;
                    summary.unmatched_value += magnitude;
                }
            }
            source_totals.push(totals);
        }

        for m in &matches {
            if m.confidence >= weights::histogram_high() {
                summary.histogram.high += 1;
            } else if m.confidence >= weights::histogram_medium() {
                summary.histogram.medium += 1;
            } else {
                summary.histogram.low += 1;
            }
        }

        ReconciliationReport {
            generated_at: chrono::Utc::now().naive_utc(),
            matches,
            summary,
            sources: source_totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::rules::ConditionOp;
    use std::str::FromStr;

    fn record(source: &str, id: &str, amount: &str, date: (i32, u32, u32), text: &str) -> Record {
        Record::new(
            source.to_string(),
            id.to_string(),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
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
    fn identical_records_across_sources_match_exactly() {
        let mut bank = record("bank", "b1", "150.00", (2024, 1, 15), "");
        bank.identifier = Some("12345678901".to_string());
        let cash = Record::new(
            "cash".to_string(),
            "c1".to_string(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "card".to_string(),
            Some("123.456.789-01".to_string()),
            dec("150.00"),
            String::new(),
        );

        let sources = vec![
            ReconciliationSource::new("bank", vec![bank]),
            ReconciliationSource::new("cash", vec![cash]),
        ];
        let report = ReconciliationEngine::new().reconcile(&sources, &[]).unwrap();

        assert_eq!(report.match_count(), 1);
        let found = &report.matches[0];
        assert_eq!(found.match_type, MatchType::Exact);
        assert!(found.confidence >= dec("0.9"));
        assert!(!found.has_discrepancies());
        assert_eq!(report.summary.histogram.high, 1);
    }

    #[test]
    fn near_miss_pair_is_approximate_with_two_low_discrepancies() {
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![record("bank", "b1", "100.00", (2024, 1, 15), "")],
            ),
            ReconciliationSource::new(
                "cash",
                vec![record("cash", "c1", "99.00", (2024, 1, 16), "")],
            ),
        ];
        let report = ReconciliationEngine::new().reconcile(&sources, &[]).unwrap();

        assert_eq!(report.match_count(), 1);
        let found = &report.matches[0];
        assert_eq!(found.match_type, MatchType::Approximate);
        assert_eq!(found.discrepancies.len(), 2);
        assert!(found
            .discrepancies
            .iter()
            .all(|d| d.severity == Severity::Low));
        let fields: Vec<RecordField> = found.discrepancies.iter().map(|d| d.field).collect();
        assert!(fields.contains(&RecordField::Amount));
        assert!(fields.contains(&RecordField::Date));
    }

    #[test]
    fn value_gap_above_one_unit_is_a_medium_discrepancy() {
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![record("bank", "b1", "100.00", (2024, 1, 15), "")],
            ),
            ReconciliationSource::new(
                "cash",
                vec![record("cash", "c1", "97.50", (2024, 1, 15), "")],
            ),
        ];
        let report = ReconciliationEngine::new().reconcile(&sources, &[]).unwrap();

        let amount_discrepancy = report.matches[0]
            .discrepancies
            .iter()
            .find(|d| d.field == RecordField::Amount)
            .unwrap();
        assert_eq!(amount_discrepancy.severity, Severity::Medium);
    }

    #[test]
    fn records_from_the_same_source_never_pair() {
        let sources = vec![ReconciliationSource::new(
            "bank",
            vec![
                record("bank", "b1", "50.00", (2024, 1, 15), ""),
                record("bank", "b2", "50.00", (2024, 1, 15), ""),
            ],
        )];
        let report = ReconciliationEngine::new().reconcile(&sources, &[]).unwrap();
        assert_eq!(report.match_count(), 0);
        assert_eq!(report.summary.unmatched_records, 2);
    }

    #[test]
    fn bucketing_skips_pairs_far_apart_in_value() {
        // 100 vs 125 sit two value buckets apart; even a satisfied text
        // rule cannot bring them together because they are never compared.
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![record("bank", "b1", "100.00", (2024, 1, 15), "SAME TEXT")],
            ),
            ReconciliationSource::new(
                "cash",
                vec![record("cash", "c1", "125.00", (2024, 1, 15), "SAME TEXT")],
            ),
        ];
        let rules = vec![ReconciliationRule::new("r1", "same text")
            .condition(RecordField::OriginalText, ConditionOp::Equals)];
        let report = ReconciliationEngine::new()
            .reconcile(&sources, &rules)
            .unwrap();
        assert_eq!(report.match_count(), 0);
    }

    #[test]
    fn satisfied_rule_conditions_boost_confidence() {
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![record("bank", "b1", "80.00", (2024, 1, 15), "DOC-1 pgto")],
            ),
            ReconciliationSource::new(
                "cash",
                vec![record("cash", "c1", "80.00", (2024, 1, 15), "DOC-1 pgto")],
            ),
        ];

        let baseline = ReconciliationEngine::new().reconcile(&sources, &[]).unwrap();
        let rules = vec![ReconciliationRule::new("r1", "doc prefix").condition(
            RecordField::OriginalText,
            ConditionOp::Pattern(r"^DOC-\d+".to_string()),
        )];
        let boosted = ReconciliationEngine::new()
            .reconcile(&sources, &rules)
            .unwrap();

        assert_eq!(
            boosted.matches[0].confidence,
            &baseline.matches[0].confidence + dec("0.05")
        );
    }

    #[test]
    fn invalid_rule_fails_the_whole_run() {
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![record("bank", "b1", "10.00", (2024, 1, 15), "")],
            ),
            ReconciliationSource::new(
                "cash",
                vec![record("cash", "c1", "10.00", (2024, 1, 15), "")],
            ),
        ];
        let rules = vec![ReconciliationRule::new("r1", "broken").condition(
            RecordField::OriginalText,
            ConditionOp::Pattern("[oops".to_string()),
        )];

        assert!(matches!(
            ReconciliationEngine::new().reconcile(&sources, &rules),
            Err(MatchError::InvalidRule(_))
        ));
    }

    #[test]
    fn disabled_rules_are_ignored_even_when_invalid() {
        let sources = vec![ReconciliationSource::new(
            "bank",
            vec![record("bank", "b1", "10.00", (2024, 1, 15), "")],
        )];
        let rules = vec![ReconciliationRule::new("r1", "broken")
            .condition(
                RecordField::OriginalText,
                ConditionOp::Pattern("[oops".to_string()),
            )
            .disabled()];

        assert!(ReconciliationEngine::new().reconcile(&sources, &rules).is_ok());
    }

    #[test]
    fn report_totals_always_add_up() {
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![
                    record("bank", "b1", "150.00", (2024, 1, 15), "ted"),
                    record("bank", "b2", "-72.30", (2024, 1, 16), "tarifa"),
                    record("bank", "b3", "19.90", (2024, 1, 17), "pix"),
                ],
            ),
            ReconciliationSource::new(
                "cash",
                vec![
                    record("cash", "c1", "150.00", (2024, 1, 15), "ted"),
                    record("cash", "c2", "600.00", (2024, 1, 18), "dinheiro"),
                ],
            ),
        ];
        let report = ReconciliationEngine::new().reconcile(&sources, &[]).unwrap();

        let s = &report.summary;
        assert_eq!(s.total_records, 5);
        assert_eq!(s.matched_records + s.unmatched_records, s.total_records);
        assert_eq!(
            &s.matched_value + &s.unmatched_value,
            s.total_value
        );
        assert_eq!(s.total_value, dec("992.20"));
    }

    #[test]
    fn reconcile_is_deterministic() {
        let sources = vec![
            ReconciliationSource::new(
                "bank",
                vec![
                    record("bank", "b1", "45.00", (2024, 2, 1), "pix loja"),
                    record("bank", "b2", "44.10", (2024, 2, 1), "pix loja"),
                ],
            ),
            ReconciliationSource::new(
                "cash",
                vec![
                    record("cash", "c1", "45.00", (2024, 2, 1), "pix loja"),
                    record("cash", "c2", "44.10", (2024, 2, 2), "pix loja"),
                ],
            ),
        ];
        let engine = ReconciliationEngine::new();
        let first = engine.reconcile(&sources, &[]).unwrap();
        let second = engine.reconcile(&sources, &[]).unwrap();

        assert_eq!(first.matches, second.matches);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn duplicate_record_ids_in_a_source_abort_the_run() {
        let sources = vec![ReconciliationSource::new(
            "bank",
            vec![
                record("bank", "b1", "10.00", (2024, 1, 15), ""),
                record("bank", "b1", "20.00", (2024, 1, 15), ""),
            ],
        )];
        assert!(matches!(
            ReconciliationEngine::new().reconcile(&sources, &[]),
            Err(MatchError::InvalidRecord(_))
        ));
    }
}
