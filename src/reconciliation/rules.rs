//! Custom reconciliation rules
//!
//! Rules are data, not code paths: a rule is a list of field-level
//! conditions evaluated against both candidate records of a pair. Each
//! satisfied condition adds a fixed confidence bonus, independent of the
//! built-in scoring; a condition whose field values disagree registers a
//! discrepancy. Operators form a closed enum matched exhaustively, so a new
//! operator is a compile-time-checked addition.

use bigdecimal::BigDecimal;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// The record fields a rule condition (or discrepancy) can address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordField {
    Date,
    PaymentType,
    Identifier,
    Amount,
    OriginalText,
}

impl RecordField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::PaymentType => "payment_type",
            Self::Identifier => "identifier",
            Self::Amount => "amount",
            Self::OriginalText => "original_text",
        }
    }

    /// Render a record's value for this field (for display and pattern
    /// matching)
    pub fn render(&self, record: &Record) -> String {
        match self {
            Self::Date => record.date.to_string(),
            Self::PaymentType => record.payment_type.clone(),
            Self::Identifier => record.identifier.clone().unwrap_or_default(),
            Self::Amount => record.amount.to_string(),
            Self::OriginalText => record.original_text.clone(),
        }
    }
}

impl std::fmt::Display for RecordField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition operator. `Range` is only meaningful for `Amount` (currency
/// units) and `Date` (days); compilation rejects it elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionOp {
    /// Field values are equal on both records
    Equals,
    /// One field value contains the other (case-insensitive)
    Contains,
    /// Field values differ by at most the tolerance
    Range { tolerance: BigDecimal },
    /// Both field values match the regular expression
    Pattern(String),
}

/// One field-level condition of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: RecordField,
    pub op: ConditionOp,
}

/// A custom reconciliation rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRule {
    pub id: String,
    pub name: String,
    /// Rules are evaluated in descending priority order; they never
    /// short-circuit each other
    pub priority: i32,
    pub enabled: bool,
    pub conditions: Vec<RuleCondition>,
}

impl ReconciliationRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            priority: 0,
            enabled: true,
            conditions: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Add a condition
    pub fn condition(mut self, field: RecordField, op: ConditionOp) -> Self {
        self.conditions.push(RuleCondition { field, op });
        self
    }

    /// Compile the rule, validating every condition. Compilation failures
    /// are fatal to a reconciliation run.
    pub fn compile(&self) -> MatchResult<CompiledRule> {
        if self.conditions.is_empty() {
            return Err(MatchError::InvalidRule(format!(
                "Rule '{}' has no conditions",
                self.name
            )));
        }

        let mut compiled = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            let check = match &condition.op {
                ConditionOp::Equals => CompiledOp::Equals,
                ConditionOp::Contains => CompiledOp::Contains,
                ConditionOp::Range { tolerance } => {
                    if *tolerance < BigDecimal::from(0) {
                        return Err(MatchError::InvalidRule(format!(
                            "Rule '{}': negative tolerance on {}",
                            self.name, condition.field
                        )));
                    }
                    if !matches!(condition.field, RecordField::Amount | RecordField::Date) {
                        return Err(MatchError::InvalidRule(format!(
                            "Rule '{}': range condition is not applicable to {}",
                            self.name, condition.field
                        )));
                    }
                    CompiledOp::Range(tolerance.clone())
                }
                ConditionOp::Pattern(pattern) => {
                    let regex = Regex::new(pattern).map_err(|error| {
                        MatchError::InvalidRule(format!(
                            "Rule '{}': invalid pattern '{}': {}",
                            self.name, pattern, error
                        ))
                    })?;
                    CompiledOp::Pattern(regex)
                }
            };
            compiled.push(CompiledCondition {
                field: condition.field,
                check,
            });
        }

        Ok(CompiledRule {
            name: self.name.clone(),
            priority: self.priority,
            conditions: compiled,
        })
    }
}

#[derive(Debug, Clone)]
enum CompiledOp {
    Equals,
    Contains,
    Range(BigDecimal),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
struct CompiledCondition {
    field: RecordField,
    check: CompiledOp,
}

impl CompiledCondition {
    fn is_satisfied(&self, a: &Record, b: &Record) -> bool {
        match &self.check {
            CompiledOp::Equals => match self.field {
                RecordField::Date => a.date == b.date,
                RecordField::Amount => a.amount == b.amount,
                RecordField::Identifier => {
                    a.identifier.is_some() && a.identifier == b.identifier
                }
                RecordField::PaymentType => a.payment_type == b.payment_type,
                RecordField::OriginalText => {
                    a.original_text.trim() == b.original_text.trim()
                }
            },
            CompiledOp::Contains => {
                let left = self.field.render(a).to_lowercase();
                let right = self.field.render(b).to_lowercase();
                !left.is_empty()
                    && !right.is_empty()
                    && (left.contains(&right) || right.contains(&left))
            }
            CompiledOp::Range(tolerance) => match self.field {
                RecordField::Amount => (&a.amount - &b.amount).abs() <= *tolerance,
                RecordField::Date => {
                    let days = (a.date - b.date).num_days().abs();
                    BigDecimal::from(days) <= *tolerance
                }
                // Rejected at compile time.
                _ => false,
            },
            CompiledOp::Pattern(regex) => {
                regex.is_match(&self.field.render(a)) && regex.is_match(&self.field.render(b))
            }
        }
    }
}

/// Per-pair result of evaluating one rule
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluation {
    /// Fields whose conditions were satisfied
    pub satisfied: Vec<RecordField>,
    /// Fields whose conditions failed while the values actually differ
    pub mismatched: Vec<RecordField>,
}

/// A validated rule ready for evaluation
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub priority: i32,
    conditions: Vec<CompiledCondition>,
}

impl CompiledRule {
    /// Evaluate every condition against a candidate pair
    pub fn evaluate(&self, a: &Record, b: &Record) -> RuleEvaluation {
        let mut evaluation = RuleEvaluation::default();
        for condition in &self.conditions {
            if condition.is_satisfied(a, b) {
                evaluation.satisfied.push(condition.field);
            } else if condition.field.render(a) != condition.field.render(b) {
                evaluation.mismatched.push(condition.field);
            }
        }
        evaluation
    }
}
