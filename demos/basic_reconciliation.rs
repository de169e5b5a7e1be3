//! Cross-source reconciliation example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::{
    ConditionOp, Record, RecordField, ReconciliationEngine, ReconciliationRule,
    ReconciliationSource,
};
use std::str::FromStr;

fn record(
    source: &str,
    id: &str,
    amount: &str,
    day: u32,
    identifier: Option<&str>,
    text: &str,
) -> Record {
    Record::new(
        source.to_string(),
        id.to_string(),
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        "pix".to_string(),
        identifier.map(str::to_string),
        BigDecimal::from_str(amount).unwrap(),
        text.to_string(),
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("⚖️  Reconciliation Core - Cross-Source Example\n");

    // Bank statement rows
    let bank = ReconciliationSource::new(
        "bank",
        vec![
            record("bank", "b1", "150.00", 15, Some("12345678901"), "TED JOAO"),
            record("bank", "b2", "100.00", 15, None, "PIX LOJA"),
            record("bank", "b3", "980.00", 20, None, "ALUGUEL"),
        ],
    );

    // Cash register entries, with a formatted identifier and a next-day
    // entry that is off by one real
    let cash = ReconciliationSource::new(
        "cash",
        vec![
            record("cash", "c1", "150.00", 15, Some("123.456.789-01"), "TED JOAO"),
            record("cash", "c2", "99.00", 16, None, "PIX LOJA"),
        ],
    );

    // A custom rule: agreeing payment types earn a small bonus
    let rules = vec![ReconciliationRule::new("pt", "payment type agrees")
        .priority(10)
        .condition(RecordField::PaymentType, ConditionOp::Equals)];

    println!("🔍 Reconciling bank ({} rows) against cash register ({} rows)...\n",
        bank.records.len(), cash.records.len());

    let report = ReconciliationEngine::new().reconcile(&[bank, cash], &rules)?;

    for m in &report.matches {
        println!(
            "  {:?} match, confidence {} with {} participants",
            m.match_type,
            m.confidence,
            m.participants.len()
        );
        for p in &m.participants {
            println!("    • {}/{}: {} on {}", p.source_id, p.record.record_id,
                p.record.amount, p.record.date);
        }
        for d in &m.discrepancies {
            println!("    ⚠ {:?} discrepancy on {}: {}", d.severity, d.field, d.reason);
        }
    }

    let s = &report.summary;
    println!("\n📊 Summary");
    println!("  records: {} total, {} matched, {} unmatched",
        s.total_records, s.matched_records, s.unmatched_records);
    println!("  value:   {} total, {} matched, {} unmatched",
        s.total_value, s.matched_value, s.unmatched_value);
    println!("  confidence: {} high / {} medium / {} low",
        s.histogram.high, s.histogram.medium, s.histogram.low);

    Ok(())
}
