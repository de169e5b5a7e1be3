//! Value conferral workflow example

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use reconciliation_core::utils::MemoryStore;
use reconciliation_core::{ConferOutcome, ConferralSession, Record};
use std::str::FromStr;

fn statement_row(id: &str, amount: &str, day: u32, text: &str) -> Record {
    Record::new(
        "bank".to_string(),
        id.to_string(),
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        "pix".to_string(),
        None,
        BigDecimal::from_str(amount).unwrap(),
        text.to_string(),
    )
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Reconciliation Core - Value Conferral Example\n");

    // Rows as the statement parser would hand them over
    let statement = vec![
        statement_row("row-1", "150.00", 15, "TED RECEBIDA JOAO"),
        statement_row("row-2", "-89.90", 15, "TARIFA BANCARIA"),
        statement_row("row-3", "89.90", 16, "PIX FARMACIA CENTRO"),
        statement_row("row-4", "1250.00", 17, "DEPOSITO DINHEIRO"),
    ];
    println!("📄 Parsed {} statement rows\n", statement.len());

    let mut session = ConferralSession::new(MemoryStore::new());

    // 1. Confer a value typed with the Brazilian decimal comma
    println!("💰 Conferring value 150,00...");
    match session.confer_value("150,00", &statement).await? {
        ConferOutcome::Conferred(item) => {
            println!(
                "  ✓ Conferred row {} ({})",
                item.record.record_id, item.record.original_text
            );
        }
        other => println!("  ✗ Unexpected outcome: {other:?}"),
    }
    println!();

    // 2. An ambiguous magnitude needs operator disambiguation
    println!("💰 Conferring value 89.90 (two rows share this magnitude)...");
    match session.confer_value("89.90", &statement).await? {
        ConferOutcome::Ambiguous { candidates, .. } => {
            println!("  ? {} candidates:", candidates.len());
            for candidate in &candidates {
                println!(
                    "    - row {} on {}: {}",
                    candidate.record_id, candidate.date, candidate.original_text
                );
            }
            // The operator picks the PIX entry.
            let picked = &candidates[1];
            let item = session.confirm(picked).await?;
            println!(
                "  ✓ Operator confirmed row {} ({})",
                item.record.record_id, item.record.original_text
            );
        }
        other => println!("  ✗ Unexpected outcome: {other:?}"),
    }
    println!();

    // 3. A value that matches nothing is recorded, not raised
    println!("💰 Conferring value 500,00...");
    if let ConferOutcome::NotFound { query } = session.confer_value("500,00", &statement).await? {
        println!("  ✗ No row with magnitude {query}; outcome kept for the audit trail");
    }
    println!();

    // 4. Session state
    let items = session.conferred_items().await?;
    println!("📋 Conferred so far: {} of {} rows", items.len(), statement.len());
    for item in &items {
        println!(
            "  • {}: {} at {}",
            item.record.record_id, item.record.amount, item.conferred_at
        );
    }

    let events = session.events().await?;
    println!("\n🗒  Audit events recorded: {}", events.len());

    Ok(())
}
