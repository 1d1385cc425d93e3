//! Classify command implementation

use std::path::Path;

use anyhow::Result;
use spendcast_core::{Classification, DailySpendMap, ForecastConfig, TransactionClassifier};

use super::{add_obligations, load_request, open_config, truncate};

/// Counts shown after a classification run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifySummary {
    pub total: usize,
    pub irregular: usize,
    pub days_of_history: usize,
}

pub fn cmd_classify(
    config_path: Option<&Path>,
    input: &Path,
    obligations: &[String],
    show_all: bool,
) -> Result<()> {
    let loaded = open_config(config_path)?;
    let summary = classify_input(&loaded.config, input, obligations, show_all)?;

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {} of {} transactions are irregular spend over {} days",
        summary.irregular, summary.total, summary.days_of_history
    );
    println!();
    Ok(())
}

/// Classify the input history, printing each listed transaction
pub fn classify_input(
    config: &ForecastConfig,
    input: &Path,
    obligations: &[String],
    show_all: bool,
) -> Result<ClassifySummary> {
    let mut request = load_request(input)?;
    add_obligations(&mut request, obligations);
    let transactions = &request.transactions;

    let classifier = TransactionClassifier::with_config(config.classifier.clone());
    let labels = classifier.label_all(transactions, &request.obligations);

    println!();
    println!("🔎 Transaction Classification");
    println!("   ─────────────────────────────────────────────────────────────");

    for (tx, label) in transactions.iter().zip(&labels) {
        if !show_all && !label.is_irregular() {
            continue;
        }
        let name = tx
            .merchant_name
            .as_deref()
            .filter(|m| !m.is_empty())
            .or(tx.description.as_deref())
            .unwrap_or("(unnamed)");
        println!(
            "   {}  {:30} │ {:>10.2} │ {}",
            tx.booked_at,
            truncate(name, 30),
            tx.amount,
            label_icon(*label)
        );
    }

    let irregular: Vec<_> = transactions
        .iter()
        .zip(&labels)
        .filter(|(_, label)| label.is_irregular())
        .map(|(tx, _)| tx)
        .collect();
    let daily = DailySpendMap::aggregate(irregular.iter().copied());

    Ok(ClassifySummary {
        total: transactions.len(),
        irregular: irregular.len(),
        days_of_history: daily.len(),
    })
}

fn label_icon(label: Classification) -> &'static str {
    match label {
        Classification::Income => "💵 income",
        Classification::Obligation => "📋 obligation",
        Classification::GapRecurring => "🔁 recurring",
        Classification::Irregular => "🛒 irregular",
    }
}
