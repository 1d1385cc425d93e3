//! CSV history import

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Column positions located from the header row
struct HistoryColumns {
    date: usize,
    amount: usize,
    merchant: Option<usize>,
    description: Option<usize>,
}

impl HistoryColumns {
    fn locate(headers: &StringRecord) -> Result<Self> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        let date = find(&["date", "booked_at"])
            .ok_or_else(|| Error::Import("Missing date column (date or booked_at)".into()))?;
        let amount =
            find(&["amount"]).ok_or_else(|| Error::Import("Missing amount column".into()))?;

        Ok(Self {
            date,
            amount,
            merchant: find(&["merchant", "merchant_name"]),
            description: find(&["description", "memo"]),
        })
    }
}

/// Parse a transaction history CSV with a header row.
///
/// Negative amounts are outflows. Empty merchant or description cells become
/// `None`.
pub fn parse_history_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = HistoryColumns::locate(&headers)?;
    let mut transactions = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        // Header is line 1
        let row = idx + 2;

        let date_str = record
            .get(columns.date)
            .ok_or_else(|| Error::Import(format!("Row {}: missing date", row)))?;
        let booked_at =
            parse_date(date_str).map_err(|e| Error::Import(format!("Row {}: {}", row, e)))?;

        let amount_str = record
            .get(columns.amount)
            .ok_or_else(|| Error::Import(format!("Row {}: missing amount", row)))?;
        let amount =
            parse_amount(amount_str).map_err(|e| Error::Import(format!("Row {}: {}", row, e)))?;

        transactions.push(Transaction {
            amount,
            booked_at,
            merchant_name: optional_cell(&record, columns.merchant),
            description: optional_cell(&record, columns.description),
        });
    }

    debug!("Parsed {} history transactions", transactions.len());
    Ok(transactions)
}

fn optional_cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a date string in various common formats
fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    let s = s.trim();

    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
        "%m/%d/%y", // 01/15/24
        "%d/%m/%Y", // 15/01/2024 (European)
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(format!("Unable to parse date: {}", s))
}

/// Parse an amount string, handling currency symbols and commas
fn parse_amount(s: &str) -> std::result::Result<f64, String> {
    let cleaned: String = s
        .trim()
        .replace(['$', '£', '€', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Unable to parse amount: {}", s))
}
