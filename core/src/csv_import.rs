use std::collections::HashSet;
use std::io::Read;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::db::Database;
use crate::models::{NewFoodEntry, Pfc, validate_nutrients};

/// A single row parsed from an intake CSV.
#[derive(Debug, Clone)]
pub struct CsvRow {
    pub date: NaiveDate,
    pub name: String,
    pub nutrients: Pfc,
    pub store: Option<String>,
}

/// Summary of what a CSV import would do / did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CsvImportSummary {
    pub rows_parsed: usize,
    pub entries_logged: usize,
    pub dates_spanned: usize,
    pub dry_run: bool,
}

/// Parse an intake CSV from any reader.
///
/// Expected header: `Date,Name,Protein,Fat,Carbs,Calories[,Store]`.
/// Header matching is case-insensitive; only `Date`, `Name` and `Calories` are required.
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    for name in ["Date", "Name", "Calories"] {
        if !headers.iter().any(|h| h.eq_ignore_ascii_case(name)) {
            bail!("Missing required column: {name}");
        }
    }

    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let idx_date = col("Date").context("Missing 'Date' column")?;
    let idx_name = col("Name").context("Missing 'Name' column")?;
    let idx_cal = col("Calories").context("Missing 'Calories' column")?;
    let idx_protein = col("Protein");
    let idx_fat = col("Fat");
    let idx_carbs = col("Carbs");
    let idx_store = col("Store");

    let mut rows = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let line = line_num + 2;
        let record = result.with_context(|| format!("Failed to parse CSV row {line}"))?;

        let date = record.get(idx_date).unwrap_or("").trim();
        let name = record.get(idx_name).unwrap_or("").trim();
        if date.is_empty() || name.is_empty() {
            continue;
        }

        let number = |idx: Option<usize>| -> f64 {
            idx.and_then(|i| record.get(i))
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(0.0)
        };

        let nutrients = Pfc::new(
            number(idx_protein),
            number(idx_fat),
            number(idx_carbs),
            number(Some(idx_cal)),
        );
        validate_nutrients(&nutrients).with_context(|| format!("Invalid values on row {line}"))?;

        rows.push(CsvRow {
            date: normalize_date(date).with_context(|| format!("Invalid date on row {line}"))?,
            name: name.to_string(),
            nutrients,
            store: idx_store
                .and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        });
    }

    Ok(rows)
}

/// Accepts `YYYY-MM-DD`, `M/D/YYYY` or `D/M/YYYY`, tried in that order.
pub fn normalize_date(value: &str) -> Result<NaiveDate> {
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(value, format) {
            return Ok(d);
        }
    }
    bail!("Cannot parse date: '{value}'")
}

/// Log parsed rows. When `dry_run` is true, nothing is written.
pub fn import_csv_rows(db: &Database, rows: &[CsvRow], dry_run: bool) -> Result<CsvImportSummary> {
    let dates: HashSet<NaiveDate> = rows.iter().map(|r| r.date).collect();
    let entries: Vec<(NaiveDate, NewFoodEntry)> = rows
        .iter()
        .map(|row| {
            (
                row.date,
                NewFoodEntry {
                    name: row.name.clone(),
                    nutrients: row.nutrients,
                    store: row.store.clone(),
                    timestamp: None,
                },
            )
        })
        .collect();

    let entries_logged = if dry_run {
        entries.len()
    } else {
        db.insert_entries(&entries)?.len()
    };

    info!(rows = rows.len(), dry_run, "csv import finished");
    Ok(CsvImportSummary {
        rows_parsed: rows.len(),
        entries_logged,
        dates_spanned: dates.len(),
        dry_run,
    })
}
