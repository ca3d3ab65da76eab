//! Normalization of loosely typed intake records pushed by external tools.

use anyhow::{Result, bail};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::Deserialize;
use serde_json::Value;

use crate::models::{NewFoodEntry, Pfc, round1};

pub const UNNAMED_FOOD: &str = "Unnamed";

/// Request body for an intake import: `{ "entries": [...] }`.
#[derive(Debug, Deserialize)]
pub struct IntakeBatch {
    #[serde(default)]
    pub entries: Vec<Value>,
}

/// A normalized external record, ready to be logged on `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedIntake {
    pub date: NaiveDate,
    pub source: Option<String>,
    pub entry: NewFoodEntry,
}

fn to_non_negative(value: Option<&Value>) -> f64 {
    let numeric = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match numeric {
        Some(v) if v.is_finite() && v >= 0.0 => round1(v),
        _ => 0.0,
    }
}

fn to_optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts positive epoch milliseconds or an RFC 3339 string; anything else is `now_ms`.
fn to_timestamp(value: Option<&Value>, now_ms: i64) -> i64 {
    match value {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() && v > 0.0 => v.trunc() as i64,
            _ => now_ms,
        },
        Some(Value::String(s)) if !s.trim().is_empty() => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.timestamp_millis())
            .ok()
            .filter(|ms| *ms > 0)
            .unwrap_or(now_ms),
        _ => now_ms,
    }
}

/// Local calendar date of an epoch-millisecond timestamp.
#[must_use]
pub fn local_date_of(timestamp_ms: i64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.date_naive())
}

pub fn normalize_intake(value: &Value, now_ms: i64) -> Result<NormalizedIntake> {
    let Some(obj) = value.as_object() else {
        bail!("Intake entry must be a JSON object");
    };

    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNNAMED_FOOD)
        .to_string();

    let nutrients = Pfc::new(
        to_non_negative(obj.get("protein")),
        to_non_negative(obj.get("fat")),
        to_non_negative(obj.get("carbs")),
        to_non_negative(obj.get("calories")),
    );
    let consumed_at = to_timestamp(obj.get("consumedAt"), now_ms);
    let Some(date) = local_date_of(consumed_at) else {
        bail!("Timestamp {consumed_at} is out of range");
    };

    Ok(NormalizedIntake {
        date,
        source: to_optional_text(obj.get("source")),
        entry: NewFoodEntry {
            name,
            nutrients,
            store: to_optional_text(obj.get("store")),
            timestamp: Some(consumed_at),
        },
    })
}

pub fn normalize_batch(batch: &IntakeBatch, now_ms: i64) -> Result<Vec<NormalizedIntake>> {
    if batch.entries.is_empty() {
        bail!("Intake batch must contain at least one entry");
    }
    batch
        .entries
        .iter()
        .enumerate()
        .map(|(i, v)| {
            normalize_intake(v, now_ms).map_err(|e| e.context(format!("Invalid entry #{}", i + 1)))
        })
        .collect()
}
