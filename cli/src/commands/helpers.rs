use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pfc_core::models::{Nutrient, Pfc};
use pfc_core::visualize::BarSegment;

/// Character width of one rendered bar.
pub(crate) const BAR_WIDTH: usize = 20;

pub(crate) fn parse_serving(s: &str) -> Result<f64> {
    let trimmed = s.trim_end_matches('g').trim();
    let value: f64 = trimmed.parse().with_context(|| {
        format!("Invalid serving size: '{s}'. Use a number like '200' or '200g'")
    })?;
    if !value.is_finite() || value <= 0.0 {
        bail!("Serving size must be greater than 0");
    }
    Ok(value)
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            }),
        },
    }
}

/// Resolve a date argument to the `YYYY-MM-DD` form the service expects.
pub(crate) fn date_arg(date_str: Option<String>) -> Result<String> {
    Ok(parse_date(date_str)?.format("%Y-%m-%d").to_string())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// `P:100.0g F:60.0g C:250.0g 2000 kcal`
pub(crate) fn format_pfc(pfc: &Pfc) -> String {
    let p = no_neg_zero(pfc.protein);
    let f = no_neg_zero(pfc.fat);
    let c = no_neg_zero(pfc.carbs);
    let k = no_neg_zero(pfc.calories);
    format!("P:{p:.1}g F:{f:.1}g C:{c:.1}g {k:.0} kcal")
}

pub(crate) fn format_amount(nutrient: Nutrient, value: f64) -> String {
    let value = no_neg_zero(value);
    match nutrient {
        Nutrient::Calories => format!("{value:.0} {}", nutrient.unit()),
        _ => format!("{value:.1}{}", nutrient.unit()),
    }
}

/// Render one bar: `#` for intake, `+` for carried debt, `.` for headroom.
pub(crate) fn render_bar(segment: &BarSegment, target: f64, width: usize) -> String {
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
    let cells = |pct: f64| ((pct / 100.0) * width as f64).round() as usize;
    let current = cells(segment.current_pct(target)).min(width);
    let debt = cells(segment.debt_pct(target)).min(width - current);
    format!(
        "[{}{}{}]",
        "#".repeat(current),
        "+".repeat(debt),
        ".".repeat(width - current - debt)
    )
}

/// One row per nutrient with the given columns, printed as a rounded table.
pub(crate) fn print_nutrient_table(headers: &[&str], rows: &[(Nutrient, Vec<String>)]) {
    let mut builder = tabled::builder::Builder::default();
    let mut header = vec![String::new()];
    header.extend(headers.iter().map(|h| (*h).to_string()));
    builder.push_record(header);
    for (n, cols) in rows {
        let mut record = vec![n.label().to_string()];
        record.extend(cols.iter().cloned());
        builder.push_record(record);
    }
    let table = builder
        .build()
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

#[derive(Tabled)]
pub(crate) struct TotalsRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Protein")]
    pub protein: String,
    #[tabled(rename = "Fat")]
    pub fat: String,
    #[tabled(rename = "Carbs")]
    pub carbs: String,
    #[tabled(rename = "Calories")]
    pub calories: String,
}

impl TotalsRow {
    pub(crate) fn new(date: String, pfc: &Pfc) -> Self {
        Self {
            date,
            protein: format_amount(Nutrient::Protein, pfc.protein),
            fat: format_amount(Nutrient::Fat, pfc.fat),
            carbs: format_amount(Nutrient::Carbs, pfc.carbs),
            calories: format_amount(Nutrient::Calories, pfc.calories),
        }
    }
}

pub(crate) fn print_totals_table(rows: &[TotalsRow]) {
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serving() {
        assert!((parse_serving("200").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_serving("200g").unwrap() - 200.0).abs() < f64::EPSILON);
        assert!((parse_serving("200.5g").unwrap() - 200.5).abs() < f64::EPSILON);
        assert!((parse_serving("200 ").unwrap() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_serving_invalid() {
        assert!(parse_serving("abc").is_err());
        assert!(parse_serving("0").is_err());
        assert!(parse_serving("-50g").is_err());
    }

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(date_arg(Some("2024-01-15".to_string())).unwrap(), "2024-01-15");
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_format_pfc() {
        let pfc = Pfc::new(100.0, 60.26, -0.0, 2000.4);
        assert_eq!(format_pfc(&pfc), "P:100.0g F:60.3g C:0.0g 2000 kcal");
    }

    #[test]
    fn test_render_bar() {
        let half = BarSegment {
            current: 50.0,
            debt: 25.0,
        };
        assert_eq!(render_bar(&half, 100.0, 8), "[####++..]");

        let full = BarSegment {
            current: 100.0,
            debt: 40.0,
        };
        assert_eq!(render_bar(&full, 100.0, 4), "[####]");

        let empty = BarSegment {
            current: 0.0,
            debt: 0.0,
        };
        assert_eq!(render_bar(&empty, 0.0, 3), "[...]");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("boom"), r#"{"error":"boom"}"#);
    }
}
