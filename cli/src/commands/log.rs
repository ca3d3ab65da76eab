use anyhow::Result;
use std::process;

use pfc_core::models::{LoggedEntry, NewFoodEntry, Pfc};
use pfc_core::service::PfcService;

use crate::openfoodfacts::OpenFoodFactsClient;

use super::helpers::{date_arg, format_pfc, json_error};

/// Entries are shown by the first 8 characters of their id; any unique prefix is accepted back.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub(crate) fn describe_entry(logged: &LoggedEntry) -> String {
    let e = &logged.entry;
    let store = e
        .store
        .as_ref()
        .map(|s| format!(" ({s})"))
        .unwrap_or_default();
    format!(
        "[{}] {}{store} on {}: {}",
        short_id(&e.id),
        e.name,
        logged.date,
        format_pfc(&e.nutrients)
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_add(
    svc: &PfcService,
    name: &str,
    protein: f64,
    fat: f64,
    carbs: f64,
    calories: f64,
    store: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = date_arg(date)?;
    let logged = svc.add_entry(
        &date,
        &NewFoodEntry {
            name: name.to_string(),
            nutrients: Pfc::new(protein, fat, carbs, calories),
            store,
            timestamp: None,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&logged)?);
    } else {
        println!("Logged: {}", describe_entry(&logged));
    }
    Ok(())
}

pub(crate) fn cmd_barcode(
    svc: &PfcService,
    off: &OpenFoodFactsClient,
    code: &str,
    serving_g: f64,
    date: Option<String>,
    lookup_only: bool,
    json: bool,
) -> Result<()> {
    let date = date_arg(date)?;

    if lookup_only {
        let Some(estimate) = tokio::task::block_in_place(|| svc.barcode_lookup(off, code))? else {
            return not_found(code, json);
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        } else {
            let brand = estimate
                .brand
                .as_ref()
                .map(|b| format!(" ({b})"))
                .unwrap_or_default();
            println!(
                "{}{brand} per 100g: {}",
                estimate.name,
                format_pfc(&estimate.per_100g)
            );
        }
        return Ok(());
    }

    let Some(logged) =
        tokio::task::block_in_place(|| svc.log_barcode(off, &date, code, serving_g))?
    else {
        return not_found(code, json);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&logged)?);
    } else {
        println!("Logged {serving_g}g: {}", describe_entry(&logged));
    }
    Ok(())
}

fn not_found(code: &str, json: bool) -> Result<()> {
    let message = format!("No product found for barcode '{code}'");
    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pfc_core::models::FoodEntry;

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_describe_entry() {
        let logged = LoggedEntry {
            date: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
            entry: FoodEntry {
                id: "deadbeef-0000".to_string(),
                name: "Onigiri".to_string(),
                nutrients: Pfc::new(4.5, 1.2, 38.0, 180.0),
                store: Some("Lawson".to_string()),
                timestamp: 0,
            },
        };
        assert_eq!(
            describe_entry(&logged),
            "[deadbeef] Onigiri (Lawson) on 2024-06-15: P:4.5g F:1.2g C:38.0g 180 kcal"
        );
    }
}
