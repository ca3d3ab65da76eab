use anyhow::{Result, bail};
use std::process;

use pfc_core::models::UpdateFoodEntry;
use pfc_core::service::PfcService;

use super::helpers::{json_error, parse_date};
use super::log::describe_entry;

pub(crate) fn report_missing(err: &anyhow::Error, json: bool) -> ! {
    let message = format!("{err:#}");
    if json {
        println!("{}", json_error(&message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn cmd_delete(svc: &PfcService, entry_id: &str, json: bool) -> Result<()> {
    match svc.delete_entry(entry_id) {
        Ok(removed) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": removed.entry.id }));
            } else {
                println!("Deleted {}", describe_entry(&removed));
            }
            Ok(())
        }
        Err(e) => report_missing(&e, json),
    }
}

pub(crate) fn cmd_edit(
    svc: &PfcService,
    entry_id: &str,
    update: UpdateFoodEntry,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let update = UpdateFoodEntry {
        date: date.map(Some).map(parse_date).transpose()?,
        ..update
    };
    if update.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --name, --protein, --fat, --carbs, --calories, --store, or --date"
        );
    }

    let entry_id = match svc.get_entry(entry_id) {
        Ok(existing) => existing.entry.id,
        Err(e) => report_missing(&e, json),
    };
    let updated = svc.update_entry(&entry_id, &update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Updated {}", describe_entry(&updated));
    }
    Ok(())
}
