use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use pfc_core::models::{NewSavedFood, Pfc, SavedFood, UpdateSavedFood};
use pfc_core::service::{FoodListing, PfcService};

use super::entry::report_missing;
use super::helpers::{date_arg, format_pfc, truncate};
use super::log::{describe_entry, short_id};

#[derive(Tabled)]
struct FoodRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Fav")]
    favorite: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Store")]
    store: String,
    #[tabled(rename = "P")]
    protein: String,
    #[tabled(rename = "F")]
    fat: String,
    #[tabled(rename = "C")]
    carbs: String,
    #[tabled(rename = "kcal")]
    calories: String,
    #[tabled(rename = "Barcode")]
    barcode: String,
}

fn food_rows(listings: &[FoodListing]) -> Vec<FoodRow> {
    listings
        .iter()
        .map(|l| {
            let f = &l.food;
            FoodRow {
                id: short_id(&f.id).to_string(),
                favorite: if l.favorite { "*" } else { "" },
                name: truncate(&f.name, 35),
                store: f
                    .store
                    .as_deref()
                    .map(|s| truncate(s, 20))
                    .unwrap_or_default(),
                protein: format!("{:.1}", f.nutrients.protein),
                fat: format!("{:.1}", f.nutrients.fat),
                carbs: format!("{:.1}", f.nutrients.carbs),
                calories: format!("{:.0}", f.nutrients.calories),
                barcode: f.barcode.clone().unwrap_or_default(),
            }
        })
        .collect()
}

fn describe_food(food: &SavedFood) -> String {
    let store = food
        .store
        .as_ref()
        .map(|s| format!(" ({s})"))
        .unwrap_or_default();
    format!(
        "[{}] {}{store}: {}",
        short_id(&food.id),
        food.name,
        format_pfc(&food.nutrients)
    )
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_food_add(
    svc: &PfcService,
    name: &str,
    protein: f64,
    fat: f64,
    carbs: f64,
    calories: f64,
    store: Option<String>,
    barcode: Option<String>,
    json: bool,
) -> Result<()> {
    let food = svc.add_food(&NewSavedFood {
        name: name.to_string(),
        nutrients: Pfc::new(protein, fat, carbs, calories),
        store,
        barcode,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&food)?);
    } else {
        println!("Saved food: {}", describe_food(&food));
    }
    Ok(())
}

pub(crate) fn cmd_food_list(
    svc: &PfcService,
    search: Option<&str>,
    favorites: bool,
    json: bool,
) -> Result<()> {
    let listings = svc.list_foods(search, favorites)?;

    if listings.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No saved foods found");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    } else {
        let table = Table::new(food_rows(&listings))
            .with(Style::rounded())
            .with(Modify::new(Columns::new(4..8)).with(Alignment::right()))
            .to_string();
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_food_edit(
    svc: &PfcService,
    food_id: &str,
    update: &UpdateSavedFood,
    json: bool,
) -> Result<()> {
    if update.is_empty() {
        bail!(
            "Nothing to update. Provide at least one of --name, --protein, --fat, --carbs, --calories, --store, or --barcode"
        );
    }
    let food_id = match svc.get_food(food_id) {
        Ok(existing) => existing.id,
        Err(e) => report_missing(&e, json),
    };
    let updated = svc.update_food(&food_id, update)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("Updated {}", describe_food(&updated));
    }
    Ok(())
}

pub(crate) fn cmd_food_delete(svc: &PfcService, food_id: &str, json: bool) -> Result<()> {
    match svc.delete_food(food_id) {
        Ok(removed) => {
            if json {
                println!("{}", serde_json::json!({ "deleted": removed.id }));
            } else {
                println!("Deleted {}", describe_food(&removed));
            }
            Ok(())
        }
        Err(e) => report_missing(&e, json),
    }
}

pub(crate) fn cmd_food_fav(svc: &PfcService, food_id: &str, off: bool, json: bool) -> Result<()> {
    let food = match svc.set_favorite(food_id, !off) {
        Ok(food) => food,
        Err(e) => report_missing(&e, json),
    };

    if json {
        println!(
            "{}",
            serde_json::json!({ "id": food.id, "favorite": !off })
        );
    } else if off {
        println!("Removed from favorites: {}", food.name);
    } else {
        println!("Added to favorites: {}", food.name);
    }
    Ok(())
}

pub(crate) fn cmd_food_stores(svc: &PfcService, json: bool) -> Result<()> {
    let stores = svc.list_stores()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stores)?);
    } else if stores.is_empty() {
        eprintln!("No stores recorded yet");
    } else {
        for store in &stores {
            println!("{store}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_food_log(
    svc: &PfcService,
    food_id: &str,
    servings: f64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = date_arg(date)?;
    if let Err(e) = svc.get_food(food_id) {
        report_missing(&e, json);
    }
    let logged = svc.quick_add(food_id, &date, servings)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&logged)?);
    } else {
        println!("Logged: {}", describe_entry(&logged));
    }
    Ok(())
}
