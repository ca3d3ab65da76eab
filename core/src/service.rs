use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::backup::{BackupPayload, RestoreSummary};
use crate::csv_import::{self, CsvImportSummary};
use crate::db::{Database, Snapshot};
use crate::intake::{self, IntakeBatch};
use crate::ledger::compute_debt;
use crate::models::{
    DailyLog, DailyTotal, FoodEstimate, LogHistory, LoggedEntry, NewFoodEntry, NewSavedFood, Pfc,
    SavedFood, UpdateFoodEntry, UpdateSavedFood, UserProfile, UserSettings, WeeklyAllowance,
    WeeklyAverage, validate_barcode, validate_entry_name, validate_nutrients, validate_profile,
};
use crate::profile::suggested_target;
use crate::rebalance::{compute_weekly_allowance, weekly_average};
use crate::visualize::{DebtChartDay, NutrientBars, debt_chart};

/// Barcode lookup provider. The CLI implements this with the OpenFoodFacts API.
///
/// Called synchronously; async clients block on their runtime inside the impl.
pub trait BarcodeLookup: Send + Sync {
    fn lookup_barcode(&self, code: &str) -> Result<Option<FoodEstimate>>;
}

/// Free-text or image-derived nutrition estimation. Returned values are per 100 g.
pub trait NutritionEstimator: Send + Sync {
    fn estimate(&self, description: &str) -> Result<FoodEstimate>;
}

/// Everything shown for a single day: intake, debt entering the day, and this week's pace.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub log: DailyLog,
    pub target: Pfc,
    pub debt: Pfc,
    pub allowance: WeeklyAllowance,
    pub adjusted: bool,
    pub bars: NutrientBars,
}

/// Debt entering a day alongside the target it was computed against.
#[derive(Debug, Clone, Serialize)]
pub struct DebtReport {
    pub date: NaiveDate,
    pub target: Pfc,
    pub debt: Pfc,
}

/// This week's allowance and 7-day average, with the target they were computed against.
#[derive(Debug, Clone, Serialize)]
pub struct WeekReport {
    pub target: Pfc,
    pub allowance: WeeklyAllowance,
    pub average: WeeklyAverage,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntakeImportSummary {
    pub imported: usize,
    pub dates: Vec<NaiveDate>,
    /// Distinct `source` labels carried by the batch, sorted.
    pub sources: Vec<String>,
    pub entries: Vec<LoggedEntry>,
}

/// A saved food and whether it is marked as a favorite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodListing {
    #[serde(flatten)]
    pub food: SavedFood,
    pub favorite: bool,
}

pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{date}', expected YYYY-MM-DD"))
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn validate_new_entry(entry: &NewFoodEntry) -> Result<NewFoodEntry> {
    validate_nutrients(&entry.nutrients)?;
    Ok(NewFoodEntry {
        name: validate_entry_name(&entry.name)?,
        store: trimmed(entry.store.as_deref()),
        ..entry.clone()
    })
}

fn validate_update(update: &UpdateFoodEntry) -> Result<UpdateFoodEntry> {
    let mut update = update.clone();
    if let Some(ref name) = update.name {
        update.name = Some(validate_entry_name(name)?);
    }
    let values = Pfc::new(
        update.protein.unwrap_or(0.0),
        update.fat.unwrap_or(0.0),
        update.carbs.unwrap_or(0.0),
        update.calories.unwrap_or(0.0),
    );
    validate_nutrients(&values)?;
    Ok(update)
}

fn validate_new_food(food: &NewSavedFood) -> Result<NewSavedFood> {
    validate_nutrients(&food.nutrients)?;
    Ok(NewSavedFood {
        name: validate_entry_name(&food.name)?,
        nutrients: food.nutrients,
        store: trimmed(food.store.as_deref()),
        barcode: food
            .barcode
            .as_deref()
            .map(validate_barcode)
            .transpose()?
            .flatten(),
    })
}

fn validate_food_update(update: &UpdateSavedFood) -> Result<UpdateSavedFood> {
    let mut update = update.clone();
    if let Some(ref name) = update.name {
        update.name = Some(validate_entry_name(name)?);
    }
    if let Some(ref barcode) = update.barcode {
        update.barcode = Some(validate_barcode(barcode)?.unwrap_or_default());
    }
    if let Some(ref store) = update.store {
        update.store = Some(store.trim().to_string());
    }
    let values = Pfc::new(
        update.protein.unwrap_or(0.0),
        update.fat.unwrap_or(0.0),
        update.carbs.unwrap_or(0.0),
        update.calories.unwrap_or(0.0),
    );
    validate_nutrients(&values)?;
    Ok(update)
}

pub struct PfcService {
    db: Database,
}

impl PfcService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    // --- Food log ---

    pub fn add_entry(&self, date: &str, entry: &NewFoodEntry) -> Result<LoggedEntry> {
        let date = parse_date(date)?;
        let entry = validate_new_entry(entry)?;
        self.db.insert_entry(date, &entry)
    }

    pub fn get_entry(&self, id: &str) -> Result<LoggedEntry> {
        let id = self.db.resolve_entry_id(id)?;
        self.db.get_entry(&id)
    }

    pub fn update_entry(&self, id: &str, update: &UpdateFoodEntry) -> Result<LoggedEntry> {
        let id = self.db.resolve_entry_id(id)?;
        if update.is_empty() {
            return self.db.get_entry(&id);
        }
        let update = validate_update(update)?;
        self.db.update_entry(&id, &update)
    }

    /// Delete an entry and return it as it was stored.
    pub fn delete_entry(&self, id: &str) -> Result<LoggedEntry> {
        let id = self.db.resolve_entry_id(id)?;
        let existing = self.db.get_entry(&id)?;
        if !self.db.delete_entry(&id)? {
            bail!("Food entry not found");
        }
        Ok(existing)
    }

    pub fn get_daily_log(&self, date: &str) -> Result<DailyLog> {
        self.db.get_daily_log(parse_date(date)?)
    }

    pub fn get_log_history(&self) -> Result<LogHistory> {
        self.db.load_history()
    }

    /// Cached totals for the `days` days ending at `date`.
    pub fn list_daily_totals(&self, date: &str, days: u32) -> Result<Vec<DailyTotal>> {
        let to = parse_date(date)?;
        let from = to
            .checked_sub_days(Days::new(u64::from(days.saturating_sub(1))))
            .unwrap_or(to);
        self.db.list_daily_totals(from, to)
    }

    // --- Settings ---

    pub fn get_target(&self) -> Result<Pfc> {
        self.db.get_target()
    }

    pub fn set_target(&self, target: &Pfc) -> Result<()> {
        validate_nutrients(target)?;
        self.db.set_target(target)?;
        info!(?target, "daily target updated");
        Ok(())
    }

    pub fn get_profile(&self) -> Result<Option<UserProfile>> {
        self.db.get_profile()
    }

    pub fn set_profile(&self, profile: &UserProfile) -> Result<()> {
        validate_profile(profile)?;
        self.db.set_profile(profile)
    }

    pub fn get_settings(&self) -> Result<UserSettings> {
        self.db.load_settings()
    }

    pub fn suggest_target(&self) -> Result<Pfc> {
        let profile = self
            .db
            .get_profile()?
            .context("No profile set. Use `pfc profile set` first")?;
        Ok(suggested_target(&profile))
    }

    /// Compute the suggested target from the stored profile and save it.
    pub fn apply_suggested_target(&self) -> Result<Pfc> {
        let target = self.suggest_target()?;
        self.set_target(&target)?;
        Ok(target)
    }

    // --- Engine ---

    pub fn get_debt(&self, date: &str) -> Result<Pfc> {
        let date = parse_date(date)?;
        let Snapshot {
            history, settings, ..
        } = self.db.load_snapshot()?;
        Ok(compute_debt(&history, &settings.target_pfc, date))
    }

    pub fn get_weekly_allowance(&self, date: &str) -> Result<WeeklyAllowance> {
        let date = parse_date(date)?;
        let Snapshot {
            history, settings, ..
        } = self.db.load_snapshot()?;
        Ok(compute_weekly_allowance(
            &history,
            &settings.target_pfc,
            date,
        ))
    }

    pub fn get_debt_report(&self, date: &str) -> Result<DebtReport> {
        let date = parse_date(date)?;
        let Snapshot {
            history, settings, ..
        } = self.db.load_snapshot()?;
        Ok(DebtReport {
            date,
            debt: compute_debt(&history, &settings.target_pfc, date),
            target: settings.target_pfc,
        })
    }

    pub fn get_week_report(&self, date: &str) -> Result<WeekReport> {
        let date = parse_date(date)?;
        let Snapshot {
            history, settings, ..
        } = self.db.load_snapshot()?;
        let target = settings.target_pfc;
        Ok(WeekReport {
            allowance: compute_weekly_allowance(&history, &target, date),
            average: weekly_average(&history, date),
            target,
        })
    }

    pub fn get_weekly_average(&self, date: &str) -> Result<WeeklyAverage> {
        let date = parse_date(date)?;
        Ok(weekly_average(&self.db.load_history()?, date))
    }

    pub fn get_debt_chart(&self, date: &str, days: u32) -> Result<Vec<DebtChartDay>> {
        let date = parse_date(date)?;
        let Snapshot {
            history, settings, ..
        } = self.db.load_snapshot()?;
        Ok(debt_chart(&history, &settings.target_pfc, date, days))
    }

    /// Intake, debt and weekly allowance for one day, computed from a single snapshot.
    pub fn get_day_summary(&self, date: &str, max_bars: usize) -> Result<DaySummary> {
        let date = parse_date(date)?;
        let Snapshot {
            history, settings, ..
        } = self.db.load_snapshot()?;
        let target = settings.target_pfc;

        let log = history
            .get(date)
            .cloned()
            .unwrap_or_else(|| DailyLog::new(date));
        let debt = compute_debt(&history, &target, date);
        let allowance = compute_weekly_allowance(&history, &target, date);
        let bars = NutrientBars::new(&log.total(), &debt, &target, max_bars);
        debug!(%date, ?debt, "built day summary");

        Ok(DaySummary {
            date,
            adjusted: allowance.is_adjusted(&target, &debt),
            log,
            target,
            debt,
            allowance,
            bars,
        })
    }

    // --- Saved foods ---

    pub fn add_food(&self, food: &NewSavedFood) -> Result<SavedFood> {
        let food = validate_new_food(food)?;
        let saved = self.db.insert_food(&food)?;
        info!(id = %saved.id, name = %saved.name, "food saved");
        Ok(saved)
    }

    pub fn get_food(&self, id: &str) -> Result<SavedFood> {
        let id = self.db.resolve_food_id(id)?;
        self.db.get_food(&id)
    }

    /// Saved foods matching `search`, optionally only favorites.
    pub fn list_foods(
        &self,
        search: Option<&str>,
        favorites_only: bool,
    ) -> Result<Vec<FoodListing>> {
        let favorites = self.db.get_favorite_ids()?;
        let listings = self
            .db
            .list_foods(search)?
            .into_iter()
            .map(|food| FoodListing {
                favorite: favorites.contains(&food.id),
                food,
            })
            .filter(|l| l.favorite || !favorites_only)
            .collect();
        Ok(listings)
    }

    pub fn update_food(&self, id: &str, update: &UpdateSavedFood) -> Result<SavedFood> {
        let id = self.db.resolve_food_id(id)?;
        if update.is_empty() {
            return self.db.get_food(&id);
        }
        let update = validate_food_update(update)?;
        self.db.update_food(&id, &update)
    }

    /// Delete a saved food and return it as it was stored. Logged entries are untouched.
    pub fn delete_food(&self, id: &str) -> Result<SavedFood> {
        let id = self.db.resolve_food_id(id)?;
        let existing = self.db.get_food(&id)?;
        if !self.db.delete_food(&id)? {
            bail!("Saved food not found");
        }
        Ok(existing)
    }

    /// Mark or unmark a saved food as a favorite. Favorites keep the order they were added in.
    pub fn set_favorite(&self, id: &str, favorite: bool) -> Result<SavedFood> {
        let id = self.db.resolve_food_id(id)?;
        let food = self.db.get_food(&id)?;
        let mut favorites = self.db.get_favorite_ids()?;
        let present = favorites.contains(&id);
        if favorite && !present {
            favorites.push(id);
        } else if !favorite && present {
            favorites.retain(|f| *f != id);
        } else {
            return Ok(food);
        }
        self.db.set_favorite_ids(&favorites)?;
        Ok(food)
    }

    /// Favorite foods in favorite order. Ids with no saved food are skipped.
    pub fn list_favorites(&self) -> Result<Vec<SavedFood>> {
        let Snapshot {
            settings, foods, ..
        } = self.db.load_snapshot()?;
        Ok(settings
            .favorite_food_ids
            .iter()
            .filter_map(|id| foods.iter().find(|f| f.id == *id).cloned())
            .collect())
    }

    /// Log `servings` servings of a saved food.
    pub fn quick_add(&self, food_id: &str, date: &str, servings: f64) -> Result<LoggedEntry> {
        if !servings.is_finite() || servings <= 0.0 {
            bail!("Servings must be a positive number");
        }
        let food = self.get_food(food_id)?;
        self.add_entry(date, &food.to_entry(servings))
    }

    /// Known store labels from logged entries and saved foods.
    pub fn list_stores(&self) -> Result<Vec<String>> {
        self.db.list_stores()
    }

    // --- Lookups ---

    pub fn barcode_lookup(
        &self,
        provider: &dyn BarcodeLookup,
        code: &str,
    ) -> Result<Option<FoodEstimate>> {
        let code = code.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
            bail!("Invalid barcode '{code}': expected digits only");
        }
        provider.lookup_barcode(code)
    }

    /// Log a scanned barcode. A saved food mapped to the code is logged as one serving;
    /// otherwise the provider is asked and `serving_g` grams are logged.
    /// `None` when the product is unknown.
    pub fn log_barcode(
        &self,
        provider: &dyn BarcodeLookup,
        date: &str,
        code: &str,
        serving_g: f64,
    ) -> Result<Option<LoggedEntry>> {
        if let Some(code) = validate_barcode(code)? {
            if let Some(food) = self.db.find_food_by_barcode(&code)? {
                debug!(%code, id = %food.id, "barcode mapped to saved food");
                return self.add_entry(date, &food.to_entry(1.0)).map(Some);
            }
        }
        let Some(estimate) = self.barcode_lookup(provider, code)? else {
            return Ok(None);
        };
        self.log_food_estimate(date, &estimate, serving_g).map(Some)
    }

    pub fn log_estimate(
        &self,
        estimator: &dyn NutritionEstimator,
        date: &str,
        description: &str,
        serving_g: f64,
    ) -> Result<LoggedEntry> {
        let estimate = estimator.estimate(description)?;
        self.log_food_estimate(date, &estimate, serving_g)
    }

    fn log_food_estimate(
        &self,
        date: &str,
        estimate: &FoodEstimate,
        serving_g: f64,
    ) -> Result<LoggedEntry> {
        if !serving_g.is_finite() || serving_g <= 0.0 {
            bail!("Serving must be a positive number of grams");
        }
        debug!(name = %estimate.name, source = %estimate.source, serving_g, "logging estimate");
        self.add_entry(date, &estimate.to_entry(serving_g))
    }

    // --- Imports ---

    pub fn import_intake_json(&self, json: &str) -> Result<IntakeImportSummary> {
        let batch: IntakeBatch =
            serde_json::from_str(json).context("Failed to parse intake payload")?;
        self.import_intakes(&batch, Utc::now().timestamp_millis())
    }

    /// Normalize the whole batch first so a bad record rejects it before anything is written.
    pub fn import_intakes(&self, batch: &IntakeBatch, now_ms: i64) -> Result<IntakeImportSummary> {
        let normalized = intake::normalize_batch(batch, now_ms)?;
        let mut dates = BTreeSet::new();
        let mut sources = BTreeSet::new();
        let mut validated = Vec::with_capacity(normalized.len());
        for item in normalized {
            dates.insert(item.date);
            sources.extend(item.source);
            validated.push((item.date, validate_new_entry(&item.entry)?));
        }
        let entries = self.db.insert_entries(&validated)?;
        info!(imported = entries.len(), ?sources, "intake import finished");
        Ok(IntakeImportSummary {
            imported: entries.len(),
            dates: dates.into_iter().collect(),
            sources: sources.into_iter().collect(),
            entries,
        })
    }

    pub fn import_csv(&self, csv_data: &str, dry_run: bool) -> Result<CsvImportSummary> {
        let rows = csv_import::parse_csv(csv_data.as_bytes())?;
        csv_import::import_csv_rows(&self.db, &rows, dry_run)
    }

    // --- Backup ---

    pub fn export_backup(&self) -> Result<BackupPayload> {
        let Snapshot {
            history,
            settings,
            foods,
        } = self.db.load_snapshot()?;
        Ok(BackupPayload::new(
            &history,
            settings,
            foods,
            Utc::now().timestamp_millis(),
        ))
    }

    pub fn restore_backup(&self, payload: &BackupPayload) -> Result<RestoreSummary> {
        payload.validate()?;
        self.db
            .replace_all(&payload.history(), &payload.settings, &payload.foods)?;
        let summary = payload.summary();
        info!(
            days = summary.days_restored,
            entries = summary.entries_restored,
            foods = summary.foods_restored,
            "backup restored"
        );
        Ok(summary)
    }
}
