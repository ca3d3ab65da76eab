use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::models::{
    DEFAULT_TARGET, DailyLog, DailyTotal, FoodEntry, LogHistory, LoggedEntry, NewFoodEntry,
    NewSavedFood, Pfc, SavedFood, UpdateFoodEntry, UpdateSavedFood, UserProfile, UserSettings,
};

const SETTING_TARGET: &str = "target_pfc";
const SETTING_PROFILE: &str = "profile";
const SETTING_FAVORITES: &str = "favorite_food_ids";

const ENTRY_COLUMNS: &str =
    "date, id, name, protein, fat, carbs, calories, store, timestamp";
const FOOD_COLUMNS: &str = "id, name, protein, fat, carbs, calories, store, barcode";

pub struct Database {
    conn: Connection,
}

/// Everything the engine and backups read, taken inside one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub history: LogHistory,
    pub settings: UserSettings,
    pub foods: Vec<SavedFood>,
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_stored_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Corrupt date in database: '{value}'"))
}

// Expects ENTRY_COLUMNS order.
fn entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<(String, FoodEntry)> {
    Ok((
        row.get(0)?,
        FoodEntry {
            id: row.get(1)?,
            name: row.get(2)?,
            nutrients: Pfc {
                protein: row.get(3)?,
                fat: row.get(4)?,
                carbs: row.get(5)?,
                calories: row.get(6)?,
            },
            store: row.get(7)?,
            timestamp: row.get(8)?,
        },
    ))
}

// Expects FOOD_COLUMNS order.
fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<SavedFood> {
    Ok(SavedFood {
        id: row.get(0)?,
        name: row.get(1)?,
        nutrients: Pfc {
            protein: row.get(2)?,
            fat: row.get(3)?,
            carbs: row.get(4)?,
            calories: row.get(5)?,
        },
        store: row.get(6)?,
        barcode: row.get(7)?,
    })
}

fn entries_for_date(conn: &Connection, date: NaiveDate) -> Result<Vec<FoodEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM food_entries WHERE date = ?1 ORDER BY rowid"
    ))?;
    let entries = stmt
        .query_map(params![date_key(date)], entry_from_row)?
        .map(|r| r.map(|(_, e)| e))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

/// Rewrite the cached total for `date` from its entries, dropping the row when none remain.
fn refresh_daily_total(conn: &Connection, date: NaiveDate) -> Result<()> {
    let log = DailyLog::with_items(date, entries_for_date(conn, date)?);
    let key = date_key(date);
    if log.is_empty() {
        conn.execute("DELETE FROM daily_totals WHERE date = ?1", params![key])?;
        return Ok(());
    }
    let total = log.total();
    let now = Local::now().to_rfc3339();
    conn.execute(
        "INSERT INTO daily_totals (date, protein, fat, carbs, calories, entry_count, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(date) DO UPDATE SET
            protein = excluded.protein, fat = excluded.fat, carbs = excluded.carbs,
            calories = excluded.calories, entry_count = excluded.entry_count,
            updated_at = excluded.updated_at",
        params![
            key,
            total.protein,
            total.fat,
            total.carbs,
            total.calories,
            i64::try_from(log.items().len()).unwrap_or(i64::MAX),
            now,
        ],
    )?;
    Ok(())
}

fn insert_entry_row(conn: &Connection, date: NaiveDate, entry: &FoodEntry) -> Result<()> {
    let now = Local::now().to_rfc3339();
    conn.execute(
        "INSERT INTO food_entries (id, date, name, protein, fat, carbs, calories, store, timestamp, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            entry.id,
            date_key(date),
            entry.name,
            entry.nutrients.protein,
            entry.nutrients.fat,
            entry.nutrients.carbs,
            entry.nutrients.calories,
            entry.store,
            entry.timestamp,
            now,
            now,
        ],
    )?;
    Ok(())
}

fn insert_food_row(conn: &Connection, food: &SavedFood) -> Result<()> {
    let now = Local::now().to_rfc3339();
    conn.execute(
        "INSERT INTO foods (id, name, protein, fat, carbs, calories, store, barcode, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            food.id,
            food.name,
            food.nutrients.protein,
            food.nutrients.fat,
            food.nutrients.carbs,
            food.nutrients.calories,
            food.store,
            food.barcode,
            now,
            now,
        ],
    )
    .map_err(|e| barcode_conflict(e, food))?;
    Ok(())
}

fn barcode_conflict(err: rusqlite::Error, food: &SavedFood) -> anyhow::Error {
    let is_constraint = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    );
    match food.barcode.as_deref() {
        Some(code) if is_constraint => anyhow::anyhow!("A saved food already uses barcode {code}"),
        _ => err.into(),
    }
}

fn read_history(conn: &Connection) -> Result<LogHistory> {
    let rows = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM food_entries ORDER BY date, rowid"
        ))?;
        stmt.query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut grouped: HashMap<String, Vec<FoodEntry>> = HashMap::new();
    for (date, entry) in rows {
        grouped.entry(date).or_default().push(entry);
    }
    let mut history = LogHistory::new();
    for (date, items) in grouped {
        history.insert(DailyLog::with_items(parse_stored_date(&date)?, items));
    }
    Ok(history)
}

fn read_foods(conn: &Connection, search: Option<&str>) -> Result<Vec<SavedFood>> {
    let pattern = format!("%{}%", search.unwrap_or("").trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {FOOD_COLUMNS} FROM foods
         WHERE name LIKE ?1 OR IFNULL(store, '') LIKE ?1
         ORDER BY name COLLATE NOCASE, id"
    ))?;
    let foods = stmt
        .query_map(params![pattern], food_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(foods)
}

fn read_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM user_settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn read_settings(conn: &Connection) -> Result<UserSettings> {
    let target_pfc = match read_setting(conn, SETTING_TARGET)? {
        Some(json) => serde_json::from_str(&json).context("Corrupt target setting")?,
        None => DEFAULT_TARGET,
    };
    let profile = read_setting(conn, SETTING_PROFILE)?
        .map(|json| serde_json::from_str(&json).context("Corrupt profile setting"))
        .transpose()?;
    let favorite_food_ids = read_setting(conn, SETTING_FAVORITES)?
        .map(|json| serde_json::from_str(&json).context("Corrupt favorites setting"))
        .transpose()?
        .unwrap_or_default();
    Ok(UserSettings {
        target_pfc,
        profile,
        favorite_food_ids,
    })
}

/// Resolve a full id or a unique id prefix in `table` to the stored id.
fn resolve_id(conn: &Connection, table: &str, label: &str, id_or_prefix: &str) -> Result<String> {
    let needle = id_or_prefix.trim();
    if needle.is_empty() {
        bail!("{label} id must not be empty");
    }
    let exact: Option<String> = conn
        .query_row(
            &format!("SELECT id FROM {table} WHERE id = ?1"),
            params![needle],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = exact {
        return Ok(id);
    }

    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("{escaped}%");
    let mut stmt =
        conn.prepare(&format!("SELECT id FROM {table} WHERE id LIKE ?1 ESCAPE '\\' LIMIT 2"))?;
    let ids = stmt
        .query_map(params![pattern], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    match ids.as_slice() {
        [] => bail!("No {} matches '{needle}'", label.to_lowercase()),
        [id] => Ok(id.clone()),
        _ => bail!("{label} id prefix '{needle}' is ambiguous"),
    }
}

fn write_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    let now = Local::now().to_rfc3339();
    conn.execute(
        "INSERT INTO user_settings (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, now],
    )?;
    Ok(())
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            debug!("migrating database to version 1");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS food_entries (
                    id TEXT PRIMARY KEY,
                    date TEXT NOT NULL,
                    name TEXT NOT NULL,
                    protein REAL NOT NULL,
                    fat REAL NOT NULL,
                    carbs REAL NOT NULL,
                    calories REAL NOT NULL,
                    store TEXT,
                    timestamp INTEGER NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_food_entries_date ON food_entries(date);

                CREATE TABLE IF NOT EXISTS daily_totals (
                    date TEXT PRIMARY KEY,
                    protein REAL NOT NULL,
                    fat REAL NOT NULL,
                    carbs REAL NOT NULL,
                    calories REAL NOT NULL,
                    entry_count INTEGER NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS user_settings (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            debug!("migrating database to version 2");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS foods (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    protein REAL NOT NULL,
                    fat REAL NOT NULL,
                    carbs REAL NOT NULL,
                    calories REAL NOT NULL,
                    store TEXT,
                    barcode TEXT UNIQUE,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Food entries ---

    /// Insert an entry under `date`. Input is assumed validated.
    pub fn insert_entry(&self, date: NaiveDate, entry: &NewFoodEntry) -> Result<LoggedEntry> {
        let mut logged = self.insert_entries(&[(date, entry.clone())])?;
        logged.pop().context("Entry was not inserted")
    }

    /// Insert many entries in one transaction; either all are stored or none.
    pub fn insert_entries(
        &self,
        entries: &[(NaiveDate, NewFoodEntry)],
    ) -> Result<Vec<LoggedEntry>> {
        let now_ms = Utc::now().timestamp_millis();
        let tx = self.conn.unchecked_transaction()?;
        let mut logged = Vec::with_capacity(entries.len());
        let mut dates = BTreeSet::new();
        for (date, new) in entries {
            let entry = FoodEntry {
                id: Uuid::new_v4().to_string(),
                name: new.name.clone(),
                nutrients: new.nutrients,
                store: new.store.clone(),
                timestamp: new.timestamp.unwrap_or(now_ms),
            };
            insert_entry_row(&tx, *date, &entry)?;
            dates.insert(*date);
            logged.push(LoggedEntry { date: *date, entry });
        }
        for date in &dates {
            refresh_daily_total(&tx, *date)?;
        }
        tx.commit()?;
        debug!(count = logged.len(), days = dates.len(), "inserted food entries");
        Ok(logged)
    }

    pub fn get_entry(&self, id: &str) -> Result<LoggedEntry> {
        let (date, entry) = self
            .conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM food_entries WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .context("Food entry not found")?;
        Ok(LoggedEntry {
            date: parse_stored_date(&date)?,
            entry,
        })
    }

    /// Resolve a full id or a unique id prefix to the stored id.
    pub fn resolve_entry_id(&self, id_or_prefix: &str) -> Result<String> {
        resolve_id(&self.conn, "food_entries", "Food entry", id_or_prefix)
    }

    /// Apply a partial update. Moving an entry to another date refreshes both days.
    pub fn update_entry(&self, id: &str, update: &UpdateFoodEntry) -> Result<LoggedEntry> {
        let existing = self.get_entry(id)?;
        let mut entry = existing.entry.clone();
        if let Some(ref name) = update.name {
            entry.name.clone_from(name);
        }
        if let Some(v) = update.protein {
            entry.nutrients.protein = v;
        }
        if let Some(v) = update.fat {
            entry.nutrients.fat = v;
        }
        if let Some(v) = update.carbs {
            entry.nutrients.carbs = v;
        }
        if let Some(v) = update.calories {
            entry.nutrients.calories = v;
        }
        if let Some(ref store) = update.store {
            entry.store = if store.trim().is_empty() {
                None
            } else {
                Some(store.clone())
            };
        }
        let date = update.date.unwrap_or(existing.date);

        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE food_entries
             SET date = ?1, name = ?2, protein = ?3, fat = ?4, carbs = ?5, calories = ?6,
                 store = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                date_key(date),
                entry.name,
                entry.nutrients.protein,
                entry.nutrients.fat,
                entry.nutrients.carbs,
                entry.nutrients.calories,
                entry.store,
                now,
                id,
            ],
        )?;
        refresh_daily_total(&tx, existing.date)?;
        if date != existing.date {
            refresh_daily_total(&tx, date)?;
        }
        tx.commit()?;
        debug!(%id, from = %existing.date, to = %date, "updated food entry");
        Ok(LoggedEntry { date, entry })
    }

    pub fn delete_entry(&self, id: &str) -> Result<bool> {
        let date: Option<String> = self
            .conn
            .query_row(
                "SELECT date FROM food_entries WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(date) = date else {
            return Ok(false);
        };
        let date = parse_stored_date(&date)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM food_entries WHERE id = ?1", params![id])?;
        refresh_daily_total(&tx, date)?;
        tx.commit()?;
        debug!(%id, %date, "deleted food entry");
        Ok(true)
    }

    /// The log for `date`; an empty log when nothing was recorded.
    pub fn get_daily_log(&self, date: NaiveDate) -> Result<DailyLog> {
        Ok(DailyLog::with_items(
            date,
            entries_for_date(&self.conn, date)?,
        ))
    }

    /// Snapshot of every daily log, read in a single transaction.
    pub fn load_history(&self) -> Result<LogHistory> {
        let tx = self.conn.unchecked_transaction()?;
        let history = read_history(&tx)?;
        tx.commit()?;
        debug!(days = history.len(), "loaded log history");
        Ok(history)
    }

    /// Logs, settings and saved foods as of one moment.
    pub fn load_snapshot(&self) -> Result<Snapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let snapshot = Snapshot {
            history: read_history(&tx)?,
            settings: read_settings(&tx)?,
            foods: read_foods(&tx, None)?,
        };
        tx.commit()?;
        debug!(
            days = snapshot.history.len(),
            foods = snapshot.foods.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Cached totals for dates in `[from, to]`, ascending.
    pub fn list_daily_totals(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DailyTotal>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, protein, fat, carbs, calories, entry_count
             FROM daily_totals
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date",
        )?;
        let rows = stmt
            .query_map(params![date_key(from), date_key(to)], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    Pfc {
                        protein: row.get(1)?,
                        fat: row.get(2)?,
                        carbs: row.get(3)?,
                        calories: row.get(4)?,
                    },
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(date, total, count)| {
                Ok(DailyTotal {
                    date: parse_stored_date(&date)?,
                    total: total.rounded(),
                    entry_count: u32::try_from(count).unwrap_or(u32::MAX),
                })
            })
            .collect()
    }

    /// Replace every entry, saved food and setting in one transaction.
    pub fn replace_all(
        &self,
        history: &LogHistory,
        settings: &UserSettings,
        foods: &[SavedFood],
    ) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM food_entries;
             DELETE FROM daily_totals;
             DELETE FROM foods;
             DELETE FROM user_settings;",
        )?;
        for food in foods {
            insert_food_row(&tx, food)?;
        }
        for log in history.sorted() {
            for item in log.items() {
                insert_entry_row(&tx, log.date(), item)?;
            }
            refresh_daily_total(&tx, log.date())?;
        }
        write_setting(
            &tx,
            SETTING_TARGET,
            &serde_json::to_string(&settings.target_pfc)?,
        )?;
        if let Some(ref profile) = settings.profile {
            write_setting(&tx, SETTING_PROFILE, &serde_json::to_string(profile)?)?;
        }
        if !settings.favorite_food_ids.is_empty() {
            write_setting(
                &tx,
                SETTING_FAVORITES,
                &serde_json::to_string(&settings.favorite_food_ids)?,
            )?;
        }
        tx.commit()?;
        debug!(days = history.len(), foods = foods.len(), "replaced all data");
        Ok(())
    }

    // --- User Settings ---

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        write_setting(&self.conn, key, value)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        read_setting(&self.conn, key)
    }

    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM user_settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    pub fn get_target(&self) -> Result<Pfc> {
        match self.get_setting(SETTING_TARGET)? {
            Some(json) => serde_json::from_str(&json).context("Corrupt target setting"),
            None => Ok(DEFAULT_TARGET),
        }
    }

    pub fn set_target(&self, target: &Pfc) -> Result<()> {
        self.set_setting(SETTING_TARGET, &serde_json::to_string(target)?)
    }

    pub fn get_profile(&self) -> Result<Option<UserProfile>> {
        self.get_setting(SETTING_PROFILE)?
            .map(|json| serde_json::from_str(&json).context("Corrupt profile setting"))
            .transpose()
    }

    pub fn set_profile(&self, profile: &UserProfile) -> Result<()> {
        self.set_setting(SETTING_PROFILE, &serde_json::to_string(profile)?)
    }

    pub fn get_favorite_ids(&self) -> Result<Vec<String>> {
        Ok(read_settings(&self.conn)?.favorite_food_ids)
    }

    pub fn set_favorite_ids(&self, ids: &[String]) -> Result<()> {
        self.set_setting(SETTING_FAVORITES, &serde_json::to_string(ids)?)
    }

    pub fn load_settings(&self) -> Result<UserSettings> {
        read_settings(&self.conn)
    }

    // --- Saved foods ---

    /// Input is assumed validated.
    pub fn insert_food(&self, food: &NewSavedFood) -> Result<SavedFood> {
        let food = SavedFood {
            id: Uuid::new_v4().to_string(),
            name: food.name.clone(),
            nutrients: food.nutrients,
            store: food.store.clone(),
            barcode: food.barcode.clone(),
        };
        insert_food_row(&self.conn, &food)?;
        debug!(id = %food.id, name = %food.name, "saved food");
        Ok(food)
    }

    pub fn get_food(&self, id: &str) -> Result<SavedFood> {
        self.conn
            .query_row(
                &format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?1"),
                params![id],
                food_from_row,
            )
            .context("Saved food not found")
    }

    pub fn resolve_food_id(&self, id_or_prefix: &str) -> Result<String> {
        resolve_id(&self.conn, "foods", "Saved food", id_or_prefix)
    }

    /// Saved foods whose name or store contains `search`, by name.
    pub fn list_foods(&self, search: Option<&str>) -> Result<Vec<SavedFood>> {
        read_foods(&self.conn, search)
    }

    pub fn find_food_by_barcode(&self, barcode: &str) -> Result<Option<SavedFood>> {
        let food = self
            .conn
            .query_row(
                &format!("SELECT {FOOD_COLUMNS} FROM foods WHERE barcode = ?1"),
                params![barcode],
                food_from_row,
            )
            .optional()?;
        Ok(food)
    }

    /// Input is assumed validated. An empty `store` or `barcode` clears the field.
    pub fn update_food(&self, id: &str, update: &UpdateSavedFood) -> Result<SavedFood> {
        let mut food = self.get_food(id)?;
        if let Some(ref name) = update.name {
            food.name.clone_from(name);
        }
        if let Some(v) = update.protein {
            food.nutrients.protein = v;
        }
        if let Some(v) = update.fat {
            food.nutrients.fat = v;
        }
        if let Some(v) = update.carbs {
            food.nutrients.carbs = v;
        }
        if let Some(v) = update.calories {
            food.nutrients.calories = v;
        }
        if let Some(ref store) = update.store {
            food.store = Some(store.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(ref barcode) = update.barcode {
            food.barcode = Some(barcode.clone()).filter(|b| !b.trim().is_empty());
        }

        self.conn
            .execute(
                "UPDATE foods
                 SET name = ?1, protein = ?2, fat = ?3, carbs = ?4, calories = ?5,
                     store = ?6, barcode = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    food.name,
                    food.nutrients.protein,
                    food.nutrients.fat,
                    food.nutrients.carbs,
                    food.nutrients.calories,
                    food.store,
                    food.barcode,
                    Local::now().to_rfc3339(),
                    id,
                ],
            )
            .map_err(|e| barcode_conflict(e, &food))?;
        debug!(%id, "updated saved food");
        Ok(food)
    }

    /// Delete a saved food and drop it from the favorites.
    pub fn delete_food(&self, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute("DELETE FROM foods WHERE id = ?1", params![id])?;
        let mut favorites = read_settings(&tx)?.favorite_food_ids;
        let before = favorites.len();
        favorites.retain(|f| f != id);
        if favorites.len() != before {
            write_setting(&tx, SETTING_FAVORITES, &serde_json::to_string(&favorites)?)?;
        }
        tx.commit()?;
        Ok(rows > 0)
    }

    /// Distinct store labels used by entries or saved foods, sorted.
    pub fn list_stores(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT store FROM food_entries WHERE store IS NOT NULL AND store != ''
             UNION
             SELECT store FROM foods WHERE store IS NOT NULL AND store != ''
             ORDER BY 1 COLLATE NOCASE",
        )?;
        let stores = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(stores)
    }
}
