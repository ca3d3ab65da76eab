use std::collections::HashMap;
use std::collections::hash_map;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

/// One of the four tracked nutrients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Protein,
    Fat,
    Carbs,
    Calories,
}

impl Nutrient {
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbs,
        Nutrient::Calories,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Nutrient::Protein => "Protein",
            Nutrient::Fat => "Fat",
            Nutrient::Carbs => "Carbs",
            Nutrient::Calories => "Calories",
        }
    }

    #[must_use]
    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            _ => "g",
        }
    }
}

/// Protein / fat / carbs (grams) and calories (kcal).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pfc {
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub calories: f64,
}

pub const DEFAULT_TARGET: Pfc = Pfc {
    protein: 100.0,
    fat: 60.0,
    carbs: 250.0,
    calories: 2000.0,
};

impl Pfc {
    pub const ZERO: Pfc = Pfc {
        protein: 0.0,
        fat: 0.0,
        carbs: 0.0,
        calories: 0.0,
    };

    #[must_use]
    pub fn new(protein: f64, fat: f64, carbs: f64, calories: f64) -> Self {
        Self {
            protein,
            fat,
            carbs,
            calories,
        }
    }

    #[must_use]
    pub fn get(&self, nutrient: Nutrient) -> f64 {
        match nutrient {
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Carbs => self.carbs,
            Nutrient::Calories => self.calories,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        match nutrient {
            Nutrient::Protein => self.protein = value,
            Nutrient::Fat => self.fat = value,
            Nutrient::Carbs => self.carbs = value,
            Nutrient::Calories => self.calories = value,
        }
    }

    /// Apply `f` to every nutrient.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.protein), f(self.fat), f(self.carbs), f(self.calories))
    }

    /// Combine two values nutrient by nutrient.
    #[must_use]
    pub fn zip_with(&self, other: &Pfc, f: impl Fn(f64, f64) -> f64) -> Self {
        Self::new(
            f(self.protein, other.protein),
            f(self.fat, other.fat),
            f(self.carbs, other.carbs),
            f(self.calories, other.calories),
        )
    }

    #[must_use]
    pub fn plus(&self, other: &Pfc) -> Self {
        self.zip_with(other, |a, b| a + b)
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        self.map(|v| v * factor)
    }

    #[must_use]
    pub fn rounded(&self) -> Self {
        self.map(round2)
    }

    /// Target with every non-positive or non-finite field replaced by 1.
    #[must_use]
    pub fn safe_target(&self) -> Self {
        self.map(safe_target)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        Nutrient::ALL.iter().all(|&n| self.get(n) == 0.0)
    }

    /// Elementwise sum of an iterator of values.
    pub fn sum<'a>(values: impl IntoIterator<Item = &'a Pfc>) -> Pfc {
        values.into_iter().fold(Pfc::ZERO, |acc, v| acc.plus(v))
    }
}

#[must_use]
pub fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A target of zero, negative, or NaN is treated as 1 so per-target ratios stay defined.
#[must_use]
pub fn safe_target(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEntry {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Pfc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// A stored entry together with the date it is filed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub entry: FoodEntry,
}

/// Cached per-day total as kept by storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTotal {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub total: Pfc,
    pub entry_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoodEntry {
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Pfc,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFoodEntry {
    pub name: Option<String>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub calories: Option<f64>,
    pub store: Option<String>,
    pub date: Option<NaiveDate>,
}

impl UpdateFoodEntry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.protein.is_none()
            && self.fat.is_none()
            && self.carbs.is_none()
            && self.calories.is_none()
            && self.store.is_none()
            && self.date.is_none()
    }
}

/// One calendar day of entries. `total` always equals the sum of `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DailyLogRecord")]
pub struct DailyLog {
    date: NaiveDate,
    items: Vec<FoodEntry>,
    #[serde(serialize_with = "serialize_rounded")]
    total: Pfc,
}

fn serialize_rounded<S: Serializer>(pfc: &Pfc, serializer: S) -> Result<S::Ok, S::Error> {
    pfc.rounded().serialize(serializer)
}

/// Wire shape of a `DailyLog`; the stored total is ignored and recomputed.
#[derive(Deserialize)]
struct DailyLogRecord {
    date: NaiveDate,
    #[serde(default)]
    items: Vec<FoodEntry>,
}

impl From<DailyLogRecord> for DailyLog {
    fn from(record: DailyLogRecord) -> Self {
        DailyLog::with_items(record.date, record.items)
    }
}

impl DailyLog {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            items: Vec::new(),
            total: Pfc::ZERO,
        }
    }

    #[must_use]
    pub fn with_items(date: NaiveDate, items: Vec<FoodEntry>) -> Self {
        let total = Pfc::sum(items.iter().map(|i| &i.nutrients));
        Self { date, items, total }
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn items(&self) -> &[FoodEntry] {
        &self.items
    }

    #[must_use]
    pub fn total(&self) -> Pfc {
        self.total
    }

    pub fn push(&mut self, entry: FoodEntry) {
        self.items.push(entry);
        self.recompute_total();
    }

    /// Replace the entry with the same id. Returns false when no such entry exists.
    pub fn replace(&mut self, entry: FoodEntry) -> bool {
        let Some(slot) = self.items.iter_mut().find(|i| i.id == entry.id) else {
            return false;
        };
        *slot = entry;
        self.recompute_total();
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<FoodEntry> {
        let idx = self.items.iter().position(|i| i.id == id)?;
        let removed = self.items.remove(idx);
        self.recompute_total();
        Some(removed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn recompute_total(&mut self) {
        self.total = Pfc::sum(self.items.iter().map(|i| &i.nutrients));
    }
}

/// Snapshot of every daily log keyed by date. Storage order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogHistory {
    logs: HashMap<NaiveDate, DailyLog>,
}

impl LogHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a log, replacing any previous log for the same date.
    pub fn insert(&mut self, log: DailyLog) -> Option<DailyLog> {
        self.logs.insert(log.date(), log)
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&DailyLog> {
        self.logs.get(&date)
    }

    /// The day's total, or zero when nothing was logged.
    #[must_use]
    pub fn total_for(&self, date: NaiveDate) -> Pfc {
        self.logs.get(&date).map_or(Pfc::ZERO, DailyLog::total)
    }

    #[must_use]
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.logs.keys().min().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn iter(&self) -> hash_map::Values<'_, NaiveDate, DailyLog> {
        self.logs.values()
    }

    /// Logs in ascending date order.
    #[must_use]
    pub fn sorted(&self) -> Vec<&DailyLog> {
        let mut logs: Vec<&DailyLog> = self.logs.values().collect();
        logs.sort_by_key(|l| l.date());
        logs
    }
}

impl FromIterator<DailyLog> for LogHistory {
    fn from_iter<I: IntoIterator<Item = DailyLog>>(iter: I) -> Self {
        let mut history = LogHistory::new();
        for log in iter {
            history.insert(log);
        }
        history
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyAllowance {
    #[serde(flatten)]
    pub allowance: Pfc,
    pub remaining_days: u32,
    pub week_start: NaiveDate,
    pub consumed: Pfc,
}

impl WeeklyAllowance {
    /// True when any nutrient is squeezed below target or still carries debt.
    #[must_use]
    pub fn is_adjusted(&self, target: &Pfc, debt: &Pfc) -> bool {
        Nutrient::ALL
            .iter()
            .any(|&n| self.allowance.get(n) < target.get(n) || debt.get(n) > 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeeklyAverage {
    #[serde(flatten)]
    pub average: Pfc,
    pub days_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub gender: Gender,
    pub age: u32,
    /// Centimetres.
    pub height: f64,
    /// Kilograms.
    pub weight: f64,
    pub target_weight: f64,
    pub activity_level: f64,
}

pub const ACTIVITY_LEVELS: &[f64] = &[1.2, 1.375, 1.55, 1.725, 1.9];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(rename = "targetPFC")]
    pub target_pfc: Pfc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<UserProfile>,
    /// Saved foods offered for quick add, in display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub favorite_food_ids: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            target_pfc: DEFAULT_TARGET,
            profile: None,
            favorite_food_ids: Vec::new(),
        }
    }
}

/// A food in the personal dictionary. Nutrients are for one usual serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFood {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Pfc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Scanning this barcode logs the food instead of querying a lookup provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl SavedFood {
    /// An entry for `servings` servings of this food.
    #[must_use]
    pub fn to_entry(&self, servings: f64) -> NewFoodEntry {
        NewFoodEntry {
            name: self.name.clone(),
            nutrients: self.nutrients.scale(servings).map(round1),
            store: self.store.clone(),
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSavedFood {
    pub name: String,
    #[serde(flatten)]
    pub nutrients: Pfc,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

/// Partial update of a saved food. An empty `store` or `barcode` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSavedFood {
    pub name: Option<String>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub carbs: Option<f64>,
    pub calories: Option<f64>,
    pub store: Option<String>,
    pub barcode: Option<String>,
}

impl UpdateSavedFood {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.protein.is_none()
            && self.fat.is_none()
            && self.carbs.is_none()
            && self.calories.is_none()
            && self.store.is_none()
            && self.barcode.is_none()
    }
}

/// Nutrition per 100 g as reported by a lookup or estimation source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodEstimate {
    pub name: String,
    pub brand: Option<String>,
    pub per_100g: Pfc,
    pub source: String,
}

impl FoodEstimate {
    /// Scale to a serving in grams.
    #[must_use]
    pub fn to_entry(&self, serving_g: f64) -> NewFoodEntry {
        NewFoodEntry {
            name: self.name.clone(),
            nutrients: self.per_100g.scale(serving_g / 100.0).map(round1),
            store: self.brand.clone(),
            timestamp: None,
        }
    }
}

pub fn validate_nutrients(pfc: &Pfc) -> Result<()> {
    for n in Nutrient::ALL {
        let v = pfc.get(n);
        if !v.is_finite() {
            bail!("{} must be a finite number", n.label());
        }
        if v < 0.0 {
            bail!("{} must not be negative (got {v})", n.label());
        }
    }
    Ok(())
}

pub fn validate_entry_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Food name must not be empty");
    }
    Ok(trimmed.to_string())
}

/// Trimmed barcode, or `None` when blank. Barcodes are digits only.
pub fn validate_barcode(code: &str) -> Result<Option<String>> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }
    if !code.chars().all(|c| c.is_ascii_digit()) {
        bail!("Invalid barcode '{code}': expected digits only");
    }
    Ok(Some(code.to_string()))
}

pub fn validate_profile(profile: &UserProfile) -> Result<()> {
    if !ACTIVITY_LEVELS
        .iter()
        .any(|l| (l - profile.activity_level).abs() < 1e-9)
    {
        bail!(
            "Invalid activity level {}. Must be one of: 1.2, 1.375, 1.55, 1.725, 1.9",
            profile.activity_level
        );
    }
    for (label, v) in [
        ("Height", profile.height),
        ("Weight", profile.weight),
        ("Target weight", profile.target_weight),
    ] {
        if !v.is_finite() || v < 0.0 {
            bail!("{label} must be a non-negative number");
        }
    }
    Ok(())
}
