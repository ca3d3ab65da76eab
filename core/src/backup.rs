use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{
    DailyLog, LogHistory, SavedFood, UserSettings, validate_barcode, validate_entry_name,
    validate_nutrients,
};

pub const BACKUP_VERSION: u32 = 1;

/// Full snapshot of the tracker's data: logs, settings and the saved-food dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPayload {
    pub version: u32,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub logs: BTreeMap<NaiveDate, DailyLog>,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default)]
    pub foods: Vec<SavedFood>,
}

/// Counts reported after a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub days_restored: usize,
    pub entries_restored: usize,
    pub foods_restored: usize,
}

impl BackupPayload {
    #[must_use]
    pub fn new(
        history: &LogHistory,
        settings: UserSettings,
        foods: Vec<SavedFood>,
        created_at: i64,
    ) -> Self {
        Self {
            version: BACKUP_VERSION,
            created_at,
            logs: history.iter().map(|l| (l.date(), l.clone())).collect(),
            settings,
            foods,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let payload: BackupPayload =
            serde_json::from_str(json).context("Failed to parse backup file")?;
        payload.validate()?;
        Ok(payload)
    }

    /// Reject unknown versions, logs filed under the wrong date key and
    /// saved foods that could not be stored.
    pub fn validate(&self) -> Result<()> {
        if self.version != BACKUP_VERSION {
            bail!(
                "Unsupported backup version {} (expected {BACKUP_VERSION})",
                self.version
            );
        }
        for (date, log) in &self.logs {
            if *date != log.date() {
                bail!("Log keyed {date} carries date {}", log.date());
            }
            for item in log.items() {
                validate_nutrients(&item.nutrients)
                    .with_context(|| format!("Invalid entry '{}' on {date}", item.name))?;
            }
        }
        validate_nutrients(&self.settings.target_pfc).context("Invalid target in backup")?;

        let mut ids = HashSet::new();
        let mut barcodes = HashSet::new();
        for food in &self.foods {
            validate_entry_name(&food.name)
                .and_then(|_| validate_nutrients(&food.nutrients))
                .with_context(|| format!("Invalid saved food '{}'", food.id))?;
            if !ids.insert(food.id.as_str()) {
                bail!("Duplicate saved food id '{}'", food.id);
            }
            if let Some(code) = food.barcode.as_deref() {
                if validate_barcode(code)?.is_none() || !barcodes.insert(code) {
                    bail!("Saved food '{}' has a blank or duplicate barcode", food.id);
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn history(&self) -> LogHistory {
        self.logs
            .values()
            .filter(|l| !l.is_empty())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn summary(&self) -> RestoreSummary {
        let non_empty = self.logs.values().filter(|l| !l.is_empty());
        RestoreSummary {
            days_restored: non_empty.clone().count(),
            entries_restored: non_empty.map(|l| l.items().len()).sum(),
            foods_restored: self.foods.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DEFAULT_TARGET, FoodEntry, Pfc};
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_history() -> LogHistory {
        [DailyLog::with_items(
            date("2024-04-01"),
            vec![FoodEntry {
                id: "e1".to_string(),
                name: "Natto".to_string(),
                nutrients: Pfc::new(8.3, 5.0, 6.0, 100.0),
                store: None,
                timestamp: 1_711_929_600_000,
            }],
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_payload_shape() {
        let payload =
            BackupPayload::new(&sample_history(), UserSettings::default(), Vec::new(), 42);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["createdAt"], 42);
        assert_eq!(value["logs"]["2024-04-01"]["items"][0]["name"], "Natto");
        assert_eq!(value["settings"]["targetPFC"]["protein"], 100.0);
        assert!(value["foods"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_from_json_recomputes_totals() {
        let json = r#"{
            "version": 1,
            "createdAt": 1,
            "logs": {
                "2024-04-01": {
                    "date": "2024-04-01",
                    "items": [
                        {"id": "a", "name": "Egg", "protein": 6, "fat": 5, "carbs": 0.5, "calories": 75, "timestamp": 1},
                        {"id": "b", "name": "Toast", "protein": 4, "fat": 1, "carbs": 20, "calories": 110, "timestamp": 2}
                    ],
                    "total": {"protein": 0, "fat": 0, "carbs": 0, "calories": 0}
                }
            },
            "settings": {"targetPFC": {"protein": 120, "fat": 50, "carbs": 200, "calories": 1800}},
            "foods": []
        }"#;
        let payload = BackupPayload::from_json(json).unwrap();
        let history = payload.history();
        assert_eq!(
            history.total_for(date("2024-04-01")),
            Pfc::new(10.0, 6.0, 20.5, 185.0)
        );
        assert_eq!(payload.settings.target_pfc.protein, 120.0);
        assert_eq!(
            payload.summary(),
            RestoreSummary {
                days_restored: 1,
                entries_restored: 2,
                foods_restored: 0,
            }
        );
    }

    #[test]
    fn test_missing_settings_use_default() {
        let json = r#"{"version": 1, "createdAt": 1, "logs": {}}"#;
        let payload = BackupPayload::from_json(json).unwrap();
        assert_eq!(payload.settings.target_pfc, DEFAULT_TARGET);
        assert!(payload.history().is_empty());
    }

    #[test]
    fn test_rejects_wrong_version() {
        let json = r#"{"version": 2, "createdAt": 1, "logs": {}}"#;
        let err = BackupPayload::from_json(json).unwrap_err();
        assert!(err.to_string().contains("Unsupported backup version"));
    }

    #[test]
    fn test_rejects_mismatched_date_key() {
        let json = r#"{"version": 1, "createdAt": 1, "logs": {
            "2024-04-02": {"date": "2024-04-01", "items": []}
        }}"#;
        assert!(BackupPayload::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_negative_nutrients() {
        let json = r#"{"version": 1, "createdAt": 1, "logs": {
            "2024-04-01": {"date": "2024-04-01", "items": [
                {"id": "a", "name": "Bad", "protein": -1, "fat": 0, "carbs": 0, "calories": 0, "timestamp": 1}
            ]}
        }}"#;
        assert!(BackupPayload::from_json(json).is_err());
    }

    fn food_json(id: &str, barcode: Option<&str>) -> serde_json::Value {
        json!({
            "id": id,
            "name": "Onigiri",
            "protein": 4.5,
            "fat": 1.2,
            "carbs": 39,
            "calories": 180,
            "store": "Lawson",
            "barcode": barcode,
            "timestamp": 1,
        })
    }

    fn payload_with_foods(foods: Vec<serde_json::Value>) -> Result<BackupPayload> {
        let json = json!({"version": 1, "createdAt": 1, "logs": {}, "foods": foods});
        BackupPayload::from_json(&json.to_string())
    }

    #[test]
    fn test_foods_are_parsed_and_written() {
        let payload = payload_with_foods(vec![
            food_json("f1", Some("4901234567894")),
            food_json("f2", None),
        ])
        .unwrap();
        assert_eq!(payload.foods.len(), 2);
        assert_eq!(payload.foods[0].nutrients.carbs, 39.0);
        assert_eq!(payload.foods[0].barcode.as_deref(), Some("4901234567894"));
        assert_eq!(payload.summary().foods_restored, 2);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["foods"][0]["name"], "Onigiri");
        assert_eq!(value["foods"][0]["protein"], 4.5);
        assert!(value["foods"][1].get("barcode").is_none());
    }

    #[test]
    fn test_rejects_invalid_foods() {
        assert!(payload_with_foods(vec![food_json("f1", None), food_json("f1", None)]).is_err());
        assert!(
            payload_with_foods(vec![
                food_json("f1", Some("490")),
                food_json("f2", Some("490"))
            ])
            .is_err()
        );
        assert!(payload_with_foods(vec![food_json("f1", Some("49-0"))]).is_err());

        let mut negative = food_json("f1", None);
        negative["fat"] = json!(-2);
        assert!(payload_with_foods(vec![negative]).is_err());
    }
}
