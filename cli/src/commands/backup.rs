use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use pfc_core::backup::BackupPayload;
use pfc_core::service::PfcService;

/// Write a backup to `output`, or to stdout when none is given.
pub(crate) fn cmd_backup_export(
    svc: &PfcService,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let payload = svc.export_backup()?;
    let body = serde_json::to_string_pretty(&payload)?;

    let Some(path) = output else {
        println!("{body}");
        return Ok(());
    };

    std::fs::write(&path, body)
        .with_context(|| format!("Failed to write backup: {}", path.display()))?;
    let entries: usize = payload.logs.values().map(|l| l.items().len()).sum();
    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "days": payload.logs.len(),
                "entries": entries,
                "foods": payload.foods.len(),
            })
        );
    } else {
        println!(
            "Backed up {} day(s), {entries} entr(ies), {} saved food(s) to {}",
            payload.logs.len(),
            payload.foods.len(),
            path.display()
        );
    }
    Ok(())
}

pub(crate) fn cmd_backup_restore(svc: &PfcService, path: &Path, json: bool) -> Result<()> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read backup: {}", path.display()))?;
    let payload = BackupPayload::from_json(&data)?;
    let summary = svc.restore_backup(&payload)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Restored {} day(s), {} entr(ies), {} saved food(s). Previous data was replaced.",
            summary.days_restored, summary.entries_restored, summary.foods_restored
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pfc_core::models::{NewFoodEntry, NewSavedFood, Pfc};

    fn entry(name: &str, protein: f64) -> NewFoodEntry {
        NewFoodEntry {
            name: name.to_string(),
            nutrients: Pfc::new(protein, 5.0, 20.0, 200.0),
            store: None,
            timestamp: None,
        }
    }

    #[test]
    fn test_export_restore_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup.json");

        let src = PfcService::new_in_memory().unwrap();
        src.add_entry("2024-06-15", &entry("Natto", 8.0)).unwrap();
        src.add_entry("2024-06-16", &entry("Tofu", 7.0)).unwrap();
        src.set_target(&Pfc::new(120.0, 50.0, 200.0, 1900.0)).unwrap();
        cmd_backup_export(&src, Some(path.clone()), true).unwrap();

        let dst = PfcService::new_in_memory().unwrap();
        dst.add_entry("2024-01-01", &entry("Old", 1.0)).unwrap();
        cmd_backup_restore(&dst, &path, true).unwrap();

        let history = dst.get_log_history().unwrap();
        assert_eq!(history.len(), 2);
        assert!(dst.get_daily_log("2024-01-01").unwrap().is_empty());
        assert_eq!(dst.get_target().unwrap(), Pfc::new(120.0, 50.0, 200.0, 1900.0));
    }

    #[test]
    fn test_restored_foods_survive_next_export() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup.json");
        std::fs::write(
            &path,
            r#"{"version": 1, "createdAt": 0, "logs": {},
                "settings": {"targetPFC": {"protein": 100, "fat": 60, "carbs": 250, "calories": 2000},
                             "favoriteFoodIds": ["f1"]},
                "foods": [{"id": "f1", "name": "Onigiri", "protein": 4.5, "fat": 1.2,
                           "carbs": 39, "calories": 180, "timestamp": 1}]}"#,
        )
        .unwrap();

        let svc = PfcService::new_in_memory().unwrap();
        svc.add_food(&NewSavedFood {
            name: "Stale".to_string(),
            nutrients: Pfc::ZERO,
            store: None,
            barcode: None,
        })
        .unwrap();
        cmd_backup_restore(&svc, &path, true).unwrap();

        let exported = svc.export_backup().unwrap();
        assert_eq!(exported.foods.len(), 1);
        assert_eq!(exported.foods[0].name, "Onigiri");
        assert_eq!(exported.settings.favorite_food_ids, ["f1"]);
        assert_eq!(svc.list_favorites().unwrap()[0].id, "f1");
    }

    #[test]
    fn test_restore_rejects_bad_version() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup.json");
        std::fs::write(&path, r#"{"version": 2, "createdAt": 0, "logs": {}}"#).unwrap();

        let svc = PfcService::new_in_memory().unwrap();
        svc.add_entry("2024-06-15", &entry("Natto", 8.0)).unwrap();
        assert!(cmd_backup_restore(&svc, &path, true).is_err());
        assert_eq!(svc.get_daily_log("2024-06-15").unwrap().items().len(), 1);
    }
}
