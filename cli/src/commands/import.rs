use std::path::Path;

use anyhow::{Context, Result};

use pfc_core::service::PfcService;

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}

pub(crate) fn cmd_import_csv(svc: &PfcService, path: &Path, dry_run: bool, json: bool) -> Result<()> {
    let data = read_input(path)?;
    let summary = svc.import_csv(&data, dry_run)?;

    if summary.rows_parsed == 0 {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": "No rows found in CSV file" })
            );
        } else {
            eprintln!("No rows found in CSV file.");
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if dry_run {
        println!("Dry run, no changes made.\n");
        println!("  Rows parsed:     {}", summary.rows_parsed);
        println!("  Entries to log:  {}", summary.entries_logged);
        println!("  Dates spanned:   {}", summary.dates_spanned);
    } else {
        println!("Import complete.\n");
        println!("  Rows parsed:     {}", summary.rows_parsed);
        println!("  Entries logged:  {}", summary.entries_logged);
        println!("  Dates spanned:   {}", summary.dates_spanned);
    }

    Ok(())
}

fn sources_line(sources: &[String]) -> String {
    if sources.is_empty() {
        "Sources: (none given)".to_string()
    } else {
        format!("Sources: {}", sources.join(", "))
    }
}

pub(crate) fn cmd_import_intake(svc: &PfcService, path: &Path, json: bool) -> Result<()> {
    let data = read_input(path)?;
    let summary = svc.import_intake_json(&data)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Imported {} entr(ies).", summary.imported);
    println!("{}\n", sources_line(&summary.sources));
    for date in &summary.dates {
        let count = summary.entries.iter().filter(|e| e.date == *date).count();
        println!("  {date}: {count}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_import_csv_file() {
        let svc = PfcService::new_in_memory().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Name,Protein,Fat,Carbs,Calories,Store").unwrap();
        writeln!(file, "2024-06-15,Natto,8.3,5,6.1,100,").unwrap();
        writeln!(file, "2024-06-16,Salad chicken,24,1.2,0.3,110,7-Eleven").unwrap();

        cmd_import_csv(&svc, file.path(), false, true).unwrap();
        assert_eq!(svc.get_daily_log("2024-06-15").unwrap().items().len(), 1);
        assert_eq!(svc.get_daily_log("2024-06-16").unwrap().items().len(), 1);
    }

    #[test]
    fn test_import_csv_dry_run_writes_nothing() {
        let svc = PfcService::new_in_memory().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Name,Protein,Fat,Carbs,Calories").unwrap();
        writeln!(file, "2024-06-15,Natto,8.3,5,6.1,100").unwrap();

        cmd_import_csv(&svc, file.path(), true, true).unwrap();
        assert!(svc.get_daily_log("2024-06-15").unwrap().is_empty());
    }

    #[test]
    fn test_import_intake_file() {
        let svc = PfcService::new_in_memory().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"entries": [{{"name": "Onigiri", "protein": 4.5, "calories": 180, "consumedAt": "2024-06-15T12:00:00+09:00"}}]}}"#
        )
        .unwrap();

        cmd_import_intake(&svc, file.path(), true).unwrap();
        let history = svc.get_log_history().unwrap();
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_sources_line() {
        assert_eq!(sources_line(&[]), "Sources: (none given)");
        assert_eq!(
            sources_line(&["shortcut".to_string(), "watch".to_string()]),
            "Sources: shortcut, watch"
        );
    }

    #[test]
    fn test_import_missing_file() {
        let svc = PfcService::new_in_memory().unwrap();
        let err = cmd_import_csv(&svc, Path::new("/nonexistent/x.csv"), false, true).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read file"));
    }
}
