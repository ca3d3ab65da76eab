mod commands;
mod config;
mod openfoodfacts;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ProfileArgs, cmd_add, cmd_backup_export, cmd_backup_restore, cmd_barcode, cmd_chart,
    cmd_debt, cmd_delete, cmd_edit, cmd_food_add, cmd_food_delete, cmd_food_edit, cmd_food_fav,
    cmd_food_list, cmd_food_log, cmd_food_stores, cmd_history, cmd_import_csv, cmd_import_intake,
    cmd_profile_set, cmd_profile_show, cmd_summary, cmd_target_calc, cmd_target_set,
    cmd_target_show, cmd_week, parse_serving,
};
use crate::config::Config;
use crate::openfoodfacts::OpenFoodFactsClient;
use pfc_core::models::{UpdateFoodEntry, UpdateSavedFood};
use pfc_core::service::PfcService;
use pfc_core::visualize::{DEFAULT_CHART_DAYS, DEFAULT_MAX_BARS};

#[derive(Parser)]
#[command(
    name = "pfc",
    version,
    about = "Protein/fat/carbs tracker with nutrient debt carry-over",
    long_about = "Log what you eat against a daily protein/fat/carbs/calorie target.\n\
        Intake above target becomes debt that carries into the following days,\n\
        and the rest of the week's allowance is rebalanced around it."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log a food entry with explicit nutrients
    Add {
        /// Food name
        name: String,
        /// Protein in grams
        #[arg(short, long, default_value_t = 0.0)]
        protein: f64,
        /// Fat in grams
        #[arg(short, long, default_value_t = 0.0)]
        fat: f64,
        /// Carbohydrates in grams
        #[arg(short, long, default_value_t = 0.0)]
        carbs: f64,
        /// Energy in kcal
        #[arg(short = 'k', long, default_value_t = 0.0)]
        calories: f64,
        /// Store or brand
        #[arg(short, long)]
        store: Option<String>,
        /// Date to log for (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up a barcode and log it (saved foods first, then `OpenFoodFacts`)
    Barcode {
        /// Barcode number
        code: String,
        /// Serving size in grams (e.g. "150" or "150g")
        #[arg(default_value = "100g")]
        serving: String,
        /// Date to log for (YYYY-MM-DD, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Only show the product's nutrition per 100g, don't log it
        #[arg(long)]
        lookup_only: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a logged entry
    Edit {
        /// Entry ID (or a unique prefix of it)
        entry_id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New protein in grams
        #[arg(long)]
        protein: Option<f64>,
        /// New fat in grams
        #[arg(long)]
        fat: Option<f64>,
        /// New carbohydrates in grams
        #[arg(long)]
        carbs: Option<f64>,
        /// New energy in kcal
        #[arg(long)]
        calories: Option<f64>,
        /// New store or brand
        #[arg(long)]
        store: Option<String>,
        /// Move the entry to another date
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a logged entry
    Delete {
        /// Entry ID (or a unique prefix of it)
        entry_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a day's entries, totals, debt and bars
    Summary {
        /// Date (YYYY-MM-DD, today, yesterday; default: today)
        date: Option<String>,
        /// Maximum number of extra bars drawn per nutrient
        #[arg(long, default_value_t = DEFAULT_MAX_BARS)]
        max_bars: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show daily totals for recent days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the nutrient debt carried into a day
    Debt {
        /// Date (default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show this week's rebalanced daily allowance and 7-day average
    Week {
        /// Date (default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how intake, debt and overflow developed day by day
    Chart {
        /// Last day of the chart (default: today)
        date: Option<String>,
        /// Number of days to show
        #[arg(short, long, default_value_t = DEFAULT_CHART_DAYS)]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage saved foods, favorites and barcode mappings
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Manage the daily target
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
    /// Manage the body profile used for target suggestions
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Import entries from files
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
    /// Export or restore a full backup
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Save a food with nutrients for one serving
    Add {
        /// Food name
        name: String,
        /// Protein in grams
        #[arg(short, long, default_value_t = 0.0)]
        protein: f64,
        /// Fat in grams
        #[arg(short, long, default_value_t = 0.0)]
        fat: f64,
        /// Carbohydrates in grams
        #[arg(short, long, default_value_t = 0.0)]
        carbs: f64,
        /// Energy in kcal
        #[arg(short = 'k', long, default_value_t = 0.0)]
        calories: f64,
        /// Store or brand
        #[arg(short, long)]
        store: Option<String>,
        /// Barcode that logs this food when scanned
        #[arg(short, long)]
        barcode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List saved foods
    List {
        /// Filter by name or store
        #[arg(short, long)]
        search: Option<String>,
        /// Only show favorites
        #[arg(long)]
        favorites: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a saved food (empty --store or --barcode clears it)
    Edit {
        /// Food ID (or a unique prefix of it)
        food_id: String,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New protein in grams
        #[arg(long)]
        protein: Option<f64>,
        /// New fat in grams
        #[arg(long)]
        fat: Option<f64>,
        /// New carbohydrates in grams
        #[arg(long)]
        carbs: Option<f64>,
        /// New energy in kcal
        #[arg(long)]
        calories: Option<f64>,
        /// New store or brand
        #[arg(long)]
        store: Option<String>,
        /// New barcode mapping
        #[arg(long)]
        barcode: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved food (logged entries are kept)
    Delete {
        /// Food ID (or a unique prefix of it)
        food_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark a saved food as a favorite
    Fav {
        /// Food ID (or a unique prefix of it)
        food_id: String,
        /// Remove from favorites instead
        #[arg(long)]
        off: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List store names used by entries and saved foods
    Stores {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log servings of a saved food
    Log {
        /// Food ID (or a unique prefix of it)
        food_id: String,
        /// Number of servings
        #[arg(short, long, default_value_t = 1.0)]
        servings: f64,
        /// Date to log for (YYYY-MM-DD, today, yesterday; default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TargetCommands {
    /// Set the daily target (unset values keep their current value)
    Set {
        /// Protein in grams
        #[arg(short, long)]
        protein: Option<f64>,
        /// Fat in grams
        #[arg(short, long)]
        fat: Option<f64>,
        /// Carbohydrates in grams
        #[arg(short, long)]
        carbs: Option<f64>,
        /// Energy in kcal
        #[arg(short = 'k', long)]
        calories: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the daily target
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest a target from the body profile
    Calc {
        /// Save the suggestion as the daily target
        #[arg(long)]
        apply: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Create or update the body profile
    Set {
        /// male or female
        #[arg(long)]
        gender: Option<String>,
        /// Age in years
        #[arg(long)]
        age: Option<u32>,
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
        /// Target weight in kg
        #[arg(long)]
        target_weight: Option<f64>,
        /// Activity level: 1.2, 1.375, 1.55, 1.725 or 1.9
        #[arg(long)]
        activity: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the body profile with BMI and BMR
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ImportCommands {
    /// Import a CSV with Date,Name,Protein,Fat,Carbs,Calories[,Store] columns
    Csv {
        /// Path to the CSV file
        file: PathBuf,
        /// Show what would be imported without making changes
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a JSON intake payload ({"entries": [...]})
    Intake {
        /// Path to the JSON file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Write all entries and settings as JSON
    Export {
        /// Output file (default: stdout)
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace all entries and settings with a backup
    Restore {
        /// Backup file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    debug!(db = %config.db_path.display(), "opening database");
    let svc = PfcService::new(config.db_path_str()?)?;

    match cli.command {
        Commands::Add {
            name,
            protein,
            fat,
            carbs,
            calories,
            store,
            date,
            json,
        } => cmd_add(&svc, &name, protein, fat, carbs, calories, store, date, json),
        Commands::Barcode {
            code,
            serving,
            date,
            lookup_only,
            json,
        } => {
            let serving_g = parse_serving(&serving)?;
            let off = OpenFoodFactsClient::new()?;
            cmd_barcode(&svc, &off, &code, serving_g, date, lookup_only, json)
        }
        Commands::Edit {
            entry_id,
            name,
            protein,
            fat,
            carbs,
            calories,
            store,
            date,
            json,
        } => {
            let update = UpdateFoodEntry {
                name,
                protein,
                fat,
                carbs,
                calories,
                store,
                date: None,
            };
            cmd_edit(&svc, &entry_id, update, date, json)
        }
        Commands::Delete { entry_id, json } => cmd_delete(&svc, &entry_id, json),
        Commands::Summary {
            date,
            max_bars,
            json,
        } => cmd_summary(&svc, date, max_bars, json),
        Commands::History { days, json } => cmd_history(&svc, days, json),
        Commands::Debt { date, json } => cmd_debt(&svc, date, json),
        Commands::Week { date, json } => cmd_week(&svc, date, json),
        Commands::Chart { date, days, json } => cmd_chart(&svc, date, days, json),
        Commands::Food { command } => match command {
            FoodCommands::Add {
                name,
                protein,
                fat,
                carbs,
                calories,
                store,
                barcode,
                json,
            } => cmd_food_add(
                &svc, &name, protein, fat, carbs, calories, store, barcode, json,
            ),
            FoodCommands::List {
                search,
                favorites,
                json,
            } => cmd_food_list(&svc, search.as_deref(), favorites, json),
            FoodCommands::Edit {
                food_id,
                name,
                protein,
                fat,
                carbs,
                calories,
                store,
                barcode,
                json,
            } => {
                let update = UpdateSavedFood {
                    name,
                    protein,
                    fat,
                    carbs,
                    calories,
                    store,
                    barcode,
                };
                cmd_food_edit(&svc, &food_id, &update, json)
            }
            FoodCommands::Delete { food_id, json } => cmd_food_delete(&svc, &food_id, json),
            FoodCommands::Fav { food_id, off, json } => cmd_food_fav(&svc, &food_id, off, json),
            FoodCommands::Stores { json } => cmd_food_stores(&svc, json),
            FoodCommands::Log {
                food_id,
                servings,
                date,
                json,
            } => cmd_food_log(&svc, &food_id, servings, date, json),
        },
        Commands::Target { command } => match command {
            TargetCommands::Set {
                protein,
                fat,
                carbs,
                calories,
                json,
            } => cmd_target_set(&svc, protein, fat, carbs, calories, json),
            TargetCommands::Show { json } => cmd_target_show(&svc, json),
            TargetCommands::Calc { apply, json } => cmd_target_calc(&svc, apply, json),
        },
        Commands::Profile { command } => match command {
            ProfileCommands::Set {
                gender,
                age,
                height,
                weight,
                target_weight,
                activity,
                json,
            } => {
                let args = ProfileArgs {
                    gender,
                    age,
                    height,
                    weight,
                    target_weight,
                    activity,
                };
                cmd_profile_set(&svc, args, json)
            }
            ProfileCommands::Show { json } => cmd_profile_show(&svc, json),
        },
        Commands::Import { command } => match command {
            ImportCommands::Csv {
                file,
                dry_run,
                json,
            } => cmd_import_csv(&svc, &file, dry_run, json),
            ImportCommands::Intake { file, json } => cmd_import_intake(&svc, &file, json),
        },
        Commands::Backup { command } => match command {
            BackupCommands::Export { file, json } => cmd_backup_export(&svc, file, json),
            BackupCommands::Restore { file, json } => cmd_backup_restore(&svc, &file, json),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_add() {
        let cli = Cli::try_parse_from([
            "pfc", "add", "Natto", "-p", "8.3", "-f", "5", "-c", "6.1", "-k", "100", "--json",
        ])
        .unwrap();
        let Commands::Add {
            name,
            protein,
            calories,
            json,
            ..
        } = cli.command
        else {
            panic!("expected add");
        };
        assert_eq!(name, "Natto");
        assert!((protein - 8.3).abs() < f64::EPSILON);
        assert!((calories - 100.0).abs() < f64::EPSILON);
        assert!(json);
    }

    #[test]
    fn test_parse_chart_defaults() {
        let cli = Cli::try_parse_from(["pfc", "-v", "chart"]).unwrap();
        assert!(cli.verbose);
        let Commands::Chart { date, days, .. } = cli.command else {
            panic!("expected chart");
        };
        assert!(date.is_none());
        assert_eq!(days, DEFAULT_CHART_DAYS);
    }
}
