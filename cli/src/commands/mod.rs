mod backup;
mod debt;
mod entry;
mod food;
mod helpers;
mod import;
mod log;
mod profile;
mod summary;
mod target;

pub(crate) use backup::{cmd_backup_export, cmd_backup_restore};
pub(crate) use debt::{cmd_chart, cmd_debt, cmd_week};
pub(crate) use entry::{cmd_delete, cmd_edit};
pub(crate) use food::{
    cmd_food_add, cmd_food_delete, cmd_food_edit, cmd_food_fav, cmd_food_list, cmd_food_log,
    cmd_food_stores,
};
pub(crate) use helpers::parse_serving;
pub(crate) use import::{cmd_import_csv, cmd_import_intake};
pub(crate) use log::{cmd_add, cmd_barcode};
pub(crate) use profile::{ProfileArgs, cmd_profile_set, cmd_profile_show};
pub(crate) use summary::{cmd_history, cmd_summary};
pub(crate) use target::{cmd_target_calc, cmd_target_set, cmd_target_show};
