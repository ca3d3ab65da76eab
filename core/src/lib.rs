pub mod backup;
pub mod csv_import;
pub mod db;
pub mod intake;
pub mod ledger;
pub mod models;
pub mod openfoodfacts;
pub mod profile;
pub mod rebalance;
pub mod service;
pub mod visualize;
