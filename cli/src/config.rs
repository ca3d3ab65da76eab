use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Overrides the per-user data directory.
pub const DATA_DIR_ENV: &str = "PFC_DATA_DIR";

pub struct Config {
    pub db_path: PathBuf,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => ProjectDirs::from("", "", "pfc")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        Self::in_dir(&data_dir)
    }

    /// Use `data_dir` for all state, creating it if needed.
    pub fn in_dir(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config {
            db_path: data_dir.join("pfc.db"),
            data_dir: data_dir.to_path_buf(),
        })
    }

    pub fn db_path_str(&self) -> Result<&str> {
        self.db_path
            .to_str()
            .with_context(|| format!("Database path is not UTF-8: {}", self.db_path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_dir_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        let config = Config::in_dir(&nested).unwrap();
        assert!(nested.is_dir());
        assert_eq!(config.db_path, nested.join("pfc.db"));
        assert_eq!(config.data_dir, nested);
        assert!(config.db_path_str().unwrap().ends_with("pfc.db"));
    }
}
