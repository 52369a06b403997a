use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// File name of the database inside the data root.
pub const DB_FILE_NAME: &str = "librecords.db";
/// File name of the diagnostic log inside the data root.
pub const LOG_FILE_NAME: &str = "librecords.log";

/// Where the application keeps its files. The working directory at launch is
/// the data root; there are no flags or environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_root: PathBuf,
}

impl Config {
    pub fn from_current_dir() -> Result<Self> {
        let data_root = env::current_dir().context("failed to read the working directory")?;
        Ok(Self::with_root(data_root))
    }

    pub fn with_root(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_root.join(DB_FILE_NAME)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_root.join(LOG_FILE_NAME)
    }
}
