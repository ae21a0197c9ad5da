use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::DEFAULT_TABLE_NAME;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub db_file: String,
    /// Table that receives all existing data when a single-table file is
    /// upgraded.
    pub default_table_name: String,
}

impl EngineConfig {
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    /// Reads a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.db_file.trim().is_empty() {
            return Err(Error::Config("db_file cannot be empty".to_string()));
        }
        if self.default_table_name.trim().is_empty() {
            return Err(Error::Config(
                "default_table_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            db_file: "cellar.db".to_string(),
            default_table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}
