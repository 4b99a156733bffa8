use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory
pub const DATA_DIR_ENV: &str = "BIRTHDAY_REMINDER_DATA_DIR";

const DATA_DIR_NAME: &str = "Birthday Reminder";
const BIRTHDAYS_FILE: &str = "birthdays.csv";
const CONFIG_FILE: &str = "config.yaml";
const NEXT_ID_FILE: &str = "next_id.txt";

/// CsvConnection owns the data directory and the file layout inside it
#[derive(Debug, Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Create a new CSV connection with a base directory
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();

        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .with_context(|| format!("Failed to create data directory {}", base_path.display()))?;
        }

        Ok(Self {
            base_directory: base_path,
        })
    }

    /// Create a new CSV connection in the default data directory
    pub fn new_default() -> Result<Self> {
        let data_dir = resolve_data_directory()?;
        info!("Using data directory: {}", data_dir.display());
        Self::new(data_dir)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn birthdays_file_path(&self) -> PathBuf {
        self.base_directory.join(BIRTHDAYS_FILE)
    }

    pub fn config_file_path(&self) -> PathBuf {
        self.base_directory.join(CONFIG_FILE)
    }

    /// Counter holding the next birthday id to hand out
    pub fn next_id_file_path(&self) -> PathBuf {
        self.base_directory.join(NEXT_ID_FILE)
    }
}

/// `$BIRTHDAY_REMINDER_DATA_DIR`, else the platform data directory
pub fn resolve_data_directory() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    dirs::data_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .ok_or_else(|| anyhow::anyhow!("Could not determine the data directory; set {}", DATA_DIR_ENV))
}
