use std::path::{Path, PathBuf};

use crate::error::{JotError, Result};
use crate::logging;

pub const HOME_ENV: &str = "JOTTER_HOME";
pub const LOG_ENV: &str = "JOTTER_LOG";
const DB_FILE: &str = "notes.db";
const LOG_DIR: &str = "logs";

/// Resolved runtime locations and settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub home: PathBuf,
    pub log_level: String,
}

impl Config {
    /// Resolve from CLI flags first, then the environment.
    pub fn resolve(home: Option<PathBuf>, log_level: Option<String>) -> Result<Self> {
        let home = match home.or_else(home_from_env) {
            Some(path) => path,
            None => default_home().ok_or(JotError::NoHomeDirectory)?,
        };
        let home = absolutize(&home)?;

        let log_level = log_level
            .or_else(|| env_nonempty(LOG_ENV))
            .unwrap_or_else(|| logging::default_log_level().to_string());

        Ok(Self { home, log_level })
    }

    pub fn db_path(&self) -> PathBuf {
        self.home.join(DB_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.home.join(LOG_DIR)
    }

    /// Create the home directory if it is missing.
    pub fn ensure_home(&self) -> Result<()> {
        std::fs::create_dir_all(&self.home)?;
        Ok(())
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn home_from_env() -> Option<PathBuf> {
    env_nonempty(HOME_ENV).map(PathBuf::from)
}

/// `$XDG_DATA_HOME/jotter`, else `$HOME/.local/share/jotter`.
fn default_home() -> Option<PathBuf> {
    if let Some(data) = env_nonempty("XDG_DATA_HOME") {
        return Some(PathBuf::from(data).join("jotter"));
    }
    env_nonempty("HOME").map(|home| {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("jotter")
    })
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
