//! Runtime configuration resolved from the environment.
//!
//! Recognized variables:
//! - `TOPICNOTE_DB_PATH`: SQLite file; defaults to `topicnote.sqlite3` in the
//!   system temp directory.
//! - `TOPICNOTE_LOG_LEVEL`: `trace|debug|info|warn|error`; defaults to
//!   [`default_log_level`].
//! - `TOPICNOTE_LOG_DIR`: absolute directory for rolling logs; logging stays
//!   off when unset.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "TOPICNOTE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "TOPICNOTE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "TOPICNOTE_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "topicnote.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves config through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }
}
