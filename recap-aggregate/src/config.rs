//! Pipeline configuration.

use std::path::PathBuf;

use recap_core::config::{env_or, parse_value};
use recap_core::{ConfigError, Year};

/// Configuration for one aggregation run.
///
/// # Environment Variables
///
/// - `RECAP_YEAR` - Year to aggregate (default: 2025)
/// - `RECAP_DB_PATH` - SQLite database file (default: wrapped.db)
/// - `RECAP_PROGRESS_INTERVAL` - Log progress every N messages (default: 500)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub year: Year,
    pub db_path: PathBuf,
    pub progress_interval: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: 2025,
            db_path: PathBuf::from("wrapped.db"),
            progress_interval: 500,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let db_path = match std::env::var("RECAP_DB_PATH") {
            Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
            _ => defaults.db_path,
        };

        let config = Self {
            year: env_or("RECAP_YEAR", defaults.year)?,
            db_path,
            progress_interval: env_or("RECAP_PROGRESS_INTERVAL", defaults.progress_interval)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_year(mut self, year: Year) -> Self {
        self.year = year;
        self
    }

    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    pub fn with_progress_interval(mut self, every: usize) -> Self {
        self.progress_interval = every;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.progress_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "RECAP_PROGRESS_INTERVAL".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Parse a year given on the command line.
    pub fn parse_year(raw: &str) -> Result<Year, ConfigError> {
        parse_value("year", raw)
    }
}
