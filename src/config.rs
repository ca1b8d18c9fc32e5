//! Configuration loading and management
//!
//! Handles parsing of `.acuerdos.toml` configuration files found in the data root.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the configuration file inside the data root
pub const CONFIG_FILE: &str = ".acuerdos.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Table storage and caching
    #[serde(default)]
    pub data: DataConfig,

    /// Sheet names for each dataset
    #[serde(default)]
    pub tables: TablesConfig,

    /// Fuzzy search tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Submitter identity
    #[serde(default)]
    pub person: PersonConfig,
}

/// Table directory and cache staleness
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding `<table>.jsonl` files, relative to the data root
    #[serde(default = "default_data_dir")]
    pub dir: String,

    /// How long fetched tables stay fresh in the cache (e.g., "5m", "0s")
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_cache_ttl() -> String {
    "5m".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            cache_ttl: default_cache_ttl(),
        }
    }
}

/// Sheet names used for each dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TablesConfig {
    #[serde(default = "default_links_table")]
    pub links: String,

    /// Weekly chore catalog
    #[serde(default = "default_tasks_table")]
    pub tasks: String,

    /// Append-only log of chore submissions
    #[serde(default = "default_ledger_table")]
    pub ledger: String,

    #[serde(default = "default_internal_agreements_table")]
    pub internal_agreements: String,

    #[serde(default = "default_external_agreements_table")]
    pub external_agreements: String,
}

fn default_links_table() -> String {
    "enlaces".to_string()
}

fn default_tasks_table() -> String {
    "tareas_semaneros".to_string()
}

fn default_ledger_table() -> String {
    "registro_tareas".to_string()
}

fn default_internal_agreements_table() -> String {
    "acuerdos_internos".to_string()
}

fn default_external_agreements_table() -> String {
    // Sheet name as it exists in the community spreadsheet.
    "actuerdos_externos".to_string()
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            links: default_links_table(),
            tasks: default_tasks_table(),
            ledger: default_ledger_table(),
            internal_agreements: default_internal_agreements_table(),
            external_agreements: default_external_agreements_table(),
        }
    }
}

impl TablesConfig {
    /// All table names paired with their config key.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("tables.links", self.links.as_str()),
            ("tables.tasks", self.tasks.as_str()),
            ("tables.ledger", self.ledger.as_str()),
            ("tables.internal_agreements", self.internal_agreements.as_str()),
            ("tables.external_agreements", self.external_agreements.as_str()),
        ]
    }
}

/// Fuzzy search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Minimum similarity ratio for a typo-tolerant match
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    crate::search::DEFAULT_THRESHOLD
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

/// Person-related configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonConfig {
    /// Fallback person when none is given on the command line or environment
    #[serde(default)]
    pub default: String,
}

impl Config {
    /// Load configuration from a `.acuerdos.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the data root, falling back to defaults.
    ///
    /// A file that exists but does not load is ignored; the second value
    /// describes why, so commands can report it next to their results.
    pub fn load_from_root(root: &Path) -> (Self, Option<String>) {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return (Self::default(), None);
        }
        match Self::load(&config_path) {
            Ok(config) => (config, None),
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                (
                    Self::default(),
                    Some(format!("ignoring {CONFIG_FILE} ({err}); using defaults")),
                )
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Directory holding the table files for a given data root
    pub fn data_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.data.dir)
    }

    /// Parsed cache staleness window
    pub fn cache_ttl(&self) -> Result<Duration> {
        parse_duration(&self.data.cache_ttl)
    }

    fn validate(&self) -> Result<()> {
        if self.data.dir.trim().is_empty() {
            return Err(Error::InvalidConfig("data.dir cannot be empty".to_string()));
        }
        parse_duration(&self.data.cache_ttl).map_err(|err| {
            Error::InvalidConfig(format!("data.cache_ttl: {err}"))
        })?;
        self.tables.validate()?;
        self.search.validate()?;
        Ok(())
    }
}

impl TablesConfig {
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for (field, name) in self.entries() {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(Error::InvalidConfig(format!("{field} cannot be empty")));
            }
            if trimmed.contains(['/', '\\']) {
                return Err(Error::InvalidConfig(format!(
                    "{field} must be a plain sheet name, got '{trimmed}'"
                )));
            }
            if !seen.insert(trimmed) {
                return Err(Error::InvalidConfig(format!(
                    "{field} reuses sheet '{trimmed}'"
                )));
            }
        }
        Ok(())
    }
}

impl SearchConfig {
    fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "search.threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Parse a short duration string like "30s", "5m", "2h" or "1d".
///
/// A bare number counts minutes.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::InvalidArgument("duration cannot be empty".to_string()));
    }

    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (count, unit) = s.split_at(split);
    let count: i64 = count
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("invalid duration number '{count}'")))?;

    let duration = match unit.to_lowercase().as_str() {
        "s" | "sec" | "second" | "seconds" => Duration::try_seconds(count),
        "" | "m" | "min" | "minute" | "minutes" => Duration::try_minutes(count),
        "h" | "hr" | "hour" | "hours" => Duration::try_hours(count),
        "d" | "day" | "days" => Duration::try_days(count),
        other => {
            return Err(Error::InvalidArgument(format!(
                "invalid duration unit '{other}', expected s, m, h or d"
            )));
        }
    };

    duration.ok_or_else(|| Error::InvalidArgument(format!("duration '{s}' is out of range")))
}
