//! Configuration system for vellum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{VellumError, VellumResult};

/// Configuration for the relation history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Path to the history database.
    pub database_path: PathBuf,
    /// Open an in-memory database instead of `database_path`.
    pub in_memory: bool,
    /// Let the database assign canonical version numbers (via trigger)
    /// instead of trusting the version supplied by the writer.
    pub store_assigned_versions: bool,
    /// Wrap each snapshot and its children in a single transaction.
    pub atomic_snapshots: bool,
    /// How long SQLite waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        let vellum_dir = dirs::home_dir()
            .map(|h| h.join(".vellum"))
            .unwrap_or_else(|| PathBuf::from(".vellum"));

        Self {
            database_path: vellum_dir.join("history.db"),
            in_memory: false,
            store_assigned_versions: true,
            atomic_snapshots: true,
            busy_timeout_ms: 5000,
        }
    }
}

impl HistoryConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> VellumResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| VellumError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| VellumError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| VellumError::Configuration(e.to_string())),
            _ => Err(VellumError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> VellumResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `VELLUM_*` environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> VellumResult<Self> {
        if let Ok(path) = std::env::var("VELLUM_DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var("VELLUM_BUSY_TIMEOUT_MS") {
            self.busy_timeout_ms = raw.parse().map_err(|_| {
                VellumError::Configuration(format!(
                    "VELLUM_BUSY_TIMEOUT_MS is not a number: {}",
                    raw
                ))
            })?;
        }
        if let Ok(raw) = std::env::var("VELLUM_STORE_ASSIGNED_VERSIONS") {
            self.store_assigned_versions = parse_flag("VELLUM_STORE_ASSIGNED_VERSIONS", &raw)?;
        }
        if let Ok(raw) = std::env::var("VELLUM_ATOMIC_SNAPSHOTS") {
            self.atomic_snapshots = parse_flag("VELLUM_ATOMIC_SNAPSHOTS", &raw)?;
        }
        Ok(self)
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> HistoryConfigBuilder {
        HistoryConfigBuilder::default()
    }
}

fn parse_flag(name: &str, raw: &str) -> VellumResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(VellumError::Configuration(format!(
            "{} must be a boolean, got {:?}",
            name, raw
        ))),
    }
}

/// Builder for HistoryConfig.
#[derive(Default)]
pub struct HistoryConfigBuilder {
    config: HistoryConfig,
}

impl HistoryConfigBuilder {
    /// Set the database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    /// Use an in-memory database.
    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.config.in_memory = in_memory;
        self
    }

    /// Toggle database-side version assignment.
    pub fn store_assigned_versions(mut self, enabled: bool) -> Self {
        self.config.store_assigned_versions = enabled;
        self
    }

    /// Toggle single-transaction snapshots.
    pub fn atomic_snapshots(mut self, enabled: bool) -> Self {
        self.config.atomic_snapshots = enabled;
        self
    }

    /// Set the busy timeout in milliseconds.
    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.config.busy_timeout_ms = ms;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HistoryConfig {
        self.config
    }
}
