//! Ingestion configuration file support
//!
//! Handles parsing of TOML and YAML ingestion configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::dialect::Dialect;
use crate::error::{IngestError, IngestResult};
use crate::executor::Connection;
use crate::ingest_mode::IngestMode;
use crate::ingestor::{IngestRequest, Ingestor, IngestorOptions};
use crate::models::{Dataset, DatasetFilter};
use crate::statistics::IngestorResult;

/// Environment variable for the target dialect
pub const ENV_DIALECT: &str = "PERSISTENCE_DIALECT";

/// Environment variable enabling main dataset creation
pub const ENV_CREATE_DATASETS: &str = "PERSISTENCE_CREATE_DATASETS";

/// Environment variable enabling staging cleanup
pub const ENV_CLEANUP_STAGING: &str = "PERSISTENCE_CLEANUP_STAGING";

/// Environment variable enabling SQL verification
pub const ENV_VERIFY_SQL: &str = "PERSISTENCE_VERIFY_SQL";

/// Complete ingestion configuration
///
/// ```toml
/// dialect = "duckdb"
///
/// [options]
/// create_datasets = true
///
/// [mode]
/// type = "unitemporal_delta"
/// primary_keys = ["id"]
///
/// [staging]
/// namespace = "demo"
/// name = "staging"
/// fields = [{ name = "id", data_type = "INTEGER", primary_key = true }]
///
/// [main]
/// namespace = "demo"
/// name = "main"
/// fields = [{ name = "id", data_type = "INTEGER", primary_key = true }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target dialect
    #[serde(default)]
    pub dialect: Dialect,

    #[serde(default)]
    pub options: IngestorOptions,

    pub mode: IngestMode,

    pub staging: Dataset,

    pub main: Dataset,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<DatasetFilter>,
}

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Detect the format from a file extension
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            _ => Err(IngestError::Config(format!(
                "Unsupported configuration file: {}. Use .toml, .yaml or .yml.",
                path.display()
            ))),
        }
    }
}

impl IngestConfig {
    /// Create a configuration for `request` with default dialect and options
    pub fn new(request: IngestRequest) -> Self {
        Self {
            dialect: Dialect::default(),
            options: IngestorOptions::default(),
            mode: request.mode,
            staging: request.staging,
            main: request.main,
            filters: request.filters,
        }
    }

    /// Load a configuration file and apply environment overrides
    pub fn load(path: &Path) -> IngestResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)
            .map_err(|e| IngestError::Config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::parse(&content, format)?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> IngestResult<Self> {
        match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| IngestError::Config(format!("Failed to parse config: {}", e))),
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| IngestError::Config(format!("Failed to parse config: {}", e))),
        }
    }

    /// Save the configuration, choosing the format from the file extension
    pub fn save(&self, path: &Path) -> IngestResult<()> {
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => self.to_toml()?,
            ConfigFormat::Yaml => self.to_yaml()?,
        };
        std::fs::write(path, content)
            .map_err(|e| IngestError::Config(format!("Failed to write config: {}", e)))
    }

    pub fn to_toml(&self) -> IngestResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| IngestError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn to_yaml(&self) -> IngestResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| IngestError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; unparsable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dialect) = lookup(ENV_DIALECT)
            && let Ok(dialect) = dialect.parse()
        {
            self.dialect = dialect;
        }

        if let Some(enabled) = lookup(ENV_CREATE_DATASETS).as_deref().and_then(parse_flag) {
            self.options.create_datasets = enabled;
        }

        if let Some(enabled) = lookup(ENV_CLEANUP_STAGING).as_deref().and_then(parse_flag) {
            self.options.cleanup_staging_data = enabled;
        }

        if let Some(enabled) = lookup(ENV_VERIFY_SQL).as_deref().and_then(parse_flag) {
            self.options.verify_sql = enabled;
        }
    }

    /// The ingestion request described by this configuration
    pub fn request(&self) -> IngestRequest {
        IngestRequest {
            mode: self.mode.clone(),
            staging: self.staging.clone(),
            main: self.main.clone(),
            filters: self.filters.clone(),
        }
    }

    /// Ingest the configured request through `connection`
    ///
    /// Fails with `InvalidModeConfiguration` when the connection speaks a
    /// different dialect than the one configured.
    pub fn ingest<C: Connection + ?Sized>(&self, connection: &C) -> IngestResult<IngestorResult> {
        if connection.dialect() != self.dialect {
            return Err(IngestError::InvalidModeConfiguration(format!(
                "Configured dialect {} does not match connection dialect {}",
                self.dialect,
                connection.dialect()
            )));
        }
        Ingestor::new(self.options).ingest(&self.request(), connection)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
