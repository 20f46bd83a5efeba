//! Layered engine configuration.
//!
//! Sources in priority order, highest wins:
//!
//! 1. Environment variables with the `TASKFLOW_` prefix, `__` separating
//!    nested sections (`TASKFLOW_RECONCILIATION__INTERVAL_SECS`).
//! 2. A TOML file: the path in `TASKFLOW_CONFIG`, otherwise `taskflow.toml`
//!    in the working directory when it exists.
//! 3. Built-in defaults.

mod error;

pub use error::ConfigError;

use chrono::Duration;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "TASKFLOW_";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "TASKFLOW_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "taskflow.toml";

/// Longest accepted reconciliation interval (one year).
const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

const fn default_interval_secs() -> u64 {
    300
}

const fn default_max_conflict_retries() -> u32 {
    3
}

/// Reconciliation cadence and retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReconciliationConfig {
    /// Minimum time since the last write before an assignment is due.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How often a conflicting write is reloaded and retried.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

impl ReconciliationConfig {
    /// Returns the reconciliation interval as a duration.
    #[must_use]
    pub fn interval(&self) -> Duration {
        i64::try_from(self.interval_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_secs == 0 || self.interval_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::InvalidValue {
                field: "reconciliation.interval_secs".to_owned(),
                reason: format!("must be between 1 and {MAX_INTERVAL_SECS} seconds"),
            });
        }
        Ok(())
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Reconciliation settings.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
}

impl EngineConfig {
    /// Loads configuration from defaults, the configuration file and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source cannot be parsed or a value is
    /// out of range.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// Loads configuration using an explicit TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source cannot be parsed or a value is
    /// out of range.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment_with_file(Some(path.as_ref().to_path_buf())))
    }

    /// Extracts and validates configuration from a prepared figment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when extraction or validation fails.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the provider chain with the file discovered from the
    /// environment or working directory.
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_with_file(Self::config_path())
    }

    /// Validates cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for out-of-range values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reconciliation.validate()
    }

    fn figment_with_file(path: Option<PathBuf>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = path {
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"))
    }

    fn config_path() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(explicit));
        }
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    }
}
