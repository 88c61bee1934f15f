//! Configuration management for colrs
//!
//! This module provides centralized engine configuration with support for:
//! - Environment variables (`COLRS_*`)
//! - YAML/TOML configuration files
//! - Validation of every setting
//! - A process-global configuration read by construction and parallel kernels

use crate::core::error::{Error, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

pub mod loader;
pub mod validation;

/// Main configuration structure for colrs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker pool and parallel kernel settings
    pub threading: ThreadingConfig,
    /// Defaults for Series construction
    pub construction: ConstructionConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Threading configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadingConfig {
    /// Number of worker threads (0 = one per logical CPU)
    pub worker_threads: usize,
    /// Master switch for kernels called with `parallel = true`
    pub parallel_enabled: bool,
    /// Inputs shorter than this always run serially
    pub parallel_min_len: usize,
}

/// Construction defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    /// Whether heterogeneous input fails instead of falling back to Object
    pub strict: bool,
    /// Whether float NaN becomes null on construction
    pub nan_to_null: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum log level (off, error, warn, info, debug, trace)
    pub level: String,
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            parallel_enabled: true,
            parallel_min_len: 1024,
        }
    }
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self {
            strict: true,
            nan_to_null: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// The configured level as a `log` filter
    pub fn level_filter(&self) -> Result<log::LevelFilter> {
        self.level
            .parse()
            .map_err(|_| Error::Config(format!("Invalid log level: {}", self.level)))
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        loader::load_from_env()
    }

    /// Load configuration from a file (YAML or TOML)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        loader::load_from_file(path.as_ref())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        loader::load_from_yaml(yaml)
    }

    pub fn from_toml(toml: &str) -> Result<Self> {
        loader::load_from_toml(toml)
    }

    /// Load configuration with precedence: defaults -> file -> environment
    pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        loader::load_with_precedence(config_file)
    }

    /// Validate configuration and return errors if invalid
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        loader::save_to_file(self, path.as_ref())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config to YAML: {}", e)))
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Apply the logging level to the `log` facade
    pub fn apply_logging(&self) -> Result<()> {
        log::set_max_level(self.logging.level_filter()?);
        Ok(())
    }
}

lazy_static! {
    static ref GLOBAL_CONFIG: RwLock<EngineConfig> = RwLock::new(EngineConfig::default());
}

/// Snapshot of the process-global configuration
pub fn global_config() -> EngineConfig {
    match GLOBAL_CONFIG.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Validate and install a new process-global configuration
pub fn set_global_config(config: EngineConfig) -> Result<()> {
    config.validate()?;
    config.apply_logging()?;
    let mut guard = GLOBAL_CONFIG
        .write()
        .map_err(|_| Error::Config("global configuration lock is poisoned".to_string()))?;
    *guard = config;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.construction.strict);
        assert_eq!(config.logging.level_filter().unwrap(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = EngineConfig::from_yaml("threading:\n  worker_threads: 2\n").unwrap();
        assert_eq!(config.threading.worker_threads, 2);
        assert_eq!(config.threading.parallel_min_len, 1024);
        assert_eq!(config.logging.level, "warn");
    }
}
