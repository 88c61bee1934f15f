//! Configuration loading utilities
//!
//! This module handles loading configuration from various sources with proper
//! precedence and validation.

use super::*;
use crate::core::error::{Error, Result};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

fn env_var<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid {}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

/// Overlay the `COLRS_*` environment variables onto `config`
pub fn apply_env(config: &mut EngineConfig) -> Result<()> {
    if let Some(threads) = env_var("COLRS_WORKER_THREADS")? {
        config.threading.worker_threads = threads;
    }
    if let Some(parallel) = env_var("COLRS_PARALLEL")? {
        config.threading.parallel_enabled = parallel;
    }
    if let Some(min_len) = env_var("COLRS_PARALLEL_MIN_LEN")? {
        config.threading.parallel_min_len = min_len;
    }
    if let Some(strict) = env_var("COLRS_STRICT")? {
        config.construction.strict = strict;
    }
    if let Some(nan_to_null) = env_var("COLRS_NAN_TO_NULL")? {
        config.construction.nan_to_null = nan_to_null;
    }
    if let Some(level) = env_var::<String>("COLRS_LOG_LEVEL")? {
        config.logging.level = level.to_lowercase();
    }
    Ok(())
}

/// Load configuration from environment variables over the defaults
pub fn load_from_env() -> Result<EngineConfig> {
    let mut config = EngineConfig::default();
    apply_env(&mut config)?;
    Ok(config)
}

/// Load configuration from a file (YAML or TOML based on extension)
pub fn load_from_file(path: &Path) -> Result<EngineConfig> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => load_from_yaml(&contents),
        Some("toml") => load_from_toml(&contents),
        Some(ext) => Err(Error::Config(format!(
            "Unsupported config file format: {}",
            ext
        ))),
        None => load_from_yaml(&contents).or_else(|_| load_from_toml(&contents)),
    }
}

pub fn load_from_yaml(yaml: &str) -> Result<EngineConfig> {
    serde_yaml::from_str(yaml)
        .map_err(|e| Error::Config(format!("Failed to parse YAML config: {}", e)))
}

pub fn load_from_toml(toml: &str) -> Result<EngineConfig> {
    toml::from_str(toml).map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))
}

/// Load configuration with precedence: defaults -> file -> environment
pub fn load_with_precedence<P: AsRef<Path>>(config_file: Option<P>) -> Result<EngineConfig> {
    let mut config = match config_file {
        Some(path) => load_from_file(path.as_ref())?,
        None => EngineConfig::default(),
    };

    // Environment has the highest precedence
    apply_env(&mut config)?;

    config.validate()?;
    Ok(config)
}

/// Save configuration to a file
pub fn save_to_file(config: &EngineConfig, path: &Path) -> Result<()> {
    let contents = match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => config.to_yaml()?,
        Some("toml") => config.to_toml()?,
        Some(ext) => {
            return Err(Error::Config(format!(
                "Unsupported config file format: {}",
                ext
            )))
        }
        None => config.to_yaml()?,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Serializes tests that modify environment variables
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_load_from_env() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        let orig_threads = env::var("COLRS_WORKER_THREADS").ok();
        let orig_level = env::var("COLRS_LOG_LEVEL").ok();

        env::set_var("COLRS_WORKER_THREADS", "3");
        env::set_var("COLRS_LOG_LEVEL", "DEBUG");

        let config = load_from_env().unwrap();
        assert_eq!(config.threading.worker_threads, 3);
        assert_eq!(config.logging.level, "debug");

        env::remove_var("COLRS_WORKER_THREADS");
        env::remove_var("COLRS_LOG_LEVEL");
        if let Some(val) = orig_threads {
            env::set_var("COLRS_WORKER_THREADS", val);
        }
        if let Some(val) = orig_level {
            env::set_var("COLRS_LOG_LEVEL", val);
        }
    }

    #[test]
    fn test_invalid_env_value() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        env::set_var("COLRS_PARALLEL", "sometimes");
        let err = load_from_env().unwrap_err();
        env::remove_var("COLRS_PARALLEL");
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_toml() {
        let toml = r#"
[threading]
worker_threads = 4
parallel_enabled = false
parallel_min_len = 10

[construction]
strict = false
nan_to_null = true
"#;
        let config = load_from_toml(toml).unwrap();
        assert_eq!(config.threading.worker_threads, 4);
        assert!(!config.threading.parallel_enabled);
        assert!(config.construction.nan_to_null);
    }

    #[test]
    fn test_save_and_load_file() {
        let _lock = ENV_TEST_MUTEX.lock().unwrap();
        let dir = tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.threading.parallel_min_len = 77;

        for name in ["engine.yaml", "engine.toml"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).unwrap();
            let loaded = load_with_precedence(Some(&path)).unwrap();
            assert_eq!(loaded.threading.parallel_min_len, 77);
        }
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("engine.ini");
        fs::write(&path, "x = 1").unwrap();
        assert!(load_from_file(&path).is_err());
    }
}
