//! Configuration validation utilities

use super::*;
use crate::core::error::{Error, Result};

/// Upper bound on explicitly requested worker threads
const MAX_WORKER_THREADS: usize = 4096;

/// Validate the entire configuration
pub fn validate_config(config: &EngineConfig) -> Result<()> {
    validate_threading_config(&config.threading)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

pub fn validate_threading_config(config: &ThreadingConfig) -> Result<()> {
    if config.worker_threads > MAX_WORKER_THREADS {
        return Err(Error::Config(format!(
            "worker_threads must be at most {}, got {}",
            MAX_WORKER_THREADS, config.worker_threads
        )));
    }
    if config.parallel_min_len == 0 {
        return Err(Error::Config(
            "parallel_min_len must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_logging_config(config: &LoggingConfig) -> Result<()> {
    config.level_filter().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.threading.parallel_min_len = 0;
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.threading.worker_threads = MAX_WORKER_THREADS + 1;
        assert!(validate_config(&config).is_err());
    }
}
