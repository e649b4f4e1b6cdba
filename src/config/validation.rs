use crate::config::types::{CacheConfig, Config, DelayConfig, FetchConfig, HarvestConfig, OutputConfig};
use crate::url::parse_locator;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_output_config(&config.output)?;
    validate_delay_config(&config.delay)?;
    validate_fetch_config(&config.fetch)?;
    validate_cache_config(&config.cache)?;
    Ok(())
}

/// Validates source lists, start page and year bounds
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    let sources: Vec<&str> = config
        .sources
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source locator is required".to_string(),
        ));
    }

    for source in sources {
        parse_locator(source).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid source locator '{}': {}", source, e))
        })?;
    }

    if config.start_page < 1 {
        return Err(ConfigError::Validation(format!(
            "start_page must be >= 1, got {}",
            config.start_page
        )));
    }

    if let (Some(min), Some(max)) = (config.min_year, config.max_year) {
        if min > max {
            return Err(ConfigError::Validation(format!(
                "min_year ({}) must not exceed max_year ({})",
                min, max
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.chunk_size < 1 {
        return Err(ConfigError::Validation(
            "chunk_size must be >= 1".to_string(),
        ));
    }

    for (name, path) in [
        ("output_root", &config.output_root),
        ("cache_root", &config.cache_root),
        ("filtered_root", &config.filtered_root),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

fn validate_delay_config(config: &DelayConfig) -> Result<(), ConfigError> {
    if config.min_secs > config.max_secs {
        return Err(ConfigError::Validation(format!(
            "delay min_secs ({}) must not exceed max_secs ({})",
            config.min_secs, config.max_secs
        )));
    }
    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "retries must be >= 1, got {}",
            config.retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.lock && config.lock_poll_ms < 1 {
        return Err(ConfigError::Validation(
            "lock_poll_ms must be >= 1 when locking is enabled".to_string(),
        ));
    }
    Ok(())
}
