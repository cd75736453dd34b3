use super::{types::Config, ConfigError};

/// Number of daily checkpoints the scheduler drives.
const CHECKPOINT_COUNT: usize = 3;

/// Validate configuration
/// Currently validates:
/// - Exactly three checkpoints with valid, strictly increasing times and
///   distinct slots
/// - Catalog page size is positive
/// - Server port is not 0 when the server is enabled
/// - Weather API key is set when weather is enabled
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let checkpoints = &config.schedule.checkpoints;
    if checkpoints.len() != CHECKPOINT_COUNT {
        return Err(ConfigError::ValidationError(format!(
            "schedule.checkpoints must have exactly {} entries, got {}",
            CHECKPOINT_COUNT,
            checkpoints.len()
        )));
    }

    let mut previous: Option<u32> = None;
    for cp in checkpoints {
        if cp.hour > 23 || cp.minute > 59 {
            return Err(ConfigError::ValidationError(format!(
                "schedule checkpoint {:02}:{:02} is not a valid time",
                cp.hour, cp.minute
            )));
        }
        let minutes = cp.hour * 60 + cp.minute;
        if previous.is_some_and(|p| minutes <= p) {
            return Err(ConfigError::ValidationError(
                "schedule.checkpoints must be in strictly increasing order".to_string(),
            ));
        }
        previous = Some(minutes);
    }

    for (i, cp) in checkpoints.iter().enumerate() {
        if checkpoints[..i].iter().any(|earlier| earlier.slot == cp.slot) {
            return Err(ConfigError::ValidationError(format!(
                "schedule slot '{}' is used by more than one checkpoint",
                cp.slot
            )));
        }
    }

    if config.catalog.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "catalog.page_size cannot be 0".to_string(),
        ));
    }

    if config.server.enabled && config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.weather.enabled && config.weather.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "weather.api_key is required when weather is enabled".to_string(),
        ));
    }

    Ok(())
}
