use crate::config::types::WtmuxConfig;
use crate::errors::ConfigError;

/// Validate a merged configuration.
pub fn validate_config(config: &WtmuxConfig) -> Result<(), ConfigError> {
    if config.layout.max_columns == Some(0) {
        return Err(ConfigError::InvalidConfiguration {
            message: "layout.max_columns must be at least 1".to_string(),
        });
    }

    if config.status.done_clear_secs == Some(0) {
        return Err(ConfigError::InvalidConfiguration {
            message: "status.done_clear_secs must be greater than 0".to_string(),
        });
    }

    if config.ports.scan_interval_secs == Some(0) {
        return Err(ConfigError::InvalidConfiguration {
            message: "ports.scan_interval_secs must be greater than 0".to_string(),
        });
    }

    if matches!(config.terminal.rows, Some(0)) || matches!(config.terminal.cols, Some(0)) {
        return Err(ConfigError::InvalidConfiguration {
            message: "terminal.rows and terminal.cols must be greater than 0".to_string(),
        });
    }

    if let Some(shell) = &config.terminal.shell
        && shell.trim().is_empty()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: "terminal.shell cannot be empty".to_string(),
        });
    }

    Ok(())
}
