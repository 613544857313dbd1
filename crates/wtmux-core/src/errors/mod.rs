use std::error::Error;
use std::path::PathBuf;

/// Implemented by every error type in the crate.
pub trait WtmuxError: Error + Send + Sync + 'static {
    /// Stable code for programmatic handling, e.g. `SESSION_NOT_FOUND`.
    fn error_code(&self) -> &'static str;

    /// User errors are logged as warnings and shown as-is.
    fn is_user_error(&self) -> bool {
        false
    }
}

pub type WtmuxResult<T> = Result<T, Box<dyn WtmuxError>>;

/// Failures loading `~/.wtmux/config.toml` or `./.wtmux/config.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No config file at '{}'", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("IO error reading config: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WtmuxError for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            ConfigError::NotFound { .. } => "CONFIG_NOT_FOUND",
            ConfigError::Parse { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            ConfigError::Io { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Parse { .. } | ConfigError::InvalidConfiguration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_the_file() {
        let error = ConfigError::Parse {
            path: PathBuf::from("/repo/.wtmux/config.toml"),
            message: "expected `=`".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to parse '/repo/.wtmux/config.toml': expected `=`"
        );
        assert_eq!(error.error_code(), "CONFIG_PARSE_ERROR");
        assert!(error.is_user_error());
    }

    #[test]
    fn test_io_error_is_not_user_error() {
        let error = ConfigError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(error.error_code(), "CONFIG_IO_ERROR");
        assert!(!error.is_user_error());
    }

    #[test]
    fn test_boxed_result_keeps_code() {
        let result: WtmuxResult<()> = Err(Box::new(ConfigError::InvalidConfiguration {
            message: "layout.max_columns must be at least 1".to_string(),
        }));
        let code = result.err().map(|e| e.error_code());
        assert_eq!(code, Some("INVALID_CONFIGURATION"));
    }
}
