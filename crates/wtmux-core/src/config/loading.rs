//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.wtmux/config.toml` (global user preferences)
//! 3. **Project config** - `./.wtmux/config.toml` (project-specific overrides)

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::types::{
    LayoutConfig, Paths, PortsConfig, StatusConfig, TerminalConfig, WtmuxConfig,
};
use crate::config::validation::validate_config;
use crate::errors::ConfigError;

/// Load configuration from the hierarchy of config files.
///
/// Missing config files are not errors; parse and validation failures are.
pub fn load_hierarchy() -> Result<WtmuxConfig, ConfigError> {
    let user = Paths::new().user_config_file();
    let project = std::env::current_dir()?
        .join(".wtmux")
        .join("config.toml");
    load_from(Some(&user), Some(&project))
}

/// Load and merge the given config files, in order.
pub fn load_from(user: Option<&Path>, project: Option<&Path>) -> Result<WtmuxConfig, ConfigError> {
    let mut config = WtmuxConfig::default();

    for path in [user, project].into_iter().flatten() {
        match load_config_file(path) {
            Ok(file_config) => config = merge_configs(config, file_config),
            Err(ConfigError::NotFound { path }) => {
                debug!(event = "core.config.file_not_found", path = %path.display());
            }
            Err(e) => return Err(e),
        }
    }

    validate_config(&config)?;
    Ok(config)
}

/// Load a single configuration file.
pub fn load_config_file(path: &Path) -> Result<WtmuxConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(ConfigError::Io { source: e }),
    };

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge two configurations, with `override_config` taking precedence
/// wherever it sets a value.
pub fn merge_configs(base: WtmuxConfig, override_config: WtmuxConfig) -> WtmuxConfig {
    WtmuxConfig {
        layout: LayoutConfig {
            max_columns: override_config
                .layout
                .max_columns
                .or(base.layout.max_columns),
            minimized_column_width: override_config
                .layout
                .minimized_column_width
                .or(base.layout.minimized_column_width),
        },
        status: StatusConfig {
            done_clear_secs: override_config
                .status
                .done_clear_secs
                .or(base.status.done_clear_secs),
            status_file: override_config
                .status
                .status_file
                .or(base.status.status_file),
        },
        ports: PortsConfig {
            enabled: override_config.ports.enabled.or(base.ports.enabled),
            scan_interval_secs: override_config
                .ports
                .scan_interval_secs
                .or(base.ports.scan_interval_secs),
        },
        terminal: TerminalConfig {
            shell: override_config.terminal.shell.or(base.terminal.shell),
            rows: override_config.terminal.rows.or(base.terminal.rows),
            cols: override_config.terminal.cols.or(base.terminal.cols),
        },
    }
}

/// Project-local config file path for a repository root.
pub fn project_config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".wtmux").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_from(
            Some(&dir.path().join("nope.toml")),
            Some(&dir.path().join("also-nope.toml")),
        )
        .unwrap();
        assert_eq!(config, WtmuxConfig::default());
    }

    #[test]
    fn test_project_overrides_user() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        let project = dir.path().join("project.toml");
        fs::write(
            &user,
            "[layout]\nmax_columns = 3\n\n[status]\ndone_clear_secs = 60\n",
        )
        .unwrap();
        fs::write(&project, "[status]\ndone_clear_secs = 10\n").unwrap();

        let config = load_from(Some(&user), Some(&project)).unwrap();
        assert_eq!(config.layout.max_columns(), 3);
        assert_eq!(config.status.done_clear_after(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        fs::write(&user, "[layout\nmax_columns = ").unwrap();

        let err = load_from(Some(&user), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        fs::write(&user, "[layout]\nmax_columns = 0\n").unwrap();

        let err = load_from(Some(&user), None).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_merge_keeps_base_when_override_unset() {
        let base = WtmuxConfig {
            terminal: TerminalConfig {
                shell: Some("/bin/bash".to_string()),
                rows: Some(40),
                cols: None,
            },
            ..Default::default()
        };
        let merged = merge_configs(base, WtmuxConfig::default());
        assert_eq!(merged.terminal.shell(), "/bin/bash");
        assert_eq!(merged.terminal.rows(), 40);
        assert_eq!(merged.terminal.cols(), 80);
    }

    #[test]
    fn test_project_config_path() {
        assert_eq!(
            project_config_path(Path::new("/repo")),
            PathBuf::from("/repo/.wtmux/config.toml")
        );
    }
}
