//! Configuration type definitions for WTMux.
//!
//! These types are deserialized from TOML config files. Every tunable is
//! optional so that user and project files can be merged field by field;
//! the accessor methods supply the built-in defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [layout]
//! max_columns = 4
//!
//! [status]
//! done_clear_secs = 45
//!
//! [ports]
//! scan_interval_secs = 5
//!
//! [terminal]
//! shell = "/bin/bash"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults;

/// Runtime paths derived from the environment, not from config files.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for all WTMux data (default: ~/.wtmux)
    pub wtmux_dir: PathBuf,
}

impl Paths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the agent status file written by `wtmux hook`.
    pub fn status_file(&self) -> PathBuf {
        self.wtmux_dir.join("claude-status.json")
    }

    pub fn user_config_file(&self) -> PathBuf {
        self.wtmux_dir.join("config.toml")
    }
}

/// Main configuration loaded from TOML config files.
///
/// Loaded from `~/.wtmux/config.toml` and then `./.wtmux/config.toml`;
/// project values override user values.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WtmuxConfig {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub status: StatusConfig,

    #[serde(default)]
    pub ports: PortsConfig,

    #[serde(default)]
    pub terminal: TerminalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LayoutConfig {
    /// Maximum number of columns per window. Default: 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_columns: Option<usize>,

    /// Width of the strip a minimized column collapses to. Default: 36.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimized_column_width: Option<u32>,
}

impl LayoutConfig {
    pub fn max_columns(&self) -> usize {
        self.max_columns.unwrap_or(defaults::DEFAULT_MAX_COLUMNS)
    }

    pub fn minimized_column_width(&self) -> u32 {
        self.minimized_column_width
            .unwrap_or(defaults::DEFAULT_MINIMIZED_COLUMN_WIDTH)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StatusConfig {
    /// Seconds after which a `done` status falls back to idle. Default: 30.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done_clear_secs: Option<u64>,

    /// Status file written by the agent hook.
    /// Default: `~/.wtmux/claude-status.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_file: Option<PathBuf>,
}

impl StatusConfig {
    pub fn done_clear_after(&self) -> Duration {
        Duration::from_secs(
            self.done_clear_secs
                .unwrap_or(defaults::DEFAULT_DONE_CLEAR_SECS),
        )
    }

    pub fn status_file(&self, paths: &Paths) -> PathBuf {
        self.status_file
            .clone()
            .unwrap_or_else(|| paths.status_file())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PortsConfig {
    /// Whether listening ports of running sessions are detected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Interval between port scans. Default: 3 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_interval_secs: Option<u64>,
}

impl PortsConfig {
    pub fn enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(
            self.scan_interval_secs
                .unwrap_or(defaults::DEFAULT_PORT_SCAN_INTERVAL_SECS),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TerminalConfig {
    /// Shell used to run session commands. Default: `$SHELL`, else `/bin/zsh`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<u16>,
}

impl TerminalConfig {
    pub fn shell(&self) -> String {
        self.shell.clone().unwrap_or_else(defaults::default_shell)
    }

    pub fn rows(&self) -> u16 {
        self.rows.unwrap_or(defaults::DEFAULT_ROWS)
    }

    pub fn cols(&self) -> u16 {
        self.cols.unwrap_or(defaults::DEFAULT_COLS)
    }
}
