//! Default values for configuration types.

use crate::config::types::Paths;

pub const DEFAULT_MAX_COLUMNS: usize = 5;
pub const DEFAULT_MINIMIZED_COLUMN_WIDTH: u32 = 36;
pub const DEFAULT_DONE_CLEAR_SECS: u64 = 30;
pub const DEFAULT_PORT_SCAN_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_ROWS: u16 = 24;
pub const DEFAULT_COLS: u16 = 80;

/// Returns `$SHELL`, falling back to `/bin/zsh`.
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| "/bin/zsh".to_string())
}

impl Default for Paths {
    fn default() -> Self {
        let wtmux_dir = match dirs::home_dir() {
            Some(home) => home.join(".wtmux"),
            None => {
                tracing::warn!(
                    event = "core.config.home_dir_missing",
                    "Could not find home directory, using temp directory"
                );
                std::env::temp_dir().join(".wtmux")
            }
        };

        Self { wtmux_dir }
    }
}
