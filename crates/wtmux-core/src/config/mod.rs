//! # Configuration System
//!
//! Hierarchical TOML configuration for the application plus the read-only
//! per-repository project configuration (`.wtmux/config.json`).
//!
//! ## Configuration Hierarchy
//!
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.wtmux/config.toml`
//! 3. **Project config** - `./.wtmux/config.toml`
//!
//! ```toml
//! # ~/.wtmux/config.toml
//! [layout]
//! max_columns = 4
//!
//! [ports]
//! scan_interval_secs = 5
//! ```

pub mod defaults;
pub mod loading;
pub mod project;
pub mod types;
pub mod validation;

pub use project::{ProjectConfig, RunConfiguration, load_project_config};
pub use types::{LayoutConfig, Paths, PortsConfig, StatusConfig, TerminalConfig, WtmuxConfig};
pub use validation::validate_config;

impl WtmuxConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, crate::errors::ConfigError> {
        loading::load_hierarchy()
    }

    /// Load the hierarchy, falling back to defaults (with a warning) on error.
    pub fn load_or_default() -> Self {
        match loading::load_hierarchy() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    event = "core.config.load_failed",
                    error = %e,
                    "Using default configuration"
                );
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        validation::validate_config(self)
    }
}
