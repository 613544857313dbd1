//! Per-repository project configuration (`.wtmux/config.json`).
//!
//! This is the run configuration source: the core only reads it. Missing or
//! malformed files degrade to an empty configuration with a logged warning.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A runner definition: a long-lived command such as a dev server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfiguration {
    /// Display name, unique within its project.
    pub name: String,
    pub command: String,
    /// Port this service is expected to listen on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Default runners are launched by "Start Default"; optional ones only on demand.
    #[serde(default)]
    pub auto_start: bool,
    #[serde(default)]
    pub order: i32,
}

impl RunConfiguration {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            port: None,
            auto_start: false,
            order: 0,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub env_files_to_copy: Vec<String>,
    #[serde(default)]
    pub setup_commands: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_run_configurations")]
    pub run_configurations: Vec<RunConfiguration>,
    /// Command typed into every new terminal tab (e.g. `claude`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_start_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worktree_base_path: Option<String>,
}

impl ProjectConfig {
    /// Configured ports of all run configurations, sorted and de-duplicated.
    pub fn configured_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .run_configurations
            .iter()
            .filter_map(|rc| rc.port)
            .filter(|port| *port > 0)
            .collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Setup commands chained into one shell line, or `None` if there are none.
    pub fn setup_command_line(&self) -> Option<String> {
        let commands: Vec<&str> = self
            .setup_commands
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        if commands.is_empty() {
            None
        } else {
            Some(commands.join(" && "))
        }
    }

    pub fn run_configuration(&self, name: &str) -> Option<&RunConfiguration> {
        self.run_configurations.iter().find(|rc| rc.name == name)
    }
}

/// Lenient on-disk shape of one run configuration entry.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRunConfiguration {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    port: Option<i64>,
    #[serde(default)]
    auto_start: Option<bool>,
    #[serde(default)]
    order: Option<i32>,
}

impl RawRunConfiguration {
    /// `index` is the entry's position in the file; it is the order when
    /// none is given.
    fn validate(self, index: usize) -> Result<RunConfiguration, String> {
        let name = self.name.unwrap_or_default();
        if name.trim().is_empty() {
            return Err("missing name".to_string());
        }
        let command = self.command.unwrap_or_default();
        if command.trim().is_empty() {
            return Err(format!("'{}' has no command", name));
        }
        let port = match self.port {
            None => None,
            Some(port) => match u16::try_from(port) {
                Ok(port) if port > 0 => Some(port),
                _ => return Err(format!("'{}' has invalid port {}", name, port)),
            },
        };
        Ok(RunConfiguration {
            name,
            command,
            port,
            auto_start: self.auto_start.unwrap_or(false),
            order: self
                .order
                .unwrap_or_else(|| i32::try_from(index).unwrap_or(i32::MAX)),
        })
    }
}

/// Keep every usable entry; a bad one is skipped with a warning instead of
/// failing the whole file.
fn deserialize_run_configurations<'de, D>(deserializer: D) -> Result<Vec<RunConfiguration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let entries = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    let configurations = entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let result = serde_json::from_value::<RawRunConfiguration>(entry)
                .map_err(|e| e.to_string())
                .and_then(|raw| raw.validate(index));
            match result {
                Ok(rc) => Some(rc),
                Err(reason) => {
                    warn!(
                        event = "core.config.run_configuration_skipped",
                        index = index,
                        reason = %reason,
                    );
                    None
                }
            }
        })
        .collect();
    Ok(configurations)
}

pub fn project_config_file(repo_root: &Path) -> PathBuf {
    repo_root.join(".wtmux").join("config.json")
}

/// Read `.wtmux/config.json` from a repository root.
///
/// Returns the default configuration if the file is missing or cannot be
/// parsed. Run configurations without a name or command, or with a port
/// outside 1-65535, are dropped one by one.
pub fn load_project_config(repo_root: &Path) -> ProjectConfig {
    let path = project_config_file(repo_root);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(
                event = "core.config.project_config_missing",
                path = %path.display()
            );
            return ProjectConfig::default();
        }
        Err(e) => {
            warn!(
                event = "core.config.project_config_read_failed",
                path = %path.display(),
                error = %e
            );
            return ProjectConfig::default();
        }
    };

    match serde_json::from_str::<ProjectConfig>(&content) {
        Ok(config) => config,
        Err(e) => {
            warn!(
                event = "core.config.project_config_parse_failed",
                path = %path.display(),
                error = %e
            );
            ProjectConfig::default()
        }
    }
}
