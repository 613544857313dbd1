//! Agent hook side of the status channel.
//!
//! Claude Code runs `wtmux hook` for every hook event with the event JSON on
//! stdin. The event is mapped to a status and written to the status file,
//! which the running app watches.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, error};

use super::errors::StatusError;
use super::types::{AgentStatus, RawStatusEvent, StatusKind};

/// Tools whose use means the agent is changing things rather than reading.
pub const WRITE_TOOLS: [&str; 5] = ["Edit", "Write", "MultiEdit", "NotebookEdit", "Bash"];

/// Notification types that block on the user.
const ATTENTION_NOTIFICATIONS: [&str; 3] = ["permission_prompt", "idle_prompt", "elicitation_dialog"];

/// The subset of a Claude Code hook payload wtmux reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HookEvent {
    #[serde(default)]
    pub hook_event_name: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

pub fn parse_hook_event(input: &str) -> Result<HookEvent, StatusError> {
    serde_json::from_str(input).map_err(|e| StatusError::Malformed {
        message: e.to_string(),
    })
}

pub fn map_hook_status(event: &HookEvent) -> StatusKind {
    let status = match event.hook_event_name.as_str() {
        "SessionStart" => AgentStatus::Idle,
        "UserPromptSubmit" | "PostToolUse" => AgentStatus::Thinking,
        "PreToolUse" => match event.tool_name.as_deref() {
            Some(tool) if WRITE_TOOLS.contains(&tool) => AgentStatus::Working,
            _ => AgentStatus::Thinking,
        },
        "Stop" => AgentStatus::Done,
        "SessionEnd" => return StatusKind::SessionEnded,
        "PermissionRequest" => AgentStatus::NeedsAttention,
        "Notification" => match event.notification_type.as_deref() {
            Some(kind) if ATTENTION_NOTIFICATIONS.contains(&kind) => AgentStatus::NeedsAttention,
            _ => AgentStatus::Thinking,
        },
        _ => AgentStatus::Thinking,
    };
    StatusKind::Status(status)
}

/// Build the status-file record for a hook event.
pub fn status_record(event: &HookEvent, column_id: Option<String>, timestamp: i64) -> RawStatusEvent {
    RawStatusEvent {
        status: map_hook_status(event).as_str().to_string(),
        cwd: event.cwd.clone().unwrap_or_default(),
        session_id: event.session_id.clone(),
        column_id,
        timestamp: Some(timestamp),
    }
}

/// Write the status file atomically (temp file + rename).
pub fn write_status_file(path: &Path, record: &RawStatusEvent) -> Result<(), StatusError> {
    let write_error = |source: std::io::Error| StatusError::WriteFailed {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string(record).map_err(|e| StatusError::Malformed {
        message: e.to_string(),
    })?;

    let temp_file = path.with_extension("json.tmp");
    if let Err(e) = fs::write(&temp_file, json) {
        cleanup_temp_file(&temp_file);
        return Err(write_error(e));
    }
    if let Err(e) = fs::rename(&temp_file, path) {
        cleanup_temp_file(&temp_file);
        return Err(write_error(e));
    }

    debug!(
        event = "core.status.file_written",
        path = %path.display(),
        status = %record.status,
    );
    Ok(())
}

pub fn read_status_file(path: &Path) -> Result<RawStatusEvent, StatusError> {
    let content = fs::read_to_string(path).map_err(|source| StatusError::ReadFailed {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| StatusError::Malformed {
        message: e.to_string(),
    })
}

fn cleanup_temp_file(temp_file: &Path) {
    if let Err(e) = fs::remove_file(temp_file)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        error!(
            event = "core.status.temp_cleanup_failed",
            path = %temp_file.display(),
            error = %e,
        );
    }
}
