use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Agent activity, ordered so the worst (most urgent) status wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Done,
    Thinking,
    Working,
    NeedsAttention,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Done => "done",
            AgentStatus::Thinking => "thinking",
            AgentStatus::Working => "working",
            AgentStatus::NeedsAttention => "needsAttention",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Status(AgentStatus),
    /// The agent session is gone; its sub-scope is dropped entirely.
    SessionEnded,
}

impl StatusKind {
    pub fn parse(raw: &str) -> Option<Self> {
        let kind = match raw {
            "idle" => StatusKind::Status(AgentStatus::Idle),
            "done" => StatusKind::Status(AgentStatus::Done),
            "thinking" => StatusKind::Status(AgentStatus::Thinking),
            "working" => StatusKind::Status(AgentStatus::Working),
            "needsAttention" => StatusKind::Status(AgentStatus::NeedsAttention),
            "sessionEnded" => StatusKind::SessionEnded,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusKind::Status(status) => status.as_str(),
            StatusKind::SessionEnded => "sessionEnded",
        }
    }
}

/// A validated status report from an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: StatusKind,
    pub cwd: PathBuf,
    pub session_id: Option<String>,
    pub column_id: Option<String>,
}

impl StatusEvent {
    pub fn new(kind: StatusKind, cwd: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            cwd: cwd.into(),
            session_id: None,
            column_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_column(mut self, column_id: impl Into<String>) -> Self {
        self.column_id = Some(column_id.into());
        self
    }
}

/// Wire form of a status report, as written to the status file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatusEvent {
    pub status: String,
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl RawStatusEvent {
    /// `None` for unknown statuses or an empty cwd.
    pub fn into_event(self) -> Option<StatusEvent> {
        let kind = StatusKind::parse(&self.status)?;
        if self.cwd.trim().is_empty() {
            return None;
        }
        Some(StatusEvent {
            kind,
            cwd: PathBuf::from(self.cwd),
            session_id: self.session_id.filter(|s| !s.is_empty()),
            column_id: self.column_id.filter(|c| !c.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_status_wins_ordering() {
        assert!(AgentStatus::Idle < AgentStatus::Done);
        assert!(AgentStatus::Done < AgentStatus::Thinking);
        assert!(AgentStatus::Thinking < AgentStatus::Working);
        assert!(AgentStatus::Working < AgentStatus::NeedsAttention);
        let worst = [AgentStatus::Done, AgentStatus::NeedsAttention, AgentStatus::Thinking]
            .into_iter()
            .max();
        assert_eq!(worst, Some(AgentStatus::NeedsAttention));
    }

    #[test]
    fn test_raw_event_parses_camel_case() {
        let json = r#"{"status":"needsAttention","cwd":"/src/app","sessionId":"abc","columnId":"column-2","timestamp":1700000000}"#;
        let raw: RawStatusEvent = serde_json::from_str(json).unwrap();
        let event = raw.into_event().unwrap();
        assert_eq!(event.kind, StatusKind::Status(AgentStatus::NeedsAttention));
        assert_eq!(event.cwd, PathBuf::from("/src/app"));
        assert_eq!(event.session_id.as_deref(), Some("abc"));
        assert_eq!(event.column_id.as_deref(), Some("column-2"));
    }

    #[test]
    fn test_unknown_status_is_dropped() {
        let raw = RawStatusEvent {
            status: "sleeping".to_string(),
            cwd: "/src/app".to_string(),
            session_id: None,
            column_id: None,
            timestamp: None,
        };
        assert_eq!(raw.into_event(), None);
    }

    #[test]
    fn test_session_ended_kind() {
        assert_eq!(StatusKind::parse("sessionEnded"), Some(StatusKind::SessionEnded));
        assert_eq!(StatusKind::SessionEnded.as_str(), "sessionEnded");
        assert_eq!(AgentStatus::NeedsAttention.to_string(), "needsAttention");
    }
}
