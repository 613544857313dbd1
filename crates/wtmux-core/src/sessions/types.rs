use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::layout::PaneId;
use crate::projects::WorktreeId;

/// Structurally informative session identity.
///
/// The same logical slot always produces the same id, so a session can be
/// recreated deterministically without re-keying anything bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// `tab:<worktree>:<pane>:<n>`
    pub fn tab(worktree: &WorktreeId, pane: PaneId, n: u32) -> Self {
        Self(format!("tab:{}:{}:{}", worktree, pane, n))
    }

    /// `runner:<worktree>:<name>`
    pub fn runner(worktree: &WorktreeId, name: &str) -> Self {
        Self(format!("runner:{}:{}", worktree, name))
    }

    /// `setup:<worktree>`
    pub fn setup(worktree: &WorktreeId) -> Self {
        Self(format!("setup:{}", worktree))
    }

    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Interactive terminal tab.
    Tab,
    /// Long-lived command from a run configuration (dev server, watcher).
    Runner,
    /// One-shot worktree setup command; always runs at creation.
    Setup,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Tab => write!(f, "tab"),
            SessionKind::Runner => write!(f, "runner"),
            SessionKind::Setup => write!(f, "setup"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but not started (deferred), or finished and reset.
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl SessionState {
    /// The only legal edges: idle→running, running→succeeded|failed,
    /// succeeded|failed→idle.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (SessionState::Idle, SessionState::Running)
                | (SessionState::Running, SessionState::Succeeded)
                | (SessionState::Running, SessionState::Failed)
                | (SessionState::Succeeded, SessionState::Idle)
                | (SessionState::Failed, SessionState::Idle)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed)
    }

    /// Exit code 0 ⇒ succeeded; nonzero or signal ⇒ failed.
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            SessionState::Succeeded
        } else {
            SessionState::Failed
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Running => write!(f, "running"),
            SessionState::Succeeded => write!(f, "succeeded"),
            SessionState::Failed => write!(f, "failed"),
        }
    }
}

/// The ordered tab group a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabScope {
    /// Interactive and setup tabs shown in a pane for a given worktree.
    Pane { pane: PaneId, worktree: WorktreeId },
    /// The runner group of a worktree.
    Runners(WorktreeId),
}

impl TabScope {
    pub fn worktree(&self) -> &WorktreeId {
        match self {
            TabScope::Pane { worktree, .. } => worktree,
            TabScope::Runners(worktree) => worktree,
        }
    }

    pub fn pane(&self) -> Option<PaneId> {
        match self {
            TabScope::Pane { pane, .. } => Some(*pane),
            TabScope::Runners(_) => None,
        }
    }
}

impl fmt::Display for TabScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabScope::Pane { pane, worktree } => write!(f, "{}@{}", pane, worktree),
            TabScope::Runners(worktree) => write!(f, "runners@{}", worktree),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub state: SessionState,
    pub worktree: WorktreeId,
    pub scope: TabScope,
    pub title: String,
    /// `None` starts a login shell with no initial command.
    pub command: Option<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    pub defer_execution: bool,
    /// Listening TCP ports of the process tree; cleared on exit.
    pub listening_ports: BTreeSet<u16>,
    pub pid: Option<u32>,
    /// Run generation, incremented on every successful spawn.
    pub run: u64,
    pub exit_code: Option<i32>,
    /// Last spawn/terminate failure, shown next to the retry affordance.
    pub last_error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
}

impl Session {
    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }

    pub fn ports(&self) -> Vec<u16> {
        self.listening_ports.iter().copied().collect()
    }
}

/// Parameters for [`SessionRegistry::create`](super::registry::SessionRegistry::create).
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub id: SessionId,
    pub kind: SessionKind,
    pub scope: TabScope,
    pub title: Option<String>,
    pub command: Option<String>,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    pub defer_execution: bool,
}

impl NewSession {
    pub fn tab(worktree: &WorktreeId, pane: PaneId, n: u32, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: SessionId::tab(worktree, pane, n),
            kind: SessionKind::Tab,
            scope: TabScope::Pane {
                pane,
                worktree: worktree.clone(),
            },
            title: None,
            command: None,
            working_dir: working_dir.into(),
            env: Vec::new(),
            defer_execution: false,
        }
    }

    pub fn runner(
        worktree: &WorktreeId,
        name: &str,
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: SessionId::runner(worktree, name),
            kind: SessionKind::Runner,
            scope: TabScope::Runners(worktree.clone()),
            title: Some(name.to_string()),
            command: Some(command.into()),
            working_dir: working_dir.into(),
            env: Vec::new(),
            defer_execution: true,
        }
    }

    pub fn setup(
        worktree: &WorktreeId,
        pane: PaneId,
        command: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: SessionId::setup(worktree),
            kind: SessionKind::Setup,
            scope: TabScope::Pane {
                pane,
                worktree: worktree.clone(),
            },
            title: Some("Setup".to_string()),
            command: Some(command.into()),
            working_dir: working_dir.into(),
            env: Vec::new(),
            defer_execution: false,
        }
    }

    pub fn with_command(mut self, command: Option<String>) -> Self {
        self.command = command.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn deferred(mut self, defer: bool) -> Self {
        self.defer_execution = defer;
        self
    }

    pub fn worktree(&self) -> &WorktreeId {
        self.scope.worktree()
    }
}

/// Result of a start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started { run: u64, pid: Option<u32> },
    AlreadyRunning,
    /// The id is not (or no longer) registered; logged and ignored.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATES: [SessionState; 4] = [
        SessionState::Idle,
        SessionState::Running,
        SessionState::Succeeded,
        SessionState::Failed,
    ];

    #[test]
    fn test_session_ids_are_deterministic() {
        let worktree = WorktreeId::new("app/feat");
        assert_eq!(
            SessionId::tab(&worktree, PaneId::new(3), 2).as_str(),
            "tab:app/feat:pane-3:2"
        );
        assert_eq!(
            SessionId::runner(&worktree, "Dev Server").as_str(),
            "runner:app/feat:Dev Server"
        );
        assert_eq!(SessionId::setup(&worktree).as_str(), "setup:app/feat");
        assert_eq!(
            SessionId::runner(&worktree, "web"),
            SessionId::runner(&worktree, "web")
        );
    }

    #[test]
    fn test_only_lifecycle_edges_are_legal() {
        let legal = [
            (SessionState::Idle, SessionState::Running),
            (SessionState::Running, SessionState::Succeeded),
            (SessionState::Running, SessionState::Failed),
            (SessionState::Succeeded, SessionState::Idle),
            (SessionState::Failed, SessionState::Idle),
        ];
        for from in STATES {
            for to in STATES {
                assert_eq!(
                    from.can_transition_to(to),
                    legal.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_state_from_exit_code() {
        assert_eq!(SessionState::from_exit_code(0), SessionState::Succeeded);
        assert_eq!(SessionState::from_exit_code(1), SessionState::Failed);
        assert_eq!(SessionState::from_exit_code(-1), SessionState::Failed);
    }

    #[test]
    fn test_new_runner_defaults_to_deferred() {
        let worktree = WorktreeId::new("app/main");
        let new = NewSession::runner(&worktree, "web", "npm run dev", "/src/app");
        assert!(new.defer_execution);
        assert_eq!(new.kind, SessionKind::Runner);
        assert_eq!(new.scope, TabScope::Runners(worktree.clone()));
        assert_eq!(new.worktree(), &worktree);
    }

    #[test]
    fn test_blank_command_means_no_command() {
        let worktree = WorktreeId::new("app/main");
        let new = NewSession::tab(&worktree, PaneId::new(1), 1, "/src/app")
            .with_command(Some("   ".to_string()));
        assert_eq!(new.command, None);
    }
}
