use std::path::PathBuf;

use super::errors::SessionError;
use super::types::SessionId;

/// What the registry asks a backend to launch.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub session_id: SessionId,
    pub run: u64,
    /// `None` launches a bare login shell.
    pub command: Option<String>,
    /// Interactive tabs keep their shell alive after the command finishes;
    /// runners and setup commands exit with the command.
    pub interactive: bool,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnedProcess {
    pub pid: Option<u32>,
}

/// Exit notification. Backends deliver these asynchronously; the registry
/// drops any whose `run` no longer matches the session's current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    pub session_id: SessionId,
    pub run: u64,
    pub exit_code: i32,
}

/// Process host behind the session registry.
///
/// `spawn` must return promptly. Exits are reported out of band as
/// [`ProcessExit`] values on whatever channel the backend was built with.
pub trait ProcessBackend: Send {
    fn spawn(&mut self, request: SpawnRequest) -> Result<SpawnedProcess, SessionError>;

    /// Ask the process tree to exit. The session stays running until the
    /// exit notification arrives.
    fn terminate(&mut self, session_id: &SessionId) -> Result<(), SessionError>;

    /// Drop bookkeeping for a finished run. Ignored when `run` is stale.
    fn release(&mut self, session_id: &SessionId, run: u64);

    /// Drop all bookkeeping for a removed session.
    fn forget(&mut self, session_id: &SessionId);
}
