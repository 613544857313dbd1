use crate::errors::WtmuxError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session '{id}' already exists")]
    AlreadyExists { id: String },

    #[error("Session '{id}' not found")]
    NotFound { id: String },

    #[error("Title '{title}' is already used in this tab group")]
    TitleTaken { title: String },

    #[error("Invalid session title: cannot be empty")]
    InvalidTitle,

    #[error("Failed to spawn process for session '{id}': {message}")]
    SpawnFailed { id: String, message: String },

    #[error("Failed to terminate process for session '{id}': {message}")]
    TerminateFailed { id: String, message: String },

    #[error("PTY operation failed: {message}")]
    PtyError { message: String },
}

impl WtmuxError for SessionError {
    fn error_code(&self) -> &'static str {
        match self {
            SessionError::AlreadyExists { .. } => "SESSION_ALREADY_EXISTS",
            SessionError::NotFound { .. } => "SESSION_NOT_FOUND",
            SessionError::TitleTaken { .. } => "SESSION_TITLE_TAKEN",
            SessionError::InvalidTitle => "INVALID_SESSION_TITLE",
            SessionError::SpawnFailed { .. } => "SESSION_SPAWN_FAILED",
            SessionError::TerminateFailed { .. } => "SESSION_TERMINATE_FAILED",
            SessionError::PtyError { .. } => "PTY_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            SessionError::AlreadyExists { .. }
                | SessionError::NotFound { .. }
                | SessionError::TitleTaken { .. }
                | SessionError::InvalidTitle
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Port scan tool unavailable: {message}")]
    ToolUnavailable { message: String },

    #[error("Port scan failed: {message}")]
    ScanFailed { message: String },
}

impl WtmuxError for PortError {
    fn error_code(&self) -> &'static str {
        match self {
            PortError::ToolUnavailable { .. } => "PORT_SCAN_TOOL_UNAVAILABLE",
            PortError::ScanFailed { .. } => "PORT_SCAN_FAILED",
        }
    }
}
