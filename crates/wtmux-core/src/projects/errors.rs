use crate::errors::WtmuxError;

#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("Project '{id}' already exists")]
    AlreadyExists { id: String },

    #[error("Project '{id}' not found")]
    NotFound { id: String },

    #[error("Worktree '{id}' is already registered in project '{project}'")]
    WorktreeAlreadyRegistered { id: String, project: String },
}

impl WtmuxError for ProjectError {
    fn error_code(&self) -> &'static str {
        match self {
            ProjectError::AlreadyExists { .. } => "PROJECT_ALREADY_EXISTS",
            ProjectError::NotFound { .. } => "PROJECT_NOT_FOUND",
            ProjectError::WorktreeAlreadyRegistered { .. } => "WORKTREE_ALREADY_REGISTERED",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}
