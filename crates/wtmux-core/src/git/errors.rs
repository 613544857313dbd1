use crate::errors::WtmuxError;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("Repository not found at path: {path}")]
    RepositoryNotFound { path: String },

    #[error("Git2 library error: {source}")]
    Git2Error {
        #[from]
        source: git2::Error,
    },
}

impl WtmuxError for GitError {
    fn error_code(&self) -> &'static str {
        match self {
            GitError::RepositoryNotFound { .. } => "REPOSITORY_NOT_FOUND",
            GitError::Git2Error { .. } => "GIT2_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, GitError::RepositoryNotFound { .. })
    }
}
