use crate::errors::WtmuxError;

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("Failed to read status file '{path}': {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write status file '{path}': {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed status payload: {message}")]
    Malformed { message: String },

    #[error("Failed to watch '{path}': {message}")]
    WatchFailed { path: String, message: String },
}

impl WtmuxError for StatusError {
    fn error_code(&self) -> &'static str {
        match self {
            StatusError::ReadFailed { .. } => "STATUS_READ_FAILED",
            StatusError::WriteFailed { .. } => "STATUS_WRITE_FAILED",
            StatusError::Malformed { .. } => "STATUS_MALFORMED",
            StatusError::WatchFailed { .. } => "STATUS_WATCH_FAILED",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, StatusError::Malformed { .. })
    }
}
