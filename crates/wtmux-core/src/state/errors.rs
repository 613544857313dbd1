use crate::errors::WtmuxError;
use crate::projects::ProjectError;
use crate::sessions::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error("Control loop is not running")]
    ControlLoopClosed,
}

impl WtmuxError for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            DispatchError::Session(e) => e.error_code(),
            DispatchError::Project(e) => e.error_code(),
            DispatchError::ControlLoopClosed => "CONTROL_LOOP_CLOSED",
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            DispatchError::Session(e) => e.is_user_error(),
            DispatchError::Project(e) => e.is_user_error(),
            DispatchError::ControlLoopClosed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_from_session_error() {
        let dispatch_err = DispatchError::from(SessionError::TitleTaken {
            title: "Server".to_string(),
        });
        assert_eq!(dispatch_err.error_code(), "SESSION_TITLE_TAKEN");
        assert!(dispatch_err.is_user_error());
        assert_eq!(
            dispatch_err.to_string(),
            "Title 'Server' is already used in this tab group"
        );
    }

    #[test]
    fn test_dispatch_error_from_project_error() {
        let dispatch_err = DispatchError::from(ProjectError::NotFound {
            id: "app".to_string(),
        });
        assert_eq!(dispatch_err.error_code(), "PROJECT_NOT_FOUND");
        assert!(dispatch_err.is_user_error());
    }

    #[test]
    fn test_control_loop_closed_is_system_error() {
        let err = DispatchError::ControlLoopClosed;
        assert_eq!(err.error_code(), "CONTROL_LOOP_CLOSED");
        assert!(!err.is_user_error());
    }
}
