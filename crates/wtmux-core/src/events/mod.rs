//! Application lifecycle log events shared by the CLI and the control loop.

use tracing::{error, info};

pub fn log_app_startup(command: &str) {
    info!(
        event = "core.app.startup_completed",
        version = env!("CARGO_PKG_VERSION"),
        command = command
    );
}

/// `stopped` is the number of sessions terminated on the way out.
pub fn log_app_shutdown(stopped: usize) {
    info!(event = "core.app.shutdown_completed", stopped_sessions = stopped);
}

pub fn log_app_error(error: &dyn std::error::Error) {
    error!(
        event = "core.app.error_occurred",
        error = %error,
        error_type = std::any::type_name_of_val(error)
    );
}
