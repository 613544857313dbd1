pub mod backend;
pub mod conflicts;
pub mod errors;
pub mod ports;
pub mod pty;
pub mod registry;
pub mod runners;
pub mod types;

pub use backend::{ProcessBackend, ProcessExit, SpawnRequest, SpawnedProcess};
pub use conflicts::{Conflict, LaunchDecision, PendingLaunch};
pub use errors::{PortError, SessionError};
pub use ports::{PortScanner, SystemPortScanner};
pub use pty::PtyBackend;
pub use registry::SessionRegistry;
pub use runners::{RunnerPlan, RunnerSelection};
pub use types::{
    NewSession, Session, SessionId, SessionKind, SessionState, StartOutcome, TabScope,
};
