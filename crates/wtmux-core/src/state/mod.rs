pub mod dispatch;
pub mod errors;
pub mod events;
pub mod store;
pub mod types;

pub use dispatch::{AppStore, PaneAttachment};
pub use errors::DispatchError;
pub use events::{Event, StateSnapshot};
pub use store::Store;
pub use types::Command;
