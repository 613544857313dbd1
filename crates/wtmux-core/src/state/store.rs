use super::events::Event;
use super::types::Command;

/// Trait for dispatching commands against the app state.
///
/// # Semantics
///
/// - **Ordering**: commands execute in the order received, one at a time.
/// - **Errors**: user errors (duplicate ids, taken titles) come back as
///   `Err`. Commands naming ids that no longer exist are not errors: they
///   are logged and return no events.
/// - **Events**: on success, dispatch returns the events describing what
///   changed, in order. A refused or no-op command returns an empty vector.
pub trait Store {
    type Error;
    fn dispatch(&mut self, cmd: Command) -> Result<Vec<Event>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_trait_is_implementable() {
        struct EchoStore;
        impl Store for EchoStore {
            type Error = String;
            fn dispatch(&mut self, cmd: Command) -> Result<Vec<Event>, String> {
                match cmd {
                    Command::Snapshot => Ok(Vec::new()),
                    _ => Err("unsupported".to_string()),
                }
            }
        }
        let mut store = EchoStore;
        assert!(store.dispatch(Command::Snapshot).unwrap().is_empty());
        assert!(store.dispatch(Command::CancelDrag).is_err());
    }
}
