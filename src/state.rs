use std::collections::HashMap;
use std::fmt;

pub type ActionError = Box<dyn std::error::Error + Send + Sync>;

/// A side-effecting fixture callback supplied by the provider's test suite.
pub type Action = Box<dyn Fn() -> Result<(), ActionError> + Send + Sync>;

struct StateAction {
    setup: Action,
    teardown: Action,
}

/// Maps provider-state labels to the setup/teardown pair that arranges the
/// corresponding fixture. Built while the verifier is configured, read-only
/// once a run starts.
#[derive(Default)]
pub struct StateCoordinator {
    actions: HashMap<String, StateAction>,
}

impl StateCoordinator {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Registers a setup/teardown pair for a provider-state label.
    ///
    /// Empty labels are silently ignored so registration chains don't have
    /// to validate at call time; registering a label twice keeps the latest
    /// pair.
    pub fn register<S: Into<String>>(&mut self, label: S, setup: Action, teardown: Action) {
        let label = label.into();
        if !label.is_empty() {
            self.actions.insert(label, StateAction { setup, teardown });
        }
    }

    pub fn has_action(&self, label: &str) -> bool {
        self.actions.contains_key(label)
    }

    /// Runs the setup for the label. A label without a registered action is
    /// not an error: the interaction simply needs no fixture.
    pub fn setup(&self, label: &str) -> Result<(), ActionError> {
        match self.actions.get(label) {
            Some(action) => (action.setup)(),
            None => Ok(()),
        }
    }

    pub fn teardown(&self, label: &str) -> Result<(), ActionError> {
        match self.actions.get(label) {
            Some(action) => (action.teardown)(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for StateCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateCoordinator")
            .field("labels", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_action(counter: Arc<AtomicUsize>) -> Action {
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn noop_action() -> Action {
        Box::new(|| Ok(()))
    }

    #[test]
    fn empty_labels_are_ignored() {
        let mut coordinator = StateCoordinator::new();
        coordinator.register("", noop_action(), noop_action());

        assert!(!coordinator.has_action(""));
    }

    #[test]
    fn the_last_registration_for_a_label_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut coordinator = StateCoordinator::new();
        coordinator.register(
            "data exists",
            counting_action(first.clone()),
            noop_action(),
        );
        coordinator.register(
            "data exists",
            counting_action(second.clone()),
            noop_action(),
        );

        coordinator.setup("data exists").unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_labels_are_a_no_op() {
        let coordinator = StateCoordinator::new();

        assert!(coordinator.setup("nobody registered this").is_ok());
        assert!(coordinator.teardown("nobody registered this").is_ok());
    }

    #[test]
    fn setup_failures_propagate() {
        let mut coordinator = StateCoordinator::new();
        coordinator.register(
            "broken fixture",
            Box::new(|| Err("database is down".into())),
            noop_action(),
        );

        let error = coordinator.setup("broken fixture").unwrap_err();
        assert_eq!(error.to_string(), "database is down");
    }
}
