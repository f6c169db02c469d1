//! Ownership of a machine's states and wires.
//!
//! The registry lazily creates entries the first time a key (or key pair)
//! is referenced, through a [`NodeFactory`] so callers can substitute their
//! own state and wire types.

use super::key::StateKey;
use super::state::{State, StateNode};
use super::wire::{Wire, WireNode};
use std::collections::HashMap;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Constructs states and wires on first reference.
pub trait NodeFactory<K: StateKey>: Send + Sync + 'static {
    type State: StateNode<K>;
    type Wire: WireNode<K>;

    fn create_state(&self, key: &K) -> Self::State;
    fn create_wire(&self, from: &K, to: &K) -> Self::Wire;
}

/// Factory producing the plain [`State`] and [`Wire`] types.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFactory;

impl<K: StateKey> NodeFactory<K> for DefaultFactory {
    type State = State<K>;
    type Wire = Wire<K>;

    fn create_state(&self, key: &K) -> State<K> {
        State::new(key.clone())
    }

    fn create_wire(&self, from: &K, to: &K) -> Wire<K> {
        Wire::new(from.clone(), to.clone())
    }
}

/// Problems found in a wire graph by [`Registry::validate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphIssue<K: StateKey> {
    #[error("Wire ({from:?} -> {to:?}) references unregistered state {missing:?}")]
    DanglingEndpoint { from: K, to: K, missing: K },

    #[error("Wire ({key:?} -> {key:?}) can never be traversed")]
    SelfLoop { key: K },
}

/// Maps keys to states and ordered key pairs to wires.
pub struct Registry<K: StateKey, F: NodeFactory<K> = DefaultFactory> {
    factory: F,
    states: HashMap<K, F::State>,
    wires: HashMap<(K, K), F::Wire>,
}

impl<K: StateKey, F: NodeFactory<K>> Registry<K, F> {
    /// Create an empty registry building entries with `factory`.
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            states: HashMap::new(),
            wires: HashMap::new(),
        }
    }

    /// Return the state for `key`, creating it if this is the first reference.
    pub fn get_or_create_state(&mut self, key: K) -> &mut F::State {
        let factory = &self.factory;
        self.states
            .entry(key)
            .or_insert_with_key(|key| factory.create_state(key))
    }

    /// Return the wire `from -> to`, creating it if this is the first reference.
    ///
    /// Endpoints do not need registered states.
    pub fn get_or_create_wire(&mut self, from: K, to: K) -> &mut F::Wire {
        let factory = &self.factory;
        self.wires
            .entry((from, to))
            .or_insert_with_key(|(from, to)| factory.create_wire(from, to))
    }

    /// Look up a state without creating it.
    pub fn state(&self, key: &K) -> Option<&F::State> {
        self.states.get(key)
    }

    /// Look up a wire without creating it.
    pub fn wire(&self, from: &K, to: &K) -> Option<&F::Wire> {
        self.wires.get(&(from.clone(), to.clone()))
    }

    /// Whether `key` has a state.
    pub fn contains_state(&self, key: &K) -> bool {
        self.states.contains_key(key)
    }

    /// Whether the wire `from -> to` exists.
    pub fn contains_wire(&self, from: &K, to: &K) -> bool {
        self.wire(from, to).is_some()
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Number of wires.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Check the wire graph, accumulating every issue instead of stopping
    /// at the first.
    ///
    /// A dangling endpoint means a request across that wire would fail with
    /// `UnknownState`; a self-loop can never fire because self-requests are
    /// swallowed.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<GraphIssue<K>>> {
        let mut checks: Vec<Validation<(), NonEmptyVec<GraphIssue<K>>>> = Vec::new();

        for (from, to) in self.wires.keys() {
            if from == to {
                checks.push(Validation::fail(GraphIssue::SelfLoop { key: from.clone() }));
                continue;
            }

            for endpoint in [from, to] {
                let check = if self.states.contains_key(endpoint) {
                    Validation::success(())
                } else {
                    Validation::fail(GraphIssue::DanglingEndpoint {
                        from: from.clone(),
                        to: to.clone(),
                        missing: endpoint.clone(),
                    })
                };
                checks.push(check);
            }
        }

        Validation::all_vec(checks).map(|_| ())
    }
}

impl<K: StateKey, F: NodeFactory<K> + Default> Default for Registry<K, F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Condition;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    enum TestState {
        Idle,
        Running,
        Stopped,
    }

    fn registry() -> Registry<TestState> {
        Registry::default()
    }

    #[test]
    fn get_or_create_state_is_idempotent() {
        let mut registry = registry();

        registry.get_or_create_state(TestState::Idle);
        registry.get_or_create_state(TestState::Idle);

        assert_eq!(registry.state_count(), 1);
        assert_eq!(
            registry.state(&TestState::Idle).map(|s| *s.key()),
            Some(TestState::Idle)
        );
    }

    #[test]
    fn wires_are_keyed_by_ordered_pair() {
        let mut registry = registry();

        registry.get_or_create_wire(TestState::Idle, TestState::Running);
        registry.get_or_create_wire(TestState::Running, TestState::Idle);
        registry.get_or_create_wire(TestState::Idle, TestState::Running);

        assert_eq!(registry.wire_count(), 2);
        assert!(registry.contains_wire(&TestState::Idle, &TestState::Running));
        assert!(!registry.contains_wire(&TestState::Idle, &TestState::Stopped));
    }

    #[test]
    fn wire_creation_does_not_register_states() {
        let mut registry = registry();

        registry.get_or_create_wire(TestState::Idle, TestState::Running);

        assert_eq!(registry.state_count(), 0);
        assert!(!registry.contains_state(&TestState::Running));
    }

    #[test]
    fn existing_wire_keeps_its_condition() {
        let mut registry = registry();

        registry
            .get_or_create_wire(TestState::Idle, TestState::Running)
            .set_condition(Some(Condition::new(|| false)));
        let wire = registry.get_or_create_wire(TestState::Idle, TestState::Running);

        assert!(wire.condition().is_some());
    }

    #[test]
    fn validate_accepts_fully_registered_graph() {
        let mut registry = registry();
        registry.get_or_create_state(TestState::Idle);
        registry.get_or_create_state(TestState::Running);
        registry.get_or_create_wire(TestState::Idle, TestState::Running);

        assert!(registry.validate().is_success());
    }

    #[test]
    fn validate_accumulates_all_issues() {
        let mut registry = registry();
        registry.get_or_create_state(TestState::Idle);
        registry.get_or_create_wire(TestState::Idle, TestState::Running);
        registry.get_or_create_wire(TestState::Stopped, TestState::Running);
        registry.get_or_create_wire(TestState::Idle, TestState::Idle);

        match registry.validate() {
            Validation::Failure(issues) => {
                // Idle->Running: Running missing; Stopped->Running: both missing; Idle->Idle: loop
                assert_eq!(issues.len(), 4);
                assert!(issues
                    .iter()
                    .any(|i| matches!(i, GraphIssue::SelfLoop { key: TestState::Idle })));
                assert_eq!(
                    issues
                        .iter()
                        .filter(|i| matches!(
                            i,
                            GraphIssue::DanglingEndpoint {
                                missing: TestState::Running,
                                ..
                            }
                        ))
                        .count(),
                    2
                );
            }
            Validation::Success(_) => panic!("Expected graph issues"),
        }
    }

    struct TaggedFactory;

    struct TaggedState {
        key: TestState,
        hooks: crate::core::Hooks<TestState>,
        tag: String,
    }

    impl StateNode<TestState> for TaggedState {
        fn key(&self) -> &TestState {
            &self.key
        }
        fn hooks(&self) -> &crate::core::Hooks<TestState> {
            &self.hooks
        }
        fn hooks_mut(&mut self) -> &mut crate::core::Hooks<TestState> {
            &mut self.hooks
        }
    }

    impl NodeFactory<TestState> for TaggedFactory {
        type State = TaggedState;
        type Wire = Wire<TestState>;

        fn create_state(&self, key: &TestState) -> TaggedState {
            TaggedState {
                key: *key,
                hooks: Default::default(),
                tag: format!("{key:?}").to_lowercase(),
            }
        }

        fn create_wire(&self, from: &TestState, to: &TestState) -> Wire<TestState> {
            Wire::new(*from, *to)
        }
    }

    #[test]
    fn custom_factory_builds_custom_states() {
        let mut registry = Registry::new(TaggedFactory);

        let state = registry.get_or_create_state(TestState::Stopped);

        assert_eq!(state.tag, "stopped");
    }
}
