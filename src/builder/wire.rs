//! Fluent configuration of a single wire.

use crate::core::{Condition, NodeFactory, StateKey, WireNode};
use crate::engine::StateMachine;

/// Assigns the condition of one wire.
pub struct WireBuilder<'m, K: StateKey, F: NodeFactory<K>> {
    machine: &'m StateMachine<K, F>,
    from: K,
    to: K,
}

impl<'m, K: StateKey, F: NodeFactory<K>> WireBuilder<'m, K, F> {
    pub(crate) fn new(machine: &'m StateMachine<K, F>, from: K, to: K) -> Self {
        Self { machine, from, to }
    }

    pub fn from(&self) -> &K {
        &self.from
    }

    pub fn to(&self) -> &K {
        &self.to
    }

    /// Guard the wire with a predicate, replacing any previous one.
    pub fn on_condition<P>(self, predicate: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.set_condition(Some(Condition::new(predicate)))
    }

    /// Make the wire unconditional again.
    pub fn unconditional(self) -> Self {
        self.set_condition(None)
    }

    /// Continue with the wire leaving this wire's target.
    pub fn wire(self, next: K) -> WireBuilder<'m, K, F> {
        self.machine.wire(self.to, next)
    }

    /// Mutate the underlying wire, e.g. a custom wire type's own fields.
    ///
    /// `f` runs while the registry is locked and must not call back into
    /// the machine; doing so deadlocks.
    pub fn configure(self, f: impl FnOnce(&mut F::Wire)) -> Self {
        self.machine.with_registry(|registry| {
            f(registry.get_or_create_wire(self.from.clone(), self.to.clone()))
        });
        self
    }

    fn set_condition(self, condition: Option<Condition>) -> Self {
        self.configure(|wire| wire.set_condition(condition))
    }
}
