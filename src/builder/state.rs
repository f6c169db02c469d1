//! Fluent configuration of a single state.

use crate::core::{Hooks, NodeFactory, StateKey, StateNode};
use crate::engine::{Fault, Machine, StateMachine};
use std::sync::Arc;

/// Assigns lifecycle callbacks to one state.
///
/// Each setter overwrites the previous callback of its kind; a state that
/// is currently active sees the new callback on its next invocation of
/// that phase.
pub struct StateBuilder<'m, K: StateKey, F: NodeFactory<K>> {
    machine: &'m StateMachine<K, F>,
    key: K,
}

impl<'m, K: StateKey, F: NodeFactory<K>> StateBuilder<'m, K, F> {
    pub(crate) fn new(machine: &'m StateMachine<K, F>, key: K) -> Self {
        Self { machine, key }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Set the callback run when the state becomes current.
    pub fn on_enter<C>(self, callback: C) -> Self
    where
        C: Fn(&dyn Machine<K>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.edit(|hooks| hooks.on_enter = Some(Arc::new(callback)));
        self
    }

    /// Set the callback run on each `update()` while the state is current.
    pub fn on_update<C>(self, callback: C) -> Self
    where
        C: Fn(&dyn Machine<K>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.edit(|hooks| hooks.on_update = Some(Arc::new(callback)));
        self
    }

    /// Set the callback run when the state is left.
    pub fn on_exit<C>(self, callback: C) -> Self
    where
        C: Fn(&dyn Machine<K>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.edit(|hooks| hooks.on_exit = Some(Arc::new(callback)));
        self
    }

    /// Set the handler receiving faults raised by this state's callbacks.
    pub fn on_error<H>(self, handler: H) -> Self
    where
        H: Fn(&dyn Machine<K>, &Fault<K>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.edit(|hooks| hooks.on_error = Some(Arc::new(handler)));
        self
    }

    /// Mutate the underlying state, e.g. a custom state type's own fields.
    ///
    /// `f` runs while the registry is locked and must not call back into
    /// the machine; doing so deadlocks. Read back with
    /// [`StateMachine::inspect_state`], which has no such restriction.
    pub fn configure(self, f: impl FnOnce(&mut F::State)) -> Self {
        self.machine
            .with_registry(|registry| f(registry.get_or_create_state(self.key.clone())));
        self
    }

    fn edit(&self, f: impl FnOnce(&mut Hooks<K>)) {
        self.machine.with_registry(|registry| {
            f(registry.get_or_create_state(self.key.clone()).hooks_mut())
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{Phase, StateNode};
    use crate::engine::{StateMachine, TransitionMode};
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn setters_fill_their_slot() {
        let machine: StateMachine<u8> = StateMachine::new(TransitionMode::Immediate, false);

        machine
            .state(1)
            .on_enter(|_| Ok(()))
            .on_exit(|_| Ok(()))
            .on_error(|_, _| Ok(()));

        let slots = machine
            .inspect_state(&1, |state| {
                let hooks = state.hooks();
                (
                    hooks.callback(Phase::Entering).is_some(),
                    hooks.callback(Phase::Updating).is_some(),
                    hooks.callback(Phase::Exiting).is_some(),
                    hooks.has_error_handler(),
                )
            })
            .unwrap();
        assert_eq!(slots, (true, false, true, true));
    }

    #[test]
    fn last_assignment_wins() {
        let machine: StateMachine<u8> = StateMachine::new(TransitionMode::Queued, false);
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        let second = Arc::clone(&log);
        machine
            .state(1)
            .on_enter(move |_| {
                first.lock().push("first");
                Ok(())
            })
            .on_enter(move |_| {
                second.lock().push("second");
                Ok(())
            });

        machine.request_transition(1).unwrap();
        machine.update().unwrap();

        assert_eq!(*log.lock(), vec!["second"]);
    }

    #[test]
    fn state_call_is_idempotent() {
        let machine: StateMachine<u8> = StateMachine::new(TransitionMode::Queued, false);

        let key = *machine.state(3).key();
        machine.state(3);

        assert_eq!(key, 3);
        assert_eq!(machine.state_count(), 1);
    }
}
