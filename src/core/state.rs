//! States and their lifecycle hooks.

use super::key::{Phase, StateKey};
use crate::engine::{Fault, Machine};
use std::fmt;
use std::sync::Arc;

/// Enter/Update/Exit callback.
///
/// Callbacks receive the machine they run on, so they can request
/// transitions without owning a handle to it. Returning `Err` (or
/// panicking) raises a [`Fault`] that the engine contains.
pub type Callback<K> = Arc<dyn Fn(&dyn Machine<K>) -> anyhow::Result<()> + Send + Sync>;

/// Per-state fault handler.
///
/// An `Err` from the handler is a double fault and is returned to whoever
/// drove the flush.
pub type ErrorHandler<K> =
    Arc<dyn Fn(&dyn Machine<K>, &Fault<K>) -> anyhow::Result<()> + Send + Sync>;

/// The lifecycle callbacks attached to one state.
///
/// Every slot is optional and may be reassigned at any time; the engine
/// reads the slot right before each invocation, so a reassignment affects
/// the next call of that phase only.
pub struct Hooks<K> {
    pub(crate) on_enter: Option<Callback<K>>,
    pub(crate) on_update: Option<Callback<K>>,
    pub(crate) on_exit: Option<Callback<K>>,
    pub(crate) on_error: Option<ErrorHandler<K>>,
}

impl<K> Hooks<K> {
    /// The callback that runs for `phase`, if any.
    pub fn callback(&self, phase: Phase) -> Option<Callback<K>> {
        match phase {
            Phase::Entering => self.on_enter.clone(),
            Phase::Updating => self.on_update.clone(),
            Phase::Exiting => self.on_exit.clone(),
            Phase::Idle => None,
        }
    }

    /// The handler receiving this state's faults, if any.
    pub fn error_handler(&self) -> Option<ErrorHandler<K>> {
        self.on_error.clone()
    }

    pub fn has_error_handler(&self) -> bool {
        self.on_error.is_some()
    }
}

impl<K> Clone for Hooks<K> {
    fn clone(&self) -> Self {
        Self {
            on_enter: self.on_enter.clone(),
            on_update: self.on_update.clone(),
            on_exit: self.on_exit.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<K> Default for Hooks<K> {
    fn default() -> Self {
        Self {
            on_enter: None,
            on_update: None,
            on_exit: None,
            on_error: None,
        }
    }
}

impl<K> fmt::Debug for Hooks<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_update", &self.on_update.is_some())
            .field("on_exit", &self.on_exit.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Minimal view of a state the engine depends on.
///
/// Implement this for a richer state type and hand the machine a
/// [`NodeFactory`](super::NodeFactory) producing it.
///
/// # Example
///
/// ```rust
/// use wirestate::core::{Hooks, StateNode};
///
/// struct Scene {
///     key: &'static str,
///     hooks: Hooks<&'static str>,
///     music: Option<String>,
/// }
///
/// impl StateNode<&'static str> for Scene {
///     fn key(&self) -> &&'static str {
///         &self.key
///     }
///     fn hooks(&self) -> &Hooks<&'static str> {
///         &self.hooks
///     }
///     fn hooks_mut(&mut self) -> &mut Hooks<&'static str> {
///         &mut self.hooks
///     }
/// }
/// ```
pub trait StateNode<K: StateKey>: Send + Sync + 'static {
    fn key(&self) -> &K;
    fn hooks(&self) -> &Hooks<K>;
    fn hooks_mut(&mut self) -> &mut Hooks<K>;
}

/// The default state: a key and its hooks, nothing else.
#[derive(Clone, Debug)]
pub struct State<K> {
    key: K,
    hooks: Hooks<K>,
}

impl<K: StateKey> State<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            hooks: Hooks::default(),
        }
    }
}

impl<K: StateKey> StateNode<K> for State<K> {
    fn key(&self) -> &K {
        &self.key
    }

    fn hooks(&self) -> &Hooks<K> {
        &self.hooks
    }

    fn hooks_mut(&mut self) -> &mut Hooks<K> {
        &mut self.hooks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_has_no_hooks() {
        let state = State::new("idle");

        assert_eq!(state.key(), &"idle");
        for phase in [Phase::Entering, Phase::Updating, Phase::Exiting, Phase::Idle] {
            assert!(state.hooks().callback(phase).is_none());
        }
        assert!(!state.hooks().has_error_handler());
    }

    #[test]
    fn callback_is_selected_by_phase() {
        let mut state = State::new(1u8);
        state.hooks_mut().on_exit = Some(Arc::new(|_: &dyn Machine<u8>| -> anyhow::Result<()> { Ok(()) }));

        assert!(state.hooks().callback(Phase::Exiting).is_some());
        assert!(state.hooks().callback(Phase::Entering).is_none());
        assert!(state.hooks().callback(Phase::Idle).is_none());
    }

    #[test]
    fn debug_lists_assigned_slots() {
        let mut hooks: Hooks<u8> = Hooks::default();
        hooks.on_update = Some(Arc::new(|_: &dyn Machine<u8>| -> anyhow::Result<()> { Ok(()) }));

        let rendered = format!("{hooks:?}");
        assert!(rendered.contains("on_update: true"));
        assert!(rendered.contains("on_enter: false"));
    }
}
