//! State identities and engine execution phases.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;

/// Identity of a state within one machine.
///
/// Any cheap, comparable, hashable value works as a key; an enum of
/// unit variants is the usual choice. The trait is implemented for every
/// type meeting the bounds, so there is nothing to derive.
///
/// The engine never assumes a "default" key: the absence of a current
/// state is always an explicit `None`.
///
/// # Example
///
/// ```rust
/// use wirestate::core::StateKey;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// fn accepts_key<K: StateKey>(_key: K) {}
/// accepts_key(Door::Open);
/// accepts_key("closed");
/// ```
pub trait StateKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> StateKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// Which lifecycle step the engine is currently running.
///
/// Outside of `update()` and immediate-mode flushes the phase is always
/// [`Phase::Idle`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Entering,
    Updating,
    Exiting,
}

impl Phase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Entering => "enter",
            Self::Updating => "update",
            Self::Exiting => "exit",
        };
        f.write_str(name)
    }
}
