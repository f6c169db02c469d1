//! Directed edges between states.

use super::condition::Condition;
use super::key::StateKey;

/// Minimal view of a wire the engine depends on.
pub trait WireNode<K: StateKey>: Send + Sync + 'static {
    fn from(&self) -> &K;
    fn to(&self) -> &K;
    fn condition(&self) -> Option<&Condition>;
    fn set_condition(&mut self, condition: Option<Condition>);
}

/// The default wire: an ordered pair of keys and an optional condition.
///
/// A wire without a condition is always passable.
#[derive(Clone, Debug)]
pub struct Wire<K> {
    from: K,
    to: K,
    condition: Option<Condition>,
}

impl<K: StateKey> Wire<K> {
    pub fn new(from: K, to: K) -> Self {
        Self {
            from,
            to,
            condition: None,
        }
    }

    /// Evaluate the condition, treating a missing one as satisfied.
    pub fn is_passable(&self) -> bool {
        self.condition.as_ref().is_none_or(Condition::check)
    }
}

impl<K: StateKey> WireNode<K> for Wire<K> {
    fn from(&self) -> &K {
        &self.from
    }

    fn to(&self) -> &K {
        &self.to
    }

    fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    fn set_condition(&mut self, condition: Option<Condition>) {
        self.condition = condition;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconditional_wire_is_passable() {
        let wire = Wire::new("a", "b");

        assert_eq!(wire.from(), &"a");
        assert_eq!(wire.to(), &"b");
        assert!(wire.condition().is_none());
        assert!(wire.is_passable());
    }

    #[test]
    fn condition_gates_passability() {
        let mut wire = Wire::new(1, 2);
        wire.set_condition(Some(Condition::new(|| false)));
        assert!(!wire.is_passable());

        wire.set_condition(Some(Condition::new(|| true)));
        assert!(wire.is_passable());

        wire.set_condition(None);
        assert!(wire.is_passable());
    }
}
