//! Errors returned by the engine.

use crate::core::{Phase, StateKey};
use thiserror::Error;

/// Failures that escape a flush.
///
/// Callback faults are contained and never show up here. The only thing
/// that does is an error handler failing while handling one.
#[derive(Debug, Error)]
pub enum EngineError<K: StateKey> {
    #[error("Error handler of state {state:?} failed while handling a fault during {phase}: {error:#}")]
    HandlerFailed {
        state: K,
        phase: Phase,
        error: anyhow::Error,
    },
}

/// Reasons a transition request was not accepted.
#[derive(Debug, Error)]
pub enum TransitionError<K: StateKey> {
    #[error("Transition to {pending:?} is already pending")]
    Busy { pending: K },

    #[error("Wire ({from:?} -> {to:?}) is not declared")]
    NoSuchWire { from: K, to: K },

    #[error("Wire ({from:?} -> {to:?}) condition not satisfied")]
    ConditionNotMet { from: K, to: K },

    #[error("Cannot request a transition to {requested:?} during {phase}")]
    InvalidPhase { phase: Phase, requested: K },

    #[error("State {key:?} is not registered")]
    UnknownState { key: K },

    #[error(transparent)]
    Engine(#[from] EngineError<K>),
}

impl<K: StateKey> TransitionError<K> {
    /// Whether the error indicates a configuration bug or a double fault
    /// rather than a guard doing its job.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnknownState { .. } | Self::Engine(_))
    }
}
