//! Data model of a state machine.
//!
//! This module contains the passive parts of the engine:
//! - State identities via the `StateKey` trait and the engine `Phase`
//! - States with their lifecycle `Hooks`
//! - Wires guarded by optional `Condition`s
//! - The `Registry` owning both, with its `NodeFactory` extension point
//!
//! Nothing here runs callbacks; execution lives in [`crate::engine`].

mod condition;
mod key;
mod registry;
mod state;
mod wire;

pub use condition::Condition;
pub use key::{Phase, StateKey};
pub use registry::{DefaultFactory, GraphIssue, NodeFactory, Registry};
pub use state::{Callback, ErrorHandler, Hooks, State, StateNode};
pub use wire::{Wire, WireNode};
