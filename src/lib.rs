//! Wirestate: a frame-driven finite state machine engine
//!
//! A machine holds named states connected by directed, optionally guarded
//! wires, and drives exactly one active state at a time through an
//! Enter/Update/Exit lifecycle. An external driver calls `update()` on a
//! regular cadence; transitions may be requested at any time, including
//! from inside lifecycle callbacks.
//!
//! # Core Concepts
//!
//! - **State**: a key plus optional Enter/Update/Exit callbacks and an error handler
//! - **Wire**: a directed edge between two keys with an optional condition
//! - **Transition mode**: queued (committed on the next `update()`) or
//!   immediate (validated against the wires and committed right away)
//! - **Failure isolation**: a failing callback never leaves a transition
//!   half-committed; its fault goes to the state's handler or to the
//!   unhandled-fault channel
//!
//! # Example
//!
//! ```rust
//! use wirestate::engine::{StateMachine, TransitionMode};
//!
//! #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
//! enum Door {
//!     Closed,
//!     Open,
//! }
//!
//! let door = StateMachine::new(TransitionMode::Queued, false);
//! door.state(Door::Closed);
//! door.state(Door::Open)
//!     .on_enter(|_| Ok(()))
//!     .on_update(|machine| {
//!         machine.request_transition(Door::Closed)?;
//!         Ok(())
//!     });
//!
//! door.request_transition(Door::Open).unwrap();
//! door.update().unwrap(); // enters Open
//! door.update().unwrap(); // Open's update asks to close
//! door.update().unwrap(); // commits Open -> Closed
//!
//! assert_eq!(door.current_key(), Some(Door::Closed));
//! assert_eq!(door.previous_key(), Some(Door::Open));
//! ```

pub mod builder;
pub mod core;
pub mod engine;
pub mod events;
pub mod runner;

// Re-export commonly used types
pub use crate::builder::{StateBuilder, WireBuilder};
pub use crate::core::{Condition, Phase, StateKey};
pub use crate::engine::{
    EngineError, Fault, Machine, MachineConfig, StateMachine, TransitionError, TransitionMode,
};
pub use crate::events::{EventBus, StateChange, SubscriptionId};
pub use crate::runner::{Runner, Tick};
