//! The transition engine.
//!
//! This module runs the machine described by [`crate::core`]:
//!
//! - **Requests**: `request_transition` validates and records transitions,
//!   in queued or immediate mode
//! - **Flush**: `update` commits pending transitions as Exit/Enter pairs,
//!   following chains requested from enter callbacks, or runs Update
//! - **Failure isolation**: every callback is wrapped; faults go to the
//!   state's error handler or to the unhandled-fault channel
//!
//! # Concurrency
//!
//! Each machine has its own flush lock. Immediate-mode requests take it,
//! re-entering freely from callbacks on the flushing thread; queued-mode
//! requests never wait on it. User code never runs while the registry or
//! core state is locked.

mod config;
mod error;
mod fault;
mod machine;
mod snapshot;

pub use config::{MachineConfig, TransitionMode};
pub use error::{EngineError, TransitionError};
pub use fault::Fault;
pub use machine::{Machine, StateMachine};
pub use snapshot::MachineSnapshot;
