//! Fluent builders over a machine's registry.
//!
//! [`StateMachine::state`](crate::engine::StateMachine::state) and
//! [`StateMachine::wire`](crate::engine::StateMachine::wire) get or create
//! the entry and hand back one of these builders. Builders hold only the
//! machine reference and the entry's key; every setter writes straight
//! into the registry.

mod state;
mod wire;

pub use state::StateBuilder;
pub use wire::WireBuilder;
