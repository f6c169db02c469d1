//! Callback faults and their containment.

use crate::core::{Callback, Phase, StateKey};
use crate::engine::Machine;
use anyhow::anyhow;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// A lifecycle callback that returned an error or panicked.
///
/// `state` is the state whose callback failed: the outgoing state for an
/// exit, the incoming one for an enter, the current one for an update.
#[derive(Debug)]
pub struct Fault<K> {
    pub state: K,
    pub phase: Phase,
    pub error: anyhow::Error,
}

impl<K: StateKey> fmt::Display for Fault<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "State {:?} failed during {}: {:#}",
            self.state, self.phase, self.error
        )
    }
}

/// Run a callback, turning a panic into an error.
pub(crate) fn invoke<K: StateKey>(
    callback: &Callback<K>,
    machine: &dyn Machine<K>,
) -> anyhow::Result<()> {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(machine))) {
        Ok(result) => result,
        Err(payload) => Err(anyhow!("callback panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
