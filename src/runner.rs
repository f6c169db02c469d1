//! Explicit fan-out of driver ticks to several machines.
//!
//! The embedding application owns one [`Runner`], registers each machine
//! with it, and calls [`Runner::tick_all`] once per frame.

use crate::core::{NodeFactory, StateKey};
use crate::engine::StateMachine;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything a [`Runner`] can drive.
pub trait Tick: Send + Sync {
    fn tick(&self) -> anyhow::Result<()>;
}

impl<K: StateKey, F: NodeFactory<K>> Tick for StateMachine<K, F> {
    fn tick(&self) -> anyhow::Result<()> {
        self.update()?;
        Ok(())
    }
}

/// Handle returned by [`Runner::add`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RunnerHandle(u64);

/// Ordered set of registered machines.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use wirestate::engine::{StateMachine, TransitionMode};
/// use wirestate::runner::Runner;
///
/// let machine = Arc::new(StateMachine::<u8>::new(TransitionMode::Queued, false));
/// machine.state(1);
/// machine.request_transition(1).unwrap();
///
/// let mut runner = Runner::new();
/// let handle = runner.add(machine.clone());
/// assert!(runner.tick_all().is_empty());
/// assert_eq!(machine.current_key(), Some(1));
///
/// assert!(runner.remove(handle));
/// assert!(runner.is_empty());
/// ```
#[derive(Default)]
pub struct Runner {
    next_handle: u64,
    entries: Vec<(RunnerHandle, Arc<dyn Tick>)>,
}

impl Runner {
    /// Create an empty runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a machine; it is ticked after every machine added before it.
    pub fn add(&mut self, machine: Arc<dyn Tick>) -> RunnerHandle {
        let handle = RunnerHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.push((handle, machine));
        debug!(handle = handle.0, registered = self.entries.len(), "Machine added to runner");
        handle
    }

    /// Unregister a machine. Returns `false` if the handle is unknown.
    pub fn remove(&mut self, handle: RunnerHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != handle);
        self.entries.len() != before
    }

    /// Number of registered machines.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tick every machine in registration order.
    ///
    /// A failing machine does not stop the others; all failures are returned.
    pub fn tick_all(&self) -> Vec<anyhow::Error> {
        let mut failures = Vec::new();
        for (handle, machine) in &self.entries {
            if let Err(error) = machine.tick() {
                warn!(handle = handle.0, error = %error, "Machine tick failed");
                failures.push(error);
            }
        }
        failures
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("machines", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Phase;
    use crate::engine::{EngineError, TransitionMode};
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        ticks: AtomicUsize,
        fail: bool,
    }

    impl Tick for Counter {
        fn tick(&self) -> anyhow::Result<()> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("counter failed"));
            }
            Ok(())
        }
    }

    fn counter(fail: bool) -> Arc<Counter> {
        Arc::new(Counter {
            ticks: AtomicUsize::new(0),
            fail,
        })
    }

    #[test]
    fn failures_do_not_stop_other_machines() {
        let failing = counter(true);
        let healthy = counter(false);
        let mut runner = Runner::new();
        runner.add(failing.clone());
        runner.add(healthy.clone());

        let failures = runner.tick_all();

        assert_eq!(failures.len(), 1);
        assert_eq!(failing.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(healthy.ticks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_fault_is_reported_and_others_still_tick() {
        let broken: Arc<StateMachine<&'static str>> =
            Arc::new(StateMachine::new(TransitionMode::Queued, false));
        broken
            .state("loading")
            .on_update(|_| Err(anyhow!("asset missing")))
            .on_error(|_, _| Err(anyhow!("fallback missing too")));
        broken.request_transition("loading").unwrap();
        broken.update().unwrap();
        let healthy = counter(false);

        let mut runner = Runner::new();
        runner.add(broken.clone());
        runner.add(healthy.clone());
        let failures = runner.tick_all();

        assert_eq!(failures.len(), 1);
        let failure = failures[0]
            .downcast_ref::<EngineError<&'static str>>()
            .expect("engine error");
        assert!(matches!(
            failure,
            EngineError::HandlerFailed {
                state: "loading",
                phase: Phase::Updating,
                ..
            }
        ));
        assert_eq!(healthy.ticks.load(Ordering::SeqCst), 1);
        assert_eq!(broken.phase(), Phase::Idle);
    }

    #[test]
    fn removed_machines_are_not_ticked() {
        let machine = counter(false);
        let mut runner = Runner::new();
        let handle = runner.add(machine.clone());

        assert!(runner.remove(handle));
        assert!(!runner.remove(handle));
        runner.tick_all();

        assert_eq!(machine.ticks.load(Ordering::SeqCst), 0);
        assert_eq!(runner.len(), 0);
    }
}
