//! The transition engine and its update/flush loop.

use crate::builder::{StateBuilder, WireBuilder};
use crate::core::{
    Condition, DefaultFactory, GraphIssue, NodeFactory, Phase, Registry, StateKey, StateNode,
    WireNode,
};
use crate::engine::config::{MachineConfig, TransitionMode};
use crate::engine::error::{EngineError, TransitionError};
use crate::engine::fault::{self, Fault};
use crate::engine::snapshot::MachineSnapshot;
use crate::events::{EventBus, StateChange, SubscriptionId};
use chrono::Utc;
use parking_lot::{Mutex, ReentrantMutex};
use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Object-safe view of a running machine, handed to every callback.
pub trait Machine<K: StateKey>: Send + Sync {
    fn request_transition(&self, next: K) -> Result<(), TransitionError<K>>;
    fn current_key(&self) -> Option<K>;
    fn pending_key(&self) -> Option<K>;
    fn previous_key(&self) -> Option<K>;
    fn phase(&self) -> Phase;
}

struct Core<K> {
    current: Option<K>,
    previous: Option<K>,
    pending: Option<K>,
    phase: Phase,
    /// Thread running the active flush, if any.
    flushing: Option<ThreadId>,
    commits: u64,
}

impl<K> Default for Core<K> {
    fn default() -> Self {
        Self {
            current: None,
            previous: None,
            pending: None,
            phase: Phase::Idle,
            flushing: None,
            commits: 0,
        }
    }
}

/// A finite state machine driving one active state at a time.
///
/// States and wires are declared through [`state`](Self::state) and
/// [`wire`](Self::wire). An external driver calls [`update`](Self::update)
/// periodically; transitions may be requested at any time, including from
/// inside lifecycle callbacks.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use wirestate::engine::{StateMachine, TransitionError, TransitionMode};
///
/// #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
/// enum Player {
///     Idle,
///     Running,
/// }
///
/// let machine = StateMachine::new(TransitionMode::Immediate, false);
/// machine.state(Player::Idle);
/// machine.state(Player::Running).on_enter(|_| Ok(()));
///
/// let moving = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&moving);
/// machine
///     .wire(Player::Idle, Player::Running)
///     .on_condition(move || flag.load(Ordering::SeqCst));
///
/// machine.request_transition(Player::Idle).unwrap();
/// assert!(matches!(
///     machine.request_transition(Player::Running),
///     Err(TransitionError::ConditionNotMet { .. })
/// ));
///
/// moving.store(true, Ordering::SeqCst);
/// machine.request_transition(Player::Running).unwrap();
/// machine.update().unwrap();
/// assert_eq!(machine.current_key(), Some(Player::Running));
/// ```
pub struct StateMachine<K: StateKey, F: NodeFactory<K> = DefaultFactory> {
    id: Uuid,
    config: MachineConfig,
    registry: Mutex<Registry<K, F>>,
    core: Mutex<Core<K>>,
    /// Held for the whole of a flush or update; counts nesting on the owning thread.
    flush: ReentrantMutex<Cell<usize>>,
    changed: EventBus<StateChange<K>>,
    unhandled: Arc<EventBus<Fault<K>>>,
}

impl<K: StateKey> StateMachine<K> {
    /// Create a machine using the plain state and wire types.
    pub fn new(mode: TransitionMode, overwrite: bool) -> Self {
        Self::with_config(MachineConfig::new(mode, overwrite))
    }

    /// Create a machine from a full [`MachineConfig`].
    pub fn with_config(config: MachineConfig) -> Self {
        Self::with_factory(config, DefaultFactory)
    }
}

impl<K: StateKey, F: NodeFactory<K>> StateMachine<K, F> {
    /// Create a machine whose states and wires are built by `factory`.
    pub fn with_factory(config: MachineConfig, factory: F) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            registry: Mutex::new(Registry::new(factory)),
            core: Mutex::new(Core::default()),
            flush: ReentrantMutex::new(Cell::new(0)),
            changed: EventBus::new(),
            unhandled: Arc::new(EventBus::new()),
        }
    }

    /// Route unhandled faults to a shared bus instead of a private one.
    pub fn with_unhandled_bus(mut self, bus: Arc<EventBus<Fault<K>>>) -> Self {
        self.unhandled = bus;
        self
    }

    /// Unique id of this machine, used in log fields and snapshots.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Settings the machine was built with.
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Get or create the state for `key` and return a builder for its hooks.
    pub fn state(&self, key: K) -> StateBuilder<'_, K, F> {
        self.registry.lock().get_or_create_state(key.clone());
        StateBuilder::new(self, key)
    }

    /// Get or create the wire `from -> to` and return a builder for its condition.
    pub fn wire(&self, from: K, to: K) -> WireBuilder<'_, K, F> {
        self.registry
            .lock()
            .get_or_create_wire(from.clone(), to.clone());
        WireBuilder::new(self, from, to)
    }

    pub(crate) fn with_registry<R>(&self, f: impl FnOnce(&mut Registry<K, F>) -> R) -> R {
        f(&mut self.registry.lock())
    }

    /// Read a registered state, e.g. to reach fields of a custom state type.
    ///
    /// `f` sees a copy taken under the registry lock and runs after it is
    /// released, so it may call back into the machine.
    pub fn inspect_state<R>(&self, key: &K, f: impl FnOnce(&F::State) -> R) -> Option<R>
    where
        F::State: Clone,
    {
        let state = self.registry.lock().state(key).cloned();
        state.as_ref().map(f)
    }

    /// Whether `key` has been declared.
    pub fn has_state(&self, key: &K) -> bool {
        self.registry.lock().contains_state(key)
    }

    /// Whether the wire `from -> to` has been declared.
    pub fn has_wire(&self, from: &K, to: &K) -> bool {
        self.registry.lock().contains_wire(from, to)
    }

    /// Number of declared states.
    pub fn state_count(&self) -> usize {
        self.registry.lock().state_count()
    }

    /// Number of declared wires.
    pub fn wire_count(&self) -> usize {
        self.registry.lock().wire_count()
    }

    /// See [`Registry::validate`].
    pub fn validate(&self) -> Validation<(), NonEmptyVec<GraphIssue<K>>> {
        self.registry.lock().validate()
    }

    /// Key of the active state, `None` before the first commit.
    pub fn current_key(&self) -> Option<K> {
        self.core.lock().current.clone()
    }

    /// Key of the accepted but not yet committed transition target.
    pub fn pending_key(&self) -> Option<K> {
        self.core.lock().pending.clone()
    }

    /// Key of the state left by the most recent commit.
    pub fn previous_key(&self) -> Option<K> {
        self.core.lock().previous.clone()
    }

    /// Lifecycle step currently running.
    pub fn phase(&self) -> Phase {
        self.core.lock().phase
    }

    /// Copy of the execution state at this instant.
    pub fn snapshot(&self) -> MachineSnapshot<K> {
        let core = self.core.lock();
        MachineSnapshot {
            id: self.id,
            current: core.current.clone(),
            previous: core.previous.clone(),
            pending: core.pending.clone(),
            phase: core.phase,
            commits: core.commits,
            taken_at: Utc::now(),
        }
    }

    /// Observe committed transitions.
    pub fn on_changed<C>(&self, observer: C) -> SubscriptionId
    where
        C: Fn(&StateChange<K>) + Send + Sync + 'static,
    {
        self.changed.subscribe(observer)
    }

    /// The bus behind [`on_changed`](Self::on_changed), for unsubscribing.
    pub fn changes(&self) -> &EventBus<StateChange<K>> {
        &self.changed
    }

    /// The channel receiving faults of states without an error handler.
    pub fn unhandled(&self) -> &Arc<EventBus<Fault<K>>> {
        &self.unhandled
    }

    /// Ask the machine to move to `next`.
    ///
    /// Requesting the current state is a no-op. What else happens depends
    /// on the [`TransitionMode`]:
    ///
    /// - `Queued`: `next` replaces any pending request and is committed by
    ///   the next [`update`](Self::update).
    /// - `Immediate`: the request must follow a declared wire whose condition
    ///   holds, and may not replace a pending request unless `overwrite` is
    ///   set. The transition is committed before this returns, or by the
    ///   outermost flush if called from inside a callback.
    ///
    /// In both modes a request made from an exit callback fails with
    /// `InvalidPhase`, and a target that was never declared with
    /// [`state`](Self::state) fails with `UnknownState`.
    pub fn request_transition(&self, next: K) -> Result<(), TransitionError<K>> {
        match self.config.mode {
            TransitionMode::Queued => self.request_queued(next),
            TransitionMode::Immediate => self.request_immediate(next),
        }
    }

    /// Run one engine tick.
    ///
    /// Commits every pending transition (including ones requested by enter
    /// callbacks along the way) or, if nothing is pending, runs the update
    /// callback of the current state. Callback faults are contained; only a
    /// failing error handler is returned. Calls nested inside a callback are
    /// ignored.
    pub fn update(&self) -> Result<(), EngineError<K>> {
        let depth = self.flush.lock();
        if depth.get() > 0 {
            debug!(machine = %self.id, "Nested update ignored");
            return Ok(());
        }
        let _scope = FlushScope::enter(self, &depth);

        if self.pending_key().is_some() {
            return self.drain();
        }

        self.run_update()?;

        if self.config.mode == TransitionMode::Immediate && self.pending_key().is_some() {
            self.drain()?;
        }
        Ok(())
    }

    fn request_queued(&self, next: K) -> Result<(), TransitionError<K>> {
        self.reject_during_exit(&next)?;
        self.require_registered(&next)?;

        let mut core = self.core.lock();
        if core.current.as_ref() == Some(&next) {
            debug!(machine = %self.id, state = ?next, "Ignoring request for the current state");
            return Ok(());
        }
        if let Some(superseded) = core.pending.replace(next.clone()) {
            if superseded != next {
                warn!(
                    machine = %self.id,
                    superseded = ?superseded,
                    requested = ?next,
                    "Pending transition superseded"
                );
            }
        }
        Ok(())
    }

    fn request_immediate(&self, next: K) -> Result<(), TransitionError<K>> {
        let depth = self.flush.lock();
        self.reject_during_exit(&next)?;

        if !self.admit(&next)? {
            return Ok(());
        }
        if let Some(replaced) = self.core.lock().pending.replace(next.clone()) {
            debug!(machine = %self.id, replaced = ?replaced, requested = ?next, "Pending transition overwritten");
        }

        if depth.get() > 0 {
            debug!(machine = %self.id, state = ?next, "Transition recorded for the running flush");
            return Ok(());
        }
        let _scope = FlushScope::enter(self, &depth);
        self.drain()?;
        Ok(())
    }

    /// Check an immediate-mode request. `Ok(false)` means a self-request.
    fn admit(&self, next: &K) -> Result<bool, TransitionError<K>> {
        let (current, pending) = {
            let core = self.core.lock();
            (core.current.clone(), core.pending.clone())
        };

        if current.as_ref() == Some(next) {
            debug!(machine = %self.id, state = ?next, "Ignoring request for the current state");
            return Ok(false);
        }

        if let Some(pending) = pending {
            if !self.config.overwrite {
                warn!(machine = %self.id, pending = ?pending, requested = ?next, "Transition rejected, another one is pending");
                return Err(TransitionError::Busy { pending });
            }
        }

        if let Some(from) = current {
            let condition = match self.wire_condition(&from, next) {
                Some(condition) => condition,
                None => {
                    warn!(machine = %self.id, from = ?from, to = ?next, "Wire is not declared");
                    return Err(TransitionError::NoSuchWire {
                        from,
                        to: next.clone(),
                    });
                }
            };
            if condition.is_some_and(|condition| !condition.check()) {
                warn!(machine = %self.id, from = ?from, to = ?next, "Wire condition not satisfied");
                return Err(TransitionError::ConditionNotMet {
                    from,
                    to: next.clone(),
                });
            }
        }

        self.require_registered(next)?;
        Ok(true)
    }

    /// `None` if the wire is missing, otherwise its condition. Cloned so it
    /// is evaluated without holding the registry lock.
    fn wire_condition(&self, from: &K, to: &K) -> Option<Option<Condition>> {
        self.registry
            .lock()
            .wire(from, to)
            .map(|wire| wire.condition().cloned())
    }

    fn require_registered(&self, key: &K) -> Result<(), TransitionError<K>> {
        if self.registry.lock().contains_state(key) {
            return Ok(());
        }
        error!(machine = %self.id, state = ?key, "Transition requested to an unregistered state");
        Err(TransitionError::UnknownState { key: key.clone() })
    }

    fn reject_during_exit(&self, next: &K) -> Result<(), TransitionError<K>> {
        let core = self.core.lock();
        if core.phase == Phase::Exiting && core.flushing == Some(thread::current().id()) {
            error!(
                machine = %self.id,
                exiting = ?core.current,
                requested = ?next,
                "Transition requested from an exit callback"
            );
            return Err(TransitionError::InvalidPhase {
                phase: Phase::Exiting,
                requested: next.clone(),
            });
        }
        Ok(())
    }

    /// Commit pending transitions until none is left or the chain limit is hit.
    fn drain(&self) -> Result<(), EngineError<K>> {
        let mut committed = 0usize;
        while self.pending_key().is_some() {
            if let Some(limit) = self.config.max_chained_transitions {
                if committed >= limit {
                    warn!(
                        machine = %self.id,
                        limit,
                        pending = ?self.pending_key(),
                        "Chained transition limit reached, deferring to next update"
                    );
                    break;
                }
            }
            self.commit()?;
            committed += 1;
        }
        Ok(())
    }

    /// Exit the current state, swap in the pending one, enter it.
    fn commit(&self) -> Result<(), EngineError<K>> {
        let outgoing = {
            let mut core = self.core.lock();
            core.phase = Phase::Exiting;
            core.current.clone()
        };
        if let Some(outgoing) = &outgoing {
            self.run_hook(outgoing, Phase::Exiting)?;
        }

        let (from, to, sequence) = {
            let mut core = self.core.lock();
            let Some(incoming) = core.pending.take() else {
                return Ok(());
            };
            core.previous = core.current.replace(incoming.clone());
            core.phase = Phase::Entering;
            core.commits += 1;
            (core.previous.clone(), incoming, core.commits)
        };
        debug!(machine = %self.id, from = ?from, to = ?to, sequence, "Transition committed");

        self.run_hook(&to, Phase::Entering)?;

        self.changed.emit(&StateChange {
            from,
            to,
            sequence,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    fn run_update(&self) -> Result<(), EngineError<K>> {
        let current = {
            let mut core = self.core.lock();
            core.phase = Phase::Updating;
            core.current.clone()
        };
        match current {
            Some(current) => self.run_hook(&current, Phase::Updating),
            None => Ok(()),
        }
    }

    /// Invoke the `phase` callback of `key`, containing any fault.
    fn run_hook(&self, key: &K, phase: Phase) -> Result<(), EngineError<K>> {
        let callback = self
            .registry
            .lock()
            .state(key)
            .and_then(|state| state.hooks().callback(phase));
        let Some(callback) = callback else {
            return Ok(());
        };

        match fault::invoke(&callback, self) {
            Ok(()) => Ok(()),
            Err(error) => self.contain(Fault {
                state: key.clone(),
                phase,
                error,
            }),
        }
    }

    /// Hand a fault to the state's error handler, or to the unhandled bus.
    fn contain(&self, fault: Fault<K>) -> Result<(), EngineError<K>> {
        let handler = self
            .registry
            .lock()
            .state(&fault.state)
            .and_then(|state| state.hooks().error_handler());

        if let Some(handler) = handler {
            debug!(machine = %self.id, state = ?fault.state, phase = %fault.phase, error = %fault.error, "Callback fault handled by state");
            return handler(self, &fault).map_err(|error| {
                error!(machine = %self.id, state = ?fault.state, phase = %fault.phase, error = %error, "Error handler failed");
                EngineError::HandlerFailed {
                    state: fault.state.clone(),
                    phase: fault.phase,
                    error,
                }
            });
        }

        if self.unhandled.emit(&fault) == 0 {
            warn!(
                machine = %self.id,
                state = ?fault.state,
                phase = %fault.phase,
                error = %fault.error,
                "Unhandled callback fault with no observer"
            );
        }
        Ok(())
    }
}

impl<K: StateKey, F: NodeFactory<K>> Machine<K> for StateMachine<K, F> {
    fn request_transition(&self, next: K) -> Result<(), TransitionError<K>> {
        StateMachine::request_transition(self, next)
    }

    fn current_key(&self) -> Option<K> {
        StateMachine::current_key(self)
    }

    fn pending_key(&self) -> Option<K> {
        StateMachine::pending_key(self)
    }

    fn previous_key(&self) -> Option<K> {
        StateMachine::previous_key(self)
    }

    fn phase(&self) -> Phase {
        StateMachine::phase(self)
    }
}

/// Marks the outermost flush on this thread; resets the phase when dropped,
/// including when a double fault unwinds through it.
struct FlushScope<'a, K: StateKey, F: NodeFactory<K>> {
    machine: &'a StateMachine<K, F>,
    depth: &'a Cell<usize>,
}

impl<'a, K: StateKey, F: NodeFactory<K>> FlushScope<'a, K, F> {
    fn enter(machine: &'a StateMachine<K, F>, depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        machine.core.lock().flushing = Some(thread::current().id());
        Self { machine, depth }
    }
}

impl<K: StateKey, F: NodeFactory<K>> Drop for FlushScope<'_, K, F> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get() - 1);
        let mut core = self.machine.core.lock();
        core.phase = Phase::Idle;
        core.flushing = None;
    }
}
