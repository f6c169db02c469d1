//! Wire conditions.
//!
//! A condition is a boolean predicate attached to a wire. It is evaluated
//! once, when a transition across that wire is requested, and never again
//! at commit time.

use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a wire may currently be traversed.
///
/// Conditions close over whatever external state they need; they take no
/// arguments. Cloning is cheap and shares the predicate.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use wirestate::core::Condition;
///
/// let ready = Arc::new(AtomicBool::new(false));
/// let flag = Arc::clone(&ready);
/// let condition = Condition::new(move || flag.load(Ordering::SeqCst));
///
/// assert!(!condition.check());
/// ready.store(true, Ordering::SeqCst);
/// assert!(condition.check());
/// ```
#[derive(Clone)]
pub struct Condition {
    predicate: Arc<dyn Fn() -> bool + Send + Sync>,
}

impl Condition {
    /// Create a condition from a predicate function.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Condition {
            predicate: Arc::new(predicate),
        }
    }

    /// Evaluate the predicate.
    pub fn check(&self) -> bool {
        (self.predicate)()
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}
