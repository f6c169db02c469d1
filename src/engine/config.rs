//! Machine configuration.

use serde::{Deserialize, Serialize};

/// How transition requests are committed. Fixed for the lifetime of a machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Requests are recorded (last request wins) and committed by the next
    /// `update()`. No wire check is made.
    Queued,

    /// Requests are checked against the wire graph and committed before the
    /// request returns, or by the outermost flush when issued from a callback.
    #[default]
    Immediate,
}

/// Construction-time settings of a [`StateMachine`](super::StateMachine).
///
/// # Example
///
/// ```rust
/// use wirestate::engine::{MachineConfig, TransitionMode};
///
/// let config = MachineConfig::default()
///     .with_mode(TransitionMode::Queued)
///     .with_max_chained_transitions(8);
///
/// assert_eq!(config.mode, TransitionMode::Queued);
/// assert!(!config.overwrite);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub mode: TransitionMode,

    /// In immediate mode, let a new request replace a pending one instead
    /// of failing with `Busy`.
    pub overwrite: bool,

    /// Upper bound on commits performed by a single flush. Pending
    /// transitions beyond it wait for the next `update()`.
    pub max_chained_transitions: Option<usize>,
}

impl MachineConfig {
    pub fn new(mode: TransitionMode, overwrite: bool) -> Self {
        Self {
            mode,
            overwrite,
            max_chained_transitions: None,
        }
    }

    pub fn with_mode(mut self, mode: TransitionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_max_chained_transitions(mut self, limit: usize) -> Self {
        self.max_chained_transitions = Some(limit);
        self
    }
}
