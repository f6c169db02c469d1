//! Point-in-time views of a running machine.

use crate::core::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable view of a machine's execution state.
///
/// Holds keys only; callbacks, wires and conditions are not captured.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot<K> {
    pub id: Uuid,
    pub current: Option<K>,
    pub previous: Option<K>,
    pub pending: Option<K>,
    pub phase: Phase,
    /// Transitions committed since the machine was created.
    pub commits: u64,
    pub taken_at: DateTime<Utc>,
}

impl<K: Serialize> MachineSnapshot<K> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
    enum Door {
        Open,
        Closed,
    }

    #[test]
    fn snapshot_serializes_keys_and_phase() {
        let snapshot = MachineSnapshot {
            id: Uuid::new_v4(),
            current: Some(Door::Open),
            previous: Some(Door::Closed),
            pending: None,
            phase: Phase::Idle,
            commits: 2,
            taken_at: Utc::now(),
        };

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"current\":\"Open\""));
        assert!(json.contains("\"phase\":\"idle\""));

        let back: MachineSnapshot<Door> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
