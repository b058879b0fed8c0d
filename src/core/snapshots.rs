use super::aggregation::AggregationSnapshot;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Snapshots kept in history, most recent first
pub const MAX_HISTORY: usize = 5;

/// Current snapshot plus a bounded history of the ones it replaced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregationState {
    #[serde(default)]
    current_snapshot: Option<AggregationSnapshot>,
    #[serde(default)]
    history: Vec<AggregationSnapshot>,
}

impl AggregationState {
    pub fn current(&self) -> Option<&AggregationSnapshot> {
        self.current_snapshot.as_ref()
    }

    pub fn history(&self) -> &[AggregationSnapshot] {
        &self.history
    }

    /// Make `snapshot` current, archiving the previous one.
    pub fn set_aggregation(&mut self, snapshot: AggregationSnapshot) -> &AggregationSnapshot {
        if let Some(previous) = self.current_snapshot.take() {
            self.history.insert(0, previous);
            self.history.truncate(MAX_HISTORY);
        }
        self.current_snapshot.insert(snapshot)
    }

    /// Mark the current snapshot stale. Results and history are untouched.
    pub fn invalidate(&mut self) {
        if let Some(current) = self.current_snapshot.as_mut() {
            if current.is_valid {
                log::debug!("aggregation snapshot {} is now stale", current.id);
            }
            current.is_valid = false;
        }
    }

    pub fn clear_aggregation(&mut self) {
        self.current_snapshot = None;
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Enforce the history bound on state loaded from outside
    pub(crate) fn reconcile(&mut self) {
        self.history.truncate(MAX_HISTORY);
    }
}
