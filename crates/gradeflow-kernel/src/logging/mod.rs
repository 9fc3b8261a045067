use crate::error::LogError;
use crate::types::NodeId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLogKind {
    Started,
    NodeRunning,
    NodeSucceeded,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub sequence: u64,
    /// Scheduler clock at the time of the entry, in milliseconds
    pub at_ms: u64,
    pub kind: RunLogKind,
    pub node_id: Option<NodeId>,
    pub message: String,
}

impl fmt::Display for RunLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:>6} ms] > {}", self.at_ms, self.message)
    }
}

/// Append-only textual log of a workflow run
#[derive(Debug, Default)]
pub struct RunLog {
    inner: Mutex<Vec<RunLogEntry>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        at_ms: u64,
        kind: RunLogKind,
        node_id: Option<NodeId>,
        message: impl Into<String>,
    ) -> u64 {
        let mut guard = self.inner.lock();
        let sequence = guard.last().map_or(0, |e| e.sequence + 1);
        guard.push(RunLogEntry {
            sequence,
            at_ms,
            kind,
            node_id,
            message: message.into(),
        });
        sequence
    }

    pub fn entries(&self) -> Vec<RunLogEntry> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn count(&self, kind: RunLogKind) -> usize {
        self.inner.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Sequences must be contiguous and timestamps non-decreasing.
    pub fn verify_order(&self) -> Result<(), LogError> {
        let guard = self.inner.lock();
        let mut prev_at = 0;
        for (index, entry) in guard.iter().enumerate() {
            if entry.sequence != index as u64 || entry.at_ms < prev_at {
                return Err(LogError::OutOfOrder {
                    sequence: entry.sequence,
                });
            }
            prev_at = entry.at_ms;
        }
        Ok(())
    }
}
