//! Run simulator
//!
//! Walks the node array captured when the run starts and schedules two
//! status transitions per node (`running`, then `success`) followed by a
//! single completion entry. Edges play no part: there is no dependency
//! ordering and no data flowing between steps.
//!
//! Timer callbacks only hold a weak reference to the simulator and carry
//! the generation of the run that scheduled them, so a cancelled or dropped
//! run can never touch the store again.

use crate::config::RunTiming;
use crate::error::{RunError, UnconfiguredNode};
use crate::graph::GraphStore;
use crate::logging::{RunLog, RunLogKind};
use crate::scheduler::{Scheduler, Task, TimerId};
use crate::types::{Node, NodeId, NodePatch, NodeStatus};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// What a successfully started run will do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    pub node_count: usize,
    /// Offset from the start of the run at which it completes
    pub completes_after: Duration,
}

/// Readiness of a workflow to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowValidation {
    pub node_count: usize,
    pub unconfigured: Vec<UnconfiguredNode>,
    pub ready: bool,
}

impl WorkflowValidation {
    pub fn of(nodes: &[Node]) -> Self {
        let unconfigured: Vec<UnconfiguredNode> = nodes
            .iter()
            .filter(|n| !n.configured)
            .map(|n| UnconfiguredNode {
                id: n.id,
                label: n.label.clone(),
            })
            .collect();
        Self {
            node_count: nodes.len(),
            ready: !nodes.is_empty() && unconfigured.is_empty(),
            unconfigured,
        }
    }

    pub fn into_result(self) -> Result<(), RunError> {
        if self.node_count == 0 {
            Err(RunError::EmptyWorkflow)
        } else if !self.unconfigured.is_empty() {
            Err(RunError::Unconfigured {
                nodes: self.unconfigured,
            })
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    generation: u64,
    pending: Vec<TimerId>,
}

struct RunShared {
    store: Arc<GraphStore>,
    scheduler: Arc<dyn Scheduler>,
    log: Arc<RunLog>,
    timing: RunTiming,
    state: Mutex<RunState>,
}

impl RunShared {
    fn is_current(&self, generation: u64) -> bool {
        let state = self.state.lock();
        state.running && state.generation == generation
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.scheduler.now().as_millis()).unwrap_or(u64::MAX)
    }

    fn set_status(&self, node_id: NodeId, label: &str, status: NodeStatus) {
        if let Err(err) = self.store.update_node(node_id, NodePatch::status(status)) {
            tracing::debug!("Skipping status update for {}: {}", label, err);
            return;
        }
        let (kind, message) = match status {
            NodeStatus::Running => (RunLogKind::NodeRunning, format!("[{label}] running")),
            NodeStatus::Success => (RunLogKind::NodeSucceeded, format!("[{label}] succeeded")),
            NodeStatus::Idle | NodeStatus::Error => return,
        };
        self.log.append(self.now_ms(), kind, Some(node_id), message);
    }
}

pub struct RunSimulator {
    shared: Arc<RunShared>,
}

impl std::fmt::Debug for RunSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("RunSimulator")
            .field("running", &state.running)
            .field("generation", &state.generation)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl RunSimulator {
    pub fn new(store: Arc<GraphStore>, scheduler: Arc<dyn Scheduler>, timing: RunTiming) -> Self {
        Self {
            shared: Arc::new(RunShared {
                store,
                scheduler,
                log: Arc::new(RunLog::new()),
                timing,
                state: Mutex::new(RunState::default()),
            }),
        }
    }

    pub fn log(&self) -> &Arc<RunLog> {
        &self.shared.log
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Check whether a run could start right now.
    pub fn validate(&self) -> Result<(), RunError> {
        WorkflowValidation::of(&self.shared.store.nodes()).into_result()
    }

    /// Start a run. Fails without touching any node when the workflow is
    /// empty, has unconfigured steps, or is already running.
    pub fn run(&self) -> Result<RunPlan, RunError> {
        let shared = &self.shared;
        let generation = {
            let mut state = shared.state.lock();
            if state.running {
                return Err(RunError::AlreadyRunning);
            }
            if let Err(err) = self.validate() {
                tracing::info!("Run blocked: {}", err);
                return Err(err);
            }
            state.running = true;
            state.generation += 1;
            state.generation
        };

        // The state lock is not held from here on: store observers may call
        // back into the simulator.
        let nodes = shared.store.nodes();
        shared.store.reset_statuses();
        shared.log.clear();
        shared.log.append(
            shared.now_ms(),
            RunLogKind::Started,
            None,
            format!("starting workflow ({} steps)", nodes.len()),
        );
        tracing::info!("Starting run {} over {} node(s)", generation, nodes.len());

        let timing = shared.timing;
        let mut timers = Vec::with_capacity(nodes.len() * 2 + 1);
        for (index, node) in nodes.iter().enumerate() {
            let (id, label) = (node.id, node.label.clone());
            let running = step(shared, generation, {
                let label = label.clone();
                move |s: &RunShared| s.set_status(id, &label, NodeStatus::Running)
            });
            let success = step(shared, generation, move |s: &RunShared| {
                s.set_status(id, &label, NodeStatus::Success);
            });
            timers.push(shared.scheduler.schedule(timing.running_at(index), running));
            timers.push(shared.scheduler.schedule(timing.success_at(index), success));
        }

        let count = nodes.len();
        let completes_after = timing.completion_at(count);
        let complete = step(shared, generation, move |s: &RunShared| {
            {
                let mut state = s.state.lock();
                state.running = false;
                state.pending.clear();
            }
            s.log.append(
                s.now_ms(),
                RunLogKind::Completed,
                None,
                format!("workflow finished, {count} step(s) succeeded"),
            );
            tracing::info!("Run {} completed", generation);
        });
        timers.push(shared.scheduler.schedule(completes_after, complete));

        let orphaned = {
            let mut state = shared.state.lock();
            if state.generation == generation {
                state.pending.extend(timers);
                Vec::new()
            } else {
                // Cancelled or dropped while the timers were being queued.
                timers
            }
        };
        for id in orphaned {
            shared.scheduler.cancel(id);
        }

        Ok(RunPlan {
            node_count: count,
            completes_after,
        })
    }

    /// Stop the current run. Pending transitions are dropped and nodes left
    /// in `running` go back to `idle`. Returns false when nothing was running.
    pub fn cancel(&self) -> bool {
        let pending = {
            let mut state = self.shared.state.lock();
            if !state.running {
                return false;
            }
            state.running = false;
            state.generation += 1;
            std::mem::take(&mut state.pending)
        };
        for id in pending {
            self.shared.scheduler.cancel(id);
        }
        for node in self.shared.store.nodes() {
            if node.status == NodeStatus::Running {
                let reset = NodePatch::status(NodeStatus::Idle);
                if let Err(err) = self.shared.store.update_node(node.id, reset) {
                    tracing::debug!("Skipping reset of {}: {}", node.label, err);
                }
            }
        }
        self.shared.log.append(
            self.shared.now_ms(),
            RunLogKind::Cancelled,
            None,
            "workflow run cancelled",
        );
        tracing::info!("Run cancelled");
        true
    }
}

impl Drop for RunSimulator {
    /// Teardown: drop every pending timer without touching the store.
    fn drop(&mut self) {
        let pending = {
            let mut state = self.shared.state.lock();
            state.running = false;
            state.generation += 1;
            std::mem::take(&mut state.pending)
        };
        for id in pending {
            self.shared.scheduler.cancel(id);
        }
    }
}

fn step<F>(shared: &Arc<RunShared>, generation: u64, f: F) -> Task
where
    F: FnOnce(&RunShared) + Send + 'static,
{
    let weak: Weak<RunShared> = Arc::downgrade(shared);
    Box::new(move || {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        if shared.is_current(generation) {
            f(&shared);
        }
    })
}
