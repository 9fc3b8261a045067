//! Timer scheduling behind an injectable trait
//!
//! The run simulator never sleeps itself; it hands delayed callbacks to a
//! [`Scheduler`]. Tests drive a [`VirtualScheduler`] by hand, the CLI uses
//! a [`TokioScheduler`] backed by real time.

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

pub trait Scheduler: Send + Sync {
    /// Time elapsed on this scheduler's clock
    fn now(&self) -> Duration;

    /// Run `task` once `delay` has elapsed. Timers due at the same instant
    /// fire in the order they were scheduled.
    fn schedule(&self, delay: Duration, task: Task) -> TimerId;

    /// Cancel a pending timer. Returns false if it already fired or never
    /// existed.
    fn cancel(&self, id: TimerId) -> bool;
}

#[derive(Default)]
struct VirtualState {
    now: Duration,
    next_id: u64,
    /// Keyed by (due, id); ids increase with scheduling order.
    queue: BTreeMap<(Duration, u64), Task>,
    due_by_id: HashMap<u64, Duration>,
}

/// Deterministic scheduler whose clock only moves when told to.
#[derive(Default)]
pub struct VirtualScheduler {
    state: Mutex<VirtualState>,
}

impl std::fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("VirtualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Move the clock forward by `by`, firing every timer that falls due,
    /// including timers scheduled by the callbacks themselves.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now.saturating_add(by);
        let fired = self.fire_until(Some(target));
        self.state.lock().now = target;
        fired
    }

    /// Fire everything pending, moving the clock to the last due time.
    pub fn run_until_idle(&self) -> usize {
        self.fire_until(None)
    }

    fn fire_until(&self, limit: Option<Duration>) -> usize {
        let mut fired = 0;
        loop {
            // The lock is released before the task runs so the task may
            // schedule or cancel timers.
            let task = {
                let mut state = self.state.lock();
                let Some((&(due, id), _)) = state.queue.iter().next() else {
                    break;
                };
                if limit.is_some_and(|limit| due > limit) {
                    break;
                }
                state.due_by_id.remove(&id);
                state.now = state.now.max(due);
                state.queue.remove(&(due, id))
            };
            if let Some(task) = task {
                task();
                fired += 1;
            }
        }
        fired
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        self.state.lock().now
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        let due = state.now.saturating_add(delay);
        state.queue.insert((due, id), task);
        state.due_by_id.insert(id, due);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.state.lock();
        match state.due_by_id.remove(&id.0) {
            Some(due) => state.queue.remove(&(due, id.0)).is_some(),
            None => false,
        }
    }
}

/// Real-time scheduler on a tokio runtime.
///
/// Every timer is measured from the same start instant, so ordering matches
/// scheduling order for equal due times as long as the runtime keeps up.
pub struct TokioScheduler {
    handle: Handle,
    started: Instant,
    next_id: Mutex<u64>,
    tasks: Arc<Mutex<HashMap<u64, JoinHandle<()>>>>,
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.tasks.lock().len())
            .finish()
    }
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            started: Instant::now(),
            next_id: Mutex::new(0),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bind to the runtime of the calling task.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn schedule(&self, delay: Duration, task: Task) -> TimerId {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        // `None` when the delay overflows the clock: the timer never fires.
        let deadline = Instant::now().checked_add(delay);
        let tasks = Arc::clone(&self.tasks);
        // Hold the map lock across spawn so the task cannot remove its own
        // entry before it has been inserted.
        let mut guard = self.tasks.lock();
        let join = self.handle.spawn(async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
            tasks.lock().remove(&id);
            task();
        });
        guard.insert(id, join);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) -> bool {
        match self.tasks.lock().remove(&id.0) {
            Some(join) => {
                join.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, join) in self.tasks.lock().drain() {
            join.abort();
        }
    }
}
