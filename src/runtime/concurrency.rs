//! Concurrency primitives behind the fan-out combinators
//!
//! Provides a counting barrier and a task group that spawns one OS thread
//! per task, collecting each result into a slot reserved before the spawn.

use crate::error::{panic_message, FutureError};
use crate::runtime::config::{self, RuntimeConfig};
use crate::runtime::dependency;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{debug, trace, warn};

/// Counting barrier: `add` before spawning work, `done` when each piece
/// finishes, `wait` until the count drops back to zero.
#[derive(Clone, Default)]
pub struct WaitGroup {
    inner: Arc<WaitGroupInner>,
}

#[derive(Default)]
struct WaitGroupInner {
    count: Mutex<usize>,
    zero: Condvar,
}

impl WaitGroup {
    /// Create a wait group with a zero count
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `n` more pending completions
    pub fn add(&self, n: usize) {
        let mut count = self.inner.count.lock();
        *count += n;
    }

    /// Signal one completion
    pub fn done(&self) {
        let mut count = self.inner.count.lock();
        // A done without a matching add would otherwise wrap around
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.inner.zero.notify_all();
        }
    }

    /// Block until every registered completion has been signalled
    pub fn wait(&self) {
        let mut count = self.inner.count.lock();
        while *count > 0 {
            self.inner.zero.wait(&mut count);
        }
    }

    /// Number of completions still outstanding
    pub fn pending(&self) -> usize {
        *self.inner.count.lock()
    }
}

impl fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitGroup")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Calls `done` when dropped, so a task that unwinds still counts down
struct DoneGuard(WaitGroup);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.0.done();
    }
}

/// Why a fan-out task produced no value
pub enum TaskFailure {
    /// The task body panicked; the payload is kept for `resume_unwind`
    Panicked(Box<dyn Any + Send>),
    /// The thread could not be created
    Spawn(io::Error),
    /// The task finished without writing its slot
    Lost,
}

impl TaskFailure {
    /// Re-raise the failure on the current thread
    pub fn resume(self) -> ! {
        match self {
            TaskFailure::Panicked(payload) => panic::resume_unwind(payload),
            other => panic!("{}", other.to_error()),
        }
    }

    /// Describe the failure as a `FutureError`
    pub fn to_error(&self) -> FutureError {
        match self {
            TaskFailure::Panicked(payload) => FutureError::from_panic(payload.as_ref()),
            TaskFailure::Spawn(err) => FutureError::Spawn {
                message: err.to_string(),
            },
            TaskFailure::Lost => FutureError::Spawn {
                message: "task exited without a result".to_string(),
            },
        }
    }
}

impl fmt::Debug for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Panicked(payload) => f
                .debug_tuple("Panicked")
                .field(&panic_message(payload.as_ref()))
                .finish(),
            TaskFailure::Spawn(err) => f.debug_tuple("Spawn").field(err).finish(),
            TaskFailure::Lost => f.write_str("Lost"),
        }
    }
}

/// Result slot owned by one fan-out task
pub struct Slot<A> {
    cell: Arc<Mutex<Option<Result<A, TaskFailure>>>>,
}

impl<A> Slot<A> {
    fn empty() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    fn put(&self, result: Result<A, TaskFailure>) {
        *self.cell.lock() = Some(result);
    }

    /// Take the task's outcome. Only meaningful after the group has been
    /// waited on.
    pub fn take(self) -> Result<A, TaskFailure> {
        self.cell.lock().take().unwrap_or(Err(TaskFailure::Lost))
    }

    /// Take the task's value, resuming its panic on the current thread
    pub fn into_value(self) -> A {
        match self.take() {
            Ok(value) => value,
            Err(failure) => failure.resume(),
        }
    }
}

/// A set of concurrently running tasks joined by a `WaitGroup`.
///
/// Every spawned task owns one `Slot`; the caller keeps the slots in the
/// order it needs the results, so completion order never matters.
pub struct TaskGroup {
    label: &'static str,
    config: &'static RuntimeConfig,
    wait_group: WaitGroup,
    spawned: usize,
}

impl TaskGroup {
    /// Create an empty group using the installed runtime configuration
    pub fn new(label: &'static str) -> Self {
        Self::with_config(label, config::current())
    }

    /// Create an empty group with an explicit configuration
    pub fn with_config(label: &'static str, config: &'static RuntimeConfig) -> Self {
        Self {
            label,
            config,
            wait_group: WaitGroup::new(),
            spawned: 0,
        }
    }

    /// Run `task` on a new thread and return the slot it will fill
    pub fn spawn<A, F>(&mut self, task: F) -> Slot<A>
    where
        A: Send + 'static,
        F: FnOnce() -> A + Send + 'static,
    {
        let index = self.spawned;
        self.spawned += 1;

        let slot = Slot::empty();
        let writer = Slot {
            cell: Arc::clone(&slot.cell),
        };

        self.wait_group.add(1);
        let guard = DoneGuard(self.wait_group.clone());
        let label = self.label;
        let parent = dependency::current();

        let mut builder = thread::Builder::new().name(self.config.thread_name(index));
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }

        // Clone of the writer for the failure path: the closure is consumed
        // by `spawn` even when thread creation fails.
        let fallback = Slot {
            cell: Arc::clone(&slot.cell),
        };

        let spawned = builder.spawn(move || {
            let _guard = guard;
            dependency::inherit(parent);
            trace!(label, index, "fan-out task started");
            let result = panic::catch_unwind(AssertUnwindSafe(task));
            if result.is_err() {
                warn!(label, index, "fan-out task panicked");
            }
            writer.put(result.map_err(TaskFailure::Panicked));
        });

        if let Err(err) = spawned {
            warn!(label, index, error = %err, "failed to spawn fan-out task");
            fallback.put(Err(TaskFailure::Spawn(err)));
            // The guard went down with the closure, which already counted
            // this task as done.
        }

        slot
    }

    /// Number of tasks spawned so far
    pub fn len(&self) -> usize {
        self.spawned
    }

    /// Whether no task has been spawned
    pub fn is_empty(&self) -> bool {
        self.spawned == 0
    }

    /// Block until every spawned task has finished
    pub fn wait(self) {
        debug!(label = self.label, tasks = self.spawned, "waiting on fan-out");
        self.wait_group.wait();
        trace!(label = self.label, "fan-out complete");
    }
}
