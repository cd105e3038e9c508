//! Evaluation dependencies between future cells
//!
//! Every thread tracks the stack of cells it is evaluating. A process-wide
//! graph records which cell's evaluation cannot finish before another's:
//! an edge `a -> b` is added when `b` starts evaluating under `a`, and when
//! a thread evaluating `a` blocks on a `b` running elsewhere. A wait that
//! would close a loop in that graph is a cycle and is refused.
//!
//! Fan-out threads inherit the innermost cell of the thread that spawned
//! them, so cycles routed through `join` or `all` are seen too.

use crate::error::FutureError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Identity of a future cell (its shared allocation address)
pub type CellId = usize;

thread_local! {
    static EVALUATING: RefCell<Vec<CellId>> = RefCell::new(Vec::new());
}

static GRAPH: Lazy<Mutex<DependencyGraph>> = Lazy::new(Default::default);

/// Multigraph of "cannot finish before" edges
#[derive(Debug, Default)]
struct DependencyGraph {
    edges: HashMap<CellId, Vec<CellId>>,
}

impl DependencyGraph {
    fn add(&mut self, from: CellId, to: CellId) {
        self.edges.entry(from).or_default().push(to);
    }

    fn remove(&mut self, from: CellId, to: CellId) {
        if let Some(targets) = self.edges.get_mut(&from) {
            if let Some(pos) = targets.iter().position(|&t| t == to) {
                targets.swap_remove(pos);
            }
            if targets.is_empty() {
                self.edges.remove(&from);
            }
        }
    }

    fn reaches(&self, start: CellId, goal: CellId) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if node == goal {
                return true;
            }
            if !seen.insert(node) {
                continue;
            }
            if let Some(targets) = self.edges.get(&node) {
                stack.extend(targets.iter().copied());
            }
        }

        false
    }
}

/// Innermost cell the current thread is evaluating
pub fn current() -> Option<CellId> {
    EVALUATING.with(|stack| stack.borrow().last().copied())
}

/// Adopt `parent` as the enclosing evaluation of a freshly spawned thread
pub fn inherit(parent: Option<CellId>) {
    if let Some(parent) = parent {
        EVALUATING.with(|stack| stack.borrow_mut().push(parent));
    }
}

/// Marks `cell` as evaluating on this thread until dropped
pub struct Evaluating {
    cell: CellId,
    parent: Option<CellId>,
}

/// Record that this thread starts running the producer of `cell`
pub fn enter(cell: CellId) -> Evaluating {
    let parent = current();
    if let Some(parent) = parent {
        GRAPH.lock().add(parent, cell);
    }
    EVALUATING.with(|stack| stack.borrow_mut().push(cell));

    Evaluating { cell, parent }
}

impl Drop for Evaluating {
    fn drop(&mut self) {
        EVALUATING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|&c| c == self.cell) {
                stack.remove(pos);
            }
        });
        if let Some(parent) = self.parent {
            GRAPH.lock().remove(parent, self.cell);
        }
    }
}

/// A registered wait on a running cell, removed when dropped
pub struct Blocked {
    from: CellId,
    to: CellId,
}

/// Register that this thread is about to block on `cell`, which another
/// evaluation is running.
///
/// Returns `Cycle` if `cell` already depends on the evaluation this thread
/// is part of. Returns `None` when the thread evaluates nothing and so
/// cannot be part of a cycle.
pub fn block_on(cell: CellId) -> Result<Option<Blocked>, FutureError> {
    let from = match current() {
        Some(from) => from,
        None => return Ok(None),
    };

    let mut graph = GRAPH.lock();
    if from == cell || graph.reaches(cell, from) {
        debug!(from, to = cell, "cyclic wait refused");
        return Err(FutureError::Cycle);
    }
    graph.add(from, cell);

    Ok(Some(Blocked { from, to: cell }))
}

impl Drop for Blocked {
    fn drop(&mut self) {
        GRAPH.lock().remove(self.from, self.to);
    }
}
