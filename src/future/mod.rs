//! Lazy memoizing future cells
//!
//! A `Future<T>` wraps a producer that runs at most once, on the first
//! thread that asks for the value. Later reads return a clone of the stored
//! result. Handles are cheap to clone and all share one cell.

use crate::error::{panic_message, FutureError};
use crate::runtime::dependency::{self, CellId};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

pub mod combinators;

pub use combinators::{all, all_settled, join, join3, join4, join5, try_all, try_join};

type Producer<T> = Box<dyn FnOnce() -> T + Send>;

/// Observable state of a future cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Not evaluated yet
    Pending,
    /// A thread is running the producer
    Running,
    /// The value is stored
    Fulfilled,
    /// The producer panicked; the cell will never hold a value
    Poisoned,
}

enum State<T> {
    Pending(Producer<T>),
    Running,
    Fulfilled(T),
    Poisoned(String),
}

impl<T> State<T> {
    fn status(&self) -> Status {
        match self {
            State::Pending(_) => Status::Pending,
            State::Running => Status::Running,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Poisoned(_) => Status::Poisoned,
        }
    }
}

struct Cell<T> {
    state: Mutex<State<T>>,
    published: Condvar,
}

/// How an evaluation failed, keeping the panic payload when this thread
/// ran the producer.
enum Failure {
    Panicked(Box<dyn Any + Send>),
    Error(FutureError),
}

/// A lazily evaluated, memoized value
pub struct Future<T> {
    cell: Arc<Cell<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Future<T>
where
    T: Clone + Send + 'static,
{
    /// Create a pending future around `producer`. Nothing runs until the
    /// first `wait`.
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self {
            cell: Arc::new(Cell {
                state: Mutex::new(State::Pending(Box::new(producer))),
                published: Condvar::new(),
            }),
        }
    }

    /// A future whose producer returns `value`.
    ///
    /// The cell still starts out pending and is fulfilled on first read.
    pub fn ready(value: T) -> Self {
        Self::new(move || value)
    }

    /// Return the value, running the producer if no thread has yet.
    ///
    /// Concurrent callers block until the evaluating thread publishes.
    ///
    /// # Panics
    ///
    /// Resumes the producer's panic if it panics during this call. Panics
    /// with a `FutureError` if the cell is poisoned or the wait is cyclic.
    pub fn wait(&self) -> T {
        match self.evaluate() {
            Ok(value) => value,
            Err(Failure::Panicked(payload)) => panic::resume_unwind(payload),
            Err(Failure::Error(err)) => panic!("{}", err),
        }
    }

    /// Like `wait`, but reports panics, poisoning and cycles as errors
    pub fn try_wait(&self) -> Result<T, FutureError> {
        self.evaluate().map_err(|failure| match failure {
            Failure::Panicked(payload) => FutureError::from_panic(payload.as_ref()),
            Failure::Error(err) => err,
        })
    }

    /// A future that applies `transform` to this one's value.
    ///
    /// Neither future is evaluated until the returned one is waited on.
    pub fn map<B, F>(&self, transform: F) -> Future<B>
    where
        B: Clone + Send + 'static,
        F: FnOnce(T) -> B + Send + 'static,
    {
        let source = self.clone();
        Future::new(move || transform(source.wait()))
    }

    /// Evaluate this future now, pass the value to `transform` now, and
    /// return the future it builds without evaluating it.
    pub fn and_then<B, F>(&self, transform: F) -> Future<B>
    where
        B: Clone + Send + 'static,
        F: FnOnce(T) -> Future<B>,
    {
        transform(self.wait())
    }

    /// Current state, without triggering evaluation
    pub fn status(&self) -> Status {
        self.cell.state.lock().status()
    }

    /// Whether the value has been computed
    pub fn is_fulfilled(&self) -> bool {
        self.status() == Status::Fulfilled
    }

    fn id(&self) -> CellId {
        Arc::as_ptr(&self.cell) as *const () as CellId
    }

    fn evaluate(&self) -> Result<T, Failure> {
        let id = self.id();
        let mut state = self.cell.state.lock();

        let producer = loop {
            match &*state {
                State::Fulfilled(value) => return Ok(value.clone()),
                State::Poisoned(message) => {
                    return Err(Failure::Error(FutureError::Poisoned {
                        message: message.clone(),
                    }))
                }
                State::Running => {
                    let _blocked = dependency::block_on(id).map_err(Failure::Error)?;
                    self.cell.published.wait(&mut state);
                }
                State::Pending(_) => {
                    if let State::Pending(producer) = mem::replace(&mut *state, State::Running) {
                        break producer;
                    }
                }
            }
        };
        drop(state);

        trace!("evaluating future");
        let evaluating = dependency::enter(id);
        // The stored copy is taken inside the unwind boundary so a panicking
        // `clone` poisons the cell like a panicking producer.
        let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
            let value = producer();
            let stored = value.clone();
            (value, stored)
        }));
        drop(evaluating);

        let mut state = self.cell.state.lock();
        let result = match outcome {
            Ok((value, stored)) => {
                *state = State::Fulfilled(stored);
                trace!("future fulfilled");
                Ok(value)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(%message, "producer panicked, poisoning future");
                *state = State::Poisoned(message);
                Err(Failure::Panicked(payload))
            }
        };
        drop(state);
        self.cell.published.notify_all();

        result
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("status", &self.cell.state.lock().status())
            .finish()
    }
}
