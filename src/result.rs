//! Success/failure value type
//!
//! `Outcome<T>` holds either a value or an `anyhow::Error`. It composes with
//! `map` and `and_then`, and is meant to be carried inside a `Future` when
//! the deferred work can fail: `Future<Outcome<T>>`.

use anyhow::Error;
use std::fmt;
use std::sync::Arc;

/// Either a success value or an error
///
/// The error is reference counted so that an `Outcome` can be cloned out of
/// a memoized future.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    /// Success variant containing the value
    Ok(T),
    /// Error variant containing the error
    Err(Arc<Error>),
}

impl<T> Outcome<T> {
    /// Wrap a success value
    pub fn ok(value: T) -> Self {
        Outcome::Ok(value)
    }

    /// Wrap an error
    pub fn err<E>(error: E) -> Self
    where
        E: Into<Error>,
    {
        Outcome::Err(Arc::new(error.into()))
    }

    /// Returns true if the outcome is Ok
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok(_))
    }

    /// Returns true if the outcome is Err
    pub fn is_err(&self) -> bool {
        matches!(self, Outcome::Err(_))
    }

    /// Apply `f` to the success value, passing errors through
    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Ok(t) => Outcome::Ok(f(t)),
            Outcome::Err(e) => Outcome::Err(e),
        }
    }

    /// Chain a fallible step onto the success value
    pub fn and_then<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> Outcome<U>,
    {
        self.map(f).flatten()
    }

    /// Split into the value and the error; exactly one is present
    pub fn unwrap(self) -> (Option<T>, Option<Arc<Error>>) {
        match self {
            Outcome::Ok(t) => (Some(t), None),
            Outcome::Err(e) => (None, Some(e)),
        }
    }

    /// Returns the success value or `default`
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Outcome::Ok(t) => t,
            Outcome::Err(_) => default,
        }
    }

    /// Convert into a standard `Result`
    pub fn into_result(self) -> Result<T, Arc<Error>> {
        self.into()
    }
}

impl<T> Outcome<Outcome<T>> {
    /// Remove one level of nesting
    pub fn flatten(self) -> Outcome<T> {
        match self {
            Outcome::Ok(inner) => inner,
            Outcome::Err(e) => Outcome::Err(e),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T>
where
    E: Into<Error>,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(t) => Outcome::ok(t),
            Err(e) => Outcome::err(e),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, Arc<Error>> {
    fn from(outcome: Outcome<T>) -> Self {
        match outcome {
            Outcome::Ok(t) => Ok(t),
            Outcome::Err(e) => Err(e),
        }
    }
}

impl<T> fmt::Display for Outcome<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ok(t) => write!(f, "Ok({})", t),
            Outcome::Err(e) => write!(f, "Err({})", e),
        }
    }
}
