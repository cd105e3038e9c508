//! Runtime support module
//!
//! Thread fan-out, the counting barrier, evaluation dependency tracking and
//! the configuration shared by every combinator that forces concurrent
//! evaluation.

pub mod concurrency;
pub mod config;
pub mod dependency;

pub use concurrency::{Slot, TaskFailure, TaskGroup, WaitGroup};
pub use config::RuntimeConfig;
