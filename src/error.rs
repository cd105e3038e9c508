//! Error types for flux-future
//!
//! Defines the failures a future cell or a fan-out can report, plus the
//! errors raised while loading the runtime configuration.

use std::any::Any;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a future evaluation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FutureError {
    #[error("producer panicked: {message}")]
    Panicked { message: String },

    #[error("future poisoned by an earlier panic: {message}")]
    Poisoned { message: String },

    #[error("cyclic wait: producer awaited a future it is evaluating")]
    Cycle,

    #[error("failed to spawn fan-out task: {message}")]
    Spawn { message: String },
}

impl FutureError {
    /// Build a `Panicked` error from a caught panic payload
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        FutureError::Panicked {
            message: panic_message(payload),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("runtime configuration already installed")]
    AlreadySet,
}

/// Result type alias for fallible future operations
pub type FutureResult<T> = Result<T, FutureError>;

/// Extract a readable message from a panic payload.
///
/// `panic!` payloads are either `&'static str` or `String`; anything else
/// is reported by type only.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
