//! Flux futures
//!
//! Lazy, memoizing computation cells and the combinators that fan their
//! evaluation out across threads.
//!
//! ```
//! use flux_future::{all, join, Future};
//!
//! let a = Future::new(|| 2 + 2);
//! let b = a.map(|n| n.to_string());
//! assert_eq!(join(&a, &b), (4, "4".to_string()));
//!
//! let many = all((1..=3).map(Future::ready));
//! assert_eq!(many.wait(), vec![1, 2, 3]);
//! ```

pub mod cli;
pub mod error;
pub mod future;
pub mod result;
pub mod runtime;

// Re-export core types for convenience
pub use error::{ConfigError, FutureError, FutureResult};
pub use future::{all, all_settled, join, join3, join4, join5, try_all, try_join, Future, Status};
pub use result::Outcome;
pub use runtime::RuntimeConfig;
