#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # tandem
//!
//! Small async orchestration primitives for Rust: bounded-concurrency mapping, await-all,
//! retries with backoff, and deferred cleanup, all sharing one failure model.
//!
//! ## Features
//!
//! - **`parallel`**: run a worker over many items with at most N in flight, keeping input order
//! - **`all` / `all_keyed`**: await a fixed set of operations, positional or keyed
//! - **`retry`**: attempt budgets, fixed delay, backoff curves, and early exit
//! - **`defer`**: cleanup actions that always run, in registration order
//! - **`safe_call`**: failures and panics captured as values, never unwound
//! - **`AggregateError`**: every failure of a batch reported together, in input order
//!
//! ## Quick Start
//!
//! ```rust
//! use tandem::{parallel, retry, Halt, RetryOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let lengths = parallel(4, vec!["a", "bb", "ccc"], |s| async move {
//!         Ok::<_, std::io::Error>(s.len())
//!     })
//!     .await
//!     .unwrap();
//!     assert_eq!(lengths, vec![1, 2, 3]);
//!
//!     let value = retry(RetryOptions::default(), |attempt| async move {
//!         if attempt.number() == 1 {
//!             return Err(Halt::Retry("flaky"));
//!         }
//!         Ok(attempt.number())
//!     })
//!     .await;
//!     assert_eq!(value, Ok(2));
//! }
//! ```

pub mod all;
pub mod backoff;
pub mod defer;
pub mod error;
pub mod jitter;
pub mod parallel;
pub mod prelude;
pub mod retry;
pub mod safe;
pub mod sequence;
pub mod sleeper;

// Re-exports
pub use all::{all, all_keyed};
pub use backoff::{Backoff, BackoffError};
pub use defer::{defer, DeferScope, Deferred};
pub use error::{AggregateError, BuildError, TaskError};
pub use jitter::Jitter;
pub use parallel::{parallel, ParallelPolicy, WorkItem, WorkItemResult, WorkPool};
pub use retry::{retry, Attempt, Halt, RetryOptions, RetryPolicy, RetryPolicyBuilder};
pub use safe::{guard, guard_if, into_pair, safe_call, safe_call_sync, settle};
pub use sleeper::{sleep, InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
