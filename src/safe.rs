//! Failure capture for sync and async operations.
//!
//! Every helper here runs the wrapped operation exactly once and reports its outcome as a
//! `Result<T, TaskError<E>>`: `Err(e)` becomes [`TaskError::Inner`] and a panic becomes
//! [`TaskError::Panicked`]. Nothing unwinds past these functions, which is what lets the
//! executors keep sibling tasks running when one of them fails.
//!
//! Example
//! ```rust
//! use tandem::safe::{safe_call, into_pair};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let result = safe_call(|| async { Err::<u32, _>("nope") }).await;
//! let (err, value) = into_pair(result);
//! assert!(err.is_some());
//! assert!(value.is_none());
//! # });
//! ```

use crate::TaskError;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Invoke `operation` and await its future, capturing errors and panics.
///
/// A panic raised while building the future is captured the same way as one raised while
/// polling it.
pub async fn safe_call<T, E, Fut, Op>(operation: Op) -> Result<T, TaskError<E>>
where
    Op: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match catch_unwind(AssertUnwindSafe(operation)) {
        Ok(future) => settle(future).await,
        Err(payload) => Err(panic_error(payload)),
    }
}

/// Synchronous counterpart of [`safe_call`]; the outcome is available immediately.
pub fn safe_call_sync<T, E, Op>(operation: Op) -> Result<T, TaskError<E>>
where
    Op: FnOnce() -> Result<T, E>,
{
    match catch_unwind(AssertUnwindSafe(operation)) {
        Ok(result) => result.map_err(TaskError::Inner),
        Err(payload) => Err(panic_error(payload)),
    }
}

/// Await an already-built future, capturing errors and panics.
pub async fn settle<T, E, Fut>(future: Fut) -> Result<T, TaskError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result.map_err(TaskError::Inner),
        Err(payload) => Err(panic_error(payload)),
    }
}

/// View a result as an `(error, value)` pair; exactly one side is `Some`.
pub fn into_pair<T, E>(result: Result<T, E>) -> (Option<E>, Option<T>) {
    match result {
        Ok(value) => (None, Some(value)),
        Err(err) => (Some(err), None),
    }
}

/// Run `future`, turning any failure (error or panic) into `None`.
pub async fn guard<T, E, Fut>(future: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
{
    settle(future).await.ok()
}

/// Run `future`, turning only failures accepted by `should_guard` into `Ok(None)`.
///
/// Failures rejected by the predicate are returned unchanged.
pub async fn guard_if<T, E, Fut, P>(future: Fut, should_guard: P) -> Result<Option<T>, TaskError<E>>
where
    Fut: Future<Output = Result<T, E>>,
    P: FnOnce(&TaskError<E>) -> bool,
{
    match settle(future).await {
        Ok(value) => Ok(Some(value)),
        Err(err) if should_guard(&err) => Ok(None),
        Err(err) => Err(err),
    }
}

pub(crate) fn panic_error<E>(payload: Box<dyn Any + Send>) -> TaskError<E> {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    TaskError::Panicked { message }
}
