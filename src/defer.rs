//! Deferred cleanup scope.
//!
//! [`defer`] runs a body that receives a [`DeferScope`]. While it runs, the body may register
//! any number of [`Deferred`] cleanup actions. Once the body settles (value, error, or panic):
//!
//! - callbacks run one at a time in registration order, each receiving the body's failure;
//! - every callback runs exactly once, whatever earlier callbacks did;
//! - a failing callback marked [`rethrow`](Deferred::rethrow) replaces the error returned by the
//!   scope (the last such failure wins); other callback failures are logged and dropped;
//! - otherwise the body's own outcome is returned.
//!
//! ```rust
//! use tandem::{defer, Deferred};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let result = defer(|scope| async move {
//!     scope.defer(Deferred::new(|failure| {
//!         assert!(failure.is_none());
//!         Ok(())
//!     }));
//!     Ok::<_, std::io::Error>("done")
//! })
//! .await;
//! assert_eq!(result.unwrap(), "done");
//! # });
//! ```

use crate::safe::safe_call;
use crate::TaskError;
use futures::future::{ready, BoxFuture};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

type Action<E> =
    Box<dyn for<'a> FnOnce(Option<&'a TaskError<E>>) -> BoxFuture<'static, Result<(), E>> + Send>;

/// A cleanup action registered with a [`DeferScope`].
pub struct Deferred<E> {
    action: Action<E>,
    rethrow: bool,
}

impl<E> fmt::Debug for Deferred<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("action", &"<callback>")
            .field("rethrow", &self.rethrow)
            .finish()
    }
}

impl<E> Deferred<E>
where
    E: Send + 'static,
{
    /// Synchronous cleanup action.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce(Option<&TaskError<E>>) -> Result<(), E> + Send + 'static,
    {
        let action: Action<E> = Box::new(move |failure: Option<&TaskError<E>>| {
            let outcome = action(failure);
            Box::pin(ready(outcome)) as BoxFuture<'static, Result<(), E>>
        });
        Self { action, rethrow: false }
    }

    /// Asynchronous cleanup action.
    ///
    /// The returned future may not borrow the failure; copy out whatever it needs first.
    pub fn new_async<F, Fut>(action: F) -> Self
    where
        F: FnOnce(Option<&TaskError<E>>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let action: Action<E> = Box::new(move |failure: Option<&TaskError<E>>| {
            Box::pin(action(failure)) as BoxFuture<'static, Result<(), E>>
        });
        Self { action, rethrow: false }
    }
}

impl<E> Deferred<E> {
    /// Propagate this action's failure out of the scope instead of the body's.
    pub fn rethrow(mut self) -> Self {
        self.rethrow = true;
        self
    }

    pub fn rethrows(&self) -> bool {
        self.rethrow
    }
}

/// Registration handle given to the body of [`defer`].
///
/// Clones share one callback list. Actions registered after the body has settled are ignored.
pub struct DeferScope<E> {
    callbacks: Arc<Mutex<Vec<Deferred<E>>>>,
}

impl<E> Clone for DeferScope<E> {
    fn clone(&self) -> Self {
        Self { callbacks: Arc::clone(&self.callbacks) }
    }
}

impl<E> fmt::Debug for DeferScope<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferScope").field("registered", &self.len()).finish()
    }
}

impl<E> DeferScope<E> {
    fn new() -> Self {
        Self { callbacks: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Register a cleanup action; actions run in registration order.
    pub fn defer(&self, deferred: Deferred<E>) {
        self.lock().push(deferred);
    }

    /// Number of actions registered so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self) -> Vec<Deferred<E>> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Deferred<E>>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run `body`, then every cleanup action it registered.
pub async fn defer<T, E, F, Fut>(body: F) -> Result<T, TaskError<E>>
where
    F: FnOnce(DeferScope<E>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let scope = DeferScope::new();
    let outcome = safe_call(|| body(scope.clone())).await;
    let failure = outcome.as_ref().err();

    let mut rethrown = None;
    for (position, Deferred { action, rethrow }) in scope.take().into_iter().enumerate() {
        match safe_call(|| action(failure)).await {
            Ok(()) => {}
            Err(err) if rethrow => {
                warn!(position, kind = err.name(), "defer: cleanup failed, propagating");
                rethrown = Some(err);
            }
            Err(err) => {
                debug!(position, kind = err.name(), "defer: cleanup failed, ignoring");
            }
        }
    }

    match rethrown {
        Some(err) => Err(err),
        None => outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct TestError(&'static str);

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.0)
        }
    }

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn record(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> Deferred<TestError> {
        let log = Arc::clone(log);
        Deferred::new(move |_| {
            log.lock().unwrap().push(label);
            Ok(())
        })
    }

    #[tokio::test]
    async fn returns_body_value_after_callbacks() {
        let log = recorder();
        let body_log = Arc::clone(&log);
        let result = defer(|scope| async move {
            scope.defer(record(&body_log, "cleanup"));
            body_log.lock().unwrap().push("body");
            Ok::<_, TestError>(7)
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(*log.lock().unwrap(), vec!["body", "cleanup"]);
    }

    #[tokio::test]
    async fn callbacks_run_in_registration_order_after_failure() {
        let log = recorder();
        let body_log = Arc::clone(&log);
        let result: Result<(), _> = defer(|scope| async move {
            scope.defer(record(&body_log, "A"));
            scope.defer(record(&body_log, "B"));
            scope.defer(record(&body_log, "C"));
            Err(TestError("body"))
        })
        .await;

        assert_eq!(result, Err(TaskError::Inner(TestError("body"))));
        assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn callbacks_receive_body_failure() {
        let seen = Arc::new(Mutex::new(None));
        let seen_in_body = Arc::clone(&seen);
        let _: Result<(), _> = defer(|scope| async move {
            scope.defer(Deferred::new(move |failure: Option<&TaskError<TestError>>| {
                *seen_in_body.lock().unwrap() = failure.cloned();
                Ok(())
            }));
            Err(TestError("broken"))
        })
        .await;

        assert_eq!(*seen.lock().unwrap(), Some(TaskError::Inner(TestError("broken"))));
    }

    #[tokio::test]
    async fn rethrow_overrides_body_failure() {
        let result: Result<(), _> = defer(|scope| async move {
            scope.defer(Deferred::new(|_| Err(TestError("A quiet"))));
            scope.defer(Deferred::new(|_| Err(TestError("B loud"))).rethrow());
            scope.defer(Deferred::new(|_| Ok(())));
            Err(TestError("body"))
        })
        .await;

        assert_eq!(result, Err(TaskError::Inner(TestError("B loud"))));
    }

    #[tokio::test]
    async fn last_rethrow_wins() {
        let result: Result<u8, _> = defer(|scope| async move {
            scope.defer(Deferred::new(|_| Err(TestError("first"))).rethrow());
            scope.defer(Deferred::new(|_| Err(TestError("second"))).rethrow());
            Ok(1)
        })
        .await;

        assert_eq!(result, Err(TaskError::Inner(TestError("second"))));
    }

    #[tokio::test]
    async fn quiet_callback_failure_keeps_body_value() {
        let result = defer(|scope| async move {
            scope.defer(Deferred::new(|_| Err(TestError("ignored"))));
            Ok::<_, TestError>("value")
        })
        .await;
        assert_eq!(result, Ok("value"));
    }

    #[tokio::test]
    async fn panicking_callback_does_not_skip_later_ones() {
        let log = recorder();
        let body_log = Arc::clone(&log);
        let result = defer(|scope| async move {
            scope.defer(Deferred::new(|_| panic!("cleanup exploded")));
            scope.defer(record(&body_log, "after panic"));
            Ok::<_, TestError>(())
        })
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(*log.lock().unwrap(), vec!["after panic"]);
    }

    #[tokio::test]
    async fn body_panic_is_reported_to_callbacks() {
        let seen_panic = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&seen_panic);
        let result: Result<(), TaskError<TestError>> = defer(|scope| async move {
            scope.defer(Deferred::new(move |failure| {
                *flag.lock().unwrap() = failure.map_or(false, |e| e.is_panic());
                Ok(())
            }));
            if true {
                panic!("body exploded");
            }
            Ok(())
        })
        .await;

        assert!(result.unwrap_err().is_panic());
        assert!(*seen_panic.lock().unwrap());
    }

    #[tokio::test]
    async fn async_callbacks_are_awaited_in_order() {
        let log = recorder();
        let body_log = Arc::clone(&log);
        let result = defer(|scope| async move {
            for label in ["first", "second"] {
                let log = Arc::clone(&body_log);
                scope.defer(Deferred::new_async(move |_| async move {
                    tokio::task::yield_now().await;
                    log.lock().unwrap().push(label);
                    Ok(())
                }));
            }
            Ok::<_, TestError>(())
        })
        .await;

        assert_eq!(result, Ok(()));
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn async_rethrow_propagates() {
        let result = defer(|scope| async move {
            scope.defer(
                Deferred::new_async(|failure: Option<&TaskError<TestError>>| {
                    let body_failed = failure.is_some();
                    async move {
                        if body_failed {
                            Ok(())
                        } else {
                            Err(TestError("close failed"))
                        }
                    }
                })
                .rethrow(),
            );
            Ok::<_, TestError>(5)
        })
        .await;

        assert_eq!(result, Err(TaskError::Inner(TestError("close failed"))));
    }

    #[tokio::test]
    async fn scope_reports_registrations() {
        let result = defer(|scope: DeferScope<TestError>| async move {
            assert!(scope.is_empty());
            scope.defer(Deferred::new(|_| Ok(())));
            scope.clone().defer(Deferred::new(|_| Ok(())).rethrow());
            Ok::<_, TestError>(scope.len())
        })
        .await;
        assert_eq!(result, Ok(2));
    }
}
