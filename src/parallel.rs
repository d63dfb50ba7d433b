//! Bounded-concurrency executor.
//!
//! Maps a worker function over a list of items with at most `limit` invocations in flight.
//!
//! - Every item is tagged with its input position and pushed into a shared [`WorkPool`].
//! - `min(limit, len)` workers each pop an item, run the worker function under
//!   [`safe_call`], record a [`WorkItemResult`], and loop until the pool is empty.
//! - Results are restored to input order. Any failure yields an [`AggregateError`] holding
//!   every failure in input order; otherwise the values are returned in input order.
//!
//! One item failing (or panicking) never keeps the remaining items from running.
//!
//! Example
//! ```rust
//! use tandem::parallel;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let doubled = parallel(2, vec![1, 2, 3, 4, 5], |x| async move { Ok::<_, ()>(x * 2) }).await;
//! assert_eq!(doubled.unwrap(), vec![2, 4, 6, 8, 10]);
//! # });
//! ```

use crate::safe::safe_call;
use crate::{AggregateError, BuildError, TaskError};
use futures::future::join_all;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

/// An input item paired with its original position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<I> {
    pub index: usize,
    pub payload: I,
}

/// The settled outcome of one [`WorkItem`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItemResult<T, E> {
    pub index: usize,
    pub outcome: Result<T, TaskError<E>>,
}

/// Pending items shared by all workers of one run.
///
/// The only operation is an atomic pop; once popped, an item belongs to that worker.
#[derive(Debug)]
pub struct WorkPool<I> {
    pending: Mutex<VecDeque<WorkItem<I>>>,
}

impl<I> WorkPool<I> {
    pub fn new<It>(items: It) -> Self
    where
        It: IntoIterator<Item = I>,
    {
        let pending =
            items.into_iter().enumerate().map(|(index, payload)| WorkItem { index, payload });
        Self { pending: Mutex::new(pending.collect()) }
    }

    /// Take the next item in input order, if any remain.
    pub fn pop(&self) -> Option<WorkItem<I>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Restore input order and split results into values or an aggregate of every failure.
///
/// Positions in `0..total` without a recorded result are reported as [`TaskError::Aborted`].
pub(crate) fn assemble<T, E>(
    total: usize,
    results: impl IntoIterator<Item = WorkItemResult<T, E>>,
) -> Result<Vec<T>, AggregateError<E>> {
    let mut slots: Vec<Option<Result<T, TaskError<E>>>> = (0..total).map(|_| None).collect();
    for WorkItemResult { index, outcome } in results {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(outcome);
        }
    }

    let mut values = Vec::with_capacity(total);
    let mut errors = Vec::new();
    for slot in slots {
        match slot.unwrap_or(Err(TaskError::Aborted)) {
            Ok(value) => values.push(value),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(values)
    } else {
        debug!(failed = errors.len(), total, "batch settled with failures");
        Err(AggregateError::new(errors))
    }
}

async fn drain<I, T, E, F, Fut>(
    worker: usize,
    pool: &WorkPool<I>,
    f: &F,
) -> Vec<WorkItemResult<T, E>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut done = Vec::new();
    while let Some(WorkItem { index, payload }) = pool.pop() {
        let outcome = safe_call(|| f(payload)).await;
        done.push(WorkItemResult { index, outcome });
    }
    trace!(worker, processed = done.len(), "worker drained pool");
    done
}

/// Executor configuration: the concurrency cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelPolicy {
    limit: usize,
}

impl ParallelPolicy {
    /// Create an executor running at most `limit` items at once. `limit` must be > 0.
    pub fn new(limit: usize) -> Result<Self, BuildError> {
        if limit == 0 {
            return Err(BuildError::InvalidLimit(limit));
        }
        Ok(Self { limit })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `f` over `items` on the current task, interleaving up to `limit` invocations.
    pub async fn execute<I, T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = I>,
        f: F,
    ) -> Result<Vec<T>, AggregateError<E>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let pool = WorkPool::new(items);
        let total = pool.len();
        let workers = self.limit.min(total);
        let f = &f;
        let pool = &pool;

        let results = join_all((0..workers).map(|worker| drain(worker, pool, f))).await;
        assemble(total, results.into_iter().flatten())
    }

    /// Run `f` over `items` with up to `limit` workers spawned as tokio tasks.
    ///
    /// Unlike [`execute`](Self::execute), workers may run on different threads of a multi-thread
    /// runtime. Must be called from within a tokio runtime.
    pub async fn execute_spawned<I, T, E, F, Fut>(
        &self,
        items: impl IntoIterator<Item = I>,
        f: F,
    ) -> Result<Vec<T>, AggregateError<E>>
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let pool = Arc::new(WorkPool::new(items));
        let total = pool.len();
        let f = Arc::new(f);

        let mut workers = JoinSet::new();
        for worker in 0..self.limit.min(total) {
            let pool = Arc::clone(&pool);
            let f = Arc::clone(&f);
            workers.spawn(async move { drain(worker, &pool, f.as_ref()).await });
        }

        let mut results = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(done) => results.extend(done),
                Err(err) => warn!(error = %err, "worker task ended before draining its items"),
            }
        }
        assemble(total, results)
    }
}

/// Run `f` over `items` with at most `limit` invocations in flight, preserving input order.
///
/// `limit == 0` is treated as 1.
pub async fn parallel<I, T, E, F, Fut>(
    limit: usize,
    items: impl IntoIterator<Item = I>,
    f: F,
) -> Result<Vec<T>, AggregateError<E>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let policy = ParallelPolicy::new(limit).unwrap_or_else(|_| {
        warn!("parallel: limit = 0, running with a single worker");
        ParallelPolicy { limit: 1 }
    });
    policy.execute(items, f).await
}
