//! Retry engine.
//!
//! Semantics:
//! - `times` counts total attempts (initial try + retries) and is always >= 1.
//! - Each attempt receives an [`Attempt`] and returns `Result<T, Halt<E>>`:
//!   `Ok` stops with the value, `Halt::Retry` (also produced by `?`) schedules another attempt,
//!   `Halt::Exit` (via [`Attempt::exit`]) stops immediately with the unwrapped error.
//! - A panicking attempt counts as an ordinary, retryable failure.
//! - Between attempts the engine sleeps the fixed `delay` (if any), then `backoff(n)` (if any),
//!   where `n` is the number of the attempt that just failed. Both sleeps apply when both are set.
//! - Exhausting the budget returns the last failure as-is.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use tandem::{Backoff, Halt, InstantSleeper, RetryPolicy};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let policy = RetryPolicy::builder()
//!     .times(4)
//!     .backoff(Backoff::exponential(Duration::from_millis(100)))
//!     .with_sleeper(InstantSleeper)
//!     .build()
//!     .unwrap();
//!
//! let value = policy
//!     .execute(|attempt| async move {
//!         if attempt.number() < 3 {
//!             return Err(Halt::Retry("not yet"));
//!         }
//!         Ok(attempt.number())
//!     })
//!     .await;
//! assert_eq!(value, Ok(3));
//! # });
//! ```

use crate::safe::safe_call;
use crate::{Backoff, BuildError, Jitter, Sleeper, TaskError, TokioSleeper};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMES: usize = 3;

/// The non-success outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt<E> {
    /// Ordinary failure; retried while budget remains.
    Retry(E),
    /// Stop now and surface this error, regardless of remaining budget.
    Exit(E),
}

impl<E> Halt<E> {
    pub fn is_exit(&self) -> bool {
        matches!(self, Halt::Exit(_))
    }

    pub fn into_inner(self) -> E {
        match self {
            Halt::Retry(e) | Halt::Exit(e) => e,
        }
    }
}

impl<E> From<E> for Halt<E> {
    fn from(err: E) -> Self {
        Halt::Retry(err)
    }
}

/// Handle passed to every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    number: usize,
    budget: usize,
}

impl Attempt {
    /// 1-based attempt number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Total attempts allowed.
    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn is_last(&self) -> bool {
        self.number >= self.budget
    }

    /// Abort the retry loop with `err`; no further attempts are made.
    pub fn exit<E>(&self, err: E) -> Halt<E> {
        Halt::Exit(err)
    }
}

/// Plain retry settings, as accepted by [`retry`].
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Total attempts.
    pub times: usize,
    /// Fixed sleep between attempts.
    pub delay: Option<Duration>,
    /// Computed sleep between attempts, applied after `delay` when both are set.
    pub backoff: Option<Backoff>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self { times: DEFAULT_TIMES, delay: None, backoff: None }
    }
}

/// Configured retry engine.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    times: usize,
    delay: Option<Duration>,
    backoff: Option<Backoff>,
    jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            times: DEFAULT_TIMES,
            delay: None,
            backoff: None,
            jitter: Jitter::None,
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

impl RetryPolicy {
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::new()
    }

    /// Build a policy from plain options, rejecting `times == 0`.
    pub fn from_options(options: RetryOptions) -> Result<Self, BuildError> {
        let RetryOptions { times, delay, backoff } = options;
        let mut builder = Self::builder().times(times);
        builder.delay = delay;
        builder.backoff = backoff;
        builder.build()
    }

    pub fn times(&self) -> usize {
        self.times
    }

    /// Run `operation` until it succeeds, exits, or the attempt budget runs out.
    pub async fn execute<T, E, Fut, Op>(&self, mut operation: Op) -> Result<T, TaskError<E>>
    where
        Op: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, Halt<E>>>,
    {
        let mut number = 1;
        loop {
            let attempt = Attempt { number, budget: self.times };
            let failure = match safe_call(|| operation(attempt)).await {
                Ok(value) => return Ok(value),
                Err(TaskError::Inner(Halt::Exit(err))) => {
                    debug!(attempt = number, "retry: operation requested exit");
                    return Err(TaskError::Inner(err));
                }
                Err(failure) => failure.map_inner(Halt::into_inner),
            };

            if attempt.is_last() {
                warn!(attempts = number, kind = failure.name(), "retry: attempts exhausted");
                return Err(failure);
            }

            let backoff = self.backoff.as_ref().map(|b| self.jitter.apply(b.delay(number)));
            debug!(
                attempt = number,
                kind = failure.name(),
                delay = ?self.delay,
                backoff = ?backoff,
                "retry: attempt failed, scheduling another"
            );
            if let Some(delay) = self.delay {
                self.sleeper.sleep(delay).await;
            }
            if let Some(backoff) = backoff {
                self.sleeper.sleep(backoff).await;
            }
            number += 1;
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug)]
pub struct RetryPolicyBuilder {
    times: usize,
    delay: Option<Duration>,
    backoff: Option<Backoff>,
    jitter: Jitter,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicyBuilder {
    /// 3 attempts, no delay, no backoff, no jitter, tokio sleeper.
    pub fn new() -> Self {
        let RetryPolicy { times, delay, backoff, jitter, sleeper } = RetryPolicy::default();
        Self { times, delay, backoff, jitter, sleeper }
    }

    /// Set total attempts (initial + retries). Must be > 0.
    pub fn times(mut self, times: usize) -> Self {
        self.times = times;
        self
    }

    /// Fixed sleep between attempts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Computed sleep between attempts.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = Some(backoff);
        self
    }

    /// Jitter applied to the backoff sleep only.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn build(self) -> Result<RetryPolicy, BuildError> {
        if self.times == 0 {
            return Err(BuildError::InvalidAttempts(0));
        }
        Ok(RetryPolicy {
            times: self.times,
            delay: self.delay,
            backoff: self.backoff,
            jitter: self.jitter,
            sleeper: self.sleeper,
        })
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry `operation` with plain options on the tokio timer.
///
/// `times == 0` is treated as a single attempt.
pub async fn retry<T, E, Fut, Op>(options: RetryOptions, operation: Op) -> Result<T, TaskError<E>>
where
    Op: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, Halt<E>>>,
{
    let options = if options.times == 0 {
        warn!("retry: times = 0, running a single attempt");
        RetryOptions { times: 1, ..options }
    } else {
        options
    };
    let RetryOptions { times, delay, backoff } = options;
    let policy = RetryPolicy { times, delay, backoff, ..RetryPolicy::default() };
    policy.execute(operation).await
}
