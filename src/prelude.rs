//! Convenient re-exports for common tandem types.
pub use crate::{
    all::{all, all_keyed},
    backoff::{Backoff, BackoffError, MAX_BACKOFF},
    defer::{defer, DeferScope, Deferred},
    error::{AggregateError, BuildError, TaskError},
    jitter::Jitter,
    parallel::{parallel, ParallelPolicy},
    retry::{retry, Attempt, Halt, RetryOptions, RetryPolicy},
    safe::{safe_call, settle},
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
};
