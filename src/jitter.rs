//! Jitter applied to computed backoff sleeps.
//!
//! - `None`: exact backoff delay. The default, so retry timing stays deterministic.
//! - `Full`: uniform in `[0, delay]`.
//! - `Equal`: uniform in `[delay/2, delay]`, keeping a floor under the randomness.
//!
//! Jitter only ever shortens a delay; the fixed `delay` of a retry policy is never jittered.
//! Durations are sampled at nanosecond precision and saturate at `u64::MAX` nanoseconds.

use rand::{rng, Rng};
use std::time::Duration;

/// Jitter strategy for randomizing backoff delays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Jitter {
    #[default]
    None,
    Full,
    Equal,
}

impl Jitter {
    pub fn full() -> Self {
        Jitter::Full
    }

    pub fn equal() -> Self {
        Jitter::Equal
    }

    /// Apply jitter using the thread-local RNG.
    pub fn apply(&self, delay: Duration) -> Duration {
        self.apply_with_rng(delay, &mut rng())
    }

    /// Apply jitter with a caller-supplied RNG.
    pub fn apply_with_rng<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        match self {
            Jitter::None => delay,
            Jitter::Full if nanos == 0 => Duration::ZERO,
            Jitter::Full => Duration::from_nanos(rng.random_range(0..=nanos)),
            Jitter::Equal if nanos == 0 => Duration::ZERO,
            Jitter::Equal => Duration::from_nanos(rng.random_range(nanos / 2..=nanos)),
        }
    }
}
