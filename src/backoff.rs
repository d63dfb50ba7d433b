//! Backoff: the attempt number → sleep duration function used between retries.
//!
//! `attempt` is the 1-based number of the attempt that just failed; `delay(0)` is always zero.
//! Besides the built-in constant, linear, and exponential curves, any closure can serve as a
//! backoff via [`Backoff::custom`]. Built-in curves saturate at [`MAX_BACKOFF`].
//!
//! ```rust
//! use std::time::Duration;
//! use tandem::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(100))
//!     .with_max(Duration::from_secs(2))
//!     .unwrap();
//! assert_eq!(backoff.delay(1), Duration::from_millis(100));
//! assert_eq!(backoff.delay(2), Duration::from_millis(200));
//! assert_eq!(backoff.delay(6), Duration::from_secs(2));
//!
//! let squared = Backoff::custom(|attempt| Duration::from_millis((attempt * attempt) as u64));
//! assert_eq!(squared.delay(3), Duration::from_millis(9));
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Ceiling for the built-in curves (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors returned by backoff configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackoffError {
    #[error("with_max is only valid for linear or exponential backoff")]
    MaxNotSupported,
    #[error("max must be greater than zero")]
    MaxMustBePositive,
    #[error("max ({max:?}) must be >= base ({base:?})")]
    MaxLessThanBase { base: Duration, max: Duration },
}

type BackoffFn = Arc<dyn Fn(usize) -> Duration + Send + Sync>;

#[derive(Clone)]
enum Curve {
    Constant(Duration),
    Linear { base: Duration, max: Option<Duration> },
    Exponential { base: Duration, max: Option<Duration> },
    Custom(BackoffFn),
}

/// Computes the sleep applied after a failed attempt.
#[derive(Clone)]
pub struct Backoff {
    curve: Curve,
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.curve {
            Curve::Constant(delay) => f.debug_tuple("Constant").field(delay).finish(),
            Curve::Linear { base, max } => {
                f.debug_struct("Linear").field("base", base).field("max", max).finish()
            }
            Curve::Exponential { base, max } => {
                f.debug_struct("Exponential").field("base", base).field("max", max).finish()
            }
            Curve::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

impl Backoff {
    /// Same delay after every failed attempt.
    pub fn constant(delay: Duration) -> Self {
        Self { curve: Curve::Constant(delay) }
    }

    /// `base * attempt`.
    pub fn linear(base: Duration) -> Self {
        Self { curve: Curve::Linear { base, max: None } }
    }

    /// `base * 2^(attempt - 1)`.
    pub fn exponential(base: Duration) -> Self {
        Self { curve: Curve::Exponential { base, max: None } }
    }

    /// Arbitrary attempt → duration function. Never called with `attempt == 0`.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(usize) -> Duration + Send + Sync + 'static,
    {
        Self { curve: Curve::Custom(Arc::new(f)) }
    }

    /// Cap a linear or exponential curve.
    pub fn with_max(mut self, max: Duration) -> Result<Self, BackoffError> {
        if max.is_zero() {
            return Err(BackoffError::MaxMustBePositive);
        }
        match &mut self.curve {
            Curve::Linear { base, max: cap } | Curve::Exponential { base, max: cap } => {
                if max < *base {
                    return Err(BackoffError::MaxLessThanBase { base: *base, max });
                }
                *cap = Some(max);
                Ok(self)
            }
            Curve::Constant(_) | Curve::Custom(_) => Err(BackoffError::MaxNotSupported),
        }
    }

    /// Delay to sleep after `attempt` failed.
    pub fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        match &self.curve {
            Curve::Constant(delay) => *delay,
            Curve::Linear { base, max } => {
                let factor = attempt.min(u32::MAX as usize) as u32;
                let linear = base.checked_mul(factor).unwrap_or(MAX_BACKOFF);
                cap(linear, *max)
            }
            Curve::Exponential { base, max } => {
                let exponent = (attempt - 1).min(u32::MAX as usize) as u32;
                let nanos = base.as_nanos().saturating_mul(2u128.saturating_pow(exponent));
                let exp = Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64);
                cap(exp, *max)
            }
            Curve::Custom(f) => f(attempt),
        }
    }
}

fn cap(delay: Duration, max: Option<Duration>) -> Duration {
    max.map_or(delay, |m| delay.min(m)).min(MAX_BACKOFF)
}
