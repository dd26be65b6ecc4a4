//! Retry delay strategies
//!
//! This module implements the delay policies consulted by the coordinator
//! before each retry. Every policy is a pure mapping from a 1-indexed retry
//! attempt to a wait duration.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A pure mapping from retry attempt number to the delay before that retry
///
/// Implementations must be deterministic: the same attempt always yields the
/// same duration.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{exponential_delay, DelayPolicy};
/// use std::time::Duration;
///
/// let policy = exponential_delay(Duration::from_millis(500), Duration::from_secs(4));
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1000));
/// assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(4));
/// ```
pub trait DelayPolicy: Send + Sync {
    /// Delay before retry number `attempt` (1-indexed)
    fn delay_for_attempt(&self, attempt: u32) -> Duration;
}

/// Same delay before every retry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantDelay {
    base: Duration,
}

impl ConstantDelay {
    /// The delay returned for every attempt
    pub fn base(&self) -> Duration {
        self.base
    }
}

impl DelayPolicy for ConstantDelay {
    fn delay_for_attempt(&self, _attempt: u32) -> Duration {
        self.base
    }
}

/// Doubling delay clamped at a cap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentialDelay {
    base: Duration,
    cap: Duration,
}

impl ExponentialDelay {
    /// Delay used for the first retry
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Upper bound on any computed delay
    pub fn cap(&self) -> Duration {
        self.cap
    }
}

impl DelayPolicy for ExponentialDelay {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        // Attempt is 1-indexed; attempt 0 is treated like the first retry
        let exponent = attempt.saturating_sub(1);

        1u32.checked_shl(exponent)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.cap, |delay| delay.min(self.cap))
    }
}

/// Create a policy that waits `base` before every retry
pub fn constant_delay(base: Duration) -> ConstantDelay {
    ConstantDelay { base }
}

/// Create a policy returning `min(cap, base * 2^(attempt - 1))`
///
/// Overflowing products saturate to `cap`.
pub fn exponential_delay(base: Duration, cap: Duration) -> ExponentialDelay {
    ExponentialDelay { base, cap }
}

/// A delay policy backed by a closure
///
/// Use [`from_fn`] to build one.
#[derive(Clone)]
pub struct FnDelay<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnDelay<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnDelay").finish_non_exhaustive()
    }
}

impl<F> DelayPolicy for FnDelay<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (self.f)(attempt)
    }
}

/// Wrap a caller-supplied `attempt -> delay` function as a [`DelayPolicy`]
///
/// The closure is expected to be pure.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{from_fn, DelayPolicy};
/// use std::time::Duration;
///
/// let linear = from_fn(|attempt| Duration::from_millis(100) * attempt);
/// assert_eq!(linear.delay_for_attempt(3), Duration::from_millis(300));
/// ```
pub fn from_fn<F>(f: F) -> FnDelay<F>
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    FnDelay { f }
}

/// The delay policies that can be expressed in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Backoff {
    /// Fixed delay between retries
    Constant(ConstantDelay),

    /// Doubling delay with an upper bound
    Exponential(ExponentialDelay),
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Exponential(exponential_delay(
            Duration::from_millis(1000),
            Duration::from_millis(30000),
        ))
    }
}

impl From<ConstantDelay> for Backoff {
    fn from(policy: ConstantDelay) -> Self {
        Backoff::Constant(policy)
    }
}

impl From<ExponentialDelay> for Backoff {
    fn from(policy: ExponentialDelay) -> Self {
        Backoff::Exponential(policy)
    }
}

impl DelayPolicy for Backoff {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            Backoff::Constant(policy) => policy.delay_for_attempt(attempt),
            Backoff::Exponential(policy) => policy.delay_for_attempt(attempt),
        }
    }
}

impl<T: DelayPolicy + ?Sized> DelayPolicy for Arc<T> {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (**self).delay_for_attempt(attempt)
    }
}

impl<T: DelayPolicy + ?Sized> DelayPolicy for Box<T> {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (**self).delay_for_attempt(attempt)
    }
}
