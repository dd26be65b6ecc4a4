//! Error types for the async flight driver
//!
//! The coordinator itself forwards failures verbatim through the host's
//! tagger. These types are only produced by [`run_flight`](super::run_flight),
//! which has to hand the forwarded failure back as a `Result`.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Errors returned when a driven flight does not succeed
///
/// The error type is generic over `E`, the failure type of the operation
/// being retried.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The retry budget ran out and the final failure was forwarded
    Exhausted {
        /// Retries performed before giving up
        retries: u32,
        /// The failure from the final attempt
        source: E,
        /// Total duration spent across all attempts
        total_duration: Duration,
    },
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted {
                retries,
                source,
                total_duration,
            } => {
                write!(
                    f,
                    "retry exhausted after {} retries over {:.2}s: {}",
                    retries,
                    total_duration.as_secs_f64(),
                    source
                )
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
        }
    }
}

impl<E> RetryError<E> {
    /// Create a new exhausted error
    pub fn exhausted(retries: u32, source: E, total_duration: Duration) -> Self {
        RetryError::Exhausted {
            retries,
            source,
            total_duration,
        }
    }

    /// Get the number of retries performed
    pub fn retries(&self) -> u32 {
        match self {
            RetryError::Exhausted { retries, .. } => *retries,
        }
    }

    /// Check if this error indicates the budget was exhausted
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Get the forwarded failure, consuming this error
    pub fn into_source(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
        }
    }

    /// Map the failure type using a closure
    pub fn map_err<F, E2>(self, f: F) -> RetryError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            RetryError::Exhausted {
                retries,
                source,
                total_duration,
            } => RetryError::Exhausted {
                retries,
                source: f(source),
                total_duration,
            },
        }
    }
}
