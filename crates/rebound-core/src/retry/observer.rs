//! Flight observation and logging
//!
//! This module provides the `RetryObserver` trait for monitoring a flight
//! and a `TracingObserver` implementation that logs using the `tracing` crate.
//! Observers never see the failure value; the coordinator keeps it opaque.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use super::coordinator::FlightId;

/// Observer trait for flight events
///
/// Implement this trait to receive callbacks from a `RetryCoordinator`.
/// This is useful for logging, metrics collection, or debugging.
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::{FlightId, RetryObserver};
/// use std::time::Duration;
///
/// struct MetricsObserver {
///     // Your metrics client here
/// }
///
/// impl RetryObserver for MetricsObserver {
///     fn on_flight_start(&self, flight: FlightId, max_retries: u32) {
///         // Record flight start
///     }
///
///     fn on_retry_scheduled(&self, flight: FlightId, attempt: u32, max_retries: u32, delay: Duration) {
///         // Record retry with its delay
///     }
///
///     fn on_success(&self, flight: FlightId, retries: u32) {
///         // Record success
///     }
///
///     fn on_forwarded(&self, flight: FlightId, retries: u32) {
///         // Record exhaustion
///     }
/// }
/// ```
pub trait RetryObserver: Send + Sync {
    /// Called when a new flight starts
    ///
    /// # Arguments
    ///
    /// * `flight` - The flight id
    /// * `max_retries` - The retry budget for this flight
    fn on_flight_start(&self, flight: FlightId, max_retries: u32);

    /// Called when a failure is absorbed and a retry is scheduled
    ///
    /// # Arguments
    ///
    /// * `flight` - The flight id
    /// * `attempt` - The retry number being scheduled (1-indexed)
    /// * `max_retries` - The retry budget for this flight
    /// * `delay` - The delay before the retry is dispatched
    fn on_retry_scheduled(&self, flight: FlightId, attempt: u32, max_retries: u32, delay: Duration);

    /// Called when the host reports success
    ///
    /// # Arguments
    ///
    /// * `flight` - The flight id
    /// * `retries` - Retries performed before the success
    fn on_success(&self, flight: FlightId, retries: u32);

    /// Called when the budget is exhausted and the failure is forwarded
    ///
    /// # Arguments
    ///
    /// * `flight` - The flight id
    /// * `retries` - Retries performed before giving up
    fn on_forwarded(&self, flight: FlightId, retries: u32);

    /// Called when a message for a concluded or unknown flight is dropped
    fn on_stale_message(&self, flight: FlightId) {
        // Default implementation does nothing
        let _ = flight;
    }
}

/// A no-op observer that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

impl RetryObserver for NoOpObserver {
    fn on_flight_start(&self, _flight: FlightId, _max_retries: u32) {}

    fn on_retry_scheduled(&self, _flight: FlightId, _attempt: u32, _max_retries: u32, _delay: Duration) {}

    fn on_success(&self, _flight: FlightId, _retries: u32) {}

    fn on_forwarded(&self, _flight: FlightId, _retries: u32) {}
}

/// An observer that logs flight events using the `tracing` crate
///
/// # Log Levels
///
/// - `on_flight_start`: DEBUG
/// - `on_retry_scheduled`: WARN
/// - `on_success`: INFO (after retries) or DEBUG (first attempt)
/// - `on_forwarded`: ERROR
/// - `on_stale_message`: DEBUG
///
/// # Example
///
/// ```rust
/// use rebound_core::retry::TracingObserver;
///
/// // Create with the call-site name for better log context
/// let observer = TracingObserver::new("download");
/// ```
#[derive(Debug, Clone)]
pub struct TracingObserver {
    /// Name of the call site being retried (for log context)
    operation: String,
}

impl TracingObserver {
    /// Create a new tracing observer
    ///
    /// # Arguments
    ///
    /// * `operation` - A descriptive name for the call site
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    /// Get the operation name
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new("retry")
    }
}

impl RetryObserver for TracingObserver {
    fn on_flight_start(&self, flight: FlightId, max_retries: u32) {
        tracing::debug!(
            operation = %self.operation,
            flight = %flight,
            max_retries = max_retries,
            "starting flight"
        );
    }

    fn on_retry_scheduled(&self, flight: FlightId, attempt: u32, max_retries: u32, delay: Duration) {
        tracing::warn!(
            operation = %self.operation,
            flight = %flight,
            attempt = attempt,
            max_retries = max_retries,
            delay_ms = delay.as_millis() as u64,
            "operation failed, retry scheduled"
        );
    }

    fn on_success(&self, flight: FlightId, retries: u32) {
        if retries > 0 {
            tracing::info!(
                operation = %self.operation,
                flight = %flight,
                retries = retries,
                "succeeded after retry"
            );
        } else {
            tracing::debug!(
                operation = %self.operation,
                flight = %flight,
                "succeeded on first attempt"
            );
        }
    }

    fn on_forwarded(&self, flight: FlightId, retries: u32) {
        tracing::error!(
            operation = %self.operation,
            flight = %flight,
            retries = retries,
            "retry budget exhausted, forwarding failure"
        );
    }

    fn on_stale_message(&self, flight: FlightId) {
        tracing::debug!(
            operation = %self.operation,
            flight = %flight,
            "dropped message for concluded flight"
        );
    }
}

/// An observer that collects statistics about flights
///
/// Useful for testing and metrics collection.
#[derive(Debug, Default)]
pub struct StatsObserver {
    /// Flight start events
    pub flights: AtomicU32,
    /// Scheduled retry events
    pub retries: AtomicU32,
    /// Success events
    pub successes: AtomicU32,
    /// Forwarded (exhausted) events
    pub forwards: AtomicU32,
    /// Dropped stale messages
    pub stale_messages: AtomicU32,
}

impl StatsObserver {
    /// Create a new stats observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of flights started
    pub fn flights(&self) -> u32 {
        self.flights.load(Ordering::SeqCst)
    }

    /// Get the number of retries scheduled
    pub fn retries(&self) -> u32 {
        self.retries.load(Ordering::SeqCst)
    }

    /// Get the number of successes
    pub fn successes(&self) -> u32 {
        self.successes.load(Ordering::SeqCst)
    }

    /// Get the number of forwarded failures
    pub fn forwards(&self) -> u32 {
        self.forwards.load(Ordering::SeqCst)
    }

    /// Get the number of dropped stale messages
    pub fn stale_messages(&self) -> u32 {
        self.stale_messages.load(Ordering::SeqCst)
    }
}

impl RetryObserver for StatsObserver {
    fn on_flight_start(&self, _flight: FlightId, _max_retries: u32) {
        self.flights.fetch_add(1, Ordering::SeqCst);
    }

    fn on_retry_scheduled(&self, _flight: FlightId, _attempt: u32, _max_retries: u32, _delay: Duration) {
        self.retries.fetch_add(1, Ordering::SeqCst);
    }

    fn on_success(&self, _flight: FlightId, _retries: u32) {
        self.successes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_forwarded(&self, _flight: FlightId, _retries: u32) {
        self.forwards.fetch_add(1, Ordering::SeqCst);
    }

    fn on_stale_message(&self, _flight: FlightId) {
        self.stale_messages.fetch_add(1, Ordering::SeqCst);
    }
}

/// Implement RetryObserver for Arc<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for std::sync::Arc<T> {
    fn on_flight_start(&self, flight: FlightId, max_retries: u32) {
        (**self).on_flight_start(flight, max_retries)
    }

    fn on_retry_scheduled(&self, flight: FlightId, attempt: u32, max_retries: u32, delay: Duration) {
        (**self).on_retry_scheduled(flight, attempt, max_retries, delay)
    }

    fn on_success(&self, flight: FlightId, retries: u32) {
        (**self).on_success(flight, retries)
    }

    fn on_forwarded(&self, flight: FlightId, retries: u32) {
        (**self).on_forwarded(flight, retries)
    }

    fn on_stale_message(&self, flight: FlightId) {
        (**self).on_stale_message(flight)
    }
}

/// Implement RetryObserver for Box<T> where T: RetryObserver
impl<T: RetryObserver + ?Sized> RetryObserver for Box<T> {
    fn on_flight_start(&self, flight: FlightId, max_retries: u32) {
        (**self).on_flight_start(flight, max_retries)
    }

    fn on_retry_scheduled(&self, flight: FlightId, attempt: u32, max_retries: u32, delay: Duration) {
        (**self).on_retry_scheduled(flight, attempt, max_retries, delay)
    }

    fn on_success(&self, flight: FlightId, retries: u32) {
        (**self).on_success(flight, retries)
    }

    fn on_forwarded(&self, flight: FlightId, retries: u32) {
        (**self).on_forwarded(flight, retries)
    }

    fn on_stale_message(&self, flight: FlightId) {
        (**self).on_stale_message(flight)
    }
}
