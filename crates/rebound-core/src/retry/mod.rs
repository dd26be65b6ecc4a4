//! Single-flight retry coordination
//!
//! This module provides a retry coordinator that absorbs an operation's
//! failures, schedules delayed re-runs, and forwards the final failure once
//! the retry budget is spent. It never runs the operation or sleeps itself:
//! every decision is returned to the host as messages to dispatch and delays
//! to honor.
//!
//! # Features
//!
//! - Pure delay policies: constant and exponential-with-cap
//! - State-in, state-out transition function over a closed message type
//! - Host-defined message types via tagger functions
//! - Stale-message guard keyed by flight id
//! - Observable flights via the `RetryObserver` trait
//! - A tokio timer and driver for async operations
//!
//! # Example
//!
//! ```rust,no_run
//! use rebound_core::retry::{retry_with_policy, RetryError};
//! use rebound_core::types::RetryPolicy;
//!
//! async fn example() -> Result<String, RetryError<std::io::Error>> {
//!     let policy = RetryPolicy::default();
//!
//!     retry_with_policy(&policy, || async {
//!         // Your fallible operation here
//!         Ok("success".to_string())
//!     }).await
//! }
//! ```

mod coordinator;
mod error;
mod executor;
mod observer;
mod strategies;
mod timer;

pub use coordinator::{
    FailureSink, FlightId, FlightStatus, RetryConfig, RetryCoordinator, RetryMsg, RetryRequest,
    RetryState, Scheduled, Transition,
};
pub use error::RetryError;
pub use executor::{retry_with_policy, run_flight};
pub use observer::{NoOpObserver, RetryObserver, StatsObserver, TracingObserver};
pub use strategies::{
    constant_delay, exponential_delay, from_fn, Backoff, ConstantDelay, DelayPolicy,
    ExponentialDelay, FnDelay,
};
pub use timer::TokioTimer;

#[cfg(test)]
mod tests;
