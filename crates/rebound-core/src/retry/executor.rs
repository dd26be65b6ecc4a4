//! Async flight driver
//!
//! This module provides a minimal tokio host around [`RetryCoordinator`]: a
//! dispatch loop that launches an async operation, routes its failures to the
//! coordinator, honors scheduled delays with [`TokioTimer`], and re-runs the
//! operation when the retry message comes back.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::types::RetryPolicy;

use super::coordinator::{FailureSink, RetryConfig, RetryCoordinator, RetryMsg, RetryRequest};
use super::error::RetryError;
use super::observer::{NoOpObserver, RetryObserver};
use super::strategies::DelayPolicy;
use super::timer::TokioTimer;

/// Host messages of the driver's dispatch loop
enum DriverMsg<E> {
    Coordinator(RetryMsg<E, DriverMsg<E>>),
    Rerun(RetryRequest<Launch<E>, E>),
    Failed(E),
}

/// The operation handle: launching means running the closure and reporting
/// failures through this sink
type Launch<E> = FailureSink<E, DriverMsg<E>>;

/// Execute an async operation with retry logic based on a policy
///
/// This is a convenience function for simple retry scenarios. For more
/// control, use [`run_flight`].
///
/// # Example
///
/// ```rust,no_run
/// use rebound_core::retry::retry_with_policy;
/// use rebound_core::types::RetryPolicy;
///
/// async fn example() {
///     let policy = RetryPolicy::default();
///
///     let result = retry_with_policy(&policy, || async {
///         // Simulated operation that might fail
///         Ok::<_, std::io::Error>("success")
///     }).await;
/// }
/// ```
pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, op: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Send + 'static,
{
    run_flight(policy.to_config(), NoOpObserver, op).await
}

/// Drive one flight of `op` through a [`RetryCoordinator`]
///
/// The operation runs once immediately. Each failure is routed back to the
/// coordinator; the operation is re-run only after the scheduled retry
/// message has been delivered by the timer.
///
/// # Returns
///
/// The first successful result, or [`RetryError::Exhausted`] carrying the
/// failure that ended the flight.
pub async fn run_flight<F, Fut, T, E, D, O>(
    config: RetryConfig<D>,
    observer: O,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Send + 'static,
    D: DelayPolicy,
    O: RetryObserver,
{
    let (queue, mut inbox) = mpsc::unbounded_channel();
    let timer = TokioTimer::new(queue);

    let coordinator = RetryCoordinator::new(
        config,
        DriverMsg::Coordinator,
        DriverMsg::Failed,
        DriverMsg::Rerun,
    )
    .with_observer(observer);

    let start = Instant::now();
    let (mut state, mut launch) = coordinator.retry(|sink| sink);

    loop {
        match op().await {
            Ok(value) => {
                coordinator.succeed(state);
                return Ok(value);
            }
            Err(failure) => {
                timer.send_now(launch.fail(failure));
            }
        }

        // Dispatch until the coordinator asks for a re-run or gives up
        loop {
            let Some(msg) = inbox.recv().await else {
                unreachable!("dispatch queue stays open while the timer holds a sender");
            };

            match msg {
                DriverMsg::Coordinator(inner) => {
                    let transition = coordinator.handle_message(state, inner);
                    state = transition.state;

                    if let Some(scheduled) = transition.schedule {
                        timer.schedule(scheduled);
                    }
                    if let Some(upward) = transition.emit {
                        timer.send_now(upward);
                    }
                }
                DriverMsg::Rerun(request) => {
                    tracing::debug!(
                        flight = %request.flight,
                        attempt = request.attempt,
                        "re-running operation"
                    );
                    launch = request.operation;
                    break;
                }
                DriverMsg::Failed(failure) => {
                    return Err(RetryError::exhausted(
                        state.retries(),
                        failure,
                        start.elapsed(),
                    ));
                }
            }
        }
    }
}
